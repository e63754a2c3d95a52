//! Error types for runscan.

use thiserror::Error;

/// Result type alias using the runscan [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("environment variable {var} not found")]
    MissingEnv { var: String },

    #[error("{0}")]
    Configuration(String),

    #[error("invalid subnet {entry:?} in {path}: {message}")]
    InvalidSubnet {
        path: String,
        entry: String,
        message: String,
    },

    #[error(
        "purge threshold must be at least {min} seconds, got {seconds}",
        min = crate::commands::MIN_PURGE_SECONDS
    )]
    PurgeTooRecent { seconds: u64 },

    // === Request Errors ===
    #[error("request failed with status code {status}")]
    RequestFailed { status: u16 },

    #[error("policy {policy} not found")]
    PolicyNotFound { policy: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // === IO / Serialization ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Configuration problems are detected before any scan-service request
    /// is issued.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingEnv { .. }
                | Error::Configuration(_)
                | Error::InvalidSubnet { .. }
                | Error::PurgeTooRecent { .. }
        )
    }

    pub fn missing_env(var: impl Into<String>) -> Self {
        Error::MissingEnv { var: var.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_message() {
        let err = Error::RequestFailed { status: 403 };
        assert_eq!(err.to_string(), "request failed with status code 403");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::missing_env("SCANAPIKEY").is_configuration());
        assert!(Error::PurgeTooRecent { seconds: 10 }.is_configuration());
        assert!(!Error::PolicyNotFound {
            policy: "default".to_string()
        }
        .is_configuration());
    }

    #[test]
    fn test_purge_message_names_minimum() {
        let err = Error::PurgeTooRecent { seconds: 60 };
        assert_eq!(
            err.to_string(),
            "purge threshold must be at least 300 seconds, got 60"
        );
    }
}
