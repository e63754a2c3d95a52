//! Configuration handling.
//!
//! runscan reads configuration from two places:
//!
//! - **Environment** - the scan service URL and key (`SCANAPIURL`,
//!   `SCANAPIKEY`) are always required; `SERVICEAPIKEY` is required only when
//!   ownership/indicator integration is requested. See [`Credentials`].
//! - **Settings file** - optional defaults stored as TOML. See [`Config`].
//!
//! # Settings Location
//!
//! - Linux: `~/.config/runscan/config.toml`
//! - macOS: `~/Library/Application Support/runscan/config.toml`
//! - Windows: `%APPDATA%\runscan\config.toml`
//!
//! # Example Settings
//!
//! ```toml
//! poll_interval_secs = 15
//! verify_tls = true
//! event_source_name = "scanapi"
//! log_level = "warn"
//! service_api_url = "https://serviceapi.example.com"
//! event_destination = "stdout"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

pub const SCAN_API_URL_VAR: &str = "SCANAPIURL";
pub const SCAN_API_KEY_VAR: &str = "SCANAPIKEY";
pub const SERVICE_API_KEY_VAR: &str = "SERVICEAPIKEY";

/// Settings loaded from the TOML file.
///
/// Every field has a default, so a partial file (or no file at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between completion checks when following a scan.
    ///
    /// Default: 15
    pub poll_interval_secs: u64,

    /// Whether to verify the scan service's TLS certificate.
    ///
    /// `--noverify` on the command line always wins.
    /// Default: true
    pub verify_tls: bool,

    /// `sourcename` stamped on emitted security events.
    ///
    /// Default: "scanapi"
    pub event_source_name: String,

    /// Default log filter when neither `RUST_LOG` nor `-v` is given.
    ///
    /// Default: "warn"
    pub log_level: String,

    /// Ownership/indicator service used when `--serviceapi` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_api_url: Option<String>,

    /// Event destination used when `--mozdef` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_destination: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            verify_tls: true,
            event_source_name: "scanapi".to_string(),
            log_level: "warn".to_string(),
            service_api_url: None,
            event_destination: None,
        }
    }
}

impl Config {
    /// Loads settings from the config file, or defaults if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("invalid settings in {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the default settings to `path` unless a file is already there.
    /// Returns whether a file was created.
    pub fn init_at(path: &Path) -> Result<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(Self::generate_default_config().as_bytes())?;
        Ok(true)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("runscan")
            .join("config.toml")
    }

    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Secrets and endpoints taken from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
}

impl Credentials {
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds credentials from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(SCAN_API_URL_VAR).ok_or_else(|| Error::missing_env(SCAN_API_URL_VAR))?;
        let api_key = lookup(SCAN_API_KEY_VAR).ok_or_else(|| Error::missing_env(SCAN_API_KEY_VAR))?;

        Ok(Self { api_url, api_key })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Reads the ownership/indicator service key.
pub fn service_api_key_from_env() -> crate::Result<String> {
    service_api_key_from_lookup(|var| std::env::var(var).ok())
}

pub fn service_api_key_from_lookup<F>(lookup: F) -> crate::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(SERVICE_API_KEY_VAR).ok_or_else(|| {
        Error::Configuration(format!(
            "serviceapi integration requested but {SERVICE_API_KEY_VAR} not found in environment"
        ))
    })
}
