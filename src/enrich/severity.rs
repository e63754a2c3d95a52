use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::HostResult;

/// Risk level of a single finding, ordered by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Risk {
    Other = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Risk {
    pub fn parse(risk: &str) -> Self {
        match risk {
            "critical" => Risk::Critical,
            "high" => Risk::High,
            "medium" => Risk::Medium,
            "low" => Risk::Low,
            _ => Risk::Other,
        }
    }
}

/// Overall likelihood reported for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    Maximum,
    High,
    Medium,
    Low,
    Unknown,
}

impl Likelihood {
    /// Maps the highest risk seen on a credentialed host to a likelihood.
    /// Anything below medium, including no findings at all, reports low.
    pub fn from_risk(risk: Risk) -> Self {
        match risk {
            Risk::Critical => Likelihood::Maximum,
            Risk::High => Likelihood::High,
            Risk::Medium => Likelihood::Medium,
            Risk::Low | Risk::Other => Likelihood::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Likelihood::Maximum => "maximum",
            Likelihood::High => "high",
            Likelihood::Medium => "medium",
            Likelihood::Low => "low",
            Likelihood::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Likelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-host finding counts sent as the indicator `details`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDetails {
    pub maximum: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub coverage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityProfile {
    pub details: SeverityDetails,
    pub likelihood_indicator: Likelihood,
}

impl SeverityProfile {
    /// Classifies a host's findings.
    ///
    /// Bucket counts are deduplicated by vulnerability name: a name already
    /// seen on this host is not counted again, whatever its risk. The
    /// severity ceiling is not deduplicated, so a repeated name with a higher
    /// risk still raises the likelihood.
    pub fn from_host(host: &HostResult) -> Self {
        let mut details = SeverityDetails::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ceiling = Risk::Low;

        let vulnerabilities = host.vulnerabilities();
        for vuln in &vulnerabilities {
            let risk = Risk::parse(&vuln.risk);
            if seen.insert(vuln.name.as_str()) {
                match risk {
                    Risk::Critical => details.maximum += 1,
                    Risk::High => details.high += 1,
                    Risk::Medium => details.medium += 1,
                    Risk::Low => details.low += 1,
                    Risk::Other => {}
                }
            }
            ceiling = ceiling.max(risk);
        }

        let likelihood_indicator = if host.credentialed_checks() {
            details.coverage = true;
            Likelihood::from_risk(ceiling)
        } else {
            Likelihood::Unknown
        };

        Self {
            details,
            likelihood_indicator,
        }
    }
}
