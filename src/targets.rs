//! Scan target lists and subnet exclusion.
//!
//! Targets arrive either inline (`10.0.0.1,web.example.com`) or as a path to
//! a file with one target per line. A [`SubnetFilter`] then drops every
//! literal IP that falls inside an excluded subnet. Anything that is not an
//! IP literal, such as a hostname, always passes through.

use ipnetwork::IpNetwork;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Resolves the `targets` argument into a list.
///
/// If `input` names a readable file, targets are read from it one per line,
/// skipping blank lines and lines starting with `#`. Otherwise `input` is
/// treated as a comma separated list.
pub fn load_targets(input: &str) -> Vec<String> {
    match fs::read_to_string(input) {
        Ok(content) => {
            debug!(path = input, "reading targets from file");
            content
                .lines()
                .filter(|line| !line.starts_with('#'))
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        }
        Err(_) => split_targets(input),
    }
}

fn split_targets(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Set of subnets whose addresses are excluded from a scan.
#[derive(Debug, Clone, Default)]
pub struct SubnetFilter {
    subnets: Vec<IpNetwork>,
}

impl SubnetFilter {
    pub fn new(subnets: Vec<IpNetwork>) -> Self {
        Self { subnets }
    }

    /// Loads one CIDR per line. Blank lines and `#` comments are skipped;
    /// any other unparseable line is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let subnets = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|entry| {
                entry.parse::<IpNetwork>().map_err(|e| Error::InvalidSubnet {
                    path: origin.to_string(),
                    entry: entry.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { subnets })
    }

    /// True if `target` is an IP literal inside any listed subnet.
    pub fn excludes(&self, target: &str) -> bool {
        let Ok(ip) = target.trim().parse::<IpAddr>() else {
            return false;
        };
        self.subnets.iter().any(|net| net.contains(ip))
    }

    /// Returns the targets that survive the filter, in their original order.
    pub fn apply(&self, targets: Vec<String>) -> Vec<String> {
        targets
            .into_iter()
            .filter(|t| {
                let excluded = self.excludes(t);
                if excluded {
                    debug!(host = %t, "target excluded by subnet filter");
                }
                !excluded
            })
            .collect()
    }
}
