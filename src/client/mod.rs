//! Scan service client.
//!
//! [`ScanApi`] is the set of operations the command layer needs from the
//! scan service; [`Requestor`] implements it over HTTP.

mod requestor;

pub use requestor::{Requestor, SCAN_API_KEY_HEADER};

use crate::error::Result;
use crate::model::{Policy, ScanResultDocument};
use async_trait::async_trait;
use serde_json::Value;

/// Options for a JSON results fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultsQuery {
    /// Drop vulnerabilities scoring below this CVSS value.
    pub min_cvss: Option<f64>,
    /// Ask the service to omit plugin output.
    pub no_output: bool,
}

#[async_trait]
pub trait ScanApi: Send + Sync {
    async fn list_policies(&self) -> Result<Vec<Policy>>;

    /// Submits a scan and returns its id. `targets` is a comma separated list.
    async fn start_scan(&self, targets: &str, policy: &str) -> Result<String>;

    async fn fetch_results(&self, scan_id: &str, query: ResultsQuery)
        -> Result<ScanResultDocument>;

    async fn fetch_results_csv(&self, scan_id: &str) -> Result<String>;

    async fn purge_scans(&self, older_than_secs: u64) -> Result<Value>;

    /// There is no status endpoint, so completion is read from the
    /// `completed` flag of an unfiltered results fetch. Implementations may
    /// decode only that flag.
    async fn is_scan_completed(&self, scan_id: &str) -> Result<bool> {
        let doc = self.fetch_results(scan_id, ResultsQuery::default()).await?;
        Ok(doc.is_completed())
    }
}
