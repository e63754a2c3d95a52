//! Result enrichment against the ownership/indicator service.
//!
//! Enrichment runs in two passes over a fetched [`ScanResultDocument`]:
//!
//! 1. **Indicators** - a [`SeverityProfile`] is computed for every host and
//!    submitted as an [`Indicator`]. A failed submission is logged and the
//!    remaining hosts are still submitted.
//! 2. **Ownership** - each distinct hostname is looked up once and every
//!    host entry with that name receives the same [`Owner`] annotation. A
//!    failed lookup falls back to [`OwnerInfo::unset`].
//!
//! Indicators are computed before any owner is attached, so ownership data
//! never influences them.

mod indicator;
mod severity;

pub use indicator::{utc_timestamp, Indicator};
pub use severity::{Likelihood, Risk, SeverityDetails, SeverityProfile};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Owner, OwnerInfo, ScanResultDocument};

/// Header carrying the ownership/indicator service key.
pub const SERVICE_API_KEY_HEADER: &str = "SERVICEAPIKEY";

#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn submit_indicator(&self, indicator: &Indicator) -> Result<()>;
    async fn lookup_owner(&self, hostname: &str) -> Result<OwnerInfo>;
}

/// HTTP client for the ownership/indicator service.
pub struct ServiceApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ServiceApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl ServiceApi for ServiceApiClient {
    async fn submit_indicator(&self, indicator: &Indicator) -> Result<()> {
        let response = self
            .client
            .post(self.url("indicator"))
            .header(SERVICE_API_KEY_HEADER, &self.api_key)
            .json(indicator)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::RequestFailed {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn lookup_owner(&self, hostname: &str) -> Result<OwnerInfo> {
        let response = self
            .client
            .get(self.url("owner/hostname"))
            .header(SERVICE_API_KEY_HEADER, &self.api_key)
            .query(&[("hostname", hostname)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::RequestFailed {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

pub struct Enricher {
    service: Box<dyn ServiceApi>,
}

impl Enricher {
    pub fn new(service: Box<dyn ServiceApi>) -> Self {
        Self { service }
    }

    /// Submits indicators, then annotates owners.
    pub async fn execute(&self, doc: &mut ScanResultDocument) {
        self.submit_indicators(doc).await;
        self.annotate_owners(doc).await;
    }

    /// Returns the number of indicators the service accepted.
    pub async fn submit_indicators(&self, doc: &ScanResultDocument) -> usize {
        let mut accepted = 0;

        for host in doc.hosts() {
            let indicator = Indicator::for_host(host, doc.zone(), Utc::now());
            match self.service.submit_indicator(&indicator).await {
                Ok(()) => {
                    debug!(
                        host = host.hostname(),
                        likelihood = %indicator.likelihood_indicator,
                        "indicator submitted"
                    );
                    accepted += 1;
                }
                Err(Error::RequestFailed { status }) => {
                    warn!(
                        host = host.hostname(),
                        "serviceapi indicator post failed with code {}", status
                    );
                }
                Err(e) => {
                    warn!(host = host.hostname(), "serviceapi indicator post failed: {}", e);
                }
            }
        }

        accepted
    }

    pub async fn annotate_owners(&self, doc: &mut ScanResultDocument) {
        let hostnames: BTreeSet<String> =
            doc.hosts().iter().map(|h| h.hostname().to_string()).collect();

        let mut owners: HashMap<String, Owner> = HashMap::with_capacity(hostnames.len());
        for hostname in hostnames {
            let info = match self.service.lookup_owner(&hostname).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(host = %hostname, "owner lookup failed, using unset owner: {}", e);
                    OwnerInfo::unset()
                }
            };
            owners.insert(hostname, Owner::from(&info));
        }

        for host in doc.hosts_mut() {
            if let Some(owner) = owners.get(host.hostname()) {
                host.set_owner(owner);
            }
        }
    }
}
