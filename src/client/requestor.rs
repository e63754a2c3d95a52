use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::model::{Policy, ScanResultDocument, ScanStarted, ScanStatus};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ResultsQuery, ScanApi};

/// Header carrying the scan service key on every request.
pub const SCAN_API_KEY_HEADER: &str = "SCANAPIKEY";

const API_PREFIX: &str = "api/v1";

pub struct Requestor {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Requestor {
    /// Builds a requestor for `credentials`.
    ///
    /// With `verify_tls` false the scan service certificate is accepted
    /// without validation; the connection itself is still TLS.
    pub fn new(credentials: &Credentials, verify_tls: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("runscan/{}", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self::with_client(client, credentials))
    }

    pub fn with_client(client: Client, credentials: &Credentials) -> Self {
        Self {
            client,
            base_url: format!(
                "{}/{}",
                credentials.api_url.trim_end_matches('/'),
                API_PREFIX
            ),
            api_key: credentials.api_key.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(endpoint))
            .header(SCAN_API_KEY_HEADER, &self.api_key)
    }

    /// Sends the request; any non-success status aborts the operation.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "scan api response");

        if !status.is_success() {
            return Err(Error::RequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn get_results<T: DeserializeOwned>(
        &self,
        scan_id: &str,
        query: ResultsQuery,
    ) -> Result<T> {
        let params = ResultsParams {
            scanid: scan_id,
            mincvss: query.min_cvss,
            nooutput: query.no_output.then_some("1"),
        };
        let response = self
            .send(self.request(Method::GET, "scan/results").query(&params))
            .await?;
        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct StartScanForm<'a> {
    targets: &'a str,
    policy: &'a str,
}

#[derive(Serialize)]
struct ResultsParams<'a> {
    scanid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mincvss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nooutput: Option<&'static str>,
}

#[derive(Serialize)]
struct PurgeParams {
    olderthan: u64,
}

#[async_trait]
impl ScanApi for Requestor {
    async fn list_policies(&self) -> Result<Vec<Policy>> {
        let response = self.send(self.request(Method::GET, "policies")).await?;
        Ok(response.json().await?)
    }

    async fn start_scan(&self, targets: &str, policy: &str) -> Result<String> {
        let form = StartScanForm { targets, policy };
        let response = self
            .send(self.request(Method::POST, "scan").form(&form))
            .await?;
        let started: ScanStarted = response.json().await?;
        Ok(started.scanid)
    }

    async fn fetch_results(
        &self,
        scan_id: &str,
        query: ResultsQuery,
    ) -> Result<ScanResultDocument> {
        self.get_results(scan_id, query).await
    }

    async fn is_scan_completed(&self, scan_id: &str) -> Result<bool> {
        let status: ScanStatus = self.get_results(scan_id, ResultsQuery::default()).await?;
        Ok(status.is_completed())
    }

    async fn fetch_results_csv(&self, scan_id: &str) -> Result<String> {
        let params = [("scanid", scan_id)];
        let response = self
            .send(self.request(Method::GET, "scan/results/csv").query(&params))
            .await?;
        Ok(response.text().await?)
    }

    async fn purge_scans(&self, older_than_secs: u64) -> Result<Value> {
        let params = PurgeParams {
            olderthan: older_than_secs,
        };
        let response = self
            .send(self.request(Method::DELETE, "scan/purge").query(&params))
            .await?;
        Ok(response.json().await?)
    }
}
