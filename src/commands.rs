//! Command orchestration.
//!
//! [`Orchestrator`] maps each CLI intent onto the scan service client, the
//! enrichment pipeline and the event emitter. It owns the output stream so
//! everything a command prints goes through one writer.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{ResultsQuery, ScanApi};
use crate::emit::EventEmitter;
use crate::enrich::Enricher;
use crate::error::{Error, Result};
use crate::model::Policy;
use crate::output::{write_json, write_policies, OutputFormat};

/// Smallest accepted purge threshold, in seconds.
pub const MIN_PURGE_SECONDS: u64 = 300;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Options shared by `results` and `scan --follow`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultOptions {
    /// Fetch the raw CSV export; skips enrichment and event emission.
    pub csv: bool,
    pub query: ResultsQuery,
}

/// What a results fetch ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsOutcome {
    Incomplete,
    Csv,
    Json,
    Emitted(usize),
}

pub struct Orchestrator<W: Write + Send> {
    api: Box<dyn ScanApi>,
    out: W,
    poll_interval: Duration,
    show_progress: bool,
    enricher: Option<Enricher>,
    emitter: Option<EventEmitter>,
}

impl<W: Write + Send> Orchestrator<W> {
    pub fn new(api: Box<dyn ScanApi>, out: W) -> Self {
        Self {
            api,
            out,
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: false,
            enricher: None,
            emitter: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Shows a spinner on stderr while following a scan.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn list_policies(&mut self, format: OutputFormat) -> Result<Vec<Policy>> {
        let policies = self.api.list_policies().await?;
        write_policies(&mut self.out, &policies, format)?;
        Ok(policies)
    }

    /// Starts a scan of `targets` with `policy` and returns its id.
    ///
    /// The policy is checked against the service's list first; no scan is
    /// submitted if it is unknown.
    pub async fn start_scan(&self, targets: &[String], policy: &str) -> Result<String> {
        let policies = self.api.list_policies().await?;
        if !policies.iter().any(|p| p.name == policy) {
            return Err(Error::PolicyNotFound {
                policy: policy.to_string(),
            });
        }

        if targets.is_empty() {
            return Err(Error::Configuration(
                "no targets left to scan after filtering".to_string(),
            ));
        }

        let scan_id = self.api.start_scan(&targets.join(","), policy).await?;
        info!(scan_id = %scan_id, policy, targets = targets.len(), "scan started");
        Ok(scan_id)
    }

    /// Blocks until the service reports the scan complete. There is no
    /// timeout; returns the number of completion checks made.
    pub async fn follow_scan(&self, scan_id: &str) -> Result<u32> {
        let progress = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut checks = 0;
        loop {
            checks += 1;
            progress.set_message(format!("Waiting for scan {} to complete...", scan_id));
            if self.api.is_scan_completed(scan_id).await? {
                break;
            }
            debug!(scan_id, checks, "scan not complete yet");
            tokio::time::sleep(self.poll_interval).await;
        }

        progress.finish_and_clear();
        info!(scan_id, checks, "scan complete");
        Ok(checks)
    }

    pub async fn fetch_results(
        &mut self,
        scan_id: &str,
        options: ResultOptions,
    ) -> Result<ResultsOutcome> {
        if !self.api.is_scan_completed(scan_id).await? {
            writeln!(self.out, "Scan incomplete")?;
            return Ok(ResultsOutcome::Incomplete);
        }

        if options.csv {
            let csv = self.api.fetch_results_csv(scan_id).await?;
            write!(self.out, "{}", csv)?;
            return Ok(ResultsOutcome::Csv);
        }

        let mut doc = self.api.fetch_results(scan_id, options.query).await?;

        if let Some(enricher) = &self.enricher {
            enricher.execute(&mut doc).await;
        }

        match &self.emitter {
            Some(emitter) => {
                let emitted = emitter.emit(&doc, &mut self.out).await?;
                Ok(ResultsOutcome::Emitted(emitted))
            }
            None => {
                write_json(&mut self.out, &doc)?;
                Ok(ResultsOutcome::Json)
            }
        }
    }

    pub async fn purge_scans(&mut self, older_than_secs: u64) -> Result<Value> {
        if older_than_secs < MIN_PURGE_SECONDS {
            return Err(Error::PurgeTooRecent {
                seconds: older_than_secs,
            });
        }

        let response = self.api.purge_scans(older_than_secs).await?;
        write_json(&mut self.out, &response)?;
        Ok(response)
    }
}
