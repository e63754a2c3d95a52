//! Security event emission.
//!
//! A result document becomes one [`SecurityEvent`] per host entry, in
//! document order. Events go either to stdout as a single pretty-printed JSON
//! array, or to a collector URL with one POST per event. Unlike indicator
//! submission, a failed POST aborts the remaining events.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::io::Write;
use tracing::debug;

use crate::enrich::utc_timestamp;
use crate::error::Result;
use crate::model::{Asset, HostResult, ScanResultDocument, SecurityEvent, EVENT_VERSION};

/// Destination value that selects stdout instead of a collector.
pub const STDOUT_DESTINATION: &str = "stdout";

pub const EVENT_DESCRIPTION: &str = "scanapi runscan mozdef emitter";

/// Something that accepts events one at a time.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn post(&self, event: &SecurityEvent) -> Result<()>;
}

/// Posts each event as a JSON body to a collector URL.
pub struct HttpEventSink {
    client: Client,
    url: String,
}

impl HttpEventSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn post(&self, event: &SecurityEvent) -> Result<()> {
        // The collector's response is not inspected.
        let response = self.client.post(&self.url).json(event).send().await?;
        debug!(url = %self.url, status = response.status().as_u16(), "event posted");
        Ok(())
    }
}

pub struct EventEmitter {
    source_name: String,
    sink: Option<Box<dyn EventSink>>,
}

impl EventEmitter {
    /// Builds an emitter for `destination`, which is either the literal
    /// `stdout` or a collector URL.
    pub fn for_destination(destination: &str, source_name: impl Into<String>) -> Self {
        if destination == STDOUT_DESTINATION {
            Self::stdout(source_name)
        } else {
            Self::with_sink(Box::new(HttpEventSink::new(destination)), source_name)
        }
    }

    pub fn stdout(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            sink: None,
        }
    }

    pub fn with_sink(sink: Box<dyn EventSink>, source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            sink: Some(sink),
        }
    }

    pub fn events(&self, doc: &ScanResultDocument) -> Vec<SecurityEvent> {
        doc.hosts()
            .iter()
            .map(|host| self.event_for(host, doc.zone()))
            .collect()
    }

    fn event_for(&self, host: &HostResult, zone: &str) -> SecurityEvent {
        SecurityEvent {
            description: EVENT_DESCRIPTION.to_string(),
            sourcename: self.source_name.clone(),
            zone: zone.to_string(),
            version: EVENT_VERSION,
            utctimestamp: utc_timestamp(Utc::now()),
            asset: Asset {
                hostname: host.field("hostname"),
                ipaddress: host.field("ipaddress"),
                os: host.field("os"),
                owner: host.owner().cloned(),
            },
            vulnerabilities: host.field("vulnerabilities"),
            scan_start: host.field("scan_start"),
            scan_end: host.field("scan_end"),
            credentialed_checks: host.field("credentialed_checks"),
            exempt_vulnerabilities: host.get("exempt_vulnerabilities").cloned(),
        }
    }

    /// Delivers every event for `doc`. `out` receives the JSON array when the
    /// destination is stdout. Returns the number of events delivered.
    pub async fn emit<W: Write + Send>(
        &self,
        doc: &ScanResultDocument,
        out: &mut W,
    ) -> Result<usize> {
        let events = self.events(doc);

        match &self.sink {
            None => {
                writeln!(out, "{}", serde_json::to_string_pretty(&events)?)?;
            }
            Some(sink) => {
                for event in &events {
                    sink.post(event).await?;
                }
            }
        }

        Ok(events.len())
    }
}
