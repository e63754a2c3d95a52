//! Wire types exchanged with the scan service and downstream consumers.
//!
//! - [`ScanResultDocument`] - Result envelope returned by `scan/results`
//! - [`HostResult`] - Per-host findings inside a result set
//! - [`Vulnerability`] - Name and risk read from a single finding
//! - [`OwnerInfo`] / [`Owner`] - Ownership lookup response and its annotation form
//! - [`Policy`] - A named scan profile
//! - [`SecurityEvent`] - Normalized per-host event for the event collector
//!
//! Result documents keep everything they do not interpret as raw JSON, so a
//! document fetched from the API serializes back with the same content.
//!
//! # Example
//!
//! ```
//! use runscan::model::ScanResultDocument;
//!
//! let doc: ScanResultDocument = serde_json::from_str(
//!     r#"{"completed": true, "results": {"zone": "dc1", "details": []}}"#,
//! ).unwrap();
//!
//! assert!(doc.is_completed());
//! assert_eq!(doc.zone(), "dc1");
//! ```

mod event;
mod result;

pub use event::*;
pub use result::*;
