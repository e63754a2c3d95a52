pub mod client;
pub mod commands;
pub mod config;
pub mod emit;
pub mod enrich;
pub mod error;
pub mod model;
pub mod output;
pub mod targets;

#[cfg(test)]
mod testing;

pub use client::{Requestor, ScanApi};
pub use commands::Orchestrator;
pub use config::{Config, Credentials};
pub use error::{Error, Result};
pub use model::{HostResult, ScanResultDocument, Vulnerability};
