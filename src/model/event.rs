use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version stamped on every event.
pub const EVENT_VERSION: u32 = 2;

/// Host fields are copied from the result entry as sent; a field the entry
/// lacks is emitted as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub description: String,
    pub sourcename: String,
    pub zone: String,
    pub version: u32,
    /// Emission time, not scan time.
    pub utctimestamp: String,
    pub asset: Asset,
    pub vulnerabilities: Value,
    pub scan_start: Value,
    pub scan_end: Value,
    pub credentialed_checks: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt_vulnerabilities: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub hostname: Value,
    pub ipaddress: Value,
    pub os: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Value>,
}
