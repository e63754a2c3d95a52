use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder used for every ownership field when no owner is known.
pub const UNSET: &str = "unset";

/// Key under which an ownership annotation is stored on a host entry.
pub const OWNER_KEY: &str = "owner";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResultDocument {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultSet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScanResultDocument {
    /// Anything other than a literal `true` reads as not completed.
    pub fn is_completed(&self) -> bool {
        matches!(self.completed, Some(Value::Bool(true)))
    }

    pub fn zone(&self) -> &str {
        self.results
            .as_ref()
            .and_then(|r| r.zone.as_ref())
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn hosts(&self) -> &[HostResult] {
        self.results
            .as_ref()
            .and_then(|r| r.details.as_deref())
            .unwrap_or_default()
    }

    pub fn hosts_mut(&mut self) -> &mut [HostResult] {
        self.results
            .as_mut()
            .and_then(|r| r.details.as_deref_mut())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub zone: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<HostResult>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `results.details`.
///
/// The entry is kept as the JSON object the service sent. Accessors read the
/// few fields the client interprets and tolerate them being absent, null or
/// of an unexpected type, so a host the client cannot classify still prints
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostResult {
    fields: Map<String, Value>,
}

impl HostResult {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The field as sent, or `null` when absent.
    pub fn field(&self, key: &str) -> Value {
        self.fields.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Empty unless the service sent a string.
    pub fn hostname(&self) -> &str {
        self.fields
            .get("hostname")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn credentialed_checks(&self) -> bool {
        self.fields
            .get("credentialed_checks")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn vulnerabilities(&self) -> Vec<Vulnerability> {
        match self.fields.get("vulnerabilities") {
            Some(Value::Array(items)) => items.iter().map(Vulnerability::from_value).collect(),
            _ => Vec::new(),
        }
    }

    pub fn owner(&self) -> Option<&Value> {
        self.fields.get(OWNER_KEY)
    }

    pub fn set_owner(&mut self, owner: &Owner) {
        self.fields.insert(
            OWNER_KEY.to_string(),
            serde_json::json!({
                "operator": owner.operator,
                "team": owner.team,
                "v2bkey": owner.v2bkey,
            }),
        );
    }
}

/// The name and risk of a single finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vulnerability {
    /// Title of the finding. Several entries may share a name when one issue
    /// maps to more than one CVE.
    pub name: String,
    pub risk: String,
}

impl Vulnerability {
    pub fn new(name: impl Into<String>, risk: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            risk: risk.into(),
        }
    }

    /// Reads `name` and `risk` from a finding. A non-string name keys by its
    /// JSON text; a non-string risk reads as empty.
    pub fn from_value(value: &Value) -> Self {
        let name = match value.get("name") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let risk = value
            .get("risk")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Self::new(name, risk)
    }
}

/// Ownership record as returned by the ownership service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInfo {
    pub operator: String,
    pub team: String,
    pub triagekey: String,
}

impl OwnerInfo {
    pub fn new(
        operator: impl Into<String>,
        team: impl Into<String>,
        triagekey: impl Into<String>,
    ) -> Self {
        Self {
            operator: operator.into(),
            team: team.into(),
            triagekey: triagekey.into(),
        }
    }

    /// The record substituted when a lookup fails.
    pub fn unset() -> Self {
        Self::new(UNSET, UNSET, format!("{UNSET}-{UNSET}"))
    }
}

impl Default for OwnerInfo {
    fn default() -> Self {
        Self::unset()
    }
}

/// Ownership annotation attached to a [`HostResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub operator: String,
    pub team: String,
    pub v2bkey: String,
}

impl From<&OwnerInfo> for Owner {
    fn from(info: &OwnerInfo) -> Self {
        Self {
            operator: info.operator.clone(),
            team: info.team.clone(),
            v2bkey: info.triagekey.clone(),
        }
    }
}

/// The completion flag alone, for polling without reading any host entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ScanStatus {
    #[serde(default)]
    pub completed: Option<bool>,
}

impl ScanStatus {
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Policy {
    /// The policy id without JSON quoting.
    pub fn display_id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Response to `POST scan`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanStarted {
    #[serde(deserialize_with = "string_or_number")]
    pub scanid: String,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it is written back.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for scan id, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "completed": true,
            "scanid": "abc",
            "results": {
                "zone": "corp",
                "details": [{
                    "hostname": "h1",
                    "ipaddress": "10.0.0.1",
                    "os": "linux",
                    "vulnerabilities": [
                        {"name": "A", "risk": "high", "cvss": 7.5, "cves": ["CVE-1"]}
                    ],
                    "scan_start": "2024-01-01T00:00:00Z",
                    "scan_end": "2024-01-01T01:00:00Z",
                    "credentialed_checks": true,
                    "tags": ["x"]
                }]
            }
        })
    }

    #[test]
    fn test_document_preserves_unknown_fields() {
        let doc: ScanResultDocument = serde_json::from_value(sample()).unwrap();
        assert!(doc.is_completed());
        assert_eq!(doc.zone(), "corp");
        assert_eq!(doc.hosts().len(), 1);
        assert_eq!(doc.hosts()[0].vulnerabilities()[0].risk, "high");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_null_fields_parse_and_survive() {
        let input = json!({
            "completed": true,
            "results": {
                "zone": "corp",
                "details": [{
                    "hostname": null,
                    "ipaddress": null,
                    "os": null,
                    "vulnerabilities": [{"name": "A", "risk": null}],
                    "credentialed_checks": null
                }]
            }
        });

        let doc: ScanResultDocument = serde_json::from_value(input.clone()).unwrap();
        let host = &doc.hosts()[0];
        assert_eq!(host.hostname(), "");
        assert!(!host.credentialed_checks());
        assert_eq!(host.vulnerabilities(), vec![Vulnerability::new("A", "")]);
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }

    #[test]
    fn test_missing_fields_are_not_filled_in() {
        let input = json!({
            "completed": true,
            "results": {
                "zone": "corp",
                "details": [{"hostname": "h1"}]
            }
        });

        let doc: ScanResultDocument = serde_json::from_value(input.clone()).unwrap();
        assert!(doc.hosts()[0].vulnerabilities().is_empty());
        assert_eq!(doc.hosts()[0].field("scan_start"), Value::Null);
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }

    #[test]
    fn test_incomplete_document_without_results() {
        let doc: ScanResultDocument = serde_json::from_str(r#"{"completed": false}"#).unwrap();
        assert!(!doc.is_completed());
        assert!(doc.hosts().is_empty());
        assert_eq!(doc.zone(), "");
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"completed": false})
        );
    }

    #[test]
    fn test_scan_status_reads_only_completed() {
        let status: ScanStatus = serde_json::from_value(json!({
            "completed": true,
            "results": {"zone": 5, "details": "not a list"}
        }))
        .unwrap();
        assert!(status.is_completed());

        let status: ScanStatus = serde_json::from_str(r#"{"completed": null}"#).unwrap();
        assert!(!status.is_completed());
    }

    #[test]
    fn test_set_owner_replaces_annotation() {
        let mut host: HostResult = serde_json::from_value(json!({
            "hostname": "h1",
            "owner": "stale"
        }))
        .unwrap();

        host.set_owner(&Owner::from(&OwnerInfo::new("opsA", "teamA", "opsA-teamA")));

        assert_eq!(
            host.owner(),
            Some(&json!({"operator": "opsA", "team": "teamA", "v2bkey": "opsA-teamA"}))
        );
    }

    #[test]
    fn test_owner_from_info_rekeys_triagekey() {
        let owner = Owner::from(&OwnerInfo::new("opsA", "teamA", "opsA-teamA"));
        assert_eq!(owner.v2bkey, "opsA-teamA");
        let value = serde_json::to_value(&owner).unwrap();
        assert_eq!(
            value,
            json!({"operator": "opsA", "team": "teamA", "v2bkey": "opsA-teamA"})
        );
    }

    #[test]
    fn test_unset_owner() {
        let owner = Owner::from(&OwnerInfo::unset());
        assert_eq!(owner.operator, "unset");
        assert_eq!(owner.team, "unset");
        assert_eq!(owner.v2bkey, "unset-unset");
    }

    #[test]
    fn test_scan_started_accepts_numeric_id() {
        let started: ScanStarted = serde_json::from_str(r#"{"scanid": 42}"#).unwrap();
        assert_eq!(started.scanid, "42");
        let started: ScanStarted = serde_json::from_str(r#"{"scanid": "s-1"}"#).unwrap();
        assert_eq!(started.scanid, "s-1");
    }

    #[test]
    fn test_policy_display_id() {
        let policy: Policy =
            serde_json::from_str(r#"{"id": 3, "name": "default", "description": "d"}"#).unwrap();
        assert_eq!(policy.display_id(), "3");
        let policy: Policy = serde_json::from_str(r#"{"id": "p3", "name": "default"}"#).unwrap();
        assert_eq!(policy.display_id(), "p3");
        assert_eq!(policy.description, "");
    }
}
