use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::severity::{Likelihood, SeverityDetails, SeverityProfile};
use crate::model::HostResult;

pub const INDICATOR_ASSET_TYPE: &str = "hostname";
pub const INDICATOR_DESCRIPTION: &str = "scanapi vulnerability result";
pub const INDICATOR_SOURCE: &str = "scanapi";

/// Host risk summary submitted to the indicator service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub asset_type: String,
    pub asset_identifier: String,
    pub zone: String,
    pub description: String,
    pub timestamp_utc: String,
    pub event_source_name: String,
    pub likelihood_indicator: Likelihood,
    pub details: SeverityDetails,
}

impl Indicator {
    pub fn for_host(host: &HostResult, zone: &str, now: DateTime<Utc>) -> Self {
        let profile = SeverityProfile::from_host(host);

        Self {
            asset_type: INDICATOR_ASSET_TYPE.to_string(),
            asset_identifier: host.hostname().to_string(),
            zone: zone.to_string(),
            description: INDICATOR_DESCRIPTION.to_string(),
            timestamp_utc: utc_timestamp(now),
            event_source_name: INDICATOR_SOURCE.to_string(),
            likelihood_indicator: profile.likelihood_indicator,
            details: profile.details,
        }
    }
}

/// RFC 3339 with microseconds and an explicit `+00:00` offset.
pub fn utc_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}
