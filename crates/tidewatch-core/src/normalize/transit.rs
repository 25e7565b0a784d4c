//! Transit service-alert shapes.
//!
//! An empty alert list is a normal operating state, not missing data.

use serde::Deserialize;
use serde_json::Value;

use super::wire::{self, known_text};
use super::{select, NormError, Variant};
use crate::{FeedKind, ServiceAlert, ServiceState, TransitStatus};

const WHAT: &str = "service alert";

#[derive(Debug, Deserialize)]
struct WireAlert {
    #[serde(rename = "AlertID", deserialize_with = "wire::required_text")]
    id: String,
    #[serde(rename = "Title", deserialize_with = "wire::required_text")]
    title: String,
    #[serde(rename = "Description", default, deserialize_with = "wire::opt_text")]
    description: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "wire::opt_i64")]
    status: Option<i64>,
    #[serde(rename = "StartTime", default, deserialize_with = "wire::opt_text")]
    start_time: Option<String>,
    #[serde(rename = "PublishTime", default, deserialize_with = "wire::opt_text")]
    publish_time: Option<String>,
    #[serde(rename = "UpdateTime", default, deserialize_with = "wire::opt_text")]
    update_time: Option<String>,
}

#[derive(Debug)]
pub(crate) struct AlertSet {
    update_time: Option<String>,
    alerts: Vec<WireAlert>,
}

pub(crate) static VARIANTS: &[Variant<AlertSet>] = &[
    Variant {
        name: "alerts[array]",
        matches: Value::is_array,
        extract: extract_bare_list,
    },
    Variant {
        name: "Alerts[list]",
        matches: has_alert_list,
        extract: extract_wrapped,
    },
    Variant {
        name: "Alerts{object}",
        matches: has_alert_object,
        extract: extract_wrapped,
    },
    Variant {
        name: "root-alert",
        matches: is_root_alert,
        extract: extract_root_alert,
    },
];

fn has_alert_list(raw: &Value) -> bool {
    raw.get("Alerts").is_some_and(Value::is_array)
}

fn has_alert_object(raw: &Value) -> bool {
    wire::object_at(raw, "/Alerts")
}

fn is_root_alert(raw: &Value) -> bool {
    raw.get("AlertID").is_some()
}

fn extract_bare_list(raw: &Value) -> Result<AlertSet, NormError> {
    Ok(AlertSet {
        update_time: None,
        alerts: wire::decode(raw, WHAT)?,
    })
}

fn extract_wrapped(raw: &Value) -> Result<AlertSet, NormError> {
    Ok(AlertSet {
        update_time: raw.get("UpdateTime").and_then(wire::text),
        alerts: wire::list_at(raw, "/Alerts", WHAT)?,
    })
}

fn extract_root_alert(raw: &Value) -> Result<AlertSet, NormError> {
    Ok(AlertSet {
        update_time: None,
        alerts: vec![wire::decode(raw, WHAT)?],
    })
}

pub fn normalize(raw: &Value) -> Result<TransitStatus, NormError> {
    let (_, set) = select(VARIANTS, raw, FeedKind::TransitStatus)?;
    Ok(enrich(set))
}

fn service_state(status: Option<i64>) -> ServiceState {
    match status {
        Some(0 | 1) => ServiceState::Normal,
        Some(2) => ServiceState::Disrupted,
        _ => ServiceState::Unknown,
    }
}

fn enrich(set: AlertSet) -> TransitStatus {
    let updated_at = set.update_time.or_else(|| {
        set.alerts
            .iter()
            .filter_map(|alert| alert.update_time.clone())
            .max()
    });

    let alerts: Vec<ServiceAlert> = set
        .alerts
        .into_iter()
        .map(|alert| ServiceAlert {
            alert_id: alert.id,
            title: alert.title,
            description: known_text(alert.description),
            status: service_state(alert.status),
            effective: known_text(alert.start_time.or(alert.publish_time)),
        })
        .collect();

    let overall = if alerts.iter().any(|alert| alert.status == ServiceState::Disrupted) {
        ServiceState::Disrupted
    } else if alerts.iter().any(|alert| alert.status == ServiceState::Unknown) {
        ServiceState::Unknown
    } else {
        ServiceState::Normal
    };

    TransitStatus {
        overall,
        alerts,
        updated_at: known_text(updated_at),
    }
}
