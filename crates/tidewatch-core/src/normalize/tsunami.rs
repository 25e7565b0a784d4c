//! Tsunami bulletin shapes.

use serde::Deserialize;
use serde_json::Value;

use super::seismic::{magnitude, WireMagnitude};
use super::wire::{self, known_text};
use super::{select, NormError, Variant};
use crate::{FeedKind, Observed, TsunamiBulletin, WarningArea};

const WHAT: &str = "tsunami bulletin";

#[derive(Debug, Deserialize)]
pub(crate) struct WireTsunami {
    #[serde(
        rename = "TsunamiNo",
        alias = "ReportNo",
        deserialize_with = "wire::required_text"
    )]
    number: String,
    #[serde(rename = "ReportType", default, deserialize_with = "wire::opt_text")]
    report_type: Option<String>,
    #[serde(rename = "ReportContent", deserialize_with = "wire::required_text")]
    report_content: String,
    #[serde(rename = "EarthquakeInfo", default)]
    earthquake: Option<WireQuakeSummary>,
    #[serde(rename = "TsunamiWave", default)]
    wave: Option<WireTsunamiWave>,
}

#[derive(Debug, Deserialize)]
struct WireQuakeSummary {
    #[serde(rename = "OriginTime", default, deserialize_with = "wire::opt_text")]
    origin_time: Option<String>,
    #[serde(rename = "Epicenter", default)]
    epicenter: Option<WireLocation>,
    #[serde(rename = "EarthquakeMagnitude", alias = "Magnitude", default)]
    magnitude: Option<WireMagnitude>,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    #[serde(rename = "Location", default, deserialize_with = "wire::opt_text")]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireTsunamiWave {
    #[serde(rename = "WarningArea", default)]
    areas: Vec<WireWarningArea>,
}

#[derive(Debug, Deserialize)]
struct WireWarningArea {
    #[serde(
        rename = "AreaDesc",
        alias = "AreaName",
        deserialize_with = "wire::required_text"
    )]
    area: String,
    #[serde(rename = "WaveHeight", default, deserialize_with = "wire::opt_text")]
    wave_height: Option<String>,
    #[serde(rename = "ArrivalTime", default, deserialize_with = "wire::opt_text")]
    arrival_time: Option<String>,
}

pub(crate) static VARIANTS: &[Variant<Vec<WireTsunami>>] = &[
    Variant {
        name: "records.Tsunami[list]",
        matches: has_record_list,
        extract: extract_records,
    },
    Variant {
        name: "records.Tsunami[empty]",
        matches: has_empty_record_list,
        extract: extract_nothing,
    },
    Variant {
        name: "records.Tsunami{object}",
        matches: has_record_object,
        extract: extract_records,
    },
    Variant {
        name: "result.records.Tsunami",
        matches: has_nested_records,
        extract: extract_nested_records,
    },
    Variant {
        name: "root-bulletin",
        matches: is_root_bulletin,
        extract: extract_root_bulletin,
    },
];

fn has_record_list(raw: &Value) -> bool {
    wire::non_empty_array_at(raw, "/records/Tsunami")
}

fn has_empty_record_list(raw: &Value) -> bool {
    wire::empty_array_at(raw, "/records/Tsunami")
}

fn has_record_object(raw: &Value) -> bool {
    wire::object_at(raw, "/records/Tsunami")
}

fn has_nested_records(raw: &Value) -> bool {
    wire::records_at(raw, "/result/records/Tsunami")
}

fn is_root_bulletin(raw: &Value) -> bool {
    (raw.get("TsunamiNo").is_some() || raw.get("ReportNo").is_some())
        && raw.get("ReportContent").is_some()
}

fn extract_records(raw: &Value) -> Result<Vec<WireTsunami>, NormError> {
    wire::newest_at(raw, "/records/Tsunami", WHAT)
}

fn extract_nothing(_: &Value) -> Result<Vec<WireTsunami>, NormError> {
    Err(NormError::empty("provider published no tsunami bulletins"))
}

fn extract_nested_records(raw: &Value) -> Result<Vec<WireTsunami>, NormError> {
    wire::newest_at(raw, "/result/records/Tsunami", WHAT)
}

fn extract_root_bulletin(raw: &Value) -> Result<Vec<WireTsunami>, NormError> {
    Ok(vec![wire::decode(raw, WHAT)?])
}

/// Normalizes the newest bulletin in the payload.
pub fn normalize(raw: &Value) -> Result<TsunamiBulletin, NormError> {
    let (variant, bulletins) = select(VARIANTS, raw, FeedKind::Tsunami)?;
    let latest = bulletins
        .into_iter()
        .next()
        .ok_or_else(|| NormError::empty(format!("{variant} carried no tsunami bulletins")))?;
    Ok(enrich(latest))
}

fn enrich(wire: WireTsunami) -> TsunamiBulletin {
    let (origin_time, epicenter_location, quake_magnitude) = match wire.earthquake {
        Some(quake) => (
            known_text(quake.origin_time),
            known_text(quake.epicenter.and_then(|epicenter| epicenter.location)),
            magnitude(quake.magnitude),
        ),
        None => (Observed::Unknown, Observed::Unknown, Observed::Unknown),
    };

    TsunamiBulletin {
        bulletin_id: wire.number,
        report_type: known_text(wire.report_type),
        origin_time,
        report_content: wire.report_content,
        epicenter_location,
        magnitude: quake_magnitude,
        warning_areas: wire
            .wave
            .unwrap_or_default()
            .areas
            .into_iter()
            .map(|area| WarningArea {
                area: area.area,
                wave_height: known_text(area.wave_height),
                arrival_time: known_text(area.arrival_time),
            })
            .collect(),
    }
}
