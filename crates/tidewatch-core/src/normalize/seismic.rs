//! Earthquake report shapes.
//!
//! | Variant | Shape |
//! |---|---|
//! | `records.Earthquake[list]` | current envelope, newest report first |
//! | `records.Earthquake[empty]` | current envelope with no reports |
//! | `records.Earthquake{object}` | single report not wrapped in a list |
//! | `result.records.Earthquake` | records nested under `result` |
//! | `datasetDescription+Earthquake` | legacy root-level dataset |
//! | `root-report` | bare report object |

use serde::Deserialize;
use serde_json::Value;

use super::wire::{self, known_number, known_text};
use super::{select, NormError, Variant};
use crate::{Epicenter, FeedKind, Magnitude, Observed, SeismicReport, ShakingArea};

const WHAT: &str = "earthquake report";

#[derive(Debug, Deserialize)]
pub(crate) struct WireEarthquake {
    #[serde(rename = "EarthquakeNo", deserialize_with = "wire::required_text")]
    number: String,
    #[serde(rename = "ReportType", default, deserialize_with = "wire::opt_text")]
    report_type: Option<String>,
    #[serde(rename = "ReportColor", default, deserialize_with = "wire::opt_text")]
    report_color: Option<String>,
    #[serde(rename = "ReportContent", deserialize_with = "wire::required_text")]
    report_content: String,
    #[serde(rename = "ReportImageURI", default, deserialize_with = "wire::opt_text")]
    image_uri: Option<String>,
    #[serde(rename = "Web", default, deserialize_with = "wire::opt_text")]
    web: Option<String>,
    #[serde(rename = "EarthquakeInfo")]
    info: WireEarthquakeInfo,
    #[serde(rename = "Intensity", default)]
    intensity: Option<WireIntensity>,
}

#[derive(Debug, Deserialize)]
struct WireEarthquakeInfo {
    #[serde(rename = "OriginTime", deserialize_with = "wire::required_text")]
    origin_time: String,
    #[serde(rename = "FocalDepth", default, deserialize_with = "wire::opt_f64")]
    focal_depth: Option<f64>,
    #[serde(rename = "Epicenter")]
    epicenter: WireEpicenter,
    #[serde(rename = "EarthquakeMagnitude", alias = "Magnitude", default)]
    magnitude: Option<WireMagnitude>,
}

#[derive(Debug, Deserialize)]
struct WireEpicenter {
    #[serde(rename = "Location", deserialize_with = "wire::required_text")]
    location: String,
    #[serde(rename = "EpicenterLatitude", default, deserialize_with = "wire::opt_f64")]
    latitude: Option<f64>,
    #[serde(rename = "EpicenterLongitude", default, deserialize_with = "wire::opt_f64")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMagnitude {
    #[serde(rename = "MagnitudeType", default, deserialize_with = "wire::opt_text")]
    scale: Option<String>,
    #[serde(rename = "MagnitudeValue", default, deserialize_with = "wire::opt_f64")]
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireIntensity {
    #[serde(rename = "ShakingArea", default)]
    areas: Vec<WireShakingArea>,
}

#[derive(Debug, Deserialize)]
struct WireShakingArea {
    #[serde(rename = "AreaDesc", default, deserialize_with = "wire::opt_text")]
    description: Option<String>,
    #[serde(rename = "CountyName", default, deserialize_with = "wire::opt_text")]
    county: Option<String>,
    #[serde(rename = "AreaIntensity", default, deserialize_with = "wire::opt_text")]
    intensity: Option<String>,
}

pub(crate) static VARIANTS: &[Variant<Vec<WireEarthquake>>] = &[
    Variant {
        name: "records.Earthquake[list]",
        matches: has_record_list,
        extract: extract_records,
    },
    Variant {
        name: "records.Earthquake[empty]",
        matches: has_empty_record_list,
        extract: extract_nothing,
    },
    Variant {
        name: "records.Earthquake{object}",
        matches: has_record_object,
        extract: extract_records,
    },
    Variant {
        name: "result.records.Earthquake",
        matches: has_nested_records,
        extract: extract_nested_records,
    },
    Variant {
        name: "datasetDescription+Earthquake",
        matches: is_legacy_dataset,
        extract: extract_legacy_dataset,
    },
    Variant {
        name: "root-report",
        matches: is_root_report,
        extract: extract_root_report,
    },
];

fn has_record_list(raw: &Value) -> bool {
    wire::non_empty_array_at(raw, "/records/Earthquake")
}

fn has_empty_record_list(raw: &Value) -> bool {
    wire::empty_array_at(raw, "/records/Earthquake")
}

fn has_record_object(raw: &Value) -> bool {
    wire::object_at(raw, "/records/Earthquake")
}

fn has_nested_records(raw: &Value) -> bool {
    wire::records_at(raw, "/result/records/Earthquake")
}

fn is_legacy_dataset(raw: &Value) -> bool {
    raw.get("datasetDescription").is_some() && wire::records_at(raw, "/Earthquake")
}

fn is_root_report(raw: &Value) -> bool {
    raw.get("EarthquakeNo").is_some() && raw.get("EarthquakeInfo").is_some()
}

fn extract_records(raw: &Value) -> Result<Vec<WireEarthquake>, NormError> {
    wire::newest_at(raw, "/records/Earthquake", WHAT)
}

fn extract_nothing(_: &Value) -> Result<Vec<WireEarthquake>, NormError> {
    Err(NormError::empty("provider published no earthquake reports"))
}

fn extract_nested_records(raw: &Value) -> Result<Vec<WireEarthquake>, NormError> {
    wire::newest_at(raw, "/result/records/Earthquake", WHAT)
}

fn extract_legacy_dataset(raw: &Value) -> Result<Vec<WireEarthquake>, NormError> {
    wire::newest_at(raw, "/Earthquake", WHAT)
}

fn extract_root_report(raw: &Value) -> Result<Vec<WireEarthquake>, NormError> {
    Ok(vec![wire::decode(raw, WHAT)?])
}

/// Normalizes the newest report in the payload.
pub fn normalize(raw: &Value) -> Result<SeismicReport, NormError> {
    let (variant, reports) = select(VARIANTS, raw, FeedKind::Seismic)?;
    let latest = reports.into_iter().next().ok_or_else(|| {
        NormError::empty(format!("{variant} carried no earthquake reports"))
    })?;
    Ok(enrich(latest))
}

pub(crate) fn magnitude(wire: Option<WireMagnitude>) -> Observed<Magnitude> {
    let Some(WireMagnitude { scale, value }) = wire else {
        return Observed::Unknown;
    };
    match known_number(value) {
        Observed::Reported(value) => Observed::Reported(Magnitude {
            scale: known_text(scale),
            value,
        }),
        Observed::Unknown => Observed::Unknown,
    }
}

fn enrich(wire: WireEarthquake) -> SeismicReport {
    let WireEarthquake {
        number,
        report_type,
        report_color,
        report_content,
        image_uri,
        web,
        info,
        intensity,
    } = wire;

    let shaking_areas = intensity
        .unwrap_or_default()
        .areas
        .into_iter()
        .filter_map(|area| {
            let name = area.county.or(area.description)?;
            Some(ShakingArea {
                area: name,
                intensity: area.intensity.unwrap_or_else(|| String::from("unknown")),
            })
        })
        .collect();

    SeismicReport {
        report_id: number,
        report_type: known_text(report_type),
        origin_time: info.origin_time,
        epicenter: Epicenter {
            location: info.epicenter.location,
            latitude: known_number(info.epicenter.latitude),
            longitude: known_number(info.epicenter.longitude),
        },
        depth_km: known_number(info.focal_depth),
        magnitude: magnitude(info.magnitude),
        report_content,
        report_color: known_text(report_color),
        web_url: known_text(web),
        image_uri: known_text(image_uri),
        shaking_areas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormErrorKind;
    use serde_json::json;

    fn report(number: i64) -> Value {
        json!({
            "EarthquakeNo": number,
            "ReportType": "地震報告",
            "ReportColor": "綠色",
            "ReportContent": "10/16-08:12花蓮縣近海發生規模4.6有感地震",
            "ReportImageURI": "https://example.test/eq.png",
            "Web": "https://example.test/eq",
            "EarthquakeInfo": {
                "OriginTime": "2026-10-16 08:12:41",
                "Source": "中央氣象署",
                "FocalDepth": 21.4,
                "Epicenter": {
                    "Location": "花蓮縣政府東方 30.2 公里",
                    "EpicenterLatitude": 23.93,
                    "EpicenterLongitude": 121.9
                },
                "EarthquakeMagnitude": {"MagnitudeType": "芮氏規模", "MagnitudeValue": 4.6}
            },
            "Intensity": {"ShakingArea": [
                {"AreaDesc": "最大震度3級地區", "CountyName": "花蓮縣", "AreaIntensity": "3級"},
                {"AreaDesc": "最大震度2級地區", "AreaIntensity": "2級"}
            ]}
        })
    }

    #[test]
    fn current_envelope_picks_newest_report() {
        let raw = json!({"success": "true", "records": {"Earthquake": [report(115071), report(115070)]}});

        let record = normalize(&raw).expect("current shape");

        assert_eq!(record.report_id, "115071");
        assert_eq!(record.depth_km, Observed::Reported(21.4));
        assert_eq!(
            record.magnitude,
            Observed::Reported(Magnitude {
                scale: Observed::Reported(String::from("芮氏規模")),
                value: 4.6
            })
        );
        assert_eq!(record.shaking_areas.len(), 2);
        assert_eq!(record.shaking_areas[0].area, "花蓮縣");
        assert_eq!(record.shaking_areas[1].area, "最大震度2級地區");
    }

    #[test]
    fn empty_list_is_no_data_not_unrecognized() {
        let error = normalize(&json!({"records": {"Earthquake": []}})).unwrap_err();
        assert_eq!(error.kind(), NormErrorKind::Empty);
    }

    #[test]
    fn every_drifted_shape_yields_the_same_report() {
        let shapes = [
            json!({"records": {"Earthquake": report(115071)}}),
            json!({"result": {"resource_id": "E-A0015-001"}, "records": {"Earthquake": [report(115071)]}}),
            json!({"result": {"records": {"Earthquake": [report(115071)]}}}),
            json!({"datasetDescription": "地震報告", "Earthquake": [report(115071)]}),
            report(115071),
        ];

        let expected = normalize(&json!({"records": {"Earthquake": [report(115071)]}})).unwrap();
        for shape in shapes {
            assert_eq!(normalize(&shape).expect("known shape"), expected, "{shape}");
        }
    }

    #[test]
    fn optional_fields_become_unknown() {
        let raw = json!({"records": {"Earthquake": [{
            "EarthquakeNo": "115072",
            "ReportContent": "小區域有感地震",
            "EarthquakeInfo": {
                "OriginTime": "2026-10-16 09:00:00",
                "FocalDepth": "-99",
                "Epicenter": {"Location": "宜蘭縣", "EpicenterLatitude": "X"}
            }
        }]}});

        let record = normalize(&raw).expect("sparse report");

        assert_eq!(record.report_type, Observed::Unknown);
        assert_eq!(record.depth_km, Observed::Unknown);
        assert_eq!(record.magnitude, Observed::Unknown);
        assert_eq!(record.epicenter.latitude, Observed::Unknown);
        assert_eq!(record.image_uri, Observed::Unknown);
        assert!(record.shaking_areas.is_empty());
    }

    #[test]
    fn missing_required_field_is_incomplete_not_defaulted() {
        let raw = json!({"records": {"Earthquake": [{
            "EarthquakeNo": 115073,
            "ReportContent": "missing origin",
            "EarthquakeInfo": {"Epicenter": {"Location": "臺東縣"}}
        }]}});

        let error = normalize(&raw).unwrap_err();

        assert_eq!(error.kind(), NormErrorKind::Incomplete);
        assert_eq!(error.variant(), Some("records.Earthquake[list]"));
        assert!(error.message().contains("OriginTime"), "{}", error.message());
    }

    #[test]
    fn unknown_shape_is_unrecognized() {
        let error = normalize(&json!({"records": {"Quake": []}})).unwrap_err();
        assert_eq!(error.kind(), NormErrorKind::Unrecognized);
    }
}
