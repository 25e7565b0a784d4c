use serde::{Deserialize, Serialize};

use crate::FeedKind;

/// Optional measurement that is either reported by the provider or explicitly unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Observed<T> {
    Reported(T),
    Unknown,
}

impl<T> Observed<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Unknown, Self::Reported)
    }

    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }

    pub fn reported(&self) -> Option<&T> {
        match self {
            Self::Reported(value) => Some(value),
            Self::Unknown => None,
        }
    }
}

impl<T> Default for Observed<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Where a [`crate::FetchResult`]'s record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Freshly fetched, or served from a cache entry that is still within its TTL.
    Live,
    /// A cache entry past its TTL, served because no fresher data could be obtained.
    Stale,
    /// A synthesized placeholder; no real data was available.
    Backup,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Stale => "stale",
            Self::Backup => "backup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magnitude {
    /// Scale name as published, for example 芮氏規模 or Mw.
    pub scale: Observed<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epicenter {
    pub location: String,
    pub latitude: Observed<f64>,
    pub longitude: Observed<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShakingArea {
    pub area: String,
    pub intensity: String,
}

/// Canonical earthquake report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicReport {
    pub report_id: String,
    pub report_type: Observed<String>,
    /// Origin time exactly as published by the provider (provider-local clock).
    pub origin_time: String,
    pub epicenter: Epicenter,
    pub depth_km: Observed<f64>,
    pub magnitude: Observed<Magnitude>,
    pub report_content: String,
    pub report_color: Observed<String>,
    pub web_url: Observed<String>,
    pub image_uri: Observed<String>,
    pub shaking_areas: Vec<ShakingArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningArea {
    pub area: String,
    pub wave_height: Observed<String>,
    pub arrival_time: Observed<String>,
}

/// Canonical tsunami bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsunamiBulletin {
    pub bulletin_id: String,
    pub report_type: Observed<String>,
    pub origin_time: Observed<String>,
    pub report_content: String,
    pub epicenter_location: Observed<String>,
    pub magnitude: Observed<Magnitude>,
    pub warning_areas: Vec<WarningArea>,
}

/// Canonical weather-station observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationObservation {
    pub station_id: String,
    pub station_name: String,
    pub observed_at: String,
    pub county: Observed<String>,
    pub town: Observed<String>,
    pub weather: Observed<String>,
    pub air_temperature: Observed<f64>,
    pub relative_humidity: Observed<f64>,
    pub wind_speed: Observed<f64>,
    pub wind_direction: Observed<f64>,
    pub air_pressure: Observed<f64>,
    pub precipitation: Observed<f64>,
}

/// All stations reporting for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalObservation {
    pub region: Observed<String>,
    pub stations: Vec<StationObservation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Normal,
    Disrupted,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAlert {
    pub alert_id: String,
    pub title: String,
    pub description: Observed<String>,
    pub status: ServiceState,
    pub effective: Observed<String>,
}

/// Canonical transit-system status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStatus {
    pub overall: ServiceState,
    pub alerts: Vec<ServiceAlert>,
    pub updated_at: Observed<String>,
}

/// The single normalized record shape handed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Seismic(SeismicReport),
    Tsunami(TsunamiBulletin),
    StationObservation(StationObservation),
    RegionalObservation(RegionalObservation),
    TransitStatus(TransitStatus),
}

impl NormalizedRecord {
    pub const fn kind(&self) -> FeedKind {
        match self {
            Self::Seismic(_) => FeedKind::Seismic,
            Self::Tsunami(_) => FeedKind::Tsunami,
            Self::StationObservation(_) => FeedKind::StationObservation,
            Self::RegionalObservation(_) => FeedKind::RegionalObservation,
            Self::TransitStatus(_) => FeedKind::TransitStatus,
        }
    }

    /// Stable identity of the underlying report, used to detect new publications.
    pub fn record_id(&self) -> String {
        match self {
            Self::Seismic(report) => report.report_id.clone(),
            Self::Tsunami(bulletin) => bulletin.bulletin_id.clone(),
            Self::StationObservation(obs) => format!("{}@{}", obs.station_id, obs.observed_at),
            Self::RegionalObservation(regional) => {
                let latest = regional
                    .stations
                    .iter()
                    .map(|obs| obs.observed_at.as_str())
                    .max()
                    .unwrap_or_default();
                let label = regional
                    .region
                    .reported()
                    .or_else(|| regional.stations.first().map(|obs| &obs.station_id));
                match label {
                    Some(label) => format!("{label}@{latest}"),
                    None => format!("region@{latest}"),
                }
            }
            Self::TransitStatus(status) => {
                let alerts = status
                    .alerts
                    .iter()
                    .map(|alert| alert.alert_id.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                match status.updated_at.reported() {
                    Some(updated) => format!("{updated}[{alerts}]"),
                    None => alerts,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_serializes_with_explicit_status() {
        let known = serde_json::to_value(Observed::Reported(4.2_f64)).expect("serialize");
        let unknown = serde_json::to_value(Observed::<f64>::Unknown).expect("serialize");

        assert_eq!(known, serde_json::json!({"status": "reported", "value": 4.2}));
        assert_eq!(unknown, serde_json::json!({"status": "unknown"}));
    }

    #[test]
    fn transit_record_id_tracks_alert_set() {
        let record = NormalizedRecord::TransitStatus(TransitStatus {
            overall: ServiceState::Disrupted,
            alerts: vec![ServiceAlert {
                alert_id: String::from("A1"),
                title: String::from("Signal fault"),
                description: Observed::Unknown,
                status: ServiceState::Disrupted,
                effective: Observed::Unknown,
            }],
            updated_at: Observed::Reported(String::from("2026-10-16T08:00:00+08:00")),
        });

        assert_eq!(record.record_id(), "2026-10-16T08:00:00+08:00[A1]");
        assert_eq!(record.kind(), FeedKind::TransitStatus);
    }

    #[test]
    fn regional_record_id_falls_back_to_first_station() {
        let station = StationObservation {
            station_id: String::from("C0A9C0"),
            station_name: String::from("信義"),
            observed_at: String::from("2026-10-16T08:00:00+08:00"),
            county: Observed::Unknown,
            town: Observed::Unknown,
            weather: Observed::Unknown,
            air_temperature: Observed::Unknown,
            relative_humidity: Observed::Unknown,
            wind_speed: Observed::Unknown,
            wind_direction: Observed::Unknown,
            air_pressure: Observed::Unknown,
            precipitation: Observed::Unknown,
        };
        let record = NormalizedRecord::RegionalObservation(RegionalObservation {
            region: Observed::Unknown,
            stations: vec![station],
        });

        assert_eq!(record.record_id(), "C0A9C0@2026-10-16T08:00:00+08:00");
    }
}
