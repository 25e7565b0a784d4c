//! Placeholder records served when neither the provider nor the cache has data.

use crate::{
    Epicenter, FeedKind, NormalizedRecord, Observed, RegionalObservation, SeismicReport,
    ServiceAlert, ServiceState, StationObservation, TransitStatus, TsunamiBulletin, UtcDateTime,
};

/// Text placed in every required field of a synthesized record.
pub const PLACEHOLDER: &str = "data temporarily unavailable";

/// Deterministic identifier for a backup record built at `now`.
pub fn backup_id(kind: FeedKind, now: UtcDateTime) -> String {
    format!("BACKUP-{}-{}", kind.as_str(), now.format_compact())
}

/// Returns `true` when `record_id` was produced by [`backup_id`].
pub fn is_backup_id(record_id: &str) -> bool {
    record_id.starts_with("BACKUP-")
}

/// Builds a structurally complete placeholder record for `kind`.
pub fn synthesize(kind: FeedKind, now: UtcDateTime) -> NormalizedRecord {
    let id = backup_id(kind, now);
    let stamp = now.format_rfc3339();

    match kind {
        FeedKind::Seismic => NormalizedRecord::Seismic(SeismicReport {
            report_id: id,
            report_type: Observed::Unknown,
            origin_time: stamp,
            epicenter: Epicenter {
                location: String::from(PLACEHOLDER),
                latitude: Observed::Unknown,
                longitude: Observed::Unknown,
            },
            depth_km: Observed::Unknown,
            magnitude: Observed::Unknown,
            report_content: String::from(PLACEHOLDER),
            report_color: Observed::Unknown,
            web_url: Observed::Unknown,
            image_uri: Observed::Unknown,
            shaking_areas: Vec::new(),
        }),
        FeedKind::Tsunami => NormalizedRecord::Tsunami(TsunamiBulletin {
            bulletin_id: id,
            report_type: Observed::Unknown,
            origin_time: Observed::Unknown,
            report_content: String::from(PLACEHOLDER),
            epicenter_location: Observed::Unknown,
            magnitude: Observed::Unknown,
            warning_areas: Vec::new(),
        }),
        FeedKind::StationObservation => {
            NormalizedRecord::StationObservation(placeholder_station(id, stamp))
        }
        FeedKind::RegionalObservation => {
            NormalizedRecord::RegionalObservation(RegionalObservation {
                region: Observed::Unknown,
                stations: vec![placeholder_station(id, stamp)],
            })
        }
        FeedKind::TransitStatus => NormalizedRecord::TransitStatus(TransitStatus {
            overall: ServiceState::Unknown,
            alerts: vec![ServiceAlert {
                alert_id: id,
                title: String::from(PLACEHOLDER),
                description: Observed::Unknown,
                status: ServiceState::Unknown,
                effective: Observed::Reported(stamp),
            }],
            updated_at: Observed::Unknown,
        }),
    }
}

fn placeholder_station(id: String, stamp: String) -> StationObservation {
    StationObservation {
        station_id: id,
        station_name: String::from(PLACEHOLDER),
        observed_at: stamp,
        county: Observed::Unknown,
        town: Observed::Unknown,
        weather: Observed::Unknown,
        air_temperature: Observed::Unknown,
        relative_humidity: Observed::Unknown,
        wind_speed: Observed::Unknown,
        wind_direction: Observed::Unknown,
        air_pressure: Observed::Unknown,
        precipitation: Observed::Unknown,
    }
}
