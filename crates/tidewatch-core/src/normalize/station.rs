//! Weather-station observation shapes, shared by the by-id and by-region feeds.
//!
//! Both the current `records.Station` envelope and the legacy
//! `records.location` element list are reduced to one draft per station
//! before enrichment.

use serde::Deserialize;
use serde_json::Value;

use super::wire::{self, known_number, known_text};
use super::{select, NormError, Variant};
use crate::{FeedKind, Observed, RegionalObservation, StationObservation};

const WHAT: &str = "station observation";

/// Station reading as extracted, before sentinels are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StationDraft {
    station_id: String,
    station_name: String,
    observed_at: String,
    county: Option<String>,
    town: Option<String>,
    weather: Option<String>,
    air_temperature: Option<f64>,
    relative_humidity: Option<f64>,
    wind_speed: Option<f64>,
    wind_direction: Option<f64>,
    air_pressure: Option<f64>,
    precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireStation {
    #[serde(rename = "StationId", deserialize_with = "wire::required_text")]
    id: String,
    #[serde(rename = "StationName", deserialize_with = "wire::required_text")]
    name: String,
    #[serde(rename = "ObsTime")]
    obs_time: WireObsTime,
    #[serde(rename = "GeoInfo", default)]
    geo: Option<WireGeoInfo>,
    #[serde(rename = "WeatherElement", default)]
    elements: Option<WireWeatherElement>,
}

#[derive(Debug, Deserialize)]
struct WireObsTime {
    #[serde(rename = "DateTime", deserialize_with = "wire::required_text")]
    date_time: String,
}

#[derive(Debug, Deserialize)]
struct WireGeoInfo {
    #[serde(rename = "CountyName", default, deserialize_with = "wire::opt_text")]
    county: Option<String>,
    #[serde(rename = "TownName", default, deserialize_with = "wire::opt_text")]
    town: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireWeatherElement {
    #[serde(rename = "Weather", default, deserialize_with = "wire::opt_text")]
    weather: Option<String>,
    #[serde(rename = "Now", default)]
    now: Option<WireNow>,
    #[serde(rename = "WindDirection", default, deserialize_with = "wire::opt_f64")]
    wind_direction: Option<f64>,
    #[serde(rename = "WindSpeed", default, deserialize_with = "wire::opt_f64")]
    wind_speed: Option<f64>,
    #[serde(rename = "AirTemperature", default, deserialize_with = "wire::opt_f64")]
    air_temperature: Option<f64>,
    #[serde(rename = "RelativeHumidity", default, deserialize_with = "wire::opt_f64")]
    relative_humidity: Option<f64>,
    #[serde(rename = "AirPressure", default, deserialize_with = "wire::opt_f64")]
    air_pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireNow {
    #[serde(rename = "Precipitation", default, deserialize_with = "wire::opt_f64")]
    precipitation: Option<f64>,
}

impl From<WireStation> for StationDraft {
    fn from(station: WireStation) -> Self {
        let (county, town) = station
            .geo
            .map(|geo| (geo.county, geo.town))
            .unwrap_or_default();
        let mut draft = Self {
            station_id: station.id,
            station_name: station.name,
            observed_at: station.obs_time.date_time,
            county,
            town,
            ..Self::default()
        };
        if let Some(elements) = station.elements {
            draft.weather = elements.weather;
            draft.precipitation = elements.now.and_then(|now| now.precipitation);
            draft.wind_direction = elements.wind_direction;
            draft.wind_speed = elements.wind_speed;
            draft.air_temperature = elements.air_temperature;
            draft.relative_humidity = elements.relative_humidity;
            draft.air_pressure = elements.air_pressure;
        }
        draft
    }
}

#[derive(Debug, Deserialize)]
struct WireLegacyLocation {
    #[serde(rename = "stationId", deserialize_with = "wire::required_text")]
    id: String,
    #[serde(rename = "locationName", deserialize_with = "wire::required_text")]
    name: String,
    time: WireLegacyTime,
    #[serde(rename = "weatherElement", default)]
    elements: Vec<WireLegacyElement>,
    #[serde(rename = "parameter", default)]
    parameters: Vec<WireLegacyParameter>,
}

#[derive(Debug, Deserialize)]
struct WireLegacyTime {
    #[serde(rename = "obsTime", deserialize_with = "wire::required_text")]
    obs_time: String,
}

#[derive(Debug, Deserialize)]
struct WireLegacyElement {
    #[serde(rename = "elementName")]
    name: String,
    #[serde(rename = "elementValue", default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireLegacyParameter {
    #[serde(rename = "parameterName")]
    name: String,
    #[serde(rename = "parameterValue", default, deserialize_with = "wire::opt_text")]
    value: Option<String>,
}

impl WireLegacyLocation {
    fn element(&self, names: &[&str]) -> Option<&Value> {
        self.elements
            .iter()
            .find(|element| names.contains(&element.name.as_str()))
            .map(|element| element.value.get("value").unwrap_or(&element.value))
    }

    fn reading(&self, names: &[&str]) -> Option<f64> {
        self.element(names).and_then(wire::number)
    }

    fn parameter(&self, name: &str) -> Option<String> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .and_then(|parameter| parameter.value.clone())
    }
}

impl From<WireLegacyLocation> for StationDraft {
    fn from(location: WireLegacyLocation) -> Self {
        // Legacy humidity is a 0..1 fraction.
        let relative_humidity = location
            .reading(&["HUMD"])
            .map(|humidity| {
                if (0.0..=1.0).contains(&humidity) {
                    (humidity * 1000.0).round() / 10.0
                } else {
                    humidity
                }
            });

        Self {
            county: location.parameter("CITY"),
            town: location.parameter("TOWN"),
            weather: location.element(&["Weather"]).and_then(wire::text),
            air_temperature: location.reading(&["TEMP"]),
            relative_humidity,
            wind_speed: location.reading(&["WDSD"]),
            wind_direction: location.reading(&["WDIR"]),
            air_pressure: location.reading(&["PRES"]),
            precipitation: location.reading(&["24R", "H_24R"]),
            station_id: location.id,
            station_name: location.name,
            observed_at: location.time.obs_time,
        }
    }
}

pub(crate) static VARIANTS: &[Variant<Vec<StationDraft>>] = &[
    Variant {
        name: "records.Station[list]",
        matches: has_station_list,
        extract: extract_stations,
    },
    Variant {
        name: "records.Station[empty]",
        matches: has_empty_station_list,
        extract: extract_nothing,
    },
    Variant {
        name: "records.Station{object}",
        matches: has_station_object,
        extract: extract_stations,
    },
    Variant {
        name: "result.records.Station",
        matches: has_nested_stations,
        extract: extract_nested_stations,
    },
    Variant {
        name: "records.location[legacy]",
        matches: has_legacy_locations,
        extract: extract_legacy_locations,
    },
    Variant {
        name: "root-station",
        matches: is_root_station,
        extract: extract_root_station,
    },
];

fn has_station_list(raw: &Value) -> bool {
    wire::non_empty_array_at(raw, "/records/Station")
}

fn has_empty_station_list(raw: &Value) -> bool {
    wire::empty_array_at(raw, "/records/Station")
}

fn has_station_object(raw: &Value) -> bool {
    wire::object_at(raw, "/records/Station")
}

fn has_nested_stations(raw: &Value) -> bool {
    wire::records_at(raw, "/result/records/Station")
}

fn has_legacy_locations(raw: &Value) -> bool {
    wire::records_at(raw, "/records/location")
}

fn is_root_station(raw: &Value) -> bool {
    raw.get("StationId").is_some() && raw.get("ObsTime").is_some()
}

fn drafts<T: serde::de::DeserializeOwned + Into<StationDraft>>(
    raw: &Value,
    pointer: &str,
) -> Result<Vec<StationDraft>, NormError> {
    let stations: Vec<T> = wire::list_at(raw, pointer, WHAT)?;
    Ok(stations.into_iter().map(Into::into).collect())
}

fn extract_stations(raw: &Value) -> Result<Vec<StationDraft>, NormError> {
    drafts::<WireStation>(raw, "/records/Station")
}

fn extract_nothing(_: &Value) -> Result<Vec<StationDraft>, NormError> {
    Err(NormError::empty("provider published no station observations"))
}

fn extract_nested_stations(raw: &Value) -> Result<Vec<StationDraft>, NormError> {
    drafts::<WireStation>(raw, "/result/records/Station")
}

fn extract_legacy_locations(raw: &Value) -> Result<Vec<StationDraft>, NormError> {
    drafts::<WireLegacyLocation>(raw, "/records/location")
}

fn extract_root_station(raw: &Value) -> Result<Vec<StationDraft>, NormError> {
    let station: WireStation = wire::decode(raw, WHAT)?;
    Ok(vec![station.into()])
}

fn extract(raw: &Value, feed: FeedKind) -> Result<Vec<StationDraft>, NormError> {
    let (variant, stations) = select(VARIANTS, raw, feed)?;
    if stations.is_empty() {
        return Err(NormError::empty(format!(
            "{variant} carried no station observations"
        )));
    }
    Ok(stations)
}

/// Normalizes the first station in the payload.
pub fn normalize_single(raw: &Value) -> Result<StationObservation, NormError> {
    let stations = extract(raw, FeedKind::StationObservation)?;
    stations
        .into_iter()
        .next()
        .map(enrich)
        .ok_or_else(|| NormError::empty("no station observation"))
}

/// Normalizes the observation published for `station_id`, ignoring any other station.
///
/// A payload without that station is [`super::NormErrorKind::Unrecognized`], so another
/// station's data is never served under this id.
pub fn normalize_station(raw: &Value, station_id: &str) -> Result<StationObservation, NormError> {
    let stations = extract(raw, FeedKind::StationObservation)?;
    let found = stations
        .iter()
        .map(|draft| draft.station_id.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    stations
        .into_iter()
        .find(|draft| draft.station_id == station_id)
        .map(enrich)
        .ok_or_else(|| {
            NormError::unrecognized(format!(
                "payload has no observation for station {station_id} (found: {found})"
            ))
        })
}

/// Normalizes every station in the payload; the region is the first reported county.
pub fn normalize_regional(raw: &Value) -> Result<RegionalObservation, NormError> {
    let stations: Vec<StationObservation> = extract(raw, FeedKind::RegionalObservation)?
        .into_iter()
        .map(enrich)
        .collect();
    let region = stations
        .iter()
        .find_map(|station| station.county.reported().cloned());

    Ok(RegionalObservation {
        region: Observed::from_option(region),
        stations,
    })
}

fn enrich(draft: StationDraft) -> StationObservation {
    StationObservation {
        station_id: draft.station_id,
        station_name: draft.station_name,
        observed_at: draft.observed_at,
        county: known_text(draft.county),
        town: known_text(draft.town),
        weather: known_text(draft.weather),
        air_temperature: known_number(draft.air_temperature),
        relative_humidity: known_number(draft.relative_humidity),
        wind_speed: known_number(draft.wind_speed),
        wind_direction: known_number(draft.wind_direction),
        air_pressure: known_number(draft.air_pressure),
        precipitation: known_number(draft.precipitation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormErrorKind;
    use serde_json::json;

    fn station(id: &str, county: &str) -> Value {
        json!({
            "StationName": "臺北",
            "StationId": id,
            "ObsTime": {"DateTime": "2026-10-16T08:00:00+08:00"},
            "GeoInfo": {"CountyName": county, "TownName": "中正區"},
            "WeatherElement": {
                "Weather": "陰",
                "Now": {"Precipitation": 0.5},
                "WindDirection": 90,
                "WindSpeed": "2.1",
                "AirTemperature": 23.5,
                "RelativeHumidity": 81,
                "AirPressure": -99
            }
        })
    }

    #[test]
    fn current_envelope_maps_readings_and_sentinels() {
        let raw = json!({"records": {"Station": [station("466920", "臺北市")]}});

        let record = normalize_single(&raw).expect("current shape");

        assert_eq!(record.station_id, "466920");
        assert_eq!(record.county, Observed::Reported(String::from("臺北市")));
        assert_eq!(record.wind_speed, Observed::Reported(2.1));
        assert_eq!(record.precipitation, Observed::Reported(0.5));
        assert_eq!(record.air_pressure, Observed::Unknown);
    }

    #[test]
    fn requested_station_is_picked_out_of_a_longer_list() {
        let raw = json!({"records": {"Station": [
            station("C0A9C0", "臺北市"),
            station("466920", "臺北市")
        ]}});

        let record = normalize_station(&raw, "466920").expect("station present");
        let error = normalize_station(&raw, "467490").expect_err("station absent");

        assert_eq!(record.station_id, "466920");
        assert_eq!(error.kind(), NormErrorKind::Unrecognized);
        assert!(error.message().contains("C0A9C0, 466920"), "{}", error.message());
    }

    #[test]
    fn legacy_element_list_normalizes_to_same_fields() {
        let raw = json!({"records": {"location": [{
            "locationName": "臺北",
            "stationId": "466920",
            "time": {"obsTime": "2026-10-16 08:00:00"},
            "weatherElement": [
                {"elementName": "TEMP", "elementValue": "23.5"},
                {"elementName": "HUMD", "elementValue": {"value": "0.81"}},
                {"elementName": "WDSD", "elementValue": "-99"},
                {"elementName": "Weather", "elementValue": "X"}
            ],
            "parameter": [
                {"parameterName": "CITY", "parameterValue": "臺北市"},
                {"parameterName": "TOWN", "parameterValue": "中正區"}
            ]
        }]}});

        let record = normalize_single(&raw).expect("legacy shape");

        assert_eq!(record.observed_at, "2026-10-16 08:00:00");
        assert_eq!(record.air_temperature, Observed::Reported(23.5));
        assert_eq!(record.relative_humidity, Observed::Reported(81.0));
        assert_eq!(record.wind_speed, Observed::Unknown);
        assert_eq!(record.weather, Observed::Unknown);
        assert_eq!(record.town, Observed::Reported(String::from("中正區")));
        assert_eq!(record.wind_direction, Observed::Unknown);
    }

    #[test]
    fn regional_feed_keeps_every_station() {
        let raw = json!({"records": {"Station": [
            station("C0A9C", "新北市"),
            station("C0AC7", "新北市")
        ]}});

        let record = normalize_regional(&raw).expect("regional shape");

        assert_eq!(record.region, Observed::Reported(String::from("新北市")));
        assert_eq!(record.stations.len(), 2);
    }

    #[test]
    fn lone_station_object_and_nested_result_are_accepted() {
        let expected = normalize_single(&json!({"records": {"Station": [station("466920", "臺北市")]}}))
            .unwrap();

        for shape in [
            json!({"records": {"Station": station("466920", "臺北市")}}),
            json!({"result": {"records": {"Station": [station("466920", "臺北市")]}}}),
            station("466920", "臺北市"),
        ] {
            assert_eq!(normalize_single(&shape).expect("known shape"), expected);
        }
    }

    #[test]
    fn empty_station_lists_are_no_data() {
        for raw in [
            json!({"records": {"Station": []}}),
            json!({"records": {"location": []}}),
        ] {
            let error = normalize_regional(&raw).unwrap_err();
            assert_eq!(error.kind(), NormErrorKind::Empty, "{raw}");
        }
    }

    #[test]
    fn station_without_observation_time_is_incomplete() {
        let raw = json!({"records": {"Station": [{"StationId": "466920", "StationName": "臺北"}]}});

        let error = normalize_single(&raw).unwrap_err();

        assert_eq!(error.kind(), NormErrorKind::Incomplete);
    }
}
