//! Provider JSON to [`NormalizedRecord`] mapping.
//!
//! Each feed kind owns an ordered table of [`Variant`]s, one per known
//! response shape. The first variant whose predicate matches is the only one
//! whose extractor runs. Optional fields are filled with explicit
//! [`crate::Observed::Unknown`] placeholders by a separate enrichment step
//! after extraction; required fields are never defaulted.
//!
//! A degraded-service stub (a `result` object holding exactly
//! `resource_id` and `fields`, with no records anywhere) is detected before
//! any variant is consulted and reported as
//! [`NormErrorKind::UpstreamDegraded`].

pub mod seismic;
pub mod station;
pub mod transit;
pub mod tsunami;
mod wire;

use std::fmt::{Display, Formatter};

use serde_json::Value;
use tracing::trace;

use crate::{FeedKey, FeedKind, NormalizedRecord};

/// Normalization failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormErrorKind {
    /// Provider returned its schema metadata but no records; usually a credential problem.
    UpstreamDegraded,
    /// No known variant matches the payload shape.
    Unrecognized,
    /// A known shape carrying zero records: the provider has no data right now.
    Empty,
    /// A variant matched but a required field is missing or mistyped.
    Incomplete,
}

/// Typed normalization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormError {
    kind: NormErrorKind,
    message: String,
    variant: Option<&'static str>,
}

impl NormError {
    pub fn upstream_degraded(message: impl Into<String>) -> Self {
        Self::new(NormErrorKind::UpstreamDegraded, message)
    }

    pub fn unrecognized(message: impl Into<String>) -> Self {
        Self::new(NormErrorKind::Unrecognized, message)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(NormErrorKind::Empty, message)
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::new(NormErrorKind::Incomplete, message)
    }

    fn new(kind: NormErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            variant: None,
        }
    }

    fn in_variant(mut self, variant: &'static str) -> Self {
        self.variant.get_or_insert(variant);
        self
    }

    pub const fn kind(&self) -> NormErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the variant whose extractor failed, if one matched.
    pub const fn variant(&self) -> Option<&'static str> {
        self.variant
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            NormErrorKind::UpstreamDegraded => "normalize.upstream_degraded",
            NormErrorKind::Unrecognized => "normalize.unrecognized",
            NormErrorKind::Empty => "normalize.empty",
            NormErrorKind::Incomplete => "normalize.incomplete",
        }
    }
}

impl Display for NormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.variant {
            Some(variant) => write!(f, "{} [{}] ({})", self.message, variant, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for NormError {}

/// One known response shape: a predicate and the extractor that handles it.
pub struct Variant<T> {
    pub name: &'static str,
    pub matches: fn(&Value) -> bool,
    pub extract: fn(&Value) -> Result<T, NormError>,
}

/// Runs the extractor of the first matching variant.
///
/// Returns the matched variant's name with the extracted value. Later
/// variants are never tried, even when the matched extractor fails.
pub fn select<T>(
    variants: &[Variant<T>],
    raw: &Value,
    feed: FeedKind,
) -> Result<(&'static str, T), NormError> {
    let variant = variants
        .iter()
        .find(|variant| (variant.matches)(raw))
        .ok_or_else(|| {
            NormError::unrecognized(format!(
                "{feed} payload matches none of {} known shapes (top-level keys: {})",
                variants.len(),
                top_level_keys(raw)
            ))
        })?;

    trace!(%feed, variant = variant.name, "matched payload variant");
    let extracted = (variant.extract)(raw).map_err(|error| error.in_variant(variant.name))?;
    Ok((variant.name, extracted))
}

/// Maps the payload fetched for `key` into its canonical record.
///
/// Same as [`normalize`], except that a single-station feed only accepts the
/// station named by the key's selector.
pub fn normalize_for(key: &FeedKey, raw: &Value) -> Result<NormalizedRecord, NormError> {
    match (key.kind(), key.selector()) {
        (FeedKind::StationObservation, Some(station_id)) => {
            reject_stub(raw)?;
            station::normalize_station(raw, station_id).map(NormalizedRecord::StationObservation)
        }
        (kind, _) => normalize(kind, raw),
    }
}

fn reject_stub(raw: &Value) -> Result<(), NormError> {
    if is_degraded_stub(raw) {
        return Err(NormError::upstream_degraded(
            "provider returned schema metadata without records; check API credentials",
        ));
    }
    Ok(())
}

/// Maps a provider payload for `kind` into its canonical record.
pub fn normalize(kind: FeedKind, raw: &Value) -> Result<NormalizedRecord, NormError> {
    reject_stub(raw)?;

    match kind {
        FeedKind::Seismic => seismic::normalize(raw).map(NormalizedRecord::Seismic),
        FeedKind::Tsunami => tsunami::normalize(raw).map(NormalizedRecord::Tsunami),
        FeedKind::StationObservation => {
            station::normalize_single(raw).map(NormalizedRecord::StationObservation)
        }
        FeedKind::RegionalObservation => {
            station::normalize_regional(raw).map(NormalizedRecord::RegionalObservation)
        }
        FeedKind::TransitStatus => transit::normalize(raw).map(NormalizedRecord::TransitStatus),
    }
}

/// Detects the schema-only stub a provider returns when it serves no records.
///
/// A payload that carries a non-empty `records` anywhere is never a stub,
/// whatever its `result` looks like.
pub fn is_degraded_stub(raw: &Value) -> bool {
    let carries_records = ["/records", "/result/records"]
        .iter()
        .any(|pointer| raw.pointer(pointer).is_some_and(wire::is_non_empty));
    if carries_records {
        return false;
    }

    raw.get("result")
        .and_then(Value::as_object)
        .is_some_and(|result| {
            result.len() == 2 && result.contains_key("resource_id") && result.contains_key("fields")
        })
}

fn top_level_keys(raw: &Value) -> String {
    match raw {
        Value::Object(map) if map.is_empty() => String::from("<none>"),
        Value::Object(map) => map.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
        Value::Array(_) => String::from("<array>"),
        other => format!("<{}>", json_type(other)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_only_result_is_degraded() {
        let raw = json!({
            "success": "true",
            "result": {
                "resource_id": "E-A0015-001",
                "fields": [{"id": "EarthquakeNo", "type": "Integer"}]
            }
        });

        assert!(is_degraded_stub(&raw));
        for kind in [
            FeedKind::Seismic,
            FeedKind::Tsunami,
            FeedKind::StationObservation,
            FeedKind::RegionalObservation,
            FeedKind::TransitStatus,
        ] {
            let error = normalize(kind, &raw).expect_err("stub never normalizes");
            assert_eq!(error.kind(), NormErrorKind::UpstreamDegraded, "{kind}");
        }
    }

    #[test]
    fn extra_result_keys_are_not_the_stub() {
        let raw = json!({
            "result": {"resource_id": "X", "fields": [], "limit": 1}
        });

        assert!(!is_degraded_stub(&raw));
        let error = normalize(FeedKind::Seismic, &raw).expect_err("unknown shape");
        assert_eq!(error.kind(), NormErrorKind::Unrecognized);
    }

    #[test]
    fn records_take_priority_over_stub_result() {
        let raw = json!({
            "result": {"resource_id": "X", "fields": []},
            "records": {"Earthquake": [{
                "EarthquakeNo": 113001,
                "ReportContent": "Felt report",
                "EarthquakeInfo": {
                    "OriginTime": "2024-04-03 07:58:09",
                    "Epicenter": {"Location": "Hualien"}
                }
            }]}
        });

        assert!(!is_degraded_stub(&raw));
        let record = normalize(FeedKind::Seismic, &raw).expect("records win");
        assert_eq!(record.record_id(), "113001");
    }

    #[test]
    fn empty_records_do_not_mask_the_stub() {
        let raw = json!({
            "records": {},
            "result": {"resource_id": "X", "fields": []}
        });

        assert!(is_degraded_stub(&raw));
    }

    #[test]
    fn select_reports_failing_variant_without_trying_later_ones() {
        fn always(_: &Value) -> bool {
            true
        }
        fn fails(_: &Value) -> Result<u8, NormError> {
            Err(NormError::incomplete("missing field"))
        }
        fn succeeds(_: &Value) -> Result<u8, NormError> {
            Ok(7)
        }

        let variants = [
            Variant {
                name: "first",
                matches: always,
                extract: fails,
            },
            Variant {
                name: "second",
                matches: always,
                extract: succeeds,
            },
        ];

        let error = select(&variants, &json!({}), FeedKind::Seismic).expect_err("first wins");
        assert_eq!(error.kind(), NormErrorKind::Incomplete);
        assert_eq!(error.variant(), Some("first"));
    }

    #[test]
    fn unrecognized_error_names_top_level_keys() {
        let error = normalize(FeedKind::Tsunami, &json!({"foo": 1, "bar": 2}))
            .expect_err("unknown shape");

        assert_eq!(error.kind(), NormErrorKind::Unrecognized);
        assert!(error.message().contains("bar, foo"), "{}", error.message());
    }
}
