//! # Domain Models
//!
//! Canonical domain types for tidewatch feeds.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Feed`] | Provider/domain identifier (`seismic-normal`, `tsunami`, ...) |
//! | [`FeedKey`] | Feed plus selector; the cache key |
//! | [`FeedKind`] | Record family the normalizer dispatches on |
//! | [`NormalizedRecord`] | Tagged union over all canonical records |
//! | [`Observed`] | Optional measurement: reported or explicitly unknown |
//! | [`Provenance`] | Live, stale or backup origin of a result |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Feed keys enforce their selector rules at construction time:
//!
//! ```rust
//! use tidewatch_core::{Feed, FeedKey, ValidationError};
//!
//! let key = FeedKey::new(Feed::StationObservationById, Some("466920")).unwrap();
//! assert_eq!(key.to_string(), "station-observation-by-id:466920");
//!
//! let missing = FeedKey::new(Feed::StationObservationById, None);
//! assert!(matches!(missing, Err(ValidationError::MissingSelector { .. })));
//! ```

mod feed;
mod records;
mod timestamp;

pub use feed::{Feed, FeedKey, FeedKind};
pub use records::{
    Epicenter, Magnitude, NormalizedRecord, Observed, Provenance, RegionalObservation,
    SeismicReport, ServiceAlert, ServiceState, ShakingArea, StationObservation, TransitStatus,
    TsunamiBulletin, WarningArea,
};
pub use timestamp::UtcDateTime;
