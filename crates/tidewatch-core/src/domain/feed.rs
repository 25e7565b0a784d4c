use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProviderId, ValidationError};

const MAX_SELECTOR_LEN: usize = 64;

/// Feed identifiers accepted by [`crate::Orchestrator::fetch_feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feed {
    SeismicNormal,
    SeismicSmallArea,
    Tsunami,
    StationObservationById,
    StationObservationByRegion,
    TransitStatusBySystem,
}

impl Feed {
    pub const ALL: [Self; 6] = [
        Self::SeismicNormal,
        Self::SeismicSmallArea,
        Self::Tsunami,
        Self::StationObservationById,
        Self::StationObservationByRegion,
        Self::TransitStatusBySystem,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeismicNormal => "seismic-normal",
            Self::SeismicSmallArea => "seismic-small-area",
            Self::Tsunami => "tsunami",
            Self::StationObservationById => "station-observation-by-id",
            Self::StationObservationByRegion => "station-observation-by-region",
            Self::TransitStatusBySystem => "transit-status-by-system",
        }
    }

    pub const fn kind(self) -> FeedKind {
        match self {
            Self::SeismicNormal | Self::SeismicSmallArea => FeedKind::Seismic,
            Self::Tsunami => FeedKind::Tsunami,
            Self::StationObservationById => FeedKind::StationObservation,
            Self::StationObservationByRegion => FeedKind::RegionalObservation,
            Self::TransitStatusBySystem => FeedKind::TransitStatus,
        }
    }

    pub const fn provider(self) -> ProviderId {
        match self {
            Self::TransitStatusBySystem => ProviderId::Tdx,
            _ => ProviderId::Cwa,
        }
    }

    /// Name of the selector this feed requires, if any.
    pub const fn selector_name(self) -> Option<&'static str> {
        match self {
            Self::StationObservationById => Some("station id"),
            Self::StationObservationByRegion => Some("region"),
            Self::TransitStatusBySystem => Some("transit system"),
            _ => None,
        }
    }
}

impl Display for Feed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feed {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|feed| feed.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidFeed {
                value: value.trim().to_owned(),
            })
    }
}

/// Record family a feed normalizes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Seismic,
    Tsunami,
    StationObservation,
    RegionalObservation,
    TransitStatus,
}

impl FeedKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seismic => "seismic",
            Self::Tsunami => "tsunami",
            Self::StationObservation => "station_observation",
            Self::RegionalObservation => "regional_observation",
            Self::TransitStatus => "transit_status",
        }
    }
}

impl Display for FeedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: a feed plus its feed-specific selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    feed: Feed,
    selector: Option<String>,
}

impl FeedKey {
    /// Builds a key, validating that the selector matches what the feed expects.
    pub fn new(feed: Feed, selector: Option<&str>) -> Result<Self, ValidationError> {
        let selector = selector.map(str::trim).filter(|value| !value.is_empty());

        match (feed.selector_name(), selector) {
            (Some(name), None) => Err(ValidationError::MissingSelector {
                feed: feed.as_str(),
                selector: name,
            }),
            (None, Some(_)) => Err(ValidationError::UnexpectedSelector {
                feed: feed.as_str(),
            }),
            (None, None) => Ok(Self {
                feed,
                selector: None,
            }),
            (Some(_), Some(value)) => {
                validate_selector(value)?;
                Ok(Self {
                    feed,
                    selector: Some(value.to_owned()),
                })
            }
        }
    }

    /// Key for a feed that takes no selector.
    pub fn plain(feed: Feed) -> Result<Self, ValidationError> {
        Self::new(feed, None)
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn kind(&self) -> FeedKind {
        self.feed.kind()
    }

    pub fn provider(&self) -> ProviderId {
        self.feed.provider()
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

impl Display for FeedKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.selector {
            Some(selector) => write!(f, "{}:{}", self.feed, selector),
            None => f.write_str(self.feed.as_str()),
        }
    }
}

fn validate_selector(value: &str) -> Result<(), ValidationError> {
    for (index, ch) in value.chars().enumerate() {
        if index >= MAX_SELECTOR_LEN || ch.is_control() || matches!(ch, '/' | '?' | '#' | '&') {
            return Err(ValidationError::SelectorInvalidChar { ch, index });
        }
    }
    Ok(())
}
