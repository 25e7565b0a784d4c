//! Provider request construction for each feed.

use crate::config::Settings;
use crate::http_client::{HttpAuth, HttpRequest};
use crate::token::OAuthToken;
use crate::{Feed, FeedKey};

/// Upper bound on alerts requested from the transit provider.
const TRANSIT_ALERT_LIMIT: &str = "30";

/// Open-data dataset serving `feed`, or `None` for feeds of another provider.
pub const fn cwa_dataset(feed: Feed) -> Option<&'static str> {
    match feed {
        Feed::SeismicNormal => Some("E-A0015-001"),
        Feed::SeismicSmallArea => Some("E-A0016-001"),
        Feed::Tsunami => Some("E-A0014-001"),
        Feed::StationObservationById | Feed::StationObservationByRegion => Some("O-A0001-001"),
        Feed::TransitStatusBySystem => None,
    }
}

/// Record limit sent with the request; regional feeds want every station.
const fn cwa_limit(feed: Feed) -> Option<&'static str> {
    match feed {
        Feed::StationObservationByRegion | Feed::TransitStatusBySystem => None,
        _ => Some("1"),
    }
}

fn join(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// `GET {base}/{dataset}` with the API key, limit, JSON format and selector parameters.
pub fn cwa_request(settings: &Settings, key: &FeedKey) -> HttpRequest {
    let dataset = cwa_dataset(key.feed()).unwrap_or_default();
    let mut request = HttpRequest::get(join(&settings.cwa_base_url, dataset));

    if let Some(api_key) = &settings.cwa_api_key {
        request = request.with_query("Authorization", api_key.expose());
    }
    if let Some(limit) = cwa_limit(key.feed()) {
        request = request.with_query("limit", limit);
    }
    request = request.with_query("format", "JSON");

    match (key.feed(), key.selector()) {
        (Feed::StationObservationById, Some(station)) => {
            request = request.with_query("StationId", station);
        }
        (Feed::StationObservationByRegion, Some(county)) => {
            request = request.with_query("CountyName", county);
        }
        _ => {}
    }

    request.with_timeout(settings.timeout)
}

/// `GET {base}/{system}` with `$top`, `$format=JSON` and a bearer token.
pub fn tdx_request(settings: &Settings, key: &FeedKey, token: &OAuthToken) -> HttpRequest {
    let system = key.selector().unwrap_or_default();
    HttpRequest::get(join(&settings.tdx_base_url, system))
        .with_query("$top", TRANSIT_ALERT_LIMIT)
        .with_query("$format", "JSON")
        .with_auth(&HttpAuth::BearerToken(token.access_token().to_owned()))
        .with_timeout(settings.timeout)
}
