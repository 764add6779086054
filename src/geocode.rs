//! Reverse/forward geocoding over a Nominatim-style HTTP API.
//!
//! Every failure in here degrades to a formatted coordinate string; a
//! geocode problem is never surfaced to the user as a blocking error.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::capabilities::{HttpError, HttpRequest, ValidatedUrl};
use crate::{AppError, ErrorKind, LatLng};

/// Client-identifying header the geocoding provider requires.
pub const GEOCODER_USER_AGENT: &str = "impulse-app/0.1 (contact@impulse.app)";

/// Coordinates are quantized to this many decimals for cache keys and the
/// coordinate-string fallback (~1 m of precision).
pub const COORD_PRECISION: usize = 5;

#[must_use]
pub fn quantize_key(lat: f64, lng: f64) -> String {
    format!("{lat:.0$},{lng:.0$}", COORD_PRECISION)
}

/// Human-readable stand-in for an address when resolution fails.
#[must_use]
pub fn format_coordinate(lat: f64, lng: f64) -> String {
    format!("{lat:.0$}, {lng:.0$}", COORD_PRECISION)
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    base: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardHit {
    pub location: LatLng,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    lat: String,
    lon: String,
    display_name: String,
}

impl GeocodeClient {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let validated = ValidatedUrl::new(base_url)?;
        let base = Url::parse(validated.as_str()).map_err(|e| HttpError::InvalidUrl {
            reason: e.to_string(),
        })?;
        Ok(Self { base })
    }

    fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest, HttpError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl {
                reason: "geocoder base cannot be a base URL".into(),
            })?
            .pop_if_empty()
            .push(path);
        url.query_pairs_mut().extend_pairs(params);

        let url = ValidatedUrl::new(url.as_str())?;
        Ok(HttpRequest::get(&url).with_header("User-Agent", GEOCODER_USER_AGENT))
    }

    pub fn reverse_request(&self, lat: f64, lng: f64) -> Result<HttpRequest, HttpError> {
        let lat = format!("{lat:.0$}", COORD_PRECISION);
        let lon = format!("{lng:.0$}", COORD_PRECISION);
        self.request(
            "reverse",
            &[("format", "jsonv2"), ("lat", &lat), ("lon", &lon)],
        )
    }

    pub fn forward_request(&self, query: &str) -> Result<HttpRequest, HttpError> {
        self.request(
            "search",
            &[("format", "jsonv2"), ("q", query), ("limit", "1")],
        )
    }
}

pub fn parse_reverse(body: &[u8]) -> Result<String, AppError> {
    let response: ReverseResponse = serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorKind::Geocode, e.to_string()))?;
    Ok(response.display_name)
}

/// `None` means the provider found nothing for the query.
pub fn parse_forward(body: &[u8]) -> Result<Option<ForwardHit>, AppError> {
    let rows: Vec<SearchRow> = serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorKind::Geocode, e.to_string()))?;

    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };

    let (Ok(lat), Ok(lng)) = (row.lat.parse::<f64>(), row.lon.parse::<f64>()) else {
        warn!(lat = %row.lat, lon = %row.lon, "geocoder returned unparseable coordinates");
        return Ok(None);
    };

    Ok(Some(ForwardHit {
        location: LatLng::new(lat, lng),
        display_name: row.display_name,
    }))
}

/// Session-scoped address cache keyed by quantized coordinate. Grows
/// monotonically; a single screen instance sees at most a few dozen
/// distinct locations, so there is no eviction. A key's in-flight
/// resolution is tracked so a second click on the same not-yet-resolved
/// marker reuses the pending outcome instead of double-fetching.
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    resolved: HashMap<String, String>,
    pending: HashSet<String>,
}

impl AddressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.resolved.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    /// Returns false if the key is already resolved or already in flight.
    pub fn begin(&mut self, key: &str) -> bool {
        if self.resolved.contains_key(key) || self.pending.contains(key) {
            return false;
        }
        self.pending.insert(key.to_string());
        true
    }

    pub fn complete(&mut self, key: &str, address: String) {
        self.pending.remove(key);
        self.resolved.insert(key.to_string(), address);
    }

    pub fn clear(&mut self) {
        self.resolved.clear();
        self.pending.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
