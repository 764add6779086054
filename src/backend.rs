//! Thin client for the managed data backend (PostgREST-style REST over
//! HTTP). The map core only needs two reads: a bulk impulse query ordered
//! by recency and an in-list author-name lookup.

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::capabilities::{HttpError, HttpRequest, ValidatedUrl};
use crate::{AppError, Category, ErrorKind, Impulse, LatLng};

/// Runtime endpoint configuration handed to the core at mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub api_base: String,
    pub api_key: String,
    pub geocoder_base: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.impulse.app".into(),
            api_key: String::new(),
            geocoder_base: "https://nominatim.openstreetmap.org".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    api_key: String,
}

impl BackendClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, HttpError> {
        let validated = ValidatedUrl::new(config.api_base.as_str())?;
        let base = Url::parse(validated.as_str()).map_err(|e| HttpError::InvalidUrl {
            reason: e.to_string(),
        })?;
        Ok(Self {
            base,
            api_key: config.api_key.clone(),
        })
    }

    fn get(&self, table: &str, query: &str) -> Result<HttpRequest, HttpError> {
        let mut url = self.base.clone();
        url.set_path(&format!("/rest/v1/{table}"));
        url.set_query(Some(query));

        let url = ValidatedUrl::new(url.as_str())?;
        Ok(HttpRequest::get(&url)
            .with_header("apikey", &self.api_key)
            .with_header("Authorization", format!("Bearer {}", self.api_key)))
    }

    /// Bulk impulse query, newest first. One call per load/refresh cycle.
    pub fn impulses_request(&self) -> Result<HttpRequest, HttpError> {
        self.get("impulses", "select=*&order=created_at.desc")
    }

    /// By-id author display-name lookup for the given creators.
    pub fn names_request(&self, ids: &[Uuid]) -> Result<HttpRequest, HttpError> {
        let list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.get(
            "profiles",
            &format!("select=id,display_name&id=in.({list})"),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ImpulseRow {
    id: i64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: String,
    creator_id: Uuid,
    created_at: String,
    #[serde(default)]
    location_lat: Option<f64>,
    #[serde(default)]
    location_lng: Option<f64>,
    #[serde(default)]
    scheduled_at: Option<String>,
}

fn parse_created_at(raw: &str, id: i64) -> u64 {
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(ts) => {
            let ms = ts.unix_timestamp_nanos() / 1_000_000;
            u64::try_from(ms).unwrap_or(0)
        }
        Err(e) => {
            warn!(id, raw, error = %e, "unparseable created_at, treating as epoch");
            0
        }
    }
}

impl ImpulseRow {
    fn into_impulse(self) -> Impulse {
        let location = match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        };

        Impulse {
            id: self.id,
            created_at_ms: parse_created_at(&self.created_at, self.id),
            category: Category::parse_or_other(&self.category),
            content: self.content,
            creator_id: self.creator_id,
            location,
            scheduled_at: self.scheduled_at,
            address: None,
        }
    }
}

pub fn parse_impulses(body: &[u8]) -> Result<Vec<Impulse>, AppError> {
    let rows: Vec<ImpulseRow> = serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorKind::DataLoad, e.to_string()))?;
    Ok(rows.into_iter().map(ImpulseRow::into_impulse).collect())
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Uuid,
    #[serde(default)]
    display_name: String,
}

pub fn parse_names(body: &[u8]) -> Result<Vec<(Uuid, String)>, AppError> {
    let rows: Vec<ProfileRow> = serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorKind::DataLoad, e.to_string()))?;
    Ok(rows.into_iter().map(|r| (r.id, r.display_name)).collect())
}
