//! Core for the impulse map screen: a headless state machine that owns the
//! map lifecycle, marker presentation, focus/detail selection, category
//! filtering, nearest ranking, lazy address resolution and the
//! location-picking mode. Shells (mobile, web) render the [`ViewModel`] and
//! feed interaction back in as [`Event`]s.

pub mod backend;
pub mod capabilities;
pub mod geocode;
pub mod map;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::app::App;
pub use crate::backend::EndpointConfig;
pub use crate::capabilities::{Capabilities, Effect};
pub use crate::map::markers::AnimationKind;
pub use crate::map::{MapPort, SlippyMap, SurfaceSize};

// --- Tunables ---

pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 19.0;
/// Initial zoom around a real GPS fix.
pub const DEFAULT_MAP_ZOOM: f64 = 15.0;
/// Wider initial zoom when only the fallback city center is available.
pub const FALLBACK_MAP_ZOOM: f64 = 11.0;
/// Zoom applied when flying to a focused marker.
pub const FOCUS_ZOOM: f64 = 16.0;

/// How long to wait for a GPS fix before bootstrapping on the fallback
/// center instead.
pub const GEO_FIX_TIMEOUT_MS: u64 = 3_000;
/// If the map has not reached Ready by this deadline, bootstrap is declared
/// failed and the error screen is shown.
pub const MAP_READY_WATCHDOG_MS: u64 = 8_000;

pub const MOUNT_RETRY_MAX: u32 = 5;
pub const MOUNT_RETRY_DELAY_MS: u64 = 200;

/// Upper bound on the nearest-ranked list handed to the view.
pub const NEARBY_MAX: usize = 25;
pub const CONTENT_PREVIEW_LENGTH: usize = 80;

/// City center used when no fix is available.
pub const FALLBACK_CENTER_LAT: f64 = 55.7558;
pub const FALLBACK_CENTER_LNG: f64 = 37.6173;

// --- Errors ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Map widget could not be constructed. Terminal; shows the error screen.
    MapInit,
    /// Bootstrap watchdog fired before the map reached Ready. Terminal.
    BootstrapTimeout,
    /// Impulse or name query failed. Degrades to the previous (or empty)
    /// data set.
    DataLoad,
    /// Address resolution failed. Degrades to a coordinate string.
    Geocode,
}

impl ErrorKind {
    /// Only bootstrap failures block the screen; everything else degrades.
    #[must_use]
    pub const fn is_user_visible(self) -> bool {
        matches!(self, Self::MapInit | Self::BootstrapTimeout)
    }

    #[must_use]
    pub const fn user_facing_message(self) -> &'static str {
        match self {
            Self::MapInit => "The map could not be loaded. Please try again.",
            Self::BootstrapTimeout => "The map is taking too long to load. Please try again.",
            Self::DataLoad => "Events could not be loaded right now.",
            Self::Geocode => "Something went wrong. Please try again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinateError {
    #[error("latitude out of range")]
    LatitudeOutOfRange,
    #[error("longitude out of range")]
    LongitudeOutOfRange,
    #[error("coordinate is not finite")]
    NonFinite,
}

// --- Geography ---

/// Raw coordinate pair as the wire carries it. May be garbage; promote to
/// [`GeoLocation`] before doing geometry with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Coordinate that is finite and within WGS84 ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    lat: f64,
    lng: f64,
}

impl GeoLocation {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange);
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }

    #[must_use]
    pub const fn as_lat_lng(self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl TryFrom<LatLng> for GeoLocation {
    type Error = CoordinateError;

    fn try_from(point: LatLng) -> Result<Self, Self::Error> {
        Self::new(point.lat, point.lng)
    }
}

/// Great-circle distance in kilometers (haversine). The asin argument is
/// clamped so antipodal points cannot produce NaN through rounding.
#[must_use]
pub fn distance_km(a: GeoLocation, b: GeoLocation) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

// --- Localization ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    const fn meters_unit(self) -> &'static str {
        match self {
            Self::En => "m",
            Self::Ru => "м",
        }
    }

    const fn km_unit(self) -> &'static str {
        match self {
            Self::En => "km",
            Self::Ru => "км",
        }
    }

    const fn just_now(self) -> &'static str {
        match self {
            Self::En => "just now",
            Self::Ru => "только что",
        }
    }

    fn minutes_ago(self, n: u64) -> String {
        match self {
            Self::En => format!("{n} min ago"),
            Self::Ru => format!("{n} мин назад"),
        }
    }

    fn hours_ago(self, n: u64) -> String {
        match self {
            Self::En => format!("{n} h ago"),
            Self::Ru => format!("{n} ч назад"),
        }
    }

    fn days_ago(self, n: u64) -> String {
        match self {
            Self::En => format!("{n} d ago"),
            Self::Ru => format!("{n} д назад"),
        }
    }

    fn month_abbrev(self, month: u8) -> &'static str {
        const EN: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        const RU: [&str; 12] = [
            "янв", "фев", "мар", "апр", "мая", "июн", "июл", "авг", "сен", "окт", "ноя", "дек",
        ];
        let index = usize::from(month.clamp(1, 12) - 1);
        match self {
            Self::En => EN[index],
            Self::Ru => RU[index],
        }
    }
}

/// "500 м" below a kilometer, "3.3 км" (one decimal, half away from zero)
/// above. Empty string for anything non-finite or negative.
#[must_use]
pub fn format_distance(km: f64, locale: Locale) -> String {
    if !km.is_finite() || km < 0.0 {
        return String::new();
    }
    if km < 1.0 {
        return format!("{:.0} {}", (km * 1000.0).round(), locale.meters_unit());
    }
    let rounded = (km * 10.0).round() / 10.0;
    format!("{rounded:.1} {}", locale.km_unit())
}

fn short_date(timestamp_ms: u64, locale: Locale) -> String {
    let secs = i64::try_from(timestamp_ms / 1000).unwrap_or(0);
    match time::OffsetDateTime::from_unix_timestamp(secs) {
        Ok(dt) => format!("{} {}", dt.day(), locale.month_abbrev(dt.month() as u8)),
        Err(_) => String::new(),
    }
}

/// Relative-time buckets: just now, minutes, hours, days, then a short
/// localized date. Timestamps slightly in the future (clock skew) read as
/// "just now"; anything further ahead falls through to the date.
#[must_use]
pub fn format_relative_time(timestamp_ms: u64, now_ms: u64, locale: Locale) -> String {
    if timestamp_ms > now_ms {
        if (timestamp_ms - now_ms) / 1000 < 60 {
            return locale.just_now().to_string();
        }
        return short_date(timestamp_ms, locale);
    }

    let secs = (now_ms - timestamp_ms) / 1000;
    if secs < 60 {
        return locale.just_now().to_string();
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return locale.minutes_ago(minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return locale.hours_ago(hours);
    }
    let days = hours / 24;
    if days < 7 {
        return locale.days_ago(days);
    }
    short_date(timestamp_ms, locale)
}

// --- Domain model ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sport,
    Music,
    Food,
    Culture,
    Games,
    Walk,
    Other,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::Sport,
        Self::Music,
        Self::Food,
        Self::Culture,
        Self::Games,
        Self::Walk,
        Self::Other,
    ];

    /// Backend categories outside the closed set collapse to `Other`.
    #[must_use]
    pub fn parse_or_other(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "sport" | "спорт" => Self::Sport,
            "music" | "музыка" => Self::Music,
            "food" | "еда" => Self::Food,
            "culture" | "культура" => Self::Culture,
            "games" | "игры" => Self::Games,
            "walk" | "прогулка" => Self::Walk,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sport => "sport",
            Self::Music => "music",
            Self::Food => "food",
            Self::Culture => "culture",
            Self::Games => "games",
            Self::Walk => "walk",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Sport, Locale::En) => "Sport",
            (Self::Sport, Locale::Ru) => "Спорт",
            (Self::Music, Locale::En) => "Music",
            (Self::Music, Locale::Ru) => "Музыка",
            (Self::Food, Locale::En) => "Food",
            (Self::Food, Locale::Ru) => "Еда",
            (Self::Culture, Locale::En) => "Culture",
            (Self::Culture, Locale::Ru) => "Культура",
            (Self::Games, Locale::En) => "Games",
            (Self::Games, Locale::Ru) => "Игры",
            (Self::Walk, Locale::En) => "Walk",
            (Self::Walk, Locale::Ru) => "Прогулка",
            (Self::Other, Locale::En) => "Other",
            (Self::Other, Locale::Ru) => "Другое",
        }
    }
}

/// A short-lived, geo-tagged event as the rest of the core sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Impulse {
    pub id: i64,
    pub content: String,
    pub category: Category,
    pub creator_id: Uuid,
    pub created_at_ms: u64,
    pub location: Option<LatLng>,
    pub scheduled_at: Option<String>,
    /// Resolved lazily on first focus; None until then.
    pub address: Option<String>,
}

impl Impulse {
    /// None when the wire coordinate is missing or out of range.
    #[must_use]
    pub fn geo_location(&self) -> Option<GeoLocation> {
        self.location.and_then(|p| GeoLocation::try_from(p).ok())
    }

    #[must_use]
    pub fn content_preview(&self) -> String {
        if self.content.chars().count() <= CONTENT_PREVIEW_LENGTH {
            return self.content.clone();
        }
        let cut: String = self.content.chars().take(CONTENT_PREVIEW_LENGTH).collect();
        format!("{}…", cut.trim_end())
    }
}

// --- Screen state ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStatus {
    #[default]
    Loading,
    Ready,
    Error,
}

/// What the screen instance is for. Picking reuses the whole bootstrap but
/// skips data loading and arms the selection overlay instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenPurpose {
    #[default]
    Browse,
    PickLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixConfidence {
    Real,
    #[default]
    Fallback,
}

/// Two-stage marker interaction: first tap focuses, second tap on the same
/// marker opens the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Focused(i64),
    DetailOpen(i64),
}

impl Selection {
    #[must_use]
    pub const fn focused_id(self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Focused(id) | Self::DetailOpen(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickSelection {
    pub location: LatLng,
    /// None while reverse geocoding is in flight.
    pub address: Option<String>,
}

#[derive(Debug, Default)]
pub struct Model {
    pub status: MapStatus,
    pub purpose: ScreenPurpose,
    pub config: EndpointConfig,
    pub locale: Locale,
    pub surface: SurfaceSize,
    pub map: Option<SlippyMap>,

    pub impulses: Vec<Impulse>,
    pub creator_names: HashMap<Uuid, String>,

    pub selection: Selection,
    pub last_clicked_id: Option<i64>,
    pub active_category: Option<Category>,
    /// (impulse id, distance km) sorted nearest first, capped at
    /// [`NEARBY_MAX`]. Empty without a user location.
    pub nearby_ranked: Vec<(i64, f64)>,

    pub address_cache: geocode::AddressCache,
    pub user_location: Option<GeoLocation>,
    pub fix_confidence: FixConfidence,

    pub pick_selection: Option<PickSelection>,

    // Liveness counters. A callback tagged with a stale counter is dropped.
    pub bootstrap_generation: u64,
    pub load_generation: u64,
    pub pick_seq: u64,

    pub mount_attempts: u32,
    pub is_refreshing: bool,
    pub active_error: Option<AppError>,
    pub now_ms: u64,
}

impl Model {
    #[must_use]
    pub fn impulse(&self, id: i64) -> Option<&Impulse> {
        self.impulses.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn nearest_id(&self) -> Option<i64> {
        self.nearby_ranked.first().map(|(id, _)| *id)
    }

    #[must_use]
    pub fn in_select_mode(&self) -> bool {
        self.map.as_ref().is_some_and(SlippyMap::location_select_mode)
    }

    /// Rebuilds the nearest ranking from the full impulse list. The ranking
    /// ignores the category filter: "nearest" means nearest event, period.
    pub fn rank_nearby(&mut self) {
        self.nearby_ranked.clear();
        let Some(user) = self.user_location else {
            return;
        };
        let mut ranked: Vec<(i64, f64)> = self
            .impulses
            .iter()
            .filter_map(|i| i.geo_location().map(|loc| (i.id, distance_km(user, loc))))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(NEARBY_MAX);
        self.nearby_ranked = ranked;
    }

    /// Carries already-resolved addresses onto a freshly loaded list.
    fn hydrate_cached_addresses(&mut self) {
        for impulse in &mut self.impulses {
            if impulse.address.is_some() {
                continue;
            }
            if let Some(point) = impulse.location {
                let key = geocode::quantize_key(point.lat, point.lng);
                if let Some(address) = self.address_cache.get(&key) {
                    impulse.address = Some(address.to_string());
                }
            }
        }
    }

    fn apply_address(&mut self, key: &str, address: &str) {
        for impulse in &mut self.impulses {
            if let Some(point) = impulse.location {
                if geocode::quantize_key(point.lat, point.lng) == key {
                    impulse.address = Some(address.to_string());
                }
            }
        }
    }

    fn distance_text_for(&self, id: i64) -> String {
        self.nearby_ranked
            .iter()
            .find(|(ranked_id, _)| *ranked_id == id)
            .map(|(_, km)| format_distance(*km, self.locale))
            .unwrap_or_default()
    }
}

// --- Events ---

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Shell attached the screen. Resets all state and starts bootstrap.
    Mounted {
        surface: SurfaceSize,
        config: EndpointConfig,
        purpose: ScreenPurpose,
        locale: Locale,
    },
    SurfaceChanged {
        surface: SurfaceSize,
    },
    GotLocation {
        generation: u64,
        result: capabilities::LocationResult,
    },
    MountRetryElapsed {
        generation: u64,
    },
    WatchdogElapsed {
        generation: u64,
    },
    ImpulsesLoaded {
        generation: u64,
        result: capabilities::HttpResult,
    },
    NamesLoaded {
        generation: u64,
        result: capabilities::HttpResult,
    },
    AddressResolved {
        key: String,
        result: capabilities::HttpResult,
    },
    PickAddressResolved {
        seq: u64,
        result: capabilities::HttpResult,
    },

    MarkerTapped {
        id: i64,
    },
    /// Long press skips the focus stage and opens the detail directly.
    MarkerLongPressed {
        id: i64,
    },
    MapClicked {
        lat: f64,
        lng: f64,
    },
    SelectionDismissed,
    CategorySelected {
        category: Option<Category>,
    },
    RefreshRequested,
    RetryRequested,
    EnterPickMode,
    ExitPickMode,
    Unmounted,
}

// --- View model ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerView {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
    pub color: String,
    pub size_px: u32,
    pub glyph: String,
    pub animation: AnimationKind,
    pub is_active: bool,
    pub is_nearest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyItem {
    pub id: i64,
    pub content_preview: String,
    pub category_label: String,
    pub distance_text: String,
    pub time_ago: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseSummary {
    pub id: i64,
    pub content_preview: String,
    pub category_label: String,
    pub distance_text: String,
    pub time_ago: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseDetail {
    pub id: i64,
    pub content: String,
    pub category: String,
    pub category_label: String,
    pub creator_name: Option<String>,
    pub time_ago: String,
    pub scheduled_at: Option<String>,
    pub distance_text: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickSelectionView {
    pub lat: f64,
    pub lng: f64,
    /// Resolved address, or a coordinate string while resolution is
    /// pending or after it failed.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    Loading,
    Ready {
        markers: Vec<MarkerView>,
        nearby: Vec<NearbyItem>,
        focused: Option<ImpulseSummary>,
        detail: Option<ImpulseDetail>,
        /// Last marker the user touched. Unlike the selection this survives
        /// dismissal, so the host can keep highlighting the matching list row.
        last_clicked_id: Option<i64>,
        center_lat: f64,
        center_lng: f64,
        zoom: f64,
        fly_duration_s: f64,
        active_category: Option<String>,
        is_refreshing: bool,
        select_mode_active: bool,
        pick_selection: Option<PickSelectionView>,
    },
    Error {
        message: String,
        is_retryable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub state: ViewState,
    pub locale: Locale,
}

fn current_time_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(0))
        .unwrap_or(0)
}

mod app {
    use tracing::{debug, error, info, warn};

    use crate::capabilities::{
        fold_response, Capabilities, HapticStyle, HttpRequest, HttpResult,
    };
    use crate::geocode::{self, GeocodeClient};
    use crate::map::{ClickAction, MapInitError, MapPort, MarkerContext, SlippyMap};
    use crate::{
        backend, current_time_ms, format_distance, format_relative_time, AppError,
        ErrorKind, Event, FixConfidence, GeoLocation, Impulse, ImpulseDetail, ImpulseSummary,
        LatLng, MapStatus, MarkerView, Model, NearbyItem, PickSelection, PickSelectionView,
        ScreenPurpose, Selection, ViewModel, ViewState, DEFAULT_MAP_ZOOM, FALLBACK_CENTER_LAT,
        FALLBACK_CENTER_LNG, FALLBACK_MAP_ZOOM, FOCUS_ZOOM, GEO_FIX_TIMEOUT_MS,
        MAP_READY_WATCHDOG_MS, MOUNT_RETRY_DELAY_MS, MOUNT_RETRY_MAX,
    };
    use crate::map::DEFAULT_FLY_DURATION_S;

    #[derive(Default)]
    pub struct App;

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        #[allow(clippy::too_many_lines)]
        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            model.now_ms = current_time_ms();

            match event {
                Event::Mounted {
                    surface,
                    config,
                    purpose,
                    locale,
                } => {
                    info!(?purpose, "map screen mounted");
                    let generation = model.bootstrap_generation + 1;
                    *model = Model {
                        config,
                        purpose,
                        locale,
                        surface,
                        bootstrap_generation: generation,
                        now_ms: model.now_ms,
                        ..Model::default()
                    };
                    Self::begin_bootstrap(model, caps);
                    caps.render.render();
                }

                Event::SurfaceChanged { surface } => {
                    model.surface = surface;
                    if let Some(map) = model.map.as_mut() {
                        // Projections go stale otherwise and markers land
                        // misplaced.
                        map.invalidate_size(surface);
                    }
                    caps.render.render();
                }

                Event::GotLocation { generation, result } => {
                    if generation != model.bootstrap_generation {
                        debug!(generation, "dropping location fix from a stale bootstrap");
                        return;
                    }
                    match result {
                        Ok(fix) => match GeoLocation::new(fix.lat, fix.lng) {
                            Ok(location) => {
                                model.user_location = Some(location);
                                model.fix_confidence = FixConfidence::Real;
                            }
                            Err(e) => {
                                warn!(error = %e, "platform returned an invalid fix");
                                model.fix_confidence = FixConfidence::Fallback;
                            }
                        },
                        Err(e) => {
                            // Not user-visible; the fallback center carries
                            // the bootstrap.
                            debug!(error = %e, "no usable fix, bootstrapping on fallback center");
                            model.fix_confidence = FixConfidence::Fallback;
                        }
                    }
                    Self::try_init_map(model, caps);
                    caps.render.render();
                }

                Event::MountRetryElapsed { generation } => {
                    if generation != model.bootstrap_generation || model.map.is_some() {
                        return;
                    }
                    Self::try_init_map(model, caps);
                    caps.render.render();
                }

                Event::WatchdogElapsed { generation } => {
                    if generation != model.bootstrap_generation
                        || model.status != MapStatus::Loading
                    {
                        return;
                    }
                    error!("bootstrap watchdog fired before the map was ready");
                    model.status = MapStatus::Error;
                    model.active_error = Some(AppError::new(
                        ErrorKind::BootstrapTimeout,
                        "map not ready within the watchdog deadline",
                    ));
                    caps.render.render();
                }

                Event::ImpulsesLoaded { generation, result } => {
                    if generation != model.load_generation {
                        debug!(
                            generation,
                            current = model.load_generation,
                            "dropping superseded impulse load"
                        );
                        return;
                    }
                    model.is_refreshing = false;
                    match result {
                        Ok(output) if output.is_success() => {
                            match backend::parse_impulses(&output.body) {
                                Ok(impulses) => {
                                    info!(count = impulses.len(), "impulses loaded");
                                    model.impulses = impulses;
                                    model.hydrate_cached_addresses();
                                    if model
                                        .selection
                                        .focused_id()
                                        .is_some_and(|id| model.impulse(id).is_none())
                                    {
                                        model.selection = Selection::None;
                                    }
                                    model.rank_nearby();
                                    Self::apply_markers(model);
                                    Self::request_names(model, caps);
                                }
                                Err(e) => {
                                    warn!(error = %e, "impulse payload unusable, keeping previous data");
                                }
                            }
                        }
                        Ok(output) => {
                            warn!(status = output.status, "impulse load failed, keeping previous data");
                        }
                        Err(e) => {
                            warn!(error = %e, "impulse load transport error, keeping previous data");
                        }
                    }
                    caps.render.render();
                }

                Event::NamesLoaded { generation, result } => {
                    if generation != model.load_generation {
                        return;
                    }
                    match result {
                        Ok(output) if output.is_success() => {
                            match backend::parse_names(&output.body) {
                                Ok(names) => model.creator_names.extend(names),
                                Err(e) => warn!(error = %e, "name payload unusable"),
                            }
                        }
                        Ok(output) => warn!(status = output.status, "name lookup failed"),
                        Err(e) => warn!(error = %e, "name lookup transport error"),
                    }
                    caps.render.render();
                }

                Event::AddressResolved { key, result } => {
                    if !model.address_cache.is_pending(&key) {
                        debug!(%key, "dropping address for a cleared or unknown key");
                        return;
                    }
                    let address = match result {
                        Ok(output) if output.is_success() => {
                            match geocode::parse_reverse(&output.body) {
                                Ok(name) => name,
                                Err(e) => {
                                    warn!(error = %e, "reverse geocode payload unusable");
                                    Self::fallback_address(&key)
                                }
                            }
                        }
                        Ok(output) => {
                            warn!(status = output.status, "reverse geocode failed");
                            Self::fallback_address(&key)
                        }
                        Err(e) => {
                            warn!(error = %e, "reverse geocode transport error");
                            Self::fallback_address(&key)
                        }
                    };
                    // Failures cache the fallback too, so a key costs at
                    // most one call per screen session.
                    model.address_cache.complete(&key, address.clone());
                    model.apply_address(&key, &address);
                    caps.render.render();
                }

                Event::PickAddressResolved { seq, result } => {
                    if seq != model.pick_seq {
                        debug!(seq, current = model.pick_seq, "dropping superseded pick geocode");
                        return;
                    }
                    let Some(selection) = model.pick_selection.as_mut() else {
                        return;
                    };
                    let fallback = geocode::format_coordinate(
                        selection.location.lat,
                        selection.location.lng,
                    );
                    let address = match result {
                        Ok(output) if output.is_success() => {
                            geocode::parse_reverse(&output.body).unwrap_or(fallback)
                        }
                        _ => fallback,
                    };
                    selection.address = Some(address);
                    caps.render.render();
                }

                Event::MarkerTapped { id } => {
                    if model.status != MapStatus::Ready || model.in_select_mode() {
                        return;
                    }
                    let Some(location) = model.impulse(id).and_then(Impulse::geo_location) else {
                        debug!(id, "tap on unknown or geo-less impulse ignored");
                        return;
                    };
                    model.last_clicked_id = Some(id);

                    match model.selection {
                        Selection::Focused(current) if current == id => {
                            model.selection = Selection::DetailOpen(id);
                            caps.haptics.pulse(HapticStyle::Medium);
                        }
                        Selection::DetailOpen(current) if current == id => {}
                        _ => {
                            model.selection = Selection::Focused(id);
                            if let Some(map) = model.map.as_mut() {
                                map.fly_to(location, Some(FOCUS_ZOOM), DEFAULT_FLY_DURATION_S);
                            }
                            Self::apply_markers(model);
                            Self::resolve_address(model, caps, location.as_lat_lng());
                            caps.haptics.pulse(HapticStyle::Light);
                        }
                    }
                    caps.render.render();
                }

                Event::MarkerLongPressed { id } => {
                    if model.status != MapStatus::Ready || model.in_select_mode() {
                        return;
                    }
                    let Some(location) = model.impulse(id).and_then(Impulse::geo_location) else {
                        return;
                    };
                    model.last_clicked_id = Some(id);
                    model.selection = Selection::DetailOpen(id);
                    if let Some(map) = model.map.as_mut() {
                        map.fly_to(location, Some(FOCUS_ZOOM), DEFAULT_FLY_DURATION_S);
                    }
                    Self::apply_markers(model);
                    Self::resolve_address(model, caps, location.as_lat_lng());
                    caps.haptics.pulse(HapticStyle::Medium);
                    caps.render.render();
                }

                Event::MapClicked { lat, lng } => {
                    let Some(map) = model.map.as_mut() else {
                        return;
                    };
                    match map.handle_click(LatLng::new(lat, lng)) {
                        ClickAction::PointSelected(point) => {
                            // Latest click wins; an in-flight geocode for an
                            // earlier point is superseded by the bumped seq.
                            model.pick_seq += 1;
                            model.pick_selection = Some(PickSelection {
                                location: point,
                                address: None,
                            });
                            caps.haptics.pulse(HapticStyle::Selection);
                            Self::resolve_pick_address(model, caps, point);
                        }
                        ClickAction::MapTapped => {
                            if model.selection != Selection::None {
                                model.selection = Selection::None;
                                Self::apply_markers(model);
                            }
                        }
                        ClickAction::Ignored => return,
                    }
                    caps.render.render();
                }

                Event::SelectionDismissed => {
                    if model.selection != Selection::None {
                        model.selection = Selection::None;
                        Self::apply_markers(model);
                        caps.render.render();
                    }
                }

                Event::CategorySelected { category } => {
                    model.active_category = category;
                    // A selection hidden by the filter would point at a
                    // marker that is no longer on the map.
                    if let (Some(active), Some(id)) = (category, model.selection.focused_id()) {
                        if model.impulse(id).map(|i| i.category) != Some(active) {
                            model.selection = Selection::None;
                        }
                    }
                    Self::apply_markers(model);
                    caps.render.render();
                }

                Event::RefreshRequested => {
                    if model.status != MapStatus::Ready || model.purpose != ScreenPurpose::Browse {
                        return;
                    }
                    Self::start_load(model, caps);
                    caps.render.render();
                }

                Event::RetryRequested => {
                    info!("retry requested, rebuilding the screen from scratch");
                    if let Some(map) = model.map.as_mut() {
                        map.destroy();
                    }
                    let generation = model.bootstrap_generation + 1;
                    *model = Model {
                        config: model.config.clone(),
                        purpose: model.purpose,
                        locale: model.locale,
                        surface: model.surface,
                        bootstrap_generation: generation,
                        load_generation: model.load_generation + 1,
                        pick_seq: model.pick_seq + 1,
                        now_ms: model.now_ms,
                        ..Model::default()
                    };
                    Self::begin_bootstrap(model, caps);
                    caps.render.render();
                }

                Event::EnterPickMode => {
                    let Some(map) = model.map.as_mut() else {
                        warn!("pick mode requested before the map is ready");
                        return;
                    };
                    map.set_location_select_mode(true);
                    caps.render.render();
                }

                Event::ExitPickMode => {
                    if let Some(map) = model.map.as_mut() {
                        map.set_location_select_mode(false);
                    }
                    // Invalidates any in-flight reverse geocode for the
                    // abandoned selection.
                    model.pick_seq += 1;
                    model.pick_selection = None;
                    caps.render.render();
                }

                Event::Unmounted => {
                    if let Some(map) = model.map.as_mut() {
                        map.destroy();
                    }
                    model.map = None;
                    model.status = MapStatus::Loading;
                    model.bootstrap_generation += 1;
                    model.load_generation += 1;
                    model.pick_seq += 1;
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let state = match model.status {
                MapStatus::Loading => ViewState::Loading,
                MapStatus::Error => {
                    let message = model
                        .active_error
                        .as_ref()
                        .map_or("Something went wrong. Please try again.", |e| {
                            e.kind.user_facing_message()
                        })
                        .to_string();
                    ViewState::Error {
                        message,
                        is_retryable: true,
                    }
                }
                MapStatus::Ready => Self::ready_view(model),
            };

            ViewModel {
                state,
                locale: model.locale,
            }
        }
    }

    impl App {
        fn begin_bootstrap(model: &mut Model, caps: &Capabilities) {
            model.status = MapStatus::Loading;
            let generation = model.bootstrap_generation;

            caps.location
                .get_current(GEO_FIX_TIMEOUT_MS, move |result| Event::GotLocation {
                    generation,
                    result,
                });

            let watchdog_generation = generation;
            caps.timer.after(MAP_READY_WATCHDOG_MS, move || {
                Event::WatchdogElapsed {
                    generation: watchdog_generation,
                }
            });
        }

        fn fallback_center() -> GeoLocation {
            GeoLocation::new(FALLBACK_CENTER_LAT, FALLBACK_CENTER_LNG).unwrap_or_default()
        }

        fn try_init_map(model: &mut Model, caps: &Capabilities) {
            let (center, zoom) = match (model.user_location, model.fix_confidence) {
                (Some(location), FixConfidence::Real) => (location, DEFAULT_MAP_ZOOM),
                _ => (Self::fallback_center(), FALLBACK_MAP_ZOOM),
            };

            match SlippyMap::init(model.surface, center, zoom) {
                Ok(mut map) => {
                    info!(
                        lat = center.lat(),
                        lng = center.lng(),
                        zoom,
                        "map initialized"
                    );
                    model.mount_attempts = 0;
                    if model.purpose == ScreenPurpose::PickLocation {
                        map.set_location_select_mode(true);
                    }
                    model.map = Some(map);
                    model.status = MapStatus::Ready;
                    if model.purpose == ScreenPurpose::Browse {
                        Self::start_load(model, caps);
                    }
                }
                Err(MapInitError::SurfaceNotAttached)
                    if model.mount_attempts < MOUNT_RETRY_MAX =>
                {
                    model.mount_attempts += 1;
                    let delay = MOUNT_RETRY_DELAY_MS * u64::from(model.mount_attempts);
                    debug!(
                        attempt = model.mount_attempts,
                        delay_ms = delay,
                        "surface not attached yet, retrying mount"
                    );
                    let generation = model.bootstrap_generation;
                    caps.timer
                        .after(delay, move || Event::MountRetryElapsed { generation });
                }
                Err(e) => {
                    error!(error = %e, "map bootstrap failed");
                    model.status = MapStatus::Error;
                    model.active_error = Some(AppError::new(ErrorKind::MapInit, e.to_string()));
                }
            }
        }

        /// Drives a modeled request through the transport. The callback
        /// always receives the folded [`HttpResult`] the events carry.
        fn send_http<F>(caps: &Capabilities, request: HttpRequest, make_event: F)
        where
            F: FnOnce(HttpResult) -> Event + Send + 'static,
        {
            let mut builder = caps.http.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(move |result| make_event(fold_response(result)));
        }

        fn start_load(model: &mut Model, caps: &Capabilities) {
            model.load_generation += 1;
            let generation = model.load_generation;
            model.is_refreshing = true;

            let request = backend::BackendClient::new(&model.config)
                .and_then(|client| client.impulses_request());
            match request {
                Ok(request) => {
                    Self::send_http(caps, request, move |result| Event::ImpulsesLoaded {
                        generation,
                        result,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "could not build the impulse query, showing an empty map");
                    model.is_refreshing = false;
                    model.impulses.clear();
                    model.nearby_ranked.clear();
                    Self::apply_markers(model);
                }
            }
        }

        fn request_names(model: &Model, caps: &Capabilities) {
            let mut missing: Vec<uuid::Uuid> = model
                .impulses
                .iter()
                .map(|i| i.creator_id)
                .filter(|id| !model.creator_names.contains_key(id))
                .collect();
            missing.sort_unstable();
            missing.dedup();
            if missing.is_empty() {
                return;
            }

            let request = backend::BackendClient::new(&model.config)
                .and_then(|client| client.names_request(&missing));
            match request {
                Ok(request) => {
                    let generation = model.load_generation;
                    Self::send_http(caps, request, move |result| Event::NamesLoaded {
                        generation,
                        result,
                    });
                }
                Err(e) => warn!(error = %e, "could not build the name lookup"),
            }
        }

        fn apply_markers(model: &mut Model) {
            let ctx = MarkerContext {
                active_category: model.active_category,
                nearest_id: model.nearest_id(),
                selected_id: model.selection.focused_id(),
            };
            if let Some(map) = model.map.as_mut() {
                let rendered = map.set_markers(&model.impulses, ctx);
                debug!(rendered, "marker set applied");
            }
        }

        fn fallback_address(key: &str) -> String {
            // Cache keys are "lat,lng"; the display form just adds a space.
            key.replace(',', ", ")
        }

        fn resolve_address(model: &mut Model, caps: &Capabilities, point: LatLng) {
            let key = geocode::quantize_key(point.lat, point.lng);

            if let Some(address) = model.address_cache.get(&key).map(str::to_string) {
                model.apply_address(&key, &address);
                return;
            }
            if !model.address_cache.begin(&key) {
                // Already in flight; its completion applies to every
                // impulse at this key.
                return;
            }

            let request = GeocodeClient::new(&model.config.geocoder_base)
                .and_then(|client| client.reverse_request(point.lat, point.lng));
            match request {
                Ok(request) => {
                    let event_key = key.clone();
                    Self::send_http(caps, request, move |result| Event::AddressResolved {
                        key: event_key,
                        result,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "could not build the reverse geocode request");
                    let fallback = geocode::format_coordinate(point.lat, point.lng);
                    model.address_cache.complete(&key, fallback.clone());
                    model.apply_address(&key, &fallback);
                }
            }
        }

        fn resolve_pick_address(model: &mut Model, caps: &Capabilities, point: LatLng) {
            let seq = model.pick_seq;
            let request = GeocodeClient::new(&model.config.geocoder_base)
                .and_then(|client| client.reverse_request(point.lat, point.lng));
            match request {
                Ok(request) => {
                    Self::send_http(caps, request, move |result| Event::PickAddressResolved {
                        seq,
                        result,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "could not build the pick geocode request");
                    if let Some(selection) = model.pick_selection.as_mut() {
                        selection.address =
                            Some(geocode::format_coordinate(point.lat, point.lng));
                    }
                }
            }
        }

        fn marker_views(model: &Model) -> Vec<MarkerView> {
            let Some(map) = model.map.as_ref() else {
                return Vec::new();
            };
            map.markers()
                .iter()
                .map(|m| MarkerView {
                    id: m.id,
                    lat: m.lat,
                    lng: m.lng,
                    color: m.spec.color.to_string(),
                    size_px: m.spec.base_size_px,
                    glyph: m.spec.glyph.to_string(),
                    animation: m.spec.animation,
                    is_active: m.spec.is_active,
                    is_nearest: m.spec.is_nearest,
                })
                .collect()
        }

        fn nearby_views(model: &Model) -> Vec<NearbyItem> {
            model
                .nearby_ranked
                .iter()
                .filter_map(|(id, km)| {
                    model.impulse(*id).map(|impulse| NearbyItem {
                        id: *id,
                        content_preview: impulse.content_preview(),
                        category_label: impulse.category.label(model.locale).to_string(),
                        distance_text: format_distance(*km, model.locale),
                        time_ago: format_relative_time(
                            impulse.created_at_ms,
                            model.now_ms,
                            model.locale,
                        ),
                    })
                })
                .collect()
        }

        fn summary_view(model: &Model, id: i64) -> Option<ImpulseSummary> {
            let impulse = model.impulse(id)?;
            Some(ImpulseSummary {
                id,
                content_preview: impulse.content_preview(),
                category_label: impulse.category.label(model.locale).to_string(),
                distance_text: model.distance_text_for(id),
                time_ago: format_relative_time(impulse.created_at_ms, model.now_ms, model.locale),
                address: impulse.address.clone(),
            })
        }

        fn detail_view(model: &Model, id: i64) -> Option<ImpulseDetail> {
            let impulse = model.impulse(id)?;
            let location = impulse.geo_location()?;
            Some(ImpulseDetail {
                id,
                content: impulse.content.clone(),
                category: impulse.category.as_str().to_string(),
                category_label: impulse.category.label(model.locale).to_string(),
                creator_name: model.creator_names.get(&impulse.creator_id).cloned(),
                time_ago: format_relative_time(impulse.created_at_ms, model.now_ms, model.locale),
                scheduled_at: impulse.scheduled_at.clone(),
                distance_text: model.distance_text_for(id),
                address: impulse.address.clone(),
                lat: location.lat(),
                lng: location.lng(),
            })
        }

        fn ready_view(model: &Model) -> ViewState {
            let (center, zoom, fly_duration_s, select_mode) =
                model.map.as_ref().map_or_else(
                    || (Self::fallback_center(), FALLBACK_MAP_ZOOM, 0.0, false),
                    |map| {
                        (
                            map.center(),
                            map.zoom(),
                            map.last_fly_duration_s(),
                            map.location_select_mode(),
                        )
                    },
                );

            let focused = match model.selection {
                Selection::Focused(id) => Self::summary_view(model, id),
                _ => None,
            };
            let detail = match model.selection {
                Selection::DetailOpen(id) => Self::detail_view(model, id),
                _ => None,
            };

            let pick_selection = model.pick_selection.as_ref().map(|sel| PickSelectionView {
                lat: sel.location.lat,
                lng: sel.location.lng,
                address: sel.address.clone().unwrap_or_else(|| {
                    geocode::format_coordinate(sel.location.lat, sel.location.lng)
                }),
            });

            ViewState::Ready {
                markers: Self::marker_views(model),
                nearby: Self::nearby_views(model),
                focused,
                detail,
                last_clicked_id: model.last_clicked_id,
                center_lat: center.lat(),
                center_lng: center.lng(),
                zoom,
                fly_duration_s,
                active_category: model.active_category.map(|c| c.as_str().to_string()),
                is_refreshing: model.is_refreshing,
                select_mode_active: select_mode,
                pick_selection,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn geo(lat: f64, lng: f64) -> GeoLocation {
        GeoLocation::new(lat, lng).unwrap()
    }

    #[test]
    fn distance_of_a_point_to_itself_is_zero() {
        let p = geo(55.7558, 37.6173);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_the_equator() {
        let d = distance_km(geo(0.0, 0.0), geo(0.0, 1.0));
        assert!((d - 111.19).abs() < 1.0, "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = distance_km(geo(90.0, 0.0), geo(-90.0, 0.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }

    proptest! {
        #[test]
        fn distance_is_symmetric_and_bounded(
            lat1 in -90.0f64..90.0, lng1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lng2 in -180.0f64..180.0,
        ) {
            let a = geo(lat1, lng1);
            let b = geo(lat2, lng2);
            let d1 = distance_km(a, b);
            let d2 = distance_km(b, a);
            prop_assert!((d1 - d2).abs() < 1e-9);
            prop_assert!(d1 >= 0.0);
            // Half the Earth's circumference is the farthest two points
            // can be.
            prop_assert!(d1 <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }

    #[test]
    fn distance_formatting_sub_kilometer_uses_meters() {
        assert_eq!(format_distance(0.5, Locale::Ru), "500 м");
        assert_eq!(format_distance(0.5, Locale::En), "500 m");
        assert_eq!(format_distance(0.04, Locale::Ru), "40 м");
    }

    #[test]
    fn distance_formatting_kilometers_keep_one_decimal() {
        assert_eq!(format_distance(3.25, Locale::Ru), "3.3 км");
        assert_eq!(format_distance(1.0, Locale::En), "1.0 km");
        assert_eq!(format_distance(12.04, Locale::En), "12.0 km");
    }

    #[test]
    fn distance_formatting_rejects_non_finite() {
        assert_eq!(format_distance(f64::NAN, Locale::En), "");
        assert_eq!(format_distance(f64::INFINITY, Locale::Ru), "");
        assert_eq!(format_distance(-1.0, Locale::En), "");
    }

    #[test]
    fn relative_time_buckets() {
        let now = 1_700_000_000_000;
        assert_eq!(format_relative_time(now - 30_000, now, Locale::En), "just now");
        assert_eq!(
            format_relative_time(now - 5 * 60_000, now, Locale::Ru),
            "5 мин назад"
        );
        assert_eq!(
            format_relative_time(now - 3 * 3_600_000, now, Locale::En),
            "3 h ago"
        );
        assert_eq!(
            format_relative_time(now - 2 * 86_400_000, now, Locale::Ru),
            "2 д назад"
        );
    }

    #[test]
    fn relative_time_old_timestamps_become_a_short_date() {
        let now = 1_700_000_000_000u64; // 2023-11-14
        let month_ago = now - 30 * 86_400_000;
        let text = format_relative_time(month_ago, now, Locale::En);
        assert!(text.contains("Oct"), "got {text}");
    }

    #[test]
    fn relative_time_future_guard() {
        let now = 1_700_000_000_000u64;
        // Small clock skew reads as just now.
        assert_eq!(format_relative_time(now + 10_000, now, Locale::En), "just now");
        // A genuinely future timestamp falls through to the date.
        let text = format_relative_time(now + 10 * 86_400_000, now, Locale::En);
        assert_ne!(text, "just now");
        assert!(!text.is_empty());
    }

    #[test]
    fn category_parsing_collapses_unknown_to_other() {
        assert_eq!(Category::parse_or_other("Sport"), Category::Sport);
        assert_eq!(Category::parse_or_other("спорт"), Category::Sport);
        assert_eq!(Category::parse_or_other("quantum"), Category::Other);
        assert_eq!(Category::parse_or_other(""), Category::Other);
    }

    #[test]
    fn coordinate_validation_rejects_out_of_range() {
        assert!(GeoLocation::new(91.0, 0.0).is_err());
        assert!(GeoLocation::new(0.0, 181.0).is_err());
        assert!(GeoLocation::new(f64::NAN, 0.0).is_err());
        assert!(GeoLocation::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn content_preview_truncates_on_char_boundaries() {
        let impulse = Impulse {
            id: 1,
            content: "я".repeat(200),
            category: Category::Other,
            creator_id: Uuid::nil(),
            created_at_ms: 0,
            location: None,
            scheduled_at: None,
            address: None,
        };
        let preview = impulse.content_preview();
        assert!(preview.chars().count() <= CONTENT_PREVIEW_LENGTH + 1);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn ranking_sorts_nearest_first_and_caps() {
        let user = geo(55.7558, 37.6173);
        let mut model = Model {
            user_location: Some(user),
            ..Model::default()
        };
        for i in 0..40 {
            model.impulses.push(Impulse {
                id: i,
                content: String::new(),
                category: Category::Other,
                creator_id: Uuid::nil(),
                created_at_ms: 0,
                // Farther with every index.
                location: Some(LatLng::new(55.7558 + f64::from(i as i32) * 0.01, 37.6173)),
                scheduled_at: None,
                address: None,
            });
        }
        model.rank_nearby();

        assert_eq!(model.nearby_ranked.len(), NEARBY_MAX);
        assert_eq!(model.nearest_id(), Some(0));
        let distances: Vec<f64> = model.nearby_ranked.iter().map(|(_, d)| *d).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn ranking_is_empty_without_a_user_location() {
        let mut model = Model::default();
        model.impulses.push(Impulse {
            id: 1,
            content: String::new(),
            category: Category::Other,
            creator_id: Uuid::nil(),
            created_at_ms: 0,
            location: Some(LatLng::new(55.75, 37.61)),
            scheduled_at: None,
            address: None,
        });
        model.rank_nearby();
        assert!(model.nearby_ranked.is_empty());
        assert_eq!(model.nearest_id(), None);
    }
}
