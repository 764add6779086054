pub mod markers;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use self::markers::MarkerVisualSpec;
use crate::{Category, GeoLocation, Impulse, LatLng, MAX_ZOOM, MIN_ZOOM};

/// Web-Mercator latitude limit; tiles do not exist beyond it.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;
pub const TILE_SIZE_PX: f64 = 256.0;

/// Default easing duration for `fly_to`; deliberately slow for perceived
/// smoothness.
pub const DEFAULT_FLY_DURATION_S: f64 = 1.8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapInitError {
    #[error("map container is not attached to a renderable surface")]
    SurfaceNotAttached,
    #[error("map widget failed to construct: {0}")]
    WidgetConstruction(String),
}

/// On-screen dimensions of the host container. A zero dimension means the
/// host layout pass has not placed the container yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SurfaceSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    #[must_use]
    pub const fn is_attached(self) -> bool {
        self.width_px > 0 && self.height_px > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
    pub spec: MarkerVisualSpec,
}

/// Selection/ranking context for a marker render pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerContext {
    pub active_category: Option<Category>,
    pub nearest_id: Option<i64>,
    pub selected_id: Option<i64>,
}

/// What a raw map click means in the adapter's current mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickAction {
    /// Select mode placed (or moved) the transient selection marker.
    PointSelected(LatLng),
    /// Plain tap on the basemap outside any mode.
    MapTapped,
    /// The instance is destroyed or the click was unusable.
    Ignored,
}

/// The contract any concrete map-widget binding must satisfy. `SlippyMap`
/// below is the headless implementation; a shell-side widget mirrors it.
pub trait MapPort {
    /// Replaces the entire marker set. Events without a valid location are
    /// skipped without aborting the pass; when `active_category` is set,
    /// non-matching events are dropped entirely, not dimmed. Returns the
    /// number of markers rendered.
    fn set_markers(&mut self, impulses: &[Impulse], ctx: MarkerContext) -> usize;

    /// Animated recenter. A duration of 0 behaves as an instant jump.
    fn fly_to(&mut self, center: GeoLocation, zoom: Option<f64>, duration_s: f64);

    /// Non-animated, exact recenter; the guaranteed final position for
    /// callers about to measure bounds.
    fn set_center(&mut self, center: GeoLocation, zoom: Option<f64>);

    /// None until the instance has a renderable surface.
    fn bounds(&self) -> Option<Bounds>;

    /// Must be called after the container's on-screen dimensions change,
    /// or pixel-to-geo projections go stale and markers land misplaced.
    fn invalidate_size(&mut self, surface: SurfaceSize);

    /// Arms or disarms the location-selection overlay. While armed,
    /// double-click zoom is suspended so a fast double tap is not read as
    /// two point selections.
    fn set_location_select_mode(&mut self, enabled: bool);

    fn handle_click(&mut self, point: LatLng) -> ClickAction;

    fn markers(&self) -> &[Marker];

    fn selection_marker(&self) -> Option<LatLng>;

    /// Releases markers and map resources. Tolerates repeat calls.
    fn destroy(&mut self);
}

/// Headless slippy-map engine: owns center/zoom/viewport and derives
/// bounds with a Web-Mercator projection. No tiles are fetched here; the
/// shell renders whatever this instance says is on screen.
#[derive(Debug, Clone)]
pub struct SlippyMap {
    center: GeoLocation,
    zoom: f64,
    surface: SurfaceSize,
    markers: Vec<Marker>,
    select_mode: bool,
    selection_marker: Option<LatLng>,
    double_click_zoom: bool,
    last_fly_duration_s: f64,
    destroyed: bool,
}

impl SlippyMap {
    pub fn init(
        surface: SurfaceSize,
        center: GeoLocation,
        zoom: f64,
    ) -> Result<Self, MapInitError> {
        if !surface.is_attached() {
            return Err(MapInitError::SurfaceNotAttached);
        }

        Ok(Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            surface,
            markers: Vec::new(),
            select_mode: false,
            selection_marker: None,
            double_click_zoom: true,
            last_fly_duration_s: 0.0,
            destroyed: false,
        })
    }

    #[must_use]
    pub fn center(&self) -> GeoLocation {
        self.center
    }

    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub const fn double_click_zoom_enabled(&self) -> bool {
        self.double_click_zoom
    }

    #[must_use]
    pub const fn location_select_mode(&self) -> bool {
        self.select_mode
    }

    /// Duration of the most recent recenter, for the shell to mirror the
    /// easing. Zero after `set_center`.
    #[must_use]
    pub const fn last_fly_duration_s(&self) -> f64 {
        self.last_fly_duration_s
    }

    fn world_px(&self) -> f64 {
        TILE_SIZE_PX * 2_f64.powf(self.zoom)
    }

    fn project(&self, lat: f64, lng: f64) -> (f64, f64) {
        let world = self.world_px();
        let clamped = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let lat_rad = clamped.to_radians();
        let x = (lng + 180.0) / 360.0 * world;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
            * world;
        (x, y)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let world = self.world_px();
        let lng = x / world * 360.0 - 180.0;
        let n = std::f64::consts::PI * (1.0 - 2.0 * y / world);
        let lat = n.sinh().atan().to_degrees();
        (lat, lng)
    }
}

impl MapPort for SlippyMap {
    fn set_markers(&mut self, impulses: &[Impulse], ctx: MarkerContext) -> usize {
        if self.destroyed {
            return 0;
        }

        // Full replace; event volumes are small enough that diffing buys
        // nothing.
        self.markers.clear();

        for impulse in impulses {
            if let Some(category) = ctx.active_category {
                if impulse.category != category {
                    continue;
                }
            }

            let Some(location) = impulse.geo_location() else {
                debug!(id = impulse.id, "skipping impulse without valid location");
                continue;
            };

            let spec = markers::present(
                impulse.category,
                &impulse.content,
                ctx.selected_id == Some(impulse.id),
                ctx.nearest_id == Some(impulse.id),
            );

            self.markers.push(Marker {
                id: impulse.id,
                lat: location.lat(),
                lng: location.lng(),
                spec,
            });
        }

        self.markers.len()
    }

    fn fly_to(&mut self, center: GeoLocation, zoom: Option<f64>, duration_s: f64) {
        if self.destroyed {
            return;
        }
        self.center = center;
        if let Some(zoom) = zoom {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.last_fly_duration_s = duration_s.max(0.0);
    }

    fn set_center(&mut self, center: GeoLocation, zoom: Option<f64>) {
        self.fly_to(center, zoom, 0.0);
    }

    fn bounds(&self) -> Option<Bounds> {
        if self.destroyed || !self.surface.is_attached() {
            return None;
        }

        let (cx, cy) = self.project(self.center.lat(), self.center.lng());
        let half_w = f64::from(self.surface.width_px) / 2.0;
        let half_h = f64::from(self.surface.height_px) / 2.0;

        let (north, west) = self.unproject(cx - half_w, cy - half_h);
        let (south, east) = self.unproject(cx + half_w, cy + half_h);

        Some(Bounds {
            north: north.min(MAX_MERCATOR_LAT),
            south: south.max(-MAX_MERCATOR_LAT),
            east: east.min(180.0),
            west: west.max(-180.0),
        })
    }

    fn invalidate_size(&mut self, surface: SurfaceSize) {
        if self.destroyed {
            return;
        }
        self.surface = surface;
    }

    fn set_location_select_mode(&mut self, enabled: bool) {
        if self.destroyed {
            return;
        }
        self.select_mode = enabled;
        self.double_click_zoom = !enabled;
        if !enabled {
            self.selection_marker = None;
        }
    }

    fn handle_click(&mut self, point: LatLng) -> ClickAction {
        if self.destroyed || GeoLocation::new(point.lat, point.lng).is_err() {
            return ClickAction::Ignored;
        }
        if self.select_mode {
            // Replaces any previous transient marker.
            self.selection_marker = Some(point);
            return ClickAction::PointSelected(point);
        }
        ClickAction::MapTapped
    }

    fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn selection_marker(&self) -> Option<LatLng> {
        self.selection_marker
    }

    fn destroy(&mut self) {
        self.markers.clear();
        self.selection_marker = None;
        self.select_mode = false;
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use uuid::Uuid;

    fn geo(lat: f64, lng: f64) -> GeoLocation {
        GeoLocation::new(lat, lng).unwrap()
    }

    fn impulse(id: i64, category: Category, lat: f64, lng: f64) -> Impulse {
        Impulse {
            id,
            content: format!("impulse {id}"),
            category,
            creator_id: Uuid::nil(),
            created_at_ms: 0,
            location: Some(LatLng::new(lat, lng)),
            scheduled_at: None,
            address: None,
        }
    }

    fn map() -> SlippyMap {
        SlippyMap::init(SurfaceSize::new(1024, 768), geo(55.7558, 37.6173), 14.0).unwrap()
    }

    #[test]
    fn init_requires_attached_surface() {
        let err = SlippyMap::init(SurfaceSize::new(0, 768), geo(0.0, 0.0), 14.0).unwrap_err();
        assert_eq!(err, MapInitError::SurfaceNotAttached);
    }

    #[test]
    fn set_markers_replaces_previous_set() {
        let mut map = map();
        let first = vec![impulse(1, Category::Sport, 55.75, 37.61)];
        let second = vec![
            impulse(2, Category::Food, 55.76, 37.62),
            impulse(3, Category::Walk, 55.77, 37.63),
        ];

        assert_eq!(map.set_markers(&first, MarkerContext::default()), 1);
        assert_eq!(map.set_markers(&second, MarkerContext::default()), 2);

        let ids: Vec<i64> = map.markers().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn invalid_locations_are_skipped_not_fatal() {
        let mut map = map();
        let mut broken = impulse(1, Category::Sport, 95.0, 37.61);
        broken.location = Some(LatLng::new(95.0, 37.61));
        let mut missing = impulse(2, Category::Sport, 0.0, 0.0);
        missing.location = None;
        let ok = impulse(3, Category::Sport, 55.75, 37.61);

        let rendered = map.set_markers(&[broken, missing, ok], MarkerContext::default());
        assert_eq!(rendered, 1);
        assert_eq!(map.markers()[0].id, 3);
    }

    #[test]
    fn category_filter_drops_non_matching() {
        let mut map = map();
        let impulses = vec![
            impulse(1, Category::Sport, 55.75, 37.61),
            impulse(2, Category::Food, 55.76, 37.62),
        ];

        let ctx = MarkerContext {
            active_category: Some(Category::Food),
            ..MarkerContext::default()
        };
        assert_eq!(map.set_markers(&impulses, ctx), 1);
        assert_eq!(map.markers()[0].id, 2);

        // A category with zero matches yields zero markers, not an error.
        let ctx = MarkerContext {
            active_category: Some(Category::Games),
            ..MarkerContext::default()
        };
        assert_eq!(map.set_markers(&impulses, ctx), 0);
    }

    #[test]
    fn nearest_gets_distinguished_animation() {
        let mut map = map();
        let impulses = vec![
            impulse(1, Category::Sport, 55.75, 37.61),
            impulse(2, Category::Sport, 55.76, 37.62),
        ];
        let ctx = MarkerContext {
            nearest_id: Some(2),
            ..MarkerContext::default()
        };
        map.set_markers(&impulses, ctx);

        let nearest = map.markers().iter().find(|m| m.id == 2).unwrap();
        assert_eq!(nearest.spec.animation, markers::AnimationKind::NearestPulse);
        let other = map.markers().iter().find(|m| m.id == 1).unwrap();
        assert_ne!(other.spec.animation, markers::AnimationKind::NearestPulse);
    }

    #[test]
    fn bounds_center_roundtrip() {
        let mut map = map();
        map.set_center(geo(48.8566, 2.3522), Some(12.0));
        let bounds = map.bounds().unwrap();
        assert!(bounds.contains(LatLng::new(48.8566, 2.3522)));
        assert!(bounds.north > bounds.south);
        assert!(bounds.east > bounds.west);
    }

    #[test]
    fn fly_to_zero_duration_is_instant_jump() {
        let mut map = map();
        map.fly_to(geo(10.0, 20.0), Some(16.0), 0.0);
        assert_eq!(map.last_fly_duration_s(), 0.0);
        map.fly_to(geo(11.0, 21.0), None, DEFAULT_FLY_DURATION_S);
        assert!((map.last_fly_duration_s() - DEFAULT_FLY_DURATION_S).abs() < f64::EPSILON);
    }

    #[test]
    fn select_mode_places_and_replaces_transient_marker() {
        let mut map = map();
        map.set_location_select_mode(true);
        assert!(!map.double_click_zoom_enabled());

        let first = LatLng::new(55.70, 37.50);
        let second = LatLng::new(55.71, 37.51);
        assert_eq!(
            map.handle_click(first),
            ClickAction::PointSelected(first)
        );
        assert_eq!(
            map.handle_click(second),
            ClickAction::PointSelected(second)
        );
        assert_eq!(map.selection_marker(), Some(second));

        map.set_location_select_mode(false);
        assert!(map.double_click_zoom_enabled());
        assert_eq!(map.selection_marker(), None);
        assert_eq!(map.handle_click(first), ClickAction::MapTapped);
    }

    #[test]
    fn destroy_is_idempotent_and_inert() {
        let mut map = map();
        map.set_markers(
            &[impulse(1, Category::Sport, 55.75, 37.61)],
            MarkerContext::default(),
        );
        map.destroy();
        map.destroy();
        assert!(map.is_destroyed());
        assert!(map.markers().is_empty());
        assert_eq!(map.bounds(), None);
        assert_eq!(
            map.handle_click(LatLng::new(55.75, 37.61)),
            ClickAction::Ignored
        );
    }
}
