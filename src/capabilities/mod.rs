mod haptics;
mod http;
mod location;
mod timer;

pub use self::haptics::{HapticStyle, Haptics, HapticsOperation};
pub use self::http::{
    fold_response, HttpError, HttpOutput, HttpRequest, HttpResult, ValidatedUrl,
};
pub use self::location::{
    Location, LocationError, LocationFix, LocationOperation, LocationResult,
};
pub use self::timer::{Timer, TimerElapsed, TimerOperation};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::{App, Event};

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub location: Location<Event>,
    pub timer: Timer<Event>,
    pub haptics: Haptics<Event>,
}
