//! Event contracts observed by the presentation layer.
//!
//! The guide core never returns errors to the UI; everything the UI needs
//! is published as one of these events. Using shared types prevents
//! runtime deserialization errors from mismatched field names.
//!
//! Also provides the `EventBus` trait for decoupled event emission.

mod bus;

pub use bus::{BroadcastEventBus, EmittedEvent, EventBus, EventBusRef, InMemoryEventBus};

use geoguide_pins::{Pin, PinId};
use geoguide_playback::PlaybackSnapshot;
use serde::{Deserialize, Serialize};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Event emitted once when the visitor starts the tour.
///
/// Producers: guide engine
/// Consumers: frontend (dismisses the start overlay)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourStartedEvent {
    /// Timestamp in milliseconds since epoch.
    pub timestamp_ms: i64,
}

impl TourStartedEvent {
    pub fn now() -> Self {
        Self {
            timestamp_ms: now_ms(),
        }
    }
}

/// Event emitted when the proximity resolver selects a different pin.
///
/// Producers: guide engine
/// Consumers: frontend (highlights the pin's circle, shows the narration card)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePinChangedEvent {
    /// Newly active pin, `None` when the visitor left every radius.
    #[serde(default)]
    pub pin_id: Option<PinId>,
    #[serde(default)]
    pub pin_name: Option<String>,
    /// Distance to the active pin (or nearest pin when none is active).
    /// `None` when there are no pins to measure against.
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl ActivePinChangedEvent {
    pub fn new(pin: Option<&Pin>, distance_m: f64) -> Self {
        Self {
            pin_id: pin.map(|p| p.id.clone()),
            pin_name: pin.map(|p| p.name.clone()),
            distance_m: distance_m.is_finite().then_some(distance_m),
            timestamp_ms: now_ms(),
        }
    }
}

/// Event emitted when playback state, progress or loaded pin change.
///
/// Producers: guide engine
/// Consumers: frontend (play/pause button, progress bar, error line)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackChangedEvent {
    /// One of `idle`, `loading`, `playing`, `paused`, `ended`, `failed`.
    pub state: String,
    /// Reason shown to the visitor when `state` is `failed`.
    #[serde(default)]
    pub error: Option<String>,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    #[serde(default)]
    pub loaded_pin_id: Option<PinId>,
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl From<&PlaybackSnapshot> for PlaybackChangedEvent {
    fn from(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            state: snapshot.state.label().to_string(),
            error: snapshot.error().map(str::to_string),
            progress: snapshot.progress,
            loaded_pin_id: snapshot.loaded_pin_id.clone(),
            timestamp_ms: now_ms(),
        }
    }
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Tour started event.
    pub const TOUR_STARTED: &str = "guide:tour_started";
    /// Active pin changed event.
    pub const ACTIVE_PIN_CHANGED: &str = "guide:active_pin_changed";
    /// Playback changed event.
    pub const PLAYBACK_CHANGED: &str = "guide:playback_changed";
}
