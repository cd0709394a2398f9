//! Points of interest for the audio guide.
//!
//! A [`Pin`] couples a coordinate and trigger radius with the narration
//! played when the visitor is inside it. The guide core reads pins as an
//! ordered snapshot; editing and persistence happen through [`PinEdit`] and
//! [`PinRepository`].

mod defaults;
mod edit;

pub use defaults::{default_pins, DEFAULT_RADIUS_M};
pub use edit::{apply_edit, validate_pins, PinEdit};

use geoguide_geo::Position;
use serde::{Deserialize, Serialize};

/// Stable identity of a pin (e.g. `"pin-1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(String);

impl PinId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque handle to a narration track (URI or bundled asset path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

/// Audio references written by earlier releases that no longer resolve.
const STALE_AUDIO_MARKERS: &[&str] = &["soundhelix.com", "audio1.mp3"];
const STALE_AUDIO_EXACT: &[&str] = &["/01AmkInt.mp3"];

impl AudioRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reference is a placeholder left behind by an older
    /// release and must not be trusted.
    pub fn is_stale_placeholder(&self) -> bool {
        STALE_AUDIO_MARKERS.iter().any(|m| self.0.contains(m))
            || STALE_AUDIO_EXACT.iter().any(|m| self.0 == *m)
    }
}

impl std::fmt::Display for AudioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A predefined point of interest with a trigger radius and narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: PinId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Trigger radius in meters, never negative.
    #[serde(rename = "radius")]
    pub radius_m: f64,
    #[serde(rename = "audioUrl")]
    pub audio: AudioRef,
    /// Text shown on the play button.
    #[serde(rename = "buttonLabel")]
    pub label: String,
    pub description: String,
}

impl Pin {
    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lng)
    }

    pub fn distance_to(&self, position: &Position) -> f64 {
        position.distance_to(&self.position())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("unknown pin: {0}")]
    UnknownPin(PinId),
    #[error("invalid radius for {id}: {meters}")]
    InvalidRadius { id: PinId, meters: f64 },
    #[error("invalid coordinates for {id}: {position}")]
    InvalidCoordinates { id: PinId, position: Position },
    #[error("duplicate pin id: {0}")]
    DuplicateId(PinId),
}

pub type Result<T> = std::result::Result<T, PinError>;

/// Repository trait for pin persistence.
/// Implemented by the storage layer; the guide core only consumes snapshots.
pub trait PinRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Ordered pin list, falling back to the default tour when nothing
    /// usable is stored.
    fn load(&self) -> std::result::Result<Vec<Pin>, Self::Error>;
    fn save(&self, pins: &[Pin]) -> std::result::Result<(), Self::Error>;
    /// Discard stored pins and return the default tour.
    fn reset_to_default(&self) -> std::result::Result<Vec<Pin>, Self::Error>;
}

/// Load pins, treating any persistence failure as "use the default tour".
pub fn load_pins_or_default<R: PinRepository + ?Sized>(repo: &R) -> Vec<Pin> {
    match repo.load() {
        Ok(pins) => pins,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load pins, using default tour");
            default_pins()
        }
    }
}
