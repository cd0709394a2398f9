//! Narration playback for the audio guide.
//!
//! One [`AudioChannel`] is owned by one [`PlaybackController`] for the whole
//! session and reused across pins. Playback starts are asynchronous: the
//! controller hands the channel a [`PlayTicket`] and the outcome comes back
//! later through [`PlaybackController::on_play_resolved`]. Tickets that no
//! longer match the pending request are dropped.

mod channel;
mod controller;

pub use channel::{AudioChannel, ChannelCall, RecordingChannel};
pub use controller::PlaybackController;

use geoguide_pins::PinId;
use serde::{Deserialize, Serialize};

/// Lifecycle of the channel as observed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    /// A play request is in flight.
    Loading,
    Playing,
    /// Loaded and ready for a manual start.
    Paused,
    Ended,
    /// Load or playback failed; stays here until the active pin changes
    /// or the user retries.
    Failed(String),
}

impl PlaybackState {
    /// Whether audio is playing or about to.
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Identifies one play request on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayTicket {
    pub pin_id: PinId,
    pub generation: u64,
}

/// Why a play request was rejected by the platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// The platform refused unsolicited playback.
    #[error("playback blocked: {0}")]
    Blocked(String),
    #[error("playback failed: {0}")]
    Failed(String),
}

/// Who asked for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayIntent {
    Auto,
    Manual,
}

/// Read-only view of the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    pub loaded_pin_id: Option<PinId>,
}

impl PlaybackSnapshot {
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            PlaybackState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}
