//! Location-triggered narration for a walking tour.
//!
//! # Architecture
//!
//! ```text
//! position source ──► GuideRuntime queue ──► GuideEngine
//!                          ▲                   │  resolve() picks the active pin
//!  audio channel signals ──┤                   │  PlaybackController follows it
//!  user actions ───────────┘                   ▼
//!                                       EventBus + watch snapshot ──► UI
//! ```
//!
//! Everything funnels through one queue and is handled in arrival order.

mod config;
mod constants;
mod engine;
mod position;
mod runtime;
mod session;

pub use config::GuideConfig;
pub use constants::*;
pub use engine::{GuideEngine, GuideEvent, GuideSnapshot};
pub use position::{
    walk_route, PositionError, PositionEvent, PositionSource, ScriptedPositionSource,
};
pub use runtime::{GuideError, GuideHandle, GuideRuntime, Result, RunningGuide};
pub use session::TourSession;
