//! The single-threaded guide core.
//!
//! Every input (position fix, audio signal, user action) becomes a
//! [`GuideEvent`] handled to completion by [`GuideEngine::handle`]. The
//! engine never returns errors: failures become playback states, and the
//! presentation layer learns about them through the event bus.

use crate::config::GuideConfig;
use crate::position::PositionEvent;
use crate::session::TourSession;
use geoguide_events::{
    event_names, ActivePinChangedEvent, EventBusRef, PlaybackChangedEvent, TourStartedEvent,
};
use geoguide_geo::Position;
use geoguide_pins::Pin;
use geoguide_playback::{AudioChannel, PlayError, PlayTicket, PlaybackController, PlaybackSnapshot};
use geoguide_proximity::{resolve, ProximityResult};
use serde::Serialize;

/// Everything the engine reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum GuideEvent {
    Position(PositionEvent),
    Start,
    Toggle,
    Restart,
    PlayResolved {
        ticket: PlayTicket,
        result: Result<(), PlayError>,
    },
    Progress(f64),
    Ended,
    PlaybackError(String),
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GuideSnapshot {
    pub started: bool,
    pub position: Option<Position>,
    pub active_pin: Option<Pin>,
    pub distance_m: Option<f64>,
    pub playback: PlaybackSnapshot,
}

pub struct GuideEngine<C> {
    config: GuideConfig,
    pins: Vec<Pin>,
    session: TourSession,
    controller: PlaybackController<C>,
    bus: EventBusRef,
    position: Option<Position>,
    proximity: Option<ProximityResult>,
}

impl<C: AudioChannel> GuideEngine<C> {
    /// `pins` is a snapshot; later edits apply to the next engine.
    pub fn new(config: GuideConfig, pins: Vec<Pin>, channel: C, bus: EventBusRef) -> Self {
        tracing::info!(pins = pins.len(), "Guide engine created");
        Self {
            config,
            pins,
            session: TourSession::new(),
            controller: PlaybackController::new(channel),
            bus,
            position: None,
            proximity: None,
        }
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn config(&self) -> &GuideConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.session.is_started()
    }

    pub fn active_pin(&self) -> Option<&Pin> {
        self.proximity.as_ref().and_then(|p| p.active_pin.as_ref())
    }

    pub fn controller(&self) -> &PlaybackController<C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<C> {
        &mut self.controller
    }

    pub fn snapshot(&self) -> GuideSnapshot {
        GuideSnapshot {
            started: self.session.is_started(),
            position: self.position,
            active_pin: self.active_pin().cloned(),
            distance_m: self.proximity.as_ref().map(|p| p.distance_meters),
            playback: self.controller.snapshot(),
        }
    }

    pub fn handle(&mut self, event: GuideEvent) {
        let before = self.controller.snapshot();

        match event {
            GuideEvent::Position(PositionEvent::Fix(position)) => self.update_position(position),
            GuideEvent::Position(PositionEvent::Error(e)) => self.on_position_error(&e),
            GuideEvent::Start => self.start(),
            GuideEvent::Toggle => self.controller.toggle(),
            GuideEvent::Restart => self.controller.restart(),
            GuideEvent::PlayResolved { ticket, result } => {
                self.controller.on_play_resolved(&ticket, result);
            }
            GuideEvent::Progress(fraction) => self.controller.on_progress(fraction),
            GuideEvent::Ended => self.controller.on_ended(),
            GuideEvent::PlaybackError(reason) => self.controller.on_playback_error(reason),
        }

        let after = self.controller.snapshot();
        if after != before {
            self.bus.publish(
                event_names::PLAYBACK_CHANGED,
                &PlaybackChangedEvent::from(&after),
            );
        }
    }

    /// Re-resolve proximity for `position` and move playback along.
    fn update_position(&mut self, position: Position) {
        self.position = Some(position);
        let result = resolve(&position, &self.pins, self.config.radius_policy);

        let previous = self.proximity.as_ref().and_then(|p| p.active_pin_id());
        if previous != result.active_pin_id() {
            tracing::info!(
                pin_id = ?result.active_pin_id().map(|id| id.as_str()),
                distance_m = result.distance_meters,
                "Active pin changed"
            );
            self.bus.publish(
                event_names::ACTIVE_PIN_CHANGED,
                &ActivePinChangedEvent::new(result.active_pin.as_ref(), result.distance_meters),
            );
        }

        self.controller.on_active_pin_changed(result.active_pin.as_ref());
        self.proximity = Some(result);
    }

    fn on_position_error(&mut self, error: &crate::position::PositionError) {
        if self.position.is_some() {
            tracing::warn!(%error, "Position error, keeping last known position");
            return;
        }
        let fallback = self.config.default_position;
        tracing::warn!(%error, %fallback, "Position unavailable, using default position");
        self.update_position(fallback);
    }

    fn start(&mut self) {
        if !self.session.start() {
            return;
        }
        tracing::info!("Tour started");
        self.bus
            .publish(event_names::TOUR_STARTED, &TourStartedEvent::now());
        self.controller.enable_autoplay();
    }
}
