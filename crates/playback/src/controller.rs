//! Playback state machine driven by the active pin.

use crate::{
    AudioChannel, PlayError, PlayIntent, PlayTicket, PlaybackSnapshot, PlaybackState,
};
use geoguide_pins::{Pin, PinId};

/// Keeps the audio channel in lockstep with the active pin.
///
/// All handlers run to completion on a single logical queue, so the only
/// reconciliation needed is for delayed play results: each request carries
/// a generation, and a result is applied only while its generation is still
/// the pending one and its pin is still loaded.
pub struct PlaybackController<C> {
    channel: C,
    state: PlaybackState,
    progress: f64,
    active: Option<Pin>,
    loaded: Option<PinId>,
    autoplay: bool,
    generation: u64,
    pending: Option<(u64, PlayIntent)>,
}

impl<C: AudioChannel> PlaybackController<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: PlaybackState::Idle,
            progress: 0.0,
            active: None,
            loaded: None,
            autoplay: false,
            generation: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn loaded_pin_id(&self) -> Option<&PinId> {
        self.loaded.as_ref()
    }

    pub fn active_pin(&self) -> Option<&Pin> {
        self.active.as_ref()
    }

    pub fn autoplay_enabled(&self) -> bool {
        self.autoplay
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state.clone(),
            progress: self.progress,
            loaded_pin_id: self.loaded.clone(),
        }
    }

    /// Allow auto-play from now on and apply it to the current active pin.
    pub fn enable_autoplay(&mut self) {
        if self.autoplay {
            return;
        }
        self.autoplay = true;
        let active = self.active.clone();
        self.on_active_pin_changed(active.as_ref());
    }

    /// React to a new proximity result.
    ///
    /// When the active pin changes, or auto-play is enabled and the active
    /// pin is not loaded yet, the channel is stopped and rewound before
    /// anything else happens. The new pin's audio is then loaded and
    /// auto-played only if auto-play is enabled.
    pub fn on_active_pin_changed(&mut self, new_pin: Option<&Pin>) {
        let new_id = new_pin.map(|p| &p.id);
        let changed = self.active.as_ref().map(|p| &p.id) != new_id;
        let needs_load = self.autoplay && new_id.is_some() && self.loaded.as_ref() != new_id;
        if !changed && !needs_load {
            return;
        }

        tracing::debug!(
            from = ?self.active.as_ref().map(|p| p.id.as_str()),
            to = ?new_id.map(PinId::as_str),
            "Active pin changed"
        );
        self.active = new_pin.cloned();
        self.stop();

        match new_pin {
            Some(pin) if self.autoplay => {
                self.load(pin);
                self.request_play(PlayIntent::Auto);
            }
            _ => {
                self.loaded = None;
                self.set_state(PlaybackState::Idle);
            }
        }
    }

    /// Pause if playing, otherwise play the active pin's narration.
    pub fn toggle(&mut self) {
        let Some(active) = self.active.clone() else {
            tracing::debug!("Toggle ignored, no active pin");
            return;
        };

        if self.state.is_active() {
            self.pending = None;
            self.channel.pause();
            self.set_state(PlaybackState::Paused);
            return;
        }

        self.ensure_loaded(&active);
        if self.state == PlaybackState::Ended {
            self.channel.seek_to_start();
            self.progress = 0.0;
        }
        self.request_play(PlayIntent::Manual);
    }

    /// Rewind the active pin's narration and play it from the start.
    pub fn restart(&mut self) {
        let Some(active) = self.active.clone() else {
            tracing::debug!("Restart ignored, no active pin");
            return;
        };

        self.ensure_loaded(&active);
        self.channel.seek_to_start();
        self.progress = 0.0;
        self.request_play(PlayIntent::Manual);
    }

    /// Apply the outcome of a play request.
    ///
    /// Returns false when the result was stale and discarded.
    pub fn on_play_resolved(&mut self, ticket: &PlayTicket, result: Result<(), PlayError>) -> bool {
        let is_current = self.loaded.as_ref() == Some(&ticket.pin_id)
            && matches!(self.pending, Some((generation, _)) if generation == ticket.generation);
        if !is_current {
            tracing::debug!(
                pin_id = %ticket.pin_id,
                generation = ticket.generation,
                "Discarding stale play result"
            );
            return false;
        }

        let Some((_, intent)) = self.pending.take() else {
            return false;
        };

        match (result, intent) {
            (Ok(()), _) => self.set_state(PlaybackState::Playing),
            (Err(e), PlayIntent::Auto) | (Err(e @ PlayError::Blocked(_)), PlayIntent::Manual) => {
                tracing::warn!(pin_id = %ticket.pin_id, error = %e, "Play blocked, waiting for manual start");
                self.set_state(PlaybackState::Paused);
            }
            (Err(PlayError::Failed(reason)), PlayIntent::Manual) => {
                tracing::warn!(pin_id = %ticket.pin_id, %reason, "Manual play failed");
                self.channel.pause();
                self.set_state(PlaybackState::Failed(reason));
            }
        }
        true
    }

    /// Time-update signal from the channel.
    pub fn on_progress(&mut self, fraction: f64) {
        if self.loaded.is_none() || !fraction.is_finite() {
            return;
        }
        if matches!(
            self.state,
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused
        ) {
            self.progress = fraction.clamp(0.0, 1.0);
        }
    }

    /// The narration played to its end. The pin stays loaded.
    pub fn on_ended(&mut self) {
        if self.loaded.is_none() || matches!(self.state, PlaybackState::Failed(_)) {
            return;
        }
        self.pending = None;
        self.progress = 1.0;
        self.set_state(PlaybackState::Ended);
    }

    /// The channel failed to load or play. No retry until the active pin
    /// changes or the user asks again.
    pub fn on_playback_error(&mut self, reason: impl Into<String>) {
        if self.loaded.is_none() {
            return;
        }
        let reason = reason.into();
        tracing::warn!(pin_id = ?self.loaded.as_ref().map(PinId::as_str), %reason, "Audio playback error");
        self.stop();
        self.set_state(PlaybackState::Failed(reason));
    }

    /// Pause, rewind, forget any in-flight play request, clear progress.
    fn stop(&mut self) {
        self.pending = None;
        self.channel.pause();
        self.channel.seek_to_start();
        self.progress = 0.0;
    }

    fn load(&mut self, pin: &Pin) {
        self.channel.load(&pin.audio);
        self.loaded = Some(pin.id.clone());
    }

    fn ensure_loaded(&mut self, pin: &Pin) {
        let failed = matches!(self.state, PlaybackState::Failed(_));
        if failed || self.loaded.as_ref() != Some(&pin.id) {
            self.stop();
            self.load(pin);
        }
    }

    fn request_play(&mut self, intent: PlayIntent) {
        let Some(pin_id) = self.loaded.clone() else {
            return;
        };
        self.generation += 1;
        self.pending = Some((self.generation, intent));
        self.set_state(PlaybackState::Loading);
        self.channel.play(PlayTicket {
            pin_id,
            generation: self.generation,
        });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "Playback state");
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelCall, RecordingChannel};
    use geoguide_pins::AudioRef;

    fn pin(id: &str) -> Pin {
        Pin {
            id: PinId::new(id),
            name: id.to_uppercase(),
            lat: 1.0,
            lng: 1.0,
            radius_m: 50.0,
            audio: AudioRef::new(format!("{id}.mp3")),
            label: format!("Play {id}"),
            description: String::new(),
        }
    }

    fn started() -> PlaybackController<RecordingChannel> {
        let mut controller = PlaybackController::new(RecordingChannel::new());
        controller.enable_autoplay();
        controller
    }

    fn resolve_last(controller: &mut PlaybackController<RecordingChannel>, result: Result<(), PlayError>) -> bool {
        let ticket = controller.channel().last_ticket().expect("no play request");
        controller.on_play_resolved(&ticket, result)
    }

    #[test]
    fn test_default_state() {
        let controller = PlaybackController::new(RecordingChannel::new());
        assert_eq!(controller.state(), &PlaybackState::Idle);
        assert_eq!(controller.progress(), 0.0);
        assert!(controller.loaded_pin_id().is_none());
        assert!(!controller.autoplay_enabled());
    }

    #[test]
    fn test_no_autoplay_before_enabled() {
        let mut controller = PlaybackController::new(RecordingChannel::new());
        controller.on_active_pin_changed(Some(&pin("a")));

        assert_eq!(controller.state(), &PlaybackState::Idle);
        assert!(controller.loaded_pin_id().is_none());
        assert!(controller.channel().tickets().is_empty());
        assert_eq!(controller.active_pin().map(|p| p.id.as_str()), Some("a"));
    }

    #[test]
    fn test_enable_autoplay_plays_current_pin() {
        let mut controller = PlaybackController::new(RecordingChannel::new());
        controller.on_active_pin_changed(Some(&pin("a")));
        controller.enable_autoplay();

        assert_eq!(controller.state(), &PlaybackState::Loading);
        assert_eq!(controller.loaded_pin_id().map(PinId::as_str), Some("a"));
        assert!(resolve_last(&mut controller, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Playing);
    }

    #[test]
    fn test_autoplay_on_enter() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));

        assert_eq!(
            controller.channel().calls(),
            &[
                ChannelCall::Pause,
                ChannelCall::SeekToStart,
                ChannelCall::Load(AudioRef::new("a.mp3")),
                ChannelCall::Play(PlayTicket {
                    pin_id: PinId::new("a"),
                    generation: 1
                }),
            ]
        );
        resolve_last(&mut controller, Ok(()));
        assert_eq!(controller.state(), &PlaybackState::Playing);
    }

    #[test]
    fn test_same_pin_is_noop() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.4);
        controller.channel_mut().clear();

        controller.on_active_pin_changed(Some(&pin("a")));

        assert!(controller.channel().calls().is_empty());
        assert_eq!(controller.state(), &PlaybackState::Playing);
        assert_eq!(controller.progress(), 0.4);
    }

    #[test]
    fn test_leaving_all_pins_stops_and_resets() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.7);
        controller.channel_mut().clear();

        controller.on_active_pin_changed(None);

        assert_eq!(
            controller.channel().calls(),
            &[ChannelCall::Pause, ChannelCall::SeekToStart]
        );
        assert_eq!(controller.state(), &PlaybackState::Idle);
        assert_eq!(controller.progress(), 0.0);
        assert!(controller.loaded_pin_id().is_none());
    }

    #[test]
    fn test_switch_stops_previous_before_loading_next() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.5);
        controller.channel_mut().clear();

        controller.on_active_pin_changed(Some(&pin("b")));

        let calls = controller.channel().calls();
        assert_eq!(calls[0], ChannelCall::Pause);
        assert_eq!(calls[1], ChannelCall::SeekToStart);
        assert_eq!(calls[2], ChannelCall::Load(AudioRef::new("b.mp3")));
        assert!(matches!(&calls[3], ChannelCall::Play(t) if t.pin_id.as_str() == "b"));
        assert_eq!(controller.progress(), 0.0);
        assert_eq!(controller.loaded_pin_id().map(PinId::as_str), Some("b"));
    }

    #[test]
    fn test_switch_clears_error() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        controller.on_playback_error("404");
        assert!(matches!(controller.state(), PlaybackState::Failed(_)));

        controller.on_active_pin_changed(Some(&pin("b")));
        assert_eq!(controller.state(), &PlaybackState::Loading);
        assert_eq!(controller.snapshot().error(), None);
    }

    #[test]
    fn test_autoplay_blocked_stays_paused_and_loaded() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));

        resolve_last(
            &mut controller,
            Err(PlayError::Blocked("NotAllowedError".into())),
        );
        assert_eq!(controller.state(), &PlaybackState::Paused);
        assert_eq!(controller.loaded_pin_id().map(PinId::as_str), Some("a"));

        controller.toggle();
        assert_eq!(controller.state(), &PlaybackState::Loading);
        resolve_last(&mut controller, Ok(()));
        assert_eq!(controller.state(), &PlaybackState::Playing);
    }

    #[test]
    fn test_autoplay_failure_of_any_kind_is_swallowed() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Err(PlayError::Failed("decode".into())));
        assert_eq!(controller.state(), &PlaybackState::Paused);
    }

    #[test]
    fn test_manual_play_failure_is_surfaced() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Err(PlayError::Blocked("blocked".into())));

        controller.toggle();
        resolve_last(&mut controller, Err(PlayError::Failed("file missing".into())));
        assert_eq!(
            controller.state(),
            &PlaybackState::Failed("file missing".to_string())
        );
    }

    #[test]
    fn test_stale_success_for_previous_pin_is_discarded() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        let ticket_a = controller.channel().last_ticket().unwrap();

        controller.on_active_pin_changed(Some(&pin("b")));
        resolve_last(&mut controller, Err(PlayError::Blocked("blocked".into())));
        assert_eq!(controller.state(), &PlaybackState::Paused);
        controller.channel_mut().clear();

        assert!(!controller.on_play_resolved(&ticket_a, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Paused);
        assert!(controller.channel().calls().is_empty());
    }

    #[test]
    fn test_stale_result_after_leaving_is_discarded() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        let ticket = controller.channel().last_ticket().unwrap();
        controller.on_active_pin_changed(None);

        assert!(!controller.on_play_resolved(&ticket, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_result_after_manual_pause_is_discarded() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        let ticket = controller.channel().last_ticket().unwrap();

        controller.toggle();
        assert_eq!(controller.state(), &PlaybackState::Paused);

        assert!(!controller.on_play_resolved(&ticket, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Paused);
    }

    #[test]
    fn test_result_from_same_pin_older_request_is_discarded() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        let first = controller.channel().last_ticket().unwrap();
        controller.restart();

        assert!(!controller.on_play_resolved(&first, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Loading);
        assert!(resolve_last(&mut controller, Ok(())));
        assert_eq!(controller.state(), &PlaybackState::Playing);
    }

    #[test]
    fn test_toggle_twice_returns_to_original_state() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));

        controller.toggle();
        assert_eq!(controller.state(), &PlaybackState::Paused);
        controller.toggle();
        resolve_last(&mut controller, Ok(()));
        assert_eq!(controller.state(), &PlaybackState::Playing);

        controller.toggle();
        controller.toggle();
        assert!(controller.state().is_active());
    }

    #[test]
    fn test_toggle_without_active_pin_is_noop() {
        let mut controller = started();
        controller.toggle();
        controller.restart();

        assert_eq!(controller.state(), &PlaybackState::Idle);
        assert!(controller.channel().calls().is_empty());
    }

    #[test]
    fn test_toggle_before_autoplay_loads_active_pin() {
        let mut controller = PlaybackController::new(RecordingChannel::new());
        controller.on_active_pin_changed(Some(&pin("a")));
        controller.toggle();

        assert!(controller
            .channel()
            .calls()
            .contains(&ChannelCall::Load(AudioRef::new("a.mp3"))));
        assert_eq!(controller.loaded_pin_id().map(PinId::as_str), Some("a"));
        assert_eq!(controller.state(), &PlaybackState::Loading);
    }

    #[test]
    fn test_restart_resets_progress_before_play() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.8);
        controller.channel_mut().clear();

        controller.restart();

        assert_eq!(controller.progress(), 0.0);
        let calls = controller.channel().calls();
        assert_eq!(calls[0], ChannelCall::SeekToStart);
        assert!(matches!(calls[1], ChannelCall::Play(_)));
        assert_eq!(calls.len(), 2, "restart must not reload the same pin");
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));

        controller.on_progress(1.7);
        assert_eq!(controller.progress(), 1.0);
        controller.on_progress(-0.2);
        assert_eq!(controller.progress(), 0.0);
        controller.on_progress(f64::NAN);
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_progress_ignored_when_idle() {
        let mut controller = started();
        controller.on_progress(0.5);
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_ended_keeps_pin_and_full_progress() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.99);

        controller.on_ended();

        assert_eq!(controller.state(), &PlaybackState::Ended);
        assert_eq!(controller.progress(), 1.0);
        assert_eq!(controller.loaded_pin_id().map(PinId::as_str), Some("a"));
    }

    #[test]
    fn test_toggle_after_ended_replays_from_start() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_ended();
        controller.channel_mut().clear();

        controller.toggle();

        assert_eq!(controller.progress(), 0.0);
        assert_eq!(controller.channel().calls()[0], ChannelCall::SeekToStart);
        assert_eq!(controller.state(), &PlaybackState::Loading);
    }

    #[test]
    fn test_playback_error_is_terminal_for_pin() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        resolve_last(&mut controller, Ok(()));
        controller.on_progress(0.3);

        controller.on_playback_error("Failed to load audio file");

        assert_eq!(
            controller.state(),
            &PlaybackState::Failed("Failed to load audio file".to_string())
        );
        assert_eq!(controller.progress(), 0.0);

        // Same pin again: no automatic retry.
        let tickets = controller.channel().tickets().len();
        controller.on_active_pin_changed(Some(&pin("a")));
        assert_eq!(controller.channel().tickets().len(), tickets);
        assert!(matches!(controller.state(), PlaybackState::Failed(_)));

        // Late signals do not revive it.
        controller.on_ended();
        controller.on_progress(0.5);
        assert!(matches!(controller.state(), PlaybackState::Failed(_)));
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn test_manual_retry_after_error_reloads() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        controller.on_playback_error("network");
        controller.channel_mut().clear();

        controller.toggle();

        assert!(controller
            .channel()
            .calls()
            .contains(&ChannelCall::Load(AudioRef::new("a.mp3"))));
        resolve_last(&mut controller, Ok(()));
        assert_eq!(controller.state(), &PlaybackState::Playing);
    }

    #[test]
    fn test_reenter_after_leaving_retries_failed_pin() {
        let mut controller = started();
        controller.on_active_pin_changed(Some(&pin("a")));
        controller.on_playback_error("network");

        controller.on_active_pin_changed(None);
        controller.on_active_pin_changed(Some(&pin("a")));

        assert_eq!(controller.state(), &PlaybackState::Loading);
    }

    #[test]
    fn test_signals_ignored_when_nothing_loaded() {
        let mut controller = started();
        controller.on_ended();
        controller.on_playback_error("late");
        assert_eq!(controller.state(), &PlaybackState::Idle);
    }
}
