//! The audio output seam.

use crate::PlayTicket;
use geoguide_pins::AudioRef;

/// The single audio output owned by the playback controller.
///
/// Implementations report asynchronous outcomes back to the controller:
/// play results via `on_play_resolved`, and progress, end and error
/// signals via the matching `on_*` handlers.
pub trait AudioChannel: Send {
    /// Replace the current source.
    fn load(&mut self, audio: &AudioRef);

    /// Start playback. The outcome is reported later with `ticket`.
    fn play(&mut self, ticket: PlayTicket);

    fn pause(&mut self);

    /// Move the play head back to the beginning.
    fn seek_to_start(&mut self);
}

impl<C: AudioChannel + ?Sized> AudioChannel for Box<C> {
    fn load(&mut self, audio: &AudioRef) {
        (**self).load(audio)
    }

    fn play(&mut self, ticket: PlayTicket) {
        (**self).play(ticket)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn seek_to_start(&mut self) {
        (**self).seek_to_start()
    }
}

/// A call made on a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Load(AudioRef),
    Play(PlayTicket),
    Pause,
    SeekToStart,
}

/// Channel that records every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Vec<ChannelCall>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[ChannelCall] {
        &self.calls
    }

    /// Tickets of every play request, oldest first.
    pub fn tickets(&self) -> Vec<PlayTicket> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ChannelCall::Play(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_ticket(&self) -> Option<PlayTicket> {
        self.tickets().pop()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl AudioChannel for RecordingChannel {
    fn load(&mut self, audio: &AudioRef) {
        self.calls.push(ChannelCall::Load(audio.clone()));
    }

    fn play(&mut self, ticket: PlayTicket) {
        self.calls.push(ChannelCall::Play(ticket));
    }

    fn pause(&mut self) {
        self.calls.push(ChannelCall::Pause);
    }

    fn seek_to_start(&mut self) {
        self.calls.push(ChannelCall::SeekToStart);
    }
}
