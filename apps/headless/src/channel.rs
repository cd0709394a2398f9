//! Simulated audio output for running the guide without a sound device.
//!
//! Every narration "plays" for a fixed duration. Progress, end and play
//! results are reported back through the guide queue like a real player's
//! callbacks would be.

use geoguide_application::{GuideEvent, GuideHandle};
use geoguide_pins::AudioRef;
use geoguide_playback::{AudioChannel, PlayTicket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TICKS_PER_NARRATION: u32 = 20;

pub struct SimulatedChannel {
    handle: GuideHandle,
    tick: Duration,
    /// Play head, in ticks.
    head: Arc<AtomicU32>,
    source: Option<AudioRef>,
    playing: Option<CancellationToken>,
}

impl SimulatedChannel {
    /// `length` is how long one narration takes to play through.
    pub fn new(handle: GuideHandle, length: Duration) -> Self {
        Self {
            handle,
            tick: length / TICKS_PER_NARRATION,
            head: Arc::new(AtomicU32::new(0)),
            source: None,
            playing: None,
        }
    }

    fn halt(&mut self) {
        if let Some(token) = self.playing.take() {
            token.cancel();
        }
    }
}

/// Queue `event`, waiting for room. Returns false once the playback was
/// cancelled or the guide stopped.
async fn report(handle: &GuideHandle, token: &CancellationToken, event: GuideEvent) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        sent = handle.send(event) => match sent {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not report playback signal");
                false
            }
        },
    }
}

impl AudioChannel for SimulatedChannel {
    fn load(&mut self, audio: &AudioRef) {
        self.halt();
        self.head.store(0, Ordering::SeqCst);
        tracing::debug!(audio = %audio.as_str(), "Loaded narration");
        self.source = Some(audio.clone());
    }

    fn play(&mut self, ticket: PlayTicket) {
        self.halt();

        if self.source.is_none() {
            if let Err(e) = self.handle.playback_error("no audio source loaded") {
                tracing::warn!(error = %e, "Could not report playback error");
            }
            return;
        }

        let token = CancellationToken::new();
        self.playing = Some(token.clone());
        let handle = self.handle.clone();
        let head = self.head.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let resolved = GuideEvent::PlayResolved {
                ticket,
                result: Ok(()),
            };
            if !report(&handle, &token, resolved).await {
                return;
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(tick) => {}
                }

                let position = head.fetch_add(1, Ordering::SeqCst) + 1;
                if position >= TICKS_PER_NARRATION {
                    report(&handle, &token, GuideEvent::Ended).await;
                    return;
                }
                let fraction = f64::from(position) / f64::from(TICKS_PER_NARRATION);
                if !report(&handle, &token, GuideEvent::Progress(fraction)).await {
                    return;
                }
            }
        });
    }

    fn pause(&mut self) {
        self.halt();
    }

    fn seek_to_start(&mut self) {
        self.head.store(0, Ordering::SeqCst);
    }
}

impl Drop for SimulatedChannel {
    fn drop(&mut self) {
        self.halt();
    }
}
