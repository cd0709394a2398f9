//! Async driver for the guide engine.
//!
//! One tokio task owns the engine and drains a single bounded queue, so
//! handlers never overlap and no locking is needed around engine state.

use crate::engine::{GuideEngine, GuideEvent, GuideSnapshot};
use crate::position::PositionEvent;
use futures::stream::BoxStream;
use futures::StreamExt;
use geoguide_playback::{AudioChannel, PlayError, PlayTicket};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("guide runtime is not running")]
    Closed,
    #[error("guide event queue is full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, GuideError>;

/// Cloneable sender into the guide's event queue.
///
/// Audio channels hold one to report play results and playback signals.
#[derive(Clone)]
pub struct GuideHandle {
    tx: mpsc::Sender<GuideEvent>,
}

impl GuideHandle {
    pub async fn send(&self, event: GuideEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| GuideError::Closed)
    }

    /// Enqueue without waiting, for callers outside an async context.
    pub fn try_send(&self, event: GuideEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GuideError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => GuideError::Closed,
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.send(GuideEvent::Start).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(GuideEvent::Toggle).await
    }

    pub async fn restart(&self) -> Result<()> {
        self.send(GuideEvent::Restart).await
    }

    pub async fn position(&self, event: PositionEvent) -> Result<()> {
        self.send(GuideEvent::Position(event)).await
    }

    pub fn play_resolved(
        &self,
        ticket: PlayTicket,
        result: std::result::Result<(), PlayError>,
    ) -> Result<()> {
        self.try_send(GuideEvent::PlayResolved { ticket, result })
    }

    pub fn progress(&self, fraction: f64) -> Result<()> {
        self.try_send(GuideEvent::Progress(fraction))
    }

    pub fn ended(&self) -> Result<()> {
        self.try_send(GuideEvent::Ended)
    }

    pub fn playback_error(&self, reason: impl Into<String>) -> Result<()> {
        self.try_send(GuideEvent::PlaybackError(reason.into()))
    }
}

/// The queue, before an engine is attached.
///
/// Create it first so the audio channel can be given a [`GuideHandle`],
/// then hand both to [`GuideRuntime::spawn`].
pub struct GuideRuntime {
    tx: mpsc::Sender<GuideEvent>,
    rx: mpsc::Receiver<GuideEvent>,
}

/// A running guide task.
pub struct RunningGuide<C> {
    pub handle: GuideHandle,
    pub snapshots: watch::Receiver<GuideSnapshot>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<GuideEngine<C>>,
}

impl<C> RunningGuide<C> {
    /// Stop the task and return the engine in its final state.
    pub async fn shutdown(self) -> Option<GuideEngine<C>> {
        self.cancel.cancel();
        match self.task.await {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::error!(error = %e, "Guide task failed");
                None
            }
        }
    }
}

impl GuideRuntime {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx }
    }

    pub fn handle(&self) -> GuideHandle {
        GuideHandle {
            tx: self.tx.clone(),
        }
    }

    /// Take the receiving end of the queue to drive an engine by hand.
    pub fn into_receiver(self) -> mpsc::Receiver<GuideEvent> {
        self.rx
    }

    /// Spawn the event loop. Position events are merged into the same
    /// queue order as everything else.
    pub fn spawn<C>(
        self,
        mut engine: GuideEngine<C>,
        positions: BoxStream<'static, PositionEvent>,
    ) -> RunningGuide<C>
    where
        C: AudioChannel + 'static,
    {
        let handle = self.handle();
        let cancel = CancellationToken::new();
        let (snapshot_tx, snapshots) = watch::channel(engine.snapshot());

        let Self { tx, mut rx } = self;
        // Only handles keep the queue open from here on.
        drop(tx);

        let token = cancel.child_token();
        let task = tokio::spawn(async move {
            tracing::info!("Guide runtime started");
            let mut positions = positions;
            let mut positions_open = true;
            let mut handled = 0u64;

            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!("Guide runtime cancelled");
                        break;
                    }
                    event = rx.recv() => match event {
                        Some(event) => event,
                        None => {
                            tracing::info!("All guide handles dropped, stopping");
                            break;
                        }
                    },
                    position = positions.next(), if positions_open => match position {
                        Some(position) => GuideEvent::Position(position),
                        None => {
                            tracing::debug!("Position stream ended");
                            positions_open = false;
                            continue;
                        }
                    },
                };

                engine.handle(event);
                snapshot_tx.send_replace(engine.snapshot());
                handled += 1;
            }

            tracing::info!(handled, "Guide runtime stopped");
            engine
        });

        RunningGuide {
            handle,
            snapshots,
            cancel,
            task,
        }
    }
}
