//! Position source abstraction.
//!
//! The device location capability lives outside this crate; the guide only
//! consumes a stream of [`PositionEvent`]s from it.

use futures::stream::BoxStream;
use geoguide_geo::Position;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location request timed out")]
    Timeout,
}

/// One item from the position stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(Position),
    Error(PositionError),
}

impl From<Position> for PositionEvent {
    fn from(position: Position) -> Self {
        PositionEvent::Fix(position)
    }
}

/// Push-based source of visitor positions.
pub trait PositionSource: Send + Sync {
    /// Subscribe to position updates. Dropping the stream unsubscribes.
    fn subscribe(&self) -> BoxStream<'static, PositionEvent>;
}

/// Replays a fixed list of events, optionally spaced out in time.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPositionSource {
    events: Vec<PositionEvent>,
    interval: Duration,
}

impl ScriptedPositionSource {
    pub fn new(events: Vec<PositionEvent>) -> Self {
        Self {
            events,
            interval: Duration::ZERO,
        }
    }

    /// Wait `interval` before each event.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl PositionSource for ScriptedPositionSource {
    fn subscribe(&self) -> BoxStream<'static, PositionEvent> {
        let events = self.events.clone();
        let interval = self.interval;

        Box::pin(async_stream::stream! {
            for event in events {
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                yield event;
            }
        })
    }
}

/// Positions along the polyline through `waypoints`, spaced at most
/// `step_m` apart. Both endpoints of every leg are included once.
pub fn walk_route(waypoints: &[Position], step_m: f64) -> Vec<Position> {
    let Some(first) = waypoints.first() else {
        return Vec::new();
    };

    let mut route = vec![*first];
    for leg in waypoints.windows(2) {
        let (from, to) = (leg[0], leg[1]);
        let length = from.distance_to(&to);
        let steps = if step_m > 0.0 {
            (length / step_m).ceil().max(1.0) as usize
        } else {
            1
        };
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            route.push(Position::new(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            ));
        }
    }
    route
}
