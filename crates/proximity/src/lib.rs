//! Proximity resolution: which pin, if any, is the visitor standing in.
//!
//! Pure domain logic - no I/O, no state.

use geoguide_geo::Position;
use geoguide_pins::Pin;
use serde::{Deserialize, Serialize};

/// How a pin's trigger radius is determined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "meters", rename_all = "snake_case")]
pub enum RadiusPolicy {
    /// Each pin uses its own `radius_m`.
    #[default]
    PerPin,
    /// Every pin uses the same radius.
    Uniform(f64),
}

impl RadiusPolicy {
    pub fn radius_for(&self, pin: &Pin) -> f64 {
        match self {
            RadiusPolicy::PerPin => pin.radius_m,
            RadiusPolicy::Uniform(meters) => *meters,
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityResult {
    /// The nearest pin whose radius contains the position.
    pub active_pin: Option<Pin>,
    /// Distance to the active pin, or to the nearest pin when none is in
    /// range. Infinite for an empty pin list.
    pub distance_meters: f64,
}

impl ProximityResult {
    pub fn active_pin_id(&self) -> Option<&geoguide_pins::PinId> {
        self.active_pin.as_ref().map(|p| &p.id)
    }
}

/// Pick the active pin for `position`.
///
/// Among pins within range (`distance <= radius`) the smallest distance wins;
/// on equal distances the pin listed first wins.
pub fn resolve(position: &Position, pins: &[Pin], policy: RadiusPolicy) -> ProximityResult {
    let mut nearest = f64::INFINITY;
    let mut best: Option<(&Pin, f64)> = None;

    for pin in pins {
        let distance = pin.distance_to(position);
        if distance < nearest {
            nearest = distance;
        }
        // NaN distances never count as in range.
        if !(distance <= policy.radius_for(pin)) {
            continue;
        }
        // Strict comparison keeps the earliest pin on ties.
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((pin, distance));
        }
    }

    match best {
        Some((pin, distance)) => {
            tracing::trace!(pin_id = %pin.id, distance_m = distance, "Pin in range");
            ProximityResult {
                active_pin: Some(pin.clone()),
                distance_meters: distance,
            }
        }
        None => ProximityResult {
            active_pin: None,
            distance_meters: nearest,
        },
    }
}
