//! Geographic primitives for the audio guide.
//!
//! Pure math, no I/O.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = PI / 180.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        distance_meters(self.lat, self.lng, other.lat, other.lng)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}

/// Haversine distance between two lat/lng points in meters.
///
/// NaN or infinite inputs propagate into the result.
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1 * DEG_TO_RAD;
    let phi2 = lat2 * DEG_TO_RAD;
    let delta_phi = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lambda = (lng2 - lng1) * DEG_TO_RAD;

    let sin_dphi = (delta_phi / 2.0).sin();
    let sin_dlambda = (delta_lambda / 2.0).sin();
    let a = sin_dphi * sin_dphi + phi1.cos() * phi2.cos() * sin_dlambda * sin_dlambda;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordParseError {
    #[error("expected \"lat, lng\", got {0} part(s)")]
    WrongArity(usize),
    #[error("not a finite number: {0:?}")]
    InvalidNumber(String),
}

fn parse_finite(part: &str) -> Result<f64, CoordParseError> {
    part.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoordParseError::InvalidNumber(part.to_string()))
}

/// Parses `"lat, lng"`. Whitespace around either number is ignored.
impl FromStr for Position {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(CoordParseError::WrongArity(parts.len()));
        }
        Ok(Self {
            lat: parse_finite(parts[0])?,
            lng: parse_finite(parts[1])?,
        })
    }
}
