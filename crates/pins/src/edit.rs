//! Operator edits applied to an ordered pin list.

use crate::{Pin, PinError, PinId, Result};
use geoguide_geo::Position;
use std::collections::HashSet;

/// A single change made from the configuration screen.
#[derive(Debug, Clone, PartialEq)]
pub enum PinEdit {
    SetCoordinates { id: PinId, position: Position },
    SetRadius { id: PinId, meters: f64 },
    SetLabel { id: PinId, label: String },
}

impl PinEdit {
    pub fn pin_id(&self) -> &PinId {
        match self {
            PinEdit::SetCoordinates { id, .. }
            | PinEdit::SetRadius { id, .. }
            | PinEdit::SetLabel { id, .. } => id,
        }
    }
}

fn check_radius(id: &PinId, meters: f64) -> Result<()> {
    if meters.is_finite() && meters >= 0.0 {
        Ok(())
    } else {
        Err(PinError::InvalidRadius {
            id: id.clone(),
            meters,
        })
    }
}

fn check_position(id: &PinId, position: Position) -> Result<()> {
    if position.lat.is_finite() && position.lng.is_finite() {
        Ok(())
    } else {
        Err(PinError::InvalidCoordinates {
            id: id.clone(),
            position,
        })
    }
}

/// Apply `edit` in place. The list is left untouched on error.
pub fn apply_edit(pins: &mut [Pin], edit: PinEdit) -> Result<()> {
    let pin = pins
        .iter_mut()
        .find(|p| &p.id == edit.pin_id())
        .ok_or_else(|| PinError::UnknownPin(edit.pin_id().clone()))?;

    match edit {
        PinEdit::SetCoordinates { id, position } => {
            check_position(&id, position)?;
            pin.lat = position.lat;
            pin.lng = position.lng;
        }
        PinEdit::SetRadius { id, meters } => {
            check_radius(&id, meters)?;
            pin.radius_m = meters;
        }
        PinEdit::SetLabel { label, .. } => {
            pin.label = label;
        }
    }

    tracing::debug!(pin_id = %pin.id, "Pin edited");
    Ok(())
}

/// Check that ids are unique and every radius and coordinate is usable.
pub fn validate_pins(pins: &[Pin]) -> Result<()> {
    let mut seen = HashSet::new();
    for pin in pins {
        if !seen.insert(&pin.id) {
            return Err(PinError::DuplicateId(pin.id.clone()));
        }
        check_radius(&pin.id, pin.radius_m)?;
        check_position(&pin.id, pin.position())?;
    }
    Ok(())
}
