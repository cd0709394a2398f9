//! The built-in tour used when nothing usable is stored.

use crate::{AudioRef, Pin, PinId};

pub const DEFAULT_RADIUS_M: f64 = 50.0;

const ORDINALS: [&str; 5] = ["First", "Second", "Third", "Fourth", "Fifth"];

/// (lat, lng, audio asset) per stop, in tour order.
const STOPS: [(f64, f64, &str); 5] = [
    (1.3179288936546796, 103.91176971439205, "01AmkInt.mp3"),
    (1.3176661057893853, 103.91228690401714, "03Blk209.mp3"),
    (1.3187845734739272, 103.91161636053626, "03Blk209.mp3"),
    (1.3185708719523623, 103.91103831042392, "04AmkPriSch.mp3"),
    (1.318497914008612, 103.9104105204259, "05AftAmkAve.mp3"),
];

pub fn default_pins() -> Vec<Pin> {
    STOPS
        .iter()
        .zip(ORDINALS)
        .enumerate()
        .map(|(i, (&(lat, lng, audio), ordinal))| {
            let n = i + 1;
            Pin {
                id: PinId::new(format!("pin-{n}")),
                name: format!("Location {n}"),
                lat,
                lng,
                radius_m: DEFAULT_RADIUS_M,
                audio: AudioRef::new(audio),
                label: format!("Play Audio {n}"),
                description: format!("{ordinal} historical point of interest."),
            }
        })
        .collect()
}
