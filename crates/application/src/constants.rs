use geoguide_geo::Position;

/// Where the visitor is assumed to be when the position source fails.
pub const DEFAULT_POSITION: Position = Position::new(1.3179, 103.9117);

/// Capacity of the runtime's event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Settings key holding the serialized `GuideConfig`.
pub const CONFIG_KEY: &str = "geoguide_config";
