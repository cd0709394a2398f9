use geoguide_pins::{default_pins, validate_pins, Pin, PinError, PinRepository};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// Settings key holding the pin list as a JSON array.
pub const PINS_KEY: &str = "geoguide_pins";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("invalid pins: {0}")]
    InvalidPins(#[from] PinError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    /// Returns true if a value was removed.
    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let affected = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Read a JSON-encoded setting. Missing keys yield `Ok(None)`.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_setting(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set_setting(key, &json)
    }
}

/// Why a stored pin list was rejected.
#[derive(Debug)]
enum Rejection {
    /// Not a JSON array. Left in place.
    Unreadable(String),
    MissingRadius,
    StaleAudio(String),
    Malformed(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Unreadable(reason) => write!(f, "unreadable: {reason}"),
            Rejection::MissingRadius => write!(f, "record without radius"),
            Rejection::StaleAudio(uri) => write!(f, "stale audio reference {uri}"),
            Rejection::Malformed(reason) => write!(f, "malformed: {reason}"),
        }
    }
}

/// Decode the stored pin list, rejecting records from older releases.
fn decode_pins(json: &str) -> std::result::Result<Vec<Pin>, Rejection> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| Rejection::Unreadable(e.to_string()))?;

    for record in &records {
        if record.get("radius").map_or(true, serde_json::Value::is_null) {
            return Err(Rejection::MissingRadius);
        }
        let audio = record
            .get("audioUrl")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if geoguide_pins::AudioRef::new(audio).is_stale_placeholder() {
            return Err(Rejection::StaleAudio(audio.to_string()));
        }
    }

    let pins: Vec<Pin> = records
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Rejection::Malformed(e.to_string()))?;
    validate_pins(&pins).map_err(|e| Rejection::Malformed(e.to_string()))?;
    Ok(pins)
}

impl PinRepository for Database {
    type Error = StorageError;

    fn load(&self) -> Result<Vec<Pin>> {
        let Some(json) = self.get_setting(PINS_KEY)? else {
            return Ok(default_pins());
        };

        match decode_pins(&json) {
            Ok(pins) => Ok(pins),
            Err(rejection @ Rejection::Unreadable(_)) => {
                tracing::warn!(%rejection, "Stored pins unreadable, using default tour");
                Ok(default_pins())
            }
            Err(rejection) => {
                tracing::warn!(%rejection, "Discarding stored pins, using default tour");
                self.remove_setting(PINS_KEY)?;
                Ok(default_pins())
            }
        }
    }

    fn save(&self, pins: &[Pin]) -> Result<()> {
        validate_pins(pins)?;
        self.save_json(PINS_KEY, pins)?;
        tracing::info!(count = pins.len(), "Saved pins");
        Ok(())
    }

    fn reset_to_default(&self) -> Result<Vec<Pin>> {
        self.remove_setting(PINS_KEY)?;
        tracing::info!("Reset pins to default tour");
        Ok(default_pins())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_null_radius() {
        let json = r#"[{"id":"a","name":"A","lat":1.0,"lng":1.0,"radius":null,
            "audioUrl":"a.mp3","buttonLabel":"Play","description":""}]"#;
        assert!(matches!(decode_pins(json), Err(Rejection::MissingRadius)));
    }

    #[test]
    fn test_decode_rejects_negative_radius() {
        let json = r#"[{"id":"a","name":"A","lat":1.0,"lng":1.0,"radius":-1,
            "audioUrl":"a.mp3","buttonLabel":"Play","description":""}]"#;
        assert!(matches!(decode_pins(json), Err(Rejection::Malformed(_))));
    }

    #[test]
    fn test_decode_unparsable_is_unreadable() {
        assert!(matches!(decode_pins("{not json"), Err(Rejection::Unreadable(_))));
        assert!(matches!(decode_pins(r#"{"id":"a"}"#), Err(Rejection::Unreadable(_))));
    }

    #[test]
    fn test_decode_empty_list() {
        assert_eq!(decode_pins("[]").unwrap(), Vec::<Pin>::new());
    }
}
