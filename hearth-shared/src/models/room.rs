/// Room model
///
/// Rooms are reference data: they are created by the seed migration and only ever
/// read by the reservation flow. Every reservation and room restriction points at one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE rooms (
///     id SERIAL PRIMARY KEY,
///     room_name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    /// Room ID
    pub id: i32,

    /// Display name, e.g. "General's Quarters"
    pub room_name: String,

    /// When the room row was created
    pub created_at: DateTime<Utc>,

    /// When the room row was last updated
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Creates a room snapshot with both timestamps set to now
    pub fn new(id: i32, room_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            room_name: room_name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
