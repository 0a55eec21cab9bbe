/// Room restriction model
///
/// A room restriction marks a room unavailable for a half-open date interval. It is
/// created either by a booking (linked to its reservation) or by the owner blocking a
/// night from the admin calendar.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE room_restrictions (
///     id SERIAL PRIMARY KEY,
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     room_id INTEGER NOT NULL REFERENCES rooms(id),
///     reservation_id INTEGER REFERENCES reservations(id) ON DELETE CASCADE,
///     restriction_id INTEGER NOT NULL REFERENCES restrictions(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::overlaps;

/// Kind of room restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    /// Created alongside a reservation
    Reservation,

    /// Manual block entered by the owner
    OwnerBlock,
}

impl RestrictionKind {
    /// ID of the seeded `restrictions` row
    pub fn id(&self) -> i32 {
        match self {
            RestrictionKind::Reservation => 1,
            RestrictionKind::OwnerBlock => 2,
        }
    }

    /// Maps a `restrictions.id` back to its kind
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(RestrictionKind::Reservation),
            2 => Some(RestrictionKind::OwnerBlock),
            _ => None,
        }
    }
}

/// Seeded restriction kind row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Restriction {
    pub id: i32,
    pub restriction_name: String,
}

/// Interval during which a room is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomRestriction {
    /// Restriction ID (0 until stored)
    pub id: i32,

    /// First unavailable night
    pub start_date: NaiveDate,

    /// Day the room becomes free again
    pub end_date: NaiveDate,

    /// Restricted room
    pub room_id: i32,

    /// Owning reservation, absent for owner blocks
    pub reservation_id: Option<i32>,

    /// `restrictions.id`, see [`RestrictionKind`]
    pub restriction_id: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRestriction {
    /// Builds the restriction that belongs to a freshly inserted reservation
    pub fn for_reservation(
        reservation_id: i32,
        room_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            start_date,
            end_date,
            room_id,
            reservation_id: Some(reservation_id),
            restriction_id: RestrictionKind::Reservation.id(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a one-night owner block starting on `date`
    pub fn owner_block(room_id: i32, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            start_date: date,
            end_date: date.checked_add_days(Days::new(1)).unwrap_or(date),
            room_id,
            reservation_id: None,
            restriction_id: RestrictionKind::OwnerBlock.id(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Kind of this restriction, if it is one of the seeded kinds
    pub fn kind(&self) -> Option<RestrictionKind> {
        RestrictionKind::from_id(self.restriction_id)
    }

    /// Whether this restriction blocks any night of `[start, end)`
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        overlaps(self.start_date, self.end_date, start, end)
    }
}
