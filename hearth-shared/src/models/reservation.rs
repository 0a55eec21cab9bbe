/// Reservation model
///
/// A reservation is created by the public booking flow and later reviewed by an
/// administrator, who flips `processed`, edits guest details or deletes it. Deleting a
/// reservation cascades to the room restriction it owns.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reservations (
///     id SERIAL PRIMARY KEY,
///     first_name VARCHAR(255) NOT NULL,
///     last_name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     phone VARCHAR(255) NOT NULL DEFAULT '',
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     room_id INTEGER NOT NULL REFERENCES rooms(id),
///     processed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (start_date < end_date)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::room::Room;
use crate::dates::DateRange;

/// A guest's booking of one room for a date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation ID (0 until stored)
    pub id: i32,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    /// Arrival date
    pub start_date: NaiveDate,

    /// Departure date, always after `start_date`
    pub end_date: NaiveDate,

    /// Booked room
    pub room_id: i32,

    /// Snapshot of the booked room taken when the reservation was loaded or built
    pub room: Room,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set once an administrator has handled the booking
    pub processed: bool,
}

/// Guest details captured by the reservation form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl Reservation {
    /// Builds an unsaved reservation for `room` over `range`
    pub fn new(guest: GuestDetails, range: DateRange, room: Room) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            first_name: guest.first_name,
            last_name: guest.last_name,
            email: guest.email,
            phone: guest.phone,
            start_date: range.start,
            end_date: range.end,
            room_id: room.id,
            room,
            created_at: now,
            updated_at: now,
            processed: false,
        }
    }

    /// The stay as a date range
    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Guest's full name for listings
    pub fn guest_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Reservation waiting in the session between room selection and the reservation form
///
/// Only the dates and (once chosen) the room are known at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub room_id: Option<i32>,
}

impl ReservationDraft {
    pub fn new(range: DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
            room_id: None,
        }
    }
}
