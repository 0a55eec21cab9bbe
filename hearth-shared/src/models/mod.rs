/// Data model for the reservation site
///
/// # Models
///
/// - `room`: bookable rooms (seeded, read-only)
/// - `restriction`: room restrictions, from bookings or owner blocks
/// - `reservation`: guest bookings and the session draft that precedes them
/// - `user`: administrators
///
/// Persistence lives behind [`crate::repository::DatabaseRepo`]; these types carry no
/// queries of their own.

pub mod reservation;
pub mod restriction;
pub mod room;
pub mod user;

pub use reservation::{GuestDetails, Reservation, ReservationDraft};
pub use restriction::{Restriction, RestrictionKind, RoomRestriction};
pub use room::Room;
pub use user::{User, ADMIN_ACCESS_LEVEL};
