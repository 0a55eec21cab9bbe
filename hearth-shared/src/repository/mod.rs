/// Persistence contract
///
/// [`DatabaseRepo`] is the single seam between the site and its storage. Two variants
/// implement it:
///
/// - [`postgres::PostgresRepo`]: the production store, backed by a sqlx `PgPool`
/// - [`memory::MemoryRepo`]: a deterministic in-process store for tests and demos, with
///   switchable write failures
///
/// Every operation is fail-fast: it returns the requested value or a [`RepoError`] and
/// never retries.
///
/// # Availability
///
/// Stays and restrictions are half-open intervals. A room is available for
/// `[start, end)` iff none of its restrictions satisfies
/// `restriction.start_date < end AND start < restriction.end_date`.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::auth::password::PasswordError;
use crate::models::{Reservation, Room, RoomRestriction, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepo;
pub use postgres::PostgresRepo;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Referenced row does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Email/password pair did not match a user
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Room has an overlapping restriction
    #[error("room {room_id} is not available for the requested dates")]
    RoomUnavailable { room_id: i32 },

    /// Operation did not finish in time
    #[error("operation timed out")]
    Timeout,

    /// Store read or write failed
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Repository result type alias
pub type RepoResult<T> = Result<T, RepoError>;

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row".to_string()),
            sqlx::Error::PoolTimedOut => RepoError::Timeout,
            other => RepoError::Persistence(other.to_string()),
        }
    }
}

impl From<PasswordError> for RepoError {
    fn from(err: PasswordError) -> Self {
        RepoError::Persistence(err.to_string())
    }
}

/// Storage operations used by the public flow and the back office
#[async_trait]
pub trait DatabaseRepo: Send + Sync {
    /// Checks that the store is reachable
    async fn ping(&self) -> RepoResult<()>;

    /// Inserts a reservation and returns its new ID
    async fn insert_reservation(&self, reservation: &Reservation) -> RepoResult<i32>;

    /// Inserts a room restriction
    async fn insert_room_restriction(&self, restriction: &RoomRestriction) -> RepoResult<()>;

    /// Whether `room_id` has no restriction overlapping `[start, end)`
    async fn search_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> RepoResult<bool>;

    /// Rooms with no restriction overlapping `[start, end)`, ordered by ID
    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<Room>>;

    async fn get_room_by_id(&self, id: i32) -> RepoResult<Room>;

    async fn get_user_by_id(&self, id: i32) -> RepoResult<User>;

    /// Updates name, email and access level of an existing user
    async fn update_user(&self, user: &User) -> RepoResult<()>;

    /// Checks credentials, returning the user's ID and stored hash
    async fn authenticate(&self, email: &str, password: &str) -> RepoResult<(i32, String)>;

    /// All reservations, newest arrival first
    async fn all_reservations(&self) -> RepoResult<Vec<Reservation>>;

    /// Reservations not yet processed, newest arrival first
    async fn all_new_reservations(&self) -> RepoResult<Vec<Reservation>>;

    async fn get_reservation_by_id(&self, id: i32) -> RepoResult<Reservation>;

    /// Updates guest details of an existing reservation
    async fn update_reservation(&self, reservation: &Reservation) -> RepoResult<()>;

    /// Deletes a reservation together with the restriction it owns
    async fn delete_reservation(&self, id: i32) -> RepoResult<()>;

    async fn update_processed_reservation(&self, id: i32, processed: bool) -> RepoResult<()>;

    /// All rooms ordered by ID
    async fn all_rooms(&self) -> RepoResult<Vec<Room>>;

    /// Restrictions on `room_id` overlapping `[start, end)`
    async fn get_restrictions_for_room_by_day(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<RoomRestriction>>;

    /// Blocks `room_id` for the night of `date`
    async fn insert_block_for_room(&self, room_id: i32, date: NaiveDate) -> RepoResult<()>;

    /// Removes an owner block by restriction ID
    ///
    /// `NotFound` when no owner block has that ID; reservation restrictions are never
    /// removed here.
    async fn delete_block_for_room(&self, id: i32) -> RepoResult<()>;

    /// Books a reservation: reconfirms availability, inserts the reservation, then its
    /// room restriction
    ///
    /// This default runs the steps one after another with no transaction. If the
    /// restriction insert fails the reservation row stays behind without a restriction.
    /// Stores that support transactions override it to make the booking all-or-nothing.
    async fn book_reservation(&self, reservation: &Reservation) -> RepoResult<i32> {
        let available = self
            .search_availability_by_dates_by_room_id(
                reservation.start_date,
                reservation.end_date,
                reservation.room_id,
            )
            .await?;
        if !available {
            return Err(RepoError::RoomUnavailable {
                room_id: reservation.room_id,
            });
        }

        let reservation_id = self.insert_reservation(reservation).await?;

        let restriction = RoomRestriction::for_reservation(
            reservation_id,
            reservation.room_id,
            reservation.start_date,
            reservation.end_date,
        );
        self.insert_room_restriction(&restriction).await?;

        Ok(reservation_id)
    }
}
