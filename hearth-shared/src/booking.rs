/// Reservation submission flow
///
/// [`submit_reservation`] turns the submitted reservation form into a stored booking. The
/// steps run in order and stop at the first failure:
///
/// 1. validate the guest fields
/// 2. parse the stay dates
/// 3. resolve the room
/// 4. book it through [`DatabaseRepo::book_reservation`] under a write timeout
///
/// Nothing is written unless steps 1 to 3 succeed. The caller decides how to present each
/// [`BookingOutcome`]; this module never touches the session or the response.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::dates::DateRange;
use crate::forms::Form;
use crate::models::{GuestDetails, Reservation, Room};
use crate::repository::{DatabaseRepo, RepoError};

/// Fields the reservation form must carry
pub const RESERVATION_FIELDS: [&str; 7] = [
    "start_date",
    "end_date",
    "first_name",
    "last_name",
    "email",
    "phone",
    "room_id",
];

/// Why a submission was turned away before anything was stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// One or more fields failed validation; details are in the form's errors
    InvalidFields,
    /// Dates did not parse or did not form a non-empty range
    InvalidDates,
    /// Room ID was not a known room
    UnknownRoom,
    /// Room was booked by someone else after it was offered
    RoomUnavailable,
}

impl Rejection {
    /// Message shown to the guest
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::InvalidFields => "Please correct the highlighted fields",
            Rejection::InvalidDates => "Invalid dates",
            Rejection::UnknownRoom => "Unknown room",
            Rejection::RoomUnavailable => "That room is no longer available for those dates",
        }
    }
}

/// Result of one reservation submission
#[derive(Debug)]
pub enum BookingOutcome {
    /// Reservation and its room restriction are stored
    Confirmed(Reservation),

    /// Input was refused; nothing new was stored
    RejectedInput {
        form: Form,
        room: Option<Room>,
        reason: Rejection,
    },

    /// Store failed or timed out while writing
    PersistenceFailed(RepoError),
}

/// Validates the submitted reservation form and books the room
///
/// `write_timeout` bounds the booking write. Exceeding it yields
/// `PersistenceFailed(RepoError::Timeout)`.
pub async fn submit_reservation<R>(
    repo: &R,
    values: HashMap<String, String>,
    write_timeout: Duration,
) -> BookingOutcome
where
    R: DatabaseRepo + ?Sized,
{
    let mut form = Form::new(values);
    form.required(&RESERVATION_FIELDS);
    form.min_length("first_name", 3);
    form.min_length("last_name", 3);
    form.is_email("email");

    if !form.valid() {
        debug!(fields = ?form.errors().fields().collect::<Vec<_>>(), "Reservation form invalid");
        return BookingOutcome::RejectedInput {
            form,
            room: None,
            reason: Rejection::InvalidFields,
        };
    }

    let range = match DateRange::parse(form.trimmed("start_date"), form.trimmed("end_date")) {
        Ok(range) => range,
        Err(e) => {
            debug!(error = %e, "Reservation dates rejected");
            return BookingOutcome::RejectedInput {
                form,
                room: None,
                reason: Rejection::InvalidDates,
            };
        }
    };

    let room = match form.trimmed("room_id").parse::<i32>() {
        Ok(id) if id > 0 => match repo.get_room_by_id(id).await {
            Ok(room) => room,
            Err(e) => {
                warn!(room_id = id, error = %e, "Reservation for unknown room");
                return BookingOutcome::RejectedInput {
                    form,
                    room: None,
                    reason: Rejection::UnknownRoom,
                };
            }
        },
        _ => {
            return BookingOutcome::RejectedInput {
                form,
                room: None,
                reason: Rejection::UnknownRoom,
            };
        }
    };

    let guest = GuestDetails {
        first_name: form.trimmed("first_name").to_string(),
        last_name: form.trimmed("last_name").to_string(),
        email: form.trimmed("email").to_string(),
        phone: form.trimmed("phone").to_string(),
    };
    let mut reservation = Reservation::new(guest, range, room);

    let booked = tokio::time::timeout(write_timeout, repo.book_reservation(&reservation)).await;
    match booked {
        Ok(Ok(id)) => {
            reservation.id = id;
            info!(
                reservation_id = id,
                room_id = reservation.room_id,
                nights = range.nights(),
                "Reservation confirmed"
            );
            BookingOutcome::Confirmed(reservation)
        }
        Ok(Err(RepoError::RoomUnavailable { room_id })) => {
            info!(room_id, "Room taken before the reservation was stored");
            BookingOutcome::RejectedInput {
                form,
                room: Some(reservation.room),
                reason: Rejection::RoomUnavailable,
            }
        }
        Ok(Err(e)) => {
            error!(room_id = reservation.room_id, error = %e, "Failed to store reservation");
            BookingOutcome::PersistenceFailed(e)
        }
        Err(_) => {
            error!(
                room_id = reservation.room_id,
                timeout_ms = write_timeout.as_millis() as u64,
                "Storing reservation timed out"
            );
            BookingOutcome::PersistenceFailed(RepoError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepo;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_submission() -> HashMap<String, String> {
        values(&[
            ("start_date", "2050-01-01"),
            ("end_date", "2050-01-02"),
            ("first_name", "John"),
            ("last_name", "Smith"),
            ("email", "john@smith.com"),
            ("phone", "123456789"),
            ("room_id", "1"),
        ])
    }

    fn with(field: &str, value: &str) -> HashMap<String, String> {
        let mut v = valid_submission();
        v.insert(field.to_string(), value.to_string());
        v
    }

    #[tokio::test]
    async fn test_happy_path_stores_both_rows() {
        let repo = MemoryRepo::seeded();

        let outcome = submit_reservation(&repo, valid_submission(), TIMEOUT).await;

        let reservation = match outcome {
            BookingOutcome::Confirmed(r) => r,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(reservation.id, 1);
        assert_eq!(reservation.room.room_name, "General's Quarters");
        assert_eq!(repo.reservations().len(), 1);
        assert_eq!(repo.room_restrictions()[0].reservation_id, Some(reservation.id));
    }

    #[tokio::test]
    async fn test_empty_submission_rejects_every_field() {
        let repo = MemoryRepo::seeded();

        match submit_reservation(&repo, HashMap::new(), TIMEOUT).await {
            BookingOutcome::RejectedInput { form, reason, .. } => {
                assert_eq!(reason, Rejection::InvalidFields);
                for field in RESERVATION_FIELDS {
                    assert!(form.errors().contains(field), "no error for {}", field);
                }
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(repo.reservations().is_empty());
    }

    #[tokio::test]
    async fn test_short_name_and_bad_email_rejected() {
        let repo = MemoryRepo::seeded();
        let mut submission = with("first_name", "Jo");
        submission.insert("email".to_string(), "john@smith".to_string());

        match submit_reservation(&repo, submission, TIMEOUT).await {
            BookingOutcome::RejectedInput { form, reason, .. } => {
                assert_eq!(reason, Rejection::InvalidFields);
                assert!(form.errors().contains("first_name"));
                assert!(form.errors().contains("email"));
                assert_eq!(form.get("first_name"), "Jo");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_dates_rejected_without_field_error() {
        let repo = MemoryRepo::seeded();

        for (field, value) in [
            ("start_date", "invalid"),
            ("end_date", "2050-13-40"),
            ("end_date", "2050-01-01"),
        ] {
            match submit_reservation(&repo, with(field, value), TIMEOUT).await {
                BookingOutcome::RejectedInput { form, reason, .. } => {
                    assert_eq!(reason, Rejection::InvalidDates);
                    assert!(form.valid());
                }
                other => panic!("expected rejection for {}={}, got {:?}", field, value, other),
            }
        }
        assert!(repo.reservations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_room_rejected() {
        let repo = MemoryRepo::seeded();

        for room_id in ["invalid", "0", "-1", "100"] {
            match submit_reservation(&repo, with("room_id", room_id), TIMEOUT).await {
                BookingOutcome::RejectedInput { reason, .. } => {
                    assert_eq!(reason, Rejection::UnknownRoom)
                }
                other => panic!("expected rejection for room {}, got {:?}", room_id, other),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_reservation_insert() {
        let repo = MemoryRepo::seeded();
        repo.fail_reservation_inserts_for_room(2);

        let outcome = submit_reservation(&repo, with("room_id", "2"), TIMEOUT).await;

        assert!(matches!(
            outcome,
            BookingOutcome::PersistenceFailed(RepoError::Persistence(_))
        ));
        assert!(repo.reservations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_restriction_insert() {
        let repo = MemoryRepo::seeded();
        repo.fail_restriction_inserts_for_room(2);

        let outcome = submit_reservation(&repo, with("room_id", "2"), TIMEOUT).await;

        assert!(matches!(outcome, BookingOutcome::PersistenceFailed(_)));
        assert!(repo.room_restrictions().is_empty());
    }

    #[tokio::test]
    async fn test_room_taken_in_between() {
        let repo = MemoryRepo::seeded();
        repo.insert_block_for_room(1, crate::dates::parse_date("2050-01-01").unwrap())
            .await
            .unwrap();

        match submit_reservation(&repo, valid_submission(), TIMEOUT).await {
            BookingOutcome::RejectedInput { room, reason, .. } => {
                assert_eq!(reason, Rejection::RoomUnavailable);
                assert_eq!(room.map(|r| r.id), Some(1));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_adjacent_stay_is_bookable() {
        let repo = MemoryRepo::seeded();
        submit_reservation(&repo, valid_submission(), TIMEOUT).await;

        let mut next = with("start_date", "2050-01-02");
        next.insert("end_date".to_string(), "2050-01-03".to_string());

        assert!(matches!(
            submit_reservation(&repo, next, TIMEOUT).await,
            BookingOutcome::Confirmed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_times_out() {
        let repo = MemoryRepo::seeded();
        repo.delay_writes(Duration::from_secs(60));

        let outcome = submit_reservation(&repo, valid_submission(), Duration::from_secs(1)).await;

        assert!(matches!(
            outcome,
            BookingOutcome::PersistenceFailed(RepoError::Timeout)
        ));
    }
}
