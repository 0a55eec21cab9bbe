/// In-memory repository
///
/// A deterministic, process-local [`DatabaseRepo`] used by the web crate's tests and
/// for running the site without PostgreSQL. IDs are assigned sequentially from 1 and
/// listings are ordered the same way the SQL queries order them.
///
/// Writes can be made to fail per room, which lets tests drive the booking flow into its
/// persistence-failure paths:
///
/// ```
/// use hearth_shared::repository::MemoryRepo;
///
/// let repo = MemoryRepo::seeded();
/// repo.fail_restriction_inserts_for_room(2);
/// ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{DatabaseRepo, RepoError, RepoResult};
use crate::auth::password::{hash_password, verify_password};
use crate::models::{Reservation, RestrictionKind, Room, RoomRestriction, User};

#[derive(Debug, Default)]
struct MemoryState {
    rooms: BTreeMap<i32, Room>,
    users: BTreeMap<i32, User>,
    reservations: BTreeMap<i32, Reservation>,
    restrictions: BTreeMap<i32, RoomRestriction>,
    next_room_id: i32,
    next_user_id: i32,
    next_reservation_id: i32,
    next_restriction_id: i32,
    failing_reservation_rooms: HashSet<i32>,
    failing_restriction_rooms: HashSet<i32>,
    failing_availability_rooms: HashSet<i32>,
    write_delay: Option<Duration>,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Repository holding all rows in process memory
#[derive(Debug, Default)]
pub struct MemoryRepo {
    state: Mutex<MemoryState>,
}

impl MemoryRepo {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding the two rooms the seed migration creates
    pub fn seeded() -> Self {
        let repo = Self::new();
        repo.add_room("General's Quarters");
        repo.add_room("Major's Suite");
        repo
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a room and returns it
    pub fn add_room(&self, room_name: &str) -> Room {
        let mut state = self.lock();
        let id = next_id(&mut state.next_room_id);
        let room = Room::new(id, room_name);
        state.rooms.insert(id, room.clone());
        room
    }

    /// Adds a user whose password is hashed the same way as in production
    pub fn add_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        access_level: i32,
    ) -> RepoResult<User> {
        let password_hash = hash_password(password)?;
        let mut state = self.lock();
        let id = next_id(&mut state.next_user_id);
        let now = Utc::now();
        let user = User {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password_hash,
            access_level,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    /// Makes `insert_reservation` fail for reservations of `room_id`
    pub fn fail_reservation_inserts_for_room(&self, room_id: i32) {
        self.lock().failing_reservation_rooms.insert(room_id);
    }

    /// Makes `insert_room_restriction` fail for restrictions on `room_id`
    pub fn fail_restriction_inserts_for_room(&self, room_id: i32) {
        self.lock().failing_restriction_rooms.insert(room_id);
    }

    /// Makes availability queries for `room_id` fail
    pub fn fail_availability_queries_for_room(&self, room_id: i32) {
        self.lock().failing_availability_rooms.insert(room_id);
    }

    /// Delays every reservation insert by `delay`
    pub fn delay_writes(&self, delay: Duration) {
        self.lock().write_delay = Some(delay);
    }

    /// Snapshot of every stored reservation, ordered by ID
    pub fn reservations(&self) -> Vec<Reservation> {
        self.lock().reservations.values().cloned().collect()
    }

    /// Snapshot of every stored room restriction, ordered by ID
    pub fn room_restrictions(&self) -> Vec<RoomRestriction> {
        self.lock().restrictions.values().cloned().collect()
    }
}

impl MemoryState {
    fn room_is_free(&self, room_id: i32, start: NaiveDate, end: NaiveDate) -> bool {
        !self
            .restrictions
            .values()
            .any(|r| r.room_id == room_id && r.overlaps(start, end))
    }

    fn sorted_reservations(&self, only_new: bool) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .values()
            .filter(|r| !only_new || !r.processed)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));
        reservations
    }
}

#[async_trait]
impl DatabaseRepo for MemoryRepo {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> RepoResult<i32> {
        let delay = self.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.failing_reservation_rooms.contains(&reservation.room_id) {
            return Err(RepoError::Persistence(format!(
                "insert into reservations rejected for room {}",
                reservation.room_id
            )));
        }
        let room = state
            .rooms
            .get(&reservation.room_id)
            .cloned()
            .ok_or_else(|| RepoError::Persistence("reservations_room_id_fkey".to_string()))?;

        let id = next_id(&mut state.next_reservation_id);
        let now = Utc::now();
        let stored = Reservation {
            id,
            room,
            created_at: now,
            updated_at: now,
            ..reservation.clone()
        };
        state.reservations.insert(id, stored);
        Ok(id)
    }

    async fn insert_room_restriction(&self, restriction: &RoomRestriction) -> RepoResult<()> {
        let mut state = self.lock();
        if state.failing_restriction_rooms.contains(&restriction.room_id) {
            return Err(RepoError::Persistence(format!(
                "insert into room_restrictions rejected for room {}",
                restriction.room_id
            )));
        }
        if restriction.start_date > restriction.end_date {
            return Err(RepoError::Persistence(
                "room_restrictions_dates_ordered".to_string(),
            ));
        }
        let id = next_id(&mut state.next_restriction_id);
        let now = Utc::now();
        state.restrictions.insert(
            id,
            RoomRestriction {
                id,
                created_at: now,
                updated_at: now,
                ..restriction.clone()
            },
        );
        Ok(())
    }

    async fn search_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> RepoResult<bool> {
        let state = self.lock();
        if state.failing_availability_rooms.contains(&room_id) {
            return Err(RepoError::Persistence(format!(
                "availability query failed for room {}",
                room_id
            )));
        }
        Ok(state.room_is_free(room_id, start, end))
    }

    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<Room>> {
        let state = self.lock();
        Ok(state
            .rooms
            .values()
            .filter(|room| state.room_is_free(room.id, start, end))
            .cloned()
            .collect())
    }

    async fn get_room_by_id(&self, id: i32) -> RepoResult<Room> {
        self.lock()
            .rooms
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("room {}", id)))
    }

    async fn get_user_by_id(&self, id: i32) -> RepoResult<User> {
        self.lock()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("user {}", id)))
    }

    async fn update_user(&self, user: &User) -> RepoResult<()> {
        let mut state = self.lock();
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or_else(|| RepoError::NotFound(format!("user {}", user.id)))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.email = user.email.clone();
        stored.access_level = user.access_level;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> RepoResult<(i32, String)> {
        let user = self
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(RepoError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(RepoError::InvalidCredentials);
        }
        Ok((user.id, user.password_hash))
    }

    async fn all_reservations(&self) -> RepoResult<Vec<Reservation>> {
        Ok(self.lock().sorted_reservations(false))
    }

    async fn all_new_reservations(&self) -> RepoResult<Vec<Reservation>> {
        Ok(self.lock().sorted_reservations(true))
    }

    async fn get_reservation_by_id(&self, id: i32) -> RepoResult<Reservation> {
        self.lock()
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("reservation {}", id)))
    }

    async fn update_reservation(&self, reservation: &Reservation) -> RepoResult<()> {
        let mut state = self.lock();
        let stored = state
            .reservations
            .get_mut(&reservation.id)
            .ok_or_else(|| RepoError::NotFound(format!("reservation {}", reservation.id)))?;
        stored.first_name = reservation.first_name.clone();
        stored.last_name = reservation.last_name.clone();
        stored.email = reservation.email.clone();
        stored.phone = reservation.phone.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_reservation(&self, id: i32) -> RepoResult<()> {
        let mut state = self.lock();
        if state.reservations.remove(&id).is_none() {
            return Err(RepoError::NotFound(format!("reservation {}", id)));
        }
        state.restrictions.retain(|_, r| r.reservation_id != Some(id));
        Ok(())
    }

    async fn update_processed_reservation(&self, id: i32, processed: bool) -> RepoResult<()> {
        let mut state = self.lock();
        let stored = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("reservation {}", id)))?;
        stored.processed = processed;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn all_rooms(&self) -> RepoResult<Vec<Room>> {
        Ok(self.lock().rooms.values().cloned().collect())
    }

    async fn get_restrictions_for_room_by_day(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<RoomRestriction>> {
        Ok(self
            .lock()
            .restrictions
            .values()
            .filter(|r| r.room_id == room_id && r.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn insert_block_for_room(&self, room_id: i32, date: NaiveDate) -> RepoResult<()> {
        self.insert_room_restriction(&RoomRestriction::owner_block(room_id, date))
            .await
    }

    async fn delete_block_for_room(&self, id: i32) -> RepoResult<()> {
        let mut state = self.lock();
        let before = state.restrictions.len();
        state
            .restrictions
            .retain(|_, r| !(r.id == id && r.kind() == Some(RestrictionKind::OwnerBlock)));

        if state.restrictions.len() == before {
            return Err(RepoError::NotFound(format!("owner block {}", id)));
        }
        Ok(())
    }
}
