/// PostgreSQL repository
///
/// Implements [`DatabaseRepo`] over a sqlx [`PgPool`]. Queries are plain runtime-checked
/// `query`/`query_as` calls against the schema in `migrations/`.
///
/// Unlike the trait default, [`PostgresRepo::book_reservation`] runs in a single
/// transaction and locks the room row first, so two concurrent bookings of the same
/// room cannot both pass the availability check. Owner blocks take the same lock.
///
/// # Example
///
/// ```no_run
/// use hearth_shared::db::pool::{create_pool, DatabaseConfig};
/// use hearth_shared::repository::{DatabaseRepo, PostgresRepo};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let repo = PostgresRepo::new(pool);
/// let rooms = repo.all_rooms().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use super::{DatabaseRepo, RepoError, RepoResult};
use crate::auth::password::verify_password;
use crate::models::{Reservation, RestrictionKind, Room, RoomRestriction, User};

const RESERVATION_COLUMNS: &str = r#"
    r.id, r.first_name, r.last_name, r.email, r.phone, r.start_date, r.end_date,
    r.room_id, r.processed, r.created_at, r.updated_at,
    rm.room_name, rm.created_at AS room_created_at, rm.updated_at AS room_updated_at
"#;

/// Reservation row joined with its room
#[derive(Debug, FromRow)]
struct ReservationRecord {
    id: i32,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    room_id: i32,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    room_name: String,
    room_created_at: DateTime<Utc>,
    room_updated_at: DateTime<Utc>,
}

impl From<ReservationRecord> for Reservation {
    fn from(row: ReservationRecord) -> Self {
        Reservation {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            start_date: row.start_date,
            end_date: row.end_date,
            room_id: row.room_id,
            room: Room {
                id: row.room_id,
                room_name: row.room_name,
                created_at: row.room_created_at,
                updated_at: row.room_updated_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            processed: row.processed,
        }
    }
}

/// Repository backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

impl PostgresRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool behind the repository, shared with the session store
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates or updates a user keyed by email, returning the user's ID
    ///
    /// Used at startup to provision the administrator account.
    pub async fn upsert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
        access_level: i32,
    ) -> RepoResult<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, access_level)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                password_hash = EXCLUDED.password_hash,
                access_level = EXCLUDED.access_level,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(password_hash)
        .bind(access_level)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = id, "Upserted user");
        Ok(id)
    }

    async fn list_reservations(&self, only_new: bool) -> RepoResult<Vec<Reservation>> {
        let filter = if only_new { "WHERE r.processed = FALSE" } else { "" };
        let query = format!(
            "SELECT {} FROM reservations r JOIN rooms rm ON rm.id = r.room_id {} \
             ORDER BY r.start_date DESC, r.id ASC",
            RESERVATION_COLUMNS, filter
        );

        let rows = sqlx::query_as::<_, ReservationRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }
}

/// Locks the room row until the transaction ends
///
/// Every write that adds a restriction takes this lock first, so bookings and owner
/// blocks of one room are serialized.
async fn lock_room(tx: &mut Transaction<'_, Postgres>, room_id: i32) -> RepoResult<()> {
    let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(&mut **tx)
        .await?;
    match locked {
        Some(_) => Ok(()),
        None => Err(RepoError::NotFound(format!("room {}", room_id))),
    }
}

async fn room_is_free(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let overlapping: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(id)
        FROM room_restrictions
        WHERE room_id = $1 AND start_date < $3 AND $2 < end_date
        "#,
    )
    .bind(room_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut **tx)
    .await?;

    Ok(overlapping == 0)
}

#[async_trait]
impl DatabaseRepo for PostgresRepo {
    async fn ping(&self) -> RepoResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> RepoResult<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations
                (first_name, last_name, email, phone, start_date, end_date, room_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&reservation.first_name)
        .bind(&reservation.last_name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.room_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_room_restriction(&self, restriction: &RoomRestriction) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_restrictions
                (start_date, end_date, room_id, reservation_id, restriction_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(restriction.start_date)
        .bind(restriction.end_date)
        .bind(restriction.room_id)
        .bind(restriction.reservation_id)
        .bind(restriction.restriction_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_availability_by_dates_by_room_id(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        room_id: i32,
    ) -> RepoResult<bool> {
        let overlapping: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(id)
            FROM room_restrictions
            WHERE room_id = $1 AND start_date < $3 AND $2 < end_date
            "#,
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(overlapping == 0)
    }

    async fn search_availability_for_all_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT rm.id, rm.room_name, rm.created_at, rm.updated_at
            FROM rooms rm
            WHERE rm.id NOT IN (
                SELECT rr.room_id
                FROM room_restrictions rr
                WHERE rr.start_date < $2 AND $1 < rr.end_date
            )
            ORDER BY rm.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    async fn get_room_by_id(&self, id: i32) -> RepoResult<Room> {
        sqlx::query_as::<_, Room>(
            "SELECT id, room_name, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("room {}", id)))
    }

    async fn get_user_by_id(&self, id: i32) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, access_level,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("user {}", id)))
    }

    async fn update_user(&self, user: &User) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, access_level = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.access_level)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> RepoResult<(i32, String)> {
        let row: Option<(i32, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let (id, hash) = row.ok_or(RepoError::InvalidCredentials)?;
        if !verify_password(password, &hash)? {
            debug!(user_id = id, "Password mismatch");
            return Err(RepoError::InvalidCredentials);
        }
        Ok((id, hash))
    }

    async fn all_reservations(&self) -> RepoResult<Vec<Reservation>> {
        self.list_reservations(false).await
    }

    async fn all_new_reservations(&self) -> RepoResult<Vec<Reservation>> {
        self.list_reservations(true).await
    }

    async fn get_reservation_by_id(&self, id: i32) -> RepoResult<Reservation> {
        let query = format!(
            "SELECT {} FROM reservations r JOIN rooms rm ON rm.id = r.room_id WHERE r.id = $1",
            RESERVATION_COLUMNS
        );

        sqlx::query_as::<_, ReservationRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Reservation::from)
            .ok_or_else(|| RepoError::NotFound(format!("reservation {}", id)))
    }

    async fn update_reservation(&self, reservation: &Reservation) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET first_name = $2, last_name = $3, email = $4, phone = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.first_name)
        .bind(&reservation.last_name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("reservation {}", reservation.id)));
        }
        Ok(())
    }

    async fn delete_reservation(&self, id: i32) -> RepoResult<()> {
        // room_restrictions.reservation_id cascades
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("reservation {}", id)));
        }
        Ok(())
    }

    async fn update_processed_reservation(&self, id: i32, processed: bool) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE reservations SET processed = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(processed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("reservation {}", id)));
        }
        Ok(())
    }

    async fn all_rooms(&self) -> RepoResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT id, room_name, created_at, updated_at FROM rooms ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    async fn get_restrictions_for_room_by_day(
        &self,
        room_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<RoomRestriction>> {
        let restrictions = sqlx::query_as::<_, RoomRestriction>(
            r#"
            SELECT id, start_date, end_date, room_id, reservation_id, restriction_id,
                   created_at, updated_at
            FROM room_restrictions
            WHERE room_id = $1 AND start_date < $3 AND $2 < end_date
            ORDER BY start_date, id
            "#,
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(restrictions)
    }

    async fn insert_block_for_room(&self, room_id: i32, date: NaiveDate) -> RepoResult<()> {
        let block = RoomRestriction::owner_block(room_id, date);
        let mut tx = self.pool.begin().await?;
        lock_room(&mut tx, room_id).await?;

        sqlx::query(
            r#"
            INSERT INTO room_restrictions
                (start_date, end_date, room_id, reservation_id, restriction_id)
            VALUES ($1, $2, $3, NULL, $4)
            "#,
        )
        .bind(block.start_date)
        .bind(block.end_date)
        .bind(block.room_id)
        .bind(block.restriction_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(room_id, %date, "Owner block added");
        Ok(())
    }

    async fn delete_block_for_room(&self, id: i32) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM room_restrictions WHERE id = $1 AND restriction_id = $2")
            .bind(id)
            .bind(RestrictionKind::OwnerBlock.id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("owner block {}", id)));
        }
        Ok(())
    }

    async fn book_reservation(&self, reservation: &Reservation) -> RepoResult<i32> {
        let mut tx = self.pool.begin().await?;

        lock_room(&mut tx, reservation.room_id).await?;

        if !room_is_free(
            &mut tx,
            reservation.room_id,
            reservation.start_date,
            reservation.end_date,
        )
        .await?
        {
            return Err(RepoError::RoomUnavailable {
                room_id: reservation.room_id,
            });
        }

        let reservation_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reservations
                (first_name, last_name, email, phone, start_date, end_date, room_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&reservation.first_name)
        .bind(&reservation.last_name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.room_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO room_restrictions
                (start_date, end_date, room_id, reservation_id, restriction_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.room_id)
        .bind(reservation_id)
        .bind(RestrictionKind::Reservation.id())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            reservation_id,
            room_id = reservation.room_id,
            start_date = %reservation.start_date,
            end_date = %reservation.end_date,
            "Reservation booked"
        );
        Ok(reservation_id)
    }
}
