use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use lykk_catalog::{InventoryError, TravelOption};
use lykk_core::{
    Booking, BookingDetails, BookingRepository, BookingStatus, CancelGuard, ProfileRepository,
    StatsRepository, StoreError, StoreResult, StoreStats, TravelOptionRepository, TravelSearch,
    UserProfile,
};
use lykk_shared::{Masked, Page, PageRequest};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

const OPTION_COLUMNS: &str = "id, code, mode, origin, destination, departure_date, departure_time, \
     arrival_date, arrival_time, price, available_seats, total_seats, created_at, updated_at";

const DETAILS_SELECT: &str = "SELECT b.booking_id, b.user_id, b.travel_option_id, b.seats, \
     b.total_price, b.status, b.passenger_names, b.contact_email, b.contact_phone, b.booked_at, \
     b.updated_at, t.code, t.mode, t.origin, t.destination, t.departure_date, t.departure_time, \
     t.arrival_date, t.arrival_time, t.price, t.available_seats, t.total_seats, \
     t.created_at AS option_created_at, t.updated_at AS option_updated_at \
     FROM bookings b JOIN travel_options t ON t.id = b.travel_option_id";

const SEARCH_FILTER: &str = "WHERE departure_date >= $1 AND available_seats > 0 \
     AND ($2::text IS NULL OR mode = $2) \
     AND ($3::text IS NULL OR origin ILIKE $3) \
     AND ($4::text IS NULL OR destination ILIKE $4) \
     AND ($5::date IS NULL OR departure_date = $5)";

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_option(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> StoreResult<TravelOption> {
        let sql = format!("SELECT {} FROM travel_options WHERE id = $1 FOR UPDATE", OPTION_COLUMNS);
        let row: Option<TravelOptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?;

        row.ok_or_else(|| StoreError::NotFound(format!("Travel option {}", id)))?
            .try_into()
    }

    /// Locks the option row a user's booking points at. Every writer locks the
    /// option before any booking row, so cancellations and deletes cannot deadlock.
    async fn lock_option_of_booking(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: &str,
        user_id: &str,
    ) -> StoreResult<()> {
        let locked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM travel_options
            WHERE id = (SELECT travel_option_id FROM bookings WHERE booking_id = $1 AND user_id = $2)
            FOR UPDATE
            "#,
        )
        .bind(booking_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?;

        locked
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Booking {}", booking_id)))
    }

    async fn store_seats(
        tx: &mut Transaction<'_, Postgres>,
        option: &TravelOption,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE travel_options SET available_seats = $2, updated_at = $3 WHERE id = $1")
            .bind(option.id)
            .bind(to_i32(option.available_seats)?)
            .bind(option.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn insert_option_in(
        tx: &mut Transaction<'_, Postgres>,
        option: &TravelOption,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO travel_options (id, code, mode, origin, destination, departure_date,
                departure_time, arrival_date, arrival_time, price, available_seats, total_seats,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(option.id)
        .bind(&option.code)
        .bind(option.mode.as_str())
        .bind(&option.origin)
        .bind(&option.destination)
        .bind(option.departure_date)
        .bind(option.departure_time)
        .bind(option.arrival_date)
        .bind(option.arrival_time)
        .bind(option.price)
        .bind(to_i32(option.available_seats)?)
        .bind(to_i32(option.total_seats)?)
        .bind(option.created_at)
        .bind(option.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| duplicate_or_backend(e, &format!("travel option code {}", option.code)))?;
        Ok(())
    }
}

#[async_trait]
impl TravelOptionRepository for PostgresStore {
    async fn insert_option(&self, option: &TravelOption) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        Self::insert_option_in(&mut tx, option).await?;
        tx.commit().await.map_err(backend)
    }

    async fn insert_options(&self, options: &[TravelOption]) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for option in options {
            Self::insert_option_in(&mut tx, option).await?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(options.len())
    }

    async fn get_option(&self, id: Uuid) -> StoreResult<Option<TravelOption>> {
        let sql = format!("SELECT {} FROM travel_options WHERE id = $1", OPTION_COLUMNS);
        let row: Option<TravelOptionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(TravelOption::try_from).transpose()
    }

    async fn search_options(
        &self,
        search: &TravelSearch,
        today: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Page<TravelOption>> {
        let mode = search.mode.map(|m| m.as_str().to_string());
        let origin = search.origin.as_deref().map(contains_pattern);
        let destination = search.destination.as_deref().map(contains_pattern);

        let count_sql = format!("SELECT COUNT(*) FROM travel_options {}", SEARCH_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(today)
            .bind(&mode)
            .bind(&origin)
            .bind(&destination)
            .bind(search.departure_date)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let resolved = page.resolve(to_u64(total));
        let page_sql = format!(
            "SELECT {} FROM travel_options {} \
             ORDER BY departure_date, departure_time, code LIMIT $6 OFFSET $7",
            OPTION_COLUMNS, SEARCH_FILTER
        );
        let rows: Vec<TravelOptionRow> = sqlx::query_as(&page_sql)
            .bind(today)
            .bind(&mode)
            .bind(&origin)
            .bind(&destination)
            .bind(search.departure_date)
            .bind(to_i64(resolved.limit()))
            .bind(to_i64(resolved.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let items = rows
            .into_iter()
            .map(TravelOption::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, resolved, to_u64(total)))
    }

    async fn delete_option(&self, id: Uuid) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        Self::lock_option(&mut tx, id).await?;
        let bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE travel_option_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?;

        let deleted = sqlx::query("DELETE FROM travel_options WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Travel option {}", id)));
        }

        tx.commit().await.map_err(backend)?;
        Ok(to_u64(bookings))
    }
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<TravelOption> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let mut option = Self::lock_option(&mut tx, booking.travel_option_id).await?;
        let mut inventory = option.inventory()?;
        inventory.reserve(booking.seats).map_err(insufficient_seats)?;
        option.apply_inventory(inventory, booking.booked_at);
        Self::store_seats(&mut tx, &option).await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, user_id, travel_option_id, seats, total_price, status,
                passenger_names, contact_email, contact_phone, booked_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&booking.booking_id)
        .bind(&booking.user_id)
        .bind(booking.travel_option_id)
        .bind(to_i32(booking.seats)?)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(&booking.passenger_names)
        .bind(&booking.contact_email.0)
        .bind(&booking.contact_phone.0)
        .bind(booking.booked_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_or_backend(e, &format!("booking {}", booking.booking_id)))?;

        tx.commit().await.map_err(backend)?;
        Ok(option)
    }

    async fn cancel_booking(
        &self,
        booking_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        guard: CancelGuard<'_>,
    ) -> StoreResult<BookingDetails> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        Self::lock_option_of_booking(&mut tx, booking_id, user_id).await?;
        let sql = format!(
            "{} WHERE b.booking_id = $1 AND b.user_id = $2 FOR UPDATE OF b",
            DETAILS_SELECT
        );
        let row: Option<BookingDetailsRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        let mut details: BookingDetails = row
            .ok_or_else(|| StoreError::NotFound(format!("Booking {}", booking_id)))?
            .try_into()?;

        if !guard(&details) {
            return Err(StoreError::PreconditionFailed(format!(
                "booking {} is {} and departs at {}",
                booking_id,
                details.booking.status,
                details.travel_option.departure_at()
            )));
        }

        let mut inventory = details.travel_option.inventory()?;
        inventory.release(details.booking.seats)?;
        details.travel_option.apply_inventory(inventory, at);
        details
            .booking
            .cancel(at)
            .map_err(|e| StoreError::PreconditionFailed(e.to_string()))?;

        Self::store_seats(&mut tx, &details.travel_option).await?;
        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE booking_id = $1")
            .bind(booking_id)
            .bind(details.booking.status.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(details)
    }

    async fn find_booking(&self, booking_id: &str) -> StoreResult<Option<BookingDetails>> {
        let sql = format!("{} WHERE b.booking_id = $1", DETAILS_SELECT);
        let row: Option<BookingDetailsRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(BookingDetails::try_from).transpose()
    }

    async fn list_bookings(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<BookingDetails>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let resolved = page.resolve(to_u64(total));
        let sql = format!(
            "{} WHERE b.user_id = $1 ORDER BY b.booked_at DESC, b.booking_id LIMIT $2 OFFSET $3",
            DETAILS_SELECT
        );
        let rows: Vec<BookingDetailsRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(to_i64(resolved.limit()))
            .bind(to_i64(resolved.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let items = rows
            .into_iter()
            .map(BookingDetails::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, resolved, to_u64(total)))
    }
}

#[async_trait]
impl ProfileRepository for PostgresStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT user_id, email, first_name, last_name, phone_number, date_of_birth, address,
                created_at, updated_at
            FROM profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(UserProfile::from))
    }

    async fn create_profile_if_missing(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email, first_name, last_name, phone_number, date_of_birth,
                address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.email.0)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone_number.0)
        .bind(profile.date_of_birth)
        .bind(&profile.address)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        self.get_profile(&profile.user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Profile {}", profile.user_id)))
    }

    async fn update_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE profiles
            SET email = $2, first_name = $3, last_name = $4, phone_number = $5,
                date_of_birth = $6, address = $7, updated_at = $8
            WHERE user_id = $1
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.email.0)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone_number.0)
        .bind(profile.date_of_birth)
        .bind(&profile.address)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Profile {}", profile.user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for PostgresStore {
    async fn stats(&self) -> StoreResult<StoreStats> {
        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let by_mode: Vec<(String, i64)> =
            sqlx::query_as("SELECT mode, COUNT(*) FROM travel_options GROUP BY mode")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        let available_seats: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(available_seats), 0)::BIGINT FROM travel_options")
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;

        let travel_options_by_mode: std::collections::BTreeMap<String, u64> = by_mode
            .into_iter()
            .map(|(mode, count)| (mode, to_u64(count)))
            .collect();
        let bookings_by_status: std::collections::BTreeMap<String, u64> = by_status
            .into_iter()
            .map(|(status, count)| (status, to_u64(count)))
            .collect();

        Ok(StoreStats {
            profiles: to_u64(profiles),
            travel_options: travel_options_by_mode.values().sum(),
            travel_options_by_mode,
            bookings: bookings_by_status.values().sum(),
            bookings_by_status,
            available_seats: to_u64(available_seats),
        })
    }
}

#[derive(FromRow)]
struct TravelOptionRow {
    id: Uuid,
    code: String,
    mode: String,
    origin: String,
    destination: String,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    arrival_date: NaiveDate,
    arrival_time: NaiveTime,
    price: Decimal,
    available_seats: i32,
    total_seats: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TravelOptionRow> for TravelOption {
    type Error = StoreError;

    fn try_from(row: TravelOptionRow) -> StoreResult<Self> {
        Ok(TravelOption {
            id: row.id,
            code: row.code,
            mode: row.mode.parse().map_err(StoreError::Backend)?,
            origin: row.origin,
            destination: row.destination,
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            arrival_date: row.arrival_date,
            arrival_time: row.arrival_time,
            price: row.price,
            available_seats: to_u32(row.available_seats)?,
            total_seats: to_u32(row.total_seats)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BookingDetailsRow {
    booking_id: String,
    user_id: String,
    travel_option_id: Uuid,
    seats: i32,
    total_price: Decimal,
    status: String,
    passenger_names: Vec<String>,
    contact_email: String,
    contact_phone: String,
    booked_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    code: String,
    mode: String,
    origin: String,
    destination: String,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    arrival_date: NaiveDate,
    arrival_time: NaiveTime,
    price: Decimal,
    available_seats: i32,
    total_seats: i32,
    option_created_at: DateTime<Utc>,
    option_updated_at: DateTime<Utc>,
}

impl TryFrom<BookingDetailsRow> for BookingDetails {
    type Error = StoreError;

    fn try_from(row: BookingDetailsRow) -> StoreResult<Self> {
        let travel_option = TravelOptionRow {
            id: row.travel_option_id,
            code: row.code,
            mode: row.mode,
            origin: row.origin,
            destination: row.destination,
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            arrival_date: row.arrival_date,
            arrival_time: row.arrival_time,
            price: row.price,
            available_seats: row.available_seats,
            total_seats: row.total_seats,
            created_at: row.option_created_at,
            updated_at: row.option_updated_at,
        }
        .try_into()?;

        let status: BookingStatus = row.status.parse().map_err(StoreError::Backend)?;
        Ok(BookingDetails {
            booking: Booking {
                booking_id: row.booking_id,
                user_id: row.user_id,
                travel_option_id: row.travel_option_id,
                seats: to_u32(row.seats)?,
                total_price: row.total_price,
                status,
                passenger_names: row.passenger_names,
                contact_email: Masked(row.contact_email),
                contact_phone: Masked(row.contact_phone),
                booked_at: row.booked_at,
                updated_at: row.updated_at,
            },
            travel_option,
        })
    }
}

#[derive(FromRow)]
struct ProfileRow {
    user_id: String,
    email: String,
    first_name: String,
    last_name: String,
    phone_number: String,
    date_of_birth: Option<NaiveDate>,
    address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        UserProfile {
            user_id: row.user_id,
            email: Masked(row.email),
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: Masked(row.phone_number),
            date_of_birth: row.date_of_birth,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!("Database error: {}", err);
    StoreError::Backend(err.to_string())
}

fn duplicate_or_backend(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(what.to_string())
        }
        _ => backend(err),
    }
}

fn insufficient_seats(err: InventoryError) -> StoreError {
    match err {
        InventoryError::InsufficientInventory {
            requested,
            available,
        } => StoreError::InsufficientSeats {
            requested,
            available,
        },
        other => StoreError::Inventory(other),
    }
}

/// `%needle%` for ILIKE, with LIKE wildcards in the needle escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn to_i32(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("seat count {} out of range", value)))
}

fn to_u32(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("negative seat count {}", value)))
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("york"), "%york%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_seat_conversions() {
        assert_eq!(to_i32(40).unwrap(), 40);
        assert!(to_i32(u32::MAX).is_err());
        assert!(to_u32(-1).is_err());
    }
}
