use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lykk_catalog::{InventoryError, TravelOption};
use lykk_shared::{Page, PageRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::booking::{Booking, BookingDetails};
use crate::profile::UserProfile;
use crate::search::TravelSearch;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats { requested: u32, available: u32 },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Re-evaluated against the locked booking before a cancellation is applied.
pub type CancelGuard<'a> = &'a (dyn Fn(&BookingDetails) -> bool + Send + Sync);

/// Travel option storage
#[async_trait]
pub trait TravelOptionRepository: Send + Sync {
    /// Fails with `Duplicate` when the code is taken.
    async fn insert_option(&self, option: &TravelOption) -> StoreResult<()>;

    /// Inserts all options or none of them.
    async fn insert_options(&self, options: &[TravelOption]) -> StoreResult<usize>;

    async fn get_option(&self, id: Uuid) -> StoreResult<Option<TravelOption>>;

    /// Bookable options matching `search`, ordered by departure.
    async fn search_options(
        &self,
        search: &TravelSearch,
        today: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Page<TravelOption>>;

    /// Deletes the option and its bookings; returns how many bookings went with it.
    async fn delete_option(&self, id: Uuid) -> StoreResult<u64>;
}

/// Booking storage. `create_booking` and `cancel_booking` each run their
/// read-check-write against the seat counter as one atomic unit.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Locks the option, reserves `booking.seats` through the ledger and
    /// inserts the booking. Returns the option as updated.
    ///
    /// Fails with `InsufficientSeats` when the locked counter is too low,
    /// `NotFound` when the option is gone and `Duplicate` on an id collision.
    async fn create_booking(&self, booking: &Booking) -> StoreResult<TravelOption>;

    /// Locks the user's booking, checks `guard` against it, releases its seats
    /// and marks it cancelled.
    ///
    /// Fails with `NotFound` when the booking does not exist or belongs to
    /// someone else, and `PreconditionFailed` when `guard` rejects it.
    async fn cancel_booking(
        &self,
        booking_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        guard: CancelGuard<'_>,
    ) -> StoreResult<BookingDetails>;

    async fn find_booking(&self, booking_id: &str) -> StoreResult<Option<BookingDetails>>;

    /// The user's bookings, newest first.
    async fn list_bookings(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<BookingDetails>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;

    /// Stores `profile` unless one exists for the user; returns whichever is stored.
    async fn create_profile_if_missing(&self, profile: &UserProfile) -> StoreResult<UserProfile>;

    /// Fails with `NotFound` when the user has no profile.
    async fn update_profile(&self, profile: &UserProfile) -> StoreResult<()>;
}

/// Row counts for the admin dashboard and health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub profiles: u64,
    pub travel_options: u64,
    pub travel_options_by_mode: BTreeMap<String, u64>,
    pub bookings: u64,
    pub bookings_by_status: BTreeMap<String, u64>,
    pub available_seats: u64,
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn stats(&self) -> StoreResult<StoreStats>;
}
