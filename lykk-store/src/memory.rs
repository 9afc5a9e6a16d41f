use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lykk_catalog::{InventoryError, TravelOption};
use lykk_core::search::sort_by_departure;
use lykk_core::{
    Booking, BookingDetails, BookingRepository, CancelGuard, ProfileRepository, StatsRepository,
    StoreError, StoreResult, StoreStats, TravelOptionRepository, TravelSearch, UserProfile,
};
use lykk_shared::{Page, PageRequest};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    options: HashMap<Uuid, TravelOption>,
    bookings: HashMap<String, Booking>,
    profiles: HashMap<String, UserProfile>,
}

impl MemoryState {
    fn details(&self, booking: &Booking) -> StoreResult<BookingDetails> {
        let travel_option = self
            .options
            .get(&booking.travel_option_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Travel option {}", booking.travel_option_id)))?;
        Ok(BookingDetails {
            booking: booking.clone(),
            travel_option,
        })
    }
}

/// In-process store with the same semantics as the Postgres one.
///
/// Every operation holds the single state lock for its whole
/// read-check-write, which serializes seat updates the way row locks do.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn option_count(&self) -> usize {
        self.state.lock().await.options.len()
    }
}

#[async_trait]
impl TravelOptionRepository for MemoryStore {
    async fn insert_option(&self, option: &TravelOption) -> StoreResult<()> {
        self.insert_options(std::slice::from_ref(option)).await.map(|_| ())
    }

    async fn insert_options(&self, options: &[TravelOption]) -> StoreResult<usize> {
        let mut state = self.state.lock().await;

        for (i, option) in options.iter().enumerate() {
            let taken = state.options.values().any(|o| o.code == option.code)
                || options[..i].iter().any(|o| o.code == option.code);
            if taken {
                return Err(StoreError::Duplicate(format!("travel option code {}", option.code)));
            }
            if state.options.contains_key(&option.id) {
                return Err(StoreError::Duplicate(format!("travel option {}", option.id)));
            }
            option.inventory()?;
        }

        for option in options {
            state.options.insert(option.id, option.clone());
        }
        Ok(options.len())
    }

    async fn get_option(&self, id: Uuid) -> StoreResult<Option<TravelOption>> {
        Ok(self.state.lock().await.options.get(&id).cloned())
    }

    async fn search_options(
        &self,
        search: &TravelSearch,
        today: NaiveDate,
        page: PageRequest,
    ) -> StoreResult<Page<TravelOption>> {
        let state = self.state.lock().await;
        let mut matches: Vec<TravelOption> = state
            .options
            .values()
            .filter(|option| search.matches(option, today))
            .cloned()
            .collect();
        sort_by_departure(&mut matches);
        Ok(Page::from_vec(matches, page))
    }

    async fn delete_option(&self, id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        if state.options.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("Travel option {}", id)));
        }

        let before = state.bookings.len();
        state.bookings.retain(|_, booking| booking.travel_option_id != id);
        Ok((before - state.bookings.len()) as u64)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> StoreResult<TravelOption> {
        let mut state = self.state.lock().await;

        if state.bookings.contains_key(&booking.booking_id) {
            return Err(StoreError::Duplicate(format!("booking {}", booking.booking_id)));
        }

        let option = state
            .options
            .get_mut(&booking.travel_option_id)
            .ok_or_else(|| StoreError::NotFound(format!("Travel option {}", booking.travel_option_id)))?;

        let mut inventory = option.inventory()?;
        inventory.reserve(booking.seats).map_err(|e| match e {
            InventoryError::InsufficientInventory {
                requested,
                available,
            } => StoreError::InsufficientSeats {
                requested,
                available,
            },
            other => StoreError::Inventory(other),
        })?;
        option.apply_inventory(inventory, booking.booked_at);
        let updated = option.clone();

        state
            .bookings
            .insert(booking.booking_id.clone(), booking.clone());
        Ok(updated)
    }

    async fn cancel_booking(
        &self,
        booking_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        guard: CancelGuard<'_>,
    ) -> StoreResult<BookingDetails> {
        let mut state = self.state.lock().await;
        let not_found = || StoreError::NotFound(format!("Booking {}", booking_id));

        let booking = state
            .bookings
            .get(booking_id)
            .filter(|booking| booking.user_id == user_id)
            .ok_or_else(not_found)?;
        let mut details = state.details(booking)?;

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

        state
            .options
            .insert(details.travel_option.id, details.travel_option.clone());
        state
            .bookings
            .insert(details.booking.booking_id.clone(), details.booking.clone());
        Ok(details)
    }

    async fn find_booking(&self, booking_id: &str) -> StoreResult<Option<BookingDetails>> {
        let state = self.state.lock().await;
        state
            .bookings
            .get(booking_id)
            .map(|booking| state.details(booking))
            .transpose()
    }

    async fn list_bookings(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> StoreResult<Page<BookingDetails>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|booking| booking.user_id == user_id)
            .collect();
        bookings.sort_by(|a, b| {
            b.booked_at
                .cmp(&a.booked_at)
                .then_with(|| a.booking_id.cmp(&b.booking_id))
        });

        let details = bookings
            .into_iter()
            .map(|booking| state.details(booking))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::from_vec(details, page))
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.state.lock().await.profiles.get(user_id).cloned())
    }

    async fn create_profile_if_missing(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        let mut state = self.state.lock().await;
        Ok(state
            .profiles
            .entry(profile.user_id.clone())
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn update_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .profiles
            .get_mut(&profile.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {}", profile.user_id)))?;
        *stored = profile.clone();
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.state.lock().await;

        let mut travel_options_by_mode = BTreeMap::new();
        for option in state.options.values() {
            *travel_options_by_mode
                .entry(option.mode.as_str().to_string())
                .or_insert(0) += 1;
        }
        let mut bookings_by_status = BTreeMap::new();
        for booking in state.bookings.values() {
            *bookings_by_status
                .entry(booking.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        Ok(StoreStats {
            profiles: state.profiles.len() as u64,
            travel_options: state.options.len() as u64,
            travel_options_by_mode,
            bookings: state.bookings.len() as u64,
            bookings_by_status,
            available_seats: state
                .options
                .values()
                .map(|option| u64::from(option.available_seats))
                .sum(),
        })
    }
}
