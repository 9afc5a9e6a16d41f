use chrono::Duration;
use lykk_catalog::TravelOption;
use lykk_core::{
    Booking, BookingDetails, BookingRepository, BookingRequest, IdGenerator, StoreError,
    TravelOptionRepository, ValidationErrors,
};
use lykk_shared::{Clock, Page, PageRequest};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};

pub const DEFAULT_CANCELLATION_WINDOW_HOURS: u32 = 24;

/// Creates and cancels bookings against the seat ledger.
pub struct BookingLifecycle {
    options: Arc<dyn TravelOptionRepository>,
    bookings: Arc<dyn BookingRepository>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    cancellation_window: Duration,
}

impl BookingLifecycle {
    pub fn new(
        options: Arc<dyn TravelOptionRepository>,
        bookings: Arc<dyn BookingRepository>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            bookings,
            ids,
            clock,
            cancellation_window: Duration::hours(i64::from(DEFAULT_CANCELLATION_WINDOW_HOURS)),
        }
    }

    pub fn with_cancellation_window(mut self, hours: u32) -> Self {
        self.cancellation_window = Duration::hours(i64::from(hours));
        self
    }

    pub fn cancellation_window(&self) -> Duration {
        self.cancellation_window
    }

    pub fn is_available(&self, option: &TravelOption) -> bool {
        option.is_available(self.clock.today())
    }

    pub fn can_cancel(&self, details: &BookingDetails) -> bool {
        details.can_cancel(self.clock.now(), self.cancellation_window)
    }

    /// Validates the request, then reserves seats and stores a confirmed booking
    /// in one atomic store operation.
    pub async fn create_booking(
        &self,
        user_id: &str,
        travel_option_id: Uuid,
        request: BookingRequest,
    ) -> BookingResult<Booking> {
        let request = request.validate()?;

        let option = self
            .options
            .get_option(travel_option_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Travel option {}", travel_option_id)))?;

        if option.departure_date < self.clock.today() {
            return Err(ValidationErrors::single(
                "travel_option",
                "This travel option has already departed.",
            )
            .into());
        }
        if request.seats > option.available_seats {
            tracing::warn!(
                "Rejected booking on {}: requested {} seats, {} available",
                option.code,
                request.seats,
                option.available_seats
            );
            return Err(BookingError::SeatsUnavailable {
                requested: request.seats,
                available: option.available_seats,
            });
        }

        let booking = Booking::confirmed(
            self.ids.booking_id(),
            user_id,
            request,
            &option,
            self.clock.now(),
        )
        .map_err(|e| BookingError::Integrity(e.to_string()))?;

        match self.bookings.create_booking(&booking).await {
            Ok(updated) => {
                let occupancy = updated
                    .inventory()
                    .map(|inventory| inventory.utilization())
                    .unwrap_or_default();
                tracing::info!(
                    booking_id = %booking.booking_id,
                    travel_option = %updated.code,
                    seats = booking.seats,
                    remaining = updated.available_seats,
                    occupancy = format_args!("{:.0}%", occupancy * 100.0),
                    contact_email = %booking.contact_email,
                    "Booking confirmed"
                );
                Ok(booking)
            }
            Err(StoreError::Duplicate(what)) => {
                tracing::error!("Booking identifier collision: {}", what);
                Err(BookingError::Integrity(format!(
                    "booking identifier {} already in use",
                    booking.booking_id
                )))
            }
            Err(StoreError::InsufficientSeats {
                requested,
                available,
            }) => {
                tracing::warn!(
                    "Lost seat race on {}: requested {}, {} left",
                    option.code,
                    requested,
                    available
                );
                Err(BookingError::SeatsUnavailable {
                    requested,
                    available,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancels the user's booking if it is still confirmed and outside the
    /// cancellation window, giving its seats back.
    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> BookingResult<BookingDetails> {
        let now = self.clock.now();
        let window = self.cancellation_window;
        let guard = move |details: &BookingDetails| details.can_cancel(now, window);

        match self
            .bookings
            .cancel_booking(booking_id, user_id, now, &guard)
            .await
        {
            Ok(details) => {
                tracing::info!(
                    booking_id = %booking_id,
                    travel_option = %details.travel_option.code,
                    seats = details.booking.seats,
                    "Booking cancelled"
                );
                Ok(details)
            }
            Err(StoreError::PreconditionFailed(reason)) => {
                tracing::warn!("Rejected cancellation of {}: {}", booking_id, reason);
                Err(BookingError::NotCancellable(self.cancellation_policy()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// With a user, only that user's booking is visible; without one the
    /// identifier alone is enough.
    pub async fn booking_detail(
        &self,
        booking_id: &str,
        user_id: Option<&str>,
    ) -> BookingResult<BookingDetails> {
        let not_found = || BookingError::NotFound(format!("Booking {}", booking_id));

        let details = self
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or_else(not_found)?;

        match user_id {
            Some(user_id) if details.booking.user_id != user_id => Err(not_found()),
            _ => Ok(details),
        }
    }

    pub async fn list_bookings(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> BookingResult<Page<BookingDetails>> {
        Ok(self.bookings.list_bookings(user_id, page).await?)
    }

    fn cancellation_policy(&self) -> String {
        format!(
            "Cancellation is only allowed for confirmed bookings more than {} hours before departure",
            self.cancellation_window().num_hours()
        )
    }
}
