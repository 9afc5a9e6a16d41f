use chrono::{DateTime, Duration, Utc};
use lykk_catalog::{pricing, PricingError, TravelOption};
use lykk_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{check_max_len, check_required, is_valid_email, ValidationErrors};

pub const MAX_PHONE_LEN: usize = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    /// Never produced by the current lifecycle; kept so stored rows round-trip.
    Pending,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "pending" => Ok(BookingStatus::Pending),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A user's reservation of one or more seats on a travel option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub user_id: String,
    pub travel_option_id: Uuid,
    pub seats: u32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub passenger_names: Vec<String>,
    pub contact_email: Masked<String>,
    pub contact_phone: Masked<String>,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Builds a confirmed booking, pricing it once from the option's unit price.
    pub fn confirmed(
        booking_id: String,
        user_id: &str,
        request: BookingRequest,
        option: &TravelOption,
        now: DateTime<Utc>,
    ) -> Result<Self, PricingError> {
        let total_price = pricing::total_price(option.price, request.seats)?;

        Ok(Self {
            booking_id,
            user_id: user_id.to_string(),
            travel_option_id: option.id,
            seats: request.seats,
            total_price,
            status: BookingStatus::Confirmed,
            passenger_names: request.passenger_names,
            contact_email: Masked(request.contact_email),
            contact_phone: Masked(request.contact_phone),
            booked_at: now,
            updated_at: now,
        })
    }

    /// `Confirmed -> Cancelled`, the only transition bookings support.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if self.status != BookingStatus::Confirmed {
            return Err(InvalidTransition {
                from: self.status,
                to: BookingStatus::Cancelled,
            });
        }
        self.status = BookingStatus::Cancelled;
        self.updated_at = at;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid booking transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

/// A booking joined with the travel option it reserves.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingDetails {
    pub booking: Booking,
    pub travel_option: TravelOption,
}

impl BookingDetails {
    /// Confirmed and departing strictly later than `now + window`.
    pub fn can_cancel(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.booking.status == BookingStatus::Confirmed
            && self.travel_option.departure_at() > now + window
    }
}

/// Input of a booking request, before and after normalization.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BookingRequest {
    pub seats: u32,
    pub passenger_names: Vec<String>,
    pub contact_email: String,
    pub contact_phone: String,
}

impl BookingRequest {
    /// Trims names (dropping blanks) and contact fields, then checks the form rules.
    pub fn validate(self) -> Result<BookingRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let passenger_names: Vec<String> = self
            .passenger_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        let contact_email = self.contact_email.trim().to_string();
        let contact_phone = self.contact_phone.trim().to_string();

        if self.seats < 1 {
            errors.add("seats", "Ensure this value is greater than or equal to 1.");
        } else if passenger_names.len() != self.seats as usize {
            errors.add(
                "passenger_names",
                format!(
                    "Please provide exactly {} passenger name(s).",
                    self.seats
                ),
            );
        }

        check_required(&mut errors, "contact_email", &contact_email);
        if !contact_email.is_empty() && !is_valid_email(&contact_email) {
            errors.add("contact_email", "Enter a valid email address.");
        }

        check_required(&mut errors, "contact_phone", &contact_phone);
        check_max_len(&mut errors, "contact_phone", &contact_phone, MAX_PHONE_LEN);

        errors.into_result(BookingRequest {
            seats: self.seats,
            passenger_names,
            contact_email,
            contact_phone,
        })
    }
}
