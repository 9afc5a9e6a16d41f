use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lykk_catalog::{SeatInventory, TravelMode, TravelOption};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::search::MAX_PLACE_LEN;
use crate::validation::{check_max_len, check_required, ValidationErrors};

pub const MAX_CODE_LEN: usize = 20;

/// Seat counts are stored in `INTEGER` columns.
pub const MAX_SEATS: u32 = i32::MAX as u32;

/// Largest unit price a `NUMERIC(10,2)` column holds.
pub fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Administrator input for a new travel option.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewTravelOption {
    #[serde(default)]
    pub code: Option<String>,
    pub mode: TravelMode,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: NaiveDate,
    pub arrival_time: NaiveTime,
    pub price: Decimal,
    pub total_seats: u32,
    /// Defaults to `total_seats`.
    #[serde(default)]
    pub available_seats: Option<u32>,
}

impl NewTravelOption {
    /// Checks the listing and builds the option; `code` is used when the input has none.
    pub fn into_travel_option(
        self,
        id: Uuid,
        generated_code: String,
        now: DateTime<Utc>,
    ) -> Result<TravelOption, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let code = self
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or(generated_code);
        check_max_len(&mut errors, "code", &code, MAX_CODE_LEN);

        let origin = self.origin.trim().to_string();
        let destination = self.destination.trim().to_string();
        check_required(&mut errors, "origin", &origin);
        check_required(&mut errors, "destination", &destination);
        check_max_len(&mut errors, "origin", &origin, MAX_PLACE_LEN);
        check_max_len(&mut errors, "destination", &destination, MAX_PLACE_LEN);
        if !origin.is_empty() && origin.eq_ignore_ascii_case(&destination) {
            errors.add("destination", "Destination must differ from origin.");
        }

        if self.price.is_sign_negative() && !self.price.is_zero() {
            errors.add("price", "Ensure this value is greater than or equal to 0.");
        } else if self.price.scale() > 2 || self.price > max_price() {
            errors.add(
                "price",
                "Ensure that there are no more than 10 digits in total and 2 decimal places.",
            );
        }

        let available = self.available_seats.unwrap_or(self.total_seats);
        let inventory = if self.total_seats > MAX_SEATS {
            errors.add(
                "total_seats",
                format!("Ensure this value is less than or equal to {}.", MAX_SEATS),
            );
            None
        } else {
            match SeatInventory::with_available(available, self.total_seats) {
                Ok(inventory) => Some(inventory),
                Err(err) => {
                    let field = if self.total_seats == 0 {
                        "total_seats"
                    } else {
                        "available_seats"
                    };
                    errors.add(field, err.to_string());
                    None
                }
            }
        };

        let departure = NaiveDateTime::new(self.departure_date, self.departure_time);
        let arrival = NaiveDateTime::new(self.arrival_date, self.arrival_time);
        if arrival < departure {
            errors.add("arrival_date", "Arrival cannot be before departure.");
        }

        let Some(inventory) = inventory else {
            return Err(errors);
        };

        errors.into_result(TravelOption {
            id,
            code,
            mode: self.mode,
            origin,
            destination,
            departure_date: self.departure_date,
            departure_time: self.departure_time,
            arrival_date: self.arrival_date,
            arrival_time: self.arrival_time,
            price: self.price,
            available_seats: inventory.available_seats(),
            total_seats: inventory.total_seats(),
            created_at: now,
            updated_at: now,
        })
    }
}
