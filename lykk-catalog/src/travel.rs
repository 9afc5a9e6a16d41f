use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::inventory::{InventoryError, SeatInventory};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Flight,
    Train,
    Bus,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [TravelMode::Flight, TravelMode::Train, TravelMode::Bus];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Flight => "flight",
            TravelMode::Train => "train",
            TravelMode::Bus => "bus",
        }
    }

    /// Two-letter prefix used in travel option codes.
    pub fn tag(&self) -> &'static str {
        match self {
            TravelMode::Flight => "FL",
            TravelMode::Train => "TR",
            TravelMode::Bus => "BU",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flight" => Ok(TravelMode::Flight),
            "train" => Ok(TravelMode::Train),
            "bus" => Ok(TravelMode::Bus),
            other => Err(format!("unknown travel mode: {}", other)),
        }
    }
}

/// A schedulable trip with fixed capacity and unit price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TravelOption {
    pub id: Uuid,
    pub code: String,
    pub mode: TravelMode,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: NaiveDate,
    pub arrival_time: NaiveTime,
    pub price: Decimal,
    pub available_seats: u32,
    pub total_seats: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelOption {
    /// Departure instant. Schedule times are stored as UTC wall-clock times.
    pub fn departure_at(&self) -> DateTime<Utc> {
        NaiveDateTime::new(self.departure_date, self.departure_time).and_utc()
    }

    /// Bookable if seats remain and the departure day has not passed.
    pub fn is_available(&self, today: NaiveDate) -> bool {
        self.available_seats > 0 && self.departure_date >= today
    }

    pub fn inventory(&self) -> Result<SeatInventory, InventoryError> {
        SeatInventory::with_available(self.available_seats, self.total_seats)
    }

    /// Writes a ledger result back onto the option.
    pub fn apply_inventory(&mut self, inventory: SeatInventory, at: DateTime<Utc>) {
        self.available_seats = inventory.available_seats();
        self.updated_at = at;
    }
}

impl fmt::Display for TravelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} from {} to {}",
            self.code, self.mode, self.origin, self.destination
        )
    }
}
