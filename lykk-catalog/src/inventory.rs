use serde::{Deserialize, Serialize};

/// Seat counter of a single travel option.
///
/// Every mutation keeps `0 <= available_seats <= total_seats`. Stores load this
/// from the locked row, apply `reserve`/`release`, and write the result back in
/// the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInventory {
    available_seats: u32,
    total_seats: u32,
}

impl SeatInventory {
    /// Fresh inventory with every seat available.
    pub fn new(total_seats: u32) -> Result<Self, InventoryError> {
        Self::with_available(total_seats, total_seats)
    }

    pub fn with_available(available_seats: u32, total_seats: u32) -> Result<Self, InventoryError> {
        if total_seats == 0 {
            return Err(InventoryError::InvalidCapacity);
        }
        if available_seats > total_seats {
            return Err(InventoryError::InvariantViolated {
                available: available_seats,
                total: total_seats,
            });
        }
        Ok(Self {
            available_seats,
            total_seats,
        })
    }

    pub fn available_seats(&self) -> u32 {
        self.available_seats
    }

    pub fn total_seats(&self) -> u32 {
        self.total_seats
    }

    fn sold_seats(&self) -> u32 {
        self.total_seats - self.available_seats
    }

    /// Takes `requested` seats, or fails without touching the counter.
    pub fn reserve(&mut self, requested: u32) -> Result<(), InventoryError> {
        if requested == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        if requested > self.available_seats {
            return Err(InventoryError::InsufficientInventory {
                requested,
                available: self.available_seats,
            });
        }

        self.available_seats -= requested;
        Ok(())
    }

    /// Gives back seats taken by an earlier `reserve`.
    pub fn release(&mut self, released: u32) -> Result<(), InventoryError> {
        if released == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let restored = self
            .available_seats
            .checked_add(released)
            .filter(|seats| *seats <= self.total_seats)
            .ok_or(InventoryError::OverRelease {
                released,
                available: self.available_seats,
                total: self.total_seats,
            })?;

        self.available_seats = restored;
        Ok(())
    }

    /// Share of seats sold, between 0.0 and 1.0.
    pub fn utilization(&self) -> f64 {
        f64::from(self.sold_seats()) / f64::from(self.total_seats)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    #[error("Cannot release {released} seats: {available} of {total} already available")]
    OverRelease {
        released: u32,
        available: u32,
        total: u32,
    },

    #[error("Seat count must be at least 1")]
    InvalidQuantity,

    #[error("Total seats must be at least 1")]
    InvalidCapacity,

    #[error("Available seats {available} exceed total seats {total}")]
    InvariantViolated { available: u32, total: u32 },
}
