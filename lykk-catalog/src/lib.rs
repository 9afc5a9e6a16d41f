pub mod travel;
pub mod inventory;
pub mod pricing;
pub mod sample;

pub use travel::{TravelMode, TravelOption};
pub use inventory::{InventoryError, SeatInventory};
pub use pricing::{total_price, PricingError};
pub use sample::SampleGenerator;
