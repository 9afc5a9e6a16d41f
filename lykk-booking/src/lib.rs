pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod profiles;

pub use catalog::CatalogService;
pub use error::{BookingError, BookingResult};
pub use lifecycle::BookingLifecycle;
pub use profiles::ProfileService;
