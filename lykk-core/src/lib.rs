pub mod booking;
pub mod identity;
pub mod listing;
pub mod profile;
pub mod repository;
pub mod search;
pub mod validation;

pub use booking::{Booking, BookingDetails, BookingRequest, BookingStatus};
pub use identity::{IdGenerator, RandomIdGenerator};
pub use listing::NewTravelOption;
pub use profile::{ProfileUpdate, UserIdentity, UserProfile};
pub use repository::{
    BookingRepository, CancelGuard, ProfileRepository, StatsRepository, StoreError, StoreResult,
    StoreStats, TravelOptionRepository,
};
pub use search::TravelSearch;
pub use validation::ValidationErrors;
