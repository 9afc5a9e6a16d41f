use lykk_core::{StoreError, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Not enough seats, possibly because a concurrent booking won the race.
    #[error("Only {available} seats are available, {requested} requested")]
    SeatsUnavailable { requested: u32, available: u32 },

    #[error("{0}")]
    NotCancellable(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    /// Identifier collisions or a seat counter outside its bounds.
    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error(transparent)]
    Store(StoreError),
}

impl BookingError {
    /// Whether the same request may succeed when sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::SeatsUnavailable { .. })
    }
}

impl From<ValidationErrors> for BookingError {
    fn from(errors: ValidationErrors) -> Self {
        BookingError::Validation(errors)
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::InsufficientSeats {
                requested,
                available,
            } => BookingError::SeatsUnavailable {
                requested,
                available,
            },
            StoreError::Duplicate(what) => BookingError::Conflict(what),
            StoreError::Inventory(err) => BookingError::Integrity(err.to_string()),
            other => BookingError::Store(other),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
