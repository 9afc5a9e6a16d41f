pub mod clock;
pub mod pagination;
pub mod pii;

pub use clock::{Clock, FixedClock, SystemClock};
pub use pagination::{Page, PageRequest};
pub use pii::Masked;
