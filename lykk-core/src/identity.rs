use lykk_catalog::TravelMode;
use uuid::Uuid;

pub const BOOKING_ID_PREFIX: &str = "TRV";

/// Source of human-facing identifiers.
///
/// Uniqueness is backed by the store's unique constraints; a collision there
/// surfaces as a data-integrity error.
pub trait IdGenerator: Send + Sync {
    /// `TRV` followed by 8 uppercase hex characters.
    fn booking_id(&self) -> String;

    /// Mode tag followed by 6 uppercase hex characters, e.g. `FL1A2B3C`.
    fn travel_code(&self, mode: TravelMode) -> String;
}

/// Takes the leading hex digits of a UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    fn hex(len: usize) -> String {
        let mut simple = Uuid::new_v4().simple().to_string().to_uppercase();
        simple.truncate(len);
        simple
    }
}

impl IdGenerator for RandomIdGenerator {
    fn booking_id(&self) -> String {
        format!("{}{}", BOOKING_ID_PREFIX, Self::hex(8))
    }

    fn travel_code(&self, mode: TravelMode) -> String {
        format!("{}{}", mode.tag(), Self::hex(6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_upper_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    }

    #[test]
    fn test_booking_id_format() {
        let id = RandomIdGenerator.booking_id();
        assert_eq!(id.len(), 11);
        assert!(id.starts_with("TRV"));
        assert!(is_upper_hex(&id[3..]));
    }

    #[test]
    fn test_travel_code_format() {
        for mode in TravelMode::ALL {
            let code = RandomIdGenerator.travel_code(mode);
            assert_eq!(code.len(), 8);
            assert!(code.starts_with(mode.tag()));
            assert!(is_upper_hex(&code[2..]));
        }
    }

    #[test]
    fn test_ids_rarely_collide() {
        let ids: HashSet<String> = (0..1000).map(|_| RandomIdGenerator.booking_id()).collect();
        assert!(ids.len() > 995);
    }
}
