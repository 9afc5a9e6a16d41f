use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::travel::{TravelMode, TravelOption};

pub const SAMPLE_CITIES: [&str; 15] = [
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
    "San Diego",
    "Dallas",
    "San Jose",
    "Austin",
    "Jacksonville",
    "Fort Worth",
    "Columbus",
    "Charlotte",
];

const CAPACITIES: [u32; 6] = [30, 40, 50, 60, 80, 100];
const MINUTES: [u32; 4] = [0, 15, 30, 45];
const HEX: &[u8; 16] = b"0123456789ABCDEF";
const CODE_SUFFIX_LEN: usize = 6;

/// Generates plausible travel options for demos and load tests.
///
/// Codes are unique across everything one generator has produced, plus any
/// codes handed to [`SampleGenerator::reserve_codes`].
pub struct SampleGenerator<R: Rng> {
    rng: R,
    used_codes: HashSet<String>,
}

impl<R: Rng> SampleGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            used_codes: HashSet::new(),
        }
    }

    /// Codes the generator must not hand out, e.g. ones already stored.
    pub fn reserve_codes<I>(&mut self, codes: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.used_codes.extend(codes);
    }

    pub fn generate(&mut self, count: usize, now: DateTime<Utc>) -> Vec<TravelOption> {
        (0..count).map(|_| self.next_option(now)).collect()
    }

    fn next_option(&mut self, now: DateTime<Utc>) -> TravelOption {
        let rng = &mut self.rng;

        let origin = *SAMPLE_CITIES.choose(rng).unwrap_or(&SAMPLE_CITIES[0]);
        let destinations: Vec<&str> = SAMPLE_CITIES.iter().copied().filter(|c| *c != origin).collect();
        let destination = *destinations.choose(rng).unwrap_or(&SAMPLE_CITIES[1]);
        let mode = *TravelMode::ALL.choose(rng).unwrap_or(&TravelMode::Bus);

        let departure_date = now.date_naive() + Duration::days(rng.gen_range(1..=90));
        let minute = *MINUTES.choose(rng).unwrap_or(&0);
        let departure_time = NaiveTime::from_hms_opt(rng.gen_range(6..=22), minute, 0)
            .unwrap_or(NaiveTime::MIN);
        let departure = NaiveDateTime::new(departure_date, departure_time);
        let arrival = departure + Duration::hours(rng.gen_range(1..=8));

        let base_price: i64 = match mode {
            TravelMode::Flight => rng.gen_range(150..=800),
            TravelMode::Train => rng.gen_range(50..=300),
            TravelMode::Bus => rng.gen_range(25..=150),
        };

        let total_seats = *CAPACITIES.choose(rng).unwrap_or(&50);
        let available_seats = rng.gen_range(total_seats / 5..=total_seats);
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        let code = self.unique_code(mode);

        TravelOption {
            id,
            code,
            mode,
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            departure_time,
            arrival_date: arrival.date(),
            arrival_time: arrival.time(),
            price: Decimal::new(base_price * 100, 2),
            available_seats,
            total_seats,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<R: Rng> SampleGenerator<R> {
    fn unique_code(&mut self, mode: TravelMode) -> String {
        loop {
            let code = sample_code(&mut self.rng, mode);
            if self.used_codes.insert(code.clone()) {
                return code;
            }
        }
    }
}

fn sample_code<R: Rng>(rng: &mut R, mode: TravelMode) -> String {
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect();
    format!("{}{}", mode.tag(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_options_respect_ranges() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let mut generator = SampleGenerator::new(StdRng::seed_from_u64(7));
        let options = generator.generate(200, now);

        assert_eq!(options.len(), 200);
        for option in &options {
            assert_ne!(option.origin, option.destination);
            assert!(option.departure_date >= now.date_naive() + Duration::days(1));
            assert!(option.departure_date <= now.date_naive() + Duration::days(90));
            let arrival = NaiveDateTime::new(option.arrival_date, option.arrival_time).and_utc();
            assert!(arrival > option.departure_at());
            assert!(CAPACITIES.contains(&option.total_seats));
            assert!(option.available_seats >= option.total_seats / 5);
            assert!(option.available_seats <= option.total_seats);
            assert!(option.code.starts_with(option.mode.tag()));
            assert_eq!(option.code.len(), 8);
            assert!(option.inventory().is_ok());

            let (low, high) = match option.mode {
                TravelMode::Flight => (150, 800),
                TravelMode::Train => (50, 300),
                TravelMode::Bus => (25, 150),
            };
            assert!(option.price >= Decimal::from(low) && option.price <= Decimal::from(high));
        }
    }

    #[test]
    fn test_same_seed_same_options() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let a = SampleGenerator::new(StdRng::seed_from_u64(42)).generate(5, now);
        let b = SampleGenerator::new(StdRng::seed_from_u64(42)).generate(5, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_codes_are_unique_within_a_batch() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let options = SampleGenerator::new(StdRng::seed_from_u64(3)).generate(500, now);

        let codes: HashSet<&str> = options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes.len(), 500);
    }

    #[test]
    fn test_reserved_codes_are_skipped() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let taken = SampleGenerator::new(StdRng::seed_from_u64(11)).generate(1, now);

        // Same seed, so the first draw hits the reserved code and must be redrawn.
        let mut generator = SampleGenerator::new(StdRng::seed_from_u64(11));
        generator.reserve_codes(taken.iter().map(|o| o.code.clone()));
        let fresh = generator.generate(1, now);

        assert_eq!(fresh[0].id, taken[0].id);
        assert_ne!(fresh[0].code, taken[0].code);
        assert!(fresh[0].code.starts_with(fresh[0].mode.tag()));
    }
}
