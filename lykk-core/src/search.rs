use chrono::NaiveDate;
use lykk_catalog::{TravelMode, TravelOption};
use serde::{Deserialize, Serialize};

use crate::validation::{check_max_len, ValidationErrors};

pub const MAX_PLACE_LEN: usize = 100;

/// Filters for listing bookable travel options.
///
/// Only options departing today or later with seats left are candidates.
/// `origin` and `destination` match case-insensitively as substrings, the
/// other filters match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelSearch {
    pub mode: Option<TravelMode>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
}

impl TravelSearch {
    /// Builds a search from raw query values; blank values mean "any".
    pub fn parse(
        mode: Option<&str>,
        origin: Option<&str>,
        destination: Option<&str>,
        departure_date: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mode = match non_blank(mode) {
            Some(raw) => match raw.parse::<TravelMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    errors.add(
                        "mode",
                        format!("Select a valid choice. {} is not one of the available choices.", raw),
                    );
                    None
                }
            },
            None => None,
        };

        let departure_date = match non_blank(departure_date) {
            Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("departure_date", "Enter a valid date.");
                    None
                }
            },
            None => None,
        };

        let origin = non_blank(origin);
        let destination = non_blank(destination);
        if let Some(origin) = &origin {
            check_max_len(&mut errors, "origin", origin, MAX_PLACE_LEN);
        }
        if let Some(destination) = &destination {
            check_max_len(&mut errors, "destination", destination, MAX_PLACE_LEN);
        }

        errors.into_result(Self {
            mode,
            origin,
            destination,
            departure_date,
        })
    }

    /// Whether `option` belongs in the results for a search run on `today`.
    pub fn matches(&self, option: &TravelOption, today: NaiveDate) -> bool {
        if !option.is_available(today) {
            return false;
        }
        if self.mode.is_some_and(|mode| mode != option.mode) {
            return false;
        }
        if let Some(origin) = &self.origin {
            if !contains_ignore_case(&option.origin, origin) {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !contains_ignore_case(&option.destination, destination) {
                return false;
            }
        }
        self.departure_date
            .map_or(true, |date| option.departure_date == date)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Sorts options by departure, earliest first.
pub fn sort_by_departure(options: &mut [TravelOption]) {
    options.sort_by(|a, b| {
        (a.departure_date, a.departure_time, &a.code).cmp(&(b.departure_date, b.departure_time, &b.code))
    });
}
