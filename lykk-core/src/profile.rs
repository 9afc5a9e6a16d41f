use chrono::{DateTime, NaiveDate, Utc};
use lykk_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::booking::MAX_PHONE_LEN;
use crate::validation::{check_max_len, is_valid_email, ValidationErrors};

pub const MAX_NAME_LEN: usize = 30;

/// Who the bearer token says the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: Masked<String>,
    pub first_name: String,
    pub last_name: String,
}

impl UserIdentity {
    /// Splits a display name ("Jane van Dyke") into first and last name.
    pub fn from_claims(user_id: &str, email: &str, name: Option<&str>) -> Self {
        let (first_name, last_name) = match name.map(str::trim) {
            Some(full) if !full.is_empty() => match full.split_once(char::is_whitespace) {
                Some((first, last)) => (first.to_string(), last.trim().to_string()),
                None => (full.to_string(), String::new()),
            },
            _ => (String::new(), String::new()),
        };

        Self {
            user_id: user_id.to_string(),
            email: Masked(email.trim().to_string()),
            first_name: truncate(&first_name, MAX_NAME_LEN),
            last_name: truncate(&last_name, MAX_NAME_LEN),
        }
    }
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Account and contact details kept per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Masked<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Masked<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// First-access profile seeded from token claims.
    pub fn from_identity(identity: &UserIdentity, now: DateTime<Utc>) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            phone_number: Masked(String::new()),
            date_of_birth: None,
            address: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Overwrites every editable field with an already validated update.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        self.first_name = update.first_name;
        self.last_name = update.last_name;
        self.email = Masked(update.email);
        self.phone_number = Masked(update.phone_number);
        self.date_of_birth = update.date_of_birth;
        self.address = update.address;
        self.updated_at = now;
    }
}

/// Full replacement of the editable profile fields.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
}

impl ProfileUpdate {
    pub fn validate(self, today: NaiveDate) -> Result<ProfileUpdate, ValidationErrors> {
        let update = ProfileUpdate {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            date_of_birth: self.date_of_birth,
            address: self.address.trim().to_string(),
        };

        let mut errors = ValidationErrors::new();
        check_max_len(&mut errors, "first_name", &update.first_name, MAX_NAME_LEN);
        check_max_len(&mut errors, "last_name", &update.last_name, MAX_NAME_LEN);
        if !update.email.is_empty() && !is_valid_email(&update.email) {
            errors.add("email", "Enter a valid email address.");
        }
        check_max_len(&mut errors, "phone_number", &update.phone_number, MAX_PHONE_LEN);
        if matches!(update.date_of_birth, Some(dob) if dob > today) {
            errors.add("date_of_birth", "Date of birth cannot be in the future.");
        }

        errors.into_result(update)
    }
}
