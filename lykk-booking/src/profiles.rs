use lykk_core::{ProfileRepository, ProfileUpdate, UserIdentity, UserProfile};
use lykk_shared::Clock;
use std::sync::Arc;

use crate::error::BookingResult;

pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// Returns the caller's profile, creating it from token claims on first access.
    pub async fn get_or_create(&self, identity: &UserIdentity) -> BookingResult<UserProfile> {
        if let Some(profile) = self.profiles.get_profile(&identity.user_id).await? {
            return Ok(profile);
        }

        let fresh = UserProfile::from_identity(identity, self.clock.now());
        let profile = self.profiles.create_profile_if_missing(&fresh).await?;
        tracing::info!("Created profile for user {}", identity.user_id);
        Ok(profile)
    }

    pub async fn update(
        &self,
        identity: &UserIdentity,
        update: ProfileUpdate,
    ) -> BookingResult<UserProfile> {
        let update = update.validate(self.clock.today())?;
        let mut profile = self.get_or_create(identity).await?;

        profile.apply(update, self.clock.now());
        self.profiles.update_profile(&profile).await?;
        Ok(profile)
    }

    /// Contact email and phone a booking falls back to when the request omits them.
    pub async fn contact_defaults(
        &self,
        identity: &UserIdentity,
    ) -> BookingResult<(String, String)> {
        let profile = self.get_or_create(identity).await?;
        let email = if profile.email.0.is_empty() {
            identity.email.0.clone()
        } else {
            profile.email.0.clone()
        };
        Ok((email, profile.phone_number.0))
    }
}
