use lykk_catalog::{SampleGenerator, TravelOption};
use lykk_core::{
    IdGenerator, NewTravelOption, StatsRepository, StoreError, StoreStats, TravelOptionRepository,
    TravelSearch, ValidationErrors,
};
use lykk_shared::{Clock, Page, PageRequest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};

pub const MAX_SAMPLE_OPTIONS: usize = 500;
const SAMPLE_INSERT_ATTEMPTS: usize = 3;

/// Search, detail lookup and administration of travel options.
pub struct CatalogService {
    options: Arc<dyn TravelOptionRepository>,
    stats: Arc<dyn StatsRepository>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    sample_seed: Option<u64>,
}

impl CatalogService {
    pub fn new(
        options: Arc<dyn TravelOptionRepository>,
        stats: Arc<dyn StatsRepository>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            stats,
            ids,
            clock,
            sample_seed: None,
        }
    }

    /// Makes generated sample data reproducible.
    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    pub async fn search(
        &self,
        search: &TravelSearch,
        page: PageRequest,
    ) -> BookingResult<Page<TravelOption>> {
        Ok(self
            .options
            .search_options(search, self.clock.today(), page)
            .await?)
    }

    pub async fn get_option(&self, id: Uuid) -> BookingResult<TravelOption> {
        self.options
            .get_option(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Travel option {}", id)))
    }

    pub async fn create_option(&self, input: NewTravelOption) -> BookingResult<TravelOption> {
        let code = self.ids.travel_code(input.mode);
        let option = input.into_travel_option(Uuid::new_v4(), code, self.clock.now())?;

        match self.options.insert_option(&option).await {
            Ok(()) => {
                tracing::info!("Created travel option {} ({})", option.code, option);
                Ok(option)
            }
            Err(StoreError::Duplicate(_)) => Err(BookingError::Conflict(format!(
                "Travel option with code {}",
                option.code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the option together with its bookings.
    pub async fn delete_option(&self, id: Uuid) -> BookingResult<u64> {
        let removed = self.options.delete_option(id).await?;
        tracing::info!(
            "Deleted travel option {} and {} booking(s)",
            id,
            removed
        );
        Ok(removed)
    }

    /// Adds `count` generated options next to the existing ones.
    pub async fn generate_sample_data(&self, count: usize) -> BookingResult<Vec<TravelOption>> {
        if !(1..=MAX_SAMPLE_OPTIONS).contains(&count) {
            return Err(ValidationErrors::single(
                "count",
                format!("Ensure this value is between 1 and {}.", MAX_SAMPLE_OPTIONS),
            )
            .into());
        }

        let rng = match self.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut generator = SampleGenerator::new(rng);

        // A batch is all-or-nothing, so a code or id already in the store
        // rejects the whole batch; the next one is drawn further along the RNG.
        for attempt in 1..=SAMPLE_INSERT_ATTEMPTS {
            let options = generator.generate(count, self.clock.now());
            match self.options.insert_options(&options).await {
                Ok(inserted) => {
                    tracing::info!("Generated {} sample travel options", inserted);
                    return Ok(options);
                }
                Err(StoreError::Duplicate(what)) => {
                    tracing::warn!(
                        "Sample batch {} of {} collided with {}, regenerating",
                        attempt,
                        SAMPLE_INSERT_ATTEMPTS,
                        what
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(BookingError::Conflict(
            "Sample travel option code".to_string(),
        ))
    }

    pub async fn stats(&self) -> BookingResult<StoreStats> {
        Ok(self.stats.stats().await?)
    }
}
