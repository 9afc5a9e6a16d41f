use lykk_booking::{BookingLifecycle, CatalogService, ProfileService};
use lykk_core::{
    BookingRepository, ProfileRepository, RandomIdGenerator, StatsRepository,
    TravelOptionRepository,
};
use lykk_shared::Clock;
use lykk_store::app_config::BusinessRules;
use lykk_store::RedisClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BookingLifecycle>,
    pub catalog: Arc<CatalogService>,
    pub profiles: Arc<ProfileService>,
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Wires every service onto one store.
    pub fn new<S>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        auth: AuthConfig,
        business_rules: BusinessRules,
        redis: Option<Arc<RedisClient>>,
    ) -> Self
    where
        S: TravelOptionRepository
            + BookingRepository
            + ProfileRepository
            + StatsRepository
            + 'static,
    {
        let ids = Arc::new(RandomIdGenerator);

        let lifecycle = BookingLifecycle::new(store.clone(), store.clone(), ids.clone(), clock.clone())
            .with_cancellation_window(business_rules.cancellation_window_hours);
        let catalog = CatalogService::new(store.clone(), store.clone(), ids, clock.clone());
        let profiles = ProfileService::new(store, clock);

        Self {
            lifecycle: Arc::new(lifecycle),
            catalog: Arc::new(catalog),
            profiles: Arc::new(profiles),
            redis,
            auth,
            business_rules,
        }
    }
}
