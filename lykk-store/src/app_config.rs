use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Without a database the service runs on the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Enables request rate limiting.
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_cancellation_window_hours")]
    pub cancellation_window_hours: u32,
    #[serde(default = "default_search_page_size")]
    pub search_page_size: u32,
    #[serde(default = "default_bookings_page_size")]
    pub bookings_page_size: u32,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: i64,
}

/// Upper bound for the cancellation window: one year.
pub const MAX_CANCELLATION_WINDOW_HOURS: u32 = 24 * 365;

impl BusinessRules {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_CANCELLATION_WINDOW_HOURS).contains(&self.cancellation_window_hours) {
            return Err(config::ConfigError::Message(format!(
                "business_rules.cancellation_window_hours must be between 1 and {}, got {}",
                MAX_CANCELLATION_WINDOW_HOURS, self.cancellation_window_hours
            )));
        }
        if self.rate_limit_per_minute < 1 {
            return Err(config::ConfigError::Message(format!(
                "business_rules.rate_limit_per_minute must be at least 1, got {}",
                self.rate_limit_per_minute
            )));
        }
        Ok(())
    }
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            cancellation_window_hours: default_cancellation_window_hours(),
            search_page_size: default_search_page_size(),
            bookings_page_size: default_bookings_page_size(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

fn default_cancellation_window_hours() -> u32 { 24 }
fn default_search_page_size() -> u32 { 12 }
fn default_bookings_page_size() -> u32 { 10 }
fn default_rate_limit_per_minute() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_seconds() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `LYKK_SERVER__PORT=8080`, `LYKK_DATABASE__URL=postgres://...`
            .add_source(
                config::Environment::with_prefix("LYKK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Self::from_settings(s)
    }

    /// Deserializes and checks the business rules.
    pub fn from_settings(settings: config::Config) -> Result<Self, config::ConfigError> {
        let config: Config = settings.try_deserialize()?;
        config.business_rules.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_parse(toml: &str) -> Result<Config, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Config::from_settings(settings)
    }

    fn parse(toml: &str) -> Config {
        try_parse(toml).unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [auth]
            jwt_secret = "secret"
            "#,
        );

        assert!(config.database.is_none());
        assert!(config.redis.is_none());
        assert_eq!(config.business_rules.cancellation_window_hours, 24);
        assert_eq!(config.business_rules.search_page_size, 12);
        assert_eq!(config.business_rules.bookings_page_size, 10);
    }

    #[test]
    fn test_database_section() {
        let config = parse(
            r#"
            [server]
            port = 3000

            [auth]
            jwt_secret = "secret"

            [database]
            url = "postgres://localhost/lykk"

            [business_rules]
            cancellation_window_hours = 48
            "#,
        );

        let database = config.database.unwrap();
        assert_eq!(database.max_connections, 5);
        assert_eq!(database.acquire_timeout_seconds, 3);
        assert_eq!(config.business_rules.cancellation_window_hours, 48);
        assert_eq!(config.business_rules.rate_limit_per_minute, 100);
    }

    fn with_window(hours: &str) -> Result<Config, config::ConfigError> {
        try_parse(&format!(
            r#"
            [server]
            port = 3000

            [auth]
            jwt_secret = "secret"

            [business_rules]
            cancellation_window_hours = {}
            "#,
            hours
        ))
    }

    #[test]
    fn test_cancellation_window_must_be_in_range() {
        assert!(with_window("-1").is_err());
        assert!(with_window("0").is_err());
        assert!(with_window("9000000000000").is_err());
        assert!(with_window(&(MAX_CANCELLATION_WINDOW_HOURS + 1).to_string()).is_err());
        assert_eq!(
            with_window("72").unwrap().business_rules.cancellation_window_hours,
            72
        );
    }
}
