use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub pricing: PricingSettings,
    #[serde(default)]
    pub booking: BookingSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process tables seeded with demo data, for development and tests. Nothing survives a
    /// restart, and every write transaction copies all tables. Rejected in production.
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub storage: StorageBackend,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

/// Fallback fares and tax. Amounts are whole currency units.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PricingSettings {
    pub economy_fallback: i64,
    pub business_fallback: i64,
    pub infant_price: i64,
    pub tax_rate: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            economy_fallback: 1_000_000,
            business_fallback: 2_000_000,
            infant_price: 400_000,
            tax_rate: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BookingSettings {
    pub reference_length: usize,
    pub max_passengers: usize,
    pub reference_attempts: usize,
    /// Capacity of the post-commit side-effect queue.
    pub side_effect_queue: usize,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            reference_length: 6,
            max_passengers: 9,
            reference_attempts: 10,
            side_effect_queue: 256,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_minute: 120 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: u32,
    pub max_limit: u32,
    pub availability_cache_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            availability_cache_seconds: 30,
        }
    }
}

impl Config {
    pub fn run_mode() -> String {
        env::var("RUN_MODE").unwrap_or_else(|_| "development".into())
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config", &Self::run_mode())
    }

    pub fn load_from(dir: &str, run_mode: &str) -> Result<Self, config::ConfigError> {
        let s = config::Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", dir)))
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Developer overrides, not checked in.
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            // WAYFARE__DATABASE__URL=... sets database.url
            .add_source(config::Environment::with_prefix("WAYFARE").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.check_storage(run_mode)?;
        Ok(config)
    }

    pub fn check_storage(&self, run_mode: &str) -> Result<(), config::ConfigError> {
        if run_mode == "production" && self.database.storage == StorageBackend::Memory {
            return Err(config::ConfigError::Message(
                "database.storage = \"memory\" is not allowed in production".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_optional_sections_take_defaults() {
        let cfg = parse(
            r#"
            [server]
            port = 3000

            [database]
            url = "postgres://localhost/wayfare"

            [auth]
            jwt_secret = "secret"
            jwt_expiration_seconds = 3600
            "#,
        );

        assert_eq!(cfg.database.storage, StorageBackend::Memory);
        assert!(cfg.check_storage("development").is_ok());
        assert!(cfg.check_storage("production").is_err());
        assert_eq!(cfg.database.max_connections, 5);
        assert!(!cfg.database.run_migrations);
        assert!(cfg.redis.is_none());
        assert_eq!(cfg.pricing, PricingSettings::default());
        assert_eq!(cfg.booking.reference_length, 6);
        assert_eq!(cfg.booking.max_passengers, 9);
        assert_eq!(cfg.search.max_limit, 100);
    }

    #[test]
    fn test_partial_section_overrides() {
        let cfg = parse(
            r#"
            [server]
            port = 8080

            [database]
            storage = "postgres"
            url = "postgres://db/wayfare"
            run_migrations = true

            [redis]
            url = "redis://127.0.0.1/"

            [auth]
            jwt_secret = "secret"
            jwt_expiration_seconds = 60

            [pricing]
            tax_rate = 0.08
            "#,
        );

        assert_eq!(cfg.database.storage, StorageBackend::Postgres);
        assert!(cfg.check_storage("production").is_ok());
        assert_eq!(cfg.redis.map(|r| r.url).as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(cfg.pricing.tax_rate, 0.08);
        assert_eq!(cfg.pricing.infant_price, 400_000);
    }

    #[test]
    fn test_production_profile_uses_postgres() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../config");
        let dev = Config::load_from(dir, "development").unwrap();
        assert_eq!(dev.database.storage, StorageBackend::Memory);

        let prod = Config::load_from(dir, "production").unwrap();
        assert_eq!(prod.database.storage, StorageBackend::Postgres);
        assert_eq!(prod.database.max_connections, 20);
    }
}
