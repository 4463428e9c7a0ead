pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod flight_repo;
pub mod mailer;
pub mod memory;
pub mod profile_repo;
pub mod redis_repo;
pub mod reference_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use redis_repo::RedisClient;
