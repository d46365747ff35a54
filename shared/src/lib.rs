pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod models;
pub mod redis;
pub mod referral;
pub mod store;

pub use config::{Config, SessionConfig, StorageBackend};
pub use database::get_db_connection;
pub use error::StoreError;
pub use models::*;
pub use self::redis::{get_redis_client, get_redis_connection, Redis};
pub use referral::{make_referral_code, InMemoryReferralRegistry, RedisReferralRegistry, ReferralRegistry};
pub use store::{DbSessionStore, InMemorySessionStore, SessionStore};
