use thiserror::Error;

/// Failures of the durable stores. Callers propagate these; nothing retries.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record for user {user_id}: {reason}")]
    Corrupt { user_id: i64, reason: String },
}
