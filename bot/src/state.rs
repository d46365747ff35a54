use migration::{Migrator, MigratorTrait};
use shared::{
    get_db_connection, get_redis_connection, Config, DbSessionStore, InMemoryReferralRegistry,
    InMemorySessionStore, RedisReferralRegistry, ReferralRegistry, SessionStore, StorageBackend,
};
use std::sync::Arc;

use crate::services::{
    GeminiService, GeminiSignalGenerator, GeminiVision, NewsAggregator, SignalGenerator, VisionSummarizer,
};
use crate::session::SessionDirectory;

pub type HandlerResult = Result<(), anyhow::Error>;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionDirectory,
    pub signals: Arc<dyn SignalGenerator>,
    pub vision: Arc<dyn VisionSummarizer>,
    pub news: NewsAggregator,
}

impl AppState {
    pub async fn new() -> Result<Self, anyhow::Error> {
        let config = Config::from_env()?;

        let (store, registry): (Arc<dyn SessionStore>, Arc<dyn ReferralRegistry>) = match config.storage_backend {
            StorageBackend::Database => {
                let db = get_db_connection(&config.database_url).await?;
                Migrator::up(&db, None).await?;
                tracing::info!("Connected to database and applied migrations");
                let redis = get_redis_connection(&config.redis_url).await?;
                tracing::info!("Connected to redis");
                (
                    Arc::new(DbSessionStore::new(Arc::new(db))),
                    Arc::new(RedisReferralRegistry::new(redis)),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, all profiles are lost on restart");
                (
                    Arc::new(InMemorySessionStore::new()),
                    Arc::new(InMemoryReferralRegistry::new()),
                )
            }
        };

        let gemini = GeminiService::from_config(&config)?;
        if gemini.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set, signals fall back to neutral output");
        }
        let news = NewsAggregator::new(&config, gemini.clone())?;

        Ok(AppState {
            sessions: SessionDirectory::new(store, registry, config.session()),
            signals: Arc::new(GeminiSignalGenerator::new(gemini.clone(), &config.bot_locale)),
            vision: Arc::new(GeminiVision::new(gemini, &config.bot_locale)),
            news,
            config,
        })
    }
}
