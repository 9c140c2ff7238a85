use std::sync::Arc;

use crate::config::ServerConfig;
use crate::service::RatingService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: moodbase_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Ratings operations, bound to the schema probed at startup.
    pub ratings: RatingService,
}

impl AppState {
    pub fn new(
        pool: moodbase_db::DbPool,
        config: ServerConfig,
        schema: moodbase_db::SchemaCapabilities,
    ) -> Self {
        Self {
            ratings: RatingService::new(pool.clone(), schema),
            pool,
            config: Arc::new(config),
        }
    }
}
