use std::sync::Arc;

use mongodb::Database;

use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::services::rate_limiter::RateLimiter;
use crate::services::visit_recorder::VisitRecorder;
use crate::store::{StoreError, VisitStore};

pub struct AppState {
    pub config: AppConfig,
    /// Content collections. `None` when running on the in-memory visit store.
    pub db: Option<Database>,
    pub visits: Arc<dyn VisitStore>,
    pub recorder: VisitRecorder,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, db: Option<Database>, visits: Arc<dyn VisitStore>) -> Self {
        let recorder = VisitRecorder::new(
            visits.clone(),
            config.visit_cooldown,
            config.visit_history_limit,
        );
        let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);
        Self {
            config,
            db,
            visits,
            recorder,
            limiter,
        }
    }

    pub fn database(&self) -> Result<&Database, ApiError> {
        self.db
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("Content store is not configured".into()))
    }

    /// Map a store failure to a 500, logging it with `context`.
    pub fn store_error(&self, context: &str, err: StoreError) -> ApiError {
        ApiError::from_store(context, err, self.config.development)
    }

    pub fn db_error(&self, context: &str, err: mongodb::error::Error) -> ApiError {
        ApiError::internal(context, err, self.config.development)
    }
}
