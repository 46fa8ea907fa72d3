use std::sync::Arc;

use crate::application::services::Services;
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub services: Services,
    pub rate_limiter: Arc<ApiRateLimiter>,
    /// Present when running against Postgres; drives the database health probe.
    pub db: Option<Arc<PostgresRepositories>>,
}

impl ApiState {
    pub fn new(services: Services, rate_limiter: ApiRateLimiter) -> Self {
        Self {
            services,
            rate_limiter: Arc::new(rate_limiter),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
