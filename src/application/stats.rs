use canvass_api_types::Stats;

use crate::application::error::ServiceError;
use crate::application::reads::CachedReads;

/// Dashboard counters, all served from the query cache.
#[derive(Clone)]
pub struct StatsService {
    reads: CachedReads,
}

impl StatsService {
    pub fn new(reads: CachedReads) -> Self {
        Self { reads }
    }

    pub async fn overview(&self) -> Result<Stats, ServiceError> {
        let surveys = self.reads.all_surveys().await?;
        let active = surveys.iter().filter(|survey| survey.is_active).count() as u64;
        let total = surveys.len() as u64;
        Ok(Stats {
            total_surveys: total,
            active_surveys: active,
            draft_surveys: total - active,
            completed_responses: self.reads.completed_count().await?,
        })
    }
}
