//! Cache trigger service.
//!
//! Write paths report what they changed; the trigger plans the affected tags
//! and invalidates them before returning, so the next read recomputes.
//!
//! ```ignore
//! // After a successful survey update:
//! trigger.survey_updated(survey.id, survey.created_by);
//! ```

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::events::CacheEvent;
use super::planner::InvalidationPlan;
use super::query::QueryCache;

#[derive(Clone)]
pub struct CacheTrigger {
    cache: Arc<QueryCache>,
}

impl CacheTrigger {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Invalidates every tag the event affects and returns the number of
    /// entries dropped.
    pub fn publish(&self, event: CacheEvent) -> usize {
        let plan = InvalidationPlan::for_event(&event);
        let removed = self.cache.invalidate_many(&plan.tags);
        debug!(
            target: "canvass::cache",
            event = event.name(),
            tags = %plan,
            removed,
            "Applied cache invalidation"
        );
        removed
    }

    pub fn survey_created(&self, survey_id: Uuid, owner_id: Uuid) {
        self.publish(CacheEvent::SurveyCreated {
            survey_id,
            owner_id,
        });
    }

    pub fn survey_updated(&self, survey_id: Uuid, owner_id: Uuid) {
        self.publish(CacheEvent::SurveyUpdated {
            survey_id,
            owner_id,
        });
    }

    pub fn survey_deleted(&self, survey_id: Uuid, owner_id: Uuid) {
        self.publish(CacheEvent::SurveyDeleted {
            survey_id,
            owner_id,
        });
    }

    pub fn question_created(&self, survey_id: Uuid) {
        self.publish(CacheEvent::QuestionCreated { survey_id });
    }

    pub fn response_started(&self, survey_id: Uuid) {
        self.publish(CacheEvent::ResponseStarted { survey_id });
    }

    pub fn answer_submitted(&self, survey_id: Uuid) {
        self.publish(CacheEvent::AnswerSubmitted { survey_id });
    }

    pub fn response_completed(&self, survey_id: Uuid) {
        self.publish(CacheEvent::ResponseCompleted { survey_id });
    }

    pub fn user_updated(&self, user_id: Uuid) {
        self.publish(CacheEvent::UserUpdated { user_id });
    }
}
