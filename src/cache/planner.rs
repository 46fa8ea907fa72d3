//! Maps write events to the tags they make stale.

use std::collections::BTreeSet;
use std::fmt;

use uuid::Uuid;

use super::events::CacheEvent;
use super::keys::CacheTag;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub tags: BTreeSet<CacheTag>,
}

impl InvalidationPlan {
    pub fn for_event(event: &CacheEvent) -> Self {
        let mut plan = Self::default();
        plan.add(event);
        plan
    }

    /// Union of the plans of every event.
    pub fn for_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a CacheEvent>,
    {
        let mut plan = Self::default();
        for event in events {
            plan.add(event);
        }
        plan
    }

    fn add(&mut self, event: &CacheEvent) {
        match *event {
            CacheEvent::SurveyCreated {
                survey_id,
                owner_id,
            }
            | CacheEvent::SurveyUpdated {
                survey_id,
                owner_id,
            } => self.survey_lists(survey_id, owner_id),
            CacheEvent::SurveyDeleted {
                survey_id,
                owner_id,
            } => {
                self.survey_lists(survey_id, owner_id);
                self.tags.insert(CacheTag::Questions(survey_id));
                self.responses(survey_id);
            }
            CacheEvent::QuestionCreated { survey_id } => {
                self.tags.insert(CacheTag::Questions(survey_id));
            }
            CacheEvent::ResponseStarted { survey_id }
            | CacheEvent::AnswerSubmitted { survey_id }
            | CacheEvent::ResponseCompleted { survey_id } => self.responses(survey_id),
            CacheEvent::UserUpdated { user_id } => {
                self.tags.insert(CacheTag::User(user_id));
            }
        }
    }

    fn survey_lists(&mut self, survey_id: Uuid, owner_id: Uuid) {
        self.tags.extend([
            CacheTag::Survey(survey_id),
            CacheTag::Surveys,
            CacheTag::ActiveSurveys,
            CacheTag::InactiveSurveys,
            CacheTag::UserSurveys(owner_id),
        ]);
    }

    fn responses(&mut self, survey_id: Uuid) {
        self.tags.extend([
            CacheTag::SurveyResponses(survey_id),
            CacheTag::CompletedResponses,
        ]);
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.tags {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{tag}")?;
            first = false;
        }
        Ok(())
    }
}
