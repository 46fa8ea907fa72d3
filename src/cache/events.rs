//! Write events that invalidate cached reads.

use uuid::Uuid;

/// A committed write whose readers may now see different data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    SurveyCreated { survey_id: Uuid, owner_id: Uuid },
    /// Title, description or active flag changed.
    SurveyUpdated { survey_id: Uuid, owner_id: Uuid },
    /// Questions and responses went with it.
    SurveyDeleted { survey_id: Uuid, owner_id: Uuid },
    QuestionCreated { survey_id: Uuid },
    ResponseStarted { survey_id: Uuid },
    AnswerSubmitted { survey_id: Uuid },
    ResponseCompleted { survey_id: Uuid },
    UserUpdated { user_id: Uuid },
}

impl CacheEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SurveyCreated { .. } => "survey_created",
            Self::SurveyUpdated { .. } => "survey_updated",
            Self::SurveyDeleted { .. } => "survey_deleted",
            Self::QuestionCreated { .. } => "question_created",
            Self::ResponseStarted { .. } => "response_started",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::ResponseCompleted { .. } => "response_completed",
            Self::UserUpdated { .. } => "user_updated",
        }
    }
}
