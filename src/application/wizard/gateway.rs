use std::time::Duration;

use async_trait::async_trait;
use canvass_api_types::{Question, Survey};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::ServiceError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Denied(String),
    #[error("{0}")]
    Invalid(String),
    #[error("survey response is already completed")]
    AlreadyCompleted,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
}

impl GatewayError {
    /// Whether the same call may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::TimedOut(_))
    }
}

impl From<ServiceError> for GatewayError {
    fn from(error: ServiceError) -> Self {
        let message = error.to_string();
        match error {
            ServiceError::NotFound(_) => Self::NotFound(message),
            ServiceError::Unauthenticated | ServiceError::Forbidden(_) => Self::Denied(message),
            ServiceError::Domain(_) | ServiceError::Conflict(_) => Self::Invalid(message),
            ServiceError::AlreadyCompleted => Self::AlreadyCompleted,
            ServiceError::Repo(_) => Self::Unavailable(message),
        }
    }
}

/// Store operations the wizard needs, in-process or over HTTP.
#[async_trait]
pub trait SurveyGateway: Send + Sync {
    /// Opens a response session and returns its id.
    async fn start_session(&self, survey_id: Uuid) -> Result<Uuid, GatewayError>;

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey, GatewayError>;

    /// Questions in display order.
    async fn load_questions(&self, survey_id: Uuid) -> Result<Vec<Question>, GatewayError>;

    /// Creates or replaces the answer for `(session, question)`.
    async fn save_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<(), GatewayError>;

    async fn complete_session(&self, session_id: Uuid) -> Result<(), GatewayError>;
}
