//! Domain entities mirrored from persistent storage.

use canvass_api_types as api;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{QuestionOption, QuestionType, UserRole};

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    /// Subject id issued by the identity provider.
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub order_index: i32,
    pub is_required: bool,
    pub options: Option<Vec<QuestionOption>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One respondent's session against a survey.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResponseRecord {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub respondent_id: Option<Uuid>,
    pub started_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResponseRecord {
    pub id: Uuid,
    pub survey_response_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub answered_at: OffsetDateTime,
}

impl From<SurveyRecord> for api::Survey {
    fn from(record: SurveyRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            is_active: record.is_active,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<QuestionRecord> for api::Question {
    fn from(record: QuestionRecord) -> Self {
        Self {
            id: record.id,
            survey_id: record.survey_id,
            question_text: record.question_text,
            question_type: record.question_type,
            order_index: record.order_index,
            is_required: record.is_required,
            options: record.options,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<SurveyResponseRecord> for api::SurveyResponse {
    fn from(record: SurveyResponseRecord) -> Self {
        Self {
            id: record.id,
            survey_id: record.survey_id,
            respondent_id: record.respondent_id,
            started_at: record.started_at,
            completed_at: record.completed_at,
            is_completed: record.is_completed,
        }
    }
}

impl From<QuestionResponseRecord> for api::QuestionAnswer {
    fn from(record: QuestionResponseRecord) -> Self {
        Self {
            id: record.id,
            survey_response_id: record.survey_response_id,
            question_id: record.question_id,
            answer: record.answer,
            answered_at: record.answered_at,
        }
    }
}

impl From<UserRecord> for api::UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            role: record.role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
