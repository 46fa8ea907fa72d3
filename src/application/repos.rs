//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::access_tokens::AccessTokenRecord;
use crate::domain::entities::{
    QuestionRecord, QuestionResponseRecord, SurveyRecord, SurveyResponseRecord, UserRecord,
};
use crate::domain::types::{QuestionOption, QuestionType, UserRole};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Survey list filter; `None` fields do not constrain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurveyFilter {
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateSurveyParams {
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdateSurveyParams {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[async_trait]
pub trait SurveysRepo: Send + Sync {
    /// Newest first.
    async fn list_surveys(&self, filter: SurveyFilter) -> Result<Vec<SurveyRecord>, RepoError>;

    async fn find_survey(&self, id: Uuid) -> Result<Option<SurveyRecord>, RepoError>;

    async fn create_survey(&self, params: CreateSurveyParams) -> Result<SurveyRecord, RepoError>;

    async fn update_survey(&self, params: UpdateSurveyParams) -> Result<SurveyRecord, RepoError>;

    /// Removes the survey with its questions, sessions and answers.
    async fn delete_survey(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateQuestionParams {
    pub survey_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub order_index: i32,
    pub is_required: bool,
    pub options: Option<Vec<QuestionOption>>,
}

#[async_trait]
pub trait QuestionsRepo: Send + Sync {
    /// Questions of one survey in storage order; callers sort for display.
    async fn list_questions(&self, survey_id: Uuid) -> Result<Vec<QuestionRecord>, RepoError>;

    async fn find_question(&self, id: Uuid) -> Result<Option<QuestionRecord>, RepoError>;

    async fn create_question(
        &self,
        params: CreateQuestionParams,
    ) -> Result<QuestionRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct UpsertAnswerParams {
    pub survey_response_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub answered_at: OffsetDateTime,
}

/// Result of the conditional completion write.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(SurveyResponseRecord),
    AlreadyCompleted(SurveyResponseRecord),
    Missing,
}

#[async_trait]
pub trait ResponsesRepo: Send + Sync {
    async fn create_response(
        &self,
        survey_id: Uuid,
        respondent_id: Option<Uuid>,
        started_at: OffsetDateTime,
    ) -> Result<SurveyResponseRecord, RepoError>;

    async fn find_response(&self, id: Uuid) -> Result<Option<SurveyResponseRecord>, RepoError>;

    /// Most recently started first.
    async fn list_responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponseRecord>, RepoError>;

    /// Flips the completion flag only if it is still false.
    async fn complete_response(
        &self,
        id: Uuid,
        completed_at: OffsetDateTime,
    ) -> Result<CompletionOutcome, RepoError>;

    /// Completed sessions, across all surveys when `survey_id` is `None`.
    async fn count_completed(&self, survey_id: Option<Uuid>) -> Result<u64, RepoError>;

    /// Inserts or replaces the single answer for `(survey_response_id, question_id)`.
    async fn upsert_answer(
        &self,
        params: UpsertAnswerParams,
    ) -> Result<QuestionResponseRecord, RepoError>;

    async fn list_answers(
        &self,
        survey_response_id: Uuid,
    ) -> Result<Vec<QuestionResponseRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct UpsertUserParams {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Role for a newly created user; existing users keep theirs.
    pub initial_role: UserRole,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    /// Oldest first.
    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError>;

    async fn upsert_user(&self, params: UpsertUserParams) -> Result<UserRecord, RepoError>;

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateAccessTokenParams {
    pub user_id: Uuid,
    pub name: String,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait AccessTokensRepo: Send + Sync {
    async fn create_token(
        &self,
        params: CreateAccessTokenParams,
    ) -> Result<AccessTokenRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<AccessTokenRecord>, RepoError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AccessTokenRecord>, RepoError>;

    async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError>;

    async fn update_last_used(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError>;
}
