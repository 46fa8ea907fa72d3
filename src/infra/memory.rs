//! Process-local repositories used when no database is configured.
//!
//! Enforces the same keys and cascades as the Postgres schema so services
//! behave identically against either backend.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::repos::{
    AccessTokensRepo, CompletionOutcome, CreateAccessTokenParams, CreateQuestionParams,
    CreateSurveyParams, QuestionsRepo, RepoError, ResponsesRepo, SurveyFilter, SurveysRepo,
    UpdateSurveyParams, UpsertAnswerParams, UpsertUserParams, UsersRepo,
};
use crate::domain::access_tokens::AccessTokenRecord;
use crate::domain::entities::{
    QuestionRecord, QuestionResponseRecord, SurveyRecord, SurveyResponseRecord, UserRecord,
};
use crate::domain::types::UserRole;

#[derive(Default)]
struct MemoryState {
    users: Vec<UserRecord>,
    tokens: Vec<AccessTokenRecord>,
    surveys: Vec<SurveyRecord>,
    questions: Vec<QuestionRecord>,
    responses: Vec<SurveyResponseRecord>,
    answers: Vec<QuestionResponseRecord>,
}

impl MemoryState {
    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|user| user.id == id)
    }

    fn survey_exists(&self, id: Uuid) -> bool {
        self.surveys.iter().any(|survey| survey.id == id)
    }
}

fn foreign_key(table: &str) -> RepoError {
    RepoError::InvalidInput {
        message: format!("referenced {table} row does not exist"),
    }
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SurveysRepo for InMemoryRepositories {
    async fn list_surveys(&self, filter: SurveyFilter) -> Result<Vec<SurveyRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .surveys
            .iter()
            .rev()
            .filter(|survey| filter.is_active.is_none_or(|flag| survey.is_active == flag))
            .filter(|survey| filter.created_by.is_none_or(|owner| survey.created_by == owner))
            .cloned()
            .collect())
    }

    async fn find_survey(&self, id: Uuid) -> Result<Option<SurveyRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.surveys.iter().find(|survey| survey.id == id).cloned())
    }

    async fn create_survey(&self, params: CreateSurveyParams) -> Result<SurveyRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.user_exists(params.created_by) {
            return Err(foreign_key("users"));
        }
        let now = OffsetDateTime::now_utc();
        let record = SurveyRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            is_active: params.is_active,
            created_by: params.created_by,
            created_at: now,
            updated_at: now,
        };
        state.surveys.push(record.clone());
        Ok(record)
    }

    async fn update_survey(&self, params: UpdateSurveyParams) -> Result<SurveyRecord, RepoError> {
        let mut state = self.state.write().await;
        let survey = state
            .surveys
            .iter_mut()
            .find(|survey| survey.id == params.id)
            .ok_or(RepoError::NotFound)?;
        survey.title = params.title;
        survey.description = params.description;
        survey.is_active = params.is_active;
        survey.updated_at = OffsetDateTime::now_utc();
        Ok(survey.clone())
    }

    async fn delete_survey(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.survey_exists(id) {
            return Err(RepoError::NotFound);
        }
        let sessions: Vec<Uuid> = state
            .responses
            .iter()
            .filter(|response| response.survey_id == id)
            .map(|response| response.id)
            .collect();
        state
            .answers
            .retain(|answer| !sessions.contains(&answer.survey_response_id));
        state.responses.retain(|response| response.survey_id != id);
        state.questions.retain(|question| question.survey_id != id);
        state.surveys.retain(|survey| survey.id != id);
        Ok(())
    }
}

#[async_trait]
impl QuestionsRepo for InMemoryRepositories {
    async fn list_questions(&self, survey_id: Uuid) -> Result<Vec<QuestionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .iter()
            .filter(|question| question.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<QuestionRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.questions.iter().find(|question| question.id == id).cloned())
    }

    async fn create_question(
        &self,
        params: CreateQuestionParams,
    ) -> Result<QuestionRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.survey_exists(params.survey_id) {
            return Err(foreign_key("surveys"));
        }
        if params.order_index < 0 {
            return Err(RepoError::Integrity {
                message: "order_index must be non-negative".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = QuestionRecord {
            id: Uuid::new_v4(),
            survey_id: params.survey_id,
            question_text: params.question_text,
            question_type: params.question_type,
            order_index: params.order_index,
            is_required: params.is_required,
            options: params.options,
            created_at: now,
            updated_at: now,
        };
        state.questions.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ResponsesRepo for InMemoryRepositories {
    async fn create_response(
        &self,
        survey_id: Uuid,
        respondent_id: Option<Uuid>,
        started_at: OffsetDateTime,
    ) -> Result<SurveyResponseRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.survey_exists(survey_id) {
            return Err(foreign_key("surveys"));
        }
        if respondent_id.is_some_and(|id| !state.user_exists(id)) {
            return Err(foreign_key("users"));
        }
        let record = SurveyResponseRecord {
            id: Uuid::new_v4(),
            survey_id,
            respondent_id,
            started_at,
            completed_at: None,
            is_completed: false,
        };
        state.responses.push(record.clone());
        Ok(record)
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<SurveyResponseRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.responses.iter().find(|response| response.id == id).cloned())
    }

    async fn list_responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponseRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .responses
            .iter()
            .rev()
            .filter(|response| response.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn complete_response(
        &self,
        id: Uuid,
        completed_at: OffsetDateTime,
    ) -> Result<CompletionOutcome, RepoError> {
        let mut state = self.state.write().await;
        let Some(response) = state.responses.iter_mut().find(|response| response.id == id) else {
            return Ok(CompletionOutcome::Missing);
        };
        if response.is_completed {
            return Ok(CompletionOutcome::AlreadyCompleted(response.clone()));
        }
        response.is_completed = true;
        response.completed_at = Some(completed_at);
        Ok(CompletionOutcome::Completed(response.clone()))
    }

    async fn count_completed(&self, survey_id: Option<Uuid>) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .responses
            .iter()
            .filter(|response| response.is_completed)
            .filter(|response| survey_id.is_none_or(|id| response.survey_id == id))
            .count() as u64)
    }

    async fn upsert_answer(
        &self,
        params: UpsertAnswerParams,
    ) -> Result<QuestionResponseRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state
            .responses
            .iter()
            .any(|response| response.id == params.survey_response_id)
        {
            return Err(foreign_key("survey_responses"));
        }
        if !state
            .questions
            .iter()
            .any(|question| question.id == params.question_id)
        {
            return Err(foreign_key("questions"));
        }

        if let Some(existing) = state.answers.iter_mut().find(|answer| {
            answer.survey_response_id == params.survey_response_id
                && answer.question_id == params.question_id
        }) {
            existing.answer = params.answer;
            existing.answered_at = params.answered_at;
            return Ok(existing.clone());
        }

        let record = QuestionResponseRecord {
            id: Uuid::new_v4(),
            survey_response_id: params.survey_response_id,
            question_id: params.question_id,
            answer: params.answer,
            answered_at: params.answered_at,
        };
        state.answers.push(record.clone());
        Ok(record)
    }

    async fn list_answers(
        &self,
        survey_response_id: Uuid,
    ) -> Result<Vec<QuestionResponseRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .answers
            .iter()
            .filter(|answer| answer.survey_response_id == survey_response_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.external_id == external_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, RepoError> {
        Ok(self.state.read().await.users.clone())
    }

    async fn upsert_user(&self, params: UpsertUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|user| user.email == params.email && user.external_id != params.external_id)
        {
            return Err(duplicate("users_email_key"));
        }

        let now = OffsetDateTime::now_utc();
        if let Some(user) = state
            .users
            .iter_mut()
            .find(|user| user.external_id == params.external_id)
        {
            user.email = params.email;
            user.first_name = params.first_name;
            user.last_name = params.last_name;
            user.updated_at = now;
            return Ok(user.clone());
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            external_id: params.external_id,
            email: params.email,
            first_name: params.first_name,
            last_name: params.last_name,
            role: params.initial_role,
            created_at: now,
            updated_at: now,
        };
        state.users.push(record.clone());
        Ok(record)
    }

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.role = role;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }
}

#[async_trait]
impl AccessTokensRepo for InMemoryRepositories {
    async fn create_token(
        &self,
        params: CreateAccessTokenParams,
    ) -> Result<AccessTokenRecord, RepoError> {
        let mut state = self.state.write().await;
        if !state.user_exists(params.user_id) {
            return Err(foreign_key("users"));
        }
        if state.tokens.iter().any(|token| token.prefix == params.prefix) {
            return Err(duplicate("access_tokens_prefix_key"));
        }
        let record = AccessTokenRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            name: params.name,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            revoked_at: None,
            last_used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        state.tokens.push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<AccessTokenRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.tokens.iter().find(|token| token.prefix == prefix).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AccessTokenRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .iter()
            .rev()
            .filter(|token| token.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let token = state
            .tokens
            .iter_mut()
            .find(|token| token.id == id)
            .ok_or(RepoError::NotFound)?;
        token.revoked_at.get_or_insert(revoked_at);
        Ok(())
    }

    async fn update_last_used(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if let Some(token) = state.tokens.iter_mut().find(|token| token.id == id) {
            token.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::QuestionType;

    async fn seeded() -> (InMemoryRepositories, UserRecord, SurveyRecord, QuestionRecord) {
        let repos = InMemoryRepositories::new();
        let user = repos
            .upsert_user(UpsertUserParams {
                external_id: "ext-1".into(),
                email: "a@example.com".into(),
                first_name: None,
                last_name: None,
                initial_role: UserRole::User,
            })
            .await
            .unwrap();
        let survey = repos
            .create_survey(CreateSurveyParams {
                title: "S".into(),
                description: None,
                is_active: true,
                created_by: user.id,
            })
            .await
            .unwrap();
        let question = repos
            .create_question(CreateQuestionParams {
                survey_id: survey.id,
                question_text: "Q".into(),
                question_type: QuestionType::Text,
                order_index: 0,
                is_required: true,
                options: None,
            })
            .await
            .unwrap();
        (repos, user, survey, question)
    }

    #[tokio::test]
    async fn answer_upsert_keeps_one_row_per_pair() {
        let (repos, user, survey, question) = seeded().await;
        let session = repos
            .create_response(survey.id, Some(user.id), OffsetDateTime::now_utc())
            .await
            .unwrap();

        for text in ["Blue", "Green"] {
            repos
                .upsert_answer(UpsertAnswerParams {
                    survey_response_id: session.id,
                    question_id: question.id,
                    answer: text.into(),
                    answered_at: OffsetDateTime::now_utc(),
                })
                .await
                .unwrap();
        }

        let answers = repos.list_answers(session.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "Green");
    }

    #[tokio::test]
    async fn completion_applies_once() {
        let (repos, _, survey, _) = seeded().await;
        let session = repos
            .create_response(survey.id, None, OffsetDateTime::now_utc())
            .await
            .unwrap();
        let now = OffsetDateTime::now_utc();

        assert!(matches!(
            repos.complete_response(session.id, now).await.unwrap(),
            CompletionOutcome::Completed(ref r) if r.completed_at == Some(now)
        ));
        assert!(matches!(
            repos.complete_response(session.id, now).await.unwrap(),
            CompletionOutcome::AlreadyCompleted(_)
        ));
        assert_eq!(
            repos.complete_response(Uuid::new_v4(), now).await.unwrap(),
            CompletionOutcome::Missing
        );
        assert_eq!(repos.count_completed(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn survey_delete_cascades() {
        let (repos, _, survey, question) = seeded().await;
        let session = repos
            .create_response(survey.id, None, OffsetDateTime::now_utc())
            .await
            .unwrap();
        repos
            .upsert_answer(UpsertAnswerParams {
                survey_response_id: session.id,
                question_id: question.id,
                answer: "x".into(),
                answered_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        repos.delete_survey(survey.id).await.unwrap();

        assert!(repos.list_questions(survey.id).await.unwrap().is_empty());
        assert!(repos.find_response(session.id).await.unwrap().is_none());
        assert!(repos.list_answers(session.id).await.unwrap().is_empty());
        assert_eq!(repos.delete_survey(survey.id).await, Err(RepoError::NotFound));
    }

    #[tokio::test]
    async fn email_is_unique_across_identities() {
        let (repos, _, _, _) = seeded().await;
        let err = repos
            .upsert_user(UpsertUserParams {
                external_id: "ext-2".into(),
                email: "a@example.com".into(),
                first_name: None,
                last_name: None,
                initial_role: UserRole::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }
}
