use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CompletionOutcome, RepoError, ResponsesRepo, UpsertAnswerParams,
};
use crate::domain::entities::{QuestionResponseRecord, SurveyResponseRecord};

use super::{PostgresRepositories, map_sqlx_error};

const RESPONSE_COLUMNS: &str = "id, survey_id, respondent_id, started_at, completed_at, is_completed";
const ANSWER_COLUMNS: &str = "id, survey_response_id, question_id, answer, answered_at";

#[derive(Debug, sqlx::FromRow)]
struct ResponseRow {
    id: Uuid,
    survey_id: Uuid,
    respondent_id: Option<Uuid>,
    started_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
    is_completed: bool,
}

impl From<ResponseRow> for SurveyResponseRecord {
    fn from(row: ResponseRow) -> Self {
        Self {
            id: row.id,
            survey_id: row.survey_id,
            respondent_id: row.respondent_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            is_completed: row.is_completed,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    id: Uuid,
    survey_response_id: Uuid,
    question_id: Uuid,
    answer: String,
    answered_at: OffsetDateTime,
}

impl From<AnswerRow> for QuestionResponseRecord {
    fn from(row: AnswerRow) -> Self {
        Self {
            id: row.id,
            survey_response_id: row.survey_response_id,
            question_id: row.question_id,
            answer: row.answer,
            answered_at: row.answered_at,
        }
    }
}

#[async_trait]
impl ResponsesRepo for PostgresRepositories {
    async fn create_response(
        &self,
        survey_id: Uuid,
        respondent_id: Option<Uuid>,
        started_at: OffsetDateTime,
    ) -> Result<SurveyResponseRecord, RepoError> {
        let sql = format!(
            "INSERT INTO survey_responses (id, survey_id, respondent_id, started_at, is_completed) \
             VALUES ($1, $2, $3, $4, FALSE) \
             RETURNING {RESPONSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ResponseRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(survey_id)
            .bind(respondent_id)
            .bind(started_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<SurveyResponseRecord>, RepoError> {
        let sql = format!("SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE id = $1");
        let row = sqlx::query_as::<_, ResponseRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(SurveyResponseRecord::from))
    }

    async fn list_responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponseRecord>, RepoError> {
        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE survey_id = $1 \
             ORDER BY started_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ResponseRow>(&sql)
            .bind(survey_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(SurveyResponseRecord::from).collect())
    }

    async fn complete_response(
        &self,
        id: Uuid,
        completed_at: OffsetDateTime,
    ) -> Result<CompletionOutcome, RepoError> {
        let sql = format!(
            "UPDATE survey_responses SET is_completed = TRUE, completed_at = $2 \
             WHERE id = $1 AND is_completed = FALSE \
             RETURNING {RESPONSE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ResponseRow>(&sql)
            .bind(id)
            .bind(completed_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if let Some(row) = updated {
            return Ok(CompletionOutcome::Completed(row.into()));
        }
        Ok(match self.find_response(id).await? {
            Some(existing) => CompletionOutcome::AlreadyCompleted(existing),
            None => CompletionOutcome::Missing,
        })
    }

    async fn count_completed(&self, survey_id: Option<Uuid>) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM survey_responses \
             WHERE is_completed AND ($1::uuid IS NULL OR survey_id = $1)",
        )
        .bind(survey_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn upsert_answer(
        &self,
        params: UpsertAnswerParams,
    ) -> Result<QuestionResponseRecord, RepoError> {
        let sql = format!(
            "INSERT INTO question_responses (id, survey_response_id, question_id, answer, answered_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (survey_response_id, question_id) \
             DO UPDATE SET answer = EXCLUDED.answer, answered_at = EXCLUDED.answered_at \
             RETURNING {ANSWER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AnswerRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.survey_response_id)
            .bind(params.question_id)
            .bind(params.answer)
            .bind(params.answered_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_answers(
        &self,
        survey_response_id: Uuid,
    ) -> Result<Vec<QuestionResponseRecord>, RepoError> {
        let sql = format!(
            "SELECT {ANSWER_COLUMNS} FROM question_responses WHERE survey_response_id = $1 \
             ORDER BY answered_at, id"
        );
        let rows = sqlx::query_as::<_, AnswerRow>(&sql)
            .bind(survey_response_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(QuestionResponseRecord::from).collect())
    }
}
