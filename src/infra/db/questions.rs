use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateQuestionParams, QuestionsRepo, RepoError};
use crate::domain::entities::QuestionRecord;
use crate::domain::types::{QuestionOption, QuestionType};

use super::{PostgresRepositories, map_sqlx_error};

const QUESTION_COLUMNS: &str = "id, survey_id, question_text, question_type, order_index, \
     is_required, options, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    survey_id: Uuid,
    question_text: String,
    question_type: QuestionType,
    order_index: i32,
    is_required: bool,
    options: Option<Json<Vec<QuestionOption>>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<QuestionRow> for QuestionRecord {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            survey_id: row.survey_id,
            question_text: row.question_text,
            question_type: row.question_type,
            order_index: row.order_index,
            is_required: row.is_required,
            options: row.options.map(|Json(options)| options),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl QuestionsRepo for PostgresRepositories {
    async fn list_questions(&self, survey_id: Uuid) -> Result<Vec<QuestionRecord>, RepoError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE survey_id = $1 \
             ORDER BY order_index, created_at, id"
        );
        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(survey_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(QuestionRecord::from).collect())
    }

    async fn find_question(&self, id: Uuid) -> Result<Option<QuestionRecord>, RepoError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(QuestionRecord::from))
    }

    async fn create_question(
        &self,
        params: CreateQuestionParams,
    ) -> Result<QuestionRecord, RepoError> {
        let sql = format!(
            "INSERT INTO questions \
             (id, survey_id, question_text, question_type, order_index, is_required, options, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {QUESTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.survey_id)
            .bind(params.question_text)
            .bind(params.question_type)
            .bind(params.order_index)
            .bind(params.is_required)
            .bind(params.options.map(Json))
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
