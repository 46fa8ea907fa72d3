use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateSurveyParams, RepoError, SurveyFilter, SurveysRepo, UpdateSurveyParams,
};
use crate::domain::entities::SurveyRecord;

use super::{PostgresRepositories, map_sqlx_error};

const SURVEY_COLUMNS: &str = "id, title, description, is_active, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SurveyRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    is_active: bool,
    created_by: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SurveyRow> for SurveyRecord {
    fn from(row: SurveyRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SurveysRepo for PostgresRepositories {
    async fn list_surveys(&self, filter: SurveyFilter) -> Result<Vec<SurveyRecord>, RepoError> {
        let sql = format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys \
             WHERE ($1::bool IS NULL OR is_active = $1) \
               AND ($2::uuid IS NULL OR created_by = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, SurveyRow>(&sql)
            .bind(filter.is_active)
            .bind(filter.created_by)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(SurveyRecord::from).collect())
    }

    async fn find_survey(&self, id: Uuid) -> Result<Option<SurveyRecord>, RepoError> {
        let sql = format!("SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = $1");
        let row = sqlx::query_as::<_, SurveyRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(SurveyRecord::from))
    }

    async fn create_survey(&self, params: CreateSurveyParams) -> Result<SurveyRecord, RepoError> {
        let sql = format!(
            "INSERT INTO surveys (id, title, description, is_active, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {SURVEY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SurveyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.description)
            .bind(params.is_active)
            .bind(params.created_by)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_survey(&self, params: UpdateSurveyParams) -> Result<SurveyRecord, RepoError> {
        let sql = format!(
            "UPDATE surveys SET title = $2, description = $3, is_active = $4, updated_at = $5 \
             WHERE id = $1 \
             RETURNING {SURVEY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SurveyRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.description)
            .bind(params.is_active)
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(SurveyRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_survey(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
