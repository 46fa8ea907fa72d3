use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use canvass_api_types::{ListResponse, Question, QuestionCreateRequest};
use uuid::Uuid;

use crate::cache::QueryKey;

use super::super::error::ApiError;
use super::super::middleware::RequirePrincipal;
use super::super::state::ApiState;
use super::cached_json;

pub async fn list_questions(
    State(state): State<ApiState>,
    Path(survey_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let questions = state.services.questions.list(survey_id).await?;
    let body = ListResponse {
        items: questions.into_iter().map(Question::from).collect::<Vec<_>>(),
    };
    Ok(cached_json(
        state.services.reads.cache(),
        &QueryKey::QuestionsBySurvey(survey_id),
        body,
    ))
}

pub async fn create_question(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(survey_id): Path<Uuid>,
    Json(payload): Json<QuestionCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .services
        .questions
        .create(&principal, survey_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(Question::from(question))))
}
