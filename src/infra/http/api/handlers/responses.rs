use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use canvass_api_types::{
    AnswerRequest, ListResponse, QuestionAnswer, SessionDetail, SurveyResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use super::super::error::ApiError;
use super::super::middleware::RequirePrincipal;
use super::super::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct ResponseListQuery {
    pub is_completed: Option<bool>,
}

pub async fn list_responses(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(survey_id): Path<Uuid>,
    Query(query): Query<ResponseListQuery>,
) -> Result<Json<ListResponse<SurveyResponse>>, ApiError> {
    let responses = state
        .services
        .responses
        .list_for_survey(&principal, survey_id, query.is_completed)
        .await?;
    Ok(Json(ListResponse {
        items: responses.into_iter().map(Into::into).collect(),
    }))
}

pub async fn start_response(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(survey_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .services
        .responses
        .start(&principal, survey_id)
        .await?;
    Ok((StatusCode::CREATED, Json(SurveyResponse::from(response))))
}

pub async fn get_response(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state.services.responses.session(&principal, id).await?;
    Ok(Json(SessionDetail {
        response: detail.response.into(),
        answers: detail.answers.into_iter().map(Into::into).collect(),
    }))
}

pub async fn submit_answer(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<QuestionAnswer>, ApiError> {
    let answer = state
        .services
        .responses
        .submit_answer(&principal, id, question_id, &payload.answer)
        .await?;
    Ok(Json(answer.into()))
}

pub async fn complete_response(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyResponse>, ApiError> {
    let response = state.services.responses.complete(&principal, id).await?;
    Ok(Json(response.into()))
}
