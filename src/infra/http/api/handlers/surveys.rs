use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use canvass_api_types::{
    ListResponse, Survey, SurveyCreateRequest, SurveyDraft, SurveyUpdateRequest,
    SurveyWithQuestions,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::cache::QueryKey;

use super::super::error::ApiError;
use super::super::middleware::RequirePrincipal;
use super::super::state::ApiState;
use super::cached_json;

#[derive(Debug, Default, Deserialize)]
pub struct SurveyListQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftQuery {
    #[serde(default)]
    pub activate: bool,
}

pub async fn list_surveys(
    State(state): State<ApiState>,
    Query(query): Query<SurveyListQuery>,
) -> Result<Response, ApiError> {
    let surveys = state.services.surveys.list(query.is_active).await?;
    let key = match query.is_active {
        Some(flag) => QueryKey::SurveysByActive(flag),
        None => QueryKey::AllSurveys,
    };
    let body = ListResponse {
        items: surveys.into_iter().map(Survey::from).collect::<Vec<_>>(),
    };
    Ok(cached_json(state.services.reads.cache(), &key, body))
}

pub async fn list_my_surveys(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Response, ApiError> {
    let surveys = state.services.surveys.list_owned(&principal).await?;
    let body = ListResponse {
        items: surveys.into_iter().map(Survey::from).collect::<Vec<_>>(),
    };
    Ok(cached_json(
        state.services.reads.cache(),
        &QueryKey::SurveysByOwner(principal.user_id),
        body,
    ))
}

pub async fn get_survey(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let survey = state.services.surveys.get(id).await?;
    Ok(cached_json(
        state.services.reads.cache(),
        &QueryKey::SurveyById(id),
        Survey::from(survey),
    ))
}

pub async fn create_survey(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(payload): Json<SurveyCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let survey = state.services.surveys.create(&principal, &payload).await?;
    Ok((StatusCode::CREATED, Json(Survey::from(survey))))
}

pub async fn create_draft(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(query): Query<DraftQuery>,
    Json(payload): Json<SurveyDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let (survey, questions) = state
        .services
        .surveys
        .create_from_draft(&principal, &payload, query.activate)
        .await?;
    let body = SurveyWithQuestions {
        survey: survey.into(),
        questions: questions.into_iter().map(Into::into).collect(),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn update_survey(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<SurveyUpdateRequest>,
) -> Result<Json<Survey>, ApiError> {
    let survey = state
        .services
        .surveys
        .update(&principal, id, &payload)
        .await?;
    Ok(Json(survey.into()))
}

pub async fn delete_survey(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.services.surveys.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
