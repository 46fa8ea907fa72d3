use axum::Json;
use axum::extract::State;
use canvass_api_types::{GenerateRequest, SurveyDraft};
use metrics::counter;
use tracing::info;

use crate::infra::telemetry::METRIC_GENERATION_TOTAL;

use super::super::error::ApiError;
use super::super::middleware::RequirePrincipal;
use super::super::state::ApiState;

/// Returns a validated survey skeleton; nothing is persisted.
pub async fn generate_survey(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<SurveyDraft>, ApiError> {
    match state.services.generation.generate(&payload.prompt).await {
        Ok(draft) => {
            counter!(METRIC_GENERATION_TOTAL, "outcome" => "ok").increment(1);
            info!(
                target: "canvass::generation",
                user_id = %principal.user_id,
                questions = draft.questions.len(),
                "survey skeleton generated"
            );
            Ok(Json(draft))
        }
        Err(err) => {
            counter!(METRIC_GENERATION_TOTAL, "outcome" => "error").increment(1);
            Err(err.into())
        }
    }
}
