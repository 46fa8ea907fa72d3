use axum::Json;
use axum::extract::State;
use canvass_api_types::Stats;

use super::super::error::ApiError;
use super::super::state::ApiState;

pub async fn get_stats(State(state): State<ApiState>) -> Result<Json<Stats>, ApiError> {
    let stats = state.services.stats.overview().await?;
    Ok(Json(stats))
}
