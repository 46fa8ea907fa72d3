use axum::Json;
use axum::extract::{Path, State};
use canvass_api_types::{ListResponse, ProfileSyncRequest, RoleUpdateRequest, UserProfile};
use uuid::Uuid;

use super::super::error::ApiError;
use super::super::middleware::RequirePrincipal;
use super::super::state::ApiState;

pub async fn me(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.services.users.me(&principal).await?;
    Ok(Json(user.into()))
}

pub async fn sync_profile(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(payload): Json<ProfileSyncRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.services.users.sync_me(&principal, &payload).await?;
    Ok(Json(user.into()))
}

pub async fn list_users(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<ListResponse<UserProfile>>, ApiError> {
    let users = state.services.users.list(&principal).await?;
    Ok(Json(ListResponse {
        items: users.into_iter().map(Into::into).collect(),
    }))
}

pub async fn update_role(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .services
        .users
        .update_role(&principal, id, payload.role)
        .await?;
    Ok(Json(user.into()))
}
