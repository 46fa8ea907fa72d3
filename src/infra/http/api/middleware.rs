use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::{debug, warn};

use crate::domain::permissions::Principal;
use crate::infra::telemetry::METRIC_RATE_LIMITED_TOTAL;

use super::error::ApiError;
use super::state::ApiState;

/// Resolves an optional bearer token into a [`Principal`].
///
/// Requests without a token pass through anonymously; handlers that need a
/// caller use [`RequirePrincipal`]. A token that is present but unusable is
/// always rejected.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(axum::http::header::AUTHORIZATION));

    let Some(token) = token else {
        return next.run(request).await;
    };

    let principal = match state.services.tokens.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => {
            debug!(target: "canvass::api::auth", error = %err, "bearer token rejected");
            return ApiError::from(err).into_response();
        }
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(principal) = request.extensions().get::<Principal>() else {
        warn!(
            target: "canvass::api::ratelimit",
            path = %path,
            "missing principal in rate limit middleware"
        );
        return ApiError::unauthorized().into_response();
    };

    let key = principal.user_id.to_string();
    let (allowed, remaining) = state.rate_limiter.allow(&key, &path);
    if !allowed {
        counter!(METRIC_RATE_LIMITED_TOTAL, "route" => path).increment(1);
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(state.rate_limiter.limit()));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    if bearer.is_empty() {
        return None;
    }
    Some(bearer.to_string())
}

/// Caller identity for handlers that require authentication.
#[derive(Debug, Clone)]
pub struct RequirePrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for RequirePrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}
