use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use canvass_api_types::{ApiErrorBody, ApiErrorDetail};

use crate::application::access_tokens::AuthError;
use crate::application::error::{ErrorReport, ServiceError};
use crate::application::generation::{GenerationError, GeneratorError};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const VALIDATION: &str = "validation_failed";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const TOKEN_EXPIRED: &str = "token_expired";
    pub const TOKEN_REVOKED: &str = "token_revoked";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const ALREADY_COMPLETED: &str = "already_completed";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const INVARIANT: &str = "invariant_violated";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const GENERATOR_UNAVAILABLE: &str = "generator_unavailable";
    pub const GENERATOR_FAILED: &str = "generator_failed";
    pub const GENERATOR_TIMEOUT: &str = "generator_timeout";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Bearer token required",
            None,
        )
    }

    pub fn forbidden(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "Not allowed",
            hint,
        )
    }

    pub fn not_found(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, hint)
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => Self::not_found("Resource not found", None),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => {
                Self::not_found("Resource not found", Some(format!("{entity} not found")))
            }
            DomainError::Validation { field, message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::VALIDATION,
                "Validation failed",
                Some(format!("{field}: {message}")),
            ),
            DomainError::Invariant { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INVARIANT,
                "Invariant violated",
                Some(message),
            ),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let hint = err.to_string();
        match err {
            ServiceError::Domain(domain) => domain.into(),
            ServiceError::Repo(repo) => repo.into(),
            ServiceError::NotFound(_) => Self::not_found("Resource not found", Some(hint)),
            ServiceError::Unauthenticated => Self::unauthorized(),
            ServiceError::Forbidden(_) => Self::forbidden(Some(hint)),
            ServiceError::AlreadyCompleted => Self::new(
                StatusCode::CONFLICT,
                codes::ALREADY_COMPLETED,
                "Survey response already completed",
                None,
            ),
            ServiceError::Conflict(message) => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "Conflict",
                Some(message),
            ),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing | AuthError::Invalid => Self::unauthorized(),
            AuthError::Expired => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Bearer token expired",
                None,
            ),
            AuthError::Revoked => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_REVOKED,
                "Bearer token revoked",
                None,
            ),
            AuthError::Lookup(repo) => repo.into(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidPrompt(domain) => domain.into(),
            GenerationError::InvalidSkeleton(message) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::GENERATOR_FAILED,
                "Generated survey was unusable",
                Some(message),
            ),
            GenerationError::Generator(GeneratorError::NotConfigured) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::GENERATOR_UNAVAILABLE,
                "Survey generation is not configured",
                None,
            ),
            GenerationError::Generator(GeneratorError::Timeout) => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::GENERATOR_TIMEOUT,
                "Survey generation timed out",
                None,
            ),
            GenerationError::Generator(other) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::GENERATOR_FAILED,
                "Survey generation failed",
                Some(other.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::NotFound("survey"), StatusCode::NOT_FOUND),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("delete"), StatusCode::FORBIDDEN),
            (ServiceError::AlreadyCompleted, StatusCode::CONFLICT),
            (
                ServiceError::validation("title", "required"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Repo(RepoError::Persistence("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn unconfigured_generator_is_unavailable() {
        let err = ApiError::from(GenerationError::Generator(GeneratorError::NotConfigured));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::GENERATOR_UNAVAILABLE);
    }
}
