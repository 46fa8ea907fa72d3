pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

/// Routes under `/api/v1`.
///
/// Authentication runs for every route and only attaches a principal when a
/// bearer token is sent. Generation is additionally rate limited per caller.
pub fn build_api_router(state: ApiState) -> Router {
    let generation = Router::new()
        .route("/generate", post(handlers::generate_survey))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::api_rate_limit,
        ));

    let routes = Router::new()
        .route(
            "/surveys",
            get(handlers::list_surveys).post(handlers::create_survey),
        )
        .route("/surveys/mine", get(handlers::list_my_surveys))
        .route("/surveys/draft", post(handlers::create_draft))
        .route(
            "/surveys/{id}",
            get(handlers::get_survey)
                .patch(handlers::update_survey)
                .delete(handlers::delete_survey),
        )
        .route(
            "/surveys/{id}/questions",
            get(handlers::list_questions).post(handlers::create_question),
        )
        .route(
            "/surveys/{id}/responses",
            get(handlers::list_responses).post(handlers::start_response),
        )
        .route("/responses/{id}", get(handlers::get_response))
        .route(
            "/responses/{id}/answers/{question_id}",
            put(handlers::submit_answer),
        )
        .route(
            "/responses/{id}/complete",
            post(handlers::complete_response),
        )
        .route("/stats", get(handlers::get_stats))
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::me))
        .route("/users/me/profile", put(handlers::sync_profile))
        .route("/users/{id}/role", put(handlers::update_role))
        .merge(generation)
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", routes)
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::api_auth,
        ))
}
