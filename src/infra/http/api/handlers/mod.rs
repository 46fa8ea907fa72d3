//! JSON handlers for `/api/v1`.

mod generate;
mod questions;
mod responses;
mod stats;
mod surveys;
mod users;

pub use generate::generate_survey;
pub use questions::{create_question, list_questions};
pub use responses::{complete_response, get_response, list_responses, start_response, submit_answer};
pub use stats::get_stats;
pub use surveys::{
    create_draft, create_survey, delete_survey, get_survey, list_my_surveys, list_surveys,
    update_survey,
};
pub use users::{list_users, me, sync_profile, update_role};

use axum::Json;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::cache::{QueryCache, QueryKey};

/// Serializes a cacheable read and advertises its freshness and tags.
fn cached_json<T: Serialize>(cache: &QueryCache, key: &QueryKey, body: T) -> Response {
    let mut response = Json(body).into_response();
    let ttl = cache.config().ttl(key.duration()).as_secs();
    let tags = key
        .tags()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("private, max-age={ttl}")) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&tags) {
        headers.insert("x-cache-tags", value);
    }
    response
}
