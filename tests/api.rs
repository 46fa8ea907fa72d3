use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use canvass::application::generation::{GenerationRequest, GeneratorError, SurveyGenerator};
use canvass::application::services::Services;
use canvass::cache::{CacheConfig, QueryCache};
use canvass::domain::types::UserRole;
use canvass::infra::generator::DisabledGenerator;
use canvass::infra::http::{ApiRateLimiter, ApiState, REQUEST_ID_HEADER, build_router};
use canvass::infra::memory::InMemoryRepositories;
use canvass_api_types::{
    ApiErrorBody, ListResponse, ProfileSyncRequest, QuestionDraft, QuestionType, Stats, Survey,
    SurveyDraft, SurveyResponse, SurveyWithQuestions, UserProfile,
};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Canned;

#[async_trait]
impl SurveyGenerator for Canned {
    async fn generate(&self, request: &GenerationRequest) -> Result<SurveyDraft, GeneratorError> {
        Ok(SurveyDraft {
            title: format!("About {}", request.prompt),
            description: None,
            questions: vec![QuestionDraft {
                question_text: "How was it?".into(),
                question_type: QuestionType::Rating,
                is_required: true,
                options: None,
            }],
        })
    }
}

struct TestApp {
    router: Router,
    services: Services,
}

impl TestApp {
    fn new(generator: Arc<dyn SurveyGenerator>, max_generations: u32) -> Self {
        let repos = Arc::new(InMemoryRepositories::new());
        let cache = Arc::new(QueryCache::with_system_clock(CacheConfig::default()));
        let services = Services::build(repos, cache, generator, Duration::from_secs(5));
        let state = ApiState::new(
            services.clone(),
            ApiRateLimiter::new(Duration::from_secs(60), max_generations),
        );
        Self {
            router: build_router(state),
            services,
        }
    }

    async fn token(&self, email: &str, role: UserRole) -> String {
        let profile = ProfileSyncRequest {
            email: email.into(),
            first_name: Some("Test".into()),
            last_name: None,
        };
        let user = self
            .services
            .users
            .sync(email, &profile, role)
            .await
            .expect("user");
        self.services
            .tokens
            .issue(user.id, "api-test", None)
            .await
            .expect("token")
            .token
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec();
        (status, headers, bytes)
    }
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).expect("json body")
}

fn draft_body() -> Value {
    json!({
        "title": "Retro",
        "questions": [
            { "question_text": "Went well?", "question_type": "text" },
            {
                "question_text": "Mood",
                "question_type": "multiple_choice",
                "options": [{ "text": "Good" }, { "text": "Bad" }]
            }
        ]
    })
}

#[tokio::test]
async fn public_reads_and_authenticated_writes() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);

    let (status, headers, body) = app.call(Method::GET, "/api/v1/surveys", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<ListResponse<Survey>>(&body).items.len(), 0);
    assert_eq!(
        headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("private, max-age=300")
    );
    assert_eq!(
        headers.get("x-cache-tags").and_then(|v| v.to_str().ok()),
        Some("surveys")
    );

    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/surveys",
            None,
            Some(json!({ "title": "Anonymous" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(parse::<ApiErrorBody>(&body).error.code, "unauthorized");

    let token = app.token("author@example.com", UserRole::User).await;
    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/surveys",
            Some(&token),
            Some(json!({ "title": "Team lunch" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let survey: Survey = parse(&body);
    assert!(survey.is_active);

    let (_, headers, body) = app
        .call(Method::GET, "/api/v1/surveys?is_active=true", None, None)
        .await;
    assert_eq!(parse::<ListResponse<Survey>>(&body).items.len(), 1);
    assert_eq!(
        headers.get("x-cache-tags").and_then(|v| v.to_str().ok()),
        Some("active-surveys,surveys")
    );
}

#[tokio::test]
async fn invalid_tokens_are_rejected_even_on_public_routes() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);
    let (status, _, _) = app
        .call(Method::GET, "/api/v1/surveys", Some("cv_nope_nope"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_response_flow_over_http() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);
    let author = app.token("author@example.com", UserRole::User).await;
    let respondent = app.token("respondent@example.com", UserRole::User).await;

    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/surveys/draft?activate=true",
            Some(&author),
            Some(draft_body()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: SurveyWithQuestions = parse(&body);
    assert_eq!(created.questions.len(), 2);
    assert_eq!(created.questions[1].order_index, 1);
    let survey_id = created.survey.id;

    let (status, _, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/surveys/{survey_id}/responses"),
            Some(&respondent),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let session: SurveyResponse = parse(&body);

    let answer_uri = |index: usize| {
        format!(
            "/api/v1/responses/{}/answers/{}",
            session.id, created.questions[index].id
        )
    };
    let (status, _, body) = app
        .call(
            Method::PUT,
            &answer_uri(1),
            Some(&respondent),
            Some(json!({ "answer": "Meh" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse::<ApiErrorBody>(&body).error.code, "validation_failed");

    for (index, answer) in [(0, "Shipping"), (1, "Good")] {
        let (status, _, _) = app
            .call(
                Method::PUT,
                &answer_uri(index),
                Some(&respondent),
                Some(json!({ "answer": answer })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let complete_uri = format!("/api/v1/responses/{}/complete", session.id);
    let (status, _, body) = app
        .call(Method::POST, &complete_uri, Some(&respondent), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(parse::<SurveyResponse>(&body).is_completed);

    let (status, _, body) = app
        .call(Method::POST, &complete_uri, Some(&respondent), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse::<ApiErrorBody>(&body).error.code, "already_completed");

    let (status, _, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/surveys/{survey_id}/responses"),
            Some(&respondent),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/surveys/{survey_id}/responses?is_completed=true"),
            Some(&author),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<ListResponse<SurveyResponse>>(&body).items.len(), 1);

    let (_, _, body) = app.call(Method::GET, "/api/v1/stats", None, None).await;
    let stats: Stats = parse(&body);
    assert_eq!(stats.completed_responses, 1);
    assert_eq!(stats.active_surveys, 1);
}

#[tokio::test]
async fn generation_is_rate_limited_per_caller() {
    let app = TestApp::new(Arc::new(Canned), 2);
    let token = app.token("author@example.com", UserRole::User).await;
    let other = app.token("other@example.com", UserRole::User).await;
    let body = json!({ "prompt": "onboarding" });

    let (status, headers, payload) = app
        .call(Method::POST, "/api/v1/generate", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<SurveyDraft>(&payload).title, "About onboarding");
    assert_eq!(
        headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok()),
        Some("1")
    );

    app.call(Method::POST, "/api/v1/generate", Some(&token), Some(body.clone()))
        .await;
    let (status, headers, payload) = app
        .call(Method::POST, "/api/v1/generate", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));
    assert_eq!(parse::<ApiErrorBody>(&payload).error.code, "rate_limited");

    let (status, _, _) = app
        .call(Method::POST, "/api/v1/generate", Some(&other), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn generation_reports_missing_backend_and_bad_prompts() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);
    let token = app.token("author@example.com", UserRole::User).await;

    let (status, _, _) = app
        .call(
            Method::POST,
            "/api/v1/generate",
            None,
            Some(json!({ "prompt": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/generate",
            Some(&token),
            Some(json!({ "prompt": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse::<ApiErrorBody>(&body).error.code, "validation_failed");

    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/generate",
            Some(&token),
            Some(json!({ "prompt": "customer feedback" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        parse::<ApiErrorBody>(&body).error.code,
        "generator_unavailable"
    );
}

#[tokio::test]
async fn admins_manage_roles() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);
    let admin = app.token("admin@example.com", UserRole::Admin).await;
    let user = app.token("user@example.com", UserRole::User).await;

    let (status, _, _) = app.call(Method::GET, "/api/v1/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, _, body) = app.call(Method::GET, "/api/v1/users/me", Some(&user), None).await;
    let me: UserProfile = parse(&body);
    assert_eq!(me.role, UserRole::User);

    let (status, _, body) = app
        .call(
            Method::PUT,
            &format!("/api/v1/users/{}/role", me.id),
            Some(&admin),
            Some(json!({ "role": "moderator" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<UserProfile>(&body).role, UserRole::Moderator);

    let (_, _, body) = app.call(Method::GET, "/api/v1/users/me", Some(&user), None).await;
    assert_eq!(parse::<UserProfile>(&body).role, UserRole::Moderator);

    let (_, _, body) = app.call(Method::GET, "/api/v1/users/me", Some(&admin), None).await;
    let admin_id = parse::<UserProfile>(&body).id;
    let (status, _, _) = app
        .call(
            Method::PUT,
            &format!("/api/v1/users/{admin_id}/role"),
            Some(&admin),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = app
        .call(
            Method::PUT,
            "/api/v1/users/me/profile",
            Some(&user),
            Some(json!({ "email": "user@example.com", "first_name": "Ada" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<UserProfile>(&body).first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn request_ids_are_echoed_or_assigned() {
    let app = TestApp::new(Arc::new(DisabledGenerator), 5);

    let request = Request::builder()
        .uri("/api/v1/stats")
        .header(REQUEST_ID_HEADER, "trace-123")
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("trace-123")
    );

    let (status, headers, _) = app.call(Method::GET, "/_health/db", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers.contains_key(REQUEST_ID_HEADER));
}
