//! Behaviour shared by every repository backend.

use std::sync::Arc;

use canvass::application::repos::{
    CompletionOutcome, CreateQuestionParams, CreateSurveyParams, QuestionsRepo, RepoError,
    ResponsesRepo, SurveyFilter, SurveysRepo, UpsertAnswerParams, UpsertUserParams, UsersRepo,
};
use canvass::application::services::Repositories;
use canvass::domain::types::{QuestionType, UserRole};
use canvass::infra::db::PostgresRepositories;
use canvass::infra::memory::InMemoryRepositories;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

async fn seed_user<R: Repositories>(repos: &R, email: &str) -> Uuid {
    repos
        .upsert_user(UpsertUserParams {
            external_id: format!("ext-{email}"),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            initial_role: UserRole::User,
        })
        .await
        .expect("user")
        .id
}

async fn seed_survey<R: Repositories>(repos: &R, owner: Uuid, active: bool) -> Uuid {
    repos
        .create_survey(CreateSurveyParams {
            title: "Contract".into(),
            description: None,
            is_active: active,
            created_by: owner,
        })
        .await
        .expect("survey")
        .id
}

async fn seed_question<R: Repositories>(repos: &R, survey_id: Uuid, order_index: i32) -> Uuid {
    repos
        .create_question(CreateQuestionParams {
            survey_id,
            question_text: format!("Question {order_index}"),
            question_type: QuestionType::Text,
            order_index,
            is_required: true,
            options: None,
        })
        .await
        .expect("question")
        .id
}

async fn answers_upsert_per_pair<R: Repositories>(repos: Arc<R>) {
    let owner = seed_user(repos.as_ref(), "owner@example.com").await;
    let survey = seed_survey(repos.as_ref(), owner, true).await;
    let question = seed_question(repos.as_ref(), survey, 0).await;
    let session = repos
        .create_response(survey, Some(owner), OffsetDateTime::now_utc())
        .await
        .expect("session");

    for answer in ["first", "second"] {
        repos
            .upsert_answer(UpsertAnswerParams {
                survey_response_id: session.id,
                question_id: question,
                answer: answer.into(),
                answered_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("upsert");
    }

    let answers = repos.list_answers(session.id).await.expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer, "second");
}

async fn completion_is_conditional<R: Repositories>(repos: Arc<R>) {
    let owner = seed_user(repos.as_ref(), "owner@example.com").await;
    let survey = seed_survey(repos.as_ref(), owner, true).await;
    let session = repos
        .create_response(survey, None, OffsetDateTime::now_utc())
        .await
        .expect("session");

    let first = repos
        .complete_response(session.id, OffsetDateTime::now_utc())
        .await
        .expect("complete");
    assert!(matches!(first, CompletionOutcome::Completed(ref r) if r.completed_at.is_some()));

    let second = repos
        .complete_response(session.id, OffsetDateTime::now_utc())
        .await
        .expect("complete again");
    assert!(matches!(second, CompletionOutcome::AlreadyCompleted(_)));

    let missing = repos
        .complete_response(Uuid::new_v4(), OffsetDateTime::now_utc())
        .await
        .expect("missing");
    assert_eq!(missing, CompletionOutcome::Missing);

    assert_eq!(repos.count_completed(None).await.expect("count"), 1);
    assert_eq!(repos.count_completed(Some(survey)).await.expect("count"), 1);
    assert_eq!(
        repos.count_completed(Some(Uuid::new_v4())).await.expect("count"),
        0
    );
}

async fn deletes_cascade<R: Repositories>(repos: Arc<R>) {
    let owner = seed_user(repos.as_ref(), "owner@example.com").await;
    let survey = seed_survey(repos.as_ref(), owner, false).await;
    let question = seed_question(repos.as_ref(), survey, 0).await;
    let session = repos
        .create_response(survey, Some(owner), OffsetDateTime::now_utc())
        .await
        .expect("session");

    repos.delete_survey(survey).await.expect("delete");

    assert!(repos.find_survey(survey).await.expect("find").is_none());
    assert!(repos.find_question(question).await.expect("find").is_none());
    assert!(repos.find_response(session.id).await.expect("find").is_none());
    assert!(matches!(
        repos.delete_survey(survey).await,
        Err(RepoError::NotFound)
    ));
}

async fn questions_and_filters<R: Repositories>(repos: Arc<R>) {
    let owner = seed_user(repos.as_ref(), "owner@example.com").await;
    let active = seed_survey(repos.as_ref(), owner, true).await;
    seed_survey(repos.as_ref(), owner, false).await;

    let later = seed_question(repos.as_ref(), active, 2).await;
    let earlier = seed_question(repos.as_ref(), active, 1).await;
    let ids: Vec<Uuid> = repos
        .list_questions(active)
        .await
        .expect("questions")
        .into_iter()
        .map(|q| q.id)
        .collect();
    assert_eq!(ids, vec![earlier, later]);

    let only_active = repos
        .list_surveys(SurveyFilter {
            is_active: Some(true),
            ..SurveyFilter::default()
        })
        .await
        .expect("surveys");
    assert_eq!(only_active.len(), 1);
    assert_eq!(only_active[0].id, active);

    let orphan = repos
        .create_question(CreateQuestionParams {
            survey_id: Uuid::new_v4(),
            question_text: "Orphan".into(),
            question_type: QuestionType::Text,
            order_index: 0,
            is_required: false,
            options: None,
        })
        .await;
    assert!(matches!(orphan, Err(RepoError::InvalidInput { .. })));
}

async fn emails_are_unique<R: Repositories>(repos: Arc<R>) {
    seed_user(repos.as_ref(), "same@example.com").await;
    let clash = repos
        .upsert_user(UpsertUserParams {
            external_id: "someone-else".into(),
            email: "same@example.com".into(),
            first_name: None,
            last_name: None,
            initial_role: UserRole::User,
        })
        .await;
    assert!(matches!(clash, Err(RepoError::Duplicate { .. })));
}

#[tokio::test]
async fn memory_answers_upsert_per_pair() {
    answers_upsert_per_pair(Arc::new(InMemoryRepositories::new())).await;
}

#[tokio::test]
async fn memory_completion_is_conditional() {
    completion_is_conditional(Arc::new(InMemoryRepositories::new())).await;
}

#[tokio::test]
async fn memory_deletes_cascade() {
    deletes_cascade(Arc::new(InMemoryRepositories::new())).await;
}

#[tokio::test]
async fn memory_questions_and_filters() {
    questions_and_filters(Arc::new(InMemoryRepositories::new())).await;
}

#[tokio::test]
async fn memory_emails_are_unique() {
    emails_are_unique(Arc::new(InMemoryRepositories::new())).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_answers_upsert_per_pair(pool: PgPool) {
    answers_upsert_per_pair(Arc::new(PostgresRepositories::new(pool))).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_completion_is_conditional(pool: PgPool) {
    completion_is_conditional(Arc::new(PostgresRepositories::new(pool))).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_deletes_cascade(pool: PgPool) {
    deletes_cascade(Arc::new(PostgresRepositories::new(pool))).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_questions_and_filters(pool: PgPool) {
    questions_and_filters(Arc::new(PostgresRepositories::new(pool))).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_emails_are_unique(pool: PgPool) {
    emails_are_unique(Arc::new(PostgresRepositories::new(pool))).await;
}
