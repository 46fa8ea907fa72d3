use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use canvass::application::error::ServiceError;
use canvass::application::repos::{CreateSurveyParams, ResponsesRepo, SurveysRepo};
use canvass::application::services::Services;
use canvass::application::wizard::{
    GatewayError, LocalGateway, SurveyGateway, WizardDriver, WizardPhase,
};
use canvass::cache::{CacheConfig, QueryCache};
use canvass::domain::permissions::Principal;
use canvass::domain::types::UserRole;
use canvass::infra::generator::DisabledGenerator;
use canvass::infra::memory::InMemoryRepositories;
use canvass::test_support::ManualClock;
use canvass_api_types::{
    OptionDraft, ProfileSyncRequest, Question, QuestionDraft, QuestionType, Survey,
    SurveyCreateRequest, SurveyDraft, SurveyUpdateRequest,
};
use uuid::Uuid;

struct Fixture {
    repos: Arc<InMemoryRepositories>,
    clock: Arc<ManualClock>,
    services: Services,
    author: Principal,
}

impl Fixture {
    async fn new() -> Self {
        let repos = Arc::new(InMemoryRepositories::new());
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = Arc::new(QueryCache::new(CacheConfig::default(), clock.clone()));
        let services = Services::build(
            repos.clone(),
            cache,
            Arc::new(DisabledGenerator),
            Duration::from_secs(5),
        );
        let author = principal(&services, "author@example.com", UserRole::User).await;
        Self {
            repos,
            clock,
            services,
            author,
        }
    }

    async fn survey(&self, questions: Vec<QuestionDraft>) -> (Uuid, Vec<Uuid>) {
        let draft = SurveyDraft {
            title: "Lunch poll".into(),
            description: Some("Where should we eat?".into()),
            questions,
        };
        let (survey, questions) = self
            .services
            .surveys
            .create_from_draft(&self.author, &draft, true)
            .await
            .expect("draft created");
        (survey.id, questions.into_iter().map(|q| q.id).collect())
    }
}

async fn principal(services: &Services, email: &str, role: UserRole) -> Principal {
    let profile = ProfileSyncRequest {
        email: email.into(),
        first_name: None,
        last_name: None,
    };
    let user = services
        .users
        .sync(email, &profile, role)
        .await
        .expect("user synced");
    Principal::new(user.id, user.role)
}

fn text(question: &str, required: bool) -> QuestionDraft {
    QuestionDraft {
        question_text: question.into(),
        question_type: QuestionType::Text,
        is_required: required,
        options: None,
    }
}

fn colours(required: bool) -> QuestionDraft {
    QuestionDraft {
        question_text: "Favourite colour?".into(),
        question_type: QuestionType::MultipleChoice,
        is_required: required,
        options: Some(
            ["Red", "Blue"]
                .into_iter()
                .map(|text| OptionDraft {
                    id: None,
                    text: text.into(),
                })
                .collect(),
        ),
    }
}

#[tokio::test]
async fn resubmitting_an_answer_replaces_it() {
    let fx = Fixture::new().await;
    let (survey_id, questions) = fx.survey(vec![text("Name?", true)]).await;
    let session = fx
        .services
        .responses
        .start(&fx.author, survey_id)
        .await
        .expect("session");

    for answer in ["Ada", "Grace"] {
        fx.services
            .responses
            .submit_answer(&fx.author, session.id, questions[0], answer)
            .await
            .expect("answer stored");
    }

    let answers = fx.repos.list_answers(session.id).await.expect("answers");
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answer, "Grace");
}

#[tokio::test]
async fn completion_happens_once_after_last_answer() {
    let fx = Fixture::new().await;
    let (survey_id, questions) = fx.survey(vec![colours(true), text("Why?", false)]).await;
    let responses = &fx.services.responses;
    let session = responses.start(&fx.author, survey_id).await.expect("session");

    responses
        .submit_answer(&fx.author, session.id, questions[0], "Blue")
        .await
        .expect("first answer");
    let midway = fx
        .repos
        .find_response(session.id)
        .await
        .expect("lookup")
        .expect("session exists");
    assert!(!midway.is_completed);

    responses
        .submit_answer(&fx.author, session.id, questions[1], "")
        .await
        .expect("empty optional answer");
    let done = responses
        .complete(&fx.author, session.id)
        .await
        .expect("completed");
    assert!(done.is_completed);
    assert!(done.completed_at.is_some());

    let again = responses.complete(&fx.author, session.id).await;
    assert!(matches!(again, Err(ServiceError::AlreadyCompleted)));

    let late = responses
        .submit_answer(&fx.author, session.id, questions[1], "late")
        .await;
    assert!(late.is_err());
}

#[tokio::test]
async fn completion_requires_required_answers() {
    let fx = Fixture::new().await;
    let (survey_id, _) = fx.survey(vec![text("Name?", true)]).await;
    let session = fx
        .services
        .responses
        .start(&fx.author, survey_id)
        .await
        .expect("session");

    let err = fx
        .services
        .responses
        .complete(&fx.author, session.id)
        .await
        .expect_err("missing answer");
    assert!(matches!(err, ServiceError::Domain(_)));
}

#[tokio::test]
async fn completed_count_follows_the_store() {
    let fx = Fixture::new().await;
    let (survey_id, questions) = fx.survey(vec![text("Name?", true)]).await;
    let responses = &fx.services.responses;

    assert_eq!(responses.completed_count().await.expect("count"), 0);

    for name in ["Ada", "Grace"] {
        let session = responses.start(&fx.author, survey_id).await.expect("session");
        responses
            .submit_answer(&fx.author, session.id, questions[0], name)
            .await
            .expect("answer");
        responses
            .complete(&fx.author, session.id)
            .await
            .expect("complete");
        let cached = responses.completed_count().await.expect("count");
        let stored = fx.repos.count_completed(None).await.expect("stored count");
        assert_eq!(cached, stored);
    }

    // An unfinished session does not count.
    responses.start(&fx.author, survey_id).await.expect("session");
    assert_eq!(responses.completed_count().await.expect("count"), 2);

    let stats = fx.services.stats.overview().await.expect("stats");
    assert_eq!(stats.completed_responses, 2);
    assert_eq!(stats.total_surveys, 1);
    assert_eq!(stats.active_surveys, 1);
    assert_eq!(stats.draft_surveys, 0);
}

#[tokio::test]
async fn wizard_fills_a_survey_through_the_services() {
    let fx = Fixture::new().await;
    let (survey_id, _) = fx
        .survey(vec![text("Name?", true), colours(true), text("Notes?", false)])
        .await;
    let respondent = principal(&fx.services, "respondent@example.com", UserRole::User).await;
    let driver = fx.services.wizard(respondent.clone());

    let mut wizard = driver.start(survey_id).await;
    assert_eq!(wizard.phase(), WizardPhase::AwaitingAnswer(0));
    assert_eq!(wizard.question_count(), 3);

    wizard.set_answer("Ada").expect("buffer");
    assert_eq!(
        driver.submit(&mut wizard).await.expect("saved"),
        WizardPhase::AwaitingAnswer(1)
    );

    wizard.go_back().expect("back");
    assert_eq!(wizard.answer_buffer(), "Ada");
    wizard.set_answer("Ada L.").expect("buffer");
    driver.submit(&mut wizard).await.expect("resaved");

    wizard.set_answer("Red").expect("buffer");
    driver.submit(&mut wizard).await.expect("saved");
    wizard.set_answer("").expect("buffer");
    assert_eq!(
        driver.submit(&mut wizard).await.expect("completed"),
        WizardPhase::Completed
    );

    let session_id = wizard.session_id().expect("session id");
    let detail = fx
        .services
        .responses
        .session(&respondent, session_id)
        .await
        .expect("detail");
    assert!(detail.response.is_completed);
    assert_eq!(detail.response.respondent_id, Some(respondent.user_id));
    assert_eq!(detail.answers.len(), 3);
    assert!(detail.answers.iter().any(|a| a.answer == "Ada L."));
    assert!(!detail.answers.iter().any(|a| a.answer == "Ada"));
}

/// Commits completion in the store but drops the first reply.
struct DroppedCompletionReply {
    inner: LocalGateway,
    dropped: AtomicBool,
}

#[async_trait]
impl SurveyGateway for DroppedCompletionReply {
    async fn start_session(&self, survey_id: Uuid) -> Result<Uuid, GatewayError> {
        self.inner.start_session(survey_id).await
    }

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey, GatewayError> {
        self.inner.load_survey(survey_id).await
    }

    async fn load_questions(&self, survey_id: Uuid) -> Result<Vec<Question>, GatewayError> {
        self.inner.load_questions(survey_id).await
    }

    async fn save_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<(), GatewayError> {
        self.inner.save_answer(session_id, question_id, answer).await
    }

    async fn complete_session(&self, session_id: Uuid) -> Result<(), GatewayError> {
        self.inner.complete_session(session_id).await?;
        if self.dropped.swap(true, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unavailable("reply lost".into()))
        }
    }
}

#[tokio::test]
async fn wizard_completes_after_a_lost_completion_reply() {
    let fx = Fixture::new().await;
    let (survey_id, _) = fx.survey(vec![text("Name?", true)]).await;
    let respondent = principal(&fx.services, "respondent@example.com", UserRole::User).await;
    let gateway = DroppedCompletionReply {
        inner: LocalGateway::new(
            fx.services.surveys.clone(),
            fx.services.questions.clone(),
            fx.services.responses.clone(),
            respondent.clone(),
        ),
        dropped: AtomicBool::new(false),
    };
    let driver = WizardDriver::new(Arc::new(gateway));

    let mut wizard = driver.start(survey_id).await;
    wizard.set_answer("Ada").expect("buffer");
    let err = driver.submit(&mut wizard).await.expect_err("reply lost");
    assert!(err.to_string().contains("reply lost"));
    assert_eq!(wizard.phase(), WizardPhase::AwaitingAnswer(0));

    let session_id = wizard.session_id().expect("session id");
    let stored = fx
        .services
        .responses
        .session(&respondent, session_id)
        .await
        .expect("detail");
    assert!(stored.response.is_completed);

    assert_eq!(
        driver.submit(&mut wizard).await.expect("recovered"),
        WizardPhase::Completed
    );
    assert_eq!(
        fx.services.responses.completed_count().await.expect("count"),
        1
    );
}

#[tokio::test]
async fn wizard_fails_on_inactive_survey() {
    let fx = Fixture::new().await;
    let (survey_id, _) = fx.survey(vec![text("Name?", true)]).await;
    fx.services
        .surveys
        .set_active(&fx.author, survey_id, false)
        .await
        .expect("deactivated");

    let wizard = fx.services.wizard(fx.author.clone()).start(survey_id).await;
    assert_eq!(wizard.phase(), WizardPhase::Failed);
    assert!(wizard.last_error().is_some());
}

#[tokio::test]
async fn survey_writes_are_visible_immediately() {
    let fx = Fixture::new().await;
    let surveys = &fx.services.surveys;

    assert!(surveys.list(Some(true)).await.expect("active").is_empty());
    assert!(surveys.list(None).await.expect("all").is_empty());

    let created = surveys
        .create(
            &fx.author,
            &SurveyCreateRequest {
                title: "Offsite".into(),
                description: None,
                is_active: Some(true),
            },
        )
        .await
        .expect("created");
    assert_eq!(surveys.list(Some(true)).await.expect("active").len(), 1);
    assert_eq!(surveys.list_owned(&fx.author).await.expect("mine").len(), 1);

    surveys
        .update(
            &fx.author,
            created.id,
            &SurveyUpdateRequest {
                is_active: Some(false),
                ..SurveyUpdateRequest::default()
            },
        )
        .await
        .expect("updated");
    assert!(surveys.list(Some(true)).await.expect("active").is_empty());
    assert_eq!(surveys.list(Some(false)).await.expect("inactive").len(), 1);
    assert!(!surveys.get(created.id).await.expect("by id").is_active);

    surveys.delete(&fx.author, created.id).await.expect("deleted");
    assert!(surveys.list(None).await.expect("all").is_empty());
    assert!(matches!(
        fx.services.questions.list(created.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn writes_behind_the_cache_show_up_after_ttl() {
    let fx = Fixture::new().await;
    let surveys = &fx.services.surveys;
    assert!(surveys.list(None).await.expect("all").is_empty());

    fx.repos
        .create_survey(CreateSurveyParams {
            title: "Backfilled".into(),
            description: None,
            is_active: true,
            created_by: fx.author.user_id,
        })
        .await
        .expect("direct insert");

    assert!(surveys.list(None).await.expect("still cached").is_empty());

    fx.clock.advance(Duration::from_secs(301));
    assert_eq!(surveys.list(None).await.expect("refreshed").len(), 1);
}

#[tokio::test]
async fn only_owner_may_delete_and_staff_may_manage() {
    let fx = Fixture::new().await;
    let (survey_id, _) = fx.survey(vec![text("Name?", true)]).await;
    let moderator = principal(&fx.services, "mod@example.com", UserRole::Moderator).await;
    let stranger = principal(&fx.services, "stranger@example.com", UserRole::User).await;

    let update = SurveyUpdateRequest {
        title: Some("Renamed".into()),
        ..SurveyUpdateRequest::default()
    };
    assert!(matches!(
        fx.services.surveys.update(&stranger, survey_id, &update).await,
        Err(ServiceError::Forbidden(_))
    ));
    let renamed = fx
        .services
        .surveys
        .update(&moderator, survey_id, &update)
        .await
        .expect("moderator may edit");
    assert_eq!(renamed.title, "Renamed");

    assert!(matches!(
        fx.services.surveys.delete(&moderator, survey_id).await,
        Err(ServiceError::Forbidden(_))
    ));
    fx.services
        .surveys
        .delete(&fx.author, survey_id)
        .await
        .expect("owner deletes");
}
