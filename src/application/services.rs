//! Wiring of every service over one repository backend and one query cache.

use std::sync::Arc;
use std::time::Duration;

use crate::application::access_tokens::AccessTokenService;
use crate::application::generation::{GenerationService, SurveyGenerator};
use crate::application::questions::QuestionService;
use crate::application::reads::CachedReads;
use crate::application::repos::{
    AccessTokensRepo, QuestionsRepo, ResponsesRepo, SurveysRepo, UsersRepo,
};
use crate::application::responses::ResponseService;
use crate::application::stats::StatsService;
use crate::application::surveys::SurveyService;
use crate::application::users::UserService;
use crate::application::wizard::{LocalGateway, WizardDriver};
use crate::cache::{CacheTrigger, QueryCache};
use crate::domain::permissions::Principal;

/// A backend implementing every repository trait.
pub trait Repositories:
    SurveysRepo + QuestionsRepo + ResponsesRepo + UsersRepo + AccessTokensRepo + 'static
{
}

impl<T> Repositories for T where
    T: SurveysRepo + QuestionsRepo + ResponsesRepo + UsersRepo + AccessTokensRepo + 'static
{
}

#[derive(Clone)]
pub struct Services {
    pub reads: CachedReads,
    pub trigger: CacheTrigger,
    pub surveys: SurveyService,
    pub questions: QuestionService,
    pub responses: ResponseService,
    pub users: UserService,
    pub tokens: AccessTokenService,
    pub stats: StatsService,
    pub generation: GenerationService,
    wizard_timeout: Duration,
}

impl Services {
    pub fn build<R: Repositories>(
        repos: Arc<R>,
        cache: Arc<QueryCache>,
        generator: Arc<dyn SurveyGenerator>,
        wizard_timeout: Duration,
    ) -> Self {
        let surveys: Arc<dyn SurveysRepo> = repos.clone();
        let questions: Arc<dyn QuestionsRepo> = repos.clone();
        let responses: Arc<dyn ResponsesRepo> = repos.clone();
        let users: Arc<dyn UsersRepo> = repos.clone();
        let tokens: Arc<dyn AccessTokensRepo> = repos;

        let trigger = CacheTrigger::new(cache.clone());
        let reads = CachedReads::new(
            cache,
            surveys.clone(),
            questions.clone(),
            responses.clone(),
            users.clone(),
        );

        Self {
            surveys: SurveyService::new(
                surveys.clone(),
                questions.clone(),
                reads.clone(),
                trigger.clone(),
            ),
            questions: QuestionService::new(
                surveys.clone(),
                questions.clone(),
                reads.clone(),
                trigger.clone(),
            ),
            responses: ResponseService::new(
                surveys,
                questions,
                responses,
                reads.clone(),
                trigger.clone(),
            ),
            users: UserService::new(users, reads.clone(), trigger.clone()),
            tokens: AccessTokenService::new(tokens, reads.clone()),
            stats: StatsService::new(reads.clone()),
            generation: GenerationService::new(generator),
            reads,
            trigger,
            wizard_timeout,
        }
    }

    /// A wizard driver filling surveys in-process as `principal`.
    pub fn wizard(&self, principal: Principal) -> WizardDriver {
        let gateway = LocalGateway::new(
            self.surveys.clone(),
            self.questions.clone(),
            self.responses.clone(),
            principal,
        );
        WizardDriver::new(Arc::new(gateway)).with_call_timeout(self.wizard_timeout)
    }
}
