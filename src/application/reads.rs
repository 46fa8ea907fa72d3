//! Cached read paths shared by the services.
//!
//! Every method wraps one repository query in [`QueryCache::cached`], so the
//! tags and TTL come from the [`QueryKey`] and cannot drift between callers.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::repos::{
    QuestionsRepo, RepoError, ResponsesRepo, SurveyFilter, SurveysRepo, UsersRepo,
};
use crate::cache::{QueryCache, QueryKey};
use crate::domain::entities::{QuestionRecord, SurveyRecord, SurveyResponseRecord, UserRecord};
use crate::domain::questions::sort_for_display;

#[derive(Clone)]
pub struct CachedReads {
    cache: Arc<QueryCache>,
    surveys: Arc<dyn SurveysRepo>,
    questions: Arc<dyn QuestionsRepo>,
    responses: Arc<dyn ResponsesRepo>,
    users: Arc<dyn UsersRepo>,
}

impl CachedReads {
    pub fn new(
        cache: Arc<QueryCache>,
        surveys: Arc<dyn SurveysRepo>,
        questions: Arc<dyn QuestionsRepo>,
        responses: Arc<dyn ResponsesRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            cache,
            surveys,
            questions,
            responses,
            users,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn all_surveys(&self) -> Result<Vec<SurveyRecord>, RepoError> {
        self.cache
            .cached(QueryKey::AllSurveys, || {
                self.surveys.list_surveys(SurveyFilter::default())
            })
            .await
    }

    pub async fn surveys_by_active(&self, is_active: bool) -> Result<Vec<SurveyRecord>, RepoError> {
        self.cache
            .cached(QueryKey::SurveysByActive(is_active), || {
                self.surveys.list_surveys(SurveyFilter {
                    is_active: Some(is_active),
                    created_by: None,
                })
            })
            .await
    }

    pub async fn surveys_by_owner(&self, owner_id: Uuid) -> Result<Vec<SurveyRecord>, RepoError> {
        self.cache
            .cached(QueryKey::SurveysByOwner(owner_id), || {
                self.surveys.list_surveys(SurveyFilter {
                    is_active: None,
                    created_by: Some(owner_id),
                })
            })
            .await
    }

    pub async fn survey(&self, id: Uuid) -> Result<Option<SurveyRecord>, RepoError> {
        self.cache
            .cached(QueryKey::SurveyById(id), || self.surveys.find_survey(id))
            .await
    }

    /// Questions in display order.
    pub async fn questions(&self, survey_id: Uuid) -> Result<Vec<QuestionRecord>, RepoError> {
        self.cache
            .cached(QueryKey::QuestionsBySurvey(survey_id), || async move {
                let mut questions = self.questions.list_questions(survey_id).await?;
                sort_for_display(&mut questions);
                Ok(questions)
            })
            .await
    }

    pub async fn responses(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<SurveyResponseRecord>, RepoError> {
        self.cache
            .cached(QueryKey::ResponsesBySurvey(survey_id), || {
                self.responses.list_responses(survey_id)
            })
            .await
    }

    pub async fn completed_count(&self) -> Result<u64, RepoError> {
        self.cache
            .cached(QueryKey::CompletedResponseCount, || {
                self.responses.count_completed(None)
            })
            .await
    }

    pub async fn user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        self.cache
            .cached(QueryKey::UserById(id), || self.users.find_user(id))
            .await
    }
}
