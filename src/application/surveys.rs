//! Survey lifecycle: listing, authoring, publication and deletion.

use std::sync::Arc;

use canvass_api_types::{SurveyCreateRequest, SurveyDraft, SurveyUpdateRequest};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::questions::PreparedQuestion;
use crate::application::reads::CachedReads;
use crate::application::repos::{
    CreateQuestionParams, CreateSurveyParams, QuestionsRepo, SurveysRepo, UpdateSurveyParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::{QuestionRecord, SurveyRecord};
use crate::domain::permissions::Principal;
use crate::domain::surveys::{normalize_description, normalize_title};

/// Upper bound on questions accepted in one draft.
pub const MAX_DRAFT_QUESTIONS: usize = 100;

#[derive(Clone)]
pub struct SurveyService {
    surveys: Arc<dyn SurveysRepo>,
    questions: Arc<dyn QuestionsRepo>,
    reads: CachedReads,
    trigger: CacheTrigger,
}

impl SurveyService {
    pub fn new(
        surveys: Arc<dyn SurveysRepo>,
        questions: Arc<dyn QuestionsRepo>,
        reads: CachedReads,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            surveys,
            questions,
            reads,
            trigger,
        }
    }

    pub async fn list(&self, is_active: Option<bool>) -> Result<Vec<SurveyRecord>, ServiceError> {
        let surveys = match is_active {
            Some(flag) => self.reads.surveys_by_active(flag).await?,
            None => self.reads.all_surveys().await?,
        };
        Ok(surveys)
    }

    pub async fn list_owned(&self, principal: &Principal) -> Result<Vec<SurveyRecord>, ServiceError> {
        Ok(self.reads.surveys_by_owner(principal.user_id).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<SurveyRecord, ServiceError> {
        self.reads
            .survey(id)
            .await?
            .ok_or(ServiceError::NotFound("survey"))
    }

    #[instrument(skip(self, principal, request), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        request: &SurveyCreateRequest,
    ) -> Result<SurveyRecord, ServiceError> {
        let params = CreateSurveyParams {
            title: normalize_title(&request.title)?,
            description: normalize_description(request.description.as_deref())?,
            is_active: request.is_active.unwrap_or(true),
            created_by: principal.user_id,
        };

        let survey = self.surveys.create_survey(params).await?;
        self.trigger.survey_created(survey.id, survey.created_by);
        info!(target: "canvass::surveys", survey_id = %survey.id, "Survey created");
        Ok(survey)
    }

    #[instrument(skip(self, principal, request), fields(user_id = %principal.user_id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        request: &SurveyUpdateRequest,
    ) -> Result<SurveyRecord, ServiceError> {
        let current = self.load_fresh(id).await?;
        if !principal.can_manage(&current) {
            return Err(ServiceError::Forbidden("update this survey"));
        }

        let title = match request.title.as_deref() {
            Some(title) => normalize_title(title)?,
            None => current.title.clone(),
        };
        let description = match &request.description {
            Some(description) => normalize_description(description.as_deref())?,
            None => current.description.clone(),
        };

        let survey = self
            .surveys
            .update_survey(UpdateSurveyParams {
                id,
                title,
                description,
                is_active: request.is_active.unwrap_or(current.is_active),
            })
            .await?;
        self.trigger.survey_updated(survey.id, survey.created_by);
        Ok(survey)
    }

    pub async fn set_active(
        &self,
        principal: &Principal,
        id: Uuid,
        is_active: bool,
    ) -> Result<SurveyRecord, ServiceError> {
        let request = SurveyUpdateRequest {
            is_active: Some(is_active),
            ..SurveyUpdateRequest::default()
        };
        self.update(principal, id, &request).await
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ServiceError> {
        let current = self.load_fresh(id).await?;
        if !principal.can_delete(&current) {
            return Err(ServiceError::Forbidden("delete this survey"));
        }

        self.surveys.delete_survey(id).await?;
        self.trigger.survey_deleted(id, current.created_by);
        info!(target: "canvass::surveys", survey_id = %id, "Survey deleted");
        Ok(())
    }

    /// Creates a survey and its questions in draft order.
    ///
    /// Everything is validated before the first write. If a question insert
    /// fails the survey is removed again.
    #[instrument(skip(self, principal, draft), fields(user_id = %principal.user_id))]
    pub async fn create_from_draft(
        &self,
        principal: &Principal,
        draft: &SurveyDraft,
        is_active: bool,
    ) -> Result<(SurveyRecord, Vec<QuestionRecord>), ServiceError> {
        let title = normalize_title(&draft.title)?;
        let description = normalize_description(draft.description.as_deref())?;
        if draft.questions.is_empty() {
            return Err(ServiceError::validation(
                "questions",
                "a survey needs at least one question",
            ));
        }
        if draft.questions.len() > MAX_DRAFT_QUESTIONS {
            return Err(ServiceError::validation(
                "questions",
                format!("at most {MAX_DRAFT_QUESTIONS} questions are allowed"),
            ));
        }
        let prepared = draft
            .questions
            .iter()
            .map(PreparedQuestion::from_draft)
            .collect::<Result<Vec<_>, _>>()?;

        let survey = self
            .surveys
            .create_survey(CreateSurveyParams {
                title,
                description,
                is_active,
                created_by: principal.user_id,
            })
            .await?;

        let mut questions = Vec::with_capacity(prepared.len());
        for (position, question) in prepared.into_iter().enumerate() {
            let params = CreateQuestionParams {
                survey_id: survey.id,
                question_text: question.question_text,
                question_type: question.question_type,
                order_index: i32::try_from(position).unwrap_or(i32::MAX),
                is_required: question.is_required,
                options: question.options,
            };
            match self.questions.create_question(params).await {
                Ok(record) => questions.push(record),
                Err(err) => {
                    warn!(
                        target: "canvass::surveys",
                        survey_id = %survey.id,
                        position,
                        error = %err,
                        "Question insert failed, removing partially created survey"
                    );
                    if let Err(cleanup) = self.surveys.delete_survey(survey.id).await {
                        warn!(
                            target: "canvass::surveys",
                            survey_id = %survey.id,
                            error = %cleanup,
                            "Failed to remove partially created survey"
                        );
                    }
                    self.trigger.survey_deleted(survey.id, survey.created_by);
                    return Err(err.into());
                }
            }
        }

        self.trigger.survey_created(survey.id, survey.created_by);
        self.trigger.question_created(survey.id);
        info!(
            target: "canvass::surveys",
            survey_id = %survey.id,
            questions = questions.len(),
            "Survey created from draft"
        );
        Ok((survey, questions))
    }

    /// Authorization decisions read the store directly, not the cache.
    async fn load_fresh(&self, id: Uuid) -> Result<SurveyRecord, ServiceError> {
        self.surveys
            .find_survey(id)
            .await?
            .ok_or(ServiceError::NotFound("survey"))
    }
}
