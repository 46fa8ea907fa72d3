//! Question authoring and ordered listing.

use std::sync::Arc;

use canvass_api_types::{QuestionCreateRequest, QuestionDraft};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::reads::CachedReads;
use crate::application::repos::{CreateQuestionParams, QuestionsRepo, SurveysRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::QuestionRecord;
use crate::domain::permissions::Principal;
use crate::domain::questions::{
    duplicate_order_indices, next_order_index, normalize_options, normalize_text,
    validate_order_index,
};
use crate::domain::types::{QuestionOption, QuestionType};

/// Validated question content, ready to be stored at some position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub is_required: bool,
    pub options: Option<Vec<QuestionOption>>,
}

impl PreparedQuestion {
    pub(crate) fn from_draft(draft: &QuestionDraft) -> Result<Self, ServiceError> {
        Ok(Self {
            question_text: normalize_text(&draft.question_text)?,
            question_type: draft.question_type,
            is_required: draft.is_required,
            options: normalize_options(draft.question_type, draft.options.as_deref())?,
        })
    }
}

#[derive(Clone)]
pub struct QuestionService {
    surveys: Arc<dyn SurveysRepo>,
    questions: Arc<dyn QuestionsRepo>,
    reads: CachedReads,
    trigger: CacheTrigger,
}

impl QuestionService {
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

    /// Questions of a survey sorted by order index, then creation time, then id.
    pub async fn list(&self, survey_id: Uuid) -> Result<Vec<QuestionRecord>, ServiceError> {
        if self.reads.survey(survey_id).await?.is_none() {
            return Err(ServiceError::NotFound("survey"));
        }
        Ok(self.reads.questions(survey_id).await?)
    }

    #[instrument(skip(self, principal, request), fields(user_id = %principal.user_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        survey_id: Uuid,
        request: &QuestionCreateRequest,
    ) -> Result<QuestionRecord, ServiceError> {
        let survey = self
            .surveys
            .find_survey(survey_id)
            .await?
            .ok_or(ServiceError::NotFound("survey"))?;
        if !principal.can_manage(&survey) {
            return Err(ServiceError::Forbidden("add questions to this survey"));
        }

        let question_text = normalize_text(&request.question_text)?;
        let options = normalize_options(request.question_type, request.options.as_deref())?;

        let existing = self.questions.list_questions(survey_id).await?;
        let order_index = match request.order_index {
            Some(index) => validate_order_index(index)?,
            None => next_order_index(&existing),
        };

        let question = self
            .questions
            .create_question(CreateQuestionParams {
                survey_id,
                question_text,
                question_type: request.question_type,
                order_index,
                is_required: request.is_required,
                options,
            })
            .await?;
        self.trigger.question_created(survey_id);

        if existing.iter().any(|q| q.order_index == order_index) {
            let mut all = existing;
            all.push(question.clone());
            warn!(
                target: "canvass::questions",
                survey_id = %survey_id,
                duplicates = ?duplicate_order_indices(&all),
                "Survey has questions sharing an order index; display order falls back to creation time"
            );
        }

        Ok(question)
    }
}
