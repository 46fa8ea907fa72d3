//! Response sessions: start, per-question answers and completion.

use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::reads::CachedReads;
use crate::application::repos::{
    CompletionOutcome, QuestionsRepo, ResponsesRepo, SurveysRepo, UpsertAnswerParams,
};
use crate::cache::CacheTrigger;
use crate::domain::answers::normalize_answer;
use crate::domain::entities::{QuestionResponseRecord, SurveyRecord, SurveyResponseRecord};
use crate::domain::permissions::Principal;

#[derive(Clone)]
pub struct ResponseService {
    surveys: Arc<dyn SurveysRepo>,
    questions: Arc<dyn QuestionsRepo>,
    responses: Arc<dyn ResponsesRepo>,
    reads: CachedReads,
    trigger: CacheTrigger,
}

/// A session together with the answers recorded so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDetail {
    pub response: SurveyResponseRecord,
    pub answers: Vec<QuestionResponseRecord>,
}

impl ResponseService {
    pub fn new(
        surveys: Arc<dyn SurveysRepo>,
        questions: Arc<dyn QuestionsRepo>,
        responses: Arc<dyn ResponsesRepo>,
        reads: CachedReads,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            surveys,
            questions,
            responses,
            reads,
            trigger,
        }
    }

    /// Opens a session for an active survey.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn start(
        &self,
        principal: &Principal,
        survey_id: Uuid,
    ) -> Result<SurveyResponseRecord, ServiceError> {
        let survey = self
            .surveys
            .find_survey(survey_id)
            .await?
            .filter(|survey| survey.is_active)
            .ok_or(ServiceError::NotFound("active survey"))?;

        let response = self
            .responses
            .create_response(survey.id, Some(principal.user_id), OffsetDateTime::now_utc())
            .await?;
        self.trigger.response_started(survey.id);
        info!(
            target: "canvass::responses",
            response_id = %response.id,
            survey_id = %survey.id,
            "Response session started"
        );
        Ok(response)
    }

    /// Stores the answer for one question, replacing any earlier answer.
    #[instrument(skip(self, principal, answer), fields(user_id = %principal.user_id))]
    pub async fn submit_answer(
        &self,
        principal: &Principal,
        response_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<QuestionResponseRecord, ServiceError> {
        let session = self.open_session(principal, response_id).await?;

        let question = self
            .questions
            .find_question(question_id)
            .await?
            .filter(|question| question.survey_id == session.survey_id)
            .ok_or(ServiceError::NotFound("question"))?;
        let answer = normalize_answer(&question, answer)?;

        let record = self
            .responses
            .upsert_answer(UpsertAnswerParams {
                survey_response_id: session.id,
                question_id: question.id,
                answer,
                answered_at: OffsetDateTime::now_utc(),
            })
            .await?;
        self.trigger.answer_submitted(session.survey_id);
        Ok(record)
    }

    /// Marks the session completed. Succeeds at most once per session.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn complete(
        &self,
        principal: &Principal,
        response_id: Uuid,
    ) -> Result<SurveyResponseRecord, ServiceError> {
        let session = self.open_session(principal, response_id).await?;

        let questions = self.questions.list_questions(session.survey_id).await?;
        let answers = self.responses.list_answers(session.id).await?;
        let answered: HashSet<Uuid> = answers
            .iter()
            .filter(|answer| !answer.answer.is_empty())
            .map(|answer| answer.question_id)
            .collect();
        let missing = questions
            .iter()
            .filter(|question| question.is_required && !answered.contains(&question.id))
            .count();
        if missing > 0 {
            return Err(ServiceError::validation(
                "answers",
                format!("{missing} required question(s) still unanswered"),
            ));
        }

        match self
            .responses
            .complete_response(session.id, OffsetDateTime::now_utc())
            .await?
        {
            CompletionOutcome::Completed(response) => {
                self.trigger.response_completed(response.survey_id);
                info!(
                    target: "canvass::responses",
                    response_id = %response.id,
                    survey_id = %response.survey_id,
                    "Response session completed"
                );
                Ok(response)
            }
            CompletionOutcome::AlreadyCompleted(_) => Err(ServiceError::AlreadyCompleted),
            CompletionOutcome::Missing => Err(ServiceError::NotFound("survey response")),
        }
    }

    /// Sessions of a survey, optionally filtered by completion.
    pub async fn list_for_survey(
        &self,
        principal: &Principal,
        survey_id: Uuid,
        is_completed: Option<bool>,
    ) -> Result<Vec<SurveyResponseRecord>, ServiceError> {
        let survey = self.require_survey(survey_id).await?;
        if !principal.can_view_responses(&survey) {
            return Err(ServiceError::Forbidden("view responses of this survey"));
        }

        let mut responses = self.reads.responses(survey_id).await?;
        if let Some(flag) = is_completed {
            responses.retain(|response| response.is_completed == flag);
        }
        Ok(responses)
    }

    pub async fn session(
        &self,
        principal: &Principal,
        response_id: Uuid,
    ) -> Result<SessionDetail, ServiceError> {
        let response = self
            .responses
            .find_response(response_id)
            .await?
            .ok_or(ServiceError::NotFound("survey response"))?;
        let survey = self.require_survey(response.survey_id).await?;
        if !principal.can_view_session(&response, &survey) {
            return Err(ServiceError::Forbidden("view this survey response"));
        }
        let answers = self.responses.list_answers(response.id).await?;
        Ok(SessionDetail { response, answers })
    }

    pub async fn completed_count(&self) -> Result<u64, ServiceError> {
        Ok(self.reads.completed_count().await?)
    }

    /// Loads a session the principal may still write to.
    async fn open_session(
        &self,
        principal: &Principal,
        response_id: Uuid,
    ) -> Result<SurveyResponseRecord, ServiceError> {
        let session = self
            .responses
            .find_response(response_id)
            .await?
            .ok_or(ServiceError::NotFound("survey response"))?;
        if !principal.can_answer(&session) {
            return Err(ServiceError::Forbidden("answer in this session"));
        }
        if session.is_completed {
            return Err(ServiceError::AlreadyCompleted);
        }
        Ok(session)
    }

    async fn require_survey(&self, survey_id: Uuid) -> Result<SurveyRecord, ServiceError> {
        self.reads
            .survey(survey_id)
            .await?
            .ok_or(ServiceError::NotFound("survey"))
    }
}
