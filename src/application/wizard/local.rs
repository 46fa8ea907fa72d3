use async_trait::async_trait;
use canvass_api_types::{Question, Survey};
use uuid::Uuid;

use super::gateway::{GatewayError, SurveyGateway};
use crate::application::questions::QuestionService;
use crate::application::responses::ResponseService;
use crate::application::surveys::SurveyService;
use crate::domain::permissions::Principal;

/// Gateway over the in-process services, acting as one principal.
#[derive(Clone)]
pub struct LocalGateway {
    surveys: SurveyService,
    questions: QuestionService,
    responses: ResponseService,
    principal: Principal,
}

impl LocalGateway {
    pub fn new(
        surveys: SurveyService,
        questions: QuestionService,
        responses: ResponseService,
        principal: Principal,
    ) -> Self {
        Self {
            surveys,
            questions,
            responses,
            principal,
        }
    }
}

#[async_trait]
impl SurveyGateway for LocalGateway {
    async fn start_session(&self, survey_id: Uuid) -> Result<Uuid, GatewayError> {
        let session = self.responses.start(&self.principal, survey_id).await?;
        Ok(session.id)
    }

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey, GatewayError> {
        Ok(self.surveys.get(survey_id).await?.into())
    }

    async fn load_questions(&self, survey_id: Uuid) -> Result<Vec<Question>, GatewayError> {
        let questions = self.questions.list(survey_id).await?;
        Ok(questions.into_iter().map(Question::from).collect())
    }

    async fn save_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<(), GatewayError> {
        self.responses
            .submit_answer(&self.principal, session_id, question_id, answer)
            .await?;
        Ok(())
    }

    async fn complete_session(&self, session_id: Uuid) -> Result<(), GatewayError> {
        self.responses.complete(&self.principal, session_id).await?;
        Ok(())
    }
}
