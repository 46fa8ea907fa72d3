#![deny(clippy::all, clippy::pedantic)]

//! Wizard store operations over the HTTP API.

use async_trait::async_trait;
use canvass::application::wizard::{GatewayError, SurveyGateway};
use canvass_api_types::{AnswerRequest, ListResponse, Question, Survey, SurveyResponse};
use reqwest::{Method, StatusCode};
use uuid::Uuid;

use crate::client::{CliError, Ctx};
use crate::io::to_value;

const ALREADY_COMPLETED_CODE: &str = "already_completed";

pub struct HttpGateway {
    ctx: Ctx,
}

impl HttpGateway {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl SurveyGateway for HttpGateway {
    async fn start_session(&self, survey_id: Uuid) -> Result<Uuid, GatewayError> {
        let response: SurveyResponse = self
            .ctx
            .request(
                Method::POST,
                &format!("api/v1/surveys/{survey_id}/responses"),
                None,
                None,
            )
            .await
            .map_err(classify)?;
        Ok(response.id)
    }

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey, GatewayError> {
        self.ctx
            .request(
                Method::GET,
                &format!("api/v1/surveys/{survey_id}"),
                None,
                None,
            )
            .await
            .map_err(classify)
    }

    async fn load_questions(&self, survey_id: Uuid) -> Result<Vec<Question>, GatewayError> {
        let list: ListResponse<Question> = self
            .ctx
            .request(
                Method::GET,
                &format!("api/v1/surveys/{survey_id}/questions"),
                None,
                None,
            )
            .await
            .map_err(classify)?;
        Ok(list.items)
    }

    async fn save_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<(), GatewayError> {
        let body = to_value(AnswerRequest {
            answer: answer.to_string(),
        })
        .map_err(classify)?;
        self.ctx
            .request_unit(
                Method::PUT,
                &format!("api/v1/responses/{session_id}/answers/{question_id}"),
                Some(body),
            )
            .await
            .map_err(classify)
    }

    async fn complete_session(&self, session_id: Uuid) -> Result<(), GatewayError> {
        self.ctx
            .request_unit(
                Method::POST,
                &format!("api/v1/responses/{session_id}/complete"),
                None,
            )
            .await
            .map_err(classify)
    }
}

fn classify(err: CliError) -> GatewayError {
    match err {
        CliError::Api {
            status,
            code,
            message,
        } => match status {
            StatusCode::CONFLICT if code == ALREADY_COMPLETED_CODE => GatewayError::AlreadyCompleted,
            StatusCode::NOT_FOUND => GatewayError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Denied(message),
            StatusCode::TOO_MANY_REQUESTS => GatewayError::Unavailable(message),
            s if s.is_server_error() => GatewayError::Unavailable(message),
            _ => GatewayError::Invalid(message),
        },
        CliError::Http(err) => GatewayError::Unavailable(err.to_string()),
        CliError::Server(message) => GatewayError::Unavailable(message),
        other => GatewayError::Invalid(other.to_string()),
    }
}
