use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::gateway::{GatewayError, SurveyGateway};
use super::state::{TransitionError, Wizard, WizardEffect, WizardPhase};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Runs wizard effects against a gateway, one call at a time.
#[derive(Clone)]
pub struct WizardDriver {
    gateway: Arc<dyn SurveyGateway>,
    call_timeout: Duration,
}

impl WizardDriver {
    pub fn new(gateway: Arc<dyn SurveyGateway>) -> Self {
        Self {
            gateway,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Opens a session and loads the survey.
    ///
    /// The returned wizard is either at the first question or `Failed`; a
    /// session created before a failed load stays in the store, incomplete.
    pub async fn start(&self, survey_id: Uuid) -> Wizard {
        let mut wizard = Wizard::new();

        let session_id = match self.bounded(self.gateway.start_session(survey_id)).await {
            Ok(id) => id,
            Err(err) => {
                warn!(target: "canvass::wizard", %survey_id, error = %err, "Session start failed");
                wizard.fail(err.to_string());
                return wizard;
            }
        };

        let loaded = tokio::try_join!(
            self.bounded(self.gateway.load_survey(survey_id)),
            self.bounded(self.gateway.load_questions(survey_id)),
        );
        match loaded {
            Ok((survey, questions)) => {
                if let Err(err) = wizard.initialized(session_id, survey, questions) {
                    warn!(target: "canvass::wizard", %session_id, error = %err, "Wizard not started");
                } else {
                    info!(
                        target: "canvass::wizard",
                        %session_id,
                        %survey_id,
                        questions = wizard.question_count(),
                        "Wizard started"
                    );
                }
            }
            Err(err) => {
                warn!(target: "canvass::wizard", %session_id, error = %err, "Survey load failed");
                wizard.fail(err.to_string());
            }
        }
        wizard
    }

    /// Submits the buffered answer for the current question.
    ///
    /// On success the wizard has advanced or completed. On a gateway failure
    /// it is back at the same question and the error is returned. Once the
    /// completion call has gone out, an "already completed" reply to any
    /// later call means the session was completed and the wizard finishes.
    pub async fn submit(&self, wizard: &mut Wizard) -> Result<WizardPhase, WizardError> {
        let mut effect = wizard.begin_submit()?;
        loop {
            let completing = matches!(effect, WizardEffect::CompleteSession { .. });
            match self.perform(&effect).await {
                Ok(()) if !completing => match wizard.answer_saved()? {
                    Some(next) => effect = next,
                    None => break,
                },
                Ok(()) => return Self::finish(wizard),
                Err(GatewayError::AlreadyCompleted)
                    if completing || wizard.completion_requested() =>
                {
                    return Self::finish(wizard);
                }
                Err(err) => {
                    wizard.submission_failed(err.to_string())?;
                    return Err(err.into());
                }
            }
        }
        Ok(wizard.phase())
    }

    fn finish(wizard: &mut Wizard) -> Result<WizardPhase, WizardError> {
        wizard.completion_succeeded()?;
        info!(
            target: "canvass::wizard",
            session_id = ?wizard.session_id(),
            "Survey response completed"
        );
        Ok(wizard.phase())
    }

    async fn perform(&self, effect: &WizardEffect) -> Result<(), GatewayError> {
        match effect {
            WizardEffect::SaveAnswer {
                session_id,
                question_id,
                index,
                answer,
            } => {
                debug!(target: "canvass::wizard", %session_id, index, "Saving answer");
                self.bounded(self.gateway.save_answer(*session_id, *question_id, answer))
                    .await
            }
            WizardEffect::CompleteSession { session_id } => {
                debug!(target: "canvass::wizard", %session_id, "Completing session");
                self.bounded(self.gateway.complete_session(*session_id))
                    .await
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(GatewayError::TimedOut(self.call_timeout)))
    }
}
