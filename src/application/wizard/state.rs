//! The survey-filling state machine as a plain value.
//!
//! Transitions never perform I/O. Those that need the store return a
//! [`WizardEffect`] describing the call; the driver performs it and feeds the
//! outcome back through [`Wizard::answer_saved`], [`Wizard::completion_succeeded`]
//! or [`Wizard::submission_failed`].

use std::collections::HashMap;

use canvass_api_types::{Question, Survey};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Initializing,
    AwaitingAnswer(usize),
    Submitting(usize),
    Completed,
    Failed,
}

impl WizardPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A store call requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEffect {
    SaveAnswer {
        session_id: Uuid,
        question_id: Uuid,
        index: usize,
        answer: String,
    },
    CompleteSession {
        session_id: Uuid,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("wizard is {0:?}, not awaiting an answer")]
    NotAwaitingAnswer(WizardPhase),
    #[error("wizard is {0:?}, not submitting")]
    NotSubmitting(WizardPhase),
    #[error("wizard is {0:?}, not initializing")]
    NotInitializing(WizardPhase),
    #[error("question {} is required", .index + 1)]
    AnswerRequired { index: usize },
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("survey has no questions")]
    NoQuestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitStep {
    Saving,
    Completing,
}

#[derive(Debug, Clone, PartialEq)]
struct Session {
    id: Uuid,
    survey: Survey,
    questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wizard {
    phase: WizardPhase,
    session: Option<Session>,
    buffer: String,
    recorded: HashMap<usize, String>,
    pending: Option<(String, SubmitStep)>,
    /// Set once the completion call has been issued; the store may already
    /// hold the session as completed even if no reply arrived.
    completion_requested: bool,
    last_error: Option<String>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            phase: WizardPhase::Initializing,
            session: None,
            buffer: String::new(),
            recorded: HashMap::new(),
            pending: None,
            completion_requested: false,
            last_error: None,
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn survey(&self) -> Option<&Survey> {
        self.session.as_ref().map(|session| &session.survey)
    }

    pub fn questions(&self) -> &[Question] {
        self.session
            .as_ref()
            .map(|session| session.questions.as_slice())
            .unwrap_or_default()
    }

    pub fn question_count(&self) -> usize {
        self.questions().len()
    }

    /// The question being answered or submitted.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            WizardPhase::AwaitingAnswer(index) | WizardPhase::Submitting(index) => {
                self.questions().get(index)
            }
            _ => None,
        }
    }

    pub fn answer_buffer(&self) -> &str {
        &self.buffer
    }

    /// Answer last saved for the question at `index` in this session.
    pub fn recorded_answer(&self, index: usize) -> Option<&str> {
        self.recorded.get(&index).map(String::as_str)
    }

    /// Whether a completion call went out without a confirmed reply.
    pub fn completion_requested(&self) -> bool {
        self.completion_requested && self.phase != WizardPhase::Completed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `(questions saved, total questions)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.recorded.len(), self.question_count())
    }

    /// Session and questions loaded; moves to the first question.
    pub fn initialized(
        &mut self,
        session_id: Uuid,
        survey: Survey,
        questions: Vec<Question>,
    ) -> Result<(), TransitionError> {
        if self.phase != WizardPhase::Initializing {
            return Err(TransitionError::NotInitializing(self.phase));
        }
        if questions.is_empty() {
            self.fail(TransitionError::NoQuestions.to_string());
            return Err(TransitionError::NoQuestions);
        }
        self.session = Some(Session {
            id: session_id,
            survey,
            questions,
        });
        self.phase = WizardPhase::AwaitingAnswer(0);
        Ok(())
    }

    /// Initialization could not finish. Terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = WizardPhase::Failed;
        self.pending = None;
        self.last_error = Some(message.into());
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) -> Result<(), TransitionError> {
        match self.phase {
            WizardPhase::AwaitingAnswer(_) => {
                self.buffer = answer.into();
                Ok(())
            }
            phase => Err(TransitionError::NotAwaitingAnswer(phase)),
        }
    }

    /// Starts the forward transition for the current question.
    ///
    /// A required question with a blank buffer is rejected here and the
    /// phase is left untouched. Resubmitting the last answer unchanged after
    /// a completion call went unanswered asks for completion again instead
    /// of saving.
    pub fn begin_submit(&mut self) -> Result<WizardEffect, TransitionError> {
        let WizardPhase::AwaitingAnswer(index) = self.phase else {
            return Err(TransitionError::NotAwaitingAnswer(self.phase));
        };
        let (session_id, question_id, required) = match &self.session {
            Some(session) => {
                let question = &session.questions[index];
                (session.id, question.id, question.is_required)
            }
            None => return Err(TransitionError::NotAwaitingAnswer(self.phase)),
        };

        let answer = self.buffer.trim().to_string();
        if required && answer.is_empty() {
            return Err(TransitionError::AnswerRequired { index });
        }

        self.phase = WizardPhase::Submitting(index);
        self.last_error = None;
        let is_last = index + 1 == self.question_count();
        if self.completion_requested
            && is_last
            && self.recorded_answer(index) == Some(answer.as_str())
        {
            self.pending = Some((answer, SubmitStep::Completing));
            return Ok(WizardEffect::CompleteSession { session_id });
        }
        self.pending = Some((answer.clone(), SubmitStep::Saving));
        Ok(WizardEffect::SaveAnswer {
            session_id,
            question_id,
            index,
            answer,
        })
    }

    /// The answer for the submitting question was stored.
    ///
    /// Returns the completion call when that question was the last one;
    /// otherwise advances to the next question.
    pub fn answer_saved(&mut self) -> Result<Option<WizardEffect>, TransitionError> {
        let index = match (self.phase, &self.pending) {
            (WizardPhase::Submitting(index), Some((_, SubmitStep::Saving))) => index,
            (phase, _) => return Err(TransitionError::NotSubmitting(phase)),
        };
        let (answer, _) = self
            .pending
            .take()
            .ok_or(TransitionError::NotSubmitting(self.phase))?;
        self.recorded.insert(index, answer.clone());

        let total = self.question_count();
        if index + 1 < total {
            self.move_to(index + 1);
            return Ok(None);
        }

        let session_id = self
            .session_id()
            .ok_or(TransitionError::NotSubmitting(self.phase))?;
        self.pending = Some((answer, SubmitStep::Completing));
        self.completion_requested = true;
        Ok(Some(WizardEffect::CompleteSession { session_id }))
    }

    /// The session is completed in the store.
    ///
    /// Accepted while the completion call is in flight, or during any later
    /// submission once completion has been requested, since the store then
    /// rejects further writes to the session.
    pub fn completion_succeeded(&mut self) -> Result<(), TransitionError> {
        let completing = matches!(self.pending, Some((_, SubmitStep::Completing)));
        match self.phase {
            WizardPhase::Submitting(_) if completing || self.completion_requested => {
                self.pending = None;
                self.buffer.clear();
                self.phase = WizardPhase::Completed;
                Ok(())
            }
            phase => Err(TransitionError::NotSubmitting(phase)),
        }
    }

    /// A save or completion call failed. Returns to the same question with
    /// the submitted text still in the buffer.
    pub fn submission_failed(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        let WizardPhase::Submitting(index) = self.phase else {
            return Err(TransitionError::NotSubmitting(self.phase));
        };
        if let Some((answer, _)) = self.pending.take() {
            self.buffer = answer;
        }
        self.phase = WizardPhase::AwaitingAnswer(index);
        self.last_error = Some(message.into());
        Ok(())
    }

    /// Moves to the previous question without submitting anything.
    pub fn go_back(&mut self) -> Result<(), TransitionError> {
        match self.phase {
            WizardPhase::AwaitingAnswer(0) => Err(TransitionError::AtFirstQuestion),
            WizardPhase::AwaitingAnswer(index) => {
                self.move_to(index - 1);
                Ok(())
            }
            phase => Err(TransitionError::NotAwaitingAnswer(phase)),
        }
    }

    fn move_to(&mut self, index: usize) {
        self.phase = WizardPhase::AwaitingAnswer(index);
        self.buffer = self.recorded.get(&index).cloned().unwrap_or_default();
        self.last_error = None;
    }
}
