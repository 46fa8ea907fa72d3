#![deny(clippy::all, clippy::pedantic)]

//! Interactive survey filling on a line-oriented terminal.

use std::io::Write;
use std::sync::Arc;

use canvass::application::wizard::{
    TransitionError, Wizard, WizardDriver, WizardError, WizardPhase,
};
use canvass_api_types::{Question, QuestionType};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::client::{CliError, Ctx};
use crate::gateway::HttpGateway;

const BACK: &str = ":back";
const QUIT: &str = ":quit";
const CLEAR: &str = ":clear";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Completed,
    Abandoned,
}

pub async fn handle(ctx: &Ctx, survey_id: Uuid) -> Result<(), CliError> {
    let driver = WizardDriver::new(Arc::new(HttpGateway::new(ctx.clone())));
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    run(&driver, survey_id, input, &mut out).await.map(|_| ())
}

/// Drives one survey session from `input` until it completes or the user leaves.
pub async fn run<R, W>(
    driver: &WizardDriver,
    survey_id: Uuid,
    input: R,
    out: &mut W,
) -> Result<FillOutcome, CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut wizard = driver.start(survey_id).await;
    if wizard.phase() == WizardPhase::Failed {
        let reason = wizard.last_error().unwrap_or("survey could not be loaded");
        return Err(CliError::Server(reason.to_string()));
    }
    if let Some(survey) = wizard.survey() {
        writeln!(out, "{}", survey.title)?;
        if let Some(description) = &survey.description {
            writeln!(out, "{description}")?;
        }
        writeln!(
            out,
            "(type {BACK} to revisit the previous question, {CLEAR} to submit an empty answer, {QUIT} to stop)"
        )?;
    }

    let mut lines = input.lines();
    loop {
        let index = match wizard.phase() {
            WizardPhase::Completed => {
                writeln!(out, "Thank you, your response was recorded.")?;
                return Ok(FillOutcome::Completed);
            }
            WizardPhase::AwaitingAnswer(index) => index,
            other => {
                return Err(CliError::Server(format!("wizard stopped in phase {other:?}")));
            }
        };
        if let Some(question) = wizard.current_question() {
            render_question(out, &wizard, index, question)?;
        }

        let Some(line) = lines.next_line().await? else {
            writeln!(out, "Input closed; response left incomplete.")?;
            return Ok(FillOutcome::Abandoned);
        };
        let line = line.trim();

        match line {
            QUIT => {
                writeln!(out, "Response left incomplete.")?;
                return Ok(FillOutcome::Abandoned);
            }
            BACK => {
                if let Err(err) = wizard.go_back() {
                    writeln!(out, "{err}")?;
                }
                continue;
            }
            "" if !wizard.answer_buffer().is_empty() => {}
            CLEAR => {
                if let Err(err) = wizard.set_answer(String::new()) {
                    writeln!(out, "{err}")?;
                    continue;
                }
            }
            _ => {
                let answer = wizard
                    .current_question()
                    .map(|question| resolve_choice(question, line))
                    .unwrap_or_else(|| line.to_string());
                if let Err(err) = wizard.set_answer(answer) {
                    writeln!(out, "{err}")?;
                    continue;
                }
            }
        }

        match driver.submit(&mut wizard).await {
            Ok(_) => {}
            Err(WizardError::Transition(TransitionError::AnswerRequired { .. })) => {
                writeln!(out, "An answer is required.")?;
            }
            Err(WizardError::Gateway(err)) if err.is_transient() => {
                writeln!(out, "Could not save ({err}); press enter to retry.")?;
            }
            Err(err) => {
                writeln!(out, "Not saved: {err}")?;
            }
        }
    }
}

fn render_question<W: Write>(
    out: &mut W,
    wizard: &Wizard,
    index: usize,
    question: &Question,
) -> Result<(), CliError> {
    let (_, total) = wizard.progress();
    let marker = if question.is_required { " *" } else { "" };
    writeln!(out)?;
    writeln!(out, "[{}/{total}] {}{marker}", index + 1, question.question_text)?;
    match question.question_type {
        QuestionType::MultipleChoice => {
            for (position, option) in question.options.iter().flatten().enumerate() {
                writeln!(out, "  {}. {}", position + 1, option.text)?;
            }
        }
        QuestionType::Rating => writeln!(out, "  (1-5)")?,
        QuestionType::Text => {}
    }
    if !wizard.answer_buffer().is_empty() {
        writeln!(
            out,
            "  current: {} (enter to keep, {CLEAR} to empty)",
            wizard.answer_buffer()
        )?;
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

/// Maps an option number to its text for multiple-choice questions.
fn resolve_choice(question: &Question, input: &str) -> String {
    if question.question_type != QuestionType::MultipleChoice {
        return input.to_string();
    }
    let options = question.options.as_deref().unwrap_or_default();
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .map_or_else(|| input.to_string(), |option| option.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_api_types::QuestionOption;
    use time::OffsetDateTime;

    fn choice_question() -> Question {
        Question {
            id: Uuid::new_v4(),
            survey_id: Uuid::new_v4(),
            question_text: "Pick one".into(),
            question_type: QuestionType::MultipleChoice,
            order_index: 0,
            is_required: true,
            options: Some(vec![
                QuestionOption {
                    id: "a".into(),
                    text: "Red".into(),
                },
                QuestionOption {
                    id: "b".into(),
                    text: "Blue".into(),
                },
            ]),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn numbers_select_options() {
        let question = choice_question();
        assert_eq!(resolve_choice(&question, "2"), "Blue");
        assert_eq!(resolve_choice(&question, "Red"), "Red");
        assert_eq!(resolve_choice(&question, "0"), "0");
        assert_eq!(resolve_choice(&question, "9"), "9");
    }

    #[test]
    fn text_questions_keep_input() {
        let mut question = choice_question();
        question.question_type = QuestionType::Text;
        question.options = None;
        assert_eq!(resolve_choice(&question, "1"), "1");
    }
}
