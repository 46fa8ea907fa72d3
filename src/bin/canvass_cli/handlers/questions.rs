#![deny(clippy::all, clippy::pedantic)]

use canvass_api_types::{OptionDraft, Question, QuestionCreateRequest};
use reqwest::Method;

use crate::args::QuestionsCmd;
use crate::client::{CliError, Ctx};
use crate::io::to_value;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: QuestionsCmd) -> Result<(), CliError> {
    match cmd {
        QuestionsCmd::Add {
            survey_id,
            text,
            kind,
            order_index,
            optional,
            options,
        } => {
            let options = if options.is_empty() {
                None
            } else {
                Some(
                    options
                        .into_iter()
                        .map(|text| OptionDraft { id: None, text })
                        .collect(),
                )
            };
            let payload = QuestionCreateRequest {
                question_text: text,
                question_type: kind.into(),
                order_index,
                is_required: !optional,
                options,
            };
            let res: Question = ctx
                .request(
                    Method::POST,
                    &format!("api/v1/surveys/{survey_id}/questions"),
                    None,
                    Some(to_value(payload)?),
                )
                .await?;
            print_json(&res)
        }
    }
}
