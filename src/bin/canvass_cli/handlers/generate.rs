#![deny(clippy::all, clippy::pedantic)]

use canvass_api_types::{GenerateRequest, SurveyDraft, SurveyWithQuestions};
use reqwest::Method;

use crate::client::{CliError, Ctx};
use crate::io::to_value;
use crate::print::print_json;

/// Generates a draft and either prints it or saves it as a new survey.
pub async fn handle(ctx: &Ctx, prompt: String, save: bool, activate: bool) -> Result<(), CliError> {
    let draft: SurveyDraft = ctx
        .request(
            Method::POST,
            "api/v1/generate",
            None,
            Some(to_value(GenerateRequest { prompt })?),
        )
        .await?;

    if !save {
        return print_json(&draft);
    }

    let q = [("activate", activate.to_string())];
    let saved: SurveyWithQuestions = ctx
        .request(
            Method::POST,
            "api/v1/surveys/draft",
            Some(&q),
            Some(to_value(&draft)?),
        )
        .await?;
    print_json(&saved)
}
