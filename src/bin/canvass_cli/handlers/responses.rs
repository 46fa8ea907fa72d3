#![deny(clippy::all, clippy::pedantic)]

use canvass_api_types::{ListResponse, SessionDetail, SurveyResponse};
use reqwest::Method;

use crate::args::ResponsesCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: ResponsesCmd) -> Result<(), CliError> {
    match cmd {
        ResponsesCmd::List {
            survey_id,
            completed,
        } => {
            let mut q = Vec::new();
            if let Some(flag) = completed {
                q.push(("is_completed", flag.to_string()));
            }
            let res: ListResponse<SurveyResponse> = ctx
                .request(
                    Method::GET,
                    &format!("api/v1/surveys/{survey_id}/responses"),
                    Some(&q),
                    None,
                )
                .await?;
            print_json(&res)
        }
        ResponsesCmd::Show { id } => {
            let res: SessionDetail = ctx
                .request(Method::GET, &format!("api/v1/responses/{id}"), None, None)
                .await?;
            print_json(&res)
        }
    }
}
