#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use canvass_api_types::{
    ListResponse, Question, Survey, SurveyCreateRequest, SurveyUpdateRequest,
};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use crate::args::SurveysCmd;
use crate::client::{CliError, Ctx};
use crate::io::{read_opt_value, to_value};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: SurveysCmd) -> Result<(), CliError> {
    match cmd {
        SurveysCmd::List { active } => list(ctx, active).await,
        SurveysCmd::Mine => mine(ctx).await,
        SurveysCmd::Show { id } => show(ctx, id).await,
        SurveysCmd::Create {
            title,
            description,
            description_file,
            inactive,
        } => create(ctx, title, description, description_file, inactive).await,
        SurveysCmd::Activate { id } => set_active(ctx, id, true).await,
        SurveysCmd::Deactivate { id } => set_active(ctx, id, false).await,
        SurveysCmd::Delete { id } => delete(ctx, id).await,
    }
}

async fn list(ctx: &Ctx, active: Option<bool>) -> Result<(), CliError> {
    let mut q = Vec::new();
    if let Some(flag) = active {
        q.push(("is_active", flag.to_string()));
    }
    let res: ListResponse<Survey> = ctx
        .request(Method::GET, "api/v1/surveys", Some(&q), None)
        .await?;
    print_json(&res)
}

async fn mine(ctx: &Ctx) -> Result<(), CliError> {
    let res: ListResponse<Survey> = ctx
        .request(Method::GET, "api/v1/surveys/mine", None, None)
        .await?;
    print_json(&res)
}

#[derive(Serialize)]
struct SurveyOverview {
    survey: Survey,
    questions: Vec<Question>,
}

async fn show(ctx: &Ctx, id: Uuid) -> Result<(), CliError> {
    let survey: Survey = ctx
        .request(Method::GET, &format!("api/v1/surveys/{id}"), None, None)
        .await?;
    let questions: ListResponse<Question> = ctx
        .request(
            Method::GET,
            &format!("api/v1/surveys/{id}/questions"),
            None,
            None,
        )
        .await?;
    print_json(&SurveyOverview {
        survey,
        questions: questions.items,
    })
}

async fn create(
    ctx: &Ctx,
    title: String,
    description: Option<String>,
    description_file: Option<PathBuf>,
    inactive: bool,
) -> Result<(), CliError> {
    let payload = SurveyCreateRequest {
        title,
        description: read_opt_value(description, description_file)?,
        is_active: Some(!inactive),
    };
    let res: Survey = ctx
        .request(
            Method::POST,
            "api/v1/surveys",
            None,
            Some(to_value(payload)?),
        )
        .await?;
    print_json(&res)
}

async fn set_active(ctx: &Ctx, id: Uuid, is_active: bool) -> Result<(), CliError> {
    let payload = SurveyUpdateRequest {
        is_active: Some(is_active),
        ..SurveyUpdateRequest::default()
    };
    let res: Survey = ctx
        .request(
            Method::PATCH,
            &format!("api/v1/surveys/{id}"),
            None,
            Some(to_value(payload)?),
        )
        .await?;
    print_json(&res)
}

async fn delete(ctx: &Ctx, id: Uuid) -> Result<(), CliError> {
    ctx.request_unit(Method::DELETE, &format!("api/v1/surveys/{id}"), None)
        .await?;
    println!("deleted {id}");
    Ok(())
}
