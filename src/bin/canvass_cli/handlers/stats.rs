#![deny(clippy::all, clippy::pedantic)]

use canvass_api_types::Stats;
use reqwest::Method;

use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx) -> Result<(), CliError> {
    let res: Stats = ctx
        .request(Method::GET, "api/v1/stats", None, None)
        .await?;
    print_json(&res)
}
