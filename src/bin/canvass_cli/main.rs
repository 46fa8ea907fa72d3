//! canvass-cli: command-line client for the Canvass HTTP API.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod gateway;
mod handlers;
mod io;
mod print;

use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};
use handlers::{fill, generate, questions, responses, stats, surveys};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Surveys(cmd) => surveys::handle(&ctx, cmd.action).await?,
        Commands::Questions(cmd) => questions::handle(&ctx, cmd.action).await?,
        Commands::Responses(cmd) => responses::handle(&ctx, cmd.action).await?,
        Commands::Stats => stats::handle(&ctx).await?,
        Commands::Generate {
            prompt,
            save,
            activate,
        } => generate::handle(&ctx, prompt, save, activate).await?,
        Commands::Fill { survey_id } => fill::handle(&ctx, survey_id).await?,
    }

    Ok(())
}
