//! Command-line surface for `canvass-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use canvass_api_types::QuestionType;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "canvass-cli", version, about = "Canvass survey API client", long_about = None)]
pub struct Cli {
    /// Server base URL, e.g. <http://localhost:3000>
    #[arg(long, env = "CANVASS_URL")]
    pub server: Option<String>,

    /// Path to a file containing the access token (takes precedence over env)
    #[arg(long, env = "CANVASS_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Access token from env (no CLI flag, keeps it out of shell history)
    #[arg(hide = true, env = "CANVASS_TOKEN")]
    pub token_env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Survey management
    Surveys(SurveysArgs),
    /// Question authoring
    Questions(QuestionsArgs),
    /// Response sessions of a survey
    Responses(ResponsesArgs),
    /// Dashboard counters
    Stats,
    /// Draft a survey from a prompt
    Generate {
        prompt: String,
        /// Persist the generated draft as a new survey
        #[arg(long, default_value_t = false)]
        save: bool,
        /// Activate the survey when saving
        #[arg(long, default_value_t = false, requires = "save")]
        activate: bool,
    },
    /// Answer a survey interactively (`:back` returns, `:clear` empties, `:quit` abandons)
    Fill { survey_id: Uuid },
}

#[derive(Parser, Debug)]
pub struct SurveysArgs {
    #[command(subcommand)]
    pub action: SurveysCmd,
}

#[derive(Subcommand, Debug)]
pub enum SurveysCmd {
    /// List surveys, optionally filtered by active flag
    List {
        #[arg(long)]
        active: Option<bool>,
    },
    /// List surveys created by the caller
    Mine,
    /// Show a survey with its questions
    Show { id: Uuid },
    /// Create a survey
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        description_file: Option<PathBuf>,
        /// Create as a draft instead of active
        #[arg(long, default_value_t = false)]
        inactive: bool,
    },
    /// Open a survey for responses
    Activate { id: Uuid },
    /// Close a survey for responses
    Deactivate { id: Uuid },
    /// Delete a survey with its questions and responses
    Delete { id: Uuid },
}

#[derive(Parser, Debug)]
pub struct QuestionsArgs {
    #[command(subcommand)]
    pub action: QuestionsCmd,
}

#[derive(Subcommand, Debug)]
pub enum QuestionsCmd {
    /// Append a question to a survey
    Add {
        survey_id: Uuid,
        #[arg(long)]
        text: String,
        #[arg(long = "type", value_enum, default_value_t = QuestionKindArg::Text)]
        kind: QuestionKindArg,
        #[arg(long)]
        order_index: Option<i32>,
        /// Allow an empty answer
        #[arg(long, default_value_t = false)]
        optional: bool,
        /// Choice text; repeat for each option of a multiple-choice question
        #[arg(long = "option")]
        options: Vec<String>,
    },
}

#[derive(Parser, Debug)]
pub struct ResponsesArgs {
    #[command(subcommand)]
    pub action: ResponsesCmd,
}

#[derive(Subcommand, Debug)]
pub enum ResponsesCmd {
    /// List response sessions of a survey
    List {
        survey_id: Uuid,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Show one session with its answers
    Show { id: Uuid },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum QuestionKindArg {
    MultipleChoice,
    Text,
    Rating,
}

impl fmt::Display for QuestionKindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(QuestionType::from(*self).as_str())
    }
}

impl From<QuestionKindArg> for QuestionType {
    fn from(value: QuestionKindArg) -> Self {
        match value {
            QuestionKindArg::MultipleChoice => QuestionType::MultipleChoice,
            QuestionKindArg::Text => QuestionType::Text,
            QuestionKindArg::Rating => QuestionType::Rating,
        }
    }
}
