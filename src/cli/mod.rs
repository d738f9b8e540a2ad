pub mod commands;
pub mod errors;
pub mod output;

use crate::config::{CliArgs, RegistryConfig};
use crate::model::Operation;
use crate::ops::PickerSheet;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "museum-registry-cli",
    version,
    about = "Museum registry workflow actions"
)]
pub struct Cli {
    #[command(flatten)]
    pub args: CliArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Commit ready rows on the Add sheet as new museums.
    Add {
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply ready rows on the Edit sheet to their Database records.
    Edit {
        #[arg(long)]
        dry_run: bool,
    },
    /// Move museums marked on the Delete sheet into Trash.
    Trash {
        #[arg(long)]
        dry_run: bool,
    },
    /// Move museums marked for restore in Trash back to Database.
    Restore {
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove Trash rows marked for permanent deletion.
    PermanentlyDelete {
        #[arg(long)]
        dry_run: bool,
    },
    /// Publish a snapshot of the Database.
    Publish,
    /// Rebuild the museum list and re-apply every sheet validation.
    SetupValidations,
    RefreshMuseumList,
    /// Fill a row from the museum picked in it.
    Populate {
        #[arg(long, value_enum)]
        sheet: PickerSheet,
        #[arg(long)]
        row: u32,
        #[arg(long)]
        col: Option<u32>,
    },
}

impl Commands {
    /// Label used in the `"<Action> failed."` line.
    pub fn action_label(&self) -> &'static str {
        match self {
            Commands::Add { .. } => Operation::Add.action_label(),
            Commands::Edit { .. } => Operation::Edit.action_label(),
            Commands::Trash { .. } => Operation::Trash.action_label(),
            Commands::Restore { .. } => Operation::Restore.action_label(),
            Commands::PermanentlyDelete { .. } => Operation::PermanentlyDelete.action_label(),
            Commands::Publish => "Publish",
            Commands::SetupValidations => "Setup validations",
            Commands::RefreshMuseumList => "Refresh museum list",
            Commands::Populate { .. } => "Populate",
        }
    }
}

/// What a command prints: one alert line for people, a payload for `--format json`.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub summary: String,
    pub payload: Value,
}

pub async fn run_command(config: &RegistryConfig, command: Commands) -> Result<CommandOutput> {
    match command {
        Commands::Add { dry_run } => workflow(config, Operation::Add, dry_run).await,
        Commands::Edit { dry_run } => workflow(config, Operation::Edit, dry_run).await,
        Commands::Trash { dry_run } => workflow(config, Operation::Trash, dry_run).await,
        Commands::Restore { dry_run } => workflow(config, Operation::Restore, dry_run).await,
        Commands::PermanentlyDelete { dry_run } => {
            workflow(config, Operation::PermanentlyDelete, dry_run).await
        }
        Commands::Publish => commands::publish::publish(config).await,
        Commands::SetupValidations => commands::sheets::setup_validations(config),
        Commands::RefreshMuseumList => commands::sheets::refresh_museum_list(config),
        Commands::Populate { sheet, row, col } => {
            commands::sheets::populate(config, sheet, row, col)
        }
    }
}

/// Workflow actions run against the workbook, or remotely when a cloud URL is set.
async fn workflow(config: &RegistryConfig, op: Operation, dry_run: bool) -> Result<CommandOutput> {
    match config.cloud_url.as_deref() {
        Some(url) => commands::workflow::run_remote(config, url, op, dry_run).await,
        None => commands::workflow::run_local(config, op, dry_run),
    }
}
