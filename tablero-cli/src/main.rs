//! Tablero CLI - column automation rules in your terminal

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tablero_core::{LogEvent, LoggingService};

mod commands;
mod output;

use commands::{board, card, column, comment, demo, log_event, logs, rules};

/// Tablero - task board automation rules
#[derive(Parser)]
#[command(name = "tb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the board: columns, card counts and rule status
    Board {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and edit column automation rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Add, move and edit cards
    Card {
        #[command(subcommand)]
        command: card::CardCommands,
    },

    /// Add, edit and remove columns
    Column {
        #[command(subcommand)]
        command: column::ColumnCommands,
    },

    /// Add and remove card comments
    Comment {
        #[command(subcommand)]
        command: comment::CommentCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Board { .. } => "board",
            Commands::Rules { .. } => "rules",
            Commands::Card { .. } => "card",
            Commands::Column { .. } => "column",
            Commands::Comment { .. } => "comment",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = commands::get_logger();
    let name = cli.command.name();

    match run(cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string()),
            );
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    match cli.command {
        Commands::Board { json } => {
            log_event(logger, LogEvent::new("command_executed").with_command("board"));
            board::run(json, logger)
        }
        Commands::Rules { command } => rules::run(command, logger),
        Commands::Card { command } => {
            log_event(logger, LogEvent::new("command_executed").with_command(command.name()));
            card::run(command, logger)
        }
        Commands::Column { command } => {
            log_event(logger, LogEvent::new("command_executed").with_command(command.name()));
            column::run(command, logger)
        }
        Commands::Comment { command } => {
            log_event(logger, LogEvent::new("command_executed").with_command(command.name()));
            comment::run(command, logger)
        }
        Commands::Demo { command } => demo::run(command, logger),
        Commands::Logs { command } => logs::run(command, logger),
    }
}
