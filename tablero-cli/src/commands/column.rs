//! Column command - add, edit and remove board columns

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;
use dialoguer::Confirm;
use tablero_core::{BoardColumn, ColumnDetailsDto, LoggingService};

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum ColumnCommands {
    /// Add a column at the end of the board
    Add {
        /// Column name
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Hex color, e.g. #3B82F6
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a column's name, description or color
    Edit {
        /// Column ID
        column: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a column
    Remove {
        /// Column ID
        column: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl ColumnCommands {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnCommands::Add { .. } => "column add",
            ColumnCommands::Edit { .. } => "column edit",
            ColumnCommands::Remove { .. } => "column remove",
        }
    }
}

fn print_json(column: &BoardColumn) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(column)?);
    Ok(())
}

pub fn run(command: ColumnCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let service = &ctx.board_service;

    match command {
        ColumnCommands::Add {
            name,
            description,
            color,
            json,
        } => {
            let column = service.create_column(&name, description, color)?;
            if json {
                return print_json(&column);
            }
            output::success(&format!("Columna creada: {} ({})", column.name, column.id));
        }
        ColumnCommands::Edit {
            column,
            name,
            description,
            color,
            json,
        } => {
            let details = ColumnDetailsDto {
                name,
                description,
                color,
            };
            if details.is_empty() {
                bail!("Nothing to change: pass --name, --description or --color");
            }
            let updated = service.update_column(&column, &details)?;
            if json {
                return print_json(&updated);
            }
            output::success(&format!("Columna actualizada: {}", updated.name));
        }
        ColumnCommands::Remove {
            column,
            force,
            json,
        } => {
            let current = service.column(&column)?;
            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Eliminar la columna \"{}\"?", current.name))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let removed = service.delete_column(&column)?;
            if json {
                return print_json(&removed);
            }
            output::success(&format!("Columna eliminada: {}", removed.name));
        }
    }

    Ok(())
}
