//! Comment command - add and remove card comments

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;
use dialoguer::Confirm;
use tablero_core::LoggingService;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Add a comment to a card
    Add {
        /// Card ID
        card: String,
        /// Comment text
        content: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a comment
    Rm {
        /// Comment ID
        comment: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

impl CommentCommands {
    pub fn name(&self) -> &'static str {
        match self {
            CommentCommands::Add { .. } => "comment add",
            CommentCommands::Rm { .. } => "comment rm",
        }
    }
}

pub fn run(command: CommentCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let service = &ctx.board_service;

    match command {
        CommentCommands::Add {
            card,
            content,
            json,
        } => {
            if content.trim().is_empty() {
                bail!("Comment is empty");
            }
            let comment = service.add_comment(&card, &content)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comment)?);
                return Ok(());
            }
            output::success(&format!("Comentario añadido: {}", comment.id));
        }
        CommentCommands::Rm { comment, force } => {
            if !force
                && !Confirm::new()
                    .with_prompt("Eliminar el comentario?")
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }
            service.delete_comment(&comment)?;
            output::success("Comentario eliminado");
        }
    }

    Ok(())
}
