//! Card command - create, move and edit cards, view their history

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use tablero_core::{Card, LoggingService, UpdateCardDto};

use super::get_context;
use crate::output::{self, create_table};

#[derive(Subcommand)]
pub enum CardCommands {
    /// Show a card with its comments
    Show {
        /// Card ID
        card: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a card to a column
    Add {
        /// Column ID
        column: String,
        /// Card name
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a card to another column
    Move {
        /// Card ID
        card: String,
        /// Target column ID
        column: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a card's fields
    Edit {
        /// Card ID
        card: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Replace the labels (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Link a customer to a card
    Link {
        /// Card ID
        card: String,
        /// Customer ID
        customer: String,
    },
    /// Unlink the card's customer
    Unlink {
        /// Card ID
        card: String,
    },
    /// Show the history of a card
    History {
        /// Card ID
        card: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl CardCommands {
    pub fn name(&self) -> &'static str {
        match self {
            CardCommands::Show { .. } => "card show",
            CardCommands::Add { .. } => "card add",
            CardCommands::Move { .. } => "card move",
            CardCommands::Edit { .. } => "card edit",
            CardCommands::Link { .. } => "card link",
            CardCommands::Unlink { .. } => "card unlink",
            CardCommands::History { .. } => "card history",
        }
    }
}

/// Parse a due date given as a calendar day (midnight UTC) or a full timestamp
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => bail!("Invalid date '{}': use YYYY-MM-DD or RFC 3339", value),
    }
}

fn print_card(card: &Card, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(card)?);
        return Ok(());
    }

    println!("{} {}", card.name.bold(), format!("({})", card.id).dimmed());
    if let Some(description) = card.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  {}", description);
    }
    if let Some(due) = card.due_date {
        println!("  Vence: {}", due.format("%Y-%m-%d"));
    }
    if let Some(priority) = &card.priority {
        println!("  Prioridad: {}", priority);
    }
    if !card.labels.is_empty() {
        println!("  Etiquetas: {}", card.labels.join(", "));
    }
    if let Some(customer) = &card.customer {
        let label = customer
            .name
            .clone()
            .or_else(|| customer.id.clone())
            .unwrap_or_default();
        println!("  Cliente: {}", label);
    }
    Ok(())
}

pub fn run(command: CardCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let service = &ctx.board_service;

    match command {
        CardCommands::Show { card, json } => {
            let card = service.card(&card)?;
            print_card(&card, json)?;
            if json || card.comments.is_empty() {
                return Ok(());
            }

            println!();
            let mut table = create_table();
            table.set_header(vec!["ID", "Fecha", "Comentario"]);
            for comment in &card.comments {
                table.add_row(vec![
                    comment.id.clone(),
                    comment.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    comment.content.clone(),
                ]);
            }
            println!("{}", table);
        }
        CardCommands::Add {
            column,
            name,
            description,
            due,
            json,
        } => {
            let due_date = parse_due_date(&due)?;
            let card = service.create_card(&column, &name, &description, due_date)?;
            if json {
                return print_card(&card, true);
            }
            output::success(&format!("Tarjeta creada: {}", card.id));
        }
        CardCommands::Move { card, column, json } => {
            let card = service.move_card(&card, &column)?;
            if json {
                return print_card(&card, true);
            }
            output::success(&format!("Tarjeta movida a {}", column));
        }
        CardCommands::Edit {
            card,
            name,
            description,
            due,
            priority,
            labels,
            json,
        } => {
            let changes = UpdateCardDto {
                name,
                description,
                due_date: due.as_deref().map(parse_due_date).transpose()?,
                priority,
                labels: if labels.is_empty() { None } else { Some(labels) },
                ..UpdateCardDto::default()
            };
            if changes.is_empty() {
                bail!("Nothing to change: pass at least one field option");
            }
            let card = service.update_card(&card, &changes)?;
            if json {
                return print_card(&card, true);
            }
            output::success("Tarjeta actualizada");
        }
        CardCommands::Link { card, customer } => {
            service.link_customer(&card, &customer)?;
            output::success(&format!("Cliente {} vinculado", customer));
        }
        CardCommands::Unlink { card } => {
            service.unlink_customer(&card)?;
            output::success("Cliente desvinculado");
        }
        CardCommands::History { card, json } => {
            let lines = service.card_history(&card)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
                return Ok(());
            }

            if lines.is_empty() {
                println!("{}", "Sin historial".dimmed());
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Fecha", "Acción", "Detalle"]);
            for line in lines {
                table.add_row(vec![
                    line.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    line.action.as_str().to_string(),
                    line.description,
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
