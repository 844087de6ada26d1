//! Board command - columns, cards and rule status

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use tablero_core::services::DateFormatter;
use tablero_core::LoggingService;

use super::get_context;
use crate::output::{create_table, enabled_badge};

pub fn run(json: bool, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let board = ctx.board_service.board()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    println!("{} ({})", board.name.bold(), ctx.board_service.gateway_name().dimmed());
    if !board.description.is_empty() {
        println!("{}", board.description.dimmed());
    }
    println!();

    let dates = DateFormatter::new();
    let now = Utc::now();

    let mut table = create_table();
    table.set_header(vec!["Columna", "ID", "Tarjetas", "Vencidas", "Reglas"]);

    for column in board.ordered_columns() {
        let overdue = column
            .cards
            .iter()
            .filter(|c| c.due_date.map(|d| dates.is_overdue(d, now)).unwrap_or(false))
            .count();

        let rules = match &column.rules {
            Some(rules) => format!("{} ({})", enabled_badge(rules.enabled), rules.rules.len()),
            None => "-".dimmed().to_string(),
        };

        table.add_row(vec![
            column.name.clone(),
            column.id.clone(),
            column.cards.len().to_string(),
            if overdue > 0 {
                overdue.to_string().red().to_string()
            } else {
                "0".to_string()
            },
            rules,
        ]);
    }

    println!("{}", table);
    Ok(())
}
