//! Rules command - view and edit a column's automation rules
//!
//! Every edit opens an editor session on the column's saved rules, applies
//! one change and saves the whole document back.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use tablero_core::services::summary::{
    action_label, condition_label, describe_rule, trigger_label,
};
use tablero_core::services::RuleEditor;
use tablero_core::{
    ActionKind, ColumnRules, ConditionKind, LogEvent, LoggingService, OperationResult, RuleId,
    TableroContext, TriggerKind,
};

use super::{get_context, log_event};
use crate::output::{self, create_table, enabled_badge};

/// Flags shared by every command that changes rules
#[derive(Args, Clone, Copy)]
pub struct EditOptions {
    /// Show the document that would be saved without saving it
    #[arg(long)]
    pub dry_run: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Show a column's rules with one-line summaries
    Show {
        /// Column ID
        column: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Turn on automation for a column
    Enable {
        column: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Turn off automation for a column
    Disable {
        column: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Append a default rule
    Add {
        column: String,
        /// Name for the new rule
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Delete a rule
    Remove {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Rename a rule
    Rename {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        name: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Switch a single rule on or off
    Toggle {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        #[arg(long, conflicts_with = "off", required_unless_present = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Change what starts a rule
    Trigger {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        /// card_created, card_moved or due_date_approaching
        #[arg(value_name = "TYPE")]
        kind: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Edit a rule's conditions
    Condition {
        #[command(subcommand)]
        command: ConditionCommands,
    },
    /// Change what a rule does
    Action {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        /// send_email, move_to_column, assign_due_date, add_label or notify_user
        #[arg(value_name = "TYPE")]
        kind: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Set one field of a rule's action configuration
    ActionConfig {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        key: String,
        value: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Replace a column's rules with a JSON document
    Import {
        column: String,
        /// Read the document from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        opts: EditOptions,
    },
}

#[derive(Subcommand)]
pub enum ConditionCommands {
    /// Append a condition
    Add {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Change the type of the condition at a position
    Set {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        /// 0-based condition index
        index: usize,
        /// has_customer, has_due_date, has_label or custom_field_value
        #[arg(value_name = "TYPE")]
        kind: String,
        #[command(flatten)]
        opts: EditOptions,
    },
    /// Remove the condition at a position
    Remove {
        column: String,
        /// Rule ID or 1-based position
        rule: String,
        /// 0-based condition index
        index: usize,
        #[command(flatten)]
        opts: EditOptions,
    },
}

pub fn run(command: RulesCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    match command {
        RulesCommands::Show { column, json } => {
            log_event(
                logger,
                LogEvent::new("command_executed")
                    .with_command("rules show")
                    .with_column(&column),
            );
            show(&ctx, &column, json)
        }
        RulesCommands::Enable { column, opts } => {
            edit(&ctx, logger, "rules enable", &column, opts, |e| {
                e.set_enabled(true)?;
                Ok(())
            })
        }
        RulesCommands::Disable { column, opts } => {
            edit(&ctx, logger, "rules disable", &column, opts, |e| {
                e.set_enabled(false)?;
                Ok(())
            })
        }
        RulesCommands::Add { column, name, opts } => {
            edit(&ctx, logger, "rules add", &column, opts, |e| {
                let id = e.add_rule()?;
                if let Some(name) = &name {
                    e.rename_rule(&id, name)?;
                }
                Ok(())
            })
        }
        RulesCommands::Remove {
            column,
            rule,
            force,
            opts,
        } => {
            if !force && !opts.json && !opts.dry_run {
                let rules = ctx.board_service.column_rules(&column)?;
                let id = resolve_rule(&rules, &rule)?;
                let name = rules.rule(&id).map(|r| r.name.clone()).unwrap_or_default();

                println!("\n{}", format!("Se eliminará la regla '{}'.", name).yellow());
                if !Confirm::new()
                    .with_prompt("¿Continuar?")
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelado".dimmed());
                    return Ok(());
                }
            }
            edit(&ctx, logger, "rules remove", &column, opts, |e| {
                let id = focus_rule(e, &rule)?;
                e.remove_rule(&id)?;
                Ok(())
            })
        }
        RulesCommands::Rename {
            column,
            rule,
            name,
            opts,
        } => edit(&ctx, logger, "rules rename", &column, opts, |e| {
            let id = focus_rule(e, &rule)?;
            e.rename_rule(&id, &name)?;
            Ok(())
        }),
        RulesCommands::Toggle {
            column,
            rule,
            on,
            off: _,
            opts,
        } => edit(&ctx, logger, "rules toggle", &column, opts, |e| {
            let id = focus_rule(e, &rule)?;
            e.set_rule_enabled(&id, on)?;
            Ok(())
        }),
        RulesCommands::Trigger {
            column,
            rule,
            kind,
            opts,
        } => {
            let kind = parse_trigger(&kind)?;
            edit(&ctx, logger, "rules trigger", &column, opts, |e| {
                let id = focus_rule(e, &rule)?;
                e.set_trigger_type(&id, kind)?;
                Ok(())
            })
        }
        RulesCommands::Condition { command } => run_condition(&ctx, logger, command),
        RulesCommands::Action {
            column,
            rule,
            kind,
            opts,
        } => {
            let kind = parse_action(&kind)?;
            edit(&ctx, logger, "rules action", &column, opts, |e| {
                let id = focus_rule(e, &rule)?;
                e.set_action_type(&id, kind)?;
                Ok(())
            })
        }
        RulesCommands::ActionConfig {
            column,
            rule,
            key,
            value,
            opts,
        } => edit(&ctx, logger, "rules action-config", &column, opts, |e| {
            let id = focus_rule(e, &rule)?;
            e.set_action_config_field(&id, &key, &value)?;
            Ok(())
        }),
        RulesCommands::Import { column, file, opts } => {
            let imported = read_document(file)?;
            edit(&ctx, logger, "rules import", &column, opts, |e| {
                e.apply(|_| imported)?;
                Ok(())
            })
        }
    }
}

fn run_condition(
    ctx: &TableroContext,
    logger: &Option<Arc<LoggingService>>,
    command: ConditionCommands,
) -> Result<()> {
    match command {
        ConditionCommands::Add { column, rule, opts } => {
            edit(ctx, logger, "rules condition add", &column, opts, |e| {
                let id = focus_rule(e, &rule)?;
                e.add_condition(&id)?;
                Ok(())
            })
        }
        ConditionCommands::Set {
            column,
            rule,
            index,
            kind,
            opts,
        } => {
            let kind = parse_condition(&kind)?;
            edit(ctx, logger, "rules condition set", &column, opts, |e| {
                let id = focus_rule(e, &rule)?;
                e.set_condition_type(&id, index, kind)?;
                Ok(())
            })
        }
        ConditionCommands::Remove {
            column,
            rule,
            index,
            opts,
        } => edit(ctx, logger, "rules condition remove", &column, opts, |e| {
            let id = focus_rule(e, &rule)?;
            e.remove_condition_at(&id, index)?;
            Ok(())
        }),
    }
}

fn show(ctx: &TableroContext, column_id: &str, json: bool) -> Result<()> {
    let column = ctx.board_service.column(column_id)?;
    let rules = column.rules_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    print_rules(&column.name, &rules, None);
    Ok(())
}

/// Print a rules table; the focused row is marked with an arrow
fn print_rules(column_name: &str, rules: &ColumnRules, focused: Option<usize>) {
    println!(
        "{} - automatización {}",
        column_name.bold(),
        enabled_badge(rules.enabled)
    );

    if rules.rules.is_empty() {
        println!("{}", "No hay reglas configuradas".dimmed());
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["#", "ID", "Nombre", "Disparador", "Condiciones", "Acción"]);
    for (i, rule) in rules.rules.iter().enumerate() {
        let conditions: Vec<&str> = rule.conditions.iter().map(|c| condition_label(&c.kind)).collect();
        let position = if focused == Some(i) {
            format!("▸ {}", i + 1).cyan().to_string()
        } else {
            (i + 1).to_string()
        };
        table.add_row(vec![
            position,
            rule.id.to_string(),
            rule.name.clone(),
            trigger_label(&rule.trigger.kind).to_string(),
            conditions.join(", "),
            action_label(&rule.action.kind).to_string(),
        ]);
    }
    println!("{}", table);

    for (i, rule) in rules.rules.iter().enumerate() {
        println!("  {}. {}", i + 1, describe_rule(rule).dimmed());
    }
}

/// Open a session, apply `change`, then save or preview
fn edit<F>(
    ctx: &TableroContext,
    logger: &Option<Arc<LoggingService>>,
    command: &str,
    column_id: &str,
    opts: EditOptions,
    change: F,
) -> Result<()>
where
    F: FnOnce(&mut RuleEditor) -> Result<()>,
{
    log_event(
        logger,
        LogEvent::new("command_executed")
            .with_command(command)
            .with_column(column_id),
    );

    let mut editor = ctx.board_service.open_editor(column_id)?;
    change(&mut editor)?;
    let focused = focused_position(&editor);

    if opts.dry_run {
        let payload = editor.payload(column_id)?;
        editor.cancel();
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            output::warning("DRY RUN - No changes saved");
            print_rules(column_id, &ColumnRules::from(payload), focused);
        }
        return Ok(());
    }

    let spinner = (!opts.json).then(|| output::spinner("Guardando reglas..."));
    let result = ctx.board_service.save_editor(&mut editor, column_id);
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    match result {
        Ok(column) => {
            let rules = column.rules_or_default();
            if opts.json {
                let context: HashMap<String, serde_json::Value> = HashMap::from([
                    ("column".to_string(), json!(column_id)),
                    ("command".to_string(), json!(command)),
                ]);
                let result = OperationResult::ok_with_context(rules, context);
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::success("Reglas actualizadas");
                print_rules(&column.name, &rules, focused);
            }
            Ok(())
        }
        Err(e) if opts.json => {
            let result: OperationResult<ColumnRules> = OperationResult::fail(e.to_string());
            println!("{}", serde_json::to_string_pretty(&result)?);
            exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Find a rule by wire id or 1-based position
fn resolve_rule(rules: &ColumnRules, reference: &str) -> Result<RuleId> {
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(rule) = position.checked_sub(1).and_then(|i| rules.rules.get(i)) {
            return Ok(rule.id.clone());
        }
    }
    let wanted = RuleId::parse(reference);
    match rules.rule(&wanted) {
        Some(rule) => Ok(rule.id.clone()),
        None => bail!("Regla no encontrada: {}", reference),
    }
}

/// Resolve a rule in the open session and focus it
fn focus_rule(editor: &mut RuleEditor, reference: &str) -> Result<RuleId> {
    let rules = editor.rules().context("Rule editor is not open")?;
    let id = resolve_rule(rules, reference)?;
    editor.focus(Some(id.clone()))?;
    Ok(id)
}

/// Position of the focused rule; it survives the save renaming pending ids
fn focused_position(editor: &RuleEditor) -> Option<usize> {
    let focused = editor.focused_rule()?;
    editor.rules()?.rules.iter().position(|r| &r.id == focused)
}

fn parse_trigger(raw: &str) -> Result<TriggerKind> {
    let kind = TriggerKind::parse(raw);
    if !kind.is_known() {
        bail!("Disparador desconocido '{}' (opciones: {})", raw, options(TriggerKind::KNOWN));
    }
    Ok(kind)
}

fn parse_condition(raw: &str) -> Result<ConditionKind> {
    let kind = ConditionKind::parse(raw);
    if !kind.is_known() {
        bail!("Condición desconocida '{}' (opciones: {})", raw, options(ConditionKind::KNOWN));
    }
    Ok(kind)
}

fn parse_action(raw: &str) -> Result<ActionKind> {
    let kind = ActionKind::parse(raw);
    if !kind.is_known() {
        bail!("Acción desconocida '{}' (opciones: {})", raw, options(ActionKind::KNOWN));
    }
    Ok(kind)
}

fn options<T: std::fmt::Display>(known: &[T]) -> String {
    known.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
}

/// Rules document from a file, or from stdin when piped
fn read_document(file: Option<PathBuf>) -> Result<ColumnRules> {
    let content = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None if atty::isnt(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => bail!("No rules document provided. Use --file or pipe JSON on stdin."),
    };

    parse_document(&content)
}

fn parse_document(content: &str) -> Result<ColumnRules> {
    let rules: ColumnRules = serde_json::from_str(content).context("Invalid rules document")?;
    rules.validate()?;
    Ok(rules)
}
