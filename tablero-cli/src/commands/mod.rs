//! CLI command implementations

pub mod board;
pub mod card;
pub mod column;
pub mod comment;
pub mod demo;
pub mod logs;
pub mod rules;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tablero_core::{EntryPoint, LogEvent, LoggingService, TableroContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (never blocks a command)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let tablero_dir = get_tablero_dir().ok()?;
    std::fs::create_dir_all(&tablero_dir).ok()?;
    LoggingService::new(&tablero_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Tablero directory from `TABLERO_DIR`, or `~/.tablero`
pub fn get_tablero_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TABLERO_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tablero"))
        .context("Could not find home directory (set TABLERO_DIR)")
}

/// Build the context, with the event logger attached when available
pub fn get_context(logger: &Option<Arc<LoggingService>>) -> Result<TableroContext> {
    let tablero_dir = get_tablero_dir()?;
    std::fs::create_dir_all(&tablero_dir)
        .with_context(|| format!("Failed to create tablero directory: {:?}", tablero_dir))?;

    let ctx = TableroContext::new(&tablero_dir).context("Failed to initialize tablero context")?;
    Ok(match logger {
        Some(l) => ctx.with_logger(Arc::clone(l)),
        None => ctx,
    })
}
