//! Demo command - manage demo mode

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_tablero_dir, log_event};
use crate::output;
use tablero_core::services::DemoService;
use tablero_core::{LogEvent, LoggingService};

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the demo board
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let tablero_dir = get_tablero_dir()?;
    std::fs::create_dir_all(&tablero_dir)?;
    let demo_service = DemoService::new(&tablero_dir);

    match command {
        Some(DemoCommands::On) => {
            demo_service.enable()?;
            log_event(logger, LogEvent::new("demo_enabled").with_board("demo"));
            println!("{}", "Demo mode enabled".green());
            output::info("Demo board created. Run 'tb board' to see it.");
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            log_event(logger, LogEvent::new("demo_disabled").with_board("demo"));
            println!("{}", "Demo mode disabled".yellow());
        }
        Some(DemoCommands::Status) | None => {
            if demo_service.is_enabled()? {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }

    Ok(())
}
