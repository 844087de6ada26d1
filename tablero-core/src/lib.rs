//! Tablero Core - column automation rules for a kanban board
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Board read model, rules schema, history changes
//! - **ports**: The `BoardGateway` trait
//! - **services**: Rule editor reducers, payload adapter, summaries, board service
//! - **adapters**: Board REST client, local DuckDB board store, demo data

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbBoardStore;
use adapters::http::HttpBoardGateway;
use config::Config;
use ports::BoardGateway;
use services::{BoardService, DEMO_DB_FILE};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    Action, ActionKind, Board, BoardColumn, Card, ColumnDetailsDto, ColumnRules, Comment,
    Condition, ConditionKind, CreateColumnRulesDto, Rule, RuleId, Trigger, TriggerKind,
    UpdateCardDto,
};
pub use services::{EntryPoint, LogEvent, LoggingService, RuleEditor};

/// Main context for Tablero operations
///
/// Picks the gateway from configuration: the local demo board in demo
/// mode, the board API otherwise.
pub struct TableroContext {
    pub config: Config,
    pub gateway: Arc<dyn BoardGateway>,
    pub board_service: BoardService,
}

impl TableroContext {
    pub fn new(tablero_dir: &Path) -> Result<Self> {
        let config = Config::load(tablero_dir)?;

        let gateway: Arc<dyn BoardGateway> = if config.demo_mode {
            let store = DuckDbBoardStore::new(&tablero_dir.join(DEMO_DB_FILE))
                .context("Failed to open demo board")?;
            store.ensure_schema()?;
            if !store.is_seeded()? {
                store.seed(&adapters::demo::generate_demo_board())?;
            }
            Arc::new(store)
        } else {
            Arc::new(HttpBoardGateway::from_config(&config).context("Invalid API configuration")?)
        };

        let board_service = BoardService::new(Arc::clone(&gateway));

        Ok(Self {
            config,
            gateway,
            board_service,
        })
    }

    /// Attach an event logger to the board service
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.board_service = self.board_service.with_logger(logger);
        self
    }
}
