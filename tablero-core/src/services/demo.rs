//! Demo service - manage demo mode
//!
//! Demo mode swaps the board API for a local DuckDB board seeded with
//! sample data, so rules can be edited without a server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::adapters::demo::generate_demo_board;
use crate::adapters::duckdb::DuckDbBoardStore;
use crate::config::Config;

/// File name of the local demo board
pub const DEMO_DB_FILE: &str = "demo.duckdb";

pub struct DemoService {
    tablero_dir: PathBuf,
}

impl DemoService {
    pub fn new(tablero_dir: &Path) -> Self {
        Self {
            tablero_dir: tablero_dir.to_path_buf(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.tablero_dir.join(DEMO_DB_FILE)
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.tablero_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode
    ///
    /// Starts from a fresh demo database every time.
    pub fn enable(&self) -> Result<()> {
        self.remove_database()?;

        Config::set_demo_mode(&self.tablero_dir, true)?;

        let store = DuckDbBoardStore::new(&self.db_path()).context("Failed to open demo board")?;
        store.ensure_schema()?;
        store.seed(&generate_demo_board()).context("Failed to seed demo board")?;
        Ok(())
    }

    /// Disable demo mode, optionally deleting the demo database
    pub fn disable(&self, clean: bool) -> Result<()> {
        Config::set_demo_mode(&self.tablero_dir, false)?;

        if clean {
            self.remove_database()?;
        }
        Ok(())
    }

    fn remove_database(&self) -> Result<()> {
        let demo_db = self.db_path();
        let demo_wal = self.tablero_dir.join(format!("{}.wal", DEMO_DB_FILE));
        if demo_db.exists() {
            std::fs::remove_file(&demo_db)?;
        }
        if demo_wal.exists() {
            std::fs::remove_file(&demo_wal)?;
        }
        Ok(())
    }
}
