//! DuckDB board store
//!
//! Local stand-in for the board API used in demo mode. Rules documents,
//! labels and history changes are stored as JSON text; timestamps as
//! RFC 3339 strings. Card writes record history entries in the same shapes
//! the board API sends.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::domain::{
    Board, BoardColumn, Card, CardCustomer, CardHistory, ColumnDetailsDto, ColumnRules, Comment,
    CreateCardDto, CreateColumnDto, CreateColumnRulesDto, CreateCommentDto, HistoryAction,
    UpdateCardDto,
};
use crate::migrations::MIGRATIONS;
use crate::ports::BoardGateway;
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Length of the random part of ids minted by the store
const ID_SUFFIX_LEN: usize = 12;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Board store backed by a DuckDB file
pub struct DuckDbBoardStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbBoardStore {
    /// Open (or create) the store at `db_path`
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[tablero] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory store, used by tests
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: JSON is linked in through the "json" feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("connection lock poisoned"))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS)
            .run_pending()
            .map_err(|e| Error::database(e.to_string()))?;
        Ok(())
    }

    /// Whether a board has been written already
    pub fn is_seeded(&self) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_boards", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Replace the stored board with `board`, in one transaction
    pub fn seed(&self, board: &Board) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM sys_card_comments;
             DELETE FROM sys_card_history;
             DELETE FROM sys_cards;
             DELETE FROM sys_columns;
             DELETE FROM sys_boards;",
        )?;

        tx.execute(
            "INSERT INTO sys_boards (board_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                board.id,
                board.name,
                board.description,
                stamp(board.created_at),
                stamp(board.updated_at),
            ],
        )?;

        for column in &board.columns {
            let rules_json = column.rules.as_ref().map(serde_json::to_string).transpose()?;
            tx.execute(
                "INSERT INTO sys_columns (column_id, board_id, name, sort_order, description,
                                          color, rules, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    column.id,
                    board.id,
                    column.name,
                    column.order,
                    column.description,
                    column.color,
                    rules_json,
                    stamp(column.created_at),
                    stamp(column.updated_at),
                ],
            )?;

            for card in &column.cards {
                let customer = card.customer.clone().unwrap_or_default();
                tx.execute(
                    "INSERT INTO sys_cards (card_id, column_id, name, customer_id, customer_name,
                                            due_date, priority, labels, description,
                                            created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        card.id,
                        column.id,
                        card.name,
                        customer.id,
                        customer.name,
                        card.due_date.map(stamp),
                        card.priority,
                        serde_json::to_string(&card.labels)?,
                        card.description,
                        stamp(card.created_at),
                        stamp(card.updated_at),
                    ],
                )?;

                for entry in &card.history {
                    tx.execute(
                        "INSERT INTO sys_card_history (history_id, card_id, action, changes,
                                                       description, created_at)
                         VALUES (?, ?, ?, ?, ?, ?)",
                        params![
                            entry.id,
                            card.id,
                            entry.action.as_str(),
                            entry.changes.to_string(),
                            entry.description,
                            stamp(entry.created_at),
                        ],
                    )?;
                }

                for comment in &card.comments {
                    tx.execute(
                        "INSERT INTO sys_card_comments (comment_id, card_id, content,
                                                        created_at, updated_at)
                         VALUES (?, ?, ?, ?, ?)",
                        params![
                            comment.id,
                            card.id,
                            comment.content,
                            stamp(comment.created_at),
                            stamp(comment.updated_at),
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    // === Reads ===

    fn load_board(&self, conn: &Connection) -> Result<Board> {
        let (id, name, description, created, updated) = conn
            .query_row(
                "SELECT board_id, name, description, created_at, updated_at
                 FROM sys_boards ORDER BY created_at LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Error::not_found("board"),
                other => other.into(),
            })?;

        let mut board = Board {
            id,
            name,
            description,
            columns: Vec::new(),
            created_at: parse_timestamp(&created)?,
            updated_at: parse_timestamp(&updated)?,
        };

        let column_ids: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT column_id FROM sys_columns WHERE board_id = ? ORDER BY sort_order",
            )?;
            let ids = stmt.query_map([&board.id], |row| row.get::<_, String>(0))?;
            ids.collect::<std::result::Result<_, _>>()?
        };

        for column_id in column_ids {
            board.columns.push(self.load_column(conn, &column_id)?);
        }
        Ok(board)
    }

    fn load_column(&self, conn: &Connection, column_id: &str) -> Result<BoardColumn> {
        let row = conn
            .query_row(
                "SELECT column_id, name, sort_order, description, color, rules,
                        created_at, updated_at
                 FROM sys_columns WHERE column_id = ?",
                [column_id],
                |row| {
                    Ok(ColumnRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        order: row.get(2)?,
                        description: row.get(3)?,
                        color: row.get(4)?,
                        rules: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => {
                    Error::not_found(format!("column {}", column_id))
                }
                other => other.into(),
            })?;

        let mut column = BoardColumn {
            id: row.id,
            name: row.name,
            cards: Vec::new(),
            order: row.order,
            rules: row
                .rules
                .map(|json| serde_json::from_str::<ColumnRules>(&json))
                .transpose()?,
            description: row.description,
            color: row.color,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        };

        let card_ids: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT card_id FROM sys_cards WHERE column_id = ? ORDER BY created_at",
            )?;
            let ids = stmt.query_map([column_id], |row| row.get::<_, String>(0))?;
            ids.collect::<std::result::Result<_, _>>()?
        };

        for card_id in card_ids {
            column.cards.push(self.load_card(conn, &card_id)?);
        }
        Ok(column)
    }

    fn load_card(&self, conn: &Connection, card_id: &str) -> Result<Card> {
        let row = conn
            .query_row(
                "SELECT card_id, name, customer_id, customer_name, due_date, priority,
                        labels, description, created_at, updated_at
                 FROM sys_cards WHERE card_id = ?",
                [card_id],
                |row| {
                    Ok(CardRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        customer_id: row.get(2)?,
                        customer_name: row.get(3)?,
                        due_date: row.get(4)?,
                        priority: row.get(5)?,
                        labels: row.get(6)?,
                        description: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => Error::not_found(format!("card {}", card_id)),
                other => other.into(),
            })?;

        let customer = (row.customer_id.is_some() || row.customer_name.is_some()).then(|| {
            CardCustomer {
                id: row.customer_id,
                name: row.customer_name,
            }
        });

        Ok(Card {
            id: row.id,
            name: row.name,
            customer,
            due_date: row.due_date.as_deref().map(parse_timestamp).transpose()?,
            priority: row.priority,
            labels: serde_json::from_str(&row.labels)?,
            description: row.description,
            history: self.load_history(conn, card_id)?,
            comments: self.load_comments(conn, card_id)?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }

    fn load_history(&self, conn: &Connection, card_id: &str) -> Result<Vec<CardHistory>> {
        let mut stmt = conn.prepare(
            "SELECT history_id, action, changes, description, created_at
             FROM sys_card_history WHERE card_id = ? ORDER BY created_at",
        )?;

        let rows = stmt.query_map([card_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (id, action, changes, description, created) = row?;
            // Entries with an action this build does not know are skipped
            let Ok(action) = serde_json::from_value::<HistoryAction>(JsonValue::String(action))
            else {
                continue;
            };
            history.push(CardHistory {
                id,
                action,
                changes: serde_json::from_str(&changes)?,
                created_at: parse_timestamp(&created)?,
                description,
            });
        }
        Ok(history)
    }

    fn load_comments(&self, conn: &Connection, card_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = conn.prepare(
            "SELECT comment_id, content, created_at, updated_at
             FROM sys_card_comments WHERE card_id = ? ORDER BY created_at",
        )?;

        let rows = stmt.query_map([card_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut comments = Vec::new();
        for row in rows {
            let (id, content, created, updated) = row?;
            comments.push(Comment {
                id,
                content,
                created_at: parse_timestamp(&created)?,
                updated_at: parse_timestamp(&updated)?,
            });
        }
        Ok(comments)
    }

    fn load_comment(&self, conn: &Connection, comment_id: &str) -> Result<(String, Comment)> {
        let (card_id, content, created, updated) = conn
            .query_row(
                "SELECT card_id, content, created_at, updated_at
                 FROM sys_card_comments WHERE comment_id = ?",
                [comment_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => {
                    Error::not_found(format!("comment {}", comment_id))
                }
                other => other.into(),
            })?;

        let comment = Comment {
            id: comment_id.to_string(),
            content,
            created_at: parse_timestamp(&created)?,
            updated_at: parse_timestamp(&updated)?,
        };
        Ok((card_id, comment))
    }

    fn column_name(&self, conn: &Connection, column_id: &str) -> Result<String> {
        conn.query_row(
            "SELECT name FROM sys_columns WHERE column_id = ?",
            [column_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            duckdb::Error::QueryReturnedNoRows => Error::not_found(format!("column {}", column_id)),
            other => other.into(),
        })
    }

    fn card_column(&self, conn: &Connection, card_id: &str) -> Result<String> {
        conn.query_row(
            "SELECT column_id FROM sys_cards WHERE card_id = ?",
            [card_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            duckdb::Error::QueryReturnedNoRows => Error::not_found(format!("card {}", card_id)),
            other => other.into(),
        })
    }

    // === Writes ===

    fn record_history(
        &self,
        conn: &Connection,
        card_id: &str,
        action: HistoryAction,
        changes: JsonValue,
        description: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO sys_card_history (history_id, card_id, action, changes,
                                           description, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                new_id("hist"),
                card_id,
                action.as_str(),
                changes.to_string(),
                description,
                stamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Link (`Some`) or unlink (`None`) the card's customer
    fn set_customer(&self, conn: &Connection, card: &Card, customer_id: Option<&str>) -> Result<()> {
        let old = card.customer.clone().unwrap_or_default();
        let old_id = old.id.unwrap_or_default();

        match customer_id {
            Some(new_id) => {
                if new_id.trim().is_empty() {
                    return Err(Error::validation("customer id is required"));
                }
                if old_id == new_id {
                    return Ok(());
                }
                // Name comes from any other card already linked to this customer
                let mut stmt = conn.prepare(
                    "SELECT customer_name FROM sys_cards
                     WHERE customer_id = ? AND customer_name IS NOT NULL LIMIT 1",
                )?;
                let name = stmt
                    .query_map([new_id], |row| row.get::<_, String>(0))?
                    .next()
                    .transpose()?;

                conn.execute(
                    "UPDATE sys_cards SET customer_id = ?, customer_name = ? WHERE card_id = ?",
                    params![new_id, name, card.id],
                )?;
                self.record_history(
                    conn,
                    &card.id,
                    HistoryAction::CustomerLinked,
                    json!({
                        "oldCustomerId": old_id,
                        "newCustomerId": new_id,
                        "customerName": name.unwrap_or_default()
                    }),
                    None,
                )
            }
            None => {
                if card.customer.is_none() {
                    return Ok(());
                }
                conn.execute(
                    "UPDATE sys_cards SET customer_id = NULL, customer_name = NULL WHERE card_id = ?",
                    [&card.id],
                )?;
                self.record_history(
                    conn,
                    &card.id,
                    HistoryAction::CustomerUnlinked,
                    json!({}),
                    Some("Cliente desvinculado"),
                )
            }
        }
    }

    fn touch_card(&self, conn: &Connection, card_id: &str) -> Result<()> {
        conn.execute(
            "UPDATE sys_cards SET updated_at = ? WHERE card_id = ?",
            params![stamp(Utc::now()), card_id],
        )?;
        Ok(())
    }
}

/// Raw `sys_columns` row
struct ColumnRow {
    id: String,
    name: String,
    order: i32,
    description: Option<String>,
    color: Option<String>,
    rules: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Raw `sys_cards` row
struct CardRow {
    id: String,
    name: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    due_date: Option<String>,
    priority: Option<String>,
    labels: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Timestamps are stored with a fixed precision so they sort as text
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", raw, e)))
}

/// `<prefix>-<random lowercase alphanumerics>`
fn new_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}", prefix, suffix)
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", what)));
    }
    Ok(())
}

impl BoardGateway for DuckDbBoardStore {
    fn name(&self) -> &str {
        "demo"
    }

    fn find_my_board(&self) -> Result<Board> {
        let conn = self.lock()?;
        self.load_board(&conn)
    }

    fn update_column_rules(
        &self,
        column_id: &str,
        rules: &CreateColumnRulesDto,
    ) -> Result<BoardColumn> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE sys_columns SET rules = ?, updated_at = ? WHERE column_id = ?",
            params![serde_json::to_string(rules)?, stamp(Utc::now()), column_id],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("column {}", column_id)));
        }
        self.load_column(&conn, column_id)
    }

    fn get_card(&self, card_id: &str) -> Result<Card> {
        let conn = self.lock()?;
        self.load_card(&conn, card_id)
    }

    fn create_column(&self, column: &CreateColumnDto) -> Result<BoardColumn> {
        require(&column.name, "column name")?;
        let conn = self.lock()?;

        let boards: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_boards WHERE board_id = ?",
            [&column.board_id],
            |row| row.get(0),
        )?;
        if boards == 0 {
            return Err(Error::not_found(format!("board {}", column.board_id)));
        }

        let next_order: i32 = conn.query_row(
            "SELECT CAST(COALESCE(MAX(sort_order) + 1, 0) AS INTEGER)
             FROM sys_columns WHERE board_id = ?",
            [&column.board_id],
            |row| row.get(0),
        )?;

        let column_id = new_id("col");
        let now = stamp(Utc::now());
        conn.execute(
            "INSERT INTO sys_columns (column_id, board_id, name, sort_order, description,
                                      color, rules, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)",
            params![
                column_id,
                column.board_id,
                column.name,
                next_order,
                column.description,
                column.color,
                now,
                now,
            ],
        )?;
        self.load_column(&conn, &column_id)
    }

    fn update_column(&self, column_id: &str, details: &ColumnDetailsDto) -> Result<BoardColumn> {
        if let Some(name) = &details.name {
            require(name, "column name")?;
        }
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE sys_columns
             SET name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 color = COALESCE(?, color),
                 updated_at = ?
             WHERE column_id = ?",
            params![
                details.name,
                details.description,
                details.color,
                stamp(Utc::now()),
                column_id
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("column {}", column_id)));
        }
        self.load_column(&conn, column_id)
    }

    fn delete_column(&self, board_id: &str, column_id: &str) -> Result<BoardColumn> {
        let conn = self.lock()?;
        let owned: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_columns WHERE column_id = ? AND board_id = ?",
            [column_id, board_id],
            |row| row.get(0),
        )?;
        if owned == 0 {
            return Err(Error::not_found(format!("column {}", column_id)));
        }

        let column = self.load_column(&conn, column_id)?;
        if !column.cards.is_empty() {
            return Err(Error::validation(format!(
                "column '{}' still has {} card(s)",
                column.name,
                column.cards.len()
            )));
        }

        conn.execute("DELETE FROM sys_columns WHERE column_id = ?", [column_id])?;
        Ok(column)
    }

    fn create_card(&self, card: &CreateCardDto) -> Result<Card> {
        require(&card.name, "card name")?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.column_name(&tx, &card.column_id)?;

        let card_id = new_id("card");
        let now = stamp(Utc::now());
        let description = Some(card.description.as_str()).filter(|d| !d.is_empty());
        tx.execute(
            "INSERT INTO sys_cards (card_id, column_id, name, due_date, labels, description,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, '[]', ?, ?, ?)",
            params![
                card_id,
                card.column_id,
                card.name,
                stamp(card.due_date),
                description,
                now,
                now,
            ],
        )?;
        self.record_history(&tx, &card_id, HistoryAction::Created, json!({}), None)?;
        tx.commit()?;

        self.load_card(&conn, &card_id)
    }

    fn update_card(&self, card_id: &str, changes: &UpdateCardDto) -> Result<Card> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = self.load_card(&tx, card_id)?;

        if let Some(name) = changes.name.as_ref().filter(|n| **n != current.name) {
            require(name, "card name")?;
            tx.execute("UPDATE sys_cards SET name = ? WHERE card_id = ?", params![name, card_id])?;
            self.record_history(
                &tx,
                card_id,
                HistoryAction::Updated,
                json!({ "name": { "old": current.name, "new": name } }),
                None,
            )?;
        }

        let old_description = current.description.clone().unwrap_or_default();
        if let Some(description) = changes.description.as_ref().filter(|d| **d != old_description) {
            tx.execute(
                "UPDATE sys_cards SET description = ? WHERE card_id = ?",
                params![description, card_id],
            )?;
            self.record_history(
                &tx,
                card_id,
                HistoryAction::Updated,
                json!({ "description": { "old": old_description, "new": description } }),
                None,
            )?;
        }

        // Compared at stored precision
        if let Some(due) = changes
            .due_date
            .filter(|d| Some(stamp(*d)) != current.due_date.map(stamp))
        {
            tx.execute(
                "UPDATE sys_cards SET due_date = ? WHERE card_id = ?",
                params![stamp(due), card_id],
            )?;
            self.record_history(
                &tx,
                card_id,
                HistoryAction::DueDateChanged,
                json!({
                    "dueDate": {
                        "old": current.due_date.map(stamp).unwrap_or_default(),
                        "new": stamp(due)
                    }
                }),
                None,
            )?;
        }

        let old_priority = current.priority.clone().unwrap_or_default();
        if let Some(priority) = changes.priority.as_ref().filter(|p| **p != old_priority) {
            tx.execute(
                "UPDATE sys_cards SET priority = ? WHERE card_id = ?",
                params![priority, card_id],
            )?;
            self.record_history(
                &tx,
                card_id,
                HistoryAction::PriorityChanged,
                json!({ "priority": { "old": old_priority, "new": priority } }),
                None,
            )?;
        }

        if let Some(labels) = &changes.labels {
            tx.execute(
                "UPDATE sys_cards SET labels = ? WHERE card_id = ?",
                params![serde_json::to_string(labels)?, card_id],
            )?;
        }

        if let Some(customer_id) = &changes.customer_id {
            self.set_customer(&tx, &current, Some(customer_id.as_str()))?;
        }

        let old_column = self.card_column(&tx, card_id)?;
        if let Some(new_column) = changes.column_id.as_ref().filter(|c| **c != old_column) {
            let new_name = self.column_name(&tx, new_column)?;
            let old_name = self.column_name(&tx, &old_column)?;
            tx.execute(
                "UPDATE sys_cards SET column_id = ? WHERE card_id = ?",
                params![new_column, card_id],
            )?;
            self.record_history(
                &tx,
                card_id,
                HistoryAction::Moved,
                json!({
                    "oldColumnId": old_column,
                    "oldColumnName": old_name,
                    "newColumnId": new_column,
                    "newColumnName": new_name
                }),
                None,
            )?;
        }

        self.touch_card(&tx, card_id)?;
        tx.commit()?;
        self.load_card(&conn, card_id)
    }

    fn add_comment(&self, comment: &CreateCommentDto) -> Result<Comment> {
        require(&comment.content, "comment")?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.card_column(&tx, &comment.card_id)?;

        let comment_id = new_id("comment");
        let now = stamp(Utc::now());
        tx.execute(
            "INSERT INTO sys_card_comments (comment_id, card_id, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![comment_id, comment.card_id, comment.content, now, now],
        )?;
        self.record_history(
            &tx,
            &comment.card_id,
            HistoryAction::CommentAdded,
            json!({}),
            Some("Comentario añadido"),
        )?;
        tx.commit()?;

        let (_, stored) = self.load_comment(&conn, &comment_id)?;
        Ok(stored)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let (card_id, comment) = self.load_comment(&tx, comment_id)?;

        tx.execute("DELETE FROM sys_card_comments WHERE comment_id = ?", [comment_id])?;
        self.record_history(
            &tx,
            &card_id,
            HistoryAction::CommentDeleted,
            json!({ "commentId": comment_id }),
            None,
        )?;
        tx.commit()?;
        Ok(comment)
    }

    fn link_customer(&self, card_id: &str, customer_id: &str) -> Result<Card> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let card = self.load_card(&tx, card_id)?;
        self.set_customer(&tx, &card, Some(customer_id))?;
        self.touch_card(&tx, card_id)?;
        tx.commit()?;
        self.load_card(&conn, card_id)
    }

    fn unlink_customer(&self, card_id: &str) -> Result<Card> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let card = self.load_card(&tx, card_id)?;
        self.set_customer(&tx, &card, None)?;
        self.touch_card(&tx, card_id)?;
        tx.commit()?;
        self.load_card(&conn, card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{generate_demo_board, DEMO_BOARD_ID};
    use crate::domain::{HistoryChange, RuleId};
    use chrono::Duration;
    use crate::services::{rule_editor, rule_payload};
    use tempfile::TempDir;

    fn seeded_store() -> DuckDbBoardStore {
        let store = DuckDbBoardStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.seed(&generate_demo_board()).unwrap();
        store
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: database is locked"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_empty_store_has_no_board() {
        let store = DuckDbBoardStore::in_memory().unwrap();
        store.ensure_schema().unwrap();

        assert!(!store.is_seeded().unwrap());
        assert!(matches!(store.find_my_board(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_seeded_board_round_trips() {
        let store = seeded_store();
        let board = store.find_my_board().unwrap();

        assert_eq!(board.id, DEMO_BOARD_ID);
        let ids: Vec<&str> = board.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["col-pendiente", "col-en-curso", "col-presentado"]);

        let presented = board.column("col-presentado").unwrap();
        assert!(presented.rules_enabled());
        assert!(matches!(
            presented.rules.as_ref().unwrap().rules[0].id,
            RuleId::Persisted(_)
        ));
        assert!(board.column("col-pendiente").unwrap().rules.is_none());
    }

    #[test]
    fn test_card_history_keeps_changes() {
        let store = seeded_store();
        let card = store.get_card("card-irpf-gomez").unwrap();

        assert_eq!(card.history.len(), 3);
        assert_eq!(card.labels, vec!["renta".to_string()]);
        assert!(matches!(card.history[1].change(), HistoryChange::Column { .. }));
    }

    #[test]
    fn test_update_column_rules_persists_document() {
        let store = seeded_store();
        let rules = rule_editor::add_rule(&rule_editor::set_enabled(&ColumnRules::empty(), true));
        let payload = rule_payload::to_persistable_payload(&rules, "col-pendiente");

        let column = store.update_column_rules("col-pendiente", &payload).unwrap();
        assert_eq!(column.rule_count(), 1);

        let reloaded = store.find_my_board().unwrap();
        let stored = reloaded.column("col-pendiente").unwrap().rules_or_default();
        assert!(stored.enabled);
        assert_eq!(stored.rules[0].id.as_wire(), payload.rules[0].id);
    }

    #[test]
    fn test_unknown_column_and_card() {
        let store = seeded_store();
        let payload = rule_payload::to_persistable_payload(&ColumnRules::empty(), "nope");

        assert!(matches!(
            store.update_column_rules("nope", &payload),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.get_card("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reseed_replaces_board() {
        let store = seeded_store();
        store.seed(&generate_demo_board()).unwrap();

        let board = store.find_my_board().unwrap();
        assert_eq!(board.columns.len(), 3);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.duckdb");

        {
            let store = DuckDbBoardStore::new(&path).unwrap();
            store.ensure_schema().unwrap();
            store.seed(&generate_demo_board()).unwrap();
        }

        let store = DuckDbBoardStore::new(&path).unwrap();
        store.ensure_schema().unwrap();
        assert!(store.is_seeded().unwrap());
        assert_eq!(store.db_path(), path.as_path());
    }

    #[test]
    fn test_moving_a_card_records_column_change() {
        let store = seeded_store();
        let card = store
            .update_card("card-iva-t1", &UpdateCardDto::move_to("col-en-curso"))
            .unwrap();

        let last = card.history.last().unwrap();
        assert_eq!(last.action, HistoryAction::Moved);
        assert_eq!(
            last.change(),
            HistoryChange::Column {
                old_column_id: "col-pendiente".into(),
                old_column_name: "Pendiente".into(),
                new_column_id: "col-en-curso".into(),
                new_column_name: "En curso".into(),
            }
        );

        let board = store.find_my_board().unwrap();
        assert!(board.column("col-pendiente").unwrap().cards.is_empty());
        assert_eq!(board.column("col-en-curso").unwrap().cards.len(), 2);
    }

    #[test]
    fn test_move_to_unknown_column_changes_nothing() {
        let store = seeded_store();
        let err = store
            .update_card("card-iva-t1", &UpdateCardDto::move_to("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let card = store.get_card("card-iva-t1").unwrap();
        assert_eq!(card.history.len(), 2);
        assert_eq!(store.find_my_board().unwrap().column("col-pendiente").unwrap().cards.len(), 1);
    }

    #[test]
    fn test_update_card_records_one_entry_per_change() {
        let store = seeded_store();
        let due = Utc::now() + Duration::days(9);
        let changes = UpdateCardDto {
            name: Some("IVA 1T".into()),
            priority: Some("low".into()),
            due_date: Some(due),
            labels: Some(vec!["iva".into()]),
            ..UpdateCardDto::default()
        };

        let card = store.update_card("card-iva-t1", &changes).unwrap();
        assert_eq!(card.name, "IVA 1T");
        assert_eq!(card.labels, vec!["iva".to_string()]);
        assert_eq!(card.priority.as_deref(), Some("low"));

        let actions: Vec<HistoryAction> = card.history.iter().skip(2).map(|h| h.action).collect();
        assert_eq!(actions.len(), 3);
        assert!(actions.contains(&HistoryAction::Updated));
        assert!(actions.contains(&HistoryAction::DueDateChanged));
        assert!(actions.contains(&HistoryAction::PriorityChanged));

        // Same values again: nothing new to record
        let again = store.update_card("card-iva-t1", &changes).unwrap();
        assert_eq!(again.history.len(), card.history.len());
    }

    #[test]
    fn test_create_card_and_column() {
        let store = seeded_store();
        let column = store
            .create_column(&CreateColumnDto {
                name: "Archivado".into(),
                board_id: DEMO_BOARD_ID.into(),
                description: None,
                color: Some("#6B7280".into()),
            })
            .unwrap();
        assert!(column.id.starts_with("col-"));
        assert_eq!(column.order, 3);

        let card = store
            .create_card(&CreateCardDto {
                name: "Modelo 347".into(),
                description: String::new(),
                due_date: Utc::now() + Duration::days(10),
                column_id: column.id.clone(),
            })
            .unwrap();
        assert!(card.description.is_none());
        assert_eq!(card.history.len(), 1);
        assert_eq!(card.history[0].action, HistoryAction::Created);

        let board = store.find_my_board().unwrap();
        assert_eq!(board.columns.last().unwrap().id, column.id);
        assert_eq!(board.columns.last().unwrap().cards[0].id, card.id);
    }

    #[test]
    fn test_create_rejects_blank_names_and_unknown_parents() {
        let store = seeded_store();
        let blank = CreateColumnDto {
            name: "  ".into(),
            board_id: DEMO_BOARD_ID.into(),
            description: None,
            color: None,
        };
        assert!(matches!(store.create_column(&blank), Err(Error::Validation(_))));

        let orphan = CreateCardDto {
            name: "X".into(),
            description: String::new(),
            due_date: Utc::now(),
            column_id: "nope".into(),
        };
        assert!(matches!(store.create_card(&orphan), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_and_delete_column() {
        let store = seeded_store();
        let renamed = store
            .update_column(
                "col-presentado",
                &ColumnDetailsDto {
                    name: Some("Presentadas".into()),
                    ..ColumnDetailsDto::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Presentadas");
        assert_eq!(renamed.color.as_deref(), Some("#10B981"));
        assert!(renamed.rules_enabled());

        let err = store.delete_column(DEMO_BOARD_ID, "col-presentado").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let empty = store
            .create_column(&CreateColumnDto {
                name: "Temporal".into(),
                board_id: DEMO_BOARD_ID.into(),
                description: None,
                color: None,
            })
            .unwrap();
        assert!(matches!(
            store.delete_column("other-board", &empty.id),
            Err(Error::NotFound(_))
        ));
        let deleted = store.delete_column(DEMO_BOARD_ID, &empty.id).unwrap();
        assert_eq!(deleted.name, "Temporal");
        assert_eq!(store.find_my_board().unwrap().columns.len(), 3);
    }

    #[test]
    fn test_comments_add_and_delete() {
        let store = seeded_store();
        assert_eq!(store.get_card("card-iva-t1").unwrap().comments.len(), 1);

        let comment = store
            .add_comment(&CreateCommentDto {
                content: "Cliente avisado".into(),
                card_id: "card-iva-t1".into(),
            })
            .unwrap();
        let card = store.get_card("card-iva-t1").unwrap();
        assert_eq!(card.comments.len(), 2);
        assert_eq!(card.history.last().unwrap().action, HistoryAction::CommentAdded);

        let removed = store.delete_comment(&comment.id).unwrap();
        assert_eq!(removed.content, "Cliente avisado");
        let card = store.get_card("card-iva-t1").unwrap();
        assert_eq!(card.comments.len(), 1);
        assert!(matches!(
            card.history.last().unwrap().change(),
            HistoryChange::Comment { .. }
        ));

        assert!(matches!(store.delete_comment(&comment.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_link_and_unlink_customer() {
        let store = seeded_store();
        let card = store.link_customer("card-irpf-gomez", "cust-sol").unwrap();

        let customer = card.customer.clone().unwrap();
        assert_eq!(customer.id.as_deref(), Some("cust-sol"));
        assert_eq!(customer.name.as_deref(), Some("Panadería Sol"));
        assert_eq!(
            card.history.last().unwrap().change(),
            HistoryChange::Customer {
                old_customer_id: "cust-gomez".into(),
                new_customer_id: "cust-sol".into(),
                customer_name: "Panadería Sol".into(),
            }
        );

        let card = store.unlink_customer("card-irpf-gomez").unwrap();
        assert!(card.customer.is_none());
        assert_eq!(card.history.last().unwrap().action, HistoryAction::CustomerUnlinked);

        let before = card.history.len();
        let card = store.unlink_customer("card-irpf-gomez").unwrap();
        assert_eq!(card.history.len(), before);
    }

    #[test]
    fn test_corrupt_rows_are_errors() {
        let store = seeded_store();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE sys_cards SET labels = 'not json' WHERE card_id = 'card-iva-t1'",
                [],
            )
            .unwrap();
            conn.execute(
                "UPDATE sys_cards SET created_at = 'yesterday' WHERE card_id = 'card-irpf-gomez'",
                [],
            )
            .unwrap();
        }

        assert!(matches!(store.get_card("card-iva-t1"), Err(Error::Json(_))));
        assert!(matches!(store.get_card("card-irpf-gomez"), Err(Error::Database(_))));
        assert!(store.find_my_board().is_err());
    }

    #[test]
    fn test_corrupt_history_changes_are_errors() {
        let store = seeded_store();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE sys_card_history SET changes = '{broken' WHERE card_id = 'card-is-panaderia'",
                [],
            )
            .unwrap();
        }
        assert!(matches!(store.get_card("card-is-panaderia"), Err(Error::Json(_))));
    }
}
