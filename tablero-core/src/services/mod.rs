//! Service layer - business logic orchestration
//!
//! The rule editor reducers and payload adapter are pure; the board, demo
//! and logging services coordinate them with the gateways and local files.

mod board;
mod demo;
pub mod formatters;
pub mod logging;
pub mod migration;
pub mod rule_editor;
pub mod rule_payload;
pub mod summary;

pub use board::{BoardService, HistoryLine};
pub use demo::{DemoService, DEMO_DB_FILE};
pub use formatters::{ChangesFormatter, DateFormatter};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use rule_editor::{EditorState, RuleEditor};
pub use rule_payload::to_persistable_payload;
