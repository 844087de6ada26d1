//! Board service - board page operations
//!
//! Sits between a [`BoardGateway`] and its callers: opens rule editing
//! sessions and writes the persistable payload back in a single request,
//! and runs the column, card and comment writes of the board page.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Board, BoardColumn, Card, ColumnDetailsDto, ColumnRules, Comment, CreateCardDto,
    CreateColumnDto, CreateColumnRulesDto, CreateCommentDto, HistoryAction, UpdateCardDto,
};
use crate::ports::BoardGateway;
use crate::services::formatters::{ChangesFormatter, DateFormatter};
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::rule_editor::RuleEditor;

/// One rendered line of a card's history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLine {
    pub created_at: DateTime<Utc>,
    pub action: HistoryAction,
    pub description: String,
}

pub struct BoardService {
    gateway: Arc<dyn BoardGateway>,
    changes: ChangesFormatter,
    logger: Option<Arc<LoggingService>>,
}

impl BoardService {
    pub fn new(gateway: Arc<dyn BoardGateway>) -> Self {
        Self {
            gateway,
            changes: ChangesFormatter::new(DateFormatter::new()),
            logger: None,
        }
    }

    /// Record save outcomes in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    pub fn board(&self) -> Result<Board> {
        self.gateway.find_my_board()
    }

    pub fn column(&self, column_id: &str) -> Result<BoardColumn> {
        self.board()?
            .columns
            .into_iter()
            .find(|c| c.id == column_id)
            .ok_or_else(|| Error::not_found(format!("column {}", column_id)))
    }

    /// Current rules of a column, empty when it never had any
    pub fn column_rules(&self, column_id: &str) -> Result<ColumnRules> {
        Ok(self.column(column_id)?.rules_or_default())
    }

    /// Editor session opened on the column's current rules
    pub fn open_editor(&self, column_id: &str) -> Result<RuleEditor> {
        let column = self.column(column_id)?;
        let mut editor = RuleEditor::new();
        editor.open(column.rules);
        Ok(editor)
    }

    /// Write a whole rules document to a column
    ///
    /// Any gateway failure comes back as [`Error::PersistRejected`].
    pub fn save_column_rules(
        &self,
        column_id: &str,
        rules: &CreateColumnRulesDto,
    ) -> Result<BoardColumn> {
        match self.gateway.update_column_rules(column_id, rules) {
            Ok(column) => {
                self.log(
                    LogEvent::new("rules_saved")
                        .with_board(self.gateway.name())
                        .with_column(column_id),
                );
                Ok(column)
            }
            Err(e) => {
                self.log(
                    LogEvent::new("rules_save_failed")
                        .with_board(self.gateway.name())
                        .with_column(column_id)
                        .with_error(e.to_string()),
                );
                Err(Error::PersistRejected(e.to_string()))
            }
        }
    }

    /// Persist an editor session; it closes only when the save succeeds
    pub fn save_editor(&self, editor: &mut RuleEditor, column_id: &str) -> Result<BoardColumn> {
        let payload = editor.payload(column_id)?;
        let column = self.save_column_rules(column_id, &payload)?;
        editor.close();
        Ok(column)
    }

    /// History of a card, oldest first
    pub fn card_history(&self, card_id: &str) -> Result<Vec<HistoryLine>> {
        let card = self.gateway.get_card(card_id)?;
        let mut lines: Vec<HistoryLine> = card
            .history
            .iter()
            .map(|entry| {
                let formatted = self.changes.format(&entry.change());
                let description = if formatted.is_empty() {
                    entry
                        .description
                        .clone()
                        .unwrap_or_else(|| entry.action.as_str().to_string())
                } else {
                    formatted
                };
                HistoryLine {
                    created_at: entry.created_at,
                    action: entry.action,
                    description,
                }
            })
            .collect();
        lines.sort_by_key(|l| l.created_at);
        Ok(lines)
    }

    pub fn card(&self, card_id: &str) -> Result<Card> {
        self.gateway.get_card(card_id)
    }

    // === Board page writes ===

    /// Add a column at the end of the user's board
    pub fn create_column(
        &self,
        name: &str,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<BoardColumn> {
        let board = self.board()?;
        let column = self.gateway.create_column(&CreateColumnDto {
            name: name.to_string(),
            board_id: board.id,
            description,
            color,
        })?;
        self.log_write("column_created", &column.id);
        Ok(column)
    }

    pub fn update_column(&self, column_id: &str, details: &ColumnDetailsDto) -> Result<BoardColumn> {
        if details.is_empty() {
            return Err(Error::validation("nothing to update"));
        }
        let column = self.gateway.update_column(column_id, details)?;
        self.log_write("column_updated", column_id);
        Ok(column)
    }

    pub fn delete_column(&self, column_id: &str) -> Result<BoardColumn> {
        let board = self.board()?;
        let column = self.gateway.delete_column(&board.id, column_id)?;
        self.log_write("column_deleted", column_id);
        Ok(column)
    }

    pub fn create_card(
        &self,
        column_id: &str,
        name: &str,
        description: &str,
        due_date: DateTime<Utc>,
    ) -> Result<Card> {
        let card = self.gateway.create_card(&CreateCardDto {
            name: name.to_string(),
            description: description.to_string(),
            due_date,
            column_id: column_id.to_string(),
        })?;
        self.log_write("card_created", column_id);
        Ok(card)
    }

    /// Move a card to another column of the board
    pub fn move_card(&self, card_id: &str, column_id: &str) -> Result<Card> {
        self.column(column_id)?;
        let card = self.gateway.update_card(card_id, &UpdateCardDto::move_to(column_id))?;
        self.log_write("card_moved", column_id);
        Ok(card)
    }

    pub fn update_card(&self, card_id: &str, changes: &UpdateCardDto) -> Result<Card> {
        if changes.is_empty() {
            return Err(Error::validation("nothing to update"));
        }
        let card = self.gateway.update_card(card_id, changes)?;
        self.log(LogEvent::new("card_updated").with_board(self.gateway.name()));
        Ok(card)
    }

    pub fn add_comment(&self, card_id: &str, content: &str) -> Result<Comment> {
        let comment = self.gateway.add_comment(&CreateCommentDto {
            content: content.to_string(),
            card_id: card_id.to_string(),
        })?;
        self.log(LogEvent::new("comment_added").with_board(self.gateway.name()));
        Ok(comment)
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
        let comment = self.gateway.delete_comment(comment_id)?;
        self.log(LogEvent::new("comment_deleted").with_board(self.gateway.name()));
        Ok(comment)
    }

    pub fn link_customer(&self, card_id: &str, customer_id: &str) -> Result<Card> {
        let card = self.gateway.link_customer(card_id, customer_id)?;
        self.log(LogEvent::new("customer_linked").with_board(self.gateway.name()));
        Ok(card)
    }

    pub fn unlink_customer(&self, card_id: &str) -> Result<Card> {
        let card = self.gateway.unlink_customer(card_id)?;
        self.log(LogEvent::new("customer_unlinked").with_board(self.gateway.name()));
        Ok(card)
    }

    fn log_write(&self, event: &str, column_id: &str) {
        self.log(
            LogEvent::new(event)
                .with_board(self.gateway.name())
                .with_column(column_id),
        );
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::generate_demo_board;
    use crate::adapters::duckdb::DuckDbBoardStore;
    use crate::services::logging::EntryPoint;
    use tempfile::tempdir;

    /// Gateway whose writes always fail
    struct RejectingGateway {
        board: Board,
    }

    impl BoardGateway for RejectingGateway {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn find_my_board(&self) -> Result<Board> {
            Ok(self.board.clone())
        }

        fn update_column_rules(&self, _: &str, _: &CreateColumnRulesDto) -> Result<BoardColumn> {
            Err(rejected())
        }

        fn get_card(&self, card_id: &str) -> Result<Card> {
            Err(Error::not_found(card_id))
        }

        fn create_column(&self, _: &CreateColumnDto) -> Result<BoardColumn> {
            Err(rejected())
        }

        fn update_column(&self, _: &str, _: &ColumnDetailsDto) -> Result<BoardColumn> {
            Err(rejected())
        }

        fn delete_column(&self, _: &str, _: &str) -> Result<BoardColumn> {
            Err(rejected())
        }

        fn create_card(&self, _: &CreateCardDto) -> Result<Card> {
            Err(rejected())
        }

        fn update_card(&self, _: &str, _: &UpdateCardDto) -> Result<Card> {
            Err(rejected())
        }

        fn add_comment(&self, _: &CreateCommentDto) -> Result<Comment> {
            Err(rejected())
        }

        fn delete_comment(&self, _: &str) -> Result<Comment> {
            Err(rejected())
        }

        fn link_customer(&self, _: &str, _: &str) -> Result<Card> {
            Err(rejected())
        }

        fn unlink_customer(&self, _: &str) -> Result<Card> {
            Err(rejected())
        }
    }

    fn rejected() -> Error {
        Error::Http {
            status: 500,
            body: "boom".to_string(),
        }
    }

    fn demo_service() -> BoardService {
        let store = DuckDbBoardStore::in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.seed(&generate_demo_board()).unwrap();
        BoardService::new(Arc::new(store))
    }

    #[test]
    fn test_column_lookup() {
        let service = demo_service();

        assert_eq!(service.column("col-en-curso").unwrap().name, "En curso");
        assert!(matches!(service.column("nope"), Err(Error::NotFound(_))));
        assert_eq!(service.column_rules("col-pendiente").unwrap(), ColumnRules::empty());
    }

    #[test]
    fn test_save_editor_closes_session() {
        let service = demo_service();
        let mut editor = service.open_editor("col-pendiente").unwrap();
        editor.set_enabled(true).unwrap();
        editor.add_rule().unwrap();

        let column = service.save_editor(&mut editor, "col-pendiente").unwrap();
        assert!(!editor.is_open());
        assert!(column.rules_enabled());
        assert!(!column.rules_or_default().has_pending_rules());
    }

    #[test]
    fn test_rejected_save_keeps_session_and_logs() {
        let dir = tempdir().unwrap();
        let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Library, "test").unwrap());
        let service = BoardService::new(Arc::new(RejectingGateway {
            board: generate_demo_board(),
        }))
        .with_logger(logger.clone());

        let mut editor = service.open_editor("col-pendiente").unwrap();
        let id = editor.add_rule().unwrap();

        let err = service.save_editor(&mut editor, "col-pendiente").unwrap_err();
        assert!(matches!(err, Error::PersistRejected(_)));
        assert!(err.to_string().starts_with("Error al actualizar las reglas"));

        assert!(editor.is_open());
        assert!(editor.rules().unwrap().rule(&id).is_some());

        let errors = logger.get_errors(10).unwrap();
        assert_eq!(errors[0].event, "rules_save_failed");
        assert_eq!(errors[0].column.as_deref(), Some("col-pendiente"));
    }

    #[test]
    fn test_card_history_lines() {
        let service = demo_service();
        let lines = service.card_history("card-irpf-gomez").unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].action, HistoryAction::Created);
        assert_eq!(lines[0].description, "CREATED");
        assert_eq!(lines[1].description, "Movida de \"Pendiente\" a \"En curso\"");
        assert!(lines[2].description.starts_with("Fecha límite cambiada de "));
    }

    #[test]
    fn test_move_card_shows_up_in_history() {
        let service = demo_service();
        service.move_card("card-iva-t1", "col-presentado").unwrap();

        let lines = service.card_history("card-iva-t1").unwrap();
        assert_eq!(
            lines.last().unwrap().description,
            "Movida de \"Pendiente\" a \"Presentado\""
        );
        assert!(matches!(
            service.move_card("card-iva-t1", "nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_board_writes_are_logged() {
        let dir = tempdir().unwrap();
        let logger = Arc::new(LoggingService::new(dir.path(), EntryPoint::Library, "test").unwrap());
        let service = demo_service().with_logger(logger.clone());

        let column = service.create_column("Archivado", None, None).unwrap();
        let card = service
            .create_card(&column.id, "Modelo 347", "", Utc::now())
            .unwrap();
        let comment = service.add_comment(&card.id, "Revisado").unwrap();
        service.delete_comment(&comment.id).unwrap();

        let events: Vec<String> = logger
            .get_recent(10)
            .unwrap()
            .into_iter()
            .map(|e| e.event)
            .collect();
        for expected in ["column_created", "card_created", "comment_added", "comment_deleted"] {
            assert!(events.iter().any(|e| e == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_empty_updates_are_rejected() {
        let service = demo_service();
        assert!(matches!(
            service.update_card("card-iva-t1", &UpdateCardDto::default()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.update_column("col-pendiente", &ColumnDetailsDto::default()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_delete_column_uses_board_id() {
        let service = demo_service();
        let column = service.create_column("Temporal", None, Some("#000000".into())).unwrap();
        let deleted = service.delete_column(&column.id).unwrap();
        assert_eq!(deleted.id, column.id);
        assert_eq!(service.board().unwrap().columns.len(), 3);
    }
}
