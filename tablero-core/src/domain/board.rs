//! Board model
//!
//! The board is owned by the board API. Reads return whole entities; writes
//! go through the request bodies defined at the bottom of this file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::history::HistoryChange;
use super::rule::ColumnRules;

/// The user's task board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<BoardColumn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn column(&self, column_id: &str) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    /// Columns sorted by their board position
    pub fn ordered_columns(&self) -> Vec<&BoardColumn> {
        let mut columns: Vec<&BoardColumn> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }
}

/// A lane on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<ColumnRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardColumn {
    /// Current rules, or the empty document when the column never had any
    pub fn rules_or_default(&self) -> ColumnRules {
        self.rules.clone().unwrap_or_default()
    }

    pub fn rules_enabled(&self) -> bool {
        self.rules.as_ref().map(|r| r.enabled).unwrap_or(false)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.as_ref().map(|r| r.rules.len()).unwrap_or(0)
    }
}

/// Customer linked to a card (partial view)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCustomer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A card on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub customer: Option<CardCustomer>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub history: Vec<CardHistory>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment left on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of event recorded in a card's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Created,
    Updated,
    Moved,
    CommentAdded,
    CustomerLinked,
    CustomerUnlinked,
    DueDateChanged,
    CommentDeleted,
    PriorityChanged,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "CREATED",
            HistoryAction::Updated => "UPDATED",
            HistoryAction::Moved => "MOVED",
            HistoryAction::CommentAdded => "COMMENT_ADDED",
            HistoryAction::CustomerLinked => "CUSTOMER_LINKED",
            HistoryAction::CustomerUnlinked => "CUSTOMER_UNLINKED",
            HistoryAction::DueDateChanged => "DUE_DATE_CHANGED",
            HistoryAction::CommentDeleted => "COMMENT_DELETED",
            HistoryAction::PriorityChanged => "PRIORITY_CHANGED",
        }
    }
}

/// One history entry of a card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHistory {
    pub id: String,
    pub action: HistoryAction,
    #[serde(default)]
    pub changes: JsonValue,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CardHistory {
    /// Typed view of `changes`
    pub fn change(&self) -> HistoryChange {
        HistoryChange::from_json(&self.changes)
    }
}

// === Request bodies ===

/// New column on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnDto {
    pub name: String,
    pub board_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Partial update of a column's details; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetailsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ColumnDetailsDto {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none()
    }
}

/// New card in a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardDto {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub column_id: String,
}

/// Partial update of a card. Setting `column_id` moves the card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl UpdateCardDto {
    /// Update that only moves the card to another column
    pub fn move_to(column_id: impl Into<String>) -> Self {
        Self {
            column_id: Some(column_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// New comment on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentDto {
    pub content: String,
    pub card_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board_json() -> JsonValue {
        json!({
            "id": "b1",
            "name": "Despacho",
            "description": "",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "columns": [
                {
                    "id": "c2", "name": "Presentado", "order": 2, "cards": [],
                    "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"
                },
                {
                    "id": "c1", "name": "Pendiente", "order": 1,
                    "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z",
                    "rules": { "enabled": true, "rules": [] },
                    "cards": [{
                        "id": "k1", "name": "IVA T1",
                        "customer": { "id": "cu1", "name": "Ferretería Ruiz" },
                        "labels": ["iva"],
                        "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z",
                        "history": [{
                            "id": "h1", "action": "PRIORITY_CHANGED",
                            "changes": { "priority": { "old": "low", "new": "high" } },
                            "createdAt": "2024-01-02T00:00:00Z"
                        }]
                    }]
                }
            ]
        })
    }

    #[test]
    fn test_board_deserializes_from_api_shape() {
        let board: Board = serde_json::from_value(board_json()).unwrap();

        assert_eq!(board.columns.len(), 2);
        let ordered: Vec<&str> = board.ordered_columns().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ordered, vec!["c1", "c2"]);

        let pending = board.column("c1").unwrap();
        assert!(pending.rules_enabled());
        assert_eq!(pending.cards[0].history[0].action, HistoryAction::PriorityChanged);
        assert!(matches!(
            pending.cards[0].history[0].change(),
            HistoryChange::Priority { .. }
        ));
    }

    #[test]
    fn test_card_update_serializes_only_set_fields() {
        let body = serde_json::to_value(UpdateCardDto::move_to("col-en-curso")).unwrap();
        assert_eq!(body, json!({ "columnId": "col-en-curso" }));

        assert!(UpdateCardDto::default().is_empty());
        assert!(!UpdateCardDto::move_to("c").is_empty());
        assert!(ColumnDetailsDto::default().is_empty());
    }

    #[test]
    fn test_comments_default_to_empty() {
        let board: Board = serde_json::from_value(board_json()).unwrap();
        let card = &board.column("c1").unwrap().cards[0];
        assert!(card.comments.is_empty());

        let comment: Comment = serde_json::from_value(json!({
            "id": "cm1", "content": "Falta el modelo 303",
            "createdAt": "2024-01-03T00:00:00Z", "updatedAt": "2024-01-03T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(comment.content, "Falta el modelo 303");
    }

    #[test]
    fn test_column_without_rules_defaults_to_empty() {
        let board: Board = serde_json::from_value(board_json()).unwrap();
        let column = board.column("c2").unwrap();

        assert!(column.rules.is_none());
        assert_eq!(column.rules_or_default(), ColumnRules::empty());
        assert_eq!(column.rule_count(), 0);
        assert!(!column.rules_enabled());
    }
}
