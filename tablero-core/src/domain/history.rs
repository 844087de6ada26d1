//! Card change history payloads
//!
//! The board API sends `changes` as an untyped object whose shape depends on
//! what changed. It is resolved into a `HistoryChange` once, here.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// What a history entry changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryChange {
    Comment {
        comment_id: String,
    },
    Customer {
        old_customer_id: String,
        new_customer_id: String,
        customer_name: String,
    },
    DueDate {
        old: String,
        new: String,
    },
    Name {
        old: String,
        new: String,
    },
    Description {
        old: String,
        new: String,
    },
    /// Bare `{old, new}` date pair
    Date {
        old: String,
        new: String,
    },
    Column {
        old_column_id: String,
        old_column_name: String,
        new_column_id: String,
        new_column_name: String,
    },
    Priority {
        old: String,
        new: String,
    },
    Unknown,
}

impl HistoryChange {
    /// Resolve a raw `changes` object.
    ///
    /// Shapes are checked in a fixed order; the first match wins.
    pub fn from_json(changes: &JsonValue) -> Self {
        let Some(obj) = changes.as_object() else {
            return HistoryChange::Unknown;
        };

        if obj.contains_key("commentId") {
            return HistoryChange::Comment {
                comment_id: text(obj.get("commentId")),
            };
        }

        if obj.contains_key("oldCustomerId") && obj.contains_key("newCustomerId") {
            return HistoryChange::Customer {
                old_customer_id: text(obj.get("oldCustomerId")),
                new_customer_id: text(obj.get("newCustomerId")),
                customer_name: text(obj.get("customerName")),
            };
        }

        if let Some(due) = obj.get("dueDate") {
            let (old, new) = old_new(due);
            return HistoryChange::DueDate { old, new };
        }

        if let Some(name) = obj.get("name") {
            let (old, new) = old_new(name);
            return HistoryChange::Name { old, new };
        }

        if let Some(description) = obj.get("description") {
            let (old, new) = old_new(description);
            return HistoryChange::Description { old, new };
        }

        if is_bare_date_pair(obj) {
            return HistoryChange::Date {
                old: text(obj.get("old")),
                new: text(obj.get("new")),
            };
        }

        if obj.contains_key("oldColumnId") && obj.contains_key("newColumnId") {
            return HistoryChange::Column {
                old_column_id: text(obj.get("oldColumnId")),
                old_column_name: text(obj.get("oldColumnName")),
                new_column_id: text(obj.get("newColumnId")),
                new_column_name: text(obj.get("newColumnName")),
            };
        }

        if let Some(priority) = obj.get("priority") {
            let (old, new) = old_new(priority);
            return HistoryChange::Priority { old, new };
        }

        HistoryChange::Unknown
    }
}

fn is_bare_date_pair(obj: &Map<String, JsonValue>) -> bool {
    obj.contains_key("new")
        && obj.get("old").map(JsonValue::is_string).unwrap_or(false)
        && !obj.contains_key("name")
}

fn old_new(value: &JsonValue) -> (String, String) {
    (text(value.get("old")), text(value.get("new")))
}

fn text(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolves_each_shape() {
        assert_eq!(
            HistoryChange::from_json(&json!({ "commentId": "cm1" })),
            HistoryChange::Comment { comment_id: "cm1".into() }
        );
        assert_eq!(
            HistoryChange::from_json(&json!({
                "oldCustomerId": "a", "newCustomerId": "b", "customerName": "Talleres Gómez"
            })),
            HistoryChange::Customer {
                old_customer_id: "a".into(),
                new_customer_id: "b".into(),
                customer_name: "Talleres Gómez".into(),
            }
        );
        assert_eq!(
            HistoryChange::from_json(&json!({
                "dueDate": { "old": "2024-01-01", "new": "2024-02-01" }
            })),
            HistoryChange::DueDate { old: "2024-01-01".into(), new: "2024-02-01".into() }
        );
        assert_eq!(
            HistoryChange::from_json(&json!({ "name": { "old": "A", "new": "B" } })),
            HistoryChange::Name { old: "A".into(), new: "B".into() }
        );
        assert_eq!(
            HistoryChange::from_json(&json!({ "old": "2024-01-01", "new": "2024-03-01" })),
            HistoryChange::Date { old: "2024-01-01".into(), new: "2024-03-01".into() }
        );
        assert!(matches!(
            HistoryChange::from_json(&json!({
                "oldColumnId": "c1", "oldColumnName": "Pendiente",
                "newColumnId": "c2", "newColumnName": "En curso"
            })),
            HistoryChange::Column { .. }
        ));
        assert!(matches!(
            HistoryChange::from_json(&json!({ "priority": { "old": "low", "new": "high" } })),
            HistoryChange::Priority { .. }
        ));
    }

    #[test]
    fn test_precedence_comment_over_everything() {
        let change = HistoryChange::from_json(&json!({
            "commentId": "cm1",
            "name": { "old": "A", "new": "B" }
        }));
        assert!(matches!(change, HistoryChange::Comment { .. }));
    }

    #[test]
    fn test_old_new_with_name_is_a_name_change() {
        let change = HistoryChange::from_json(&json!({
            "old": "x", "new": "y", "name": { "old": "A", "new": "B" }
        }));
        assert!(matches!(change, HistoryChange::Name { .. }));
    }

    #[test]
    fn test_non_string_old_is_not_a_date_pair() {
        let change = HistoryChange::from_json(&json!({ "old": 1, "new": 2 }));
        assert_eq!(change, HistoryChange::Unknown);
    }

    #[test]
    fn test_unknown_shapes() {
        assert_eq!(HistoryChange::from_json(&json!({})), HistoryChange::Unknown);
        assert_eq!(HistoryChange::from_json(&JsonValue::Null), HistoryChange::Unknown);
        assert_eq!(HistoryChange::from_json(&json!(["a"])), HistoryChange::Unknown);
    }
}
