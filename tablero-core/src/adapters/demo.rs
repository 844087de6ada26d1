//! Demo board data
//!
//! A small accounting-office board: three workflow columns, a handful of
//! tax-filing cards with history, and one column that already has rules.

use chrono::{Duration, Utc};
use serde_json::json;

use crate::domain::{
    Action, ActionKind, Board, BoardColumn, Card, CardCustomer, CardHistory, ColumnRules, Comment,
    Condition, ConditionKind, HistoryAction, Rule, RuleConfig, RuleId, Trigger, TriggerKind,
};

pub const DEMO_BOARD_ID: &str = "board-demo";

/// Generate the demo board
pub fn generate_demo_board() -> Board {
    let now = Utc::now();
    let days = Duration::days;

    let mut email = RuleConfig::new();
    email.insert("subject".into(), "Su declaración ha sido presentada".into());
    email.insert("templateName".into(), "card-moved".into());

    let presented_rules = ColumnRules {
        enabled: true,
        rules: vec![Rule {
            id: RuleId::parse("rule-k3v9x2m1q8w7z-col-pres"),
            name: "Avisar al cliente".to_string(),
            enabled: true,
            trigger: Trigger::new(TriggerKind::CardMoved),
            conditions: vec![Condition::new(ConditionKind::HasCustomer)],
            action: Action {
                kind: ActionKind::SendEmail,
                config: email,
            },
        }],
    };

    let customer = |id: &str, name: &str| {
        Some(CardCustomer {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
        })
    };

    let created = |card_id: &str, at| CardHistory {
        id: format!("{}-h1", card_id),
        action: HistoryAction::Created,
        changes: json!({}),
        created_at: at,
        description: None,
    };

    let iva = Card {
        id: "card-iva-t1".to_string(),
        name: "IVA 1T - Ferretería Ruiz".to_string(),
        customer: customer("cust-ruiz", "Ferretería Ruiz"),
        due_date: Some(now + days(5)),
        priority: Some("high".to_string()),
        labels: vec!["iva".to_string(), "trimestral".to_string()],
        description: Some("Modelo 303 del primer trimestre".to_string()),
        history: vec![
            created("card-iva-t1", now - days(20)),
            CardHistory {
                id: "card-iva-t1-h2".to_string(),
                action: HistoryAction::PriorityChanged,
                changes: json!({ "priority": { "old": "medium", "new": "high" } }),
                created_at: now - days(3),
                description: None,
            },
        ],
        comments: vec![Comment {
            id: "comment-iva-t1-1".to_string(),
            content: "Faltan las facturas de marzo".to_string(),
            created_at: now - days(6),
            updated_at: now - days(6),
        }],
        created_at: now - days(20),
        updated_at: now - days(3),
    };

    let irpf = Card {
        id: "card-irpf-gomez".to_string(),
        name: "Renta 2023 - Talleres Gómez".to_string(),
        customer: customer("cust-gomez", "Talleres Gómez"),
        due_date: Some(now + days(30)),
        priority: Some("medium".to_string()),
        labels: vec!["renta".to_string()],
        description: None,
        history: vec![
            created("card-irpf-gomez", now - days(12)),
            CardHistory {
                id: "card-irpf-gomez-h2".to_string(),
                action: HistoryAction::Moved,
                changes: json!({
                    "oldColumnId": "col-pendiente",
                    "oldColumnName": "Pendiente",
                    "newColumnId": "col-en-curso",
                    "newColumnName": "En curso"
                }),
                created_at: now - days(4),
                description: None,
            },
            CardHistory {
                id: "card-irpf-gomez-h3".to_string(),
                action: HistoryAction::DueDateChanged,
                changes: json!({
                    "dueDate": {
                        "old": (now + days(15)).to_rfc3339(),
                        "new": (now + days(30)).to_rfc3339()
                    }
                }),
                created_at: now - days(2),
                description: None,
            },
        ],
        comments: vec![],
        created_at: now - days(12),
        updated_at: now - days(2),
    };

    let sociedades = Card {
        id: "card-is-panaderia".to_string(),
        name: "Impuesto de Sociedades - Panadería Sol".to_string(),
        customer: customer("cust-sol", "Panadería Sol"),
        due_date: Some(now - days(1)),
        priority: Some("low".to_string()),
        labels: vec![],
        description: None,
        history: vec![
            created("card-is-panaderia", now - days(40)),
            CardHistory {
                id: "card-is-panaderia-h2".to_string(),
                action: HistoryAction::CustomerLinked,
                changes: json!({
                    "oldCustomerId": "",
                    "newCustomerId": "cust-sol",
                    "customerName": "Panadería Sol"
                }),
                created_at: now - days(39),
                description: None,
            },
        ],
        comments: vec![],
        created_at: now - days(40),
        updated_at: now - days(1),
    };

    let column = |id: &str, name: &str, order: i32, cards: Vec<Card>, rules: Option<ColumnRules>, color: &str| {
        BoardColumn {
            id: id.to_string(),
            name: name.to_string(),
            cards,
            order,
            rules,
            description: None,
            color: Some(color.to_string()),
            created_at: now - days(60),
            updated_at: now - days(1),
        }
    };

    Board {
        id: DEMO_BOARD_ID.to_string(),
        name: "Despacho".to_string(),
        description: "Seguimiento de declaraciones".to_string(),
        columns: vec![
            column("col-pendiente", "Pendiente", 0, vec![iva], None, "#F59E0B"),
            column("col-en-curso", "En curso", 1, vec![irpf], None, "#3B82F6"),
            column(
                "col-presentado",
                "Presentado",
                2,
                vec![sociedades],
                Some(presented_rules),
                "#10B981",
            ),
        ],
        created_at: now - days(60),
        updated_at: now - days(1),
    }
}
