//! One-line rule descriptions for list display
//!
//! Derived text only; nothing here is persisted. Every mapping is total and
//! falls back to "Desconocido" for kinds the client does not know.

use crate::domain::{ActionKind, ConditionKind, Rule, RuleConfig, TriggerKind};

const UNKNOWN: &str = "Desconocido";

pub fn describe_trigger(kind: &TriggerKind) -> String {
    match kind {
        TriggerKind::CardCreated => "Cuando una tarjeta es creada",
        TriggerKind::CardMoved => "Cuando una tarjeta es movida a esta columna",
        TriggerKind::DueDateApproaching => "Cuando una fecha de vencimiento se acerca",
        TriggerKind::Other(_) => UNKNOWN,
    }
    .to_string()
}

pub fn describe_condition(kind: &ConditionKind) -> String {
    match kind {
        ConditionKind::HasCustomer => "La tarjeta tiene un cliente",
        ConditionKind::HasDueDate => "La tarjeta tiene una fecha de vencimiento",
        ConditionKind::HasLabel => "La tarjeta tiene una etiqueta específica",
        ConditionKind::CustomFieldValue => "El campo personalizado tiene un valor",
        ConditionKind::Other(_) => UNKNOWN,
    }
    .to_string()
}

pub fn describe_action(kind: &ActionKind, config: Option<&RuleConfig>) -> String {
    match kind {
        ActionKind::SendEmail => {
            let subject = config
                .and_then(|c| c.get("subject"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("Notificación");
            format!("Enviar correo electrónico: {}", subject)
        }
        ActionKind::MoveToColumn => "Mover a otra columna".to_string(),
        ActionKind::AssignDueDate => "Asignar fecha de vencimiento".to_string(),
        ActionKind::AddLabel => "Agregar etiqueta".to_string(),
        ActionKind::NotifyUser => "Notificar usuario".to_string(),
        ActionKind::Other(_) => UNKNOWN.to_string(),
    }
}

/// `"{Activa|Inactiva} - {trigger}[ cuando {first condition}[ y N más condiciones]] entonces {action}"`
///
/// Only the first condition is named; the rest are counted.
pub fn describe_rule(rule: &Rule) -> String {
    let mut line = format!(
        "{} - {}",
        if rule.enabled { "Activa" } else { "Inactiva" },
        describe_trigger(&rule.trigger.kind)
    );

    if let Some(first) = rule.conditions.first() {
        line.push_str(" cuando ");
        line.push_str(&describe_condition(&first.kind));
    }
    if rule.conditions.len() > 1 {
        line.push_str(&format!(" y {} más condiciones", rule.conditions.len() - 1));
    }

    line.push_str(" entonces ");
    line.push_str(&describe_action(&rule.action.kind, Some(&rule.action.config)));
    line
}

/// Short option label for a trigger kind
pub fn trigger_label(kind: &TriggerKind) -> &str {
    match kind {
        TriggerKind::CardCreated => "Tarjeta creada",
        TriggerKind::CardMoved => "Tarjeta movida a esta columna",
        TriggerKind::DueDateApproaching => "Fecha de vencimiento cercana",
        TriggerKind::Other(raw) => raw,
    }
}

/// Short option label for a condition kind
pub fn condition_label(kind: &ConditionKind) -> &str {
    match kind {
        ConditionKind::HasCustomer => "Tiene cliente",
        ConditionKind::HasDueDate => "Tiene fecha de vencimiento",
        ConditionKind::HasLabel => "Tiene etiqueta",
        ConditionKind::CustomFieldValue => "Valor de campo personalizado",
        ConditionKind::Other(raw) => raw,
    }
}

/// Short option label for an action kind
pub fn action_label(kind: &ActionKind) -> &str {
    match kind {
        ActionKind::SendEmail => "Enviar correo electrónico",
        ActionKind::MoveToColumn => "Mover a columna",
        ActionKind::AssignDueDate => "Asignar fecha de vencimiento",
        ActionKind::AddLabel => "Agregar etiqueta",
        ActionKind::NotifyUser => "Notificar usuario",
        ActionKind::Other(raw) => raw,
    }
}
