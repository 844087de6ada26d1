//! Conversion of editor state into the document the board API stores
//!
//! Rules created during the session carry a pending id; each one gets a
//! fresh identifier bound to the target column. Rules that already have a
//! server identity pass through unchanged so the server updates them
//! instead of recreating them.

use rand::Rng;

use crate::domain::{ColumnRules, CreateColumnRulesDto, CreateRuleDto, Rule, RuleId};

/// Build the persistable payload using the thread RNG for new ids
pub fn to_persistable_payload(rules: &ColumnRules, column_id: &str) -> CreateColumnRulesDto {
    to_persistable_payload_with(rules, column_id, &mut rand::thread_rng())
}

/// Build the persistable payload with an explicit random source
pub fn to_persistable_payload_with<R: Rng + ?Sized>(
    rules: &ColumnRules,
    column_id: &str,
    rng: &mut R,
) -> CreateColumnRulesDto {
    CreateColumnRulesDto {
        enabled: rules.enabled,
        rules: rules
            .rules
            .iter()
            .map(|rule| to_create_dto(rule, column_id, rng))
            .collect(),
    }
}

fn to_create_dto<R: Rng + ?Sized>(rule: &Rule, column_id: &str, rng: &mut R) -> CreateRuleDto {
    let id = match &rule.id {
        RuleId::Pending(_) => RuleId::persisted_for_column(column_id, rng).as_wire(),
        RuleId::Persisted(id) => id.clone(),
    };

    CreateRuleDto {
        id,
        name: rule.name.clone(),
        enabled: rule.enabled,
        trigger: rule.trigger.clone(),
        conditions: rule.conditions.clone(),
        action: rule.action.clone(),
    }
}
