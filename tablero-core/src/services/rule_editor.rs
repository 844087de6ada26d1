//! Rule editor - editing session over a column's rules
//!
//! The reducers take the current document and return a new one; they never
//! fail and never touch the network. Addressing a rule that is not there,
//! or a condition index past the end, leaves the document unchanged.
//!
//! `RuleEditor` wraps the reducers in a session: it holds the working copy
//! between `open` and `save`/`cancel`, plus which rule is focused.

use rand::Rng;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Action, ActionKind, ColumnRules, Condition, ConditionKind, CreateColumnRulesDto, Rule, RuleId,
    Trigger, TriggerKind,
};

use super::rule_payload;

/// Replace the column-level switch
pub fn set_enabled(rules: &ColumnRules, enabled: bool) -> ColumnRules {
    ColumnRules {
        enabled,
        rules: rules.rules.clone(),
    }
}

/// Append a default rule named after its position
pub fn add_rule(rules: &ColumnRules) -> ColumnRules {
    push_rule(rules, Rule::new_default(rules.rules.len()))
}

fn push_rule(rules: &ColumnRules, rule: Rule) -> ColumnRules {
    let mut next = rules.clone();
    next.rules.push(rule);
    next
}

pub fn remove_rule(rules: &ColumnRules, rule_id: &RuleId) -> ColumnRules {
    ColumnRules {
        enabled: rules.enabled,
        rules: rules
            .rules
            .iter()
            .filter(|r| &r.id != rule_id)
            .cloned()
            .collect(),
    }
}

pub fn rename_rule(rules: &ColumnRules, rule_id: &RuleId, name: &str) -> ColumnRules {
    update_rule(rules, rule_id, |rule| Rule {
        name: name.to_string(),
        ..rule.clone()
    })
}

pub fn set_rule_enabled(rules: &ColumnRules, rule_id: &RuleId, enabled: bool) -> ColumnRules {
    update_rule(rules, rule_id, |rule| Rule {
        enabled,
        ..rule.clone()
    })
}

/// Switch the trigger kind; the trigger config starts over empty
pub fn set_trigger_type(rules: &ColumnRules, rule_id: &RuleId, kind: TriggerKind) -> ColumnRules {
    update_rule(rules, rule_id, |rule| Rule {
        trigger: Trigger::new(kind.clone()),
        ..rule.clone()
    })
}

/// Append a `has_customer` condition
pub fn add_condition(rules: &ColumnRules, rule_id: &RuleId) -> ColumnRules {
    update_rule(rules, rule_id, |rule| {
        let mut next = rule.clone();
        next.conditions.push(Condition::new(ConditionKind::HasCustomer));
        next
    })
}

/// Switch the kind of the condition at `index`; its config starts over empty
pub fn set_condition_type(
    rules: &ColumnRules,
    rule_id: &RuleId,
    index: usize,
    kind: ConditionKind,
) -> ColumnRules {
    update_rule(rules, rule_id, |rule| {
        let mut next = rule.clone();
        if let Some(slot) = next.conditions.get_mut(index) {
            *slot = Condition::new(kind.clone());
        }
        next
    })
}

/// Remove the condition at `index`, keeping the others in order
pub fn remove_condition_at(rules: &ColumnRules, rule_id: &RuleId, index: usize) -> ColumnRules {
    update_rule(rules, rule_id, |rule| without_condition(rule, index))
}

/// Rule-level form of `remove_condition_at`
pub fn without_condition(rule: &Rule, index: usize) -> Rule {
    Rule {
        conditions: rule
            .conditions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c.clone())
            .collect(),
        ..rule.clone()
    }
}

/// Switch the action kind and re-seed its config for the new kind
pub fn set_action_type(rules: &ColumnRules, rule_id: &RuleId, kind: ActionKind) -> ColumnRules {
    update_rule(rules, rule_id, |rule| Rule {
        action: Action::seeded(kind.clone()),
        ..rule.clone()
    })
}

/// Set one string field of the action config, keeping the other keys
pub fn set_action_config_field(
    rules: &ColumnRules,
    rule_id: &RuleId,
    key: &str,
    value: &str,
) -> ColumnRules {
    update_rule(rules, rule_id, |rule| {
        let mut next = rule.clone();
        next.action.config.insert(key.to_string(), value.into());
        next
    })
}

/// Rebuild the rule list with `f` applied to the rule with `rule_id`
fn update_rule<F>(rules: &ColumnRules, rule_id: &RuleId, f: F) -> ColumnRules
where
    F: Fn(&Rule) -> Rule,
{
    ColumnRules {
        enabled: rules.enabled,
        rules: rules
            .rules
            .iter()
            .map(|r| if &r.id == rule_id { f(r) } else { r.clone() })
            .collect(),
    }
}

/// Editing session state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorState {
    #[default]
    Closed,
    Open {
        working: ColumnRules,
        focused: Option<RuleId>,
    },
}

/// Single-session editor over one column's rules
#[derive(Debug, Default)]
pub struct RuleEditor {
    state: EditorState,
}

impl RuleEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from the column's last saved rules.
    ///
    /// Any unsaved edits from an earlier session are dropped.
    pub fn open(&mut self, initial: Option<ColumnRules>) {
        self.state = EditorState::Open {
            working: initial.unwrap_or_default(),
            focused: None,
        };
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EditorState::Open { .. })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Working copy, if a session is open
    pub fn rules(&self) -> Option<&ColumnRules> {
        match &self.state {
            EditorState::Open { working, .. } => Some(working),
            EditorState::Closed => None,
        }
    }

    /// Rule currently expanded in the host UI
    pub fn focused_rule(&self) -> Option<&RuleId> {
        match &self.state {
            EditorState::Open { focused, .. } => focused.as_ref(),
            EditorState::Closed => None,
        }
    }

    pub fn focus(&mut self, rule_id: Option<RuleId>) -> Result<()> {
        match &mut self.state {
            EditorState::Open { focused, .. } => {
                *focused = rule_id;
                Ok(())
            }
            EditorState::Closed => Err(Error::EditorClosed),
        }
    }

    /// Apply a reducer to the working copy
    pub fn apply<F>(&mut self, reducer: F) -> Result<&ColumnRules>
    where
        F: FnOnce(&ColumnRules) -> ColumnRules,
    {
        match &mut self.state {
            EditorState::Open { working, .. } => {
                *working = reducer(working);
                Ok(working)
            }
            EditorState::Closed => Err(Error::EditorClosed),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<&ColumnRules> {
        self.apply(|r| set_enabled(r, enabled))
    }

    /// Append a default rule and focus it
    pub fn add_rule(&mut self) -> Result<RuleId> {
        let EditorState::Open { working, focused } = &mut self.state else {
            return Err(Error::EditorClosed);
        };
        let rule = Rule::new_default(working.rules.len());
        let id = rule.id.clone();
        *working = push_rule(working, rule);
        *focused = Some(id.clone());
        Ok(id)
    }

    pub fn remove_rule(&mut self, rule_id: &RuleId) -> Result<&ColumnRules> {
        if let EditorState::Open { focused, .. } = &mut self.state {
            if focused.as_ref() == Some(rule_id) {
                *focused = None;
            }
        }
        self.apply(|r| remove_rule(r, rule_id))
    }

    pub fn rename_rule(&mut self, rule_id: &RuleId, name: &str) -> Result<&ColumnRules> {
        self.apply(|r| rename_rule(r, rule_id, name))
    }

    pub fn set_rule_enabled(&mut self, rule_id: &RuleId, enabled: bool) -> Result<&ColumnRules> {
        self.apply(|r| set_rule_enabled(r, rule_id, enabled))
    }

    pub fn set_trigger_type(&mut self, rule_id: &RuleId, kind: TriggerKind) -> Result<&ColumnRules> {
        self.apply(|r| set_trigger_type(r, rule_id, kind))
    }

    pub fn add_condition(&mut self, rule_id: &RuleId) -> Result<&ColumnRules> {
        self.apply(|r| add_condition(r, rule_id))
    }

    pub fn set_condition_type(
        &mut self,
        rule_id: &RuleId,
        index: usize,
        kind: ConditionKind,
    ) -> Result<&ColumnRules> {
        self.apply(|r| set_condition_type(r, rule_id, index, kind))
    }

    pub fn remove_condition_at(&mut self, rule_id: &RuleId, index: usize) -> Result<&ColumnRules> {
        self.apply(|r| remove_condition_at(r, rule_id, index))
    }

    pub fn set_action_type(&mut self, rule_id: &RuleId, kind: ActionKind) -> Result<&ColumnRules> {
        self.apply(|r| set_action_type(r, rule_id, kind))
    }

    pub fn set_action_config_field(
        &mut self,
        rule_id: &RuleId,
        key: &str,
        value: &str,
    ) -> Result<&ColumnRules> {
        self.apply(|r| set_action_config_field(r, rule_id, key, value))
    }

    /// Payload for the current working copy, leaving the session open.
    ///
    /// Fails with [`Error::Validation`] when two rules share an id.
    ///
    /// Used when the save may be rejected and the user should be able to
    /// retry from the same state.
    pub fn payload(&self, column_id: &str) -> Result<CreateColumnRulesDto> {
        self.payload_with(column_id, &mut rand::thread_rng())
    }

    pub fn payload_with<R: Rng + ?Sized>(
        &self,
        column_id: &str,
        rng: &mut R,
    ) -> Result<CreateColumnRulesDto> {
        let rules = self.rules().ok_or(Error::EditorClosed)?;
        rules.validate()?;
        Ok(rule_payload::to_persistable_payload_with(rules, column_id, rng))
    }

    /// Emit the persistable document and close the session
    pub fn save(&mut self, column_id: &str) -> Result<CreateColumnRulesDto> {
        let payload = self.payload(column_id)?;
        self.close();
        Ok(payload)
    }

    /// Discard the working copy and close the session
    pub fn cancel(&mut self) {
        self.close();
    }

    pub(crate) fn close(&mut self) {
        self.state = EditorState::Closed;
    }
}
