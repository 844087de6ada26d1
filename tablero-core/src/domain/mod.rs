//! Core domain entities
//!
//! Pure data structures for boards, cards and column automation rules - no I/O.

mod board;
mod history;
pub mod result;
mod rule;
mod rule_id;

pub use board::{
    Board, BoardColumn, Card, CardCustomer, CardHistory, ColumnDetailsDto, Comment, CreateCardDto,
    CreateColumnDto, CreateCommentDto, HistoryAction, UpdateCardDto,
};
pub use history::HistoryChange;
pub use rule::{
    Action, ActionKind, ColumnRules, Condition, ConditionKind, CreateColumnRulesDto, CreateRuleDto,
    Rule, RuleConfig, Trigger, TriggerKind, UpdateColumnDto,
};
pub use rule_id::RuleId;
