//! Column automation rule schema
//!
//! A rule is `trigger -> conditions -> action`, scoped to one board column.
//! Kinds form a closed vocabulary, but values the client does not know are
//! kept verbatim in `Other` so documents written by a newer server survive a
//! load/save cycle untouched.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};
use super::rule_id::RuleId;

/// Open key/value configuration attached to a trigger, condition or action
pub type RuleConfig = Map<String, JsonValue>;

macro_rules! wire_kind {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A kind this client does not recognise, preserved as received
            Other(String),
        }

        impl $name {
            /// All kinds this client knows about, in display order
            pub const KNOWN: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Other(raw) => raw.as_str(),
                }
            }

            pub fn parse(raw: &str) -> Self {
                match raw {
                    $($wire => $name::$variant,)+
                    other => $name::Other(other.to_string()),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::parse(&raw))
            }
        }
    };
}

wire_kind! {
    /// Event class that starts rule evaluation
    TriggerKind {
        CardCreated => "card_created",
        CardMoved => "card_moved",
        DueDateApproaching => "due_date_approaching",
    }
}

wire_kind! {
    /// Predicate that must hold for the action to fire
    ConditionKind {
        HasCustomer => "has_customer",
        HasDueDate => "has_due_date",
        HasLabel => "has_label",
        CustomFieldValue => "custom_field_value",
    }
}

wire_kind! {
    /// Effect performed when the trigger fires and all conditions hold
    ActionKind {
        SendEmail => "send_email",
        MoveToColumn => "move_to_column",
        AssignDueDate => "assign_due_date",
        AddLabel => "add_label",
        NotifyUser => "notify_user",
    }
}

impl ActionKind {
    /// Config an action is re-seeded with when its kind is switched
    pub fn default_config(&self) -> RuleConfig {
        let mut config = RuleConfig::new();
        if *self == ActionKind::SendEmail {
            config.insert("subject".into(), "Notification".into());
            config.insert("templateName".into(), "card-moved".into());
        }
        config
    }
}

/// Rule trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default, deserialize_with = "config_or_empty")]
    pub config: RuleConfig,
}

/// Rule condition. Conditions have no identity of their own; their position
/// in the rule is the only way to address them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default, deserialize_with = "config_or_empty")]
    pub config: RuleConfig,
}

/// Rule action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, deserialize_with = "config_or_empty")]
    pub config: RuleConfig,
}

/// `config: null` is treated like a missing config.
///
/// Both are written back as `{}`, so only the `type` of an unknown kind is
/// guaranteed to survive byte for byte.
fn config_or_empty<'de, D>(deserializer: D) -> std::result::Result<RuleConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RuleConfig>::deserialize(deserializer)?.unwrap_or_default())
}

impl Trigger {
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            config: RuleConfig::new(),
        }
    }
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            config: RuleConfig::new(),
        }
    }
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            config: RuleConfig::new(),
        }
    }

    /// Action with its kind's default config
    pub fn seeded(kind: ActionKind) -> Self {
        let config = kind.default_config();
        Self { kind, config }
    }

    /// String value of a config key, if present and a string
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(JsonValue::as_str)
    }
}

/// One automation rule attached to a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub enabled: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub action: Action,
}

impl Rule {
    /// The rule the editor appends on "add".
    ///
    /// Deterministic apart from the pending id.
    pub fn new_default(existing_count: usize) -> Self {
        Self::new_default_with_id(RuleId::pending(), existing_count)
    }

    pub(crate) fn new_default_with_id(id: RuleId, existing_count: usize) -> Self {
        let mut email = RuleConfig::new();
        email.insert("subject".into(), "Notificación".into());
        email.insert("templateName".into(), "card-moved".into());

        Self {
            id,
            name: format!("Regla {}", existing_count + 1),
            enabled: true,
            trigger: Trigger::new(TriggerKind::CardMoved),
            conditions: vec![Condition::new(ConditionKind::HasCustomer)],
            action: Action {
                kind: ActionKind::SendEmail,
                config: email,
            },
        }
    }
}

/// The rule set of one column.
///
/// `enabled == false` disables every rule in the set regardless of the
/// rules' own flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRules {
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl ColumnRules {
    /// The document a column without prior rules starts from
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rule(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    pub fn has_pending_rules(&self) -> bool {
        self.rules.iter().any(|r| r.id.is_pending())
    }

    /// Check that every rule id appears once
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(&rule.id) {
                return Err(Error::validation(format!("duplicate rule id '{}'", rule.id)));
            }
        }
        Ok(())
    }
}

/// A rule ready to be sent to the board API: its id is never pending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRuleDto {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub trigger: Trigger,
    pub conditions: Vec<Condition>,
    pub action: Action,
}

/// Whole-document payload for a column's rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateColumnRulesDto {
    pub enabled: bool,
    pub rules: Vec<CreateRuleDto>,
}

/// Body of the column update request
#[derive(Debug, Clone, Serialize)]
pub struct UpdateColumnDto<'a> {
    pub rules: &'a CreateColumnRulesDto,
}

impl From<CreateColumnRulesDto> for ColumnRules {
    fn from(dto: CreateColumnRulesDto) -> Self {
        Self {
            enabled: dto.enabled,
            rules: dto
                .rules
                .into_iter()
                .map(|r| Rule {
                    id: RuleId::parse(&r.id),
                    name: r.name,
                    enabled: r.enabled,
                    trigger: r.trigger,
                    conditions: r.conditions,
                    action: r.action,
                })
                .collect(),
        }
    }
}
