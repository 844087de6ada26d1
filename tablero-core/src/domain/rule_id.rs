//! Rule identity
//!
//! A rule created in the editor has no server identity until the column's
//! rules are saved. Instead of sniffing a string prefix at every use site,
//! the two states are separate variants. The legacy `temp-` wire prefix is
//! resolved exactly once, when a `RuleId` is parsed or deserialized.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire prefix of identifiers that were never persisted
const PENDING_PREFIX: &str = "temp-";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of a pending id
const PENDING_SUFFIX_LEN: usize = 7;

/// Length of the random part of a minted persisted id
const PERSISTED_RANDOM_LEN: usize = 13;

/// How many characters of the column id are embedded in a minted id
const COLUMN_PREFIX_LEN: usize = 8;

/// Identifier of an automation rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleId {
    /// Locally minted, never sent to the server. Holds the token after `temp-`.
    Pending(String),
    /// Assigned or accepted by the server
    Persisted(String),
}

impl RuleId {
    /// Mint a new pending id: `temp-<unix millis>-<random base36>`
    pub fn pending() -> Self {
        Self::pending_with(&mut rand::thread_rng())
    }

    /// Mint a pending id from the given random source
    pub fn pending_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self::Pending(format!("{}-{}", millis, random_base36(rng, PENDING_SUFFIX_LEN)))
    }

    /// Mint a persistable id bound to a column: `rule-<random>-<column prefix>`
    pub fn persisted_for_column<R: Rng + ?Sized>(column_id: &str, rng: &mut R) -> Self {
        let column_prefix: String = column_id.chars().take(COLUMN_PREFIX_LEN).collect();
        Self::Persisted(format!(
            "rule-{}-{}",
            random_base36(rng, PERSISTED_RANDOM_LEN),
            column_prefix
        ))
    }

    /// Parse a wire identifier
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PENDING_PREFIX) {
            Some(token) => Self::Pending(token.to_string()),
            None => Self::Persisted(raw.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Wire form of the identifier
    pub fn as_wire(&self) -> String {
        self.to_string()
    }
}

fn random_base36<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(token) => write!(f, "{}{}", PENDING_PREFIX, token),
            Self::Persisted(id) => f.write_str(id),
        }
    }
}

impl From<&str> for RuleId {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for RuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
