//! Effect instances attached to players.

use grimoire_core::ids::EffectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data key set on a `dead` instance once its holder has cast their ghost
/// vote.
pub const GHOST_VOTE_SPENT: &str = "ghost_vote_spent";

/// When an effect instance is swept away automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Stays until explicitly removed.
    Never,
    /// Removed when the night ends.
    EndOfNight,
    /// Removed when the day ends.
    EndOfDay,
}

/// One instance of an effect on a player.
///
/// Several instances of the same type may coexist on a player; they are told
/// apart by position, never by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    /// The effect definition this instance refers to.
    #[serde(rename = "type")]
    pub effect_type: EffectId,
    /// Opaque, content-defined data.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Automatic expiry.
    pub expires_at: Expiry,
}

impl EffectInstance {
    /// Creates a permanent instance with no data.
    #[must_use]
    pub fn new(effect_type: impl Into<EffectId>) -> Self {
        Self {
            effect_type: effect_type.into(),
            data: Map::new(),
            expires_at: Expiry::Never,
        }
    }

    /// Sets the expiry.
    #[must_use]
    pub fn expiring(mut self, expires_at: Expiry) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Adds a data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns a data entry, if present.
    #[must_use]
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns true if this instance is of the given type.
    #[must_use]
    pub fn is(&self, effect_type: &str) -> bool {
        self.effect_type == *effect_type
    }
}
