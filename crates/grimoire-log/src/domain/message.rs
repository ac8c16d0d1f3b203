//! Structured, translatable log messages.
//!
//! Messages never embed display names. They hold a translation key followed
//! by references the presentation layer resolves (player names, role and
//! effect labels) in the operator's language.

use grimoire_core::ids::{EffectId, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessagePart {
    /// A translation key.
    Key(String),
    /// A reference to a player.
    Player(Uuid),
    /// A reference to a role.
    Role(RoleId),
    /// A reference to an effect.
    Effect(EffectId),
    /// A number to interpolate.
    Number(i64),
}

/// A rich-text message attached to a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message parts, in reading order.
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Starts a message with a translation key.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            parts: vec![MessagePart::Key(key.into())],
        }
    }

    /// Appends a player reference.
    #[must_use]
    pub fn player(mut self, id: Uuid) -> Self {
        self.parts.push(MessagePart::Player(id));
        self
    }

    /// Appends a role reference.
    #[must_use]
    pub fn role(mut self, id: impl Into<RoleId>) -> Self {
        self.parts.push(MessagePart::Role(id.into()));
        self
    }

    /// Appends an effect reference.
    #[must_use]
    pub fn effect(mut self, id: impl Into<EffectId>) -> Self {
        self.parts.push(MessagePart::Effect(id.into()));
        self
    }

    /// Appends a number.
    #[must_use]
    pub fn number(mut self, value: i64) -> Self {
        self.parts.push(MessagePart::Number(value));
        self
    }

    /// Returns the leading translation key, if any.
    #[must_use]
    pub fn translation_key(&self) -> Option<&str> {
        match self.parts.first() {
            Some(MessagePart::Key(key)) => Some(key),
            _ => None,
        }
    }
}
