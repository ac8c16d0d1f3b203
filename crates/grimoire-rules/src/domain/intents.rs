//! Proposed game actions.

use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::history::KillCause;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A proposed action awaiting resolution. Never stored directly; only the
/// changes it produces reach the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Kill a player.
    Kill {
        /// The player whose ability kills, if any.
        source_id: Option<Uuid>,
        /// The player to kill.
        target_id: Uuid,
        /// Why the player dies.
        cause: KillCause,
    },
    /// Nominate a player for execution.
    Nominate {
        /// The nominating player.
        nominator_id: Uuid,
        /// The nominated player.
        nominee_id: Uuid,
    },
    /// Execute a player.
    Execute {
        /// The player to execute.
        player_id: Uuid,
    },
    /// Place an effect instance on a player through an ability.
    ApplyEffect {
        /// The player whose ability applies the effect.
        source_id: Option<Uuid>,
        /// The receiving player.
        target_id: Uuid,
        /// The instance to place.
        effect: EffectInstance,
    },
}

/// The tag of an [`Intent`], used to match handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// [`Intent::Kill`].
    Kill,
    /// [`Intent::Nominate`].
    Nominate,
    /// [`Intent::Execute`].
    Execute,
    /// [`Intent::ApplyEffect`].
    ApplyEffect,
}

impl Intent {
    /// Returns the intent's tag.
    #[must_use]
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Kill { .. } => IntentKind::Kill,
            Self::Nominate { .. } => IntentKind::Nominate,
            Self::Execute { .. } => IntentKind::Execute,
            Self::ApplyEffect { .. } => IntentKind::ApplyEffect,
        }
    }

    /// The player the intent acts upon.
    #[must_use]
    pub fn target(&self) -> Uuid {
        match self {
            Self::Kill { target_id, .. } | Self::ApplyEffect { target_id, .. } => *target_id,
            Self::Nominate { nominee_id, .. } => *nominee_id,
            Self::Execute { player_id } => *player_id,
        }
    }

    /// The player behind the intent, if any.
    #[must_use]
    pub fn source(&self) -> Option<Uuid> {
        match self {
            Self::Kill { source_id, .. } | Self::ApplyEffect { source_id, .. } => *source_id,
            Self::Nominate { nominator_id, .. } => Some(*nominator_id),
            Self::Execute { .. } => None,
        }
    }

    /// Returns a copy aimed at another player. Nominations keep their
    /// nominator and change the nominee.
    #[must_use]
    pub fn retarget(&self, target: Uuid) -> Self {
        let mut next = self.clone();
        match &mut next {
            Self::Kill { target_id, .. } | Self::ApplyEffect { target_id, .. } => *target_id = target,
            Self::Nominate { nominee_id, .. } => *nominee_id = target,
            Self::Execute { player_id } => *player_id = target,
        }
        next
    }
}
