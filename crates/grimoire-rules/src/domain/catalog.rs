//! Effect and role registries.

use std::collections::BTreeMap;

use grimoire_core::error::DomainError;
use grimoire_core::ids::{EffectId, RoleId};
use grimoire_log::domain::effects::EffectInstance;
use grimoire_log::domain::state::{PlayerState, Team};
use serde::{Deserialize, Serialize};

use super::definitions::{EffectDefinition, EffectKind, RoleDefinition};
use super::perception::is_configured;

/// How an effect instance is presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum EffectClass {
    /// The instance makes its holder's ability malfunction.
    Malfunction,
    /// The holder may register as something else. `configured` is true once
    /// no player holding the instance would be listed as ambiguous for any
    /// aspect.
    Misregistration {
        /// Whether the operator's choice is stored on the instance.
        configured: bool,
    },
    /// Any other effect, by its definition's kind.
    Plain {
        /// The definition's kind.
        kind: EffectKind,
    },
}

/// Effect definitions by id.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    definitions: BTreeMap<EffectId, EffectDefinition>,
}

impl EffectRegistry {
    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: &EffectId) -> Option<&EffectDefinition> {
        self.definitions.get(id)
    }

    /// Looks up the definition of an instance.
    #[must_use]
    pub fn definition_of(&self, instance: &EffectInstance) -> Option<&EffectDefinition> {
        self.get(&instance.effect_type)
    }

    /// All definitions, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values()
    }

    /// Returns true if any of the player's effects poisons their ability.
    #[must_use]
    pub fn is_malfunctioning(&self, player: &PlayerState) -> bool {
        player
            .effects
            .iter()
            .filter_map(|instance| self.definition_of(instance))
            .any(|def| def.poisons_ability)
    }

    /// Classifies an instance for display.
    #[must_use]
    pub fn classify(instance: &EffectInstance, def: &EffectDefinition) -> EffectClass {
        if def.poisons_ability {
            return EffectClass::Malfunction;
        }
        if let Some(range) = &def.can_register_as {
            return EffectClass::Misregistration {
                configured: is_configured(instance, range),
            };
        }
        EffectClass::Plain { kind: def.kind }
    }
}

/// Role definitions by id.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<RoleId, RoleDefinition>,
}

impl RoleRegistry {
    /// Looks up a role.
    #[must_use]
    pub fn get(&self, id: &RoleId) -> Option<&RoleDefinition> {
        self.roles.get(id)
    }

    /// All roles, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    /// Roles of one team, ordered by id.
    pub fn of_team(&self, team: Team) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values().filter(move |role| role.team == team)
    }
}

/// The immutable content catalog: every effect and role the engine knows.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    effects: EffectRegistry,
    roles: RoleRegistry,
}

impl Catalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The effect registry.
    #[must_use]
    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    /// The role registry.
    #[must_use]
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Looks up a role, failing with `UnknownRole`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownRole` if the role is not registered.
    pub fn role(&self, id: &RoleId) -> Result<&RoleDefinition, DomainError> {
        self.roles
            .get(id)
            .ok_or_else(|| DomainError::UnknownRole(id.clone()))
    }
}

/// Collects definitions and checks them before producing a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    effects: Vec<EffectDefinition>,
    roles: Vec<RoleDefinition>,
}

impl CatalogBuilder {
    /// Registers an effect.
    #[must_use]
    pub fn effect(mut self, definition: EffectDefinition) -> Self {
        self.effects.push(definition);
        self
    }

    /// Registers a role.
    #[must_use]
    pub fn role(mut self, definition: RoleDefinition) -> Self {
        self.roles.push(definition);
        self
    }

    /// Builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on duplicate ids, if the `dead`
    /// effect is missing, or if a role's initial effect is not registered.
    pub fn build(self) -> Result<Catalog, DomainError> {
        let mut effects = BTreeMap::new();
        for definition in self.effects {
            let id = definition.id.clone();
            if effects.insert(id.clone(), definition).is_some() {
                return Err(DomainError::Validation(format!(
                    "effect {id} is registered twice"
                )));
            }
        }
        if !effects.contains_key(&EffectId::dead()) {
            return Err(DomainError::Validation(
                "the dead effect must be registered".to_owned(),
            ));
        }

        let mut roles = BTreeMap::new();
        for definition in self.roles {
            if let Some(missing) = definition
                .initial_effects
                .iter()
                .find(|instance| !effects.contains_key(&instance.effect_type))
            {
                return Err(DomainError::Validation(format!(
                    "role {} starts with unknown effect {}",
                    definition.id, missing.effect_type
                )));
            }
            let id = definition.id.clone();
            if roles.insert(id.clone(), definition).is_some() {
                return Err(DomainError::Validation(format!(
                    "role {id} is registered twice"
                )));
            }
        }

        Ok(Catalog {
            effects: EffectRegistry {
                definitions: effects,
            },
            roles: RoleRegistry { roles },
        })
    }
}
