//! The built-in catalog.

use grimoire_core::error::DomainError;
use grimoire_rules::domain::catalog::Catalog;

use super::{effects, roles};

/// Builds the catalog of every built-in effect and role.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the built-in definitions are
/// inconsistent (duplicate ids, unknown initial effects).
pub fn standard_catalog() -> Result<Catalog, DomainError> {
    let builder = effects::all()
        .into_iter()
        .fold(Catalog::builder(), |builder, effect| builder.effect(effect));
    roles::all()
        .into_iter()
        .fold(builder, |builder, role| builder.role(role))
        .build()
}

#[cfg(test)]
mod tests {
    use grimoire_core::ids::{EffectId, RoleId};
    use grimoire_log::domain::state::Team;

    use super::*;

    #[test]
    fn test_standard_catalog_builds() {
        let catalog = standard_catalog().unwrap();

        assert!(catalog.effects().get(&EffectId::dead()).is_some());
        assert_eq!(catalog.roles().all().count(), 11);
        assert_eq!(catalog.roles().of_team(Team::Demon).count(), 1);
    }

    #[test]
    fn test_night_order_is_unique() {
        let catalog = standard_catalog().unwrap();
        let mut orders: Vec<u32> = catalog.roles().all().filter_map(|r| r.night_order).collect();
        let before = orders.len();
        orders.sort_unstable();
        orders.dedup();
        assert_eq!(orders.len(), before);
    }

    #[test]
    fn test_every_outsider_and_minion_has_an_entry() {
        let catalog = standard_catalog().unwrap();
        for id in [roles::RECLUSE, roles::SAINT_ROLE, roles::POISONER, roles::SPY, roles::SCARLET_WOMAN] {
            assert!(catalog.roles().get(&RoleId::from(id)).is_some(), "{id} missing");
        }
    }
}
