//! Ability effect resolution.
//!
//! Catalog effects carry formula strings (`"iq+5*r"`) that are not evaluated
//! yet. [`FixedDeltaResolver`] applies flat placeholder amounts instead; a
//! formula evaluator can be dropped in by implementing [`EffectResolver`].

use crate::catalog::{Ability, Effect};
use crate::hex::HexCoord;
use crate::unit::Unit;
use serde::{Deserialize, Serialize};

/// Damage dealt by any damage effect under [`FixedDeltaResolver::default`]
pub const PLACEHOLDER_DAMAGE: u32 = 5;

/// Health restored by any heal effect under [`FixedDeltaResolver::default`]
pub const PLACEHOLDER_HEAL: u32 = 3;

/// State changes produced by one ability use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectOutcome {
    /// Health change for the unit on the target cell (negative for damage)
    pub target_health: i32,
    /// Where the caster ends up, for movement effects
    pub caster_moves_to: Option<HexCoord>,
}

/// Turns an ability use into concrete state changes.
///
/// Called after the target has been validated; implementations must not
/// assume `target_unit` is present for tile or self abilities.
pub trait EffectResolver {
    fn resolve(
        &self,
        ability: &Ability,
        caster: &Unit,
        target: HexCoord,
        target_unit: Option<&Unit>,
    ) -> EffectOutcome;
}

/// Flat damage and heal amounts, ignoring the catalog formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDeltaResolver {
    pub damage: u32,
    pub heal: u32,
}

impl Default for FixedDeltaResolver {
    fn default() -> Self {
        Self {
            damage: PLACEHOLDER_DAMAGE,
            heal: PLACEHOLDER_HEAL,
        }
    }
}

impl EffectResolver for FixedDeltaResolver {
    fn resolve(
        &self,
        ability: &Ability,
        _caster: &Unit,
        target: HexCoord,
        _target_unit: Option<&Unit>,
    ) -> EffectOutcome {
        match ability.effect {
            Effect::Damage { .. } => EffectOutcome {
                target_health: -(self.damage as i32),
                caster_moves_to: None,
            },
            Effect::Heal { .. } => EffectOutcome {
                target_health: self.heal as i32,
                caster_moves_to: None,
            },
            Effect::Teleport { .. } => EffectOutcome {
                target_health: 0,
                caster_moves_to: Some(target),
            },
            // Modifiers are not tracked on units yet
            Effect::Buff { .. } | Effect::Debuff { .. } => EffectOutcome::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_fixed_deltas() {
        let caster = Unit::new(HexCoord::new(0, 0), Some(0), "goblin", "wizard").unwrap();
        let target = HexCoord::new(1, 0);
        let resolver = FixedDeltaResolver::default();

        let poke = caster.ability(2).unwrap();
        assert_eq!(
            resolver.resolve(poke, &caster, target, None).target_health,
            -(PLACEHOLDER_DAMAGE as i32)
        );

        let heal = caster.ability(4).unwrap();
        assert_eq!(
            resolver.resolve(heal, &caster, target, None).target_health,
            PLACEHOLDER_HEAL as i32
        );

        let charge = caster.ability(1).unwrap();
        assert_eq!(
            resolver.resolve(charge, &caster, target, None),
            EffectOutcome {
                target_health: 0,
                caster_moves_to: Some(target),
            }
        );
    }

    #[test]
    fn test_buffs_do_nothing_yet() {
        let caster = Unit::new(HexCoord::new(0, 0), Some(0), "dwarf", "wizard").unwrap();
        let thick_skin = &catalog::race("dwarf").unwrap().abilities[0];
        let outcome =
            FixedDeltaResolver::default().resolve(thick_skin, &caster, caster.pos, Some(&caster));
        assert_eq!(outcome, EffectOutcome::default());
    }
}
