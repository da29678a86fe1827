//! Hit/miss resolution between two combatants.

use runehaven_common::EntityId;
use tracing::trace;

use crate::combat_math::{self, Element};
use crate::stats::CombatantStats;
use crate::world::{CombatWorld, Strike};

/// Result of one resolved attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackReport {
    /// Whether the accuracy roll succeeded
    pub hit: bool,
    /// Hit chance used for the roll
    pub chance: f32,
    /// Damage rolled before the target's modifiers
    pub rolled: u32,
    /// Damage the target actually took
    pub applied: u32,
}

impl AttackReport {
    const fn miss(chance: f32) -> Self {
        Self {
            hit: false,
            chance,
            rolled: 0,
            applied: 0,
        }
    }
}

/// Resolves an attack from `attacker` against `target`.
///
/// A miss never reaches the target. A hit rolls damage up to the attacker's
/// max hit and delivers it through the world, which applies the target's own
/// modifiers and credits.
pub fn resolve_attack<W>(
    world: &mut W,
    attacker: EntityId,
    attacker_stats: &CombatantStats,
    element: Option<Element>,
    target: EntityId,
    rng: &mut fastrand::Rng,
) -> AttackReport
where
    W: CombatWorld + ?Sized,
{
    let defender_stats = world.defender_stats(target);
    let chance = combat_math::chance_to_hit(
        attacker_stats.attack_roll(),
        defender_stats.defence_roll(),
    );

    if !combat_math::roll_hit(chance, rng) {
        trace!("{} missed {} (chance {:.3})", attacker, target, chance);
        return AttackReport::miss(chance);
    }

    let rolled = combat_math::roll_damage(attacker_stats.max_hit(), rng);
    let strike = Strike::new(rolled, attacker_stats.damage_type).with_element(element);
    let applied = world.deliver(target, strike, Some(attacker));
    trace!(
        "{} hit {} for {} ({} rolled)",
        attacker,
        target,
        applied,
        rolled
    );

    AttackReport {
        hit: true,
        chance,
        rolled,
        applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_math::DamageType;
    use crate::stats::{CombatLevels, EquipmentBonuses};
    use glam::Vec2;
    use runehaven_common::FactionId;

    /// World with a single target that records delivered strikes.
    struct MockWorld {
        defender: CombatantStats,
        delivered: Vec<(EntityId, Strike, Option<EntityId>)>,
    }

    impl MockWorld {
        fn new(defender: CombatantStats) -> Self {
            Self {
                defender,
                delivered: Vec::new(),
            }
        }
    }

    impl CombatWorld for MockWorld {
        fn is_alive(&self, _entity: EntityId) -> bool {
            true
        }

        fn position(&self, _entity: EntityId) -> Option<Vec2> {
            Some(Vec2::ZERO)
        }

        fn hostile_npcs(&self, _npc: EntityId, _faction: FactionId) -> Vec<EntityId> {
            Vec::new()
        }

        fn defender_stats(&self, _entity: EntityId) -> CombatantStats {
            self.defender
        }

        fn is_player_controlled(&self, _entity: EntityId) -> bool {
            false
        }

        fn deliver(&mut self, target: EntityId, strike: Strike, source: Option<EntityId>) -> u32 {
            self.delivered.push((target, strike, source));
            strike.amount
        }
    }

    fn strong_attacker() -> CombatantStats {
        CombatantStats {
            levels: CombatLevels {
                attack: 99,
                strength: 99,
                defence: 99,
            },
            equipment: EquipmentBonuses {
                attack: 100,
                strength: 100,
                ..EquipmentBonuses::default()
            },
            ..CombatantStats::default()
        }
    }

    #[test]
    fn test_zero_defence_always_hits() {
        let defender = CombatantStats {
            equipment: EquipmentBonuses {
                melee_defence: -64,
                ..EquipmentBonuses::default()
            },
            ..CombatantStats::default()
        };
        let mut world = MockWorld::new(defender);
        let mut rng = fastrand::Rng::with_seed(1);
        let attacker = EntityId::new();
        let target = EntityId::new();

        for _ in 0..20 {
            let report = resolve_attack(
                &mut world,
                attacker,
                &strong_attacker(),
                Some(Element::Fire),
                target,
                &mut rng,
            );
            assert!(report.hit);
            assert_eq!(report.chance, 1.0);
            assert_eq!(report.rolled, report.applied);
        }
        assert_eq!(world.delivered.len(), 20);
        let (to, strike, from) = world.delivered[0];
        assert_eq!(to, target);
        assert_eq!(from, Some(attacker));
        assert_eq!(strike.element, Some(Element::Fire));
        assert_eq!(strike.damage_type, DamageType::Melee);
    }

    #[test]
    fn test_zero_attack_never_hits() {
        let mut world = MockWorld::new(CombatantStats::default());
        let mut rng = fastrand::Rng::with_seed(2);
        let attacker_stats = CombatantStats {
            equipment: EquipmentBonuses {
                attack: -64,
                ..EquipmentBonuses::default()
            },
            ..CombatantStats::default()
        };

        for _ in 0..20 {
            let report = resolve_attack(
                &mut world,
                EntityId::new(),
                &attacker_stats,
                None,
                EntityId::new(),
                &mut rng,
            );
            assert!(!report.hit);
            assert_eq!(report.applied, 0);
        }
        assert!(world.delivered.is_empty());
    }

    #[test]
    fn test_rolled_damage_within_max_hit() {
        let mut world = MockWorld::new(CombatantStats::default());
        let mut rng = fastrand::Rng::with_seed(3);
        let stats = strong_attacker();
        let max = stats.max_hit();

        for _ in 0..200 {
            let report = resolve_attack(
                &mut world,
                EntityId::new(),
                &stats,
                None,
                EntityId::new(),
                &mut rng,
            );
            assert!(report.rolled <= max);
        }
    }
}
