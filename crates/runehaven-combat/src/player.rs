//! The player as a combat participant.

use glam::Vec2;
use runehaven_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::combat_math::{CombatStyle, DamageType};
use crate::stats::{CombatantStats, EquipmentBonuses, EquipmentSource, Skill, SkillSource};
use crate::world::{CombatTarget, IncomingHit};

/// Trained skill levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillLevels {
    /// Attack level
    pub attack: u32,
    /// Strength level
    pub strength: u32,
    /// Defence level
    pub defence: u32,
    /// Hitpoints level
    pub hitpoints: u32,
}

impl Default for SkillLevels {
    fn default() -> Self {
        Self {
            attack: 1,
            strength: 1,
            defence: 1,
            hitpoints: 10,
        }
    }
}

impl SkillSource for SkillLevels {
    fn skill_level(&self, skill: Skill) -> Option<u32> {
        Some(match skill {
            Skill::Attack => self.attack,
            Skill::Strength => self.strength,
            Skill::Defence => self.defence,
            Skill::Hitpoints => self.hitpoints,
        })
    }
}

/// Player combat state.
#[derive(Debug, Clone)]
pub struct PlayerCombatant {
    id: EntityId,
    position: Vec2,
    skills: SkillLevels,
    equipment: EquipmentBonuses,
    style: CombatStyle,
    attack_type: DamageType,
    defence_type: DamageType,
    current_hp: u32,
    last_attacker: Option<EntityId>,
}

impl PlayerCombatant {
    /// Creates a player at `position` with full hitpoints.
    #[must_use]
    pub fn new(id: EntityId, position: Vec2, skills: SkillLevels) -> Self {
        Self {
            id,
            position,
            skills,
            equipment: EquipmentBonuses::default(),
            style: CombatStyle::default(),
            attack_type: DamageType::Melee,
            defence_type: DamageType::Melee,
            current_hp: skills.hitpoints.max(1),
            last_attacker: None,
        }
    }

    /// Sets worn equipment bonuses.
    #[must_use]
    pub const fn with_equipment(mut self, equipment: EquipmentBonuses) -> Self {
        self.equipment = equipment;
        self
    }

    /// Sets the attack style.
    #[must_use]
    pub const fn with_style(mut self, style: CombatStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the attack damage type.
    #[must_use]
    pub const fn with_attack_type(mut self, attack_type: DamageType) -> Self {
        self.attack_type = attack_type;
        self
    }

    /// Sets the preferred defence type.
    #[must_use]
    pub const fn with_defence_type(mut self, defence_type: DamageType) -> Self {
        self.defence_type = defence_type;
        self
    }

    /// Current hitpoints.
    #[must_use]
    pub const fn current_hp(&self) -> u32 {
        self.current_hp
    }

    /// Maximum hitpoints.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        if self.skills.hitpoints == 0 {
            1
        } else {
            self.skills.hitpoints
        }
    }

    /// Last entity that damaged the player.
    #[must_use]
    pub const fn last_attacker(&self) -> Option<EntityId> {
        self.last_attacker
    }

    /// Attack style.
    #[must_use]
    pub const fn style(&self) -> CombatStyle {
        self.style
    }

    /// Changes the attack style.
    pub fn set_style(&mut self, style: CombatStyle) {
        self.style = style;
    }

    /// Moves the player.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Stats the player attacks with.
    #[must_use]
    pub fn attack_stats(&self) -> CombatantStats {
        CombatantStats::for_player(Some(self), Some(self), self.style, self.attack_type)
    }

    /// Stats the player defends with.
    #[must_use]
    pub fn defender_stats(&self) -> CombatantStats {
        CombatantStats::for_player(Some(self), Some(self), self.style, self.defence_type)
    }

    /// Restores full hitpoints.
    pub fn revive(&mut self) {
        self.current_hp = self.max_hp();
        self.last_attacker = None;
    }
}

impl SkillSource for PlayerCombatant {
    fn skill_level(&self, skill: Skill) -> Option<u32> {
        self.skills.skill_level(skill)
    }
}

impl EquipmentSource for PlayerCombatant {
    fn equipment_bonuses(&self) -> EquipmentBonuses {
        self.equipment
    }
}

impl CombatTarget for PlayerCombatant {
    fn id(&self) -> EntityId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn preferred_defence_type(&self) -> DamageType {
        self.defence_type
    }

    fn apply_damage(&mut self, hit: IncomingHit, _now: f64) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let amount = hit.strike.amount;
        self.current_hp = self.current_hp.saturating_sub(amount);
        if let Some(source) = hit.source {
            self.last_attacker = Some(source.entity);
        }
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Strike;

    fn player() -> PlayerCombatant {
        PlayerCombatant::new(
            EntityId::new(),
            Vec2::ZERO,
            SkillLevels {
                attack: 30,
                strength: 25,
                defence: 20,
                hitpoints: 15,
            },
        )
    }

    #[test]
    fn test_damage_and_revive() {
        let mut player = player();
        let attacker = EntityId::new();
        let hit = IncomingHit {
            strike: Strike::new(9, DamageType::Melee),
            source: Some(crate::world::DamageSource {
                entity: attacker,
                player_controlled: false,
                targetable: true,
            }),
        };

        assert_eq!(player.apply_damage(hit, 0.0), 9);
        assert_eq!(player.current_hp(), 6);
        assert_eq!(player.last_attacker(), Some(attacker));

        player.apply_damage(hit, 1.0);
        assert!(!player.is_alive());
        assert_eq!(player.apply_damage(hit, 2.0), 0);

        player.revive();
        assert_eq!(player.current_hp(), 15);
        assert!(player.is_alive());
    }

    #[test]
    fn test_stats_follow_live_skills() {
        let player = player()
            .with_style(CombatStyle::Defensive)
            .with_defence_type(DamageType::Ranged)
            .with_equipment(EquipmentBonuses {
                ranged_defence: 16,
                ..EquipmentBonuses::default()
            });

        let attack = player.attack_stats();
        assert_eq!(attack.levels.attack, 30);
        assert_eq!(attack.damage_type, DamageType::Melee);

        let defence = player.defender_stats();
        assert_eq!(defence.damage_type, DamageType::Ranged);
        // (20 + 3 + 8) * (16 + 64)
        assert_eq!(defence.defence_roll(), 31 * 80);
    }
}
