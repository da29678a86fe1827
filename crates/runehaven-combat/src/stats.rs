//! Combatant stat snapshots for players and NPCs.

use serde::{Deserialize, Serialize};

use crate::combat_math::{self, CombatStyle, DamageType};
use crate::profile::AggroProfile;

/// Level assumed whenever a provider is missing.
pub const DEFAULT_LEVEL: u32 = 1;

/// Combat skills read from a stat provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Attack (accuracy)
    Attack,
    /// Strength (max hit)
    Strength,
    /// Defence (evasion)
    Defence,
    /// Hitpoints
    Hitpoints,
}

/// Provides current skill levels.
pub trait SkillSource {
    /// Returns the current level of `skill`, if known.
    fn skill_level(&self, skill: Skill) -> Option<u32>;
}

/// Provides summed equipment bonuses.
pub trait EquipmentSource {
    /// Returns the bonuses of everything currently worn.
    fn equipment_bonuses(&self) -> EquipmentBonuses;
}

/// Summed equipment bonuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentBonuses {
    /// Attack (accuracy) bonus
    pub attack: i32,
    /// Strength bonus
    pub strength: i32,
    /// Defence against melee
    pub melee_defence: i32,
    /// Defence against ranged
    pub ranged_defence: i32,
    /// Defence against magic
    pub magic_defence: i32,
}

impl EquipmentBonuses {
    /// Defence bonus matching an incoming damage type.
    #[must_use]
    pub const fn defence_against(&self, damage_type: DamageType) -> i32 {
        match damage_type {
            DamageType::Melee => self.melee_defence,
            DamageType::Ranged => self.ranged_defence,
            DamageType::Magic => self.magic_defence,
        }
    }
}

/// Attack, strength and defence levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatLevels {
    /// Attack level
    pub attack: u32,
    /// Strength level
    pub strength: u32,
    /// Defence level
    pub defence: u32,
}

impl Default for CombatLevels {
    fn default() -> Self {
        Self {
            attack: DEFAULT_LEVEL,
            strength: DEFAULT_LEVEL,
            defence: DEFAULT_LEVEL,
        }
    }
}

/// Normalized stat snapshot consumed by combat math.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatantStats {
    /// Base levels
    pub levels: CombatLevels,
    /// Equipment bonuses
    pub equipment: EquipmentBonuses,
    /// Attack style
    pub style: CombatStyle,
    /// Damage type used when attacking, or preferred defence type when defending
    pub damage_type: DamageType,
}

impl CombatantStats {
    /// Builds a snapshot from a player's live providers.
    ///
    /// Missing providers fall back to level 1 and zero bonuses.
    #[must_use]
    pub fn for_player(
        skills: Option<&dyn SkillSource>,
        equipment: Option<&dyn EquipmentSource>,
        style: CombatStyle,
        damage_type: DamageType,
    ) -> Self {
        let level = |skill: Skill| {
            skills
                .and_then(|s| s.skill_level(skill))
                .unwrap_or(DEFAULT_LEVEL)
        };
        Self {
            levels: CombatLevels {
                attack: level(Skill::Attack),
                strength: level(Skill::Strength),
                defence: level(Skill::Defence),
            },
            equipment: equipment.map(|e| e.equipment_bonuses()).unwrap_or_default(),
            style,
            damage_type,
        }
    }

    /// Builds a snapshot for an NPC attacker from its profile.
    #[must_use]
    pub fn for_npc(profile: Option<&AggroProfile>) -> Self {
        profile.map_or_else(Self::default, |p| Self {
            levels: p.levels.unwrap_or_default(),
            equipment: p.equipment.unwrap_or_default(),
            style: p.attack_style,
            damage_type: p.attack_type,
        })
    }

    /// Same snapshot with a different damage type.
    #[must_use]
    pub const fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Defence bonus against a damage type.
    #[must_use]
    pub const fn defence_bonus_against(&self, damage_type: DamageType) -> i32 {
        self.equipment.defence_against(damage_type)
    }

    /// Maximum attack roll.
    #[must_use]
    pub fn attack_roll(&self) -> u32 {
        let effective = combat_math::effective_attack(self.levels.attack, self.style);
        combat_math::attack_roll(effective, self.equipment.attack)
    }

    /// Maximum defence roll, using the bonus for this snapshot's damage type.
    #[must_use]
    pub fn defence_roll(&self) -> u32 {
        let effective = combat_math::effective_defence(self.levels.defence, self.style);
        combat_math::defence_roll(effective, self.defence_bonus_against(self.damage_type))
    }

    /// Maximum hit.
    #[must_use]
    pub fn max_hit(&self) -> u32 {
        let effective = combat_math::effective_strength(self.levels.strength, self.style);
        combat_math::max_hit(effective, self.equipment.strength)
    }
}
