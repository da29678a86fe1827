//! Pure combat formulas: effective levels, rolls, hit chance and max hit.
//!
//! Everything here is stateless. Randomness is always supplied by the caller
//! so results are reproducible under a seeded [`fastrand::Rng`].

use serde::{Deserialize, Serialize};

/// Length of one game tick in seconds.
pub const TICK_SECONDS: f32 = 0.6;

/// Ticks between two consecutive strikes of one attack cycle.
pub const ATTACK_INTERVAL_TICKS: u32 = 4;

/// Seconds between two consecutive strikes (`ATTACK_INTERVAL_TICKS * TICK_SECONDS`).
pub const ATTACK_INTERVAL_SECONDS: f32 = 2.4;

/// Maximum distance (world units) at which a melee strike can land.
pub const MELEE_RANGE: f32 = 1.5;

/// Lower bound on distance used for proximity threat, avoids division by zero.
pub const MIN_THREAT_DISTANCE: f32 = 0.1;

/// Flat bonus added to every effective level.
const EFFECTIVE_LEVEL_BASE: u32 = 8;

/// Offset applied to equipment bonuses before multiplying a roll.
const BONUS_OFFSET: i32 = 64;

/// Divisor for the max hit formula.
const MAX_HIT_DIVISOR: f64 = 640.0;

/// Attack style, granting invisible level boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatStyle {
    /// +3 attack
    #[default]
    Accurate,
    /// +3 strength
    Aggressive,
    /// +3 defence
    Defensive,
    /// +1 attack, strength and defence
    Controlled,
}

impl CombatStyle {
    /// Invisible attack level bonus.
    #[must_use]
    pub const fn attack_bonus(self) -> u32 {
        match self {
            Self::Accurate => 3,
            Self::Controlled => 1,
            Self::Aggressive | Self::Defensive => 0,
        }
    }

    /// Invisible strength level bonus.
    #[must_use]
    pub const fn strength_bonus(self) -> u32 {
        match self {
            Self::Aggressive => 3,
            Self::Controlled => 1,
            Self::Accurate | Self::Defensive => 0,
        }
    }

    /// Invisible defence level bonus.
    #[must_use]
    pub const fn defence_bonus(self) -> u32 {
        match self {
            Self::Defensive => 3,
            Self::Controlled => 1,
            Self::Accurate | Self::Aggressive => 0,
        }
    }
}

/// Damage delivery type. Also used as a defender's preferred defence type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DamageType {
    /// Close combat
    #[default]
    Melee,
    /// Bows, thrown weapons
    Ranged,
    /// Spells
    Magic,
}

/// Elemental flavour of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    /// Fire
    Fire,
    /// Water
    Water,
    /// Earth
    Earth,
    /// Air
    Air,
}

/// Effective attack level for a style.
#[must_use]
pub const fn effective_attack(level: u32, style: CombatStyle) -> u32 {
    level
        .saturating_add(style.attack_bonus())
        .saturating_add(EFFECTIVE_LEVEL_BASE)
}

/// Effective strength level for a style.
#[must_use]
pub const fn effective_strength(level: u32, style: CombatStyle) -> u32 {
    level
        .saturating_add(style.strength_bonus())
        .saturating_add(EFFECTIVE_LEVEL_BASE)
}

/// Effective defence level for a style.
#[must_use]
pub const fn effective_defence(level: u32, style: CombatStyle) -> u32 {
    level
        .saturating_add(style.defence_bonus())
        .saturating_add(EFFECTIVE_LEVEL_BASE)
}

fn roll(effective_level: u32, bonus: i32) -> u32 {
    let multiplier = (bonus.saturating_add(BONUS_OFFSET)).max(0) as u32;
    effective_level.saturating_mul(multiplier)
}

/// Maximum attack roll. Bonuses below -64 clamp the roll to 0.
#[must_use]
pub fn attack_roll(effective_attack: u32, attack_bonus: i32) -> u32 {
    roll(effective_attack, attack_bonus)
}

/// Maximum defence roll. Bonuses below -64 clamp the roll to 0.
#[must_use]
pub fn defence_roll(effective_defence: u32, defence_bonus: i32) -> u32 {
    roll(effective_defence, defence_bonus)
}

/// Probability that an attack roll beats a defence roll, in `[0, 1]`.
///
/// An attacker with a zero roll never hits; a defender with a zero roll is
/// always hit (given a non-zero attack roll).
#[must_use]
pub fn chance_to_hit(attack_roll: u32, defence_roll: u32) -> f32 {
    if attack_roll == 0 {
        return 0.0;
    }
    if defence_roll == 0 {
        return 1.0;
    }

    let a = f64::from(attack_roll);
    let d = f64::from(defence_roll);
    let chance = if a > d {
        1.0 - (d + 2.0) / (2.0 * (a + 1.0))
    } else {
        a / (2.0 * (d + 1.0))
    };
    chance.clamp(0.0, 1.0) as f32
}

/// Maximum damage of a single hit.
#[must_use]
pub fn max_hit(effective_strength: u32, strength_bonus: i32) -> u32 {
    let multiplier = f64::from((strength_bonus.saturating_add(BONUS_OFFSET)).max(0));
    let raw = 0.5 + f64::from(effective_strength) * multiplier / MAX_HIT_DIVISOR;
    raw.floor() as u32
}

/// Uniform damage roll in `[0, max_hit]`.
pub fn roll_damage(max_hit: u32, rng: &mut fastrand::Rng) -> u32 {
    rng.u32(0..=max_hit)
}

/// Rolls a hit against the given chance.
pub fn roll_hit(chance: f32, rng: &mut fastrand::Rng) -> bool {
    rng.f32() < chance
}
