//! Lookup seams between an NPC's combat state and the world around it.

use glam::Vec2;
use runehaven_common::{EntityId, FactionId};

use crate::combat_math::{DamageType, Element};
use crate::stats::CombatantStats;

/// A single strike about to land, before the target's own modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Rolled damage
    pub amount: u32,
    /// Delivery type
    pub damage_type: DamageType,
    /// Elemental flavour
    pub element: Option<Element>,
}

impl Strike {
    /// Creates a plain strike with no element.
    #[must_use]
    pub const fn new(amount: u32, damage_type: DamageType) -> Self {
        Self {
            amount,
            damage_type,
            element: None,
        }
    }

    /// Adds an element.
    #[must_use]
    pub const fn with_element(mut self, element: Option<Element>) -> Self {
        self.element = element;
        self
    }
}

/// Who dealt a hit, resolved by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageSource {
    /// Attacking entity
    pub entity: EntityId,
    /// Whether the attacker is the player or owned by the player
    pub player_controlled: bool,
    /// Whether the attacker can itself be targeted back
    pub targetable: bool,
}

/// A strike together with its resolved source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingHit {
    /// The strike
    pub strike: Strike,
    /// Resolved attacker, `None` for environmental damage
    pub source: Option<DamageSource>,
}

/// Something that can be attacked.
pub trait CombatTarget {
    /// Identity.
    fn id(&self) -> EntityId;
    /// Whether the target can currently be hit.
    fn is_alive(&self) -> bool;
    /// World position.
    fn position(&self) -> Vec2;
    /// Damage type this target defends against best.
    fn preferred_defence_type(&self) -> DamageType;
    /// Applies a hit at game time `now`, returning the damage actually dealt.
    fn apply_damage(&mut self, hit: IncomingHit, now: f64) -> u32;
}

/// Narrow view of the world an NPC needs during its updates.
///
/// Unknown ids are never an error: they read as dead, positionless targets.
pub trait CombatWorld {
    /// Whether `entity` exists and is alive.
    fn is_alive(&self, entity: EntityId) -> bool;

    /// Position of `entity`.
    fn position(&self, entity: EntityId) -> Option<Vec2>;

    /// Living NPCs whose faction `faction` is hostile to, excluding `npc`.
    fn hostile_npcs(&self, npc: EntityId, faction: FactionId) -> Vec<EntityId>;

    /// Stats `entity` defends with.
    fn defender_stats(&self, entity: EntityId) -> CombatantStats;

    /// Whether `entity` is the player or owned (transitively) by the player.
    fn is_player_controlled(&self, entity: EntityId) -> bool;

    /// Delivers a strike from `source` to `target`, returning the damage dealt.
    fn deliver(&mut self, target: EntityId, strike: Strike, source: Option<EntityId>) -> u32;
}
