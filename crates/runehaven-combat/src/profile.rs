//! Static aggro profiles and the registry they are loaded into.

use std::collections::BTreeMap;
use std::path::Path;

use runehaven_common::RunehavenError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::combat_math::{CombatStyle, DamageType, Element};
use crate::stats::{CombatLevels, EquipmentBonuses};

/// Profile table compiled into the crate.
const BUILTIN_PROFILES: &str = include_str!("../assets/profiles.ron");

/// Profile error types.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Reading a profile file failed
    #[error("Failed to read profiles: {0}")]
    Io(#[from] std::io::Error),
    /// RON parse failure
    #[error("Failed to parse profiles: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Profile not in the registry
    #[error("Unknown aggro profile: {0}")]
    Unknown(String),
    /// Profile values out of range
    #[error("Invalid aggro profile '{name}': {reason}")]
    Invalid {
        /// Profile name
        name: String,
        /// What is wrong
        reason: String,
    },
}

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

impl From<ProfileError> for RunehavenError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Io(e) => Self::Io(e),
            ProfileError::Parse(e) => Self::serialization(e),
            ProfileError::Unknown(name) => Self::InvalidData {
                source_name: name,
                reason: "unknown aggro profile".to_string(),
            },
            ProfileError::Invalid { name, reason } => Self::InvalidData {
                source_name: name,
                reason,
            },
        }
    }
}

/// Damage adjustment applied when an attack carries a matching element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementalModifier {
    /// Element this modifier reacts to
    pub element: Element,
    /// Percentage of damage absorbed
    #[serde(default)]
    pub protection_percent: f32,
    /// Percentage of extra damage taken
    #[serde(default)]
    pub bonus_percent: f32,
}

impl ElementalModifier {
    /// Creates a modifier.
    #[must_use]
    pub const fn new(element: Element, protection_percent: f32, bonus_percent: f32) -> Self {
        Self {
            element,
            protection_percent,
            bonus_percent,
        }
    }

    /// Adjusts a raw damage amount, rounding to the nearest integer.
    #[must_use]
    pub fn apply(&self, amount: u32) -> u32 {
        let scaled = amount as f32
            * (1.0 - self.protection_percent / 100.0)
            * (1.0 + self.bonus_percent / 100.0);
        if scaled.is_finite() {
            scaled.max(0.0).round() as u32
        } else {
            0
        }
    }
}

/// Static combat parameters of an NPC type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggroProfile {
    /// Display name, filled from the registry key when empty
    pub name: String,
    /// Radius around the spawn point in which targets are tracked
    pub aggro_range: f32,
    /// Seconds without damage before an out-of-range target is dropped
    pub aggro_timeout_seconds: f32,
    /// Maximum number of simultaneously engaged targets
    pub max_concurrent_targets: usize,
    /// Whether the NPC seeks targets on its own
    pub is_aggressive: bool,
    /// Multiplier for threat generated by the player
    pub player_aggro_weight: f32,
    /// Damage type of the NPC's attacks
    pub attack_type: DamageType,
    /// Element carried by the NPC's attacks
    pub attack_element: Option<Element>,
    /// Damage type the NPC defends against best
    pub defence_type: DamageType,
    /// Attack style used for effective levels
    pub attack_style: CombatStyle,
    /// Maximum hitpoints
    pub hitpoints_level: u32,
    /// Seconds until respawn after death, 0 disables respawning
    pub respawn_seconds: f32,
    /// Elemental damage adjustments, first match wins
    pub elemental_modifiers: Vec<ElementalModifier>,
    /// Combat level overrides (level 1 otherwise)
    pub levels: Option<CombatLevels>,
    /// Equipment bonus overrides (zero otherwise)
    pub equipment: Option<EquipmentBonuses>,
}

impl Default for AggroProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            aggro_range: 5.0,
            aggro_timeout_seconds: 10.0,
            max_concurrent_targets: 1,
            is_aggressive: false,
            player_aggro_weight: 1.0,
            attack_type: DamageType::Melee,
            attack_element: None,
            defence_type: DamageType::Melee,
            attack_style: CombatStyle::Accurate,
            hitpoints_level: 10,
            respawn_seconds: 0.0,
            elemental_modifiers: Vec::new(),
            levels: None,
            equipment: None,
        }
    }
}

impl AggroProfile {
    /// Creates a default profile with a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the aggro range.
    #[must_use]
    pub const fn with_aggro_range(mut self, range: f32) -> Self {
        self.aggro_range = range;
        self
    }

    /// Sets the aggro timeout.
    #[must_use]
    pub const fn with_aggro_timeout(mut self, seconds: f32) -> Self {
        self.aggro_timeout_seconds = seconds;
        self
    }

    /// Sets the concurrent target cap.
    #[must_use]
    pub const fn with_max_targets(mut self, max: usize) -> Self {
        self.max_concurrent_targets = max;
        self
    }

    /// Sets whether the NPC seeks targets on its own.
    #[must_use]
    pub const fn with_aggressive(mut self, aggressive: bool) -> Self {
        self.is_aggressive = aggressive;
        self
    }

    /// Sets the player threat multiplier.
    #[must_use]
    pub const fn with_player_weight(mut self, weight: f32) -> Self {
        self.player_aggro_weight = weight;
        self
    }

    /// Sets the attack damage type.
    #[must_use]
    pub const fn with_attack_type(mut self, attack_type: DamageType) -> Self {
        self.attack_type = attack_type;
        self
    }

    /// Sets the attack element.
    #[must_use]
    pub const fn with_attack_element(mut self, element: Element) -> Self {
        self.attack_element = Some(element);
        self
    }

    /// Sets the preferred defence type.
    #[must_use]
    pub const fn with_defence_type(mut self, defence_type: DamageType) -> Self {
        self.defence_type = defence_type;
        self
    }

    /// Sets maximum hitpoints.
    #[must_use]
    pub const fn with_hitpoints(mut self, hitpoints: u32) -> Self {
        self.hitpoints_level = hitpoints;
        self
    }

    /// Sets the respawn delay.
    #[must_use]
    pub const fn with_respawn(mut self, seconds: f32) -> Self {
        self.respawn_seconds = seconds;
        self
    }

    /// Sets the combat level overrides.
    #[must_use]
    pub const fn with_levels(mut self, levels: CombatLevels) -> Self {
        self.levels = Some(levels);
        self
    }

    /// Sets the equipment bonus overrides.
    #[must_use]
    pub const fn with_equipment(mut self, equipment: EquipmentBonuses) -> Self {
        self.equipment = Some(equipment);
        self
    }

    /// Appends an elemental modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: ElementalModifier) -> Self {
        self.elemental_modifiers.push(modifier);
        self
    }

    /// First modifier reacting to `element`.
    #[must_use]
    pub fn modifier_for(&self, element: Element) -> Option<&ElementalModifier> {
        self.elemental_modifiers
            .iter()
            .find(|m| m.element == element)
    }

    /// Applies the elemental table to incoming damage.
    #[must_use]
    pub fn mitigate(&self, amount: u32, element: Option<Element>) -> u32 {
        element
            .and_then(|e| self.modifier_for(e))
            .map_or(amount, |m| m.apply(amount))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> ProfileResult<()> {
        let invalid = |reason: &str| ProfileError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if !self.aggro_range.is_finite() || self.aggro_range < 0.0 {
            return Err(invalid("aggro_range must be a non-negative number"));
        }
        if !self.aggro_timeout_seconds.is_finite() || self.aggro_timeout_seconds < 0.0 {
            return Err(invalid("aggro_timeout_seconds must be a non-negative number"));
        }
        if self.max_concurrent_targets == 0 {
            return Err(invalid("max_concurrent_targets must be at least 1"));
        }
        if !self.player_aggro_weight.is_finite() || self.player_aggro_weight < 0.0 {
            return Err(invalid("player_aggro_weight must be a non-negative number"));
        }
        if self.hitpoints_level == 0 {
            return Err(invalid("hitpoints_level must be at least 1"));
        }
        if !self.respawn_seconds.is_finite() || self.respawn_seconds < 0.0 {
            return Err(invalid("respawn_seconds must be a non-negative number"));
        }
        Ok(())
    }
}

/// Named aggro profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, AggroProfile>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the profile table compiled into the crate.
    pub fn builtin() -> ProfileResult<Self> {
        Self::from_ron_str(BUILTIN_PROFILES)
    }

    /// Parses a RON map of `name => profile` and validates every entry.
    pub fn from_ron_str(source: &str) -> ProfileResult<Self> {
        let parsed: BTreeMap<String, AggroProfile> = ron::from_str(source)?;
        let mut registry = Self::new();
        for (name, mut profile) in parsed {
            if profile.name.is_empty() {
                profile.name.clone_from(&name);
            }
            profile.validate()?;
            debug!("Loaded aggro profile '{}'", name);
            registry.profiles.insert(name, profile);
        }
        Ok(registry)
    }

    /// Reads and parses a RON profile file.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        let source = std::fs::read_to_string(path)?;
        let registry = Self::from_ron_str(&source)?;
        info!(
            "Loaded {} aggro profiles from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Adds or replaces a profile under its own name.
    pub fn insert(&mut self, profile: AggroProfile) -> ProfileResult<()> {
        profile.validate()?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Looks up a profile.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AggroProfile> {
        self.profiles.get(name)
    }

    /// Looks up a profile, failing when it is missing.
    pub fn require(&self, name: &str) -> ProfileResult<&AggroProfile> {
        self.get(name)
            .ok_or_else(|| ProfileError::Unknown(name.to_string()))
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
