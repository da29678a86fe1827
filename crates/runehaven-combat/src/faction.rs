//! Faction relations deciding which NPCs treat each other as enemies.

use std::collections::HashMap;

use runehaven_common::FactionId;
use serde::{Deserialize, Serialize};

/// Relationship type between factions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionRelation {
    /// Allied factions
    Allied,
    /// Friendly factions
    Friendly,
    /// Neutral factions
    #[default]
    Neutral,
    /// Hostile factions
    Enemy,
    /// At war
    AtWar,
}

impl FactionRelation {
    /// Checks if this relation allows cooperation.
    #[must_use]
    pub const fn allows_cooperation(self) -> bool {
        matches!(self, Self::Allied | Self::Friendly)
    }

    /// Checks if this relation is hostile.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Enemy | Self::AtWar)
    }
}

/// Symmetric-by-convention relation matrix between factions.
///
/// Unlisted pairs are [`FactionRelation::Neutral`]; a faction is always
/// allied with itself.
#[derive(Debug, Clone, Default)]
pub struct FactionTable {
    relations: HashMap<(FactionId, FactionId), FactionRelation>,
}

impl FactionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how `from` regards `to`.
    pub fn set_relation(&mut self, from: FactionId, to: FactionId, relation: FactionRelation) {
        if from != to {
            self.relations.insert((from, to), relation);
        }
    }

    /// Sets the relation both ways.
    pub fn set_mutual_relation(&mut self, a: FactionId, b: FactionId, relation: FactionRelation) {
        self.set_relation(a, b, relation);
        self.set_relation(b, a, relation);
    }

    /// How `from` regards `to`.
    #[must_use]
    pub fn relation(&self, from: FactionId, to: FactionId) -> FactionRelation {
        if from == to {
            return FactionRelation::Allied;
        }
        self.relations
            .get(&(from, to))
            .copied()
            .unwrap_or_default()
    }

    /// Whether `from` attacks members of `to` on sight.
    #[must_use]
    pub fn is_hostile(&self, from: FactionId, to: FactionId) -> bool {
        self.relation(from, to).is_hostile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_properties() {
        assert!(FactionRelation::Allied.allows_cooperation());
        assert!(FactionRelation::Friendly.allows_cooperation());
        assert!(!FactionRelation::Neutral.is_hostile());
        assert!(FactionRelation::Enemy.is_hostile());
        assert!(FactionRelation::AtWar.is_hostile());
    }

    #[test]
    fn test_table_defaults() {
        let table = FactionTable::new();
        let goblins = FactionId::new(10);
        let guards = FactionId::new(11);
        assert_eq!(table.relation(goblins, guards), FactionRelation::Neutral);
        assert_eq!(table.relation(goblins, goblins), FactionRelation::Allied);
    }

    #[test]
    fn test_mutual_relation() {
        let mut table = FactionTable::new();
        let goblins = FactionId::new(10);
        let guards = FactionId::new(11);
        table.set_mutual_relation(goblins, guards, FactionRelation::AtWar);
        assert!(table.is_hostile(goblins, guards));
        assert!(table.is_hostile(guards, goblins));

        table.set_relation(guards, goblins, FactionRelation::Neutral);
        assert!(table.is_hostile(goblins, guards));
        assert!(!table.is_hostile(guards, goblins));
    }

    #[test]
    fn test_self_relation_cannot_be_overridden() {
        let mut table = FactionTable::new();
        let goblins = FactionId::new(10);
        table.set_relation(goblins, goblins, FactionRelation::Enemy);
        assert!(!table.is_hostile(goblins, goblins));
    }
}
