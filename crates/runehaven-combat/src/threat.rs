//! Per-NPC threat ledger.
//!
//! Entries are kept in insertion order. Selection scans that order and only
//! replaces the current best on a strictly greater threat, so ties resolve to
//! the entry that was tracked first.

use runehaven_common::EntityId;

/// Threat accumulated against one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatEntry {
    /// Tracked target
    pub target: EntityId,
    /// Accumulated threat, never decreases while the entry lives
    pub threat: f32,
    /// Game time of the last damage this target dealt, if any
    pub last_damage_time: Option<f64>,
}

impl ThreatEntry {
    fn new(target: EntityId) -> Self {
        Self {
            target,
            threat: 0.0,
            last_damage_time: None,
        }
    }

    /// Whether the target has gone `timeout` seconds without dealing damage.
    ///
    /// A target that never dealt damage counts as timed out.
    #[must_use]
    pub fn is_timed_out(&self, now: f64, timeout: f32) -> bool {
        self.last_damage_time
            .map_or(true, |t| now - t > f64::from(timeout))
    }
}

/// Threat table of a single NPC.
#[derive(Debug, Clone)]
pub struct ThreatLedger {
    entries: Vec<ThreatEntry>,
    player: Option<EntityId>,
    player_weight: f32,
}

impl Default for ThreatLedger {
    fn default() -> Self {
        Self::new(None, 1.0)
    }
}

impl ThreatLedger {
    /// Creates an empty ledger.
    ///
    /// Threat attributed to `player` is multiplied by `player_weight`.
    #[must_use]
    pub fn new(player: Option<EntityId>, player_weight: f32) -> Self {
        Self {
            entries: Vec::new(),
            player,
            player_weight,
        }
    }

    /// Changes which target the player weight applies to.
    ///
    /// Existing entries keep their threat; only later additions are weighted.
    pub fn set_player(&mut self, player: Option<EntityId>, player_weight: f32) {
        self.player = player;
        self.player_weight = player_weight;
    }

    /// Target the player weight applies to.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    fn entry_mut(&mut self, target: EntityId) -> &mut ThreatEntry {
        let index = match self.entries.iter().position(|e| e.target == target) {
            Some(index) => index,
            None => {
                self.entries.push(ThreatEntry::new(target));
                self.entries.len() - 1
            },
        };
        &mut self.entries[index]
    }

    /// Adds threat against `target`, creating the entry if needed.
    ///
    /// Negative or non-finite amounts add nothing.
    pub fn add_threat(&mut self, target: EntityId, amount: f32) {
        let weight = if Some(target) == self.player {
            self.player_weight
        } else {
            1.0
        };
        let weighted = amount * weight;
        let delta = if weighted.is_finite() && weighted > 0.0 {
            weighted
        } else {
            0.0
        };
        self.entry_mut(target).threat += delta;
    }

    /// Stamps the time `target` last dealt damage. Last write wins.
    pub fn record_damage_from(&mut self, target: EntityId, now: f64) {
        self.entry_mut(target).last_damage_time = Some(now);
    }

    /// Threat against `target`, 0 when untracked.
    #[must_use]
    pub fn threat(&self, target: EntityId) -> f32 {
        self.get(target).map_or(0.0, |e| e.threat)
    }

    /// Entry for `target`.
    #[must_use]
    pub fn get(&self, target: EntityId) -> Option<&ThreatEntry> {
        self.entries.iter().find(|e| e.target == target)
    }

    /// Whether `target` is tracked.
    #[must_use]
    pub fn contains(&self, target: EntityId) -> bool {
        self.get(target).is_some()
    }

    /// Stops tracking `target`.
    pub fn remove(&mut self, target: EntityId) -> Option<ThreatEntry> {
        let index = self.entries.iter().position(|e| e.target == target)?;
        Some(self.entries.remove(index))
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ThreatEntry] {
        &self.entries
    }

    /// Tracked targets in insertion order.
    pub fn targets(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|e| e.target)
    }

    /// Number of tracked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest-threat target not rejected by `skip`. Ties go to the earliest entry.
    pub fn highest<F>(&self, mut skip: F) -> Option<EntityId>
    where
        F: FnMut(EntityId) -> bool,
    {
        let mut best: Option<&ThreatEntry> = None;
        for entry in &self.entries {
            if skip(entry.target) {
                continue;
            }
            match best {
                Some(current) if entry.threat <= current.threat => {},
                _ => best = Some(entry),
            }
        }
        best.map(|e| e.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_threat_accumulates() {
        let mut ledger = ThreatLedger::default();
        let target = EntityId::new();
        ledger.add_threat(target, 2.0);
        ledger.add_threat(target, 3.5);
        assert!((ledger.threat(target) - 5.5).abs() < f32::EPSILON);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_player_weight_applies_only_to_player() {
        let player = EntityId::new();
        let other = EntityId::new();
        let mut ledger = ThreatLedger::new(Some(player), 2.0);
        ledger.add_threat(player, 3.0);
        ledger.add_threat(other, 3.0);
        assert!((ledger.threat(player) - 6.0).abs() < f32::EPSILON);
        assert!((ledger.threat(other) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_amounts_add_nothing() {
        let mut ledger = ThreatLedger::default();
        let target = EntityId::new();
        ledger.add_threat(target, -4.0);
        ledger.add_threat(target, f32::NAN);
        assert!(ledger.contains(target));
        assert_eq!(ledger.threat(target), 0.0);
    }

    #[test]
    fn test_record_damage_last_write_wins() {
        let mut ledger = ThreatLedger::default();
        let target = EntityId::new();
        ledger.record_damage_from(target, 3.0);
        ledger.record_damage_from(target, 1.0);
        assert_eq!(
            ledger.get(target).and_then(|e| e.last_damage_time),
            Some(1.0)
        );
        assert_eq!(ledger.threat(target), 0.0);
    }

    #[test]
    fn test_highest_prefers_threat_then_insertion() {
        let mut ledger = ThreatLedger::default();
        let a = EntityId::new();
        let b = EntityId::new();
        let c = EntityId::new();
        ledger.add_threat(a, 3.0);
        ledger.add_threat(b, 5.0);
        ledger.add_threat(c, 5.0);

        assert_eq!(ledger.highest(|_| false), Some(b));
        assert_eq!(ledger.highest(|t| t == b), Some(c));
        assert_eq!(ledger.highest(|t| t != a), Some(a));
        assert_eq!(ledger.highest(|_| true), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut ledger = ThreatLedger::default();
        let a = EntityId::new();
        let b = EntityId::new();
        ledger.add_threat(a, 1.0);
        ledger.add_threat(b, 1.0);
        assert!(ledger.remove(a).is_some());
        assert!(ledger.remove(a).is_none());
        assert_eq!(ledger.targets().collect::<Vec<_>>(), vec![b]);
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_timeout() {
        let mut entry = ThreatEntry::new(EntityId::new());
        assert!(entry.is_timed_out(0.0, 10.0));
        entry.last_damage_time = Some(5.0);
        assert!(!entry.is_timed_out(15.0, 10.0));
        assert!(entry.is_timed_out(15.5, 10.0));
    }

    proptest! {
        #[test]
        fn prop_threat_is_monotonic(amounts in proptest::collection::vec(-10.0f32..100.0, 1..50)) {
            let mut ledger = ThreatLedger::new(None, 1.0);
            let target = EntityId::from_raw(42);
            let mut previous = 0.0;
            for amount in amounts {
                ledger.add_threat(target, amount);
                let current = ledger.threat(target);
                prop_assert!(current >= previous);
                previous = current;
            }
        }
    }
}
