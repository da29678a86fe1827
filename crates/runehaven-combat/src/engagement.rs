//! Attack cycles: one per engaged target, capped per NPC.

use runehaven_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::combat_math::{ATTACK_INTERVAL_SECONDS, MELEE_RANGE};

/// Phase of an attack cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementPhase {
    /// Closing distance to the target
    Approaching,
    /// In melee range, striking on cadence
    Striking,
}

/// Outcome of advancing a cycle by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// Nothing to do this frame
    Wait,
    /// A strike is due now
    Strike,
}

/// Independent attack loop against a single target.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementCycle {
    /// Target of this cycle
    pub target: EntityId,
    /// Current phase
    pub phase: EngagementPhase,
    /// Game time the cycle was admitted
    pub admitted_at: f64,
    /// Earliest game time of the next strike
    pub next_strike_at: f64,
}

impl EngagementCycle {
    /// Creates a cycle admitted at `now`.
    #[must_use]
    pub const fn new(target: EntityId, now: f64) -> Self {
        Self {
            target,
            phase: EngagementPhase::Approaching,
            admitted_at: now,
            next_strike_at: now,
        }
    }

    /// Advances the cycle given the current distance to its target.
    ///
    /// Leaving melee range while striking drops back to approaching without
    /// touching the cadence timer. A cycle never strikes at its admission time.
    pub fn advance(&mut self, distance: f32, now: f64) -> CycleStep {
        let in_range = distance <= MELEE_RANGE;
        match self.phase {
            EngagementPhase::Approaching => {
                if !in_range {
                    return CycleStep::Wait;
                }
                self.phase = EngagementPhase::Striking;
            },
            EngagementPhase::Striking => {
                if !in_range {
                    self.phase = EngagementPhase::Approaching;
                    return CycleStep::Wait;
                }
            },
        }

        if now > self.admitted_at && now >= self.next_strike_at {
            self.next_strike_at = now + f64::from(ATTACK_INTERVAL_SECONDS);
            CycleStep::Strike
        } else {
            CycleStep::Wait
        }
    }
}

/// Set of active cycles of one NPC.
#[derive(Debug, Clone)]
pub struct EngagementScheduler {
    cycles: Vec<EngagementCycle>,
    max_concurrent: usize,
}

impl EngagementScheduler {
    /// Creates a scheduler allowing at most `max_concurrent` cycles.
    #[must_use]
    pub const fn new(max_concurrent: usize) -> Self {
        Self {
            cycles: Vec::new(),
            max_concurrent,
        }
    }

    /// Maximum number of cycles.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Whether another cycle may be admitted.
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.cycles.len() < self.max_concurrent
    }

    /// Starts a cycle against `target`.
    ///
    /// Returns `false` when the target is already engaged or no slot is free.
    pub fn admit(&mut self, target: EntityId, now: f64) -> bool {
        if self.is_engaged(target) || !self.has_free_slot() {
            return false;
        }
        self.cycles.push(EngagementCycle::new(target, now));
        true
    }

    /// Ends the cycle against `target`.
    pub fn disengage(&mut self, target: EntityId) -> Option<EngagementCycle> {
        let index = self.cycles.iter().position(|c| c.target == target)?;
        Some(self.cycles.remove(index))
    }

    /// Ends every cycle, returning them in admission order.
    pub fn cancel_all(&mut self) -> Vec<EngagementCycle> {
        std::mem::take(&mut self.cycles)
    }

    /// Whether `target` has an active cycle.
    #[must_use]
    pub fn is_engaged(&self, target: EntityId) -> bool {
        self.cycles.iter().any(|c| c.target == target)
    }

    /// Cycle against `target`.
    #[must_use]
    pub fn cycle(&self, target: EntityId) -> Option<&EngagementCycle> {
        self.cycles.iter().find(|c| c.target == target)
    }

    /// Mutable cycle against `target`.
    pub fn cycle_mut(&mut self, target: EntityId) -> Option<&mut EngagementCycle> {
        self.cycles.iter_mut().find(|c| c.target == target)
    }

    /// Engaged targets in admission order.
    #[must_use]
    pub fn targets(&self) -> Vec<EntityId> {
        self.cycles.iter().map(|c| c.target).collect()
    }

    /// Active cycles.
    #[must_use]
    pub fn cycles(&self) -> &[EngagementCycle] {
        &self.cycles
    }

    /// Number of active cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// Whether no cycle is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}
