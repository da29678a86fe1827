//! NPC locomotion driven by combat events.
//!
//! Combat only asks for movement through `EnterCombat`, `ExitCombat` and
//! `ReturnToSpawn`; this module turns those requests into positions.

use std::collections::BTreeMap;

use glam::Vec2;
use runehaven_combat::{CombatEvent, CombatWorld, CombatZone};
use runehaven_common::EntityId;
use tracing::debug;

/// Distance kept from a pursued target.
const PURSUIT_STANDOFF: f32 = 1.0;

/// What an NPC is currently walking towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveIntent {
    /// Standing still
    Idle,
    /// Following an entity
    Pursue(EntityId),
    /// Walking back to a point
    ReturnHome(Vec2),
}

/// Movement state for every NPC in a zone.
#[derive(Debug)]
pub struct Locomotion {
    intents: BTreeMap<EntityId, MoveIntent>,
    speed: f32,
}

impl Locomotion {
    /// Create with a walking speed in units per second.
    #[must_use]
    pub fn new(speed: f32) -> Self {
        Self {
            intents: BTreeMap::new(),
            speed: speed.max(0.0),
        }
    }

    /// Current intent of an NPC.
    #[must_use]
    pub fn intent(&self, npc: EntityId) -> MoveIntent {
        self.intents.get(&npc).copied().unwrap_or(MoveIntent::Idle)
    }

    /// React to an NPC's combat event.
    pub fn observe(&mut self, npc: EntityId, event: &CombatEvent, zone: &CombatZone) {
        let intent = match *event {
            CombatEvent::EnterCombat { target } => MoveIntent::Pursue(target),
            CombatEvent::ExitCombat { target } => {
                if self.intent(npc) != MoveIntent::Pursue(target) {
                    return;
                }
                // Fall through to whoever is still engaged
                zone.npc(npc)
                    .and_then(|n| n.engagements().first())
                    .map_or(MoveIntent::Idle, |cycle| MoveIntent::Pursue(cycle.target))
            },
            CombatEvent::ReturnToSpawn { spawn } => MoveIntent::ReturnHome(spawn),
            CombatEvent::Death => MoveIntent::Idle,
            _ => return,
        };
        debug!("NPC {} movement: {:?}", npc, intent);
        self.intents.insert(npc, intent);
    }

    /// Move every NPC with an active intent by `dt` seconds of walking.
    pub fn step(&mut self, zone: &mut CombatZone, dt: f32) {
        let max_step = self.speed * dt.max(0.0);
        let mut arrived = Vec::new();

        for (&npc, &intent) in &self.intents {
            let Some(current) = zone.world().position(npc) else {
                arrived.push(npc);
                continue;
            };
            let (goal, standoff) = match intent {
                MoveIntent::Idle => continue,
                MoveIntent::Pursue(target) => match zone.world().position(target) {
                    Some(position) => (position, PURSUIT_STANDOFF),
                    None => continue,
                },
                MoveIntent::ReturnHome(spawn) => (spawn, 0.0),
            };

            let to_goal = goal - current;
            let remaining = to_goal.length() - standoff;
            if remaining <= 0.0 {
                if matches!(intent, MoveIntent::ReturnHome(_)) {
                    arrived.push(npc);
                }
                continue;
            }

            let next = current + to_goal.normalize_or_zero() * remaining.min(max_step);
            if zone.set_npc_position(npc, next).is_err() {
                arrived.push(npc);
            }
        }

        for npc in arrived {
            self.intents.remove(&npc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runehaven_common::FactionId;

    fn zone_with_npc(at: Vec2) -> (CombatZone, EntityId) {
        let mut zone = CombatZone::new(1);
        let npc = zone.spawn_npc(FactionId::new(3), None, at);
        (zone, npc)
    }

    #[test]
    fn test_return_home_walks_and_arrives() {
        let (mut zone, npc) = zone_with_npc(Vec2::ZERO);
        zone.set_npc_position(npc, Vec2::new(4.0, 0.0))
            .expect("npc registered");

        let mut locomotion = Locomotion::new(2.0);
        locomotion.observe(
            npc,
            &CombatEvent::ReturnToSpawn { spawn: Vec2::ZERO },
            &zone,
        );

        locomotion.step(&mut zone, 1.0);
        let position = zone.world().position(npc).expect("npc position");
        assert!((position.x - 2.0).abs() < 1e-5);

        locomotion.step(&mut zone, 1.0);
        locomotion.step(&mut zone, 1.0);
        assert_eq!(zone.world().position(npc), Some(Vec2::ZERO));
        assert_eq!(locomotion.intent(npc), MoveIntent::Idle);
    }

    #[test]
    fn test_pursuit_stops_at_standoff() {
        let (mut zone, npc) = zone_with_npc(Vec2::ZERO);
        let target = zone.spawn_npc(FactionId::new(4), None, Vec2::new(5.0, 0.0));

        let mut locomotion = Locomotion::new(10.0);
        locomotion.observe(npc, &CombatEvent::EnterCombat { target }, &zone);
        locomotion.step(&mut zone, 1.0);

        let position = zone.world().position(npc).expect("npc position");
        assert!((position.x - 4.0).abs() < 1e-5);
        assert_eq!(locomotion.intent(npc), MoveIntent::Pursue(target));
    }

    #[test]
    fn test_exit_for_other_target_keeps_pursuit() {
        let (zone, npc) = zone_with_npc(Vec2::ZERO);
        let first = EntityId::new();
        let other = EntityId::new();

        let mut locomotion = Locomotion::new(1.0);
        locomotion.observe(npc, &CombatEvent::EnterCombat { target: first }, &zone);
        locomotion.observe(npc, &CombatEvent::ExitCombat { target: other }, &zone);
        assert_eq!(locomotion.intent(npc), MoveIntent::Pursue(first));

        locomotion.observe(npc, &CombatEvent::ExitCombat { target: first }, &zone);
        assert_eq!(locomotion.intent(npc), MoveIntent::Idle);
    }

    #[test]
    fn test_death_stops_movement() {
        let (zone, npc) = zone_with_npc(Vec2::ZERO);
        let mut locomotion = Locomotion::new(1.0);
        locomotion.observe(
            npc,
            &CombatEvent::EnterCombat {
                target: EntityId::new(),
            },
            &zone,
        );
        locomotion.observe(npc, &CombatEvent::Death, &zone);
        assert_eq!(locomotion.intent(npc), MoveIntent::Idle);
    }
}
