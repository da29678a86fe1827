//! Combat zone: the registry of combatants and the driver of their updates.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use runehaven_common::{EntityId, FactionId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combat_math::Element;
use crate::events::{EventBus, GameEvent, DEFAULT_EVENT_CAPACITY};
use crate::faction::FactionTable;
use crate::npc_combat::NpcCombat;
use crate::player::PlayerCombatant;
use crate::profile::AggroProfile;
use crate::resolution::{resolve_attack, AttackReport};
use crate::stats::CombatantStats;
use crate::world::{CombatTarget, CombatWorld, DamageSource, IncomingHit, Strike};

/// Error types for zone operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    /// No combatant with this id
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
    /// Id already in use
    #[error("Entity already registered: {0}")]
    AlreadyRegistered(EntityId),
    /// Ownership link would form a loop
    #[error("Ownership cycle: {owner} is already controlled by {companion}")]
    OwnershipCycle {
        /// Entity being given an owner
        companion: EntityId,
        /// Requested owner
        owner: EntityId,
    },
    /// Operation needs a player
    #[error("No player registered")]
    NoPlayer,
}

/// Result type for zone operations.
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Everything an NPC can observe while it updates.
#[derive(Debug)]
pub struct ZoneWorld {
    now: f64,
    player: Option<PlayerCombatant>,
    npcs: BTreeMap<EntityId, NpcCombat>,
    owners: HashMap<EntityId, EntityId>,
    factions: FactionTable,
    bus: EventBus,
    /// NPC currently taken out of `npcs` for its own update.
    detached: Option<EntityId>,
}

impl ZoneWorld {
    fn new(event_capacity: usize) -> Self {
        Self {
            now: 0.0,
            player: None,
            npcs: BTreeMap::new(),
            owners: HashMap::new(),
            factions: FactionTable::new(),
            bus: EventBus::new(event_capacity),
            detached: None,
        }
    }

    /// Current game time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Faction relations.
    #[must_use]
    pub const fn factions(&self) -> &FactionTable {
        &self.factions
    }

    fn player_id(&self) -> Option<EntityId> {
        self.player.as_ref().map(CombatTarget::id)
    }

    fn is_combatant(&self, entity: EntityId) -> bool {
        self.player_id() == Some(entity)
            || self.npcs.contains_key(&entity)
            || self.detached == Some(entity)
    }

    fn publish(&self, event: GameEvent) {
        if !self.bus.publish(event) {
            warn!("Combat event bus full, dropping event");
        }
    }

    fn flush_npc_events(&mut self) {
        for npc in self.npcs.values_mut() {
            for event in npc.drain_events() {
                if !self.bus.publish(GameEvent::Npc {
                    npc: npc.id(),
                    event,
                }) {
                    warn!("Combat event bus full, dropping event");
                }
            }
        }
    }

    /// Follows ownership links upwards from `entity`, yielding each owner.
    fn owner_chain(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let limit = self.owners.len();
        std::iter::successors(self.owners.get(&entity).copied(), move |e| {
            self.owners.get(e).copied()
        })
        .take(limit)
    }
}

impl CombatWorld for ZoneWorld {
    fn is_alive(&self, entity: EntityId) -> bool {
        if let Some(player) = self.player.as_ref().filter(|p| p.id() == entity) {
            return player.is_alive();
        }
        self.npcs.get(&entity).is_some_and(NpcCombat::is_alive)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        if let Some(player) = self.player.as_ref().filter(|p| p.id() == entity) {
            return Some(player.position());
        }
        self.npcs.get(&entity).map(NpcCombat::position)
    }

    fn hostile_npcs(&self, npc: EntityId, faction: FactionId) -> Vec<EntityId> {
        self.npcs
            .values()
            .filter(|other| {
                other.id() != npc
                    && other.is_alive()
                    && self.factions.is_hostile(faction, other.faction())
            })
            .map(NpcCombat::id)
            .collect()
    }

    fn defender_stats(&self, entity: EntityId) -> CombatantStats {
        if let Some(player) = self.player.as_ref().filter(|p| p.id() == entity) {
            return player.defender_stats();
        }
        self.npcs
            .get(&entity)
            .map_or_else(CombatantStats::default, NpcCombat::defender_stats)
    }

    fn is_player_controlled(&self, entity: EntityId) -> bool {
        let Some(player) = self.player_id() else {
            return false;
        };
        entity == player || self.owner_chain(entity).any(|owner| owner == player)
    }

    fn deliver(&mut self, target: EntityId, strike: Strike, source: Option<EntityId>) -> u32 {
        let hit = IncomingHit {
            strike,
            source: source.map(|entity| DamageSource {
                entity,
                player_controlled: self.is_player_controlled(entity),
                targetable: self.is_combatant(entity),
            }),
        };
        let now = self.now;

        if let Some(player) = self.player.as_mut().filter(|p| p.id() == target) {
            let applied = player.apply_damage(hit, now);
            let remaining = player.current_hp();
            self.publish(GameEvent::PlayerDamaged {
                amount: applied,
                source,
                remaining,
            });
            if applied > 0 && remaining == 0 {
                info!("Player died (killer: {:?})", source);
                self.publish(GameEvent::PlayerDied { killer: source });
            }
            return applied;
        }

        match self.npcs.get_mut(&target) {
            Some(npc) => npc.apply_damage(hit, now),
            None => {
                debug!("Dropping strike against unknown target {}", target);
                0
            },
        }
    }
}

/// Owns the player, every NPC and the ownership links of one area.
#[derive(Debug)]
pub struct CombatZone {
    world: ZoneWorld,
    rng: fastrand::Rng,
    ticks: u64,
}

impl CombatZone {
    /// Creates an empty zone with a seeded random source.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            world: ZoneWorld::new(DEFAULT_EVENT_CAPACITY),
            rng: fastrand::Rng::with_seed(seed),
            ticks: 0,
        }
    }

    /// Sets the capacity of the outbound event bus.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.world.bus = EventBus::new(capacity.max(1));
        self
    }

    /// Read-only world view.
    #[must_use]
    pub const fn world(&self) -> &ZoneWorld {
        &self.world
    }

    /// Current game time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.world.now
    }

    /// Number of ticks processed.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Mutable faction relations.
    pub fn factions_mut(&mut self) -> &mut FactionTable {
        &mut self.world.factions
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers the player, replacing any previous one.
    ///
    /// Every registered NPC switches its discovery and threat weighting to
    /// the new player.
    pub fn set_player(&mut self, player: PlayerCombatant) -> ZoneResult<()> {
        let id = player.id();
        if self.world.npcs.contains_key(&id) {
            return Err(ZoneError::AlreadyRegistered(id));
        }
        info!("Player {} entered the zone", id);
        self.world.player = Some(player);
        for npc in self.world.npcs.values_mut() {
            npc.set_player(id);
        }
        self.world.flush_npc_events();
        Ok(())
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> Option<&PlayerCombatant> {
        self.world.player.as_ref()
    }

    /// Mutable player.
    pub fn player_mut(&mut self) -> Option<&mut PlayerCombatant> {
        self.world.player.as_mut()
    }

    /// Creates and registers an NPC, returning its id.
    pub fn spawn_npc(
        &mut self,
        faction: FactionId,
        profile: Option<AggroProfile>,
        position: Vec2,
    ) -> EntityId {
        let id = EntityId::new();
        let mut npc = NpcCombat::new(id, faction, profile, position);
        if let Some(player) = self.world.player_id() {
            npc = npc.with_player(player);
        }
        debug!("Spawned NPC {} at {}", id, position);
        self.world.npcs.insert(id, npc);
        id
    }

    /// Registers a prebuilt NPC.
    pub fn add_npc(&mut self, mut npc: NpcCombat) -> ZoneResult<()> {
        let id = npc.id();
        if self.world.is_combatant(id) {
            return Err(ZoneError::AlreadyRegistered(id));
        }
        if let Some(player) = self.world.player_id() {
            npc.set_player(player);
        }
        self.world.npcs.insert(id, npc);
        Ok(())
    }

    /// Unregisters an NPC. Other NPCs evict it on their next tick.
    pub fn remove_npc(&mut self, id: EntityId) -> ZoneResult<NpcCombat> {
        self.world.owners.remove(&id);
        self.world
            .npcs
            .remove(&id)
            .ok_or(ZoneError::UnknownEntity(id))
    }

    /// An NPC.
    #[must_use]
    pub fn npc(&self, id: EntityId) -> Option<&NpcCombat> {
        self.world.npcs.get(&id)
    }

    /// Mutable NPC.
    pub fn npc_mut(&mut self, id: EntityId) -> Option<&mut NpcCombat> {
        self.world.npcs.get_mut(&id)
    }

    /// Registered NPC ids in ascending order.
    #[must_use]
    pub fn npc_ids(&self) -> Vec<EntityId> {
        self.world.npcs.keys().copied().collect()
    }

    /// Moves an NPC.
    pub fn set_npc_position(&mut self, id: EntityId, position: Vec2) -> ZoneResult<()> {
        let npc = self
            .world
            .npcs
            .get_mut(&id)
            .ok_or(ZoneError::UnknownEntity(id))?;
        npc.set_position(position);
        Ok(())
    }

    /// Moves the player.
    pub fn set_player_position(&mut self, position: Vec2) -> ZoneResult<()> {
        let player = self.world.player.as_mut().ok_or(ZoneError::NoPlayer)?;
        player.set_position(position);
        Ok(())
    }

    /// Links a companion to its owner. Damage dealt by the companion is
    /// credited to whoever the owner chain ends at.
    pub fn set_owner(&mut self, companion: EntityId, owner: EntityId) -> ZoneResult<()> {
        if companion == owner || self.world.owner_chain(owner).any(|e| e == companion) {
            return Err(ZoneError::OwnershipCycle { companion, owner });
        }
        self.world.owners.insert(companion, owner);
        Ok(())
    }

    /// Removes a companion's owner link.
    pub fn clear_owner(&mut self, companion: EntityId) -> Option<EntityId> {
        self.world.owners.remove(&companion)
    }

    /// Direct owner of `entity`.
    #[must_use]
    pub fn owner_of(&self, entity: EntityId) -> Option<EntityId> {
        self.world.owners.get(&entity).copied()
    }

    /// Whether `entity` is the player or owned (transitively) by the player.
    #[must_use]
    pub fn is_player_controlled(&self, entity: EntityId) -> bool {
        self.world.is_player_controlled(entity)
    }

    // ========================================================================
    // Attacks from outside the NPC loop
    // ========================================================================

    /// Resolves an attack from any attacker (player, companion, script).
    pub fn attack(
        &mut self,
        attacker: EntityId,
        attacker_stats: &CombatantStats,
        element: Option<Element>,
        target: EntityId,
    ) -> AttackReport {
        let report = resolve_attack(
            &mut self.world,
            attacker,
            attacker_stats,
            element,
            target,
            &mut self.rng,
        );
        self.world.flush_npc_events();
        report
    }

    /// Resolves an attack by the player with its live stats.
    pub fn player_attack(&mut self, target: EntityId) -> ZoneResult<AttackReport> {
        let player = self.world.player.as_ref().ok_or(ZoneError::NoPlayer)?;
        if !self.world.npcs.contains_key(&target) {
            return Err(ZoneError::UnknownEntity(target));
        }
        let id = player.id();
        let stats = player.attack_stats();
        Ok(self.attack(id, &stats, None, target))
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Advances game time by `dt` seconds and runs every NPC's frame update.
    pub fn update_frame(&mut self, dt: f32) {
        self.world.now += f64::from(dt.max(0.0));
        let now = self.world.now;

        for id in self.npc_ids() {
            let Some(mut npc) = self.world.npcs.remove(&id) else {
                continue;
            };
            self.world.detached = Some(id);
            npc.update_frame(now, &mut self.world, &mut self.rng);
            self.world.detached = None;
            self.world.npcs.insert(id, npc);
        }
        self.world.flush_npc_events();
    }

    /// Runs every NPC's tick update at the current game time.
    pub fn tick(&mut self) {
        self.ticks += 1;
        let now = self.world.now;

        for id in self.npc_ids() {
            let Some(mut npc) = self.world.npcs.remove(&id) else {
                continue;
            };
            self.world.detached = Some(id);
            npc.on_tick(now, &self.world);
            self.world.detached = None;
            self.world.npcs.insert(id, npc);
        }
        self.world.flush_npc_events();
    }

    /// Frame update followed by `ticks` tick updates.
    pub fn step(&mut self, dt: f32, ticks: u32) {
        self.update_frame(dt);
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Outbound event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.world.bus
    }

    /// Takes every pending event.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.bus.drain()
    }
}
