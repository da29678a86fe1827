//! Combat state of a single NPC instance.
//!
//! Two entry points drive it: [`NpcCombat::on_tick`] once per game tick
//! (eviction, discovery, admission, facing, reset) and [`NpcCombat::update_frame`]
//! every frame (respawn timer, attack cycles). Damage arrives through
//! [`CombatTarget::apply_damage`]. Everything the outside world should react
//! to is queued as a [`CombatEvent`].

use glam::Vec2;
use runehaven_common::{EntityId, FactionId};
use tracing::{debug, info};

use crate::combat_math::{DamageType, MIN_THREAT_DISTANCE};
use crate::engagement::{CycleStep, EngagementCycle, EngagementScheduler};
use crate::events::CombatEvent;
use crate::profile::AggroProfile;
use crate::resolution::resolve_attack;
use crate::stats::CombatantStats;
use crate::threat::ThreatLedger;
use crate::world::{CombatTarget, CombatWorld, IncomingHit};

/// Hitpoints of an NPC without a profile.
pub const DEFAULT_HITPOINTS: u32 = 10;

/// Target the NPC currently faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facing {
    /// Faced target
    pub target: EntityId,
    /// Unit direction towards it
    pub direction: Vec2,
}

/// Leash parameters copied out of the profile.
#[derive(Debug, Clone, Copy)]
struct Leash {
    range: f32,
    timeout: f32,
}

/// Combat state of one NPC.
#[derive(Debug, Clone)]
pub struct NpcCombat {
    id: EntityId,
    faction: FactionId,
    profile: Option<AggroProfile>,
    player: Option<EntityId>,
    max_hp: u32,
    current_hp: u32,
    spawn_position: Vec2,
    position: Vec2,
    ledger: ThreatLedger,
    scheduler: EngagementScheduler,
    player_damage: u32,
    npc_damage: u32,
    hit_detection: bool,
    visible: bool,
    pending_respawn_at: Option<f64>,
    returning_home: bool,
    facing: Option<Facing>,
    events: Vec<CombatEvent>,
}

impl NpcCombat {
    /// Creates an NPC at `spawn` with full health.
    ///
    /// Without a profile the NPC is passive: it takes damage and dies but
    /// never tracks threat or attacks.
    #[must_use]
    pub fn new(
        id: EntityId,
        faction: FactionId,
        profile: Option<AggroProfile>,
        spawn: Vec2,
    ) -> Self {
        let max_hp = profile
            .as_ref()
            .map_or(DEFAULT_HITPOINTS, |p| p.hitpoints_level.max(1));
        let max_targets = profile.as_ref().map_or(0, |p| p.max_concurrent_targets);

        Self {
            id,
            faction,
            profile,
            player: None,
            max_hp,
            current_hp: max_hp,
            spawn_position: spawn,
            position: spawn,
            ledger: ThreatLedger::default(),
            scheduler: EngagementScheduler::new(max_targets),
            player_damage: 0,
            npc_damage: 0,
            hit_detection: true,
            visible: true,
            pending_respawn_at: None,
            returning_home: false,
            facing: None,
            events: Vec::new(),
        }
    }

    /// Sets the player-faction target considered during discovery.
    #[must_use]
    pub fn with_player(mut self, player: EntityId) -> Self {
        self.set_player(player);
        self
    }

    /// Points discovery and threat weighting at `player`.
    ///
    /// A previous player's ledger entry is dropped along with its cycle.
    pub fn set_player(&mut self, player: EntityId) {
        if let Some(previous) = self.player.filter(|&p| p != player) {
            if self.scheduler.is_engaged(previous) {
                self.disengage(previous);
            } else {
                self.ledger.remove(previous);
            }
        }
        let weight = self.profile.as_ref().map_or(1.0, |p| p.player_aggro_weight);
        self.player = Some(player);
        self.ledger.set_player(Some(player), weight);
    }

    /// Player target considered during discovery.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// NPC id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Faction.
    #[must_use]
    pub const fn faction(&self) -> FactionId {
        self.faction
    }

    /// Aggro profile, `None` for passive NPCs.
    #[must_use]
    pub const fn profile(&self) -> Option<&AggroProfile> {
        self.profile.as_ref()
    }

    /// Current hitpoints.
    #[must_use]
    pub const fn current_hp(&self) -> u32 {
        self.current_hp
    }

    /// Maximum hitpoints.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Spawn point.
    #[must_use]
    pub const fn spawn_position(&self) -> Vec2 {
        self.spawn_position
    }

    /// Whether at least one attack cycle is active.
    #[must_use]
    pub fn in_combat(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Whether the NPC can be hit.
    #[must_use]
    pub const fn hit_detection_enabled(&self) -> bool {
        self.hit_detection
    }

    /// Whether the NPC should be drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Damage taken from player-controlled sources since the last reset.
    #[must_use]
    pub const fn player_damage(&self) -> u32 {
        self.player_damage
    }

    /// Damage taken from every other source since the last reset.
    #[must_use]
    pub const fn npc_damage(&self) -> u32 {
        self.npc_damage
    }

    /// Threat ledger.
    #[must_use]
    pub const fn ledger(&self) -> &ThreatLedger {
        &self.ledger
    }

    /// Active attack cycles.
    #[must_use]
    pub fn engagements(&self) -> &[EngagementCycle] {
        self.scheduler.cycles()
    }

    /// Whether `target` has an active cycle.
    #[must_use]
    pub fn is_engaged(&self, target: EntityId) -> bool {
        self.scheduler.is_engaged(target)
    }

    /// Game time of the scheduled respawn.
    #[must_use]
    pub const fn pending_respawn_at(&self) -> Option<f64> {
        self.pending_respawn_at
    }

    /// Whether a reset sent the NPC home and it has not arrived yet.
    #[must_use]
    pub const fn is_returning_home(&self) -> bool {
        self.returning_home
    }

    /// Currently faced target.
    #[must_use]
    pub const fn facing(&self) -> Option<Facing> {
        self.facing
    }

    /// Stats this NPC defends with.
    #[must_use]
    pub fn defender_stats(&self) -> CombatantStats {
        CombatantStats::for_npc(self.profile.as_ref())
            .with_damage_type(self.preferred_defence_type())
    }

    /// Queued events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Takes every queued event.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Moves the NPC. Locomotion is owned by the caller.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn leash(&self) -> Option<Leash> {
        self.profile.as_ref().map(|p| Leash {
            range: p.aggro_range,
            timeout: p.aggro_timeout_seconds,
        })
    }

    // ========================================================================
    // Tick pass
    // ========================================================================

    /// Per-tick threat maintenance: eviction, discovery, admission, facing, reset.
    pub fn on_tick<W>(&mut self, now: f64, world: &W)
    where
        W: CombatWorld + ?Sized,
    {
        let Some(leash) = self.leash() else {
            return;
        };
        if !self.is_alive() {
            return;
        }

        self.evict_targets(now, world, leash);
        if self.profile.as_ref().is_some_and(|p| p.is_aggressive) {
            self.discover_targets(world, leash);
        }
        self.admit_targets(now);
        self.face_nearest(world);
        self.check_reset(leash);
    }

    fn should_drop<W>(&self, target: EntityId, now: f64, world: &W, leash: Leash) -> bool
    where
        W: CombatWorld + ?Sized,
    {
        if !world.is_alive(target) {
            return true;
        }
        let Some(position) = world.position(target) else {
            return true;
        };
        let out_of_range = position.distance(self.spawn_position) > leash.range;
        out_of_range
            && self
                .ledger
                .get(target)
                .map_or(true, |e| e.is_timed_out(now, leash.timeout))
    }

    fn evict_targets<W>(&mut self, now: f64, world: &W, leash: Leash)
    where
        W: CombatWorld + ?Sized,
    {
        let stale: Vec<EntityId> = self
            .ledger
            .targets()
            .filter(|&t| self.should_drop(t, now, world, leash))
            .collect();

        for target in stale {
            debug!("NPC {} evicting {}", self.id, target);
            if self.scheduler.is_engaged(target) {
                self.disengage(target);
            } else {
                self.ledger.remove(target);
            }
        }
    }

    fn discover_targets<W>(&mut self, world: &W, leash: Leash)
    where
        W: CombatWorld + ?Sized,
    {
        let mut candidates = world.hostile_npcs(self.id, self.faction);
        if let Some(player) = self.player {
            if !self.faction.is_player() {
                candidates.insert(0, player);
            }
        }

        for candidate in candidates {
            if candidate == self.id || !world.is_alive(candidate) {
                continue;
            }
            let Some(position) = world.position(candidate) else {
                continue;
            };
            if position.distance(self.spawn_position) > leash.range {
                continue;
            }
            let distance = position.distance(self.position).max(MIN_THREAT_DISTANCE);
            self.ledger.add_threat(candidate, 1.0 / distance);
        }
    }

    fn admit_targets(&mut self, now: f64) {
        while self.scheduler.has_free_slot() {
            let scheduler = &self.scheduler;
            let Some(target) = self.ledger.highest(|t| scheduler.is_engaged(t)) else {
                break;
            };
            self.engage(target, now);
        }
    }

    fn check_reset(&mut self, leash: Leash) {
        let far_from_home = self.position.distance(self.spawn_position) > leash.range;
        if !far_from_home {
            self.returning_home = false;
            return;
        }
        if self.ledger.is_empty() && self.scheduler.is_empty() && !self.returning_home {
            self.reset_combat_state(false);
            self.returning_home = true;
            debug!("NPC {} returning to spawn", self.id);
            self.events.push(CombatEvent::ReturnToSpawn {
                spawn: self.spawn_position,
            });
        }
    }

    fn engage(&mut self, target: EntityId, now: f64) {
        let was_idle = self.scheduler.is_empty();
        if !self.scheduler.admit(target, now) {
            return;
        }
        self.returning_home = false;
        debug!(
            "NPC {} engaging {} (threat {:.2})",
            self.id,
            target,
            self.ledger.threat(target)
        );
        if was_idle {
            self.events
                .push(CombatEvent::CombatStateChanged { in_combat: true });
            self.events.push(CombatEvent::EnterCombat { target });
        }
    }

    fn disengage(&mut self, target: EntityId) {
        if self.scheduler.disengage(target).is_none() {
            return;
        }
        self.ledger.remove(target);
        if self.facing.is_some_and(|f| f.target == target) {
            self.facing = None;
        }
        debug!("NPC {} disengaged from {}", self.id, target);
        self.events.push(CombatEvent::ExitCombat { target });
        if self.scheduler.is_empty() {
            self.events
                .push(CombatEvent::CombatStateChanged { in_combat: false });
        }
    }

    fn cancel_all_cycles(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        if cancelled.is_empty() {
            return;
        }
        for cycle in cancelled {
            self.events
                .push(CombatEvent::ExitCombat { target: cycle.target });
        }
        self.facing = None;
        self.events
            .push(CombatEvent::CombatStateChanged { in_combat: false });
    }

    // ========================================================================
    // Frame pass
    // ========================================================================

    /// Per-frame update: respawn timer, attack cycles and facing.
    pub fn update_frame<W>(&mut self, now: f64, world: &mut W, rng: &mut fastrand::Rng)
    where
        W: CombatWorld + ?Sized,
    {
        if self.pending_respawn_at.is_some_and(|at| now >= at) {
            self.respawn_now();
        }

        let Some(leash) = self.leash() else {
            return;
        };
        if !self.is_alive() {
            return;
        }

        for target in self.scheduler.targets() {
            if !self.is_alive() {
                break;
            }
            if !self.scheduler.is_engaged(target) {
                continue;
            }
            if self.should_drop(target, now, &*world, leash) {
                self.disengage(target);
                continue;
            }
            let Some(target_position) = world.position(target) else {
                self.disengage(target);
                continue;
            };

            let distance = self.position.distance(target_position);
            let step = match self.scheduler.cycle_mut(target) {
                Some(cycle) => cycle.advance(distance, now),
                None => continue,
            };

            if step == CycleStep::Strike {
                self.strike(target, target_position, world, rng);
                if self.should_drop(target, now, &*world, leash) {
                    self.disengage(target);
                }
            }
        }

        self.update_facing(&*world);
    }

    fn strike<W>(
        &mut self,
        target: EntityId,
        target_position: Vec2,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) where
        W: CombatWorld + ?Sized,
    {
        let stats = CombatantStats::for_npc(self.profile.as_ref());
        let element = self.profile.as_ref().and_then(|p| p.attack_element);
        let report = resolve_attack(world, self.id, &stats, element, target, rng);
        debug!(
            "NPC {} struck {}: hit={} applied={}",
            self.id, target, report.hit, report.applied
        );

        let direction = (target_position - self.position).normalize_or_zero();
        self.events
            .push(CombatEvent::PlayAttackAnimation { direction });
    }

    /// Nearest engaged target and the unit direction towards it.
    fn nearest_engaged<W>(&self, world: &W) -> Option<Facing>
    where
        W: CombatWorld + ?Sized,
    {
        self.scheduler
            .cycles()
            .iter()
            .filter_map(|c| world.position(c.target).map(|p| (c.target, p)))
            .min_by(|a, b| {
                let da = a.1.distance_squared(self.position);
                let db = b.1.distance_squared(self.position);
                da.total_cmp(&db)
            })
            .map(|(target, position)| Facing {
                target,
                direction: (position - self.position).normalize_or_zero(),
            })
    }

    /// Frame-rate facing refresh. Collaborators are told once per tick.
    fn update_facing<W>(&mut self, world: &W)
    where
        W: CombatWorld + ?Sized,
    {
        self.facing = self.nearest_engaged(world);
    }

    fn face_nearest<W>(&mut self, world: &W)
    where
        W: CombatWorld + ?Sized,
    {
        self.facing = self.nearest_engaged(world);
        if let Some(Facing { target, direction }) = self.facing {
            self.events
                .push(CombatEvent::FaceTowards { target, direction });
        }
    }

    // ========================================================================
    // Death, respawn, reset
    // ========================================================================

    fn die(&mut self, now: f64, last_hit_by_player: bool) {
        let killed_by_player = last_hit_by_player || self.player_damage > self.npc_damage;

        self.cancel_all_cycles();
        self.events.push(CombatEvent::Death);
        self.events.push(CombatEvent::LootDrop { killed_by_player });

        self.ledger.clear();
        self.player_damage = 0;
        self.npc_damage = 0;
        self.hit_detection = false;
        self.visible = false;
        self.facing = None;
        self.returning_home = false;

        let respawn = self.profile.as_ref().map_or(0.0, |p| p.respawn_seconds);
        if respawn > 0.0 {
            if self.pending_respawn_at.is_some() {
                debug!("NPC {} replacing pending respawn", self.id);
            }
            self.pending_respawn_at = Some(now + f64::from(respawn));
        }

        info!(
            "NPC {} died (killed by player: {})",
            self.id, killed_by_player
        );
    }

    /// Respawns immediately at the spawn point, replacing any pending respawn.
    pub fn respawn_now(&mut self) {
        self.pending_respawn_at = None;
        self.cancel_all_cycles();
        self.ledger.clear();
        self.player_damage = 0;
        self.npc_damage = 0;
        self.facing = None;
        self.returning_home = false;

        self.current_hp = self.max_hp;
        self.hit_detection = true;
        self.visible = true;
        self.position = self.spawn_position;

        info!("NPC {} respawned at {}", self.id, self.spawn_position);
        self.events.push(CombatEvent::HealthChanged {
            current: self.max_hp,
            max: self.max_hp,
        });
    }

    /// Drops every cycle, all threat and the damage counters.
    ///
    /// Hitpoints and a pending respawn are left alone. With
    /// `reset_spawn_position` the current position becomes the new spawn.
    pub fn reset_combat_state(&mut self, reset_spawn_position: bool) {
        self.cancel_all_cycles();
        self.ledger.clear();
        self.player_damage = 0;
        self.npc_damage = 0;
        self.facing = None;
        if reset_spawn_position {
            self.spawn_position = self.position;
        }
    }
}

impl CombatTarget for NpcCombat {
    fn id(&self) -> EntityId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.hit_detection && self.current_hp > 0
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn preferred_defence_type(&self) -> DamageType {
        self.profile
            .as_ref()
            .map_or(DamageType::Melee, |p| p.defence_type)
    }

    fn apply_damage(&mut self, hit: IncomingHit, now: f64) -> u32 {
        if !self.is_alive() {
            return 0;
        }

        let amount = self.profile.as_ref().map_or(hit.strike.amount, |p| {
            p.mitigate(hit.strike.amount, hit.strike.element)
        });

        let previous = self.current_hp;
        self.current_hp = previous.saturating_sub(amount);
        if self.current_hp != previous {
            self.events.push(CombatEvent::HealthChanged {
                current: self.current_hp,
                max: self.max_hp,
            });
        }

        let by_player = hit.source.is_some_and(|s| s.player_controlled);
        if by_player {
            self.player_damage = self.player_damage.saturating_add(amount);
        } else {
            self.npc_damage = self.npc_damage.saturating_add(amount);
        }

        if self.profile.is_some() {
            if let Some(source) = hit.source.filter(|s| s.targetable && s.entity != self.id) {
                self.ledger.add_threat(source.entity, amount as f32);
                self.ledger.record_damage_from(source.entity, now);
            }
        }

        if self.current_hp == 0 {
            self.die(now, by_player);
        }
        amount
    }
}
