//! Encounter runner.
//!
//! Builds a combat zone from [`SimConfig`], then drives frames and ticks:
//! NPC frame updates, tick updates, the player's auto-attack, and movement
//! reacting to the events combat publishes.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{debug, info, warn};

use runehaven_combat::{
    CombatEvent, CombatTarget, CombatZone, FactionRelation, GameEvent, PlayerCombatant,
    ProfileRegistry, ATTACK_INTERVAL_TICKS, MELEE_RANGE,
};
use runehaven_common::{EntityId, FactionId, RunehavenResult};

use crate::config::SimConfig;
use crate::movement::Locomotion;
use crate::timing::TickClock;

/// Totals gathered over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimReport {
    /// Frames simulated
    pub frames: u64,
    /// Ticks simulated
    pub ticks: u64,
    /// Final game time in seconds
    pub elapsed: f64,
    /// NPC deaths
    pub npc_deaths: u32,
    /// Loot drops credited to the player
    pub player_kills: u32,
    /// Loot drops credited to NPCs
    pub npc_kills: u32,
    /// NPC respawns
    pub respawns: u32,
    /// Damage the player dealt
    pub damage_dealt: u64,
    /// Damage the player took
    pub damage_taken: u64,
    /// Player deaths
    pub player_deaths: u32,
}

/// A running encounter.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    zone: CombatZone,
    clock: TickClock,
    locomotion: Locomotion,
    ticks_until_attack: u32,
    dead: BTreeSet<EntityId>,
    report: SimReport,
}

impl Simulation {
    /// Build the zone, player and NPC spawns.
    pub fn new(config: SimConfig, profiles: &ProfileRegistry) -> Result<Self> {
        let mut zone = CombatZone::new(config.seed).with_event_capacity(config.event_capacity);

        for &[a, b] in &config.hostilities {
            zone.factions_mut().set_mutual_relation(
                FactionId::new(a),
                FactionId::new(b),
                FactionRelation::AtWar,
            );
        }

        let p = &config.player;
        let player = PlayerCombatant::new(EntityId::new(), Vec2::new(p.x, p.y), p.skills)
            .with_equipment(p.equipment)
            .with_style(p.style);
        zone.set_player(player).context("Failed to register player")?;

        for spawn in &config.spawns {
            let profile = profiles.get(&spawn.profile).cloned();
            if profile.is_none() {
                warn!("Unknown profile '{}', spawning a passive NPC", spawn.profile);
            }
            let id = zone.spawn_npc(
                FactionId::new(spawn.faction),
                profile,
                Vec2::new(spawn.x, spawn.y),
            );
            info!("Spawned {} ({}) at ({}, {})", spawn.profile, id, spawn.x, spawn.y);
        }

        Ok(Self {
            locomotion: Locomotion::new(config.npc_speed),
            config,
            zone,
            clock: TickClock::default(),
            ticks_until_attack: 0,
            dead: BTreeSet::new(),
            report: SimReport::default(),
        })
    }

    /// The zone being simulated.
    #[must_use]
    pub const fn zone(&self) -> &CombatZone {
        &self.zone
    }

    /// Run for the configured duration.
    pub fn run(mut self) -> SimReport {
        let frames = self.config.total_frames();
        let dt = self.config.frame_dt();
        info!(
            "Simulating {} NPCs for {} frames ({} s, seed {})",
            self.zone().npc_ids().len(),
            frames,
            self.config.duration_seconds,
            self.config.seed
        );

        for _ in 0..frames {
            self.frame(dt);
        }

        self.report.ticks = self.clock.total_ticks();
        self.report.elapsed = self.zone.now();
        self.report
    }

    /// One frame: NPC frame updates, due ticks, events, then movement.
    pub fn frame(&mut self, dt: f32) {
        self.zone.update_frame(dt);

        let ticks = self.clock.accumulate(dt);
        for _ in 0..ticks {
            self.zone.tick();
            self.player_turn();
        }

        self.process_events();
        self.locomotion.step(&mut self.zone, dt);
        self.report.frames += 1;
    }

    /// Player auto-attack, one call per tick.
    fn player_turn(&mut self) {
        self.ticks_until_attack = self.ticks_until_attack.saturating_sub(1);
        if self.ticks_until_attack > 0 {
            return;
        }
        let Some(player) = self.zone.player() else {
            return;
        };
        let alive = player.is_alive();
        let origin = player.position();

        if !alive {
            if self.config.player.revive {
                if let Some(player) = self.zone.player_mut() {
                    player.revive();
                    info!("Player revived");
                }
            }
            self.ticks_until_attack = ATTACK_INTERVAL_TICKS;
            return;
        }

        let Some(target) = self.nearest_target(origin) else {
            return;
        };
        match self.zone.player_attack(target) {
            Ok(report) => {
                debug!("Player attacked {}: {:?}", target, report);
                self.report.damage_dealt += u64::from(report.applied);
                self.ticks_until_attack = ATTACK_INTERVAL_TICKS;
            },
            Err(e) => warn!("Player attack failed: {e}"),
        }
    }

    /// Closest living NPC within melee range of `origin`.
    fn nearest_target(&self, origin: Vec2) -> Option<EntityId> {
        self.zone
            .npc_ids()
            .into_iter()
            .filter_map(|id| self.zone.npc(id))
            .filter(|npc| npc.is_alive() && npc.is_visible())
            .map(|npc| (npc.id(), npc.position().distance(origin)))
            .filter(|&(_, distance)| distance <= MELEE_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn process_events(&mut self) {
        for event in self.zone.drain_events() {
            match event {
                GameEvent::Npc { npc, event } => {
                    self.locomotion.observe(npc, &event, &self.zone);
                    self.record_npc_event(npc, &event);
                },
                GameEvent::PlayerDamaged { amount, .. } => {
                    self.report.damage_taken += u64::from(amount);
                },
                GameEvent::PlayerDied { killer } => {
                    self.report.player_deaths += 1;
                    info!("Player killed by {:?}", killer);
                },
            }
        }
    }

    fn record_npc_event(&mut self, npc: EntityId, event: &CombatEvent) {
        match *event {
            CombatEvent::Death => {
                self.report.npc_deaths += 1;
                self.dead.insert(npc);
                info!("NPC {} died", npc);
            },
            CombatEvent::LootDrop { killed_by_player } => {
                if killed_by_player {
                    self.report.player_kills += 1;
                } else {
                    self.report.npc_kills += 1;
                }
            },
            CombatEvent::HealthChanged { current, max } if current == max => {
                if self.dead.remove(&npc) {
                    self.report.respawns += 1;
                    debug!("NPC {} respawned", npc);
                }
            },
            _ => {},
        }
    }
}

/// Load the configured profile table, or the built-in one.
pub fn load_profiles(config: &SimConfig) -> RunehavenResult<ProfileRegistry> {
    let profiles = match &config.profile_path {
        Some(path) => ProfileRegistry::load(path)?,
        None => ProfileRegistry::builtin()?,
    };
    info!("Loaded {} aggro profiles", profiles.len());
    Ok(profiles)
}

/// Build and run the configured encounter.
pub fn run(config: SimConfig) -> Result<SimReport> {
    let profiles = load_profiles(&config).context("Failed to load aggro profiles")?;
    let report = Simulation::new(config, &profiles)?.run();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnConfig;
    use runehaven_common::RunehavenError;

    fn short_config(seconds: f32) -> SimConfig {
        SimConfig {
            duration_seconds: seconds,
            ..SimConfig::default()
        }
    }

    fn builtin() -> ProfileRegistry {
        ProfileRegistry::builtin().expect("built-in profiles")
    }

    #[test]
    fn test_same_seed_same_report() {
        let a = Simulation::new(short_config(30.0), &builtin())
            .expect("build")
            .run();
        let b = Simulation::new(short_config(30.0), &builtin())
            .expect("build")
            .run();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tick_count_follows_duration() {
        let report = Simulation::new(short_config(6.0), &builtin())
            .expect("build")
            .run();
        assert_eq!(report.frames, 360);
        assert!((9..=10).contains(&report.ticks));
        assert!((report.elapsed - 6.0).abs() < 1e-3);
    }

    #[test]
    fn test_player_kills_goblins() {
        let report = Simulation::new(short_config(60.0), &builtin())
            .expect("build")
            .run();
        assert!(report.player_kills > 0);
        assert!(report.damage_dealt > 0);
        assert!(report.npc_deaths >= report.player_kills);
    }

    #[test]
    fn test_passive_npc_never_fights() {
        let config = SimConfig {
            duration_seconds: 20.0,
            spawns: vec![SpawnConfig {
                profile: "cow".to_string(),
                faction: 13,
                x: 3.0,
                y: 0.0,
            }],
            ..SimConfig::default()
        };
        let sim = Simulation::new(config, &builtin()).expect("build");
        let report = sim.run();
        assert_eq!(report.npc_deaths, 0);
        assert_eq!(report.damage_taken, 0);
    }

    #[test]
    fn test_unknown_profile_spawns_passive_npc() {
        let config = SimConfig {
            spawns: vec![SpawnConfig {
                profile: "dragon".to_string(),
                faction: 9,
                x: 1.0,
                y: 0.0,
            }],
            ..SimConfig::default()
        };
        let sim = Simulation::new(config, &builtin()).expect("build");
        let ids = sim.zone().npc_ids();
        assert_eq!(ids.len(), 1);
        let npc = sim.zone().npc(ids[0]).expect("spawned npc");
        assert!(npc.profile().is_none());
    }

    #[test]
    fn test_missing_profile_file_is_an_error() {
        let config = SimConfig {
            profile_path: Some("/nonexistent/profiles.ron".into()),
            ..SimConfig::default()
        };
        assert!(matches!(load_profiles(&config), Err(RunehavenError::Io(_))));
        assert!(run(config).is_err());
    }
}
