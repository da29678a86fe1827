//! Simulator configuration.
//!
//! Describes the encounter to run: timing, randomness, where profiles come
//! from, the player and every NPC spawn. Loaded from and saved to TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use runehaven_combat::{CombatStyle, EquipmentBonuses, SkillLevels};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "runehaven.toml";

/// The player's loadout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Spawn X
    pub x: f32,
    /// Spawn Y
    pub y: f32,
    /// Attack style
    pub style: CombatStyle,
    /// Revive at full health after dying
    pub revive: bool,
    /// Skill levels
    pub skills: SkillLevels,
    /// Equipment bonuses
    pub equipment: EquipmentBonuses,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            style: CombatStyle::Aggressive,
            revive: true,
            skills: SkillLevels {
                attack: 40,
                strength: 40,
                defence: 40,
                hitpoints: 40,
            },
            equipment: EquipmentBonuses {
                attack: 20,
                strength: 20,
                melee_defence: 30,
                ranged_defence: 20,
                magic_defence: 5,
            },
        }
    }
}

/// One NPC placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Profile name; unknown names spawn a passive NPC
    pub profile: String,
    /// Faction id
    pub faction: u16,
    /// Spawn X
    pub x: f32,
    /// Spawn Y
    pub y: f32,
}

impl SpawnConfig {
    fn new(profile: &str, faction: u16, x: f32, y: f32) -> Self {
        Self {
            profile: profile.to_string(),
            faction,
            x,
            y,
        }
    }
}

/// Simulator configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Simulation ===
    /// Seed for hit and damage rolls
    pub seed: u64,
    /// Simulated time in seconds
    pub duration_seconds: f32,
    /// Frame updates per simulated second
    pub frames_per_second: u32,
    /// Capacity of the combat event bus
    pub event_capacity: usize,
    /// RON profile table (None = built-in profiles)
    pub profile_path: Option<PathBuf>,

    // === Movement ===
    /// NPC walking speed in world units per second
    pub npc_speed: f32,

    // === Scenario ===
    /// Faction pairs at war with each other
    pub hostilities: Vec<[u16; 2]>,
    /// The player
    pub player: PlayerConfig,
    /// NPC placements
    pub spawns: Vec<SpawnConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            duration_seconds: 120.0,
            frames_per_second: 60,
            event_capacity: 4096,
            profile_path: None,
            npc_speed: 2.0,
            hostilities: vec![[10, 11]],
            player: PlayerConfig::default(),
            spawns: vec![
                SpawnConfig::new("goblin", 10, 3.0, 0.0),
                SpawnConfig::new("goblin", 10, -3.0, 1.0),
                SpawnConfig::new("guard", 11, 0.0, 4.0),
                SpawnConfig::new("cow", 13, 2.0, -2.0),
                SpawnConfig::new("fire_elemental", 12, 12.0, 12.0),
            ],
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    ///
    /// Falls back to defaults when the file is missing or malformed.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to supported ranges.
    pub fn validate(&mut self) {
        self.duration_seconds = if self.duration_seconds.is_finite() {
            self.duration_seconds.clamp(1.0, 3600.0)
        } else {
            120.0
        };
        self.frames_per_second = self.frames_per_second.clamp(10, 240);
        self.event_capacity = self.event_capacity.clamp(64, 1_000_000);
        self.npc_speed = if self.npc_speed.is_finite() {
            self.npc_speed.clamp(0.1, 20.0)
        } else {
            2.0
        };
        self.player.skills.hitpoints = self.player.skills.hitpoints.max(1);
    }

    /// Number of frames the simulation runs for.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        (f64::from(self.duration_seconds) * f64::from(self.frames_per_second)).round() as u64
    }

    /// Seconds per frame.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frames_per_second.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.frames_per_second, 60);
        assert_eq!(config.spawns.len(), 5);
        assert!(config.profile_path.is_none());
        assert_eq!(config.total_frames(), 7200);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.duration_seconds = -5.0;
        config.frames_per_second = 1000;
        config.npc_speed = f32::INFINITY;
        config.event_capacity = 0;

        config.validate();

        assert_eq!(config.duration_seconds, 1.0);
        assert_eq!(config.frames_per_second, 240);
        assert!((config.npc_speed - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("sim.toml");

        let mut config = SimConfig::default();
        config.seed = 99;
        config.profile_path = Some(PathBuf::from("profiles.ron"));
        config.spawns.truncate(1);
        config.player.style = CombatStyle::Defensive;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/runehaven.toml");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_config_load_malformed_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "seed = \"not a number\"").expect("write config");
        assert_eq!(SimConfig::load_from(&config_path), SimConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            seed = 7

            [[spawns]]
            profile = "goblin"
            faction = 10
            x = 1.0
            y = 2.0
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.seed, 7);
        assert_eq!(config.frames_per_second, 60);
        assert_eq!(config.spawns.len(), 1);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn test_config_toml_serialization() {
        let toml_str = toml::to_string_pretty(&SimConfig::default()).expect("Failed to serialize");
        assert!(toml_str.contains("duration_seconds"));
        assert!(toml_str.contains("[[spawns]]"));
    }
}
