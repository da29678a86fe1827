//! # Runehaven Combat
//!
//! Tick-based NPC combat for Runehaven.
//!
//! This crate provides:
//! - Combat math (effective levels, rolls, hit chance, max hit)
//! - Stat snapshots for players and NPCs
//! - Aggro profiles loaded from RON
//! - Faction relations
//! - Per-NPC threat ledger and engagement scheduler
//! - Damage resolution, kill credit, death and respawn
//! - A combat zone driving frame and tick updates
//! - Event bus for combat notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod combat_math;
pub mod engagement;
pub mod events;
pub mod faction;
pub mod npc_combat;
pub mod player;
pub mod profile;
pub mod resolution;
pub mod stats;
pub mod threat;
pub mod world;
pub mod zone;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::combat_math::*;
    pub use crate::engagement::*;
    pub use crate::events::*;
    pub use crate::faction::*;
    pub use crate::npc_combat::*;
    pub use crate::player::*;
    pub use crate::profile::*;
    pub use crate::resolution::*;
    pub use crate::stats::*;
    pub use crate::threat::*;
    pub use crate::world::*;
    pub use crate::zone::*;
}

pub use prelude::*;
