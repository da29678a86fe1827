//! Outbound combat notifications and the bus carrying them.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use runehaven_common::EntityId;

/// Default event bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Notification emitted by an NPC's combat state.
///
/// Consumers (HUD, movement, loot, animation) react to these; the combat
/// state never waits on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Hitpoints changed
    HealthChanged {
        /// Hitpoints after the change
        current: u32,
        /// Maximum hitpoints
        max: u32,
    },
    /// Hitpoints reached zero
    Death,
    /// In-combat flag flipped
    CombatStateChanged {
        /// New value
        in_combat: bool,
    },
    /// First cycle started, movement should pursue this target
    EnterCombat {
        /// Target to pursue
        target: EntityId,
    },
    /// A cycle ended
    ExitCombat {
        /// Target no longer engaged
        target: EntityId,
    },
    /// Combat fully reset, movement should walk home
    ReturnToSpawn {
        /// Spawn point
        spawn: Vec2,
    },
    /// Nearest engaged target changed
    FaceTowards {
        /// Target being faced
        target: EntityId,
        /// Unit direction towards the target
        direction: Vec2,
    },
    /// A strike was attempted
    PlayAttackAnimation {
        /// Facing direction at the time of the strike
        direction: Vec2,
    },
    /// Loot should be rolled
    LootDrop {
        /// Whether the player earned the kill
        killed_by_player: bool,
    },
}

/// Event types carried by the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An NPC's combat notification
    Npc {
        /// NPC that emitted the event
        npc: EntityId,
        /// The notification
        event: CombatEvent,
    },
    /// The player took damage
    PlayerDamaged {
        /// Final damage applied
        amount: u32,
        /// Attacker, if any
        source: Option<EntityId>,
        /// Hitpoints left
        remaining: u32,
    },
    /// The player's hitpoints reached zero
    PlayerDied {
        /// Last attacker, if any
        killer: Option<EntityId>,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns `false` if the bus was full and the event was dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}
