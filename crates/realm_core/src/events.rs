//! Observer-facing output: the bounded event log and notifications.
//!
//! The log is part of [`crate::state::GameState`] and survives snapshots.
//! Notifications are transient: each tick returns the ones it raised and
//! the caller may hand them to a [`NotificationSink`] afterwards.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::factions::FactionId;
use crate::grid::TilePos;

/// Number of entries the log retains.
pub const EVENT_LOG_CAPACITY: usize = 20;

/// Coarse grouping of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Production, depletion, research.
    Economy,
    /// New or upgraded structures, trained units.
    Construction,
    /// Fights and deaths.
    Military,
    /// Wars, alliances, peace.
    Diplomacy,
    /// Hero adventures.
    Adventure,
    /// World events and hostile spawns.
    World,
}

/// One log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic id.
    pub id: u64,
    /// Tick at which it happened.
    pub tick: u64,
    /// Category.
    pub category: EventCategory,
    /// Human-readable text.
    pub message: String,
    /// Where to jump to, if anywhere.
    pub location: Option<TilePos>,
}

/// Bounded, newest-first record of notable occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

impl EventLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry, dropping the oldest beyond capacity.
    pub fn push(
        &mut self,
        tick: u64,
        category: EventCategory,
        message: impl Into<String>,
        location: Option<TilePos>,
    ) {
        let entry = LogEntry {
            id: self.next_id,
            tick,
            category,
            message: message.into(),
            location,
        };
        self.next_id += 1;
        self.entries.push_front(entry);
        self.entries.truncate(EVENT_LOG_CAPACITY);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id the next entry will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }
}

/// Symbolic side-effect request for audio/visual layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Two units exchanged blows.
    Attack {
        /// Attacker tile.
        from: TilePos,
        /// Defender tile.
        to: TilePos,
    },
    /// A unit died.
    UnitDied {
        /// The dead unit.
        unit: UnitId,
        /// Where.
        pos: TilePos,
    },
    /// A unit finished training.
    UnitTrained {
        /// New unit.
        unit: UnitId,
        /// Settlement tile.
        pos: TilePos,
    },
    /// Expansion placed a structure.
    BuildingCompleted {
        /// Builder.
        faction: FactionId,
        /// Root tile.
        pos: TilePos,
    },
    /// A settlement was upgraded.
    SettlementUpgraded {
        /// Owner.
        faction: FactionId,
        /// Settlement tile.
        pos: TilePos,
    },
    /// A deposit ran dry.
    DepositExhausted {
        /// Tile.
        pos: TilePos,
    },
    /// Research unlocked a tech.
    TechUnlocked {
        /// Faction.
        faction: FactionId,
        /// Tech id.
        tech: String,
    },
    /// Two factions went to war.
    WarDeclared {
        /// Declaring side.
        aggressor: FactionId,
        /// Other side.
        target: FactionId,
    },
    /// Two factions allied.
    AllianceFormed {
        /// One side.
        a: FactionId,
        /// The other side.
        b: FactionId,
    },
    /// A war or alliance ended.
    RelationsNormalized {
        /// One side.
        a: FactionId,
        /// The other side.
        b: FactionId,
    },
    /// A leader left on an adventure.
    AdventureBegan {
        /// Faction.
        faction: FactionId,
    },
    /// A leader came home.
    AdventureEnded {
        /// Faction.
        faction: FactionId,
        /// Lore item found, if any.
        relic: Option<String>,
    },
    /// Wild units appeared.
    HostileSpawned {
        /// Where.
        pos: TilePos,
    },
    /// A world event was placed.
    WorldEvent {
        /// Event id.
        id: String,
        /// Where.
        pos: TilePos,
    },
}

impl Notification {
    /// Stable symbolic name, e.g. `"unit_died"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Attack { .. } => "attack",
            Self::UnitDied { .. } => "unit_died",
            Self::UnitTrained { .. } => "unit_trained",
            Self::BuildingCompleted { .. } => "building_completed",
            Self::SettlementUpgraded { .. } => "settlement_upgraded",
            Self::DepositExhausted { .. } => "deposit_exhausted",
            Self::TechUnlocked { .. } => "tech_unlocked",
            Self::WarDeclared { .. } => "war_declared",
            Self::AllianceFormed { .. } => "alliance_formed",
            Self::RelationsNormalized { .. } => "relations_normalized",
            Self::AdventureBegan { .. } => "adventure_began",
            Self::AdventureEnded { .. } => "adventure_ended",
            Self::HostileSpawned { .. } => "hostile_spawned",
            Self::WorldEvent { .. } => "world_event",
        }
    }
}

/// Receiver of notifications. Called only after a tick has committed.
pub trait NotificationSink {
    /// Handle one notification. Must not block.
    fn notify(&mut self, notification: &Notification);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notification: &Notification) {}
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: &Notification) {
        self.push(notification.clone());
    }
}
