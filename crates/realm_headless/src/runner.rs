//! Driver loop around a [`Simulation`].
//!
//! The runner owns the world and a speed multiplier. Each driver step
//! advances `speed` ticks; a speed of zero pauses the world without
//! touching its state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use realm_core::events::{Notification, NotificationSink};
use realm_core::simulation::Simulation;
use realm_core::snapshot::Snapshot;

/// Highest accepted speed multiplier.
pub const MAX_SPEED: u32 = 1000;

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlessConfig {
    /// Ticks per driver step. Zero pauses.
    pub speed: u32,
    /// Log a progress line every this many ticks (0 = never).
    pub progress_every: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            speed: 1,
            progress_every: 0,
        }
    }
}

/// Counts notifications by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCounter {
    /// Count per [`Notification::name`].
    pub counts: BTreeMap<String, u64>,
}

impl NotificationCounter {
    /// Count for one notification name.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Total across all names.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl NotificationSink for NotificationCounter {
    fn notify(&mut self, notification: &Notification) {
        *self
            .counts
            .entry(notification.name().to_string())
            .or_insert(0) += 1;
    }
}

/// Headless runner for a single world.
#[derive(Debug)]
pub struct HeadlessRunner {
    simulation: Simulation,
    config: HeadlessConfig,
    notifications: NotificationCounter,
}

impl HeadlessRunner {
    /// Create a runner with default config.
    #[must_use]
    pub fn new(simulation: Simulation) -> Self {
        Self::with_config(simulation, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    #[must_use]
    pub fn with_config(simulation: Simulation, config: HeadlessConfig) -> Self {
        let mut runner = Self {
            simulation,
            config,
            notifications: NotificationCounter::default(),
        };
        runner.set_speed(config.speed);
        runner
    }

    /// Change the speed multiplier, clamped to [`MAX_SPEED`].
    pub fn set_speed(&mut self, speed: u32) {
        self.config.speed = speed.min(MAX_SPEED);
        tracing::debug!(speed = self.config.speed, "Speed set");
    }

    /// Current speed multiplier.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.config.speed
    }

    /// Whether the world is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.config.speed == 0
    }

    /// One driver step: `speed` ticks. Returns the ticks executed.
    pub fn step(&mut self) -> u64 {
        let ticks = u64::from(self.config.speed);
        self.advance(ticks);
        ticks
    }

    /// Drive until `ticks` more ticks have run, in steps of `speed`.
    ///
    /// The last step is shortened so the total is exact. A paused runner
    /// executes nothing and returns 0.
    pub fn run_ticks(&mut self, ticks: u64) -> u64 {
        if self.is_paused() {
            tracing::info!("Runner paused, no ticks executed");
            return 0;
        }
        let speed = u64::from(self.config.speed);
        let mut done = 0;
        while done < ticks {
            let chunk = speed.min(ticks - done);
            self.advance(chunk);
            done += chunk;
        }
        done
    }

    fn advance(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.simulation.tick_with_sink(&mut self.notifications);
            let tick = self.simulation.tick_count();
            if self.config.progress_every > 0 && tick % self.config.progress_every == 0 {
                let state = self.simulation.state();
                tracing::info!(
                    tick,
                    year = state.year(),
                    units = state.units().count(),
                    log = state.event_log().len(),
                    "Progress"
                );
            }
        }
    }

    /// The running world.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Notifications seen so far.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationCounter {
        &self.notifications
    }

    /// Capture the current world.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.simulation.snapshot()
    }

    /// Hand back the world.
    #[must_use]
    pub fn into_simulation(self) -> Simulation {
        self.simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_test_utils::fixtures::simulation;

    #[test]
    fn test_speed_zero_pauses() {
        let mut runner = HeadlessRunner::with_config(
            simulation(1),
            HeadlessConfig {
                speed: 0,
                progress_every: 0,
            },
        );
        let before = runner.simulation().state_hash();
        assert_eq!(runner.step(), 0);
        assert_eq!(runner.run_ticks(500), 0);
        assert_eq!(runner.simulation().tick_count(), 0);
        assert_eq!(runner.simulation().state_hash(), before);
        assert_eq!(runner.notifications().total(), 0);
    }

    #[test]
    fn test_speed_multiplies_ticks_per_step() {
        let mut runner = HeadlessRunner::new(simulation(1));
        runner.set_speed(8);
        assert_eq!(runner.step(), 8);
        assert_eq!(runner.simulation().tick_count(), 8);
    }

    #[test]
    fn test_run_ticks_is_exact_and_speed_independent() {
        let mut slow = HeadlessRunner::new(simulation(4));
        let mut fast = HeadlessRunner::new(simulation(4));
        fast.set_speed(7);
        assert_eq!(slow.run_ticks(450), 450);
        assert_eq!(fast.run_ticks(450), 450);
        assert_eq!(fast.simulation().tick_count(), 450);
        assert_eq!(slow.simulation().state_hash(), fast.simulation().state_hash());
        assert_eq!(slow.notifications(), fast.notifications());
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut runner = HeadlessRunner::new(simulation(1));
        runner.set_speed(u32::MAX);
        assert_eq!(runner.speed(), MAX_SPEED);
    }

    #[test]
    fn test_counter_matches_collected_notifications() {
        let mut runner = HeadlessRunner::new(simulation(9));
        runner.run_ticks(2_000);
        let direct = {
            let mut sim = simulation(9);
            let mut seen: Vec<Notification> = Vec::new();
            for _ in 0..2_000 {
                sim.tick_with_sink(&mut seen);
            }
            seen.len() as u64
        };
        assert_eq!(runner.notifications().total(), direct);
    }
}
