//! Game tick clock.
//!
//! Converts variable frame deltas into whole combat ticks.

use runehaven_combat::TICK_SECONDS;

/// Maximum ticks run for a single frame.
const MAX_TICKS_PER_FRAME: u32 = 10;

/// Fixed-step tick accumulator.
#[derive(Debug)]
pub struct TickClock {
    /// Accumulated frame time not yet spent on ticks
    accumulator: f32,
    /// Tick length in seconds
    tick_dt: f32,
    /// Ticks produced since creation
    total_ticks: u64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(TICK_SECONDS)
    }
}

impl TickClock {
    /// Create a clock with the given tick length.
    #[must_use]
    pub fn new(tick_dt: f32) -> Self {
        Self {
            accumulator: 0.0,
            tick_dt: tick_dt.max(0.001),
            total_ticks: 0,
        }
    }

    /// Ticks produced so far.
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Accumulate frame time.
    /// Returns the number of ticks that should run this frame.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.tick_dt && count < MAX_TICKS_PER_FRAME {
            self.accumulator -= self.tick_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog
        if self.accumulator > self.tick_dt * 2.0 {
            self.accumulator = 0.0;
        }

        self.total_ticks += u64::from(count);
        count
    }
}
