//! Clock - The single fixed-period tick source
//!
//! The state machine owns at most one `TickClock` at a time, stored inside
//! the phase that needs it. Leaving the phase drops the clock, so a
//! cancelled race cannot produce another tick.

use serde::{Deserialize, Serialize};

/// Which phase a clock is driving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockKind {
    Countdown,
    Race,
    FinishHold,
}

/// One fired tick, handed to the simulators as their only notion of time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Zero-based sequence number within this clock
    pub index: u64,
    /// Tick length in time-units
    pub dt: f32,
}

/// Fixed-step accumulator clock
#[derive(Debug, Clone)]
pub struct TickClock {
    kind: ClockKind,
    period: f32,
    accumulator: f32,
    fired: u64,
}

impl TickClock {
    pub fn new(kind: ClockKind, period: f32) -> Self {
        Self {
            kind,
            period,
            accumulator: 0.0,
            fired: 0,
        }
    }

    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    /// Number of ticks fired so far
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Feed elapsed wall time and return how many ticks are due.
    ///
    /// At most `max_ticks` are returned; any backlog beyond that is dropped
    /// rather than replayed later.
    pub fn accumulate(&mut self, delta: f32, max_ticks: u32) -> u32 {
        if !delta.is_finite() || delta <= 0.0 || self.period <= 0.0 {
            return 0;
        }

        self.accumulator += delta;
        let mut due = 0;
        while self.accumulator >= self.period && due < max_ticks {
            self.accumulator -= self.period;
            due += 1;
        }
        if self.accumulator >= self.period {
            log::debug!(
                "{:?} clock dropping {:.3} units of backlog",
                self.kind,
                self.accumulator
            );
            self.accumulator %= self.period;
        }
        due
    }

    /// Consume one tick
    pub fn fire(&mut self) -> Tick {
        let tick = Tick {
            index: self.fired,
            dt: self.period,
        };
        self.fired += 1;
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_partial_periods() {
        let mut clock = TickClock::new(ClockKind::Race, 0.1);
        assert_eq!(clock.accumulate(0.05, 10), 0);
        assert_eq!(clock.accumulate(0.06, 10), 1);
        assert_eq!(clock.accumulate(0.25, 10), 2);
    }

    #[test]
    fn caps_catch_up_and_drops_backlog() {
        let mut clock = TickClock::new(ClockKind::Countdown, 1.0);
        assert_eq!(clock.accumulate(50.5, 3), 3);
        // backlog is gone, only the fractional remainder survives
        assert_eq!(clock.accumulate(0.4, 3), 0);
        assert_eq!(clock.accumulate(0.2, 3), 1);
    }

    #[test]
    fn ignores_bad_deltas() {
        let mut clock = TickClock::new(ClockKind::Race, 0.1);
        assert_eq!(clock.accumulate(-1.0, 10), 0);
        assert_eq!(clock.accumulate(f32::NAN, 10), 0);
    }

    #[test]
    fn fire_numbers_ticks() {
        let mut clock = TickClock::new(ClockKind::FinishHold, 1.0);
        assert_eq!(clock.fire().index, 0);
        let tick = clock.fire();
        assert_eq!(tick.index, 1);
        assert_eq!(tick.dt, 1.0);
        assert_eq!(clock.fired(), 2);
    }
}
