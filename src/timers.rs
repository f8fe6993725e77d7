//! Millisecond deadlines and intervals on a wrapping 32 bit clock.
//!
//! All comparisons use signed wrap-safe subtraction, so they stay correct across the
//! `u32::MAX` rollover of the millisecond counter.

/// Whether `now` is at or after `due`.
pub fn deadline_reached(now: u32, due: u32) -> bool {
    (now.wrapping_sub(due) as i32) >= 0
}

/// Types of timers that the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerType {
    /// Period between EPR keep-alive messages of an active EPR sink.
    SinkEprKeepAlive,
    /// Period of the poll loop's processing step.
    Process,
    /// Period of the debug status line.
    DebugReport,
}

/// An absolute point in time at which something is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Deadline(u32);

impl Deadline {
    /// A deadline `milliseconds` after `now`.
    pub fn after(now: u32, milliseconds: u32) -> Self {
        Self(now.wrapping_add(milliseconds))
    }

    /// The absolute due time.
    pub fn due(&self) -> u32 {
        self.0
    }

    /// Whether the deadline has passed at `now`.
    pub fn expired(&self, now: u32) -> bool {
        deadline_reached(now, self.0)
    }
}

/// A free-running period, used to rate-limit poll loop work.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Interval {
    last: u32,
    period: u32,
}

impl Interval {
    /// Create an interval that first elapses `period` milliseconds after `now`.
    pub fn new(now: u32, period: u32) -> Self {
        Self { last: now, period }
    }

    /// Returns `true` and restarts the interval if at least one period has passed since the last tick.
    pub fn tick(&mut self, now: u32) -> bool {
        if now.wrapping_sub(self.last) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}
