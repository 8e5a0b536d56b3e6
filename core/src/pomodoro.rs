//! Pomodoro focus timer.
//!
//! The timer is a plain state machine: whatever schedules the one-second
//! ticks (a tokio interval, a UI loop) owns the clock, and the machine owns
//! the rules. Completing a countdown yields exactly one stats contribution;
//! pausing, skipping, or resetting never contributes.

use crate::stats::StatsDelta;

/// Default session length: 25 minutes.
pub const DEFAULT_FOCUS_SECS: u32 = 25 * 60;
/// Default break length between sessions: 5 minutes.
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    total_secs: u32,
    remaining_secs: u32,
    state: TimerState,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(DEFAULT_FOCUS_SECS)
    }
}

impl FocusTimer {
    /// A new idle timer with `total_secs` on the clock. Zero-length timers
    /// are bumped to one second so a started countdown always ticks.
    #[must_use]
    pub fn new(total_secs: u32) -> Self {
        let total_secs = total_secs.max(1);
        Self {
            total_secs,
            remaining_secs: total_secs,
            state: TimerState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    #[must_use]
    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Begin (or resume) the countdown. Starting an already-running timer
    /// is a no-op: the caller's previous tick source stays the only one.
    pub fn start(&mut self) {
        self.state = TimerState::Running;
    }

    /// Stop the countdown, keeping the remaining time.
    pub fn pause(&mut self) {
        self.state = TimerState::Idle;
    }

    /// Stop and restore the full duration. No stats are contributed.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_secs = self.total_secs;
    }

    /// Abandon the current session. Identical to `reset` for the machine;
    /// kept separate because callers report it differently.
    pub fn skip(&mut self) {
        self.reset();
    }

    /// Advance the countdown by one second.
    ///
    /// Returns the completion contribution exactly once, on the tick that
    /// reaches zero; the machine then returns to idle with the clock reset
    /// to the full duration. Ticking an idle timer does nothing.
    pub fn tick(&mut self) -> Option<StatsDelta> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }
        self.state = TimerState::Idle;
        self.remaining_secs = self.total_secs;
        Some(StatsDelta::focus_session(i64::from(self.total_secs) / 60))
    }

    /// Fraction of the session still remaining, for circular progress.
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from(self.remaining_secs) / f64::from(self.total_secs)
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        let m = self.remaining_secs / 60;
        let s = self.remaining_secs % 60;
        format!("{m:02}:{s:02}")
    }
}
