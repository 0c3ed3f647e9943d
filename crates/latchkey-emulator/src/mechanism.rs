//! Lock mechanism model of the reference firmware.
//!
//! The firmware drives a motorised latch with two resting positions. Each
//! command produces a fixed script: acknowledge with `BUSY`, wait for the
//! motor, report the outcome. [`LockMechanism::react`] computes that script
//! and applies the state change; [`serve`](crate::serve) plays it out on a
//! link with real delays.
//!
//! # Scripts
//!
//! | Byte | From       | Script                                              |
//! |------|------------|-----------------------------------------------------|
//! | `o`  | `Locked`   | `BUSY`, 3000 ms, `OPEN`, 200 ms, `UNLOCKED`         |
//! | `o`  | `Unlocked` | `BUSY`, 200 ms, `OPEN`, 200 ms, `UNLOCKED`          |
//! | `c`  | `Unlocked` | `BUSY`, 2800 ms, `LOCKED`                           |
//! | `c`  | `Locked`   | `BUSY`, 1 ms, `LOCKED`                              |
//! | `r`  | any        | `BUSY`, 4000 ms, `LOCKED`                           |
//! | else | any        | `BUSY`, current state                               |
//!
//! # Examples
//!
//! ```
//! use latchkey_core::DeviceState;
//! use latchkey_emulator::{Latch, LockMechanism, LockTimings, Step};
//!
//! let mut lock = LockMechanism::new(LockTimings::instant());
//! let script = lock.react(b'o');
//!
//! assert_eq!(script.first(), Some(&Step::Report(DeviceState::Busy)));
//! assert_eq!(script.last(), Some(&Step::Report(DeviceState::Unlocked)));
//! assert_eq!(lock.latch(), Latch::Unlocked);
//! ```

use latchkey_core::DeviceState;
use latchkey_protocol::Command;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Number of latch movements kept for inspection.
const MAX_HISTORY_SIZE: usize = 32;

/// Resting position of the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Latch {
    /// Bolt engaged. Power-on position.
    #[default]
    Locked,
    /// Bolt retracted.
    Unlocked,
}

impl Latch {
    /// Status word the firmware reports for this position.
    pub fn as_state(self) -> DeviceState {
        match self {
            Self::Locked => DeviceState::Locked,
            Self::Unlocked => DeviceState::Unlocked,
        }
    }
}

impl fmt::Display for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_state().as_str())
    }
}

/// Motor timings of the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimings {
    /// Unlocking from the locked position.
    pub open_from_locked: Duration,
    /// Re-opening when already unlocked.
    pub open_from_unlocked: Duration,
    /// Pause between `OPEN` and `UNLOCKED`.
    pub open_settle: Duration,
    /// Locking from the unlocked position.
    pub close: Duration,
    /// Answer delay when a close finds the latch already locked.
    pub already_locked: Duration,
    /// Full reference (homing) run.
    pub reference_run: Duration,
}

impl Default for LockTimings {
    fn default() -> Self {
        Self {
            open_from_locked: Duration::from_millis(3000),
            open_from_unlocked: Duration::from_millis(200),
            open_settle: Duration::from_millis(200),
            close: Duration::from_millis(2800),
            already_locked: Duration::from_millis(1),
            reference_run: Duration::from_millis(4000),
        }
    }
}

impl LockTimings {
    /// Timings with every delay set to zero.
    pub fn instant() -> Self {
        Self {
            open_from_locked: Duration::ZERO,
            open_from_unlocked: Duration::ZERO,
            open_settle: Duration::ZERO,
            close: Duration::ZERO,
            already_locked: Duration::ZERO,
            reference_run: Duration::ZERO,
        }
    }

    /// Divide every delay by `factor`. A factor of zero is treated as one.
    pub fn scaled_down(self, factor: u32) -> Self {
        let factor = factor.max(1);
        Self {
            open_from_locked: self.open_from_locked / factor,
            open_from_unlocked: self.open_from_unlocked / factor,
            open_settle: self.open_settle / factor,
            close: self.close / factor,
            already_locked: self.already_locked / factor,
            reference_run: self.reference_run / factor,
        }
    }
}

/// One step of a command script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send a status line.
    Report(DeviceState),
    /// Wait for the motor.
    Wait(Duration),
}

/// A recorded latch movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Command that caused the movement.
    pub command: Command,
    /// Position before.
    pub from: Latch,
    /// Position after.
    pub to: Latch,
}

/// Simulated lock mechanism.
#[derive(Debug, Clone)]
pub struct LockMechanism {
    latch: Latch,
    timings: LockTimings,
    history: VecDeque<Movement>,
}

impl LockMechanism {
    /// Create a mechanism in the power-on (locked) position.
    pub fn new(timings: LockTimings) -> Self {
        Self::with_latch(Latch::Locked, timings)
    }

    /// Create a mechanism in a given position.
    pub fn with_latch(latch: Latch, timings: LockTimings) -> Self {
        Self {
            latch,
            timings,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Current latch position.
    pub fn latch(&self) -> Latch {
        self.latch
    }

    /// Recent movements, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Movement> {
        self.history.iter()
    }

    /// React to one received byte.
    ///
    /// Applies the resulting state change immediately and returns the
    /// script to play out. Whitespace produces an empty script.
    pub fn react(&mut self, byte: u8) -> Vec<Step> {
        if byte.is_ascii_whitespace() {
            return Vec::new();
        }

        let mut script = vec![Step::Report(DeviceState::Busy)];
        let t = self.timings;

        match Command::from_byte(byte) {
            Ok(Command::Open) => {
                let travel = match self.latch {
                    Latch::Locked => t.open_from_locked,
                    Latch::Unlocked => t.open_from_unlocked,
                };
                script.push(Step::Wait(travel));
                script.push(Step::Report(DeviceState::Open));
                script.push(Step::Wait(t.open_settle));
                self.move_to(Command::Open, Latch::Unlocked);
            }
            Ok(Command::Close) => match self.latch {
                Latch::Unlocked => {
                    script.push(Step::Wait(t.close));
                    self.move_to(Command::Close, Latch::Locked);
                }
                Latch::Locked => script.push(Step::Wait(t.already_locked)),
            },
            Ok(Command::Reference) => {
                script.push(Step::Wait(t.reference_run));
                self.move_to(Command::Reference, Latch::Locked);
            }
            Ok(Command::State) | Err(_) => {}
        }

        script.push(Step::Report(self.latch.as_state()));
        script
    }

    fn move_to(&mut self, command: Command, to: Latch) {
        let from = self.latch;
        self.latch = to;

        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(Movement { command, from, to });
    }
}

impl Default for LockMechanism {
    fn default() -> Self {
        Self::new(LockTimings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reports(script: &[Step]) -> Vec<DeviceState> {
        script
            .iter()
            .filter_map(|step| match step {
                Step::Report(state) => Some(*state),
                Step::Wait(_) => None,
            })
            .collect()
    }

    fn total_wait(script: &[Step]) -> Duration {
        script
            .iter()
            .map(|step| match step {
                Step::Wait(d) => *d,
                Step::Report(_) => Duration::ZERO,
            })
            .sum()
    }

    #[test]
    fn test_power_on_is_locked() {
        let lock = LockMechanism::default();
        assert_eq!(lock.latch(), Latch::Locked);
        assert_eq!(lock.history().count(), 0);
    }

    #[rstest]
    #[case(Latch::Locked, b'o', &[DeviceState::Busy, DeviceState::Open, DeviceState::Unlocked], Latch::Unlocked, 3200)]
    #[case(Latch::Unlocked, b'o', &[DeviceState::Busy, DeviceState::Open, DeviceState::Unlocked], Latch::Unlocked, 400)]
    #[case(Latch::Unlocked, b'c', &[DeviceState::Busy, DeviceState::Locked], Latch::Locked, 2800)]
    #[case(Latch::Locked, b'c', &[DeviceState::Busy, DeviceState::Locked], Latch::Locked, 1)]
    #[case(Latch::Unlocked, b'r', &[DeviceState::Busy, DeviceState::Locked], Latch::Locked, 4000)]
    #[case(Latch::Unlocked, b's', &[DeviceState::Busy, DeviceState::Unlocked], Latch::Unlocked, 0)]
    #[case(Latch::Locked, b'x', &[DeviceState::Busy, DeviceState::Locked], Latch::Locked, 0)]
    fn test_scripts(
        #[case] start: Latch,
        #[case] byte: u8,
        #[case] expected: &[DeviceState],
        #[case] end: Latch,
        #[case] wait_ms: u64,
    ) {
        let mut lock = LockMechanism::with_latch(start, LockTimings::default());
        let script = lock.react(byte);

        assert_eq!(reports(&script), expected);
        assert_eq!(total_wait(&script), Duration::from_millis(wait_ms));
        assert_eq!(lock.latch(), end);
    }

    #[rstest]
    #[case(b' ')]
    #[case(b'\r')]
    #[case(b'\n')]
    fn test_whitespace_is_ignored(#[case] byte: u8) {
        let mut lock = LockMechanism::default();
        assert!(lock.react(byte).is_empty());
    }

    #[test]
    fn test_history_records_movements_only() {
        let mut lock = LockMechanism::new(LockTimings::instant());
        lock.react(b'o');
        lock.react(b's');
        lock.react(b'c');
        lock.react(b'c');

        let moves: Vec<_> = lock.history().copied().collect();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].command, Command::Open);
        assert_eq!(moves[0].to, Latch::Unlocked);
        assert_eq!(moves[1].from, Latch::Unlocked);
        assert_eq!(moves[1].to, Latch::Locked);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut lock = LockMechanism::new(LockTimings::instant());
        for _ in 0..MAX_HISTORY_SIZE {
            lock.react(b'o');
            lock.react(b'c');
        }
        assert_eq!(lock.history().count(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_scaled_timings() {
        let timings = LockTimings::default().scaled_down(10);
        assert_eq!(timings.open_from_locked, Duration::from_millis(300));
        assert_eq!(timings.reference_run, Duration::from_millis(400));
        assert_eq!(LockTimings::default().scaled_down(0), LockTimings::default());
    }

    #[test]
    fn test_latch_serde() {
        let json = serde_json::to_string(&Latch::Unlocked).unwrap();
        assert_eq!(json, "\"unlocked\"");
    }
}
