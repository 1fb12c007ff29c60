//! Wrong-credential accounting and the lockout window.
//!
//! Each node keeps its own counter and derives lockout purely from the
//! outcome codes it saw, so the two nodes enter and leave lockout at about
//! the same time without a shared clock. One counter covers both unlock and
//! change requests.

use crate::tick::{Stopwatch, TickSource};

/// Something that signals the lockout condition: a buzzer on the back-end,
/// a warning screen on the front-end.
pub trait Alarm {
    fn on(&mut self);
    fn off(&mut self);
}

/// Result of recording a wrong credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strike {
    /// More attempts are allowed before lockout.
    Remaining(u8),
    /// The limit has been reached; the caller must hold the lockout window.
    LockedOut,
}

/// Consecutive wrong-credential counter in `[0, limit]`.
#[derive(Clone, Copy, Debug)]
pub struct RetryCounter {
    failures: u8,
    limit: u8,
}

impl RetryCounter {
    pub fn new(limit: u8) -> Self {
        Self {
            failures: 0,
            limit: limit.max(1),
        }
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn limit(&self) -> u8 {
        self.limit
    }

    pub fn remaining(&self) -> u8 {
        self.limit - self.failures
    }

    /// Any successful match clears the count.
    pub fn record_success(&mut self) {
        if self.failures != 0 {
            log::debug!("lockout: counter cleared after {} failures", self.failures);
        }
        self.failures = 0;
    }

    pub fn record_failure(&mut self) -> Strike {
        self.failures = self.failures.saturating_add(1).min(self.limit);
        if self.failures >= self.limit {
            Strike::LockedOut
        } else {
            Strike::Remaining(self.remaining())
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Hold `alarm` for `seconds` ticks, then reset `counter`.
///
/// Blocks the node for the whole window; no request is accepted meanwhile.
pub fn hold_lockout<A: Alarm, T: TickSource>(
    alarm: &mut A,
    clock: &mut Stopwatch<T>,
    counter: &mut RetryCounter,
    seconds: u32,
) {
    log::warn!(
        "lockout: {} wrong attempts, holding alarm for {}s",
        counter.failures(),
        seconds
    );
    alarm.on();
    clock.wait_seconds(seconds);
    alarm.off();
    counter.reset();
    log::info!("lockout: window expired, accepting requests again");
}
