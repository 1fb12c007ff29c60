//! Three-phase timed door cycle: engage, hold, disengage.
//!
//! Each phase restarts the node's tick counter and busy-waits until the
//! phase duration has elapsed. Once started, a cycle always runs to
//! completion; there is no cancellation path.

use crate::actuator::{Actuator, Motion};
use crate::config::Config;
use crate::tick::{Stopwatch, TickSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorPhase {
    /// Motor drives the bolt open.
    Engage,
    /// Door left open, motor idle.
    Hold,
    /// Motor drives the bolt closed.
    Disengage,
}

impl DoorPhase {
    pub const ALL: [DoorPhase; 3] = [DoorPhase::Engage, DoorPhase::Hold, DoorPhase::Disengage];
}

/// Phase durations in seconds. Engage and disengage share one duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorTiming {
    pub unlock_secs: u32,
    pub hold_open_secs: u32,
}

impl DoorTiming {
    pub fn duration(&self, phase: DoorPhase) -> u32 {
        match phase {
            DoorPhase::Engage | DoorPhase::Disengage => self.unlock_secs,
            DoorPhase::Hold => self.hold_open_secs,
        }
    }
}

impl From<&Config> for DoorTiming {
    fn from(config: &Config) -> Self {
        Self {
            unlock_secs: config.unlock_secs,
            hold_open_secs: config.hold_open_secs,
        }
    }
}

/// What happens at each phase boundary. The back-end moves the motor; the
/// front-end only updates its screen.
pub trait DoorCycle {
    fn enter(&mut self, phase: DoorPhase);

    /// Called once after the last phase has elapsed.
    fn finish(&mut self);
}

/// Physical cycle on the back-end.
pub struct MotorCycle<'a, A>(pub &'a mut A);

impl<A: Actuator> DoorCycle for MotorCycle<'_, A> {
    fn enter(&mut self, phase: DoorPhase) {
        let motion = match phase {
            DoorPhase::Engage => Motion::Unlock,
            DoorPhase::Hold => Motion::Stop,
            DoorPhase::Disengage => Motion::Lock,
        };
        self.0.drive(motion);
    }

    fn finish(&mut self) {
        self.0.drive(Motion::Stop);
    }
}

/// Run one complete engage/hold/disengage cycle.
pub fn run_door_cycle<C: DoorCycle, T: TickSource>(
    cycle: &mut C,
    clock: &mut Stopwatch<T>,
    timing: DoorTiming,
) {
    for phase in DoorPhase::ALL {
        let seconds = timing.duration(phase);
        log::info!("door: {:?} for {}s", phase, seconds);
        cycle.enter(phase);
        clock.wait_seconds(seconds);
    }
    cycle.finish();
    log::info!("door: cycle complete");
}
