//! Door motor and alarm drivers.

use embedded_hal::digital::OutputPin;

use crate::lockout::Alarm;

/// Motor command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Unlock,
    Lock,
    Stop,
}

/// Something that moves the bolt.
pub trait Actuator {
    fn drive(&mut self, motion: Motion);
}

/// DC motor behind an H-bridge with two direction inputs.
///
/// IN1 high = unlock (clockwise), IN2 high = lock (anti-clockwise), both low
/// = stop. Both inputs are never high at once.
pub struct HBridge<P> {
    in1: P,
    in2: P,
}

impl<P: OutputPin> HBridge<P> {
    /// Takes the two direction pins and stops the motor.
    pub fn new(in1: P, in2: P) -> Self {
        let mut bridge = Self { in1, in2 };
        bridge.drive(Motion::Stop);
        bridge
    }
}

impl<P: OutputPin> Actuator for HBridge<P> {
    fn drive(&mut self, motion: Motion) {
        // Drop the active side first so the bridge never sees both high.
        let result = match motion {
            Motion::Stop => self.in1.set_low().and_then(|_| self.in2.set_low()),
            Motion::Unlock => self.in2.set_low().and_then(|_| self.in1.set_high()),
            Motion::Lock => self.in1.set_low().and_then(|_| self.in2.set_high()),
        };
        if result.is_err() {
            log::error!("door: motor pin write failed ({:?})", motion);
        }
    }
}

/// Buzzer on one active-high pin.
pub struct Buzzer<P> {
    pin: P,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin }
    }
}

impl<P: OutputPin> Alarm for Buzzer<P> {
    fn on(&mut self) {
        if self.pin.set_high().is_err() {
            log::error!("alarm: buzzer pin write failed");
        }
    }

    fn off(&mut self) {
        if self.pin.set_low().is_err() {
            log::error!("alarm: buzzer pin write failed");
        }
    }
}
