//! Front-end (HMI) node: keypad capture, LCD feedback, initiator side of the
//! credential handshake.
//!
//! This node never decides anything. It relays what the user typed and
//! reacts to the back-end's outcome codes:
//! - `UnlockGranted`: mirror the door cycle on screen (no actuation here)
//! - `WrongCredential`: count it; at the limit show the warning for the
//!   lockout window, in step with the back-end's alarm
//! - `ChangeAccepted`: run the setup loop for the new credential

use core::convert::Infallible;
use core::fmt::Write as FmtWrite;

use embedded_hal::delay::DelayNs;
use heapless::String as HString;
use zeroize::Zeroize;

use crate::config::{Config, PASS_LEN};
use crate::credential::Credential;
use crate::keypad::{Key, Keypad};
use crate::lcd::{Display, LCD_COLS};
use crate::link::{HandshakeState, Intent, Link, LinkError, Outcome, ProtocolError, SerialChannel, SetupOutcome};
use crate::lockout::{hold_lockout, Alarm, RetryCounter, Strike};
use crate::sequencer::{run_door_cycle, DoorCycle, DoorPhase, DoorTiming};
use crate::tick::{Stopwatch, TickSource};

const MASK_CHAR: &str = "*";

/// Where the front-end is in its request flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontState {
    Idle,
    CapturingCredential,
    /// Send-ready sent, waiting for the back-end's receive-ready.
    AwaitingPeerReady,
    Transferring,
    /// Intent (or confirmation) sent, waiting for the verdict.
    AwaitingOutcome,
}

/// Door status screens, timed like the back-end's motor.
pub struct StatusCycle<'a, D>(pub &'a mut D);

impl<D: Display> DoorCycle for StatusCycle<'_, D> {
    fn enter(&mut self, phase: DoorPhase) {
        self.0.clear();
        let text = match phase {
            DoorPhase::Engage => "Opening Door...",
            DoorPhase::Hold => "Door is Open",
            DoorPhase::Disengage => "Locking Door...",
        };
        self.0.show(text, 0, 0);
    }

    fn finish(&mut self) {
        self.0.clear();
    }
}

/// Lockout warning shown instead of a buzzer.
pub struct WarningScreen<'a, D>(pub &'a mut D);

impl<D: Display> Alarm for WarningScreen<'_, D> {
    fn on(&mut self) {
        self.0.clear();
        self.0.show("WARNING!!", 0, 3);
        self.0.show("Calling Security", 1, 0);
    }

    fn off(&mut self) {
        self.0.clear();
    }
}

/// All front-end node state.
pub struct FrontEnd<C, K, D, Y, T> {
    link: Link<C>,
    keypad: K,
    display: D,
    delay: Y,
    clock: Stopwatch<T>,
    retries: RetryCounter,
    config: Config,
    capturing: bool,
}

impl<C, K, D, Y, T> FrontEnd<C, K, D, Y, T>
where
    C: SerialChannel,
    K: Keypad,
    D: Display,
    Y: DelayNs,
    T: TickSource,
{
    pub fn new(channel: C, keypad: K, display: D, delay: Y, clock: Stopwatch<T>, config: Config) -> Self {
        Self {
            link: Link::new(channel),
            keypad,
            display,
            delay,
            clock,
            retries: RetryCounter::new(config.max_attempts),
            config,
            capturing: false,
        }
    }

    pub fn state(&self) -> FrontState {
        if self.capturing {
            return FrontState::CapturingCredential;
        }
        match self.link.state() {
            HandshakeState::Idle => FrontState::Idle,
            HandshakeState::AwaitingReadyToReceive => FrontState::AwaitingPeerReady,
            HandshakeState::Transferring => FrontState::Transferring,
            _ => FrontState::AwaitingOutcome,
        }
    }

    /// Wrong credentials seen since the last success or lockout.
    pub fn retries(&self) -> u8 {
        self.retries.failures()
    }

    pub fn link(&self) -> &Link<C> {
        &self.link
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn keypad(&self) -> &K {
        &self.keypad
    }

    fn prompt(&mut self, text: &str) {
        self.display.clear();
        self.display.show(text, 0, 0);
    }

    fn flash_message(&mut self, line0: &str, line1: &str) {
        self.display.clear();
        self.display.show(line0, 0, 0);
        if !line1.is_empty() {
            self.display.show(line1, 1, 0);
        }
        self.delay.delay_ms(self.config.message_ms);
    }

    pub fn show_main_menu(&mut self) {
        self.display.clear();
        self.display.show("+: Open Door", 0, 0);
        self.display.show("-: Change Pass", 1, 0);
    }

    /// Collect exactly `PASS_LEN` digit keys, echoing a mask per digit, then
    /// wait for the enter key. Other keys are ignored.
    pub fn capture_credential(&mut self) -> Credential {
        self.capturing = true;
        let mut digits = [0u8; PASS_LEN];
        let mut count = 0;

        while count < PASS_LEN {
            if let Key::Digit(value) = self.keypad.read_key() {
                self.display.show(MASK_CHAR, 1, count as u8);
                digits[count] = value;
                count += 1;
            }
            self.delay.delay_ms(self.config.key_repeat_ms);
        }

        // Stay until the user confirms
        while self.keypad.read_key() != Key::Enter {}

        self.capturing = false;
        let credential = Credential::new(digits);
        digits.zeroize();
        credential
    }

    fn transfer(&mut self, credential: Credential) -> Result<(), LinkError> {
        self.link.offer_credential(&credential)
    }

    /// Capture a credential and its confirmation, transfer both, and repeat
    /// until the back-end reports that they match. No attempt limit.
    pub fn run_initial_setup(&mut self) -> Result<(), LinkError> {
        loop {
            self.prompt("New Pass:");
            let first = self.capture_credential();
            self.transfer(first)?;

            self.prompt("Re-enter Pass");
            let confirmation = self.capture_credential();
            self.transfer(confirmation)?;

            let verdict = self.link.receive_setup_outcome();
            self.link.finish();
            match verdict {
                Ok(SetupOutcome::Match) => {
                    log::info!("front: new credential accepted");
                    self.display.clear();
                    return Ok(());
                }
                Ok(SetupOutcome::Mismatch) => {
                    log::info!("front: confirmation did not match, retrying");
                    self.flash_message("Pass Mismatch", "");
                }
                Err(ProtocolError::Link(e)) => return Err(e),
                Err(e) => {
                    log::warn!("front: {}, retrying setup", e);
                    self.flash_message("Link Error", "");
                }
            }
        }
    }

    /// Capture, transfer, send `intent`, wait for the verdict. `None` means
    /// the reply was not a known outcome code.
    fn submit(&mut self, intent: Intent) -> Result<Option<Outcome>, LinkError> {
        let credential = self.capture_credential();
        self.transfer(credential)?;
        self.link.send_intent(intent)?;

        let reply = self.link.receive_outcome();
        self.link.finish();
        match reply {
            Ok(outcome) => {
                log::debug!("front: {:?} -> {:?}", intent, outcome);
                Ok(Some(outcome))
            }
            Err(ProtocolError::Link(e)) => Err(e),
            Err(e) => {
                log::warn!("front: {}, back to menu", e);
                self.flash_message("Link Error", "");
                Ok(None)
            }
        }
    }

    fn on_wrong_credential(&mut self) {
        match self.retries.record_failure() {
            Strike::Remaining(left) => {
                log::info!("front: wrong credential, {} attempts left", left);
                let mut line: HString<{ LCD_COLS as usize }> = HString::new();
                let _ = write!(line, "Tries left: {}", left);
                self.flash_message("Incorrect Pass", &line);
            }
            Strike::LockedOut => {
                let mut warning = WarningScreen(&mut self.display);
                hold_lockout(
                    &mut warning,
                    &mut self.clock,
                    &mut self.retries,
                    self.config.alarm_secs,
                );
            }
        }
    }

    fn show_door_cycle(&mut self) {
        let timing = DoorTiming::from(&self.config);
        run_door_cycle(&mut StatusCycle(&mut self.display), &mut self.clock, timing);
    }

    pub fn run_unlock_request(&mut self) -> Result<Option<Outcome>, LinkError> {
        self.prompt("Enter Pass");
        let outcome = self.submit(Intent::Unlock)?;
        match outcome {
            Some(Outcome::UnlockGranted) => {
                self.retries.record_success();
                self.show_door_cycle();
            }
            Some(Outcome::WrongCredential) => self.on_wrong_credential(),
            Some(Outcome::ChangeAccepted) => {
                log::warn!("front: change-accepted reply to an unlock request ignored");
            }
            None => {}
        }
        Ok(outcome)
    }

    pub fn run_change_request(&mut self) -> Result<Option<Outcome>, LinkError> {
        self.prompt("Enter Your Pass");
        let outcome = self.submit(Intent::Change)?;
        match outcome {
            Some(Outcome::ChangeAccepted) => {
                self.retries.record_success();
                self.run_initial_setup()?;
            }
            Some(Outcome::WrongCredential) => self.on_wrong_credential(),
            Some(Outcome::UnlockGranted) => {
                log::warn!("front: unlock-granted reply to a change request ignored");
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Wait on the menu for `+` (unlock) or `-` (change) and run that
    /// request. Other keys are ignored.
    pub fn poll_menu(&mut self) -> Result<Option<Outcome>, LinkError> {
        loop {
            match self.keypad.read_key() {
                Key::Plus => return self.run_unlock_request(),
                Key::Minus => return self.run_change_request(),
                _ => {}
            }
        }
    }

    /// Front-end main loop. Returns only if the serial link fails.
    pub fn run(&mut self) -> Result<Infallible, LinkError> {
        log::info!("front: starting credential setup");
        self.run_initial_setup()?;
        loop {
            self.show_main_menu();
            self.poll_menu()?;
        }
    }
}
