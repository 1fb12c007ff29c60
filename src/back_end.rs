//! Back-end (control) node: the only authority on credentials.
//!
//! It stores the reference credential, compares every candidate against a
//! fresh read of storage, answers with an outcome code, and drives the door
//! motor and alarm. Unlock and change requests share one retry counter.

use core::convert::Infallible;

use embedded_storage::Storage;

use crate::actuator::Actuator;
use crate::config::Config;
use crate::credential::Credential;
use crate::link::{HandshakeState, Intent, Link, LinkError, Outcome, ProtocolError, SerialChannel, SetupOutcome};
use crate::lockout::{hold_lockout, Alarm, RetryCounter, Strike};
use crate::sequencer::{run_door_cycle, DoorTiming, MotorCycle};
use crate::storage::CredentialStore;
use crate::tick::{Stopwatch, TickSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackState {
    WaitingForPeer,
    ReceivingCredential,
    /// Setting or changing the stored credential.
    Initialization,
    /// Credential received, waiting for the intent byte.
    Request,
}

/// All back-end node state.
pub struct BackEnd<C, S, A, B, T> {
    link: Link<C>,
    store: CredentialStore<S>,
    actuator: A,
    alarm: B,
    clock: Stopwatch<T>,
    retries: RetryCounter,
    config: Config,
    in_setup: bool,
}

impl<C, S, A, B, T> BackEnd<C, S, A, B, T>
where
    C: SerialChannel,
    S: Storage,
    A: Actuator,
    B: Alarm,
    T: TickSource,
{
    pub fn new(
        channel: C,
        store: CredentialStore<S>,
        actuator: A,
        alarm: B,
        clock: Stopwatch<T>,
        config: Config,
    ) -> Self {
        Self {
            link: Link::new(channel),
            store,
            actuator,
            alarm,
            clock,
            retries: RetryCounter::new(config.max_attempts),
            config,
            in_setup: false,
        }
    }

    pub fn state(&self) -> BackState {
        match self.link.state() {
            HandshakeState::Transferring => BackState::ReceivingCredential,
            HandshakeState::AwaitingIntent => BackState::Request,
            _ if self.in_setup => BackState::Initialization,
            _ => BackState::WaitingForPeer,
        }
    }

    pub fn retries(&self) -> u8 {
        self.retries.failures()
    }

    pub fn link(&self) -> &Link<C> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<C> {
        &mut self.link
    }

    pub fn store_mut(&mut self) -> &mut CredentialStore<S> {
        &mut self.store
    }

    /// Receive a credential and its confirmation; persist the first if they
    /// are byte-for-byte equal.
    pub fn setup_round(&mut self) -> Result<SetupOutcome, LinkError> {
        self.in_setup = true;
        let result = self.exchange_setup_pair();
        // A broken exchange must not leave a stale handshake state behind
        self.link.finish();
        self.in_setup = false;
        result
    }

    fn exchange_setup_pair(&mut self) -> Result<SetupOutcome, LinkError> {
        let candidate = self.link.accept_credential()?;
        let confirmation = self.link.accept_credential()?;

        let verdict = if candidate.matches(&confirmation) {
            match self.store.save(&candidate) {
                Ok(()) => SetupOutcome::Match,
                Err(e) => {
                    // Report a mismatch so the user retries; nothing half
                    // written is ever treated as stored.
                    log::error!("back: {}, reporting mismatch", e);
                    SetupOutcome::Mismatch
                }
            }
        } else {
            log::info!("back: confirmation mismatch, nothing stored");
            SetupOutcome::Mismatch
        };
        drop(candidate);
        drop(confirmation);

        self.link.send_setup_outcome(verdict)?;
        Ok(verdict)
    }

    /// Repeat setup rounds until one stores a credential.
    pub fn run_credential_setup(&mut self) -> Result<(), LinkError> {
        loop {
            if self.setup_round()? == SetupOutcome::Match {
                log::info!("back: credential stored");
                return Ok(());
            }
        }
    }

    /// Compare against a fresh read of storage. Unreadable storage fails
    /// closed.
    fn check_stored(&mut self, candidate: &Credential) -> bool {
        match self.store.load() {
            Ok(stored) => stored.matches(candidate),
            Err(e) => {
                log::error!("back: {}, denying", e);
                false
            }
        }
    }

    /// Serve one steady-state request. Returns `None` when the intent byte
    /// was not recognised; the node then simply waits for the next
    /// send-ready.
    pub fn serve_request(&mut self) -> Result<Option<Outcome>, LinkError> {
        let candidate = self.link.accept_credential()?;
        let intent = match self.link.receive_intent() {
            Ok(intent) => intent,
            Err(ProtocolError::Link(e)) => return Err(e),
            Err(e) => {
                log::warn!("back: {}, waiting for next request", e);
                self.link.finish();
                return Ok(None);
            }
        };

        let matched = self.check_stored(&candidate);
        drop(candidate);

        let outcome = match (intent, matched) {
            (Intent::Unlock, true) => Outcome::UnlockGranted,
            (Intent::Change, true) => Outcome::ChangeAccepted,
            (_, false) => Outcome::WrongCredential,
        };
        self.link.send_outcome(outcome)?;
        self.link.finish();

        match outcome {
            Outcome::UnlockGranted => {
                log::info!("back: access GRANTED");
                self.retries.record_success();
                let timing = DoorTiming::from(&self.config);
                run_door_cycle(&mut MotorCycle(&mut self.actuator), &mut self.clock, timing);
            }
            Outcome::ChangeAccepted => {
                log::info!("back: credential change authorised");
                self.retries.record_success();
                self.run_credential_setup()?;
            }
            Outcome::WrongCredential => {
                log::warn!("back: access DENIED ({:?})", intent);
                if self.retries.record_failure() == Strike::LockedOut {
                    hold_lockout(
                        &mut self.alarm,
                        &mut self.clock,
                        &mut self.retries,
                        self.config.alarm_secs,
                    );
                }
            }
        }
        Ok(Some(outcome))
    }

    /// Back-end main loop: set up the credential, then serve requests.
    /// Returns only if the serial link fails.
    pub fn run(&mut self) -> Result<Infallible, LinkError> {
        log::info!("back: waiting for credential setup");
        self.run_credential_setup()?;
        loop {
            self.serve_request()?;
        }
    }
}
