//! Single-byte serial protocol between the two nodes.
//!
//! There is no framing: every control code is one byte, and a credential is
//! exactly `PASS_LEN` consecutive digit bytes. Ordering between the nodes is
//! enforced only by the ready/ready handshake:
//!
//! ```text
//!   front-end                    back-end
//!   SEND_READY (0x15)   ──────▶
//!                       ◀──────  RECEIVE_READY (0x16)
//!   d0 d1 d2 d3 d4      ──────▶
//!   intent (+ / 0x18)   ──────▶                       (request path only)
//!                       ◀──────  outcome
//! ```
//!
//! During credential setup the back-end answers with `SEND_READY` followed
//! by `MATCH` (1) or `MISMATCH` (0).

use core::fmt;

use crate::config::PASS_LEN;
use crate::credential::Credential;

pub const SEND_READY: u8 = 0x15;
pub const RECEIVE_READY: u8 = 0x16;
pub const INTENT_CHANGE: u8 = 0x18;
pub const INTENT_UNLOCK: u8 = b'+';
pub const UNLOCK_GRANTED: u8 = 0x25;
pub const WRONG_CREDENTIAL: u8 = 0x30;
pub const CHANGE_ACCEPTED: u8 = 0x31;
pub const MATCH: u8 = 1;
pub const MISMATCH: u8 = 0;

/// Transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkError {
    Read,
    Write,
    /// The peer side of the channel is gone.
    Closed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Read => f.write_str("serial read failed"),
            LinkError::Write => f.write_str("serial write failed"),
            LinkError::Closed => f.write_str("serial channel closed"),
        }
    }
}

/// A received byte that does not belong to the expected code set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownIntent(u8),
    UnknownOutcome(u8),
    UnknownSetupOutcome(u8),
    Link(LinkError),
}

impl From<LinkError> for ProtocolError {
    fn from(e: LinkError) -> Self {
        ProtocolError::Link(e)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownIntent(b) => write!(f, "unknown intent byte 0x{:02X}", b),
            ProtocolError::UnknownOutcome(b) => write!(f, "unknown outcome byte 0x{:02X}", b),
            ProtocolError::UnknownSetupOutcome(b) => {
                write!(f, "unknown setup outcome byte 0x{:02X}", b)
            }
            ProtocolError::Link(e) => write!(f, "{}", e),
        }
    }
}

/// What the front-end asks for after transferring a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Unlock,
    Change,
}

impl Intent {
    pub const fn code(self) -> u8 {
        match self {
            Intent::Unlock => INTENT_UNLOCK,
            Intent::Change => INTENT_CHANGE,
        }
    }
}

impl TryFrom<u8> for Intent {
    type Error = ProtocolError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            INTENT_UNLOCK => Ok(Intent::Unlock),
            INTENT_CHANGE => Ok(Intent::Change),
            other => Err(ProtocolError::UnknownIntent(other)),
        }
    }
}

/// Back-end verdict on a steady-state request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    UnlockGranted,
    WrongCredential,
    ChangeAccepted,
}

impl Outcome {
    pub const fn code(self) -> u8 {
        match self {
            Outcome::UnlockGranted => UNLOCK_GRANTED,
            Outcome::WrongCredential => WRONG_CREDENTIAL,
            Outcome::ChangeAccepted => CHANGE_ACCEPTED,
        }
    }
}

impl TryFrom<u8> for Outcome {
    type Error = ProtocolError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            UNLOCK_GRANTED => Ok(Outcome::UnlockGranted),
            WRONG_CREDENTIAL => Ok(Outcome::WrongCredential),
            CHANGE_ACCEPTED => Ok(Outcome::ChangeAccepted),
            other => Err(ProtocolError::UnknownOutcome(other)),
        }
    }
}

/// Back-end verdict on a credential/confirmation pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupOutcome {
    Match,
    Mismatch,
}

impl SetupOutcome {
    pub const fn code(self) -> u8 {
        match self {
            SetupOutcome::Match => MATCH,
            SetupOutcome::Mismatch => MISMATCH,
        }
    }
}

impl TryFrom<u8> for SetupOutcome {
    type Error = ProtocolError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            MATCH => Ok(SetupOutcome::Match),
            MISMATCH => Ok(SetupOutcome::Mismatch),
            other => Err(ProtocolError::UnknownSetupOutcome(other)),
        }
    }
}

/// Blocking byte transport between the nodes.
pub trait SerialChannel {
    fn send(&mut self, byte: u8) -> Result<(), LinkError>;

    /// Block until one byte arrives.
    fn receive(&mut self) -> Result<u8, LinkError>;
}

/// Adapter for any blocking `embedded-io` reader/writer.
pub struct IoChannel<T>(pub T);

impl<T: embedded_io::Read + embedded_io::Write> SerialChannel for IoChannel<T> {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        self.0.write_all(&[byte]).map_err(|_| LinkError::Write)?;
        self.0.flush().map_err(|_| LinkError::Write)
    }

    fn receive(&mut self) -> Result<u8, LinkError> {
        let mut buf = [0u8; 1];
        loop {
            match self.0.read(&mut buf) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(_) => return Ok(buf[0]),
                Err(e) => {
                    if embedded_io::Error::kind(&e) == embedded_io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(LinkError::Read);
                }
            }
        }
    }
}

/// Where the local node is within one credential exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// Between exchanges.
    Idle,
    /// Responder waiting for the initiator's send-ready.
    AwaitingReadyToSend,
    /// Initiator waiting for the responder's receive-ready.
    AwaitingReadyToReceive,
    Transferring,
    AwaitingIntent,
    AwaitingOutcome,
}

/// Handshake helpers over a serial channel, shared by both nodes.
pub struct Link<C> {
    channel: C,
    state: HandshakeState,
}

impl<C: SerialChannel> Link<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    fn enter(&mut self, state: HandshakeState) {
        if self.state != state {
            log::debug!("link: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// End the current exchange.
    pub fn finish(&mut self) {
        self.enter(HandshakeState::Idle);
    }

    pub fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        self.channel.send(byte)
    }

    pub fn receive(&mut self) -> Result<u8, LinkError> {
        self.channel.receive()
    }

    /// Discard bytes until `code` arrives.
    pub fn wait_for(&mut self, code: u8) -> Result<(), LinkError> {
        loop {
            let byte = self.channel.receive()?;
            if byte == code {
                return Ok(());
            }
            log::debug!("link: discarding 0x{:02X} while waiting for 0x{:02X}", byte, code);
        }
    }

    /// Initiator side: announce, wait for the peer, then send the digits.
    pub fn offer_credential(&mut self, credential: &Credential) -> Result<(), LinkError> {
        self.channel.send(SEND_READY)?;
        self.enter(HandshakeState::AwaitingReadyToReceive);
        self.wait_for(RECEIVE_READY)?;
        self.enter(HandshakeState::Transferring);
        for &digit in credential.digits() {
            self.channel.send(digit)?;
        }
        Ok(())
    }

    /// Responder side: wait for an announcement, acknowledge it, then read
    /// exactly `PASS_LEN` bytes.
    pub fn accept_credential(&mut self) -> Result<Credential, LinkError> {
        self.enter(HandshakeState::AwaitingReadyToSend);
        self.wait_for(SEND_READY)?;
        self.channel.send(RECEIVE_READY)?;
        self.enter(HandshakeState::Transferring);
        let mut digits = [0u8; PASS_LEN];
        for digit in digits.iter_mut() {
            *digit = self.channel.receive()?;
        }
        Ok(Credential::new(digits))
    }

    pub fn send_intent(&mut self, intent: Intent) -> Result<(), LinkError> {
        self.channel.send(intent.code())?;
        self.enter(HandshakeState::AwaitingOutcome);
        Ok(())
    }

    pub fn receive_intent(&mut self) -> Result<Intent, ProtocolError> {
        self.enter(HandshakeState::AwaitingIntent);
        let byte = self.channel.receive()?;
        Intent::try_from(byte)
    }

    pub fn send_outcome(&mut self, outcome: Outcome) -> Result<(), LinkError> {
        self.channel.send(outcome.code())
    }

    pub fn receive_outcome(&mut self) -> Result<Outcome, ProtocolError> {
        self.enter(HandshakeState::AwaitingOutcome);
        let byte = self.channel.receive()?;
        Outcome::try_from(byte)
    }

    pub fn send_setup_outcome(&mut self, outcome: SetupOutcome) -> Result<(), LinkError> {
        self.channel.send(SEND_READY)?;
        self.channel.send(outcome.code())
    }

    /// Skip to the back-end's send-ready preamble and read the verdict.
    pub fn receive_setup_outcome(&mut self) -> Result<SetupOutcome, ProtocolError> {
        self.enter(HandshakeState::AwaitingOutcome);
        self.wait_for(SEND_READY)?;
        let byte = self.channel.receive()?;
        SetupOutcome::try_from(byte)
    }
}
