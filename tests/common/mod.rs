//! Host fakes for the door lock peripherals.
//!
//! Every fake that produces an observable effect appends to a shared
//! `Journal`, so tests can assert on the exact interleaving of motor moves,
//! alarm edges, screen updates and one-second ticks.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use door_lock::actuator::{Actuator, Motion};
use door_lock::keypad::{Key, Keypad};
use door_lock::lcd::Display;
use door_lock::link::{LinkError, SerialChannel, SEND_READY};
use door_lock::lockout::Alarm;
use door_lock::storage::CredentialStore;
use door_lock::tick::{ElapsedSeconds, Stopwatch, TickSource};
use door_lock::{Config, Credential, PASS_LEN};
use embedded_hal::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};

// ============================================================================
// Journal
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Tick,
    Motor(Motion),
    AlarmOn,
    AlarmOff,
    Clear,
    Show(String, u8, u8),
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(journal: &Journal) -> Vec<Event> {
    journal.lock().unwrap().clone()
}

/// Journal with runs of consecutive ticks collapsed into their count.
pub fn timeline(journal: &Journal) -> Vec<(Event, u32)> {
    let mut out: Vec<(Event, u32)> = Vec::new();
    for event in events(journal) {
        match out.last_mut() {
            Some((Event::Tick, n)) if event == Event::Tick => *n += 1,
            _ => out.push((event, 1)),
        }
    }
    out
}

pub fn count(journal: &Journal, wanted: &Event) -> usize {
    events(journal).iter().filter(|e| *e == wanted).count()
}

/// Text of every `Show` event, in order.
pub fn shown(journal: &Journal) -> Vec<String> {
    events(journal)
        .into_iter()
        .filter_map(|e| match e {
            Event::Show(text, _, _) => Some(text),
            _ => None,
        })
        .collect()
}

pub fn clear(journal: &Journal) {
    journal.lock().unwrap().clear();
}

// ============================================================================
// Time
// ============================================================================

pub fn leak_counter() -> &'static ElapsedSeconds {
    Box::leak(Box::new(ElapsedSeconds::new()))
}

/// Tick source that advances one second every time the waiter idles.
pub struct StepTicks {
    counter: Option<&'static ElapsedSeconds>,
    journal: Journal,
}

impl StepTicks {
    pub fn new(journal: Journal) -> Self {
        Self {
            counter: None,
            journal,
        }
    }
}

impl TickSource for StepTicks {
    fn start(&mut self, counter: &'static ElapsedSeconds) {
        self.counter = Some(counter);
    }

    fn stop(&mut self) {
        self.counter = None;
    }

    fn idle(&mut self) {
        if let Some(counter) = self.counter {
            counter.tick();
            self.journal.lock().unwrap().push(Event::Tick);
        }
    }
}

pub fn stopwatch(journal: &Journal) -> Stopwatch<StepTicks> {
    Stopwatch::start(leak_counter(), StepTicks::new(journal.clone()))
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub fn test_config() -> Config {
    Config {
        message_ms: 0,
        key_repeat_ms: 0,
        ..Config::DEFAULT
    }
}

// ============================================================================
// Serial
// ============================================================================

/// Replays a fixed receive script and records everything sent. An empty
/// script reads as a closed channel.
#[derive(Default)]
pub struct ScriptedLink {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl ScriptedLink {
    pub fn new(rx: Vec<u8>) -> Self {
        Self {
            rx: rx.into(),
            tx: Vec::new(),
        }
    }
}

impl SerialChannel for ScriptedLink {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        self.tx.push(byte);
        Ok(())
    }

    fn receive(&mut self) -> Result<u8, LinkError> {
        self.rx.pop_front().ok_or(LinkError::Closed)
    }
}

/// Send-ready followed by the digits, as the front-end puts them on the wire.
pub fn offer(digits: [u8; PASS_LEN]) -> Vec<u8> {
    let mut bytes = vec![SEND_READY];
    bytes.extend_from_slice(&digits);
    bytes
}

/// A steady-state request: credential transfer followed by the intent byte.
pub fn request(digits: [u8; PASS_LEN], intent: u8) -> Vec<u8> {
    let mut bytes = offer(digits);
    bytes.push(intent);
    bytes
}

/// One end of an in-memory full-duplex byte pipe.
pub struct PipeEnd {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        PipeEnd { tx: a_tx, rx: a_rx },
        PipeEnd { tx: b_tx, rx: b_rx },
    )
}

impl embedded_io::ErrorType for PipeEnd {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for PipeEnd {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.rx.recv_timeout(Duration::from_secs(5)) {
            Ok(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            // Peer dropped its end
            Err(RecvTimeoutError::Disconnected) => Ok(0),
            Err(RecvTimeoutError::Timeout) => Err(embedded_io::ErrorKind::TimedOut),
        }
    }
}

impl embedded_io::Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.tx
                .send(byte)
                .map_err(|_| embedded_io::ErrorKind::BrokenPipe)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

pub const SLOT_A: u32 = 0;
pub const SLOT_B: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamFlashError {
    OutOfBounds,
    Injected,
}

/// Erased-flash-like RAM medium with fault injection.
pub struct RamFlash {
    pub data: Vec<u8>,
    /// Bytes that may still be written; a write past the budget is torn.
    pub write_budget: Option<usize>,
    pub fail_reads: bool,
    /// Reads starting at this offset fail; other offsets read normally.
    pub unreadable_at: Option<u32>,
    pub writes: usize,
}

impl RamFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; 128],
            write_budget: None,
            fail_reads: false,
            unreadable_at: None,
            writes: 0,
        }
    }

    fn range(&self, offset: u32, len: usize) -> Result<std::ops::Range<usize>, RamFlashError> {
        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(RamFlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ReadStorage for RamFlash {
    type Error = RamFlashError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_reads || self.unreadable_at == Some(offset) {
            return Err(RamFlashError::Injected);
        }
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl Storage for RamFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.writes += 1;
        let allowed = match self.write_budget {
            Some(budget) => budget.min(bytes.len()),
            None => bytes.len(),
        };
        let start = range.start;
        self.data[start..start + allowed].copy_from_slice(&bytes[..allowed]);
        if let Some(budget) = self.write_budget.as_mut() {
            *budget -= allowed;
        }
        if allowed < bytes.len() {
            return Err(RamFlashError::Injected);
        }
        Ok(())
    }
}

pub fn empty_store() -> CredentialStore<RamFlash> {
    CredentialStore::new(RamFlash::new(), SLOT_A, SLOT_B)
}

pub fn store_with(digits: [u8; PASS_LEN]) -> CredentialStore<RamFlash> {
    let mut store = empty_store();
    store
        .save(&Credential::new(digits))
        .expect("seeding the store");
    store
}

// ============================================================================
// Actuators and HMI
// ============================================================================

pub struct RecordingMotor(pub Journal);

impl Actuator for RecordingMotor {
    fn drive(&mut self, motion: Motion) {
        self.0.lock().unwrap().push(Event::Motor(motion));
    }
}

pub struct RecordingAlarm(pub Journal);

impl Alarm for RecordingAlarm {
    fn on(&mut self) {
        self.0.lock().unwrap().push(Event::AlarmOn);
    }

    fn off(&mut self) {
        self.0.lock().unwrap().push(Event::AlarmOff);
    }
}

pub struct ScreenLog(pub Journal);

impl Display for ScreenLog {
    fn clear(&mut self) {
        self.0.lock().unwrap().push(Event::Clear);
    }

    fn show(&mut self, text: &str, row: u8, col: u8) {
        self.0
            .lock()
            .unwrap()
            .push(Event::Show(text.to_string(), row, col));
    }
}

/// Replays key presses; running out means the test script is wrong.
pub struct ScriptedKeypad {
    pub keys: VecDeque<Key>,
}

impl ScriptedKeypad {
    pub fn new(keys: Vec<Key>) -> Self {
        Self { keys: keys.into() }
    }
}

impl Keypad for ScriptedKeypad {
    fn read_key(&mut self) -> Key {
        self.keys.pop_front().expect("keypad script exhausted")
    }
}

/// The key presses for typing `digits` and confirming with enter.
pub fn typed(digits: [u8; PASS_LEN]) -> Vec<Key> {
    let mut keys: Vec<Key> = digits.iter().map(|&d| Key::Digit(d)).collect();
    keys.push(Key::Enter);
    keys
}
