//! Keypad input: key codes and a 4x4 matrix scanner.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Code the keypad reports for the enter/confirm key.
pub const ENTER_CODE: u8 = 13;

/// One key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Digit value 0..=9.
    Digit(u8),
    Enter,
    Plus,
    Minus,
    Other(u8),
}

impl Key {
    pub fn from_code(code: u8) -> Self {
        match code {
            0..=9 => Key::Digit(code),
            ENTER_CODE => Key::Enter,
            b'+' => Key::Plus,
            b'-' => Key::Minus,
            other => Key::Other(other),
        }
    }
}

/// Blocking key source.
pub trait Keypad {
    /// Block until a key is pressed.
    fn read_key(&mut self) -> Key;
}

/// Key codes of the 4x4 membrane keypad, row-major.
pub const KEYMAP: [[u8; 4]; 4] = [
    [7, 8, 9, b'/'],
    [4, 5, 6, b'*'],
    [1, 2, 3, b'-'],
    [ENTER_CODE, 0, b'=', b'+'],
];

// Settle time after driving a row before sampling the columns
const ROW_SETTLE_US: u32 = 10;
const IDLE_POLL_MS: u32 = 5;

/// Matrix keypad: rows are driven low one at a time, columns are read with
/// pull-ups. A low column means the key at (row, column) is down.
pub struct MatrixKeypad<R, C, D> {
    rows: [R; 4],
    cols: [C; 4],
    delay: D,
}

impl<R: OutputPin, C: InputPin, D: DelayNs> MatrixKeypad<R, C, D> {
    pub fn new(mut rows: [R; 4], cols: [C; 4], delay: D) -> Self {
        for row in rows.iter_mut() {
            let _ = row.set_high();
        }
        Self { rows, cols, delay }
    }

    /// Scan once; returns the first pressed key in row-major order.
    pub fn scan(&mut self) -> Option<u8> {
        for r in 0..self.rows.len() {
            if self.rows[r].set_low().is_err() {
                log::warn!("keypad: row {} drive failed", r);
                continue;
            }
            self.delay.delay_us(ROW_SETTLE_US);

            let mut hit = None;
            for (c, col) in self.cols.iter_mut().enumerate() {
                if col.is_low().unwrap_or(false) {
                    hit = Some(KEYMAP[r][c]);
                    break;
                }
            }

            let _ = self.rows[r].set_high();
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}

impl<R: OutputPin, C: InputPin, D: DelayNs> Keypad for MatrixKeypad<R, C, D> {
    fn read_key(&mut self) -> Key {
        loop {
            if let Some(code) = self.scan() {
                return Key::from_code(code);
            }
            self.delay.delay_ms(IDLE_POLL_MS);
        }
    }
}
