//! Character display: the `Display` seam and an HD44780 16x2 driver.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

pub const LCD_COLS: u8 = 16;
pub const LCD_ROWS: u8 = 2;

/// Text output used by the front-end.
pub trait Display {
    fn clear(&mut self);

    /// Write `text` starting at (`row`, `col`). Text past the end of the
    /// row is dropped.
    fn show(&mut self, text: &str, row: u8, col: u8);
}

// HD44780 instruction set (subset)
const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INC: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

/// HD44780-compatible LCD wired in 4-bit mode (RS, E, D4..D7), write-only.
pub struct Hd44780<P, D> {
    rs: P,
    en: P,
    data: [P; 4],
    delay: D,
}

impl<P: OutputPin, D: DelayNs> Hd44780<P, D> {
    /// Takes the pins and runs the 4-bit initialisation sequence.
    pub fn new(rs: P, en: P, data: [P; 4], delay: D) -> Self {
        let mut lcd = Self { rs, en, data, delay };
        lcd.init();
        lcd
    }

    fn init(&mut self) {
        self.delay.delay_ms(50);
        let _ = self.rs.set_low();
        // Reset into 8-bit mode three times, then switch to 4-bit
        for _ in 0..3 {
            self.write_nibble(0x03);
            self.delay.delay_ms(5);
        }
        self.write_nibble(0x02);
        self.command(CMD_FUNCTION_4BIT_2LINE);
        self.command(CMD_DISPLAY_ON);
        self.command(CMD_CLEAR);
        self.delay.delay_ms(2);
        self.command(CMD_ENTRY_MODE_INC);
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            let _ = if nibble & (1 << bit) != 0 {
                pin.set_high()
            } else {
                pin.set_low()
            };
        }
        let _ = self.en.set_high();
        self.delay.delay_us(1);
        let _ = self.en.set_low();
        self.delay.delay_us(50);
    }

    fn write_byte(&mut self, byte: u8, is_data: bool) {
        let _ = if is_data {
            self.rs.set_high()
        } else {
            self.rs.set_low()
        };
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
    }

    fn command(&mut self, cmd: u8) {
        self.write_byte(cmd, false);
    }

    fn move_cursor(&mut self, row: u8, col: u8) {
        let offset = ROW_OFFSETS[(row as usize).min(ROW_OFFSETS.len() - 1)];
        self.command(CMD_SET_DDRAM | (offset + col));
    }
}

impl<P: OutputPin, D: DelayNs> Display for Hd44780<P, D> {
    fn clear(&mut self) {
        self.command(CMD_CLEAR);
        self.delay.delay_ms(2);
    }

    fn show(&mut self, text: &str, row: u8, col: u8) {
        if row >= LCD_ROWS || col >= LCD_COLS {
            return;
        }
        self.move_cursor(row, col);
        for byte in text.bytes().take((LCD_COLS - col) as usize) {
            // Panel ROM is ASCII for printable characters
            let byte = if byte.is_ascii_graphic() || byte == b' ' { byte } else { b'?' };
            self.write_byte(byte, true);
        }
    }
}
