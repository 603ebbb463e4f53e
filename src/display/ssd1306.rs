//! SSD1306 128x64 monochrome OLED controller, driven over I2C.
//!
//! Every I2C transfer starts with a control byte: `0x00` for a command
//! stream, `0x40` for GDDRAM data. The panel is used in page addressing mode,
//! so a text row maps onto one 8-pixel page.

use anyhow::{Result, bail};
use log::info;

use super::{
    Display,
    font::{GLYPH_WIDTH, glyph},
};

pub const WIDTH: usize = 128;
pub const PAGES: u8 = 8;
/// Glyph plus one blank spacing column.
pub const CELL_WIDTH: usize = GLYPH_WIDTH + 1;
pub const COLUMNS: u8 = (WIDTH / CELL_WIDTH) as u8;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

#[rustfmt::skip]
const INIT_SEQUENCE: &[u8] = &[
    0xAE,       // display off
    0xD5, 0x80, // clock divide ratio / oscillator
    0xA8, 0x3F, // multiplex ratio: 64
    0xD3, 0x00, // display offset
    0x40,       // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x02, // page addressing mode
    0xA1,       // segment remap
    0xC8,       // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge period
    0xDB, 0x40, // VCOMH deselect level
    0xA4,       // resume from RAM
    0xA6,       // normal, not inverted
    0xAF,       // display on
];

/// Byte-oriented I2C write channel bound to one slave address.
#[cfg_attr(test, mockall::automock)]
pub trait I2cBus {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

pub struct Ssd1306<B: I2cBus> {
    bus: B,
    column: u8,
}

impl<B: I2cBus> Ssd1306<B> {
    pub fn new(bus: B) -> Self {
        Self { bus, column: 0 }
    }

    /// Sends the power-up sequence and blanks the panel.
    pub fn init(&mut self) -> Result<()> {
        self.command(INIT_SEQUENCE)?;
        self.clear()?;
        info!("SSD1306 initialized");
        Ok(())
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    fn command(&mut self, cmds: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(cmds.len() + 1);
        frame.push(CONTROL_COMMAND);
        frame.extend_from_slice(cmds);
        self.bus.write(&frame)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(CONTROL_DATA);
        frame.extend_from_slice(bytes);
        self.bus.write(&frame)
    }

    fn address(&mut self, x: usize, page: u8) -> Result<()> {
        // x < WIDTH, so both nibbles fit.
        let x = x as u8;
        self.command(&[0xB0 | page, x & 0x0F, 0x10 | (x >> 4)])
    }
}

impl<B: I2cBus> Display for Ssd1306<B> {
    fn clear(&mut self) -> Result<()> {
        let blank = [0u8; WIDTH];
        for page in 0..PAGES {
            self.address(0, page)?;
            self.data(&blank)?;
        }
        self.set_position(0, 0)
    }

    fn set_position(&mut self, column: u8, row: u8) -> Result<()> {
        if column >= COLUMNS || row >= PAGES {
            bail!("position ({column}, {row}) is off screen");
        }
        self.column = column;
        self.address(usize::from(column) * CELL_WIDTH, row)
    }

    /// Prints `text` from the cursor. Text running past the right edge is cut.
    fn puts(&mut self, text: &str) -> Result<()> {
        let room = usize::from(COLUMNS - self.column);
        let mut pixels = Vec::with_capacity(room * CELL_WIDTH);
        for c in text.chars().take(room) {
            pixels.extend_from_slice(glyph(c));
            pixels.push(0);
        }
        if pixels.is_empty() {
            return Ok(());
        }

        self.column += (pixels.len() / CELL_WIDTH) as u8;
        self.data(&pixels)
    }
}
