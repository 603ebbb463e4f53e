//! Status display.
//!
//! The daemon only needs a character-cell display: clear it, move the cursor
//! to a (column, row) cell and print ASCII. [`StatusPanel`] owns the layout
//! of the status screen; the hardware behind it is any [`Display`].

pub mod font;
pub mod i2c;
pub mod ssd1306;

use anyhow::Result;

use crate::blink_control::Mode;

pub const SEPARATOR: &str = "--------------";

/// Character-cell display.
#[cfg_attr(test, mockall::automock)]
pub trait Display {
    fn clear(&mut self) -> Result<()>;
    fn set_position(&mut self, column: u8, row: u8) -> Result<()>;
    fn puts(&mut self, text: &str) -> Result<()>;
}

/// Used when no display is attached.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_position(&mut self, _column: u8, _row: u8) -> Result<()> {
        Ok(())
    }

    fn puts(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Values shown on the status screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// CPU temperature in degrees, `None` when the sensor could not be read.
    pub temperature: Option<i32>,
    pub frequency_hz: u64,
    pub mode: Mode,
}

/// Layout of the status screen.
#[derive(Debug, Clone)]
pub struct StatusPanel {
    title: String,
    subtitle: String,
}

impl StatusPanel {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    pub fn lines(&self, status: &Status) -> [String; 6] {
        let temperature = status
            .temperature
            .map_or_else(|| "--".to_string(), |t| t.to_string());

        [
            self.title.clone(),
            self.subtitle.clone(),
            SEPARATOR.to_string(),
            format!("Temp: {temperature} C"),
            format!("Freq: {}Hz", status.frequency_hz),
            format!("Mode: {}", status.mode.label()),
        ]
    }

    /// Clears `display` and redraws every line.
    pub fn render(&self, display: &mut dyn Display, status: &Status) -> Result<()> {
        display.clear()?;
        for (row, line) in (0u8..).zip(self.lines(status).iter()) {
            display.set_position(0, row)?;
            display.puts(line)?;
        }
        Ok(())
    }
}
