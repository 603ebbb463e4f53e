//! Button handling: debounce latches, blink period and mode.
//!
//! Buttons are configured for `both` edges, so every physical press wakes the
//! daemon twice. A one-bit latch per button tells the press edge from the
//! release edge; the work happens on the press, the LED toggles on both.

use std::fmt;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::blink_control::{Mode, Period};

/// One of the three front-panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ButtonId {
    /// Raises the blink frequency.
    Zero,
    /// Lowers the blink frequency.
    One,
    /// Switches between automatic and manual mode.
    Two,
}

impl ButtonId {
    pub const ALL: [ButtonId; 3] = [ButtonId::Zero, ButtonId::One, ButtonId::Two];

    pub fn index(self) -> usize {
        match self {
            ButtonId::Zero => 0,
            ButtonId::One => 1,
            ButtonId::Two => 2,
        }
    }

    /// Line read to consume a wake-up of this button.
    ///
    /// Button 1 reads button 2's value attribute. Its own readiness is still
    /// cleared by the reactor and the latch ignores the level, so the blink
    /// state is unaffected.
    pub fn sampled_line(self) -> ButtonId {
        match self {
            ButtonId::One => ButtonId::Two,
            other => other,
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button{}", self.index())
    }
}

/// Which edge a wake-up was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Press,
    Release,
}

/// Everything the controller drives.
#[cfg_attr(test, mockall::automock)]
pub trait Outputs {
    /// Rewinds and reads the level of `line`.
    fn sample(&mut self, line: ButtonId) -> Result<u8>;
    fn set_led(&mut self, on: bool) -> Result<()>;
    fn push_frequency(&mut self, period: Period) -> Result<()>;
    fn write_mode(&mut self, mode: Mode) -> Result<()>;
    /// Redraws the status display.
    fn refresh(&mut self, period: Period, mode: Mode) -> Result<()>;
}

/// Mutable daemon state, owned by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    period: Period,
    mode: Mode,
    latches: [bool; 3],
    led_on: bool,
}

impl Controller {
    pub fn new(period: Period, mode: Mode) -> Self {
        Self {
            period,
            mode,
            latches: [false; 3],
            led_on: false,
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.latches[id.index()]
    }

    /// Draws the initial status and pushes the start-up frequency.
    pub fn start(&mut self, io: &mut dyn Outputs) -> Result<()> {
        self.refresh(io);
        io.push_frequency(self.period)
            .context("failed to push initial frequency")
    }

    /// Handles one readiness notification from `id`.
    ///
    /// Only a failed frequency push is an error; every other output failure
    /// is logged and the loop carries on.
    pub fn on_button(&mut self, id: ButtonId, io: &mut dyn Outputs) -> Result<Transition> {
        let line = id.sampled_line();
        match io.sample(line) {
            Ok(level) => debug!("{id} event, {line} reads {level}"),
            Err(e) => warn!("{id} event, reading {line} failed: {e:#}"),
        }

        let latch = &mut self.latches[id.index()];
        *latch = !*latch;
        let transition = if *latch {
            Transition::Press
        } else {
            Transition::Release
        };

        if transition == Transition::Press {
            match id {
                ButtonId::Zero => self.increase_frequency(io)?,
                ButtonId::One => self.decrease_frequency(io)?,
                ButtonId::Two => self.switch_mode(io),
            }
        }

        self.toggle_led(io);
        Ok(transition)
    }

    fn increase_frequency(&mut self, io: &mut dyn Outputs) -> Result<()> {
        self.period = self.period.halved();
        io.push_frequency(self.period)?;
        self.refresh(io);
        info!("Frequency increased to {} Hz", self.period.frequency_hz());
        Ok(())
    }

    fn decrease_frequency(&mut self, io: &mut dyn Outputs) -> Result<()> {
        if !self.period.faster_than_one_hz() {
            debug!("Frequency already at 1 Hz, not decreasing");
            return Ok(());
        }

        self.period = self.period.doubled();
        io.push_frequency(self.period)?;
        self.refresh(io);
        info!("Frequency decreased to {} Hz", self.period.frequency_hz());
        Ok(())
    }

    fn switch_mode(&mut self, io: &mut dyn Outputs) {
        let mode = self.mode.toggled();
        if let Err(e) = io.write_mode(mode) {
            warn!("Failed to write mode {mode}: {e:#}");
        }
        self.mode = mode;
        self.refresh(io);
        info!("Mode switched to {mode}");
    }

    fn toggle_led(&mut self, io: &mut dyn Outputs) {
        self.led_on = !self.led_on;
        if let Err(e) = io.set_led(self.led_on) {
            warn!("Failed to set LED: {e:#}");
        }
    }

    fn refresh(&self, io: &mut dyn Outputs) {
        if let Err(e) = io.refresh(self.period, self.mode) {
            warn!("Display refresh failed: {e:#}");
        }
    }
}
