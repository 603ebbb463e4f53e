//! Legacy sysfs GPIO interface (`/sys/class/gpio`).
//!
//! Pins are claimed by writing their number to `export`, after which the
//! kernel creates a `gpio<N>/` directory holding `direction`, `edge` and
//! `value` attributes.

use std::{
    fmt,
    fs::File,
    path::PathBuf,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::sysfs::{Access, PseudoFile, write_attribute};

/// Pin direction as written to `gpio<N>/direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_sysfs(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// `gpio<N>/edge` setting that raises `POLLPRI` on every level change.
const BOTH_EDGES: &str = "both";

/// The sysfs GPIO class directory.
#[derive(Debug, Clone)]
pub struct GpioChip {
    root: PathBuf,
}

impl GpioChip {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of an exported pin.
    pub fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    /// Releases `pin`. A pin that was never exported makes the kernel answer
    /// `EINVAL`, so failures here are only logged.
    pub fn unexport(&self, pin: u32) {
        if let Err(e) = write_attribute(self.root.join("unexport"), &pin.to_string()) {
            debug!("unexport of gpio{pin} ignored: {e:#}");
        }
    }

    pub fn export(&self, pin: u32) -> Result<()> {
        write_attribute(self.root.join("export"), &pin.to_string())
            .with_context(|| format!("failed to export gpio{pin}"))
    }

    /// Unexports then exports `pin`, so a restarted daemon starts from a
    /// freshly claimed pin.
    pub fn reclaim(&self, pin: u32) -> Result<()> {
        self.unexport(pin);
        self.export(pin)
    }

    pub fn set_direction(&self, pin: u32, direction: Direction) -> Result<()> {
        write_attribute(self.pin_dir(pin).join("direction"), direction.as_sysfs())
            .with_context(|| format!("failed to configure gpio{pin} direction"))
    }

    /// Makes `pin` report rising and falling edges.
    pub fn watch_both_edges(&self, pin: u32) -> Result<()> {
        write_attribute(self.pin_dir(pin).join("edge"), BOTH_EDGES)
            .with_context(|| format!("failed to configure gpio{pin} edge"))
    }

    fn open_value(&self, pin: u32, access: Access) -> Result<PseudoFile> {
        PseudoFile::open(self.pin_dir(pin).join("value"), access)
            .with_context(|| format!("failed to open gpio{pin} value"))
    }

    /// Claims `pin` as an output and opens its value attribute.
    pub fn setup_led(&self, pin: u32) -> Result<Led> {
        self.reclaim(pin)?;
        self.set_direction(pin, Direction::Out)?;
        let value = self.open_value(pin, Access::WriteOnly)?;

        info!("LED configured on gpio{pin}");
        Ok(Led { pin, value })
    }

    /// Claims `pin` as an input reporting both edges and opens its value
    /// attribute.
    pub fn setup_button(&self, pin: u32) -> Result<Button> {
        self.reclaim(pin)?;
        self.set_direction(pin, Direction::In)?;
        self.watch_both_edges(pin)?;
        let value = self.open_value(pin, Access::ReadOnly)?;

        info!("Button configured on gpio{pin}");
        Ok(Button { pin, value })
    }
}

/// Output pin driving the status LED.
#[derive(Debug)]
pub struct Led {
    pin: u32,
    value: PseudoFile,
}

impl Led {
    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn set(&self, on: bool) -> Result<()> {
        self.value.write_value(if on { "1" } else { "0" })
    }
}

/// Input pin with edge notification enabled.
#[derive(Debug)]
pub struct Button {
    pin: u32,
    value: PseudoFile,
}

impl Button {
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Rewinds and reads the line level. Anything other than `0`/`1` reads as
    /// low.
    pub fn sample(&self) -> Result<u8> {
        let raw = self.value.read_value()?;
        Ok(match raw.as_str() {
            "1" => 1,
            "0" => 0,
            other => {
                warn!("gpio{}: unexpected value '{other}'", self.pin);
                0
            }
        })
    }

    /// Duplicate of the value descriptor for readiness registration.
    pub fn watch_handle(&self) -> Result<File> {
        self.value.try_clone_file()
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}", self.pin)
    }
}
