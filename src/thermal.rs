use std::path::Path;

use anyhow::{Context, Result};

use crate::sysfs::{Access, PseudoFile};

#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSensor {
    /// Current temperature in whole degrees Celsius.
    fn read_celsius(&self) -> Result<i32>;
    fn sensor_name(&self) -> Option<String> {
        None
    }
}

/// A `/sys/class/thermal/thermal_zone*/temp` attribute (millidegrees).
pub struct ThermalZone(PseudoFile);

impl ThermalZone {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        PseudoFile::open(path, Access::ReadOnly).map(Self)
    }
}

impl TemperatureSensor for ThermalZone {
    fn read_celsius(&self) -> Result<i32> {
        let raw = self.0.read_value()?;
        raw.parse::<i32>()
            .map(|milli| milli / 1000)
            .with_context(|| format!("bad temperature '{raw}' in {}", self.0.path().display()))
    }

    fn sensor_name(&self) -> Option<String> {
        Some(self.0.path().display().to_string())
    }
}
