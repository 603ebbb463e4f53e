//! LED blink period, blink mode and the kernel-side control attributes.
//!
//! The blinking itself is done by a kernel module exposing two attributes:
//! `mode_automatic` (`1`/`0`) and `frequency` (Hz). The daemon keeps the
//! period locally and mirrors every change into those files.

use std::{fmt, path::Path};

use anyhow::{Context, Result, bail};
use log::info;

use crate::sysfs::{Access, PseudoFile};

pub const NANOS_PER_MILLI: u64 = 1_000_000;
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// LED half-cycle in nanoseconds. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(u64);

impl Period {
    pub fn from_nanos(ns: u64) -> Result<Self> {
        if ns == 0 {
            bail!("blink period must be positive");
        }
        Ok(Self(ns))
    }

    pub fn from_millis(ms: u64) -> Result<Self> {
        ms.checked_mul(NANOS_PER_MILLI)
            .with_context(|| format!("blink period of {ms} ms overflows"))
            .and_then(Self::from_nanos)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Blink frequency in whole Hz (`1e9 / period`, truncated).
    pub fn frequency_hz(self) -> u64 {
        NANOS_PER_SEC / self.0
    }

    /// Whether the real-valued frequency is strictly above 1 Hz.
    pub fn faster_than_one_hz(self) -> bool {
        self.0 < NANOS_PER_SEC
    }

    /// Half the period. Never drops below one nanosecond.
    pub fn halved(self) -> Self {
        Self((self.0 / 2).max(1))
    }

    pub fn doubled(self) -> Self {
        Self(self.0.saturating_mul(2))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ns", self.0)
    }
}

/// Blink mode as understood by the kernel module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Automatic,
    Manual,
}

impl Mode {
    /// Interprets the contents of the mode attribute. Only `1` means
    /// automatic.
    pub fn from_sysfs(raw: &str) -> Self {
        if raw.trim() == "1" {
            Mode::Automatic
        } else {
            Mode::Manual
        }
    }

    pub fn as_sysfs(self) -> &'static str {
        match self {
            Mode::Automatic => "1",
            Mode::Manual => "0",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Automatic => "automatic",
            Mode::Manual => "manual",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Automatic => Mode::Manual,
            Mode::Manual => Mode::Automatic,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Open handles on the kernel module's `mode_automatic` and `frequency`
/// attributes.
#[derive(Debug)]
pub struct BlinkControl {
    mode: PseudoFile,
    frequency: PseudoFile,
}

impl BlinkControl {
    pub fn open(mode_path: impl AsRef<Path>, frequency_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            mode: PseudoFile::open(mode_path, Access::ReadWrite)?,
            frequency: PseudoFile::open(frequency_path, Access::ReadWrite)?,
        })
    }

    /// Reads the mode currently held by the kernel module.
    pub fn read_mode(&self) -> Result<Mode> {
        let raw = self.mode.read_value()?;
        info!("Initial mode: {raw}");
        Ok(Mode::from_sysfs(&raw))
    }

    /// Reads the raw frequency attribute, for logging.
    pub fn read_frequency(&self) -> Result<String> {
        self.frequency.read_value()
    }

    pub fn write_mode(&self, mode: Mode) -> Result<()> {
        self.mode.write_value(mode.as_sysfs())
    }

    /// Pushes `period` as an integer frequency in Hz.
    pub fn push_frequency(&self, period: Period) -> Result<()> {
        self.frequency
            .write_value(&period.frequency_hz().to_string())
            .context("update_led_frequency failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn control_files(mode: &str, freq: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mode_automatic"), mode).unwrap();
        fs::write(dir.path().join("frequency"), freq).unwrap();
        dir
    }

    fn open_control(dir: &TempDir) -> BlinkControl {
        BlinkControl::open(
            dir.path().join("mode_automatic"),
            dir.path().join("frequency"),
        )
        .unwrap()
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(Period::from_nanos(0).is_err());
        assert!(Period::from_millis(0).is_err());
    }

    #[test]
    fn default_period_is_two_hz() {
        let period = Period::from_millis(500).unwrap();
        assert_eq!(period.as_nanos(), 500_000_000);
        assert_eq!(period.frequency_hz(), 2);
        assert_eq!(period.to_string(), "500000000 ns");
    }

    #[test]
    fn overflowing_millis_is_rejected() {
        assert!(Period::from_millis(u64::MAX).is_err());
    }

    #[test]
    fn halving_stops_at_one_nanosecond() {
        let period = Period::from_nanos(1).unwrap();
        assert_eq!(period.halved().as_nanos(), 1);
        assert_eq!(Period::from_nanos(3).unwrap().halved().as_nanos(), 1);
    }

    #[test]
    fn one_hz_boundary() {
        assert!(Period::from_nanos(999_999_999).unwrap().faster_than_one_hz());
        assert!(!Period::from_nanos(NANOS_PER_SEC).unwrap().faster_than_one_hz());
        // 600 ms is 1.67 Hz, above one even though the integer frequency is 1.
        let period = Period::from_millis(600).unwrap();
        assert_eq!(period.frequency_hz(), 1);
        assert!(period.faster_than_one_hz());
    }

    #[test]
    fn mode_parsing_and_rendering() {
        assert_eq!(Mode::from_sysfs("1\n"), Mode::Automatic);
        assert_eq!(Mode::from_sysfs("0"), Mode::Manual);
        assert_eq!(Mode::from_sysfs(""), Mode::Manual);
        assert_eq!(Mode::from_sysfs("auto"), Mode::Manual);
        assert_eq!(Mode::Automatic.as_sysfs(), "1");
        assert_eq!(Mode::Manual.as_sysfs(), "0");
        assert_eq!(Mode::Automatic.to_string(), "automatic");
        assert_eq!(Mode::Manual.to_string(), "manual");
    }

    #[test]
    fn mode_toggle_is_an_involution() {
        assert_eq!(Mode::Automatic.toggled(), Mode::Manual);
        assert_eq!(Mode::Automatic.toggled().toggled(), Mode::Automatic);
    }

    #[test]
    fn read_mode_from_attribute() {
        let dir = control_files("1\n", "2\n");
        let control = open_control(&dir);

        assert_eq!(control.read_mode().unwrap(), Mode::Automatic);
        assert_eq!(control.read_frequency().unwrap(), "2");
    }

    #[test]
    fn push_frequency_writes_hz() {
        let dir = control_files("1", "0");
        let control = open_control(&dir);

        control
            .push_frequency(Period::from_millis(250).unwrap())
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("frequency")).unwrap(),
            "4"
        );
    }

    #[test]
    fn write_mode_writes_flag() {
        let dir = control_files("1", "0");
        let control = open_control(&dir);

        control.write_mode(Mode::Manual).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("mode_automatic")).unwrap(),
            "0"
        );
        assert_eq!(control.read_mode().unwrap(), Mode::Manual);
    }

    #[test]
    fn open_requires_both_attributes() {
        let dir = control_files("1", "0");
        fs::remove_file(dir.path().join("frequency")).unwrap();

        let result = BlinkControl::open(
            dir.path().join("mode_automatic"),
            dir.path().join("frequency"),
        );
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn halved_period_stays_positive(ns in 1u64..=u64::MAX) {
            let halved = Period::from_nanos(ns).unwrap().halved();
            prop_assert!(halved.as_nanos() >= 1);
            prop_assert!(halved.as_nanos() <= ns);
        }

        #[test]
        fn halving_doubles_frequency(ms in 2u64..=10_000u64) {
            let period = Period::from_millis(ms).unwrap();
            let halved = period.halved();
            prop_assert_eq!(halved.as_nanos(), period.as_nanos() / 2);
            prop_assert_eq!(halved.frequency_hz(), NANOS_PER_SEC / (period.as_nanos() / 2));
        }

        #[test]
        fn doubling_undoes_halving_for_even_periods(half in 1u64..=1_000_000_000u64) {
            let period = Period::from_nanos(half * 2).unwrap();
            prop_assert_eq!(period.halved().doubled(), period);
        }
    }
}
