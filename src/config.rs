//! Configuration for the blinkd daemon.
//!
//! Every field has a default matching the reference board (NanoPi NEO Plus2
//! with the CSEL extension board), so the daemon runs without any file. A YAML
//! file can override pins, attribute paths and display settings.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "BLINKD_CONFIG";

const ETC_CONFIG: &str = "/etc/blinkd/config.yml";

/// Main configuration structure.
///
/// # Example
///
/// ```yaml
/// version: 1
/// period_ms: 500
/// gpio:
///   sysfs_root: /sys/class/gpio
///   led: 362
///   buttons: [0, 2, 3]
/// display:
///   enabled: true
///   i2c_bus: /dev/i2c-0
///   address: 0x3c
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Initial blink half-period in milliseconds.
    #[serde(default = "defaults::period_ms")]
    pub period_ms: u64,

    #[serde(default)]
    pub gpio: GpioCfg,

    #[serde(default)]
    pub control: ControlCfg,

    #[serde(default)]
    pub thermal: ThermalCfg,

    #[serde(default)]
    pub display: DisplayCfg,

    #[serde(default)]
    pub daemon: DaemonCfg,
}

/// GPIO pin assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioCfg {
    /// sysfs GPIO class directory.
    pub sysfs_root: PathBuf,

    /// LED pin number.
    pub led: u32,

    /// Pins of buttons 0, 1 and 2.
    pub buttons: [u32; 3],
}

/// Attributes of the kernel blink module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// `1` for automatic mode, `0` for manual.
    pub mode: PathBuf,

    /// Blink frequency in Hz.
    pub frequency: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalCfg {
    /// Thermal zone `temp` attribute (millidegrees Celsius).
    pub zone: PathBuf,
}

/// SSD1306 status display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayCfg {
    pub enabled: bool,

    /// i2c-dev adapter node.
    pub i2c_bus: PathBuf,

    /// 7-bit slave address.
    pub address: u8,

    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonCfg {
    /// Process name reported to syslog.
    pub syslog_name: String,

    /// Optional PID file written after daemonizing.
    pub pid_file: Option<PathBuf>,
}

mod defaults {
    /// Default blink half-period in milliseconds.
    pub fn period_ms() -> u64 {
        500
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            period_ms: defaults::period_ms(),
            gpio: GpioCfg::default(),
            control: ControlCfg::default(),
            thermal: ThermalCfg::default(),
            display: DisplayCfg::default(),
            daemon: DaemonCfg::default(),
        }
    }
}

impl Default for GpioCfg {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/gpio"),
            led: 362,
            buttons: [0, 2, 3],
        }
    }
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            mode: PathBuf::from("/sys/kernel/led_blink_control/mode_automatic"),
            frequency: PathBuf::from("/sys/kernel/led_blink_control/frequency"),
        }
    }
}

impl Default for ThermalCfg {
    fn default() -> Self {
        Self {
            zone: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        }
    }
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_bus: PathBuf::from("/dev/i2c-0"),
            address: 0x3C,
            title: "CSEL1a - SP.07".to_string(),
            subtitle: "  Demo - SW".to_string(),
        }
    }
}

impl Default for DaemonCfg {
    fn default() -> Self {
        Self {
            syslog_name: "blinkd".to_string(),
            pid_file: None,
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// Looks in the following order:
    /// 1. Provided path parameter (must exist)
    /// 2. `BLINKD_CONFIG` environment variable (must exist)
    /// 3. `/etc/blinkd/config.yml`
    ///
    /// Falls back to [`Config::default`] when nothing is found.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match Self::locate(path) {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// The file [`Config::load`] would read, if any.
    pub fn locate(path: Option<PathBuf>) -> Option<PathBuf> {
        path.or_else(locate_config)
    }

    /// Reads and validates a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }

    /// Checks the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            bail!("Unsupported config version {}", self.version);
        }

        if self.period_ms == 0 {
            bail!("period_ms must be positive");
        }

        let [b0, b1, b2] = self.gpio.buttons;
        if b0 == b1 || b0 == b2 || b1 == b2 {
            bail!("Button pins must be distinct, got {:?}", self.gpio.buttons);
        }

        if self.gpio.buttons.contains(&self.gpio.led) {
            bail!("LED pin {} is also used as a button", self.gpio.led);
        }

        if self.display.address > 0x7F {
            bail!(
                "Display address {:#04x} is not a 7-bit I2C address",
                self.display.address
            );
        }

        Ok(())
    }
}

fn locate_config() -> Option<PathBuf> {
    if let Some(env_path) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let etc = Path::new(ETC_CONFIG);
    etc.exists().then(|| etc.to_path_buf())
}
