//! The hardware the daemon owns: LED, buttons, blink control attributes,
//! CPU temperature and the status display.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    blink_control::{BlinkControl, Mode, Period},
    config::Config,
    controller::{ButtonId, Outputs},
    display::{
        Display, NullDisplay, Status, StatusPanel,
        i2c::I2cDevice,
        ssd1306::Ssd1306,
    },
    gpio::{Button, GpioChip, Led},
    thermal::{TemperatureSensor, ThermalZone},
};

pub struct Board {
    led: Led,
    buttons: [Button; 3],
    control: BlinkControl,
    sensor: Box<dyn TemperatureSensor>,
    display: Box<dyn Display>,
    panel: StatusPanel,
}

impl Board {
    pub fn new(
        led: Led,
        buttons: [Button; 3],
        control: BlinkControl,
        sensor: Box<dyn TemperatureSensor>,
        display: Box<dyn Display>,
        panel: StatusPanel,
    ) -> Self {
        Self {
            led,
            buttons,
            control,
            sensor,
            display,
            panel,
        }
    }

    /// Claims the pins, opens every attribute and brings the display up.
    ///
    /// Any failure here is fatal for the daemon.
    pub fn open(config: &Config) -> Result<Self> {
        let chip = GpioChip::new(&config.gpio.sysfs_root);

        let led = chip.setup_led(config.gpio.led)?;
        let [b0, b1, b2] = config.gpio.buttons;
        let buttons = [
            chip.setup_button(b0)?,
            chip.setup_button(b1)?,
            chip.setup_button(b2)?,
        ];

        let control = BlinkControl::open(&config.control.mode, &config.control.frequency)
            .context("failed to open blink control attributes")?;
        match control.read_frequency() {
            Ok(hz) => info!("Initial frequency: {hz}"),
            Err(e) => warn!("Initial frequency unreadable: {e:#}"),
        }

        let sensor = ThermalZone::open(&config.thermal.zone)
            .context("failed to open CPU temperature")?;

        let display: Box<dyn Display> = if config.display.enabled {
            let bus = I2cDevice::open(&config.display.i2c_bus, config.display.address)?;
            let mut oled = Ssd1306::new(bus);
            oled.init().context("failed to initialize display")?;
            Box::new(oled)
        } else {
            info!("Display disabled");
            Box::new(NullDisplay)
        };

        let panel = StatusPanel::new(&config.display.title, &config.display.subtitle);

        Ok(Self::new(
            led,
            buttons,
            control,
            Box::new(sensor),
            display,
            panel,
        ))
    }

    pub fn button(&self, id: ButtonId) -> &Button {
        &self.buttons[id.index()]
    }

    /// Mode currently held by the kernel module; seeds the controller.
    pub fn initial_mode(&self) -> Result<Mode> {
        self.control.read_mode()
    }

    /// Blanks the display on the way out.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.display.clear() {
            warn!("Failed to clear display: {e:#}");
        }
    }
}

impl Outputs for Board {
    fn sample(&mut self, line: ButtonId) -> Result<u8> {
        self.button(line).sample()
    }

    fn set_led(&mut self, on: bool) -> Result<()> {
        self.led.set(on)
    }

    fn push_frequency(&mut self, period: Period) -> Result<()> {
        self.control.push_frequency(period)
    }

    fn write_mode(&mut self, mode: Mode) -> Result<()> {
        self.control.write_mode(mode)
    }

    fn refresh(&mut self, period: Period, mode: Mode) -> Result<()> {
        let temperature = match self.sensor.read_celsius() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("CPU temperature unreadable: {e:#}");
                None
            }
        };
        let status = Status {
            temperature,
            frequency_hz: period.frequency_hz(),
            mode,
        };
        self.panel.render(self.display.as_mut(), &status)
    }
}
