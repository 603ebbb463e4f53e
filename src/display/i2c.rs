//! Linux userspace I2C (`/dev/i2c-N`, i2c-dev).

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    os::fd::AsRawFd,
    path::Path,
};

use anyhow::{Context, Result, bail};

use super::ssd1306::I2cBus;

/// `I2C_SLAVE` request from `<linux/i2c-dev.h>`.
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// An i2c-dev adapter bound to one 7-bit slave address.
#[derive(Debug)]
pub struct I2cDevice {
    file: File,
    address: u8,
}

impl I2cDevice {
    pub fn open(bus: impl AsRef<Path>, address: u8) -> Result<Self> {
        let bus = bus.as_ref();
        if address > 0x7F {
            bail!("I2C address {address:#04x} is not a 7-bit address");
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(bus)
            .with_context(|| format!("open failed: {}", bus.display()))?;

        // SAFETY: `file` is an open descriptor for the duration of the call and
        // I2C_SLAVE takes its argument by value.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE as _, libc::c_ulong::from(address)) };
        if rc < 0 {
            return Err(io::Error::last_os_error()).with_context(|| {
                format!("cannot select slave {address:#04x} on {}", bus.display())
            });
        }

        Ok(Self { file, address })
    }
}

impl I2cBus for I2cDevice {
    /// One `write(2)` is one I2C transaction, so the frame is never split.
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self
            .file
            .write(bytes)
            .with_context(|| format!("I2C write to {:#04x} failed", self.address))?;
        if written != bytes.len() {
            bail!(
                "short I2C write to {:#04x}: {written} of {} bytes",
                self.address,
                bytes.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_bit_addresses_are_rejected() {
        let err = I2cDevice::open("/dev/null", 0x80).unwrap_err();
        assert!(err.to_string().contains("7-bit"));
    }

    #[test]
    fn missing_adapter_fails_to_open() {
        let err = I2cDevice::open("/nonexistent/i2c-9", 0x3C).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/i2c-9"));
    }

    #[test]
    fn non_i2c_device_rejects_slave_selection() {
        // /dev/null does not implement the I2C ioctls.
        let err = I2cDevice::open("/dev/null", 0x3C).unwrap_err();
        assert!(format!("{err:#}").contains("cannot select slave"));
    }
}
