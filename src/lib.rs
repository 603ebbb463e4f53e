//! # blinkd
//!
//! A Linux daemon that controls a blinking LED from three GPIO buttons and
//! shows its state on an SSD1306 OLED.
//!
//! ## Features
//!
//! - **sysfs GPIO**: LED and buttons are claimed through `/sys/class/gpio`
//! - **Edge-Triggered**: button edges arrive as `POLLPRI` on the `value`
//!   attributes, multiplexed by a single-threaded Tokio reactor
//! - **Blink Control**: buttons 0/1 halve/double the blink period, button 2
//!   switches the kernel blink module between automatic and manual mode
//! - **Status Display**: CPU temperature, frequency and mode on the OLED
//! - **Daemon**: double fork, syslog logging, clean exit on SIGTERM/SIGINT
//!
//! ## Architecture
//!
//! - [`Board`](board::Board) - owns every pseudo-file handle
//! - [`Controller`](controller::Controller) - period, mode and debounce latches
//! - [`event_loop`] - readiness streams, signal listener, dispatch loop
//! - [`Application`](application::Application) - lifecycle
//!
//! ## Example
//!
//! ```no_run
//! use blinkd::{application::Application, config::Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let app = Application::builder()
//!         .with_config(Config::load(None)?)
//!         .build()?;
//!     tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()?
//!         .block_on(app.run())
//! }
//! ```

pub mod application;
pub mod blink_control;
pub mod board;
pub mod cli;
pub mod config;
pub mod controller;
pub mod display;
pub mod event_loop;
pub mod gpio;
pub mod sysfs;
pub mod thermal;
