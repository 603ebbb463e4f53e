//! Application entry point and builder pattern implementation.

use anyhow::{Context, Result};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    blink_control::Period,
    board::Board,
    config::Config,
    controller::Controller,
    event_loop::{self, spawn_signal_listener, watch_buttons},
};

/// The daemon: opens the board, runs the event loop, tears everything down.
///
/// # Example
///
/// ```no_run
/// use blinkd::{application::Application, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// Application::builder()
///     .with_config(Config::load(None)?)
///     .with_period_ms(Some(250))
///     .build()?
///     .run()
///     .await
/// # }
/// ```
pub struct Application {
    config: Config,
    period: Period,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Runs the complete daemon lifecycle until SIGTERM/SIGINT.
    ///
    /// Returns `Ok(())` only after a signal-triggered shutdown. Every
    /// pseudo-file is closed when the board is dropped at the end, on the
    /// error paths as well.
    pub async fn run(self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let listener = spawn_signal_listener(shutdown.clone())?;

        let mut board = Board::open(&self.config)?;
        let mode = board
            .initial_mode()
            .context("failed to read initial mode")?;
        let mut controller = Controller::new(self.period, mode);
        controller.start(&mut board)?;

        let events = watch_buttons(&board)?;
        info!("Daemon ready !");

        let result = event_loop::run(&mut controller, &mut board, events, shutdown).await;

        listener.abort();
        board.shutdown();
        info!("Daemon stopped");
        result
    }
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config: Option<Config>,
    period_ms: Option<u64>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config: None,
            period_ms: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured start-up period; `None` keeps it.
    pub fn with_period_ms(mut self, period_ms: Option<u64>) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Builds the Application, falling back to the default configuration.
    pub fn build(self) -> Result<Application> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let period = match self.period_ms.map(Period::from_millis) {
            Some(Ok(period)) => period,
            Some(Err(e)) => {
                warn!("Ignoring period override: {e:#}");
                Period::from_millis(config.period_ms)?
            }
            None => Period::from_millis(config.period_ms)?,
        };
        info!("Initial period: {period}");

        Ok(Application { config, period })
    }
}
