use anyhow::{Context, Result, anyhow};
use blinkd::{
    application::Application,
    cli::Cli,
    config::{Config, DaemonCfg},
};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, error, info};
use syslog::{BasicLogger, Facility, Formatter3164};

fn max_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn init_log(process: &str) -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: process.into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(max_level()))
            .map_err(|e| anyhow!("{e}"))
    })
}

/// Double fork, new session, `umask(0)`, cwd `/`, stdio on `/dev/null`.
fn into_daemon(cfg: &DaemonCfg) -> Result<()> {
    let daemon = Daemonize::new().umask(0u32).working_directory("/");
    let daemon = match &cfg.pid_file {
        Some(path) => daemon.pid_file(path),
        None => daemon,
    };
    daemon.start().map_err(|e| anyhow!("{e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = Config::locate(cli.config.clone());
    let config = match &source {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    // Fork before any thread exists; the runtime is built afterwards.
    if !cli.foreground {
        into_daemon(&config.daemon)?;
    }
    init_log(&config.daemon.syslog_name)?;
    info!("Daemon PID: {}", std::process::id());
    match &source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No configuration file, using defaults"),
    }

    let syslog_name = config.daemon.syslog_name.clone();
    let result = Application::builder()
        .with_config(config)
        .with_period_ms(cli.period_ms())
        .build()
        .and_then(|app| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to build runtime")?
                .block_on(app.run())
        });

    if let Err(e) = &result {
        error!("{syslog_name} exiting: {e:#}");
    }
    log::logger().flush();
    result
}
