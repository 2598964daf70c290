//! dirwatch
//!
//! Watches one file or directory and prints every change notification the
//! system delivers for it, until interrupted.

mod cancel;
mod cli;
mod config;
mod error;
mod reporter;
mod run_loop;
mod session;
mod signal;

use cancel::CancelFlag;
use cli::Cli;
use color_eyre::eyre::{Result, WrapErr};
use config::MonitorConfig;
use reporter::TextReporter;
use run_loop::{Exit, RunLoop};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse_or_exit();

    let config = MonitorConfig::load(cli.config.as_ref())?
        .with_log_level(cli.log_level.clone())
        .with_backend(cli.backend)
        .with_poll_interval_ms(cli.poll_interval_ms)
        .with_buffer_size(cli.buffer_size);

    init_logging(&config.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %cli.path.display(),
        backend = ?config.backend,
        "Starting dirwatch"
    );

    let cancel = CancelFlag::new();
    signal::install(&cancel).wrap_err("failed to install interrupt handler")?;

    let (mut session, handle) = session::open_watch(&config, &cli.path)?;

    let mut reporter = TextReporter::stdout();
    let exit = RunLoop::new(
        &mut *session,
        handle,
        &mut reporter,
        cancel,
        config.effective_buffer_size(),
    )
    .run();

    tracing::info!(exit_code = exit.exit_code(), "Ending program");

    match exit {
        Exit::Stopped => Ok(ExitCode::SUCCESS),
        Exit::Failed(e) => Err(e.into()),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
