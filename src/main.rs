//! lcadata CLI entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use lcadata::cli::{Cli, CommandContext, CommandDispatcher, CommandResult};
use lcadata::config::{load_settings, SettingsOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("lcadata=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lcadata=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> lcadata::Result<CommandResult> {
    let overrides = SettingsOverrides {
        local_root: cli.local_root.clone(),
        remote_root: cli.remote_root.clone(),
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    tracing::debug!("Resolved settings: {:?}", settings);

    let dispatcher = CommandDispatcher::new(CommandContext::new(settings)?);
    let mut stdout = io::stdout().lock();
    dispatcher.dispatch(&cli.command, &mut stdout)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("lcadata starting with args: {:?}", cli);

    match run(&cli) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
