//! `trustee` binary: parses flags, loads config, and runs one session on the
//! current terminal.

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use time::UtcOffset;

use trustee::cli::Cli;
use trustee::config::{load_config, ConfigError, FileConfig, Settings};
use trustee::interrupt;
use trustee::scratch::Janitor;
use trustee::session::{Session, SessionError, SessionSummary};
use trustee::telemetry;
use trustee::terminal::Console;

#[derive(Debug, Error)]
enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("interrupt handler setup failed: {0}")]
    Signals(#[source] std::io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            println!(
                "{} of {} participants viewed their assignment.",
                summary.reveals, summary.participants
            );
            if let Some(path) = summary.archive {
                println!("Encrypted backup: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(AppError::Session(SessionError::Aborted)) => {
            eprintln!("Nothing was assigned. Goodbye.");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("trustee: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<SessionSummary, AppError> {
    let file = match cli.config_path() {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let mut settings = Settings::resolve(&file, &cli.overrides());
    // Must run before any other thread exists; see time's local-offset notes.
    settings.local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let janitor = Janitor::default();
    interrupt::install(janitor.clone()).map_err(AppError::Signals)?;

    let mut session = Session::new(Console::stdio(), settings, janitor);
    Ok(session.run()?)
}
