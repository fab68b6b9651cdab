//! Command-line surface for the `trustee` binary.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{Overrides, CONFIG_ENV};

#[derive(Parser, Debug)]
#[command(
    name = "trustee",
    version,
    about = "Secret Santa Trustee: private one-shot reveals with a split-password backup"
)]
pub struct Cli {
    /// Auto-clear the reveal after N seconds instead of waiting for Enter.
    #[arg(long, value_name = "N")]
    pub timeout: Option<u64>,

    /// Clear immediately after a reveal (same as `--timeout 0`).
    #[arg(long)]
    pub no_enter: bool,

    /// Let participants view their assignment more than once.
    #[arg(long)]
    pub allow_repeat: bool,

    /// Seed for reproducible assignments and backup password.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Skip the encrypted backup archive.
    #[arg(long)]
    pub no_backup: bool,

    /// Start straight away without the settings menu.
    #[arg(long)]
    pub skip_menu: bool,

    /// Directory for the backup archive (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// JSON config file (default: $TRUSTEE_CONFIG when set).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (repeat for debug).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            allow_repeat: self.allow_repeat,
            timeout: self.timeout,
            no_enter: self.no_enter,
            seed: self.seed,
            no_backup: self.no_backup,
            skip_menu: self.skip_menu,
            archive_dir: self.archive_dir.clone(),
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            std::env::var_os(CONFIG_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_every_flag() {
        let cli = Cli::try_parse_from([
            "trustee",
            "--timeout",
            "4",
            "--no-enter",
            "--allow-repeat",
            "--seed",
            "42",
            "--no-backup",
            "--skip-menu",
            "--archive-dir",
            "out",
            "-vv",
        ])
        .expect("valid flags");
        let overrides = cli.overrides();
        assert_eq!(overrides.timeout, Some(4));
        assert!(overrides.no_enter && overrides.allow_repeat);
        assert!(overrides.no_backup && overrides.skip_menu);
        assert_eq!(overrides.seed, Some(42));
        assert_eq!(overrides.archive_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn rejects_negative_timeout() {
        assert!(Cli::try_parse_from(["trustee", "--timeout", "-1"]).is_err());
    }

    #[test]
    fn explicit_config_flag_is_used() {
        let cli = Cli::try_parse_from(["trustee", "--config", "santa.json"]).expect("valid");
        assert_eq!(cli.config_path(), Some(PathBuf::from("santa.json")));
    }
}
