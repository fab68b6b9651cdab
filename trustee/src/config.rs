//! Session settings. Values come from built-in defaults, then an optional
//! JSON config file, then command-line flags, in increasing priority.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;

use crate::reveal::RevealPolicy;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "TRUSTEE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} unreadable: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} invalid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// How the reveal screen goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    PressEnter,
    /// Auto-clear after the given number of seconds; 0 clears immediately.
    AfterSeconds(u64),
}

impl ClearMode {
    pub fn describe(&self) -> String {
        match self {
            ClearMode::PressEnter => "press Enter".to_string(),
            ClearMode::AfterSeconds(0) => "immediately".to_string(),
            ClearMode::AfterSeconds(secs) => format!("after {secs} s"),
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub allow_repeat: Option<bool>,
    pub timeout: Option<u64>,
    pub backup: Option<bool>,
    pub archive_dir: Option<PathBuf>,
    pub skip_menu: Option<bool>,
}

/// Values supplied on the command line. `false` flags mean "not given".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub allow_repeat: bool,
    pub timeout: Option<u64>,
    pub no_enter: bool,
    pub seed: Option<u64>,
    pub no_backup: bool,
    pub skip_menu: bool,
    pub archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub policy: RevealPolicy,
    pub clear: ClearMode,
    pub seed: Option<u64>,
    pub backup: bool,
    pub archive_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub skip_menu: bool,
    /// Offset used for archive timestamps; resolved once at startup.
    pub local_offset: UtcOffset,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: RevealPolicy::OneShot,
            clear: ClearMode::PressEnter,
            seed: None,
            backup: true,
            archive_dir: PathBuf::from("."),
            scratch_dir: std::env::temp_dir(),
            skip_menu: false,
            local_offset: UtcOffset::UTC,
        }
    }
}

impl Settings {
    pub fn resolve(file: &FileConfig, cli: &Overrides) -> Self {
        let defaults = Settings::default();

        let allow_repeat = cli.allow_repeat || file.allow_repeat.unwrap_or(false);
        let clear = if cli.no_enter {
            ClearMode::AfterSeconds(0)
        } else if let Some(secs) = cli.timeout.or(file.timeout) {
            ClearMode::AfterSeconds(secs)
        } else {
            defaults.clear
        };
        let backup = !cli.no_backup && file.backup.unwrap_or(defaults.backup);
        let archive_dir = cli
            .archive_dir
            .clone()
            .or_else(|| file.archive_dir.clone())
            .unwrap_or(defaults.archive_dir);

        Self {
            policy: RevealPolicy::from_allow_repeat(allow_repeat),
            clear,
            seed: cli.seed,
            backup,
            archive_dir,
            scratch_dir: defaults.scratch_dir,
            skip_menu: cli.skip_menu || file.skip_menu.unwrap_or(false),
            local_offset: defaults.local_offset,
        }
    }
}

/// Reads and parses a JSON config file.
pub fn load_config(path: impl AsRef<Path>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
