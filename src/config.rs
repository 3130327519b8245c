use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::StatbenchError;
use crate::types::{IoPattern, Reduction};

pub const DEFAULT_MOUNTPOINT: &str = "/tmp";
pub const DEFAULT_FILENAME: &str = "testfile";

/// Run-wide configuration shared by every participant.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub mountpoint: PathBuf,
    pub filename: String,
    pub pattern: IoPattern,
    pub shuffle: bool,
    pub ranks: usize,
    pub reduction: Reduction,
    pub create: bool,
    pub file_size: u64,
    pub cleanup: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::from(DEFAULT_MOUNTPOINT),
            filename: DEFAULT_FILENAME.to_string(),
            pattern: IoPattern::SharedFile,
            shuffle: false,
            ranks: 1,
            reduction: Reduction::Max,
            create: false,
            file_size: 0,
            cleanup: false,
        }
    }
}

/// Settings from a TOML file or the command line. `None` leaves the
/// lower-precedence value in place.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub mountpoint: Option<PathBuf>,
    pub filename: Option<String>,
    pub pattern: Option<IoPattern>,
    pub shuffle: Option<bool>,
    pub ranks: Option<usize>,
    pub reduction: Option<Reduction>,
    pub create: Option<bool>,
    pub file_size: Option<u64>,
    pub cleanup: Option<bool>,
}

impl BenchConfig {
    /// Layer defaults, then the config file (explicit path, or the default
    /// location when it exists), then command-line overrides, and validate.
    pub fn load(
        config_path: Option<&Path>,
        cli: ConfigOverrides,
    ) -> Result<BenchConfig, StatbenchError> {
        let mut config = BenchConfig::default();

        let file_path = match config_path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };
        if let Some(path) = file_path {
            tracing::debug!(path = %path.display(), "loading config file");
            config.apply(read_config_file(&path)?);
        }

        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.mountpoint {
            self.mountpoint = v;
        }
        if let Some(v) = overrides.filename {
            self.filename = v;
        }
        if let Some(v) = overrides.pattern {
            self.pattern = v;
        }
        if let Some(v) = overrides.shuffle {
            self.shuffle = v;
        }
        if let Some(v) = overrides.ranks {
            self.ranks = v;
        }
        if let Some(v) = overrides.reduction {
            self.reduction = v;
        }
        if let Some(v) = overrides.create {
            self.create = v;
        }
        if let Some(v) = overrides.file_size {
            self.file_size = v;
        }
        if let Some(v) = overrides.cleanup {
            self.cleanup = v;
        }
    }

    pub fn validate(&self) -> Result<(), StatbenchError> {
        if self.ranks == 0 {
            return Err(StatbenchError::EmptyGroup);
        }
        if self.filename.is_empty() || self.filename.contains(std::path::is_separator) {
            return Err(StatbenchError::InvalidFilename {
                name: self.filename.clone(),
            });
        }
        Ok(())
    }

    /// The per-participant view for `rank` in a group of `group_size`.
    pub fn for_participant(
        &self,
        rank: usize,
        group_size: usize,
    ) -> Result<ParticipantConfig, StatbenchError> {
        if rank >= group_size {
            return Err(StatbenchError::RankOutOfRange {
                rank,
                size: group_size,
            });
        }
        Ok(ParticipantConfig {
            rank,
            group_size,
            pattern: self.pattern,
            shuffle: self.shuffle,
            mountpoint: self.mountpoint.clone(),
            filename: self.filename.clone(),
        })
    }
}

/// Immutable identity and target selection of one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantConfig {
    pub rank: usize,
    pub group_size: usize,
    pub pattern: IoPattern,
    pub shuffle: bool,
    pub mountpoint: PathBuf,
    pub filename: String,
}

/// `$XDG_CONFIG_HOME/statbench/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("statbench").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ConfigOverrides, StatbenchError> {
    let text = std::fs::read_to_string(path).map_err(|source| StatbenchError::ConfigReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| StatbenchError::ConfigParseError {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
