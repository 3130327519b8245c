use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StatbenchError {
    #[error("statbench requires a participant group (ranks must be at least 1)")]
    EmptyGroup,

    #[error("Rank {rank} is out of range for a group of {size}")]
    RankOutOfRange { rank: usize, size: usize },

    #[error("Invalid target file name '{name}': must be non-empty and contain no path separator")]
    InvalidFilename { name: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParseError { path: PathBuf, detail: String },

    #[error("Failed to create target file {path}: {source}")]
    TargetSetupError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to start participant thread for rank {rank}: {source}")]
    SpawnFailed {
        rank: usize,
        source: std::io::Error,
    },

    #[error("stat({path}) panicked: {detail}")]
    StatPanicked { path: PathBuf, detail: String },

    #[error("stat({path}) failed: {source}")]
    StatFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
