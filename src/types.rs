use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How participants map onto target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum IoPattern {
    /// N-to-1: every participant targets one shared file.
    #[value(name = "n1", alias = "shared")]
    #[serde(rename = "n1", alias = "shared")]
    SharedFile,
    /// N-to-N: every participant targets its own file.
    #[value(name = "nn", alias = "per-process")]
    #[serde(rename = "nn", alias = "per-process")]
    PerProcessFile,
}

impl fmt::Display for IoPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoPattern::SharedFile => f.write_str("n1"),
            IoPattern::PerProcessFile => f.write_str("nn"),
        }
    }
}

/// Statistic used to combine one timing sample per participant into a
/// single group-wide figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Slowest participant; the group's completion time.
    #[default]
    Max,
    Min,
    Mean,
}

impl Reduction {
    /// Combine `values` in slice order. Callers must pass at least one value.
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Reduction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reduction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reduction::Mean => {
                if values.is_empty() {
                    return 0.0;
                }
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
    }
}

impl Reduction {
    /// Exact integer counterpart of [`apply`](Reduction::apply). The mean
    /// rounds down.
    pub fn apply_u64(self, values: &[u64]) -> u64 {
        match self {
            Reduction::Max => values.iter().copied().max().unwrap_or(0),
            Reduction::Min => values.iter().copied().min().unwrap_or(u64::MAX),
            Reduction::Mean => {
                if values.is_empty() {
                    return 0;
                }
                let sum: u128 = values.iter().map(|&v| v as u128).sum();
                (sum / values.len() as u128) as u64
            }
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Max => f.write_str("max"),
            Reduction::Min => f.write_str("min"),
            Reduction::Mean => f.write_str("mean"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// The parts of a stat result the benchmark looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub size: u64,
    pub is_file: bool,
    pub modified: Option<DateTime<Utc>>,
}

/// Group-wide timing of one barrier-bounded region. Identical on every
/// participant once the aggregation has returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTiming {
    pub label: String,
    pub seconds: f64,
    pub reduction: Reduction,
}

/// Whether every participant that stat'ed successfully saw the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizeCheck {
    Consistent { bytes: u64 },
    Mismatch { min: u64, max: u64 },
    /// No participant produced a size.
    Unavailable,
}

/// What one participant observed during a run.
#[derive(Debug)]
pub struct ParticipantReport {
    pub rank: usize,
    pub path: PathBuf,
    pub outcome: Result<FileMetadata, String>,
    pub timing: AggregateTiming,
    /// Only checked for shared-file runs.
    pub size_check: Option<SizeCheck>,
}

/// All participant reports of an in-process group, in rank order.
#[derive(Debug)]
pub struct GroupReport {
    pub pattern: IoPattern,
    pub shuffle: bool,
    pub participants: Vec<ParticipantReport>,
}

impl GroupReport {
    /// The designated reporter's view. Every participant holds the same
    /// aggregate, so rank 0 speaks for the group.
    pub fn reporter(&self) -> Option<&ParticipantReport> {
        self.participants.first()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ParticipantReport> {
        self.participants.iter().filter(|p| p.outcome.is_err())
    }
}
