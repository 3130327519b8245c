use std::path::PathBuf;

use crate::config::{BenchConfig, ParticipantConfig};
use crate::types::IoPattern;

/// Rank whose file a participant targets. With `shuffle` the rank space is
/// inverted, so rank 0 takes the last file and vice versa.
pub fn effective_rank(rank: usize, group_size: usize, shuffle: bool) -> usize {
    if shuffle {
        group_size - 1 - rank
    } else {
        rank
    }
}

/// Target path for one participant. Pure: no filesystem access.
///
/// Shared-file runs give every rank the same path regardless of `shuffle`.
/// Per-process runs embed the effective rank, which keeps paths distinct
/// across the group.
pub fn resolve(config: &ParticipantConfig) -> PathBuf {
    match config.pattern {
        IoPattern::SharedFile => shared_path(&config.mountpoint, &config.filename),
        IoPattern::PerProcessFile => {
            let rank = effective_rank(config.rank, config.group_size, config.shuffle);
            per_process_path(&config.mountpoint, &config.filename, rank)
        }
    }
}

/// Every physical file the group touches: one for shared-file runs, one per
/// rank otherwise. Shuffle does not change the set.
pub fn group_targets(config: &BenchConfig) -> Vec<PathBuf> {
    match config.pattern {
        IoPattern::SharedFile => vec![shared_path(&config.mountpoint, &config.filename)],
        IoPattern::PerProcessFile => (0..config.ranks)
            .map(|r| per_process_path(&config.mountpoint, &config.filename, r))
            .collect(),
    }
}

fn shared_path(mountpoint: &std::path::Path, filename: &str) -> PathBuf {
    mountpoint.join(format!("{}.n1", filename))
}

fn per_process_path(mountpoint: &std::path::Path, filename: &str, rank: usize) -> PathBuf {
    mountpoint.join(format!("{}.nn.{}", filename, rank))
}
