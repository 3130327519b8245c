use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;

use anyhow::{Result, anyhow};

use crate::collective::{CollectiveContext, LocalGroup};
use crate::config::BenchConfig;
use crate::errors::StatbenchError;
use crate::path;
use crate::stat;
use crate::timing::TimedRegion;
use crate::types::{FileMetadata, GroupReport, IoPattern, ParticipantReport, Reduction, SizeCheck};

pub const STAT_REGION: &str = "stat";

/// One participant's benchmark: resolve its target, stat it once inside a
/// barrier-bounded timed region, then check sizes across the group.
///
/// Every member of `ctx` must call this with the same `config`. A failing
/// or panicking stat is recorded in the report; the region is closed and the
/// size check joined either way.
pub fn run_participant<C, S>(ctx: &C, config: &BenchConfig, stat: S) -> Result<ParticipantReport>
where
    C: CollectiveContext + ?Sized,
    S: FnOnce(&Path) -> Result<FileMetadata, StatbenchError>,
{
    let participant = config.for_participant(ctx.rank(), ctx.size())?;
    let target = path::resolve(&participant);
    tracing::debug!(rank = participant.rank, target = %target.display(), "resolved target file");

    let region = TimedRegion::enter(ctx, STAT_REGION, config.reduction);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| stat(&target))).unwrap_or_else(|payload| {
        Err(StatbenchError::StatPanicked {
            path: target.clone(),
            detail: panic_detail(payload.as_ref()),
        })
    });
    let timing = region.finish();

    let outcome = outcome.map_err(|e| {
        tracing::warn!(rank = participant.rank, error = %e, "stat failed");
        e.to_string()
    });

    let size_check = match config.pattern {
        IoPattern::SharedFile => Some(check_sizes(ctx, &outcome)),
        IoPattern::PerProcessFile => None,
    };

    if participant.rank == 0 {
        tracing::info!(
            seconds = timing.seconds,
            reduction = %timing.reduction,
            ranks = participant.group_size,
            "stat region complete"
        );
    }

    Ok(ParticipantReport {
        rank: participant.rank,
        path: target,
        outcome,
        timing,
        size_check,
    })
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Compare file sizes over the members whose stat succeeded. Failed members
/// contribute values that never win the reduction. Sizes are reduced as
/// exact integers.
fn check_sizes<C>(ctx: &C, outcome: &Result<FileMetadata, String>) -> SizeCheck
where
    C: CollectiveContext + ?Sized,
{
    let (low, high, ok) = match outcome {
        Ok(meta) => (meta.size, meta.size, 1),
        Err(_) => (u64::MAX, 0, 0),
    };
    let any_ok = ctx.all_reduce_u64(ok, Reduction::Max);
    let min = ctx.all_reduce_u64(low, Reduction::Min);
    let max = ctx.all_reduce_u64(high, Reduction::Max);

    if any_ok == 0 {
        SizeCheck::Unavailable
    } else if min == max {
        SizeCheck::Consistent { bytes: min }
    } else {
        SizeCheck::Mismatch { min, max }
    }
}

/// Holds participant threads until every one of them has been spawned.
/// `Some(true)` starts the run, `Some(false)` aborts it.
struct StartGate {
    state: Mutex<Option<bool>>,
    opened: Condvar,
}

impl StartGate {
    fn new() -> Self {
        StartGate {
            state: Mutex::new(None),
            opened: Condvar::new(),
        }
    }

    fn open(&self, proceed: bool) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(proceed);
        self.opened.notify_all();
    }

    /// Blocks until [`open`](StartGate::open) is called; returns whether to
    /// proceed.
    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(proceed) = *state {
                return proceed;
            }
            state = self
                .opened
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Run the benchmark on `config.ranks` threads of this process.
///
/// Target files are created before the group starts and removed after every
/// participant has finished, when the config asks for it.
pub fn run_local_group<S>(config: &BenchConfig, stat: S) -> Result<GroupReport>
where
    S: Fn(&Path) -> Result<FileMetadata, StatbenchError> + Sync,
{
    run_group_with(config, stat, |rank| {
        Ok(thread::Builder::new().name(format!("statbench-rank-{}", rank)))
    })
}

/// `thread_for` supplies the builder for each rank's thread; an error from
/// it or from spawning aborts the run before any participant starts timing.
fn run_group_with<S, B>(config: &BenchConfig, stat: S, thread_for: B) -> Result<GroupReport>
where
    S: Fn(&Path) -> Result<FileMetadata, StatbenchError> + Sync,
    B: Fn(usize) -> std::io::Result<thread::Builder>,
{
    config.validate()?;

    let targets = path::group_targets(config);
    if config.create {
        stat::prepare_targets(&targets, config.file_size)?;
    }

    let members = LocalGroup::new(config.ranks);
    let gate = StartGate::new();
    let spawned: Result<Vec<thread::Result<Option<Result<ParticipantReport>>>>, StatbenchError> =
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(members.len());
            for member in &members {
                let stat = &stat;
                let gate = &gate;
                let handle = thread_for(member.rank()).and_then(|builder| {
                    builder.spawn_scoped(s, move || {
                        if !gate.wait() {
                            return None;
                        }
                        Some(run_participant(member, config, stat))
                    })
                });
                match handle {
                    Ok(h) => handles.push(h),
                    Err(source) => {
                        // Nobody has reached a barrier yet; release the
                        // spawned members so the scope can join them.
                        gate.open(false);
                        return Err(StatbenchError::SpawnFailed {
                            rank: member.rank(),
                            source,
                        });
                    }
                }
            }
            gate.open(true);
            Ok(handles.into_iter().map(|h| h.join()).collect())
        });

    if config.cleanup {
        stat::cleanup_targets(&targets);
    }

    let mut participants = Vec::with_capacity(config.ranks);
    for (rank, result) in spawned?.into_iter().enumerate() {
        let report = result
            .map_err(|_| anyhow!("participant {} panicked", rank))?
            .ok_or_else(|| anyhow!("participant {} did not start", rank))??;
        participants.push(report);
    }

    Ok(GroupReport {
        pattern: config.pattern,
        shuffle: config.shuffle,
        participants,
    })
}
