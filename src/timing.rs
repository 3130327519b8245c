use std::time::Instant;

use crate::collective::CollectiveContext;
use crate::types::{AggregateTiming, Reduction};

/// A barrier-bounded timed region.
///
/// Entering waits for the whole group, then starts a local clock. Leaving
/// stops the clock, waits for the whole group again and reduces the
/// per-participant samples into one [`AggregateTiming`]. A region that is
/// dropped without [`finish`](TimedRegion::finish) still runs the exit
/// sequence, so one participant bailing out early cannot leave the others
/// stuck in the exit barrier.
pub struct TimedRegion<'a, C: CollectiveContext + ?Sized> {
    ctx: &'a C,
    label: String,
    reduction: Reduction,
    start: Instant,
    closed: bool,
}

impl<'a, C: CollectiveContext + ?Sized> TimedRegion<'a, C> {
    pub fn enter(ctx: &'a C, label: impl Into<String>, reduction: Reduction) -> Self {
        ctx.barrier();
        TimedRegion {
            ctx,
            label: label.into(),
            reduction,
            start: Instant::now(),
            closed: false,
        }
    }

    pub fn finish(mut self) -> AggregateTiming {
        self.close()
    }

    fn close(&mut self) -> AggregateTiming {
        self.closed = true;
        let sample = self.start.elapsed().as_secs_f64();
        self.ctx.barrier();
        let seconds = self.ctx.all_reduce(sample, self.reduction);
        tracing::trace!(
            rank = self.ctx.rank(),
            label = %self.label,
            sample,
            seconds,
            "timed region closed"
        );
        AggregateTiming {
            label: self.label.clone(),
            seconds,
            reduction: self.reduction,
        }
    }
}

impl<C: CollectiveContext + ?Sized> Drop for TimedRegion<'_, C> {
    fn drop(&mut self) {
        if !self.closed {
            let timing = self.close();
            tracing::debug!(
                rank = self.ctx.rank(),
                label = %timing.label,
                seconds = timing.seconds,
                "timed region abandoned; aggregate discarded"
            );
        }
    }
}

/// Run `f` inside a timed region and return its result with the group's
/// aggregate timing.
pub fn timed_barrier_region<C, T, F>(
    ctx: &C,
    label: &str,
    reduction: Reduction,
    f: F,
) -> (T, AggregateTiming)
where
    C: CollectiveContext + ?Sized,
    F: FnOnce() -> T,
{
    let region = TimedRegion::enter(ctx, label, reduction);
    let value = f();
    (value, region.finish())
}
