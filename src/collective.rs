//! Group membership and blocking collectives.
//!
//! Every call on a [`CollectiveContext`] blocks until all members of the
//! group have made the same call. There is no timeout: a member that never
//! arrives stalls the rest of the group.

use std::sync::{Arc, Barrier, Mutex, PoisonError};

use crate::types::Reduction;

pub trait CollectiveContext {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Block until every member has called `barrier`.
    fn barrier(&self);

    /// Combine one value per member with `op`. Every member receives the
    /// bit-identical result.
    fn all_reduce(&self, value: f64, op: Reduction) -> f64;

    /// Integer form of [`all_reduce`](CollectiveContext::all_reduce), exact
    /// over the whole `u64` range.
    fn all_reduce_u64(&self, value: u64, op: Reduction) -> u64;

    fn reduce_max(&self, value: f64) -> f64 {
        self.all_reduce(value, Reduction::Max)
    }
}

/// A group of one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoloContext;

impl CollectiveContext for SoloContext {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce(&self, value: f64, op: Reduction) -> f64 {
        op.apply(&[value])
    }

    fn all_reduce_u64(&self, value: u64, op: Reduction) -> u64 {
        op.apply_u64(&[value])
    }
}

/// Slots and result hold raw 64-bit words: `f64` bits or plain `u64`.
struct Rendezvous {
    barrier: Barrier,
    slots: Mutex<Vec<u64>>,
    result: Mutex<u64>,
}

/// One member of a group of threads in this process.
///
/// Create the whole group with [`LocalGroup::new`] and hand one member to
/// each participant thread.
#[derive(Clone)]
pub struct LocalGroup {
    rank: usize,
    size: usize,
    shared: Arc<Rendezvous>,
}

impl LocalGroup {
    /// Members for ranks `0..size`, in rank order.
    pub fn new(size: usize) -> Vec<LocalGroup> {
        let shared = Arc::new(Rendezvous {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![0; size]),
            result: Mutex::new(0),
        });
        (0..size)
            .map(|rank| LocalGroup {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl CollectiveContext for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_reduce(&self, value: f64, op: Reduction) -> f64 {
        let bits = self.exchange(value.to_bits(), |words| {
            let values: Vec<f64> = words.iter().map(|w| f64::from_bits(*w)).collect();
            op.apply(&values).to_bits()
        });
        f64::from_bits(bits)
    }

    fn all_reduce_u64(&self, value: u64, op: Reduction) -> u64 {
        self.exchange(value, |words| op.apply_u64(words))
    }
}

impl LocalGroup {
    /// Publish `word`, let one member combine all slots, and hand the
    /// combined word back to every member.
    fn exchange(&self, word: u64, combine: impl FnOnce(&[u64]) -> u64) -> u64 {
        // Slots are only written before the first wait and the result only
        // after it, so a member still reading the previous result cannot be
        // overtaken: the next round's first wait needs it to arrive.
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)[self.rank] = word;

        if self.shared.barrier.wait().is_leader() {
            let combined = {
                let slots = self
                    .shared
                    .slots
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                combine(&slots)
            };
            *self
                .shared
                .result
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = combined;
        }
        self.shared.barrier.wait();

        *self
            .shared
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
