//! Per-opcode latency tracking.
//!
//! Grounded on `vfs_internal.h`'s `chimera_vfs_complete()`, which stamps an
//! elapsed-nanoseconds figure into a `thread->metrics.op_latency_series`
//! histogram on every completion. Reimplemented here as a fixed bucket
//! histogram per opcode, owned by each [`crate::thread::VfsThread`] (no
//! cross-thread contention, matching the source's per-thread metrics
//! struct); nothing is exported to an external metrics backend, that
//! remains the embedder's concern.

use crate::request::Opcode;
use std::time::Duration;

const NUM_BUCKETS: usize = 32;
/// Bucket `i` covers `[2^i, 2^(i+1))` microseconds; the last bucket is an
/// overflow catch-all.
const NUM_OPCODES: usize = Opcode::COUNT;

/// A log2-bucketed latency histogram for a single opcode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Histogram {
    buckets: [u64; NUM_BUCKETS],
    count: u64,
    sum_micros: u64,
}

impl Histogram {
    fn bucket_for(micros: u64) -> usize {
        if micros == 0 {
            0
        } else {
            (63 - micros.leading_zeros()) as usize
        }
        .min(NUM_BUCKETS - 1)
    }

    /// Records one observation.
    pub fn record(&mut self, elapsed: Duration) {
        let micros = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.buckets[Self::bucket_for(micros)] += 1;
        self.count += 1;
        self.sum_micros = self.sum_micros.saturating_add(micros);
    }

    /// Total observations recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean latency in microseconds, or `0` if no observations yet.
    pub fn mean_micros(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.sum_micros / self.count
        }
    }
}

/// One [`Histogram`] per opcode, indexed by [`Opcode`] discriminant.
#[derive(Debug, Clone)]
pub struct OpMetrics {
    histograms: [Histogram; NUM_OPCODES],
}

impl Default for OpMetrics {
    fn default() -> Self {
        OpMetrics {
            histograms: [Histogram::default(); NUM_OPCODES],
        }
    }
}

impl OpMetrics {
    /// Records one completion's elapsed time under `op`.
    pub fn record(&mut self, op: Opcode, elapsed: Duration) {
        self.histograms[op as usize].record(elapsed);
    }

    /// The histogram for a single opcode.
    pub fn histogram(&self, op: Opcode) -> &Histogram {
        &self.histograms[op as usize]
    }
}
