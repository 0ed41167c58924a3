use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::ArrayD;

#[derive(Debug, Default)]
struct LedgerCounts {
    live: AtomicUsize,
    peak: AtomicUsize,
    allocated: AtomicUsize,
}

/// Counts the tensors allocated through it that are still alive.
///
/// Every tensor handed out by [`TensorLedger::track`] decrements the live
/// count when dropped, so a finished call leaves the count where it found it
/// no matter how the call exited.
#[derive(Debug, Clone, Default)]
pub struct TensorLedger {
    counts: Arc<LedgerCounts>,
}

impl TensorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, data: ArrayD<f32>) -> TrackedTensor {
        let live = self.counts.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counts.peak.fetch_max(live, Ordering::SeqCst);
        self.counts.allocated.fetch_add(1, Ordering::SeqCst);
        TrackedTensor {
            data,
            ledger: self.clone(),
        }
    }

    /// Tensors currently alive.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Highest number of tensors alive at the same time.
    pub fn peak(&self) -> usize {
        self.counts.peak.load(Ordering::SeqCst)
    }

    /// Tensors ever tracked.
    pub fn allocated(&self) -> usize {
        self.counts.allocated.load(Ordering::SeqCst)
    }
}

/// A tensor released back to its ledger on drop.
pub struct TrackedTensor {
    data: ArrayD<f32>,
    ledger: TensorLedger,
}

impl Deref for TrackedTensor {
    type Target = ArrayD<f32>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl Drop for TrackedTensor {
    fn drop(&mut self) {
        self.ledger.counts.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for TrackedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedTensor")
            .field("shape", &self.data.shape())
            .finish()
    }
}
