use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::ProcessorState;

/// Point-in-time view of one processor.
///
/// - `queued`: entries sitting in the queue (control entries included)
/// - `unfinished`: put but not yet `task_done` (queued + the one running)
/// - `succeeded` / `failed`: commands that reached the notification step
/// - `discarded`: entries dropped by `cancel` or a stopped worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorStats {
    pub state: ProcessorState,
    pub queued: usize,
    pub unfinished: usize,
    pub succeeded: u64,
    pub failed: u64,
    pub discarded: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record<T, E>(&self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.succeeded(),
            Err(_) => self.failed(),
        }
    }

    pub(crate) fn succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn discarded(&self, n: u64) {
        self.discarded.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        state: ProcessorState,
        queued: usize,
        unfinished: usize,
    ) -> ProcessorStats {
        ProcessorStats {
            state,
            queued,
            unfinished,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
