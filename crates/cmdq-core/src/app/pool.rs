//! Bounded set of worker threads shared by several processors.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::builder::BuildError;

/// Caps how many thread-mode processors may run at once.
///
/// Each processor built with `.pool(&pool)` holds one slot for the lifetime
/// of its worker thread; the slot frees when the worker exits. Building past
/// the cap fails with `BuildError::PoolExhausted` instead of waiting.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: Arc<str>,
    slots: Arc<Semaphore>,
    max_threads: usize,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, max_threads: usize) -> Self {
        let name: String = name.into();
        Self {
            name: name.into(),
            slots: Arc::new(Semaphore::new(max_threads)),
            max_threads,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub(crate) fn acquire(&self) -> Result<OwnedSemaphorePermit, BuildError> {
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| BuildError::PoolExhausted {
                pool: self.name.to_string(),
                max: self.max_threads,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_fails_once_every_slot_is_taken() {
        let pool = WorkerPool::new("devices", 2);

        let first = pool.acquire().unwrap();
        let _second = pool.acquire().unwrap();
        assert_eq!(pool.available(), 0);

        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, BuildError::PoolExhausted { ref pool, max: 2 } if pool == "devices"));

        drop(first);
        assert_eq!(pool.available(), 1);
        assert!(pool.acquire().is_ok());
    }
}
