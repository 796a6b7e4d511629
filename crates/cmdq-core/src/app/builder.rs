//! ProcessorBuilder - wiring and spawning
//!
//! Everything that can go wrong while setting up a processor is reported by
//! `build()` instead of surfacing later from the worker:
//! - no tokio runtime for a task worker
//! - pool out of slots
//! - OS refuses the thread
//!
//! # 学習ポイント
//! - thread worker はスレッド生成前に current-thread runtime を作る
//! - pool の枠は `OwnedSemaphorePermit` で worker の寿命に紐づける

use std::sync::Arc;

use tracing::info;

use super::config::{ProcessorConfig, WorkerKind};
use super::pool::WorkerPool;
use super::processor::{Processor, WorkerHandle};
use super::shared::{Callbacks, Shared};
use super::worker_loop::Worker;
use crate::command::Command;
use crate::domain::CommandHandle;
use crate::error::{BoxError, CommandError};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("task workers must be built inside a tokio runtime")]
    NoRuntime,

    #[error("worker pool `{pool}` is exhausted ({max} threads in use)")]
    PoolExhausted { pool: String, max: usize },

    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Builds a [`Processor`] and starts its worker (in the `Idle` state; call
/// `start()` to begin draining).
///
/// ```ignore
/// let panel = Processor::<PanelCmd>::builder("panel")
///     .pool(&devices)
///     .on_error(|h, e| tracing::warn!(handle = %h, error = %e, "panel"))
///     .build(Panel::open()?)?;
/// ```
pub struct ProcessorBuilder<Cmd: Command> {
    config: ProcessorConfig,
    pool: Option<WorkerPool>,
    callbacks: Callbacks<Cmd::Output>,
}

impl<Cmd: Command> ProcessorBuilder<Cmd> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(ProcessorConfig::new(name))
    }

    pub fn from_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            pool: None,
            callbacks: Callbacks::default(),
        }
    }

    pub fn worker(mut self, worker: WorkerKind) -> Self {
        self.config.worker = worker;
        self
    }

    pub fn default_priority(mut self, priority: i32) -> Self {
        self.config.default_priority = priority;
        self
    }

    /// Run on a dedicated thread that occupies one slot of `pool`.
    pub fn pool(mut self, pool: &WorkerPool) -> Self {
        self.config.worker = WorkerKind::Thread;
        self.pool = Some(pool.clone());
        self
    }

    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CommandHandle, Cmd::Output) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.callbacks.on_result = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CommandHandle, CommandError) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(callback));
        self
    }

    pub fn build(self, context: Cmd::Context) -> Result<Processor<Cmd>, BuildError> {
        let ProcessorBuilder {
            config,
            pool,
            callbacks,
        } = self;

        let shared = Arc::new(Shared::new(
            config.name.clone(),
            config.default_priority,
            callbacks,
        ));
        let worker = Worker::new(Arc::clone(&shared), context);

        let handle = match config.worker {
            WorkerKind::Task => {
                let runtime =
                    tokio::runtime::Handle::try_current().map_err(|_| BuildError::NoRuntime)?;
                WorkerHandle::Task(runtime.spawn(worker.run()))
            }
            WorkerKind::Thread => {
                let permit = pool.as_ref().map(WorkerPool::acquire).transpose()?;
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                let thread = std::thread::Builder::new()
                    .name(format!("cmdq-{}", config.name))
                    .spawn(move || {
                        let _permit = permit;
                        runtime.block_on(worker.run())
                    })?;
                WorkerHandle::Thread(thread)
            }
        };

        info!(
            processor = %config.name,
            id = %shared.id,
            worker = ?config.worker,
            pool = pool.as_ref().map(WorkerPool::name),
            "processor built"
        );
        Ok(Processor::from_parts(shared, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Command for Noop {
        type Context = ();
        type Output = ();

        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(self, _handle: &CommandHandle, _cx: &mut ()) -> Result<(), CommandError> {
            Ok(())
        }
    }

    #[test]
    fn task_worker_without_runtime_fails_fast() {
        let result = ProcessorBuilder::<Noop>::new("orphan").build(());
        assert!(matches!(result, Err(BuildError::NoRuntime)));
    }

    #[tokio::test]
    async fn pool_exhaustion_is_reported_at_build_time() {
        let pool = WorkerPool::new("devices", 1);

        let first = ProcessorBuilder::<Noop>::new("a").pool(&pool).build(()).unwrap();
        let second = ProcessorBuilder::<Noop>::new("b").pool(&pool).build(());
        assert!(matches!(second, Err(BuildError::PoolExhausted { max: 1, .. })));

        first.halt().await.unwrap();
        assert_eq!(pool.available(), 1);
        let third = ProcessorBuilder::<Noop>::new("c").pool(&pool).build(()).unwrap();
        third.halt().await.unwrap();
    }
}
