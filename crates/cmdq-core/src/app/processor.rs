//! Processor - owner-side handle of one command queue and its worker.
//!
//! # Lifecycle
//! - `build()` spawns the worker, state `Idle` (commands queue up, nothing runs)
//! - `start()` / `pause()` toggle draining; an in-flight command always finishes
//! - `halt()` drains what is queued and stops; `cancel()` stops at the next
//!   dequeue and discards the rest
//! - dropping the last `Processor` clone requests a halt without waiting
//!
//! Callbacks run on the worker. Calling `halt().await` from inside one would
//! wait on itself; use `request_halt()` there.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;

use super::builder::ProcessorBuilder;
use super::pending::Pending;
use super::sender::{CommandSender, SendOptions};
use super::shared::Shared;
use crate::command::Command;
use crate::domain::{CommandHandle, ProcessorId, ProcessorState, StopMode};
use crate::error::{BoxError, CommandError, ProcessorError};
use crate::observability::ProcessorStats;

pub(crate) enum WorkerHandle {
    Task(tokio::task::JoinHandle<Result<(), CommandError>>),
    Thread(std::thread::JoinHandle<Result<(), CommandError>>),
}

impl WorkerHandle {
    async fn wait(self, processor: &str) -> Result<(), ProcessorError> {
        let exit = match self {
            WorkerHandle::Task(join) => join.await.ok(),
            WorkerHandle::Thread(thread) => tokio::task::spawn_blocking(move || thread.join().ok())
                .await
                .ok()
                .flatten(),
        };
        match exit {
            Some(Ok(())) => Ok(()),
            Some(Err(source)) => Err(ProcessorError::Worker {
                processor: processor.to_string(),
                source,
            }),
            None => Err(ProcessorError::WorkerPanicked(processor.to_string())),
        }
    }
}

struct Owner<Cmd: Command> {
    shared: Arc<Shared<Cmd>>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl<Cmd: Command> Drop for Owner<Cmd> {
    fn drop(&mut self) {
        self.shared.request_stop(StopMode::Drain);
    }
}

/// A priority command queue with a single worker that owns `Cmd::Context`.
///
/// Cheap to clone; the worker keeps running until halted, cancelled, or the
/// last clone is dropped.
pub struct Processor<Cmd: Command> {
    owner: Arc<Owner<Cmd>>,
}

impl<Cmd: Command> Clone for Processor<Cmd> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
        }
    }
}

impl<Cmd: Command> Processor<Cmd> {
    pub fn builder(name: impl Into<String>) -> ProcessorBuilder<Cmd> {
        ProcessorBuilder::new(name)
    }

    pub(crate) fn from_parts(shared: Arc<Shared<Cmd>>, worker: WorkerHandle) -> Self {
        Self {
            owner: Arc::new(Owner {
                shared,
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    fn shared(&self) -> &Shared<Cmd> {
        &self.owner.shared
    }

    pub fn id(&self) -> ProcessorId {
        self.shared().id
    }

    pub fn name(&self) -> &str {
        &self.shared().name
    }

    pub fn state(&self) -> ProcessorState {
        self.shared().state()
    }

    pub fn stats(&self) -> ProcessorStats {
        self.shared().stats()
    }

    /// Submission handle that does not keep the processor alive.
    pub fn sender(&self) -> CommandSender<Cmd> {
        CommandSender::new(Arc::clone(&self.owner.shared))
    }

    // --- submission ---

    pub fn send(&self, command: Cmd) -> Result<CommandHandle, ProcessorError> {
        self.shared().submit(command, SendOptions::default(), None)
    }

    pub fn send_with(
        &self,
        command: Cmd,
        options: SendOptions,
    ) -> Result<CommandHandle, ProcessorError> {
        self.shared().submit(command, options, None)
    }

    pub fn request(&self, command: Cmd) -> Result<Pending<Cmd::Output>, ProcessorError> {
        self.sender().request(command)
    }

    pub fn request_with(
        &self,
        command: Cmd,
        options: SendOptions,
    ) -> Result<Pending<Cmd::Output>, ProcessorError> {
        self.sender().request_with(command, options)
    }

    // --- callbacks ---

    /// Replace the success callback. Rejected while running or while a stop drains.
    pub fn on_result<F>(&self, callback: F) -> Result<(), ProcessorError>
    where
        F: Fn(&CommandHandle, Cmd::Output) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.shared()
            .configure(|cb| cb.on_result = Some(Arc::new(callback)))
    }

    /// Replace the failure callback. Rejected while running or while a stop drains.
    pub fn on_error<F>(&self, callback: F) -> Result<(), ProcessorError>
    where
        F: Fn(&CommandHandle, CommandError) + Send + Sync + 'static,
    {
        self.shared()
            .configure(|cb| cb.on_error = Some(Arc::new(callback)))
    }

    /// Remove both callbacks. Rejected while running.
    pub fn clear_callbacks(&self) -> Result<(), ProcessorError> {
        self.shared().configure(|cb| *cb = Default::default())
    }

    // --- lifecycle ---

    pub fn start(&self) -> Result<(), ProcessorError> {
        self.shared().start()
    }

    /// Stop dequeuing after the current command. No-op unless running.
    pub fn pause(&self) -> Result<(), ProcessorError> {
        self.shared().pause()
    }

    /// Wait until every command submitted so far has been processed.
    /// Never resolves while the processor is paused with work queued.
    pub async fn join(&self) {
        self.shared().queue.join().await;
    }

    /// Drain the queue, then stop the worker and wait for it.
    ///
    /// Commands already queued still run (even if paused); new sends fail
    /// with `Halted`. Returns the error that stopped the worker early, once;
    /// later calls return `Ok`.
    pub async fn halt(&self) -> Result<(), ProcessorError> {
        self.shared().request_stop(StopMode::Drain);
        self.reap().await
    }

    /// Ask the worker to drain and stop without waiting.
    pub fn request_halt(&self) {
        self.shared().request_stop(StopMode::Drain);
    }

    /// Stop at the next dequeue, discarding everything still queued. The
    /// command in flight, if any, completes normally.
    pub async fn cancel(&self) -> Result<(), ProcessorError> {
        self.shared().request_stop(StopMode::Abort);
        self.reap().await
    }

    async fn reap(&self) -> Result<(), ProcessorError> {
        let worker = self.owner.worker.lock().take();
        match worker {
            Some(worker) => worker.wait(self.name()).await,
            None => {
                self.shared().wait_exited().await;
                Ok(())
            }
        }
    }

    /// Run `f` with this processor, then halt it, also when `f` panics.
    ///
    /// ```ignore
    /// let frames = panel.scope(|panel| async move {
    ///     panel.start()?;
    ///     panel.send(PanelCmd::Init)?;
    ///     panel.join().await;
    ///     Ok::<_, ProcessorError>(3)
    /// }).await??;
    /// ```
    pub async fn scope<F, Fut, T>(self, f: F) -> Result<T, ProcessorError>
    where
        F: FnOnce(Processor<Cmd>) -> Fut,
        Fut: Future<Output = T>,
    {
        let outcome = AssertUnwindSafe(f(self.clone())).catch_unwind().await;
        let halted = self.halt().await;
        match outcome {
            Ok(value) => halted.map(|()| value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl<Cmd: Command> std::fmt::Debug for Processor<Cmd> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
