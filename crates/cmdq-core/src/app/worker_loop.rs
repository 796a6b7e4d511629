//! The single consumer behind every processor.
//!
//! # Flow
//! 1. wait until the processor drains (running, or a stop is pending)
//! 2. `queue.get()`, raced against the gate closing again
//! 3. control entry -> exit
//! 4. execute -> reply or `on_result` -> `on_error` / escalate
//! 5. `task_done` (drop guard, so panics and early returns count too)
//!
//! On exit, whatever is still queued is discarded and the callbacks are
//! released.
//!
//! 注意: callbacks は lock の外で呼ぶ（snapshot を clone してから実行）

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::shared::{Job, Shared, Slot};
use crate::command::Command;
use crate::error::{CommandError, Panicked, panic_message};
use crate::queue::PriorityQueue;

pub(crate) struct Worker<Cmd: Command> {
    shared: Arc<Shared<Cmd>>,
    context: Cmd::Context,
}

impl<Cmd: Command> Worker<Cmd> {
    pub(crate) fn new(shared: Arc<Shared<Cmd>>, context: Cmd::Context) -> Self {
        Self { shared, context }
    }

    /// Returns the failure that stopped the worker, if it was not a requested stop.
    pub(crate) async fn run(mut self) -> Result<(), CommandError> {
        let shared = Arc::clone(&self.shared);
        let _exit = ExitGuard(Arc::clone(&shared));
        let mut lifecycle = shared.lifecycle.subscribe();

        info!(processor = %shared.name, id = %shared.id, "worker started");

        loop {
            if lifecycle.wait_for(|l| l.drains()).await.is_err() {
                return Ok(());
            }

            // pause must be able to interrupt a blocked get()
            let entry = tokio::select! {
                biased;
                alive = lifecycle.wait_for(|l| !l.drains()).map(|r| r.is_ok()) => {
                    if !alive {
                        return Ok(());
                    }
                    continue;
                }
                entry = shared.queue.get() => entry,
            };
            let _done = TaskDone(&shared.queue);

            match entry.item {
                Slot::Stop(mode) => {
                    debug!(processor = %shared.name, ?mode, "stop entry reached");
                    return Ok(());
                }
                Slot::Job(job) => self.process(job).await?,
            }
        }
    }

    async fn process(&mut self, job: Job<Cmd>) -> Result<(), CommandError> {
        let Job {
            handle,
            command,
            reply,
        } = job;
        let shared = &self.shared;

        debug!(
            processor = %shared.name,
            handle = %handle.id(),
            command = handle.command(),
            priority = handle.priority(),
            sequence = handle.sequence(),
            "executing"
        );

        let result = AssertUnwindSafe(command.execute(&handle, &mut self.context))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(CommandError::execution(Panicked(panic_message(panic.as_ref()))))
            });

        // requests get the outcome directly; callbacks are for fire-and-forget sends
        if let Some(reply) = reply {
            shared.stats.record(&result);
            if reply.send(result).is_err() {
                debug!(processor = %shared.name, handle = %handle.id(), "requester went away");
            }
            return Ok(());
        }

        // snapshot so no lock is held while user code runs
        let callbacks = shared.callbacks.lock().clone();

        let error = match result {
            Ok(output) => {
                let Some(on_result) = callbacks.on_result else {
                    shared.stats.succeeded();
                    return Ok(());
                };
                match std::panic::catch_unwind(AssertUnwindSafe(|| on_result(&handle, output))) {
                    Ok(Ok(())) => {
                        shared.stats.succeeded();
                        return Ok(());
                    }
                    Ok(Err(cause)) => CommandError::ResultCallback(cause),
                    Err(panic) => {
                        CommandError::ResultCallback(Box::new(Panicked(panic_message(panic.as_ref()))))
                    }
                }
            }
            Err(error) => error,
        };
        shared.stats.failed();

        let Some(on_error) = callbacks.on_error else {
            error!(
                processor = %shared.name,
                handle = %handle.id(),
                command = handle.command(),
                kind = error.kind(),
                error = %error,
                "unhandled command failure, stopping worker"
            );
            return Err(error);
        };

        debug!(
            processor = %shared.name,
            handle = %handle.id(),
            kind = error.kind(),
            "dispatching failure to on_error"
        );
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| on_error(&handle, error))) {
            let message = panic_message(panic.as_ref());
            error!(
                processor = %shared.name,
                handle = %handle.id(),
                panic = %message,
                "on_error panicked, stopping worker"
            );
            return Err(CommandError::ErrorCallback(message));
        }
        Ok(())
    }
}

struct TaskDone<'a, T>(&'a PriorityQueue<T>);

impl<T> Drop for TaskDone<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.0.task_done() {
            warn!(error = %e, "task_done bookkeeping out of sync");
        }
    }
}

/// Final bookkeeping, also run when the worker unwinds.
struct ExitGuard<Cmd: Command>(Arc<Shared<Cmd>>);

impl<Cmd: Command> Drop for ExitGuard<Cmd> {
    fn drop(&mut self) {
        let shared = &self.0;

        // after this no stop entry can be pushed
        shared.lifecycle.send_modify(|l| {
            l.state = crate::domain::ProcessorState::Halted;
            l.worker_exited = true;
        });
        shared.queue.close();

        let mut discarded = 0u64;
        for entry in shared.queue.drain() {
            if let Slot::Job(job) = entry.item {
                debug!(
                    processor = %shared.name,
                    handle = %job.handle.id(),
                    command = job.handle.command(),
                    "discarding"
                );
                discarded += 1;
            }
            if let Err(e) = shared.queue.task_done() {
                warn!(processor = %shared.name, error = %e, "task_done bookkeeping out of sync");
            }
        }
        if discarded > 0 {
            warn!(processor = %shared.name, discarded, "pending commands discarded");
            shared.stats.discarded(discarded);
        }

        // callbacks may hold senders to this processor
        *shared.callbacks.lock() = Default::default();
        shared.exited.send_replace(true);

        info!(processor = %shared.name, "worker stopped");
    }
}
