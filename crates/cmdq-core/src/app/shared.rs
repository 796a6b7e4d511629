//! State shared between a processor's owners, its senders and its worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::debug;

use super::sender::SendOptions;
use crate::command::Command;
use crate::domain::{CommandHandle, ProcessorId, ProcessorState, StopMode};
use crate::error::{BoxError, CommandError, ProcessorError};
use crate::observability::{ProcessorStats, StatsCounters};
use crate::queue::{PriorityQueue, QueueEntry};

/// Success notification: `(handle, output)`. An `Err` is reported to
/// `on_error` as `CommandError::ResultCallback`.
pub type ResultCallback<O> = Arc<dyn Fn(&CommandHandle, O) -> Result<(), BoxError> + Send + Sync>;

/// Failure notification: `(handle, classified error)`.
pub type ErrorCallback = Arc<dyn Fn(&CommandHandle, CommandError) + Send + Sync>;

pub(crate) struct Callbacks<O> {
    pub(crate) on_result: Option<ResultCallback<O>>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl<O> Default for Callbacks<O> {
    fn default() -> Self {
        Self {
            on_result: None,
            on_error: None,
        }
    }
}

impl<O> Clone for Callbacks<O> {
    fn clone(&self) -> Self {
        Self {
            on_result: self.on_result.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

pub(crate) type Reply<O> = oneshot::Sender<Result<O, CommandError>>;

pub(crate) struct Job<Cmd: Command> {
    pub(crate) handle: CommandHandle,
    pub(crate) command: Cmd,
    pub(crate) reply: Option<Reply<Cmd::Output>>,
}

/// What the queue carries: real work, or the control entry that ends the loop.
pub(crate) enum Slot<Cmd: Command> {
    Job(Job<Cmd>),
    Stop(StopMode),
}

/// Running flag plus stop bookkeeping, published through a watch channel so
/// the worker can wait on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lifecycle {
    pub(crate) state: ProcessorState,
    pub(crate) stop: Option<StopMode>,
    pub(crate) worker_exited: bool,
}

impl Lifecycle {
    /// Whether the worker may dequeue. A pending stop overrides pause so a
    /// halting processor still drains.
    pub(crate) fn drains(&self) -> bool {
        self.state == ProcessorState::Running || self.stop.is_some()
    }
}

pub(crate) struct Shared<Cmd: Command> {
    pub(crate) id: ProcessorId,
    pub(crate) name: String,
    pub(crate) default_priority: i32,
    pub(crate) queue: PriorityQueue<Slot<Cmd>>,
    pub(crate) lifecycle: watch::Sender<Lifecycle>,
    pub(crate) callbacks: Mutex<Callbacks<Cmd::Output>>,
    pub(crate) stats: StatsCounters,
    pub(crate) exited: watch::Sender<bool>,
    // 0 is reserved for the abort entry
    next_sequence: AtomicU64,
}

impl<Cmd: Command> Shared<Cmd> {
    pub(crate) fn new(name: String, default_priority: i32, callbacks: Callbacks<Cmd::Output>) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle {
            state: ProcessorState::Idle,
            stop: None,
            worker_exited: false,
        });
        let (exited, _) = watch::channel(false);
        Self {
            id: ProcessorId::generate(),
            name,
            default_priority,
            queue: PriorityQueue::new(),
            lifecycle,
            callbacks: Mutex::new(callbacks),
            stats: StatsCounters::default(),
            exited,
            next_sequence: AtomicU64::new(1),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn state(&self) -> ProcessorState {
        self.lifecycle.borrow().state
    }

    pub(crate) fn halted(&self) -> ProcessorError {
        ProcessorError::Halted(self.name.clone())
    }

    pub(crate) fn submit(
        &self,
        command: Cmd,
        options: SendOptions,
        reply: Option<Reply<Cmd::Output>>,
    ) -> Result<CommandHandle, ProcessorError> {
        let priority = options.priority.unwrap_or(self.default_priority);
        let sequence = self.next_sequence();
        let handle = CommandHandle::new(&self.name, command.name(), priority, sequence, options.tags);

        let job = Job {
            handle: handle.clone(),
            command,
            reply,
        };
        self.queue
            .put(QueueEntry::new(priority, sequence, Slot::Job(job)))
            .map_err(|_| self.halted())?;

        debug!(
            processor = %self.name,
            handle = %handle.id(),
            command = handle.command(),
            priority,
            sequence,
            "command queued"
        );
        Ok(handle)
    }

    pub(crate) fn start(&self) -> Result<(), ProcessorError> {
        let mut halted = false;
        self.lifecycle.send_if_modified(|l| match l.state {
            ProcessorState::Halted => {
                halted = true;
                false
            }
            ProcessorState::Running => false,
            ProcessorState::Idle | ProcessorState::Paused => {
                l.state = ProcessorState::Running;
                true
            }
        });
        if halted {
            return Err(self.halted());
        }
        debug!(processor = %self.name, "started");
        Ok(())
    }

    pub(crate) fn pause(&self) -> Result<(), ProcessorError> {
        let mut halted = false;
        self.lifecycle.send_if_modified(|l| match l.state {
            ProcessorState::Halted => {
                halted = true;
                false
            }
            ProcessorState::Running => {
                l.state = ProcessorState::Paused;
                true
            }
            ProcessorState::Idle | ProcessorState::Paused => false,
        });
        if halted {
            return Err(self.halted());
        }
        debug!(processor = %self.name, "paused");
        Ok(())
    }

    /// Record a stop request and enqueue its control entry.
    ///
    /// Drain goes behind everything already queued `(i32::MAX, next seq)`;
    /// abort jumps the queue `(i32::MIN, 0)`. A drain can be upgraded to an
    /// abort, nothing else is repeated. The entry is pushed under the
    /// lifecycle lock so it can never land in the queue of an exited worker.
    pub(crate) fn request_stop(&self, mode: StopMode) {
        self.lifecycle.send_if_modified(|l| {
            if l.worker_exited {
                return false;
            }
            let upgrade = match (l.stop, mode) {
                (None, _) => true,
                (Some(StopMode::Drain), StopMode::Abort) => true,
                _ => false,
            };
            if !upgrade {
                return false;
            }
            l.stop = Some(mode);
            l.state = ProcessorState::Halted;

            let entry = match mode {
                StopMode::Drain => QueueEntry::new(i32::MAX, self.next_sequence(), Slot::Stop(mode)),
                StopMode::Abort => QueueEntry::new(i32::MIN, 0, Slot::Stop(mode)),
            };
            self.queue.close_with(entry);
            debug!(processor = %self.name, ?mode, "stop requested");
            true
        });
    }

    pub(crate) fn configure(
        &self,
        update: impl FnOnce(&mut Callbacks<Cmd::Output>),
    ) -> Result<(), ProcessorError> {
        let lifecycle = *self.lifecycle.borrow();
        // a halting worker is still dispatching until it exits
        let draining = lifecycle.stop.is_some() && !lifecycle.worker_exited;
        if draining || !lifecycle.state.accepts_configuration() {
            return Err(ProcessorError::ConfigureWhileRunning(self.name.clone()));
        }
        update(&mut self.callbacks.lock());
        Ok(())
    }

    pub(crate) fn stats(&self) -> ProcessorStats {
        self.stats.snapshot(
            self.state(),
            self.queue.len(),
            self.queue.unfinished(),
        )
    }

    pub(crate) async fn wait_exited(&self) {
        let mut rx = self.exited.subscribe();
        let _ = rx.wait_for(|exited| *exited).await;
    }
}
