//! cmdq-core
//!
//! Priority command queues, each drained by one worker that owns a resource.
//!
//! A [`Processor`] accepts commands from any thread without blocking, runs
//! them one at a time in `(priority, submission order)` order against its
//! context, and reports each outcome to `on_result` / `on_error` or back to
//! the requester. Processors can feed each other (`Pending::and_then`), so a
//! slow producer and a blocking device each get their own worker.
//!
//! # Modules
//! - **domain**: ids, handles, tags, lifecycle state
//! - **queue**: in-memory priority queue with unfinished-work tracking
//! - **command**: the `Command` trait
//! - **registry**: name -> handler lookup for runtime-named commands
//! - **app**: processor, sender, builder, worker loop, pool
//! - **observability**: stats snapshots
//! - **error**: command and processor errors

pub mod app;
pub mod command;
pub mod domain;
pub mod error;
pub mod observability;
pub mod queue;
pub mod registry;

pub use app::{
    BuildError, CommandSender, Pending, Processor, ProcessorBuilder, ProcessorConfig, SendOptions,
    WorkerKind, WorkerPool,
};
pub use command::Command;
pub use domain::{CommandHandle, DEFAULT_PRIORITY, ProcessorState, Tags};
pub use error::{BoxError, CommandError, ProcessorError};
pub use observability::ProcessorStats;
