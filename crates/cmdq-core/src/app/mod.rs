//! App - processors and their workers
//!
//! # Components
//! - **Processor**: owner handle (lifecycle, callbacks, stats)
//! - **CommandSender**: cloneable submission handle
//! - **Pending**: awaitable outcome, `and_then` chaining
//! - **ProcessorBuilder**: wiring + fail-fast `BuildError`
//! - **WorkerPool**: shared cap on thread workers
//! - **worker_loop**: the single consumer

pub mod builder;
pub mod config;
pub mod pending;
pub mod pool;
pub mod processor;
pub mod sender;
mod shared;
mod worker_loop;


pub use self::builder::{BuildError, ProcessorBuilder};
pub use self::config::{ProcessorConfig, WorkerKind};
pub use self::pending::Pending;
pub use self::pool::WorkerPool;
pub use self::processor::Processor;
pub use self::sender::{CommandSender, SendOptions};
pub use self::shared::{ErrorCallback, ResultCallback};
