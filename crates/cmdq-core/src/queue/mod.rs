//! Queue module: entry ordering and the in-memory priority queue.

mod entry;
mod memory;

pub use entry::QueueEntry;
pub use memory::PriorityQueue;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("task_done called more times than entries were put")]
    TaskDoneUnderflow,
}
