use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::pending::Pending;
use super::shared::Shared;
use crate::command::Command;
use crate::domain::{CommandHandle, Tags};
use crate::error::ProcessorError;

/// Per-submission options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub priority: Option<i32>,
    pub tags: Tags,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Same priority and tags as an earlier submission.
    pub fn follow(handle: &CommandHandle) -> Self {
        Self {
            priority: Some(handle.priority()),
            tags: handle.tags().clone(),
        }
    }
}

/// Cloneable submission side of a processor.
///
/// Does not keep the processor alive: once every `Processor` clone is gone
/// the worker drains and exits, and further sends fail with `Halted`.
/// Safe to move into callbacks of other processors.
pub struct CommandSender<Cmd: Command> {
    shared: Arc<Shared<Cmd>>,
}

impl<Cmd: Command> CommandSender<Cmd> {
    pub(crate) fn new(shared: Arc<Shared<Cmd>>) -> Self {
        Self { shared }
    }

    /// Name of the target processor.
    pub fn processor(&self) -> &str {
        &self.shared.name
    }

    /// Enqueue with the processor's default priority and no tags.
    /// Never blocks; the outcome goes to the processor's callbacks.
    pub fn send(&self, command: Cmd) -> Result<CommandHandle, ProcessorError> {
        self.send_with(command, SendOptions::default())
    }

    pub fn send_with(
        &self,
        command: Cmd,
        options: SendOptions,
    ) -> Result<CommandHandle, ProcessorError> {
        self.shared.submit(command, options, None)
    }

    /// Enqueue and get the outcome back instead of going through callbacks.
    pub fn request(&self, command: Cmd) -> Result<Pending<Cmd::Output>, ProcessorError> {
        self.request_with(command, SendOptions::default())
    }

    pub fn request_with(
        &self,
        command: Cmd,
        options: SendOptions,
    ) -> Result<Pending<Cmd::Output>, ProcessorError> {
        let (tx, rx) = oneshot::channel();
        let handle = self.shared.submit(command, options, Some(tx))?;
        Ok(Pending::new(handle, rx))
    }

    /// True once the processor no longer accepts commands.
    pub fn is_closed(&self) -> bool {
        self.shared.queue.is_closed()
    }
}

impl<Cmd: Command> Clone for CommandSender<Cmd> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<Cmd: Command> fmt::Debug for CommandSender<Cmd> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("processor", &self.shared.name)
            .finish()
    }
}
