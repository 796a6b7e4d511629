//! Awaitable outcome of a submitted command, and chaining across processors.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::sender::{CommandSender, SendOptions};
use crate::command::Command;
use crate::domain::CommandHandle;
use crate::error::{CommandError, ProcessorError};

/// Outcome of a command submitted with `request`.
///
/// Resolves to `Err(CommandError::Discarded)` if the entry never ran
/// (cancelled, or the worker stopped first).
///
/// ```ignore
/// let frame = render.request(Render::Frame(3))?
///     .and_then(&panel, PanelCmd::Display)
///     .await?
///     .await?;
/// ```
#[derive(Debug)]
pub struct Pending<O> {
    handle: CommandHandle,
    rx: oneshot::Receiver<Result<O, CommandError>>,
}

impl<O> Pending<O> {
    pub(crate) fn new(handle: CommandHandle, rx: oneshot::Receiver<Result<O, CommandError>>) -> Self {
        Self { handle, rx }
    }

    pub fn handle(&self) -> &CommandHandle {
        &self.handle
    }

    /// Wait for this command, then feed its output into a command for
    /// another processor. The follow-up inherits priority and tags.
    ///
    /// A failure of this step stops the chain and comes back as
    /// `ProcessorError::Command`.
    pub async fn and_then<N, F>(
        self,
        next: &CommandSender<N>,
        f: F,
    ) -> Result<Pending<N::Output>, ProcessorError>
    where
        N: Command,
        F: FnOnce(O) -> N,
    {
        let options = SendOptions::follow(&self.handle);
        let output = self.await?;
        next.request_with(f(output), options)
    }

    /// Like [`Pending::and_then`], but the follow-up is a plain send whose
    /// outcome goes to the next processor's callbacks.
    pub async fn and_send<N, F>(
        self,
        next: &CommandSender<N>,
        f: F,
    ) -> Result<CommandHandle, ProcessorError>
    where
        N: Command,
        F: FnOnce(O) -> N,
    {
        let options = SendOptions::follow(&self.handle);
        let output = self.await?;
        next.send_with(f(output), options)
    }
}

impl<O> Future for Pending<O> {
    type Output = Result<O, CommandError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CommandError::Discarded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tags;

    fn handle() -> CommandHandle {
        CommandHandle::new("test", "noop", 50, 1, Tags::new())
    }

    #[tokio::test]
    async fn resolves_to_the_sent_outcome() {
        let (tx, rx) = oneshot::channel();
        let pending = Pending::new(handle(), rx);

        tx.send(Ok(42)).unwrap();
        assert_eq!(pending.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn dropped_reply_means_discarded() {
        let (tx, rx) = oneshot::channel::<Result<u8, CommandError>>();
        let pending = Pending::new(handle(), rx);

        drop(tx);
        assert!(matches!(pending.await, Err(CommandError::Discarded)));
    }
}
