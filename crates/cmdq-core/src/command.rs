//! Command execution contract.
//!
//! A processor is generic over one command type. The idiomatic shape is an
//! enum with one variant per operation, so "which operations exist" is checked
//! by the compiler instead of a runtime lookup table:
//!
//! ```ignore
//! enum PanelCmd { Init, Clear, Display(Vec<u8>), Sleep }
//!
//! #[async_trait]
//! impl Command for PanelCmd {
//!     type Context = Panel;
//!     type Output = ();
//!
//!     fn name(&self) -> &str { ... }
//!
//!     async fn execute(self, _h: &CommandHandle, panel: &mut Panel) -> Result<(), CommandError> {
//!         match self {
//!             PanelCmd::Init => panel.init(),
//!             ...
//!         }
//!     }
//! }
//! ```
//!
//! When names only arrive at runtime, use [`crate::registry::Invocation`],
//! which reports unregistered names as `CommandError::UnknownCommand`.

use async_trait::async_trait;

use crate::domain::CommandHandle;
use crate::error::CommandError;

#[async_trait]
pub trait Command: Send + 'static {
    /// Resource owned by the processor's worker and lent to each execution.
    type Context: Send + 'static;

    /// Success value handed to `on_result` or to a pending request.
    type Output: Send + 'static;

    /// Name recorded on the handle and in logs.
    fn name(&self) -> &str;

    /// Run the command. Only the worker calls this, one command at a time.
    async fn execute(
        self,
        handle: &CommandHandle,
        cx: &mut Self::Context,
    ) -> Result<Self::Output, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tags;

    enum Counter {
        Add(u32),
        Fail,
    }

    #[async_trait]
    impl Command for Counter {
        type Context = u32;
        type Output = u32;

        fn name(&self) -> &str {
            match self {
                Counter::Add(_) => "add",
                Counter::Fail => "fail",
            }
        }

        async fn execute(self, _handle: &CommandHandle, cx: &mut u32) -> Result<u32, CommandError> {
            match self {
                Counter::Add(n) => {
                    *cx += n;
                    Ok(*cx)
                }
                Counter::Fail => Err(CommandError::execution("nope")),
            }
        }
    }

    #[tokio::test]
    async fn execute_mutates_the_context() {
        let handle = CommandHandle::new("test", "add", 50, 1, Tags::new());
        let mut total = 1;

        assert_eq!(Counter::Add(2).execute(&handle, &mut total).await.unwrap(), 3);
        assert_eq!(Counter::Add(4).execute(&handle, &mut total).await.unwrap(), 7);
        assert!(matches!(
            Counter::Fail.execute(&handle, &mut total).await,
            Err(CommandError::Execution(_))
        ));
        assert_eq!(total, 7);
    }
}
