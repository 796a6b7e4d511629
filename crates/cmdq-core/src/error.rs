use std::any::Any;

use thiserror::Error;

/// Boxed cause carried by execution and callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified failure of one command.
///
/// Everything that goes wrong between dequeue and notification ends up as one
/// of these; it is what `on_error` receives.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command's own logic failed.
    #[error("command execution failed: {0}")]
    Execution(#[source] BoxError),

    /// No handler exists for the command name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command succeeded but `on_result` failed.
    #[error("result callback failed: {0}")]
    ResultCallback(#[source] BoxError),

    /// `on_error` panicked while handling another failure.
    #[error("error callback panicked: {0}")]
    ErrorCallback(String),

    /// The command got a payload shape it cannot operate on.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The entry was dropped by `cancel` (or a failed worker) before running.
    #[error("command was discarded before execution")]
    Discarded,
}

impl CommandError {
    pub fn execution(cause: impl Into<BoxError>) -> Self {
        CommandError::Execution(cause.into())
    }

    pub fn invalid_data(reason: impl std::fmt::Display) -> Self {
        CommandError::InvalidData(reason.to_string())
    }

    /// Short classification, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Execution(_) => "execution",
            CommandError::UnknownCommand(_) => "unknown_command",
            CommandError::ResultCallback(_) => "result_callback",
            CommandError::ErrorCallback(_) => "error_callback",
            CommandError::InvalidData(_) => "invalid_data",
            CommandError::Discarded => "discarded",
        }
    }
}

/// Errors from the processor's own API (as opposed to a command's outcome).
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("cannot configure callbacks while processor `{0}` is running")]
    ConfigureWhileRunning(String),

    #[error("processor `{0}` has been halted")]
    Halted(String),

    /// The worker stopped because a failure had no `on_error` to go to.
    #[error("worker of processor `{processor}` stopped on an unhandled error: {source}")]
    Worker {
        processor: String,
        #[source]
        source: CommandError,
    },

    #[error("worker of processor `{0}` panicked")]
    WorkerPanicked(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug, Error)]
#[error("panicked: {0}")]
pub(crate) struct Panicked(pub(crate) String);
