use thiserror::Error;

use crate::process::Process;

/// Domain error taxonomy for the runtime.
///
/// The first four variants are raised by the runtime itself at well-defined
/// points (a failed downcast, a scope ending, a linked peer dying, a
/// cooperative stop request); the remaining two are infrastructure failures
/// a caller can hit while driving the API.
#[derive(Error, Debug, Clone)]
pub enum WispError {
    /// A received envelope's runtime type did not match what the caller
    /// expected (e.g. a query reply that decoded to the wrong type).
    #[error("could not cast message to the expected type")]
    CouldNotCastDynamic,

    /// Injected into a scoped child when the parent scope that owns it
    /// (`with_process`) exits.
    #[error("the scope that owned this process ended")]
    DependentActionEnded,

    /// Delivered to a linked peer when `who` dies.
    #[error("linked process died: {who}")]
    LinkedProcessDied {
        who: Process,
        error: Option<Box<WispError>>,
    },

    /// Cooperative stop request delivered as a message, not an exception.
    #[error("process was asked to stop")]
    Stopped,

    /// The target process is no longer in the registry.
    #[error("process not found")]
    ProcessNotFound,

    /// The mailbox's owning process has already terminated.
    #[error("mailbox closed")]
    MailboxClosed,
}

impl WispError {
    /// Whether a process body that surfaces this error should be treated
    /// as having failed "for a reason the caller can reasonably retry", as
    /// opposed to a logic error. For application-level retry/supervision
    /// policy; the runtime itself never consults this.
    pub fn recoverable(&self) -> bool {
        matches!(self, WispError::ProcessNotFound | WispError::Stopped)
    }
}
