//! Type-erased mailbox payloads and the signal envelopes the runtime itself
//! injects.

use std::any::Any;
use std::fmt;

use crate::error::WispError;
use crate::process::Process;

/// A single mailbox slot. Preserves the original value's concrete type so
/// `receive_match`/`dispatch` can attempt a downcast without losing the
/// message when the downcast fails (it is handed back to the caller so it
/// can be buffered and restored in order, per the selective-receive
/// contract).
pub struct Envelope {
    inner: Box<dyn Any + Send>,
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope(..)")
    }
}

impl Envelope {
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Envelope {
            inner: Box::new(value),
        }
    }

    /// Attempt to recover the original typed value. On mismatch the
    /// envelope is handed back unchanged so the caller can keep it in the
    /// mailbox.
    pub fn downcast<T: Send + 'static>(self) -> Result<T, Envelope> {
        match self.inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(Envelope { inner }),
        }
    }

    pub fn is<T: Send + 'static>(&self) -> bool {
        self.inner.is::<T>()
    }
}

/// Cooperative stop request. Delivered as an ordinary message — the target
/// only reacts to it if its body explicitly `receive`s a `Stop`.
#[derive(Debug, Clone)]
pub struct Stop {
    pub from: Process,
}

/// Monitor notification, enqueued directly into the monitor's mailbox at
/// the monitored process's death.
#[derive(Debug, Clone)]
pub struct Died {
    pub who: Process,
    pub error: Option<WispError>,
}

/// A request or reply tagged with the sender's identity, so a single
/// mailbox can demultiplex concurrent outstanding queries.
///
/// The payload stays type-erased behind its own `Envelope` rather than
/// being a generic field: that lets a caller match on `from` first and
/// only then attempt the payload downcast, so "right sender, wrong
/// payload shape" can be reported as a decode failure instead of being
/// indistinguishable from "not a match" and skipped forever.
pub struct Tagged {
    pub from: Process,
    payload: Envelope,
}

impl Tagged {
    pub fn new<T: Send + 'static>(from: Process, payload: T) -> Self {
        Tagged {
            from,
            payload: Envelope::new(payload),
        }
    }

    /// Attempt to downcast the payload to `T`, returning the sender
    /// alongside it. On mismatch, hands back `self` unchanged (sender
    /// included) so the caller can re-wrap it and keep looking.
    pub fn downcast<T: Send + 'static>(self) -> Result<(Process, T), Tagged> {
        let from = self.from.clone();
        match self.payload.downcast::<T>() {
            Ok(value) => Ok((from, value)),
            Err(payload) => Err(Tagged { from, payload }),
        }
    }
}
