//! The unbounded, selectively-receivable FIFO queue backing a [`Process`](crate::process::Process).
//!
//! Push is lock-and-append; selective receive (`try_take_match`) scans the
//! queue front-to-back, and on a miss restores every skipped message to the
//! front in its original relative order.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::message::Envelope;

pub struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Append a message and wake one suspended receiver, if any.
    pub fn push_back(&self, envelope: Envelope) {
        self.queue.lock().unwrap().push_back(envelope);
        self.notify.notify_one();
    }

    /// General scan-and-restore primitive. `attempt` is offered each
    /// message front-to-back; `Ok(())` consumes it (scan stops there),
    /// `Err(envelope)` hands it back to be buffered. Every buffered
    /// message is restored to the front of the queue in its original
    /// relative order once the scan ends, whether or not it found a match.
    /// `receive_match` and `dispatch` are both built on this.
    pub fn try_take_handled<F>(&self, mut attempt: F) -> bool
    where
        F: FnMut(Envelope) -> Result<(), Envelope>,
    {
        let mut queue = self.queue.lock().unwrap();
        let mut skipped: VecDeque<Envelope> = VecDeque::new();
        let mut handled = false;
        while let Some(envelope) = queue.pop_front() {
            match attempt(envelope) {
                Ok(()) => {
                    handled = true;
                    break;
                }
                Err(envelope) => skipped.push_back(envelope),
            }
        }
        while let Some(envelope) = skipped.pop_back() {
            queue.push_front(envelope);
        }
        handled
    }

    /// Scan for the first message that downcasts to `T` and satisfies
    /// `pred`. Every message examined and skipped along the way is
    /// restored to the front of the queue, in its original order, whether
    /// or not a match is ultimately found.
    pub fn try_take_match<T, F>(&self, mut pred: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool,
    {
        let mut found: Option<T> = None;
        self.try_take_handled(|envelope| match envelope.downcast::<T>() {
            Ok(value) => {
                if pred(&value) {
                    found = Some(value);
                    Ok(())
                } else {
                    Err(Envelope::new(value))
                }
            }
            Err(envelope) => Err(envelope),
        });
        found
    }

    /// A future that resolves the next time a message is pushed or `wake`
    /// is called directly (used to deliver an asynchronous exception with
    /// no message). Callers must obtain this *before* re-checking their
    /// wait condition, not after — creating it first is what makes a
    /// concurrent push/wake that happens between the check and the
    /// `.await` impossible to miss; creating it only once already inside
    /// the `.await` reopens exactly that race.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    pub fn wake(&self) {
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
