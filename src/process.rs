//! The `Process` handle: mailbox + link set + monitor set + terminal status.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::WispError;
use crate::mailbox::Mailbox;
use crate::message::{Died, Envelope};
use crate::registry;

/// A terminal outcome: `None` is a normal exit, `Some(e)` an error exit.
pub type Outcome = Option<WispError>;

struct Shared {
    links: HashSet<Process>,
    monitors: HashSet<Process>,
    /// `None` while running; filled exactly once at death.
    status: Option<Outcome>,
}

struct Inner {
    id: u64,
    mailbox: Mailbox,
    shared: Mutex<Shared>,
    status_notify: Notify,
    /// Emulates asynchronous exception delivery on a host with no real
    /// task-cancellation primitive: every suspension point checks this
    /// slot before and while it waits.
    pending_exception: Mutex<Option<WispError>>,
}

/// A handle to a process. Cheap to clone; equality, ordering and hashing
/// are defined solely by the underlying activity id.
#[derive(Clone)]
pub struct Process {
    inner: std::sync::Arc<Inner>,
}

impl Process {
    /// Construct a process bound to `id` with empty link/monitor sets and
    /// an empty status. Used both by the lazy "current process" lookup and
    /// by `start_process` once it has allocated an id for a freshly-spawned
    /// activity.
    pub(crate) fn new_bare(id: u64) -> Self {
        Process {
            inner: std::sync::Arc::new(Inner {
                id,
                mailbox: Mailbox::new(),
                shared: Mutex::new(Shared {
                    links: HashSet::new(),
                    monitors: HashSet::new(),
                    status: None,
                }),
                status_notify: Notify::new(),
                pending_exception: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Current process: the one bound to the calling task, lazily created
    /// on first use.
    pub fn current() -> Self {
        registry::current()
    }

    // -- messaging ---------------------------------------------------

    /// Send never fails and never blocks. Delivery to a dead process is
    /// silently discarded.
    pub fn send<T: Send + 'static>(&self, msg: T) {
        let alive = { self.inner.shared.lock().unwrap().status.is_none() };
        if !alive {
            log::trace!("send to dead process {} discarded", self.id());
            return;
        }
        self.inner.mailbox.push_back(Envelope::new(msg));
    }

    pub(crate) fn raise_exception(&self, err: WispError) {
        *self.inner.pending_exception.lock().unwrap() = Some(err);
        self.inner.mailbox.wake();
        self.inner.status_notify.notify_waiters();
    }

    pub(crate) fn take_pending_exception(&self) -> Option<WispError> {
        self.inner.pending_exception.lock().unwrap().take()
    }

    /// Selective receive: the core primitive behind `receive`/`dispatch`.
    /// Blocks until a message of type `T` satisfying `pred` arrives, or
    /// until an asynchronously-delivered link exception surfaces.
    pub async fn receive_match<T, F>(&self, mut pred: F) -> Result<T, WispError>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send,
    {
        loop {
            let notified = self.inner.mailbox.notified();
            if let Some(err) = self.take_pending_exception() {
                return Err(err);
            }
            if let Some(value) = self.inner.mailbox.try_take_match(&mut pred) {
                return Ok(value);
            }
            notified.await;
        }
    }

    pub async fn receive<T: Send + 'static>(&self) -> Result<T, WispError> {
        self.receive_match(|_| true).await
    }

    /// Raw mailbox access for `dispatch`'s multi-handler scan, which needs
    /// the untyped scan-and-restore primitive rather than a single-type
    /// downcast.
    pub(crate) fn mailbox(&self) -> &Mailbox {
        &self.inner.mailbox
    }

    // -- link / monitor -------------------------------------------------

    /// Atomically either registers `observer` in this process's link set
    /// (if still running), or returns the stored terminal status so the
    /// caller can deliver `LinkedProcessDied` itself.
    fn register_link_or_status(&self, observer: Process) -> Option<Outcome> {
        let mut shared = self.inner.shared.lock().unwrap();
        match &shared.status {
            None => {
                shared.links.insert(observer);
                None
            }
            Some(outcome) => Some(outcome.clone()),
        }
    }

    fn register_monitor_or_status(&self, observer: Process) -> Option<Outcome> {
        let mut shared = self.inner.shared.lock().unwrap();
        match &shared.status {
            None => {
                shared.monitors.insert(observer);
                None
            }
            Some(outcome) => Some(outcome.clone()),
        }
    }

    pub fn unlink(&self, observer: &Process) {
        self.inner.shared.lock().unwrap().links.remove(observer);
    }

    pub fn demonitor(&self, observer: &Process) {
        self.inner.shared.lock().unwrap().monitors.remove(observer);
    }

    // -- status inspection --------------------------------------------

    pub fn is_running(&self) -> bool {
        self.inner.shared.lock().unwrap().status.is_none()
    }

    pub fn exception(&self) -> Option<Outcome> {
        self.inner.shared.lock().unwrap().status.clone()
    }

    /// Suspend until this process's status is filled.
    pub async fn wait_for_termination(&self) -> Outcome {
        loop {
            let notified = self.inner.status_notify.notified();
            {
                let shared = self.inner.shared.lock().unwrap();
                if let Some(outcome) = &shared.status {
                    return outcome.clone();
                }
            }
            notified.await;
        }
    }

    // -- cleanup ---------------------------------------------------------

    /// Linearization point of death: fills `status`, snapshots `monitors`
    /// and `links`, and removes the process from the registry, all under
    /// one lock. Called exactly once, by the `start_process` wrapper, on
    /// every exit path of the process body.
    pub(crate) fn finish(&self, outcome: Outcome) {
        let (monitors, links) = {
            let mut shared = self.inner.shared.lock().unwrap();
            if shared.status.is_some() {
                // Cleanup must run exactly once; a second call is a bug in
                // the caller, not a racing peer (peers only ever read).
                return;
            }
            shared.status = Some(outcome.clone());
            (
                shared.monitors.drain().collect::<Vec<_>>(),
                shared.links.drain().collect::<Vec<_>>(),
            )
        };
        registry::remove(self.id());

        for monitor in &monitors {
            log::debug!("process {} notifying monitor {}", self.id(), monitor.id());
            monitor.send(Died {
                who: self.clone(),
                error: outcome.clone(),
            });
        }
        for link in &links {
            log::debug!("process {} notifying link {}", self.id(), link.id());
            link.raise_exception(WispError::LinkedProcessDied {
                who: self.clone(),
                error: outcome.clone().map(Box::new),
            });
        }

        self.inner.status_notify.notify_waiters();
    }
}

/// `link(me, remote)`: if `remote` is alive, registers `me`; otherwise
/// immediately delivers `LinkedProcessDied` to `me` as an asynchronous
/// exception.
pub fn link(me: &Process, remote: &Process) {
    if let Some(status) = remote.register_link_or_status(me.clone()) {
        me.raise_exception(WispError::LinkedProcessDied {
            who: remote.clone(),
            error: status.map(Box::new),
        });
    }
}

/// `monitor(me, remote)`: if `remote` is alive, registers `me`; otherwise
/// enqueues `Died` directly into `me`'s mailbox.
pub fn monitor(me: &Process, remote: &Process) {
    if let Some(status) = remote.register_monitor_or_status(me.clone()) {
        me.send(Died {
            who: remote.clone(),
            error: status,
        });
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.id())
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wisp-process-{}", self.id())
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Process {}

impl Hash for Process {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for Process {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Process {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(&other.id())
    }
}
