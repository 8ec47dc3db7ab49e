//! A supervisor is a process that owns a set of children and reacts to
//! their termination according to a configured [`Strategy`]. Its inbox is
//! just its own mailbox — `AddChild`/`RemoveChild`/`StopSupervisor` are
//! ordinary typed messages, and child termination arrives the same way any
//! monitor notification would (`monitor` is called on every child as it is
//! added), so a single scan over the mailbox drives the whole main loop.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::dispatch;
use crate::error::WispError;
use crate::message::{Died, Envelope, Tagged};
use crate::process::{self, Outcome, Process};
use crate::spawn;

type ChildFuture = Pin<Box<dyn Future<Output = Result<(), WispError>> + Send>>;

/// The action a supervisor spawns a child from. Boxed so `AddChild` can
/// carry an arbitrary child body through the supervisor's own mailbox.
pub type ChildAction = Box<dyn FnOnce(Process) -> ChildFuture + Send>;

/// Build a boxed [`ChildAction`] from an `async move { .. }` block or any
/// other future-returning closure.
pub fn child_action<F, Fut>(f: F) -> ChildAction
where
    F: FnOnce(Process) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WispError>> + Send + 'static,
{
    Box::new(move |p| Box::pin(f(p)))
}

/// Reaction to a child terminating, applied by the supervisor's main loop.
pub enum Strategy {
    /// Drop the child from state and keep going, regardless of outcome.
    IgnoreAll,
    /// Drop normal exits; on an error exit, cancel the remaining children
    /// and propagate the error (the supervisor itself then exits with it).
    IgnoreGraceful,
    /// Cancel every remaining child on any termination. Propagate if the
    /// terminating child errored; otherwise the supervisor exits normally.
    KillAll,
    /// Drop the child from state and run the callback with `(child,
    /// outcome)`. If it returns `Err`, cancel the remaining children and
    /// propagate that error.
    Notify(Box<dyn Fn(Process, Outcome) -> Result<(), WispError> + Send + Sync>),
}

struct AddChild(ChildAction);
struct RemoveChild(Process);
struct StopSupervisor;

enum Event {
    AddChild(Process, ChildAction),
    RemoveChild(Process),
    Stop,
    ChildDied(Process, Outcome),
}

/// Start a supervisor process running `strategy`, returning its handle.
pub fn start_supervisor(strategy: Strategy) -> Process {
    spawn::start_process(move |me| run(me, strategy))
}

/// `AddChild(action) -> reply<Process>`: ask `supervisor` to start and
/// track a new child, returning its handle once registered.
pub async fn add_child(
    me: &Process,
    supervisor: &Process,
    action: ChildAction,
) -> Result<Process, WispError> {
    dispatch::query(me, AddChild(action), supervisor).await
}

/// `RemoveChild(child)`: stop tracking and cancel a specific child.
pub fn remove_child(supervisor: &Process, child: Process) {
    supervisor.send(RemoveChild(child));
}

/// `StopSupervisor`: cancel every child and exit the main loop.
pub fn stop_supervisor(supervisor: &Process) {
    supervisor.send(StopSupervisor);
}

async fn run(me: Process, strategy: Strategy) -> Result<(), WispError> {
    let mut children: HashMap<u64, Process> = HashMap::new();
    loop {
        let notified = me.mailbox().notified();

        if let Some(err) = me.take_pending_exception() {
            cancel_all(&children);
            return Err(err);
        }

        let event = match try_take_event(&me) {
            Some(event) => event,
            None => {
                notified.await;
                continue;
            }
        };

        match event {
            Event::AddChild(from, action) => {
                let child = spawn::start_process(move |p| action(p));
                process::monitor(&me, &child);
                children.insert(child.id(), child.clone());
                log::debug!("supervisor {} added child {}", me.id(), child.id());
                from.send(Tagged::new(me.clone(), child));
            }
            Event::RemoveChild(child) => {
                if let Some(child) = children.remove(&child.id()) {
                    child.demonitor(&me);
                    spawn::kill(WispError::DependentActionEnded, &child);
                }
            }
            Event::Stop => {
                cancel_all(&children);
                return Ok(());
            }
            Event::ChildDied(child, outcome) => {
                if children.remove(&child.id()).is_none() {
                    // RemoveChild already took this one out of state; the
                    // Died notification was already in flight and arrived
                    // too late to suppress. Not this child's to react to.
                    log::trace!(
                        "supervisor {} ignoring Died for already-removed child {}",
                        me.id(),
                        child.id()
                    );
                    continue;
                }
                log::debug!(
                    "supervisor {} saw child {} terminate: {:?}",
                    me.id(),
                    child.id(),
                    outcome.as_ref().map(ToString::to_string)
                );
                match &strategy {
                    Strategy::IgnoreAll => {}
                    Strategy::IgnoreGraceful => {
                        if let Some(err) = outcome {
                            cancel_all(&children);
                            return Err(err);
                        }
                    }
                    Strategy::KillAll => {
                        cancel_all(&children);
                        if let Some(err) = outcome {
                            return Err(err);
                        }
                        return Ok(());
                    }
                    Strategy::Notify(f) => {
                        if let Err(err) = f(child, outcome) {
                            cancel_all(&children);
                            return Err(err);
                        }
                    }
                }
            }
        }
    }
}

fn cancel_all(children: &HashMap<u64, Process>) {
    for child in children.values() {
        spawn::kill(WispError::DependentActionEnded, child);
    }
}

fn try_take_event(me: &Process) -> Option<Event> {
    let mut found = None;
    let handled = me.mailbox().try_take_handled(|envelope| {
        let envelope = match envelope.downcast::<Tagged>() {
            Ok(tagged) => match tagged.downcast::<AddChild>() {
                Ok((from, AddChild(action))) => {
                    found = Some(Event::AddChild(from, action));
                    return Ok(());
                }
                Err(tagged) => Envelope::new(tagged),
            },
            Err(envelope) => envelope,
        };
        let envelope = match envelope.downcast::<RemoveChild>() {
            Ok(RemoveChild(child)) => {
                found = Some(Event::RemoveChild(child));
                return Ok(());
            }
            Err(envelope) => envelope,
        };
        let envelope = match envelope.downcast::<StopSupervisor>() {
            Ok(StopSupervisor) => {
                found = Some(Event::Stop);
                return Ok(());
            }
            Err(envelope) => envelope,
        };
        match envelope.downcast::<Died>() {
            Ok(Died { who, error }) => {
                found = Some(Event::ChildDied(who, error));
                Ok(())
            }
            Err(envelope) => Err(envelope),
        }
    });
    if handled {
        found
    } else {
        None
    }
}
