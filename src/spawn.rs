//! Process lifecycle: `start_process`, the scoped `with_process`, and the
//! cancellation primitives (`kill`, `stop`, `async_delayed`).

use std::future::Future;
use std::time::Duration;

use crate::error::WispError;
use crate::message::Stop;
use crate::process::Process;
use crate::registry;

/// Start a new process running `action`. The process is registered (and
/// therefore visible to `link`/`monitor`/`send`) before `action` begins
/// running: `start_process` inserts into the registry synchronously and
/// only then hands the future to `tokio::spawn`, so there is no window
/// where a too-early failure would have no `Process` to clean it up.
pub fn start_process<F, Fut>(action: F) -> Process
where
    F: FnOnce(Process) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WispError>> + Send + 'static,
{
    let id = registry::alloc_id();
    let process = Process::new_bare(id);
    registry::insert(process.clone());

    let spawned = process.clone();
    tokio::spawn(registry::scoped(id, async move {
        let outcome = action(spawned.clone()).await.err();
        spawned.finish(outcome);
    }));

    process
}

/// Best-effort scope guard: on drop (including panic-driven unwind out of
/// `body`), delivers `DependentActionEnded` to the child so it can notice
/// and stop at its next suspension point. The normal (non-panicking) exit
/// path additionally waits for the child to actually terminate.
struct ScopeGuard {
    child: Option<Process>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            child.raise_exception(WispError::DependentActionEnded);
        }
    }
}

/// Scoped variant of `start_process`: run `body(child)`, and on any exit
/// from `body` — normal, exceptional, or the surrounding future being
/// dropped — stop the child and (on the normal path) wait for it to
/// actually terminate before returning.
pub async fn with_process<F, Fut, B, BFut, R>(action: F, body: B) -> R
where
    F: FnOnce(Process) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WispError>> + Send + 'static,
    B: FnOnce(Process) -> BFut,
    BFut: Future<Output = R>,
{
    let child = start_process(action);
    let mut guard = ScopeGuard {
        child: Some(child.clone()),
    };
    let result = body(child.clone()).await;
    if let Some(child) = guard.child.take() {
        child.raise_exception(WispError::DependentActionEnded);
        child.wait_for_termination().await;
    }
    result
}

/// Deliver `err` asynchronously to `target` as a link-style exception.
pub fn kill(err: WispError, target: &Process) {
    target.raise_exception(err);
}

/// Cooperative stop: send `Stop{from: me}`. The target only reacts if its
/// body explicitly `receive`s a `Stop`.
pub fn stop(me: &Process, target: &Process) {
    target.send(Stop { from: me.clone() });
}

/// Spawn a fire-and-forget activity that waits `delay` then runs `f`; on
/// failure, kills the caller with the raised error.
pub fn async_delayed<F>(caller: Process, delay: Duration, f: F)
where
    F: FnOnce() -> Result<(), WispError> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(err) = f() {
            kill(err, &caller);
        }
    });
}

/// Entry point for code that needs a "current process" identity but was
/// never itself spawned by `start_process` — a `main`, a test body, a bare
/// `tokio::spawn`. Allocates a process, binds it as the task-local current
/// process for the duration of `fut`, and finishes it (with a normal
/// outcome) once `fut` completes.
pub async fn root<F>(fut: F) -> F::Output
where
    F: Future,
{
    let id = registry::alloc_id();
    let process = Process::new_bare(id);
    registry::insert(process.clone());
    let result = registry::scoped(id, fut).await;
    process.finish(None);
    result
}
