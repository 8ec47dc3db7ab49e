//! Process-wide registry mapping an activity id to its [`Process`] record.
//!
//! Entries are inserted when a [`Process`] is constructed and removed by the
//! cleanup path on termination. "Current process" identity is carried via a
//! task-local scope established by [`crate::spawn::start_process`] or
//! [`crate::spawn::root`]; anything running inside one of those scopes gets
//! the same `Process` back on every call.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::process::Process;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static TABLE: Lazy<DashMap<u64, Process>> = Lazy::new(DashMap::new);

tokio::task_local! {
    static CURRENT: u64;
}

/// Allocate a fresh, process-wide-unique activity id.
pub fn alloc_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Insert a freshly-constructed process. Callers must do this in the same
/// logical transaction as assigning the process's id (see
/// [`crate::spawn::start_process`]).
pub fn insert(process: Process) {
    log::trace!("registry: inserting process {}", process.id());
    TABLE.insert(process.id(), process);
}

pub fn get(id: u64) -> Option<Process> {
    TABLE.get(&id).map(|entry| entry.value().clone())
}

/// Atomic removal, invoked only by the cleanup sequence at process death.
pub fn remove(id: u64) {
    log::trace!("registry: removing process {}", id);
    TABLE.remove(&id);
}

/// Number of currently-live processes. Exposed for diagnostics and tests.
pub fn len() -> usize {
    TABLE.len()
}

/// Return the `Process` bound to the calling task by the innermost
/// [`scoped`] call. Panics if called outside such a scope — wrap top-level
/// code (a `main`, a test body) in [`crate::spawn::root`] first.
pub fn current() -> Process {
    let id = CURRENT.with(|id| *id);
    get(id).unwrap_or_else(|| {
        let process = Process::new_bare(id);
        insert(process.clone());
        process
    })
}

/// Run `fut` with `id` bound as the task-local "current process" id, so
/// that [`current`] inside it returns the process it was spawned as.
pub async fn scoped<F>(id: u64, fut: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT.scope(id, fut).await
}
