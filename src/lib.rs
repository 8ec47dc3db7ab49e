//! An in-process actor runtime: typed mailboxes, links, monitors, queries
//! and supervision trees over `tokio` tasks.
//!
//! Nothing here crosses a process boundary, touches disk, or schedules
//! anything itself — `wisp` only wires together activities the host
//! (`tokio`) already knows how to run.

pub mod dispatch;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod process;
pub mod registry;
pub mod spawn;
pub mod supervisor;

pub use dispatch::{case, default, matching, query, query_handler, respond, Handler};
pub use error::WispError;
pub use message::{Died, Envelope, Stop, Tagged};
pub use process::{link, monitor, Process};
pub use spawn::{async_delayed, kill, root, start_process, stop, with_process};
pub use supervisor::{
    add_child, child_action, remove_child, start_supervisor, stop_supervisor, Strategy,
};
