//! Identity of the execution context allowed to write the index.

use std::thread::{self, ThreadId};
use tokio::task;

/// Opaque token naming a thread or a Tokio task.
///
/// Inside a spawned task the task ID is used, since a task may hop between
/// worker threads across `.await` points. Outside of one (plain threads,
/// `block_on`, `#[tokio::main]`'s main future) the thread ID is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerToken {
    Task(task::Id),
    Thread(ThreadId),
}

impl OwnerToken {
    /// Token of the context this is called from.
    pub fn current() -> Self {
        match task::try_id() {
            Some(id) => Self::Task(id),
            None => Self::Thread(thread::current().id()),
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }
}
