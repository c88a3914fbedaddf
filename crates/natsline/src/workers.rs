//! Tracking of per-message worker threads.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Identifier assigned to each spawned worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "worker-{}", self.0)
    }
}

/// How a worker terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The handler returned normally.
    Completed(WorkerId),
    /// The handler panicked.
    Panicked(WorkerId),
}

impl WorkerExit {
    /// Worker the exit belongs to.
    #[must_use]
    pub const fn id(&self) -> WorkerId {
        match self {
            Self::Completed(id) | Self::Panicked(id) => *id,
        }
    }
}

/// Sends the completion notice when the worker's closure ends, including by
/// unwinding.
struct CompletionNotice {
    id: WorkerId,
    done: Sender<WorkerId>,
}

impl Drop for CompletionNotice {
    fn drop(&mut self) {
        // The tracker may already be gone during teardown.
        drop(self.done.send(self.id));
    }
}

/// Outstanding worker set owned by the dispatch loop.
///
/// Workers announce completion over a channel; the loop reaps those notices
/// between reads and joins the finished threads.
pub(crate) struct WorkerTracker {
    next_id: u64,
    running: HashMap<WorkerId, JoinHandle<()>>,
    done_tx: Sender<WorkerId>,
    done_rx: Receiver<WorkerId>,
}

impl WorkerTracker {
    pub(crate) fn new() -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            next_id: 0,
            running: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    /// Starts `job` on a new named thread.
    pub(crate) fn spawn<F>(&mut self, job: F) -> io::Result<WorkerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = WorkerId(self.next_id);
        let notice = CompletionNotice {
            id,
            done: self.done_tx.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("natsline-{id}"))
            .spawn(move || {
                let _notice = notice;
                job();
            })?;
        self.next_id = self.next_id.wrapping_add(1);
        self.running.insert(id, handle);
        Ok(id)
    }

    /// Joins every worker that has announced completion.
    pub(crate) fn reap(&mut self) -> Vec<WorkerExit> {
        let mut exits = Vec::new();
        while let Ok(id) = self.done_rx.try_recv() {
            if let Some(handle) = self.running.remove(&id) {
                exits.push(join(id, handle));
            }
        }
        exits
    }

    /// Blocks until every outstanding worker has terminated.
    pub(crate) fn drain(&mut self) -> Vec<WorkerExit> {
        let mut pending: Vec<_> = self.running.drain().collect();
        pending.sort_by_key(|(id, _)| *id);
        let exits = pending
            .into_iter()
            .map(|(id, handle)| join(id, handle))
            .collect();
        while self.done_rx.try_recv().is_ok() {}
        exits
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.running.len()
    }
}

fn join(id: WorkerId, handle: JoinHandle<()>) -> WorkerExit {
    match handle.join() {
        Ok(()) => WorkerExit::Completed(id),
        Err(_) => WorkerExit::Panicked(id),
    }
}
