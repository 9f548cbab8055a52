//! Background expansion of tree nodes.
//!
//! Each request runs the node's [`ExpansionJob`] on its own worker thread and sends the
//! finished child list back over a channel that only the owning thread reads. The owner
//! attaches results whenever it polls, so a slow field accessor stalls only its own subtree.
//! A job that panics is reported and turned into an `[error]` leaf under its node.

use crate::error::ExpandError;
use crate::tree::{ExpansionResult, NodeId, StructTree};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error};

/// Runs expansion jobs off the owning thread and hands their results back.
pub struct Expander {
    tx: mpsc::Sender<ExpansionResult>,
    rx: mpsc::Receiver<ExpansionResult>,
    in_flight: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new()
    }
}

impl Expander {
    /// An expander with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<ExpansionResult>();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Jobs started but not yet attached.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Starts expanding `id` in the background.
    ///
    /// Returns `false` without starting anything if the node is a leaf or has already been
    /// requested.
    pub fn request(&mut self, tree: &mut StructTree, id: NodeId) -> bool {
        let Some(job) = tree.begin_expansion(id) else {
            return false;
        };
        let node = job.node;
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("expand-{}", node.index()))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| job.run()))
                    .unwrap_or_else(|payload| ExpansionResult {
                        node,
                        children: Err(ExpandError::TaskFailed(panic_message(payload.as_ref()))),
                    });
                // The receiver is gone once the tree has been replaced
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => {
                debug!(node = node.index(), "expansion job started");
                self.in_flight += 1;
            }
            Err(e) => {
                error!(node = node.index(), error = %e, "could not start expansion job");
                tree.attach(ExpansionResult {
                    node,
                    children: Err(ExpandError::TaskFailed(e.to_string())),
                });
            }
        }
        true
    }

    /// Attaches every job that has finished so far. Returns how many were attached.
    pub fn drain(&mut self, tree: &mut StructTree) -> usize {
        let mut attached = 0;
        while let Ok(result) = self.rx.try_recv() {
            self.finish(tree, result);
            attached += 1;
        }
        attached
    }

    /// Blocks until every started job has been attached.
    pub fn wait_all(&mut self, tree: &mut StructTree) {
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(result) => self.finish(tree, result),
                Err(_) => break,
            }
        }
    }

    fn finish(&mut self, tree: &mut StructTree, result: ExpansionResult) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Err(e) = &result.children {
            error!(node = result.node.index(), error = %e, "expansion job failed");
        }
        tree.attach(result);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
#[path = "tests/expand.rs"]
mod tests;
