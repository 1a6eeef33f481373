//! Serial executor
//!
//! At most one submitted job runs at a time and jobs run in submission order.
//! Submitting never blocks: jobs go into an unbounded channel drained by a
//! single worker task, started on the ambient tokio runtime at first use.

use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::errors::{EngineError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
pub struct SerialExecutor {
    sender: OnceCell<mpsc::UnboundedSender<Job>>,
}

impl SerialExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job`; it runs after every job submitted before it
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let sender = self.sender.get_or_try_init(spawn_worker)?;
        sender
            .send(Box::new(job))
            .map_err(|_| EngineError::ExecutorClosed)
    }

    pub fn is_started(&self) -> bool {
        self.sender.get().is_some()
    }
}

fn spawn_worker() -> Result<mpsc::UnboundedSender<Job>> {
    let handle = Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?;
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

    handle.spawn(async move {
        while let Some(job) = receiver.recv().await {
            // Keep draining after a job panics
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!("Serial executor job panicked");
            }
        }
        debug!("Serial executor worker stopped");
    });

    Ok(sender)
}
