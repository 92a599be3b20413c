//! Completion context: the single place results are delivered.
//!
//! A [`CompletionContext`] is a cloneable handle that posts jobs onto one
//! [`CompletionQueue`]. Whoever drains the queue is the completion context;
//! jobs run one at a time, in posting order, on that consumer. A job that
//! panics is logged and skipped; later jobs still run.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::mpsc;
use tracing::{error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Create a connected context/queue pair.
pub fn completion_channel() -> (CompletionContext, CompletionQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionContext { tx }, CompletionQueue { rx })
}

/// Handle used to post completion jobs.
#[derive(Debug, Clone)]
pub struct CompletionContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl CompletionContext {
    /// Start a queue on its own tokio task and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        let (context, queue) = completion_channel();
        tokio::spawn(queue.run());
        context
    }

    /// Post a job. Returns `false` if the queue is gone; the job is dropped.
    pub fn deliver<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            warn!("Completion queue closed, dropping result");
            return false;
        }
        true
    }

    /// Check if the queue has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn run_job(job: Job) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        error!(panic = panic_message(payload.as_ref()), "Completion job panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Consumer side of a completion context.
#[derive(Debug)]
pub struct CompletionQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl CompletionQueue {
    /// Run jobs until every [`CompletionContext`] handle is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            run_job(job);
        }
    }

    /// Wait for and run the next job. Returns `false` once all handles are gone.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                run_job(job);
                true
            }
            None => false,
        }
    }

    /// Run every job already queued without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            ran += 1;
        }
        ran
    }
}
