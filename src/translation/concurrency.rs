/*!
 * Bounded concurrent execution of chunk tasks.
 *
 * At most `workers` tasks run at any moment. Each result is written into a
 * pre-sized slot by its input index, so completion order never leaks into
 * the output. A task that panics is turned
 * into a value by the caller's fault handler instead of tearing down the
 * whole run.
 */

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use log::error;

/// Fixed-size pool of concurrent task slots
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool; zero is raised to one
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` over every item and return the outputs in item order.
    ///
    /// `on_fault` receives the index and panic message of any task that
    /// panicked and supplies the value for its slot.
    pub async fn run<I, T, F, Fut, E>(&self, items: Vec<I>, task: F, on_fault: E) -> Vec<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = T>,
        E: Fn(usize, String) -> T,
    {
        let task = &task;
        let mut slots: Vec<Option<Result<T, String>>> = items.iter().map(|_| None).collect();

        let mut completed = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                let outcome = AssertUnwindSafe(task(index, item)).catch_unwind().await;
                (index, outcome.map_err(panic_message))
            })
            .buffer_unordered(self.workers);

        while let Some((index, outcome)) = completed.next().await {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(Ok(value)) => value,
                Some(Err(message)) => {
                    error!("Task {} panicked: {}", index, message);
                    on_fault(index, message)
                }
                None => on_fault(index, "task produced no result".to_string()),
            })
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
