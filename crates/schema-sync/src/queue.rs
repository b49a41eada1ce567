//! Fail-fast step sequencer.
//!
//! Dependent DDL steps (enum type before column, table before index) are
//! collected into a [`Queue`] and run one at a time. Steps are not started
//! when they are added; [`Queue::run`] invokes them in order, stops at the
//! first error and reports exactly one result.

use futures::future::BoxFuture;
use std::future::Future;
use tracing::debug;

use crate::error::Result;

type Step<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a>;

/// Ordered list of asynchronous steps with fail-fast semantics.
///
/// Each step yields a `T`; the orchestrator uses `usize` steps that report
/// how many statements they issued.
pub struct Queue<'a, T = ()> {
    label: &'static str,
    steps: Vec<Step<'a, T>>,
}

impl<'a, T: Send + 'a> Queue<'a, T> {
    /// Create an empty queue. The label only appears in log output.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            steps: Vec::new(),
        }
    }

    /// Append a step. It is not invoked until [`Queue::run`].
    pub fn add<F, Fut>(&mut self, step: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.steps.push(Box::new(move || Box::pin(step())));
    }

    /// Number of pending steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order.
    ///
    /// Returns the output of each completed step, or the first error. Steps
    /// after a failed one are dropped without being invoked. An empty queue
    /// completes immediately.
    pub async fn run(self) -> Result<Vec<T>> {
        let total = self.steps.len();
        let mut outputs = Vec::with_capacity(total);
        for step in self.steps {
            match step().await {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    debug!(
                        queue = self.label,
                        "step {}/{} failed, skipping {} remaining",
                        outputs.len() + 1,
                        total,
                        total - outputs.len() - 1
                    );
                    return Err(e);
                }
            }
            debug!(queue = self.label, "step {}/{} done", outputs.len(), total);
        }
        Ok(outputs)
    }
}

impl<T> std::fmt::Debug for Queue<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("label", &self.label)
            .field("pending", &self.steps.len())
            .finish()
    }
}
