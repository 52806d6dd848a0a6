//! Fan-out/fan-in for the concurrent phases.
//!
//! Each phase spawns one task per work item and streams results to a single
//! consumer. The channel is closed by a barrier task that owns the master
//! sender and drops it only after every producer task has been joined, so a
//! consumer reading until `None` has seen every result of the phase.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::error;

/// Semaphore bounding the tasks of one phase. `None` or zero means unbounded.
pub fn limiter(max_tasks: Option<usize>) -> Arc<Semaphore> {
    let permits: usize = max_tasks
        .filter(|n| *n > 0)
        .unwrap_or(Semaphore::MAX_PERMITS);
    Arc::new(Semaphore::new(permits))
}

pub struct FanOut<T> {
    rx: mpsc::UnboundedReceiver<T>,
    barrier: JoinHandle<usize>,
}

impl<T: Send + 'static> FanOut<T> {
    /// Spawns `job(item)` for every item. Jobs returning `None` send nothing.
    pub fn spawn<I, F, Fut>(items: I, max_tasks: Option<usize>, job: F) -> Self
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let limiter: Arc<Semaphore> = limiter(max_tasks);
        let (tx, rx) = mpsc::unbounded_channel::<T>();
        let mut tasks: JoinSet<()> = JoinSet::new();

        for item in items {
            let tx = tx.clone();
            let limiter = limiter.clone();
            let work = job(item);
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                if let Some(result) = work.await {
                    let _ = tx.send(result);
                }
            });
        }

        let barrier: JoinHandle<usize> = tokio::spawn(async move {
            let mut lost: usize = 0;
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("worker task did not complete: {e}");
                    lost += 1;
                }
            }
            drop(tx);
            lost
        });

        Self { rx, barrier }
    }

    /// Next result, or `None` once every producer has finished.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Waits for the barrier and returns how many tasks panicked or were cancelled.
    pub async fn finish(self) -> usize {
        drop(self.rx);
        lost_tasks(self.barrier.await)
    }

    /// Cancels every task of the phase.
    pub fn abort(self) {
        self.barrier.abort();
    }
}

/// A barrier that failed to join hides how many producers it lost; count it as one.
fn lost_tasks(joined: Result<usize, JoinError>) -> usize {
    match joined {
        Ok(lost) => lost,
        Err(e) => {
            error!("phase barrier did not complete: {e}");
            1
        }
    }
}
