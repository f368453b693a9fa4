//! Fixed-size worker pool draining a shared, unordered task queue.
//!
//! Tasks may be submitted while workers are already busy, so downloads for
//! early years start while later years are still being discovered.
//! [`WorkerPool::drain`] closes the queue and waits for every queued and
//! in-flight task; nothing is abandoned on a normal shutdown. Results come
//! back in completion order, which is unspecified.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{Result, ScrapeError};

pub struct WorkerPool<T, R> {
    sender: mpsc::UnboundedSender<T>,
    workers: Vec<JoinHandle<Vec<R>>>,
    submitted: usize,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Start `workers` workers that each run `handler` on queued tasks.
    pub fn spawn<H, Fut>(workers: usize, handler: H) -> Result<Self>
    where
        H: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if workers == 0 {
            return Err(ScrapeError::Config("worker pool needs at least one worker".into()));
        }

        let (sender, receiver) = mpsc::unbounded_channel::<T>();
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..workers)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let mut results = Vec::new();
                    loop {
                        // The lock is held only while waiting for the next task.
                        let next = receiver.lock().await.recv().await;
                        let Some(task) = next else { break };
                        results.push((*handler)(task).await);
                    }
                    debug!(worker = id, processed = results.len(), "worker finished");
                    results
                })
            })
            .collect();

        Ok(Self {
            sender,
            workers,
            submitted: 0,
        })
    }

    /// Queue a task for the next free worker.
    pub fn submit(&mut self, task: T) -> Result<()> {
        self.sender
            .send(task)
            .map_err(|_| ScrapeError::Config("worker pool is shut down".into()))?;
        self.submitted += 1;
        Ok(())
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Close the queue and wait for every worker to finish.
    pub async fn drain(self) -> Vec<R> {
        drop(self.sender);
        let mut results = Vec::with_capacity(self.submitted);
        for handle in futures::future::join_all(self.workers).await {
            match handle {
                Ok(mut worker_results) => results.append(&mut worker_results),
                Err(e) => error!(error = %e, "worker task aborted"),
            }
        }
        results
    }
}
