use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tracing::error;

/// Fire-and-forget tasks that can still be awaited on shutdown.
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                error!("Background task failed: {}", e);
            }
        }
        tasks.spawn(task);
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.tasks().len()
    }

    /// Waits for every task spawned so far, including ones spawned while waiting.
    pub async fn flush(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks());
            if pending.is_empty() {
                return;
            }
            while let Some(finished) = pending.join_next().await {
                if let Err(e) = finished {
                    error!("Background task failed: {}", e);
                }
            }
        }
    }
}
