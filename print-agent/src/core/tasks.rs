//! Background task supervision
//!
//! All long-running parts of the agent share one [`CancellationToken`].
//! Cancelling it is how the agent stops, and an essential task that exits
//! on its own cancels it too, so the process never keeps running without
//! its ticket poller.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Does the agent's job; losing it stops the agent
    Worker,
    /// Serves a port
    Listener,
    /// Runs on an interval
    Periodic,
}

impl TaskKind {
    pub fn is_essential(self) -> bool {
        matches!(self, TaskKind::Worker)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Worker => "worker",
            TaskKind::Listener => "listener",
            TaskKind::Periodic => "periodic",
        };
        f.write_str(name)
    }
}

struct Supervised {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

pub struct BackgroundTasks {
    tasks: Vec<Supervised>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn `future` under supervision
    ///
    /// Panics are caught and logged. When an essential task ends before
    /// shutdown was requested, the shared token is cancelled.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let supervised = async move {
            let outcome = AssertUnwindSafe(future).catch_unwind().await;
            if shutdown.is_cancelled() {
                if let Err(payload) = outcome {
                    tracing::error!(task = name, %kind, panic = %panic_message(&*payload), "Task panicked during shutdown");
                } else {
                    tracing::debug!(task = name, %kind, "Task stopped");
                }
                return;
            }

            match outcome {
                Ok(()) => tracing::warn!(task = name, %kind, "Task exited before shutdown"),
                Err(payload) => {
                    tracing::error!(task = name, %kind, panic = %panic_message(&*payload), "Task panicked")
                }
            }
            if kind.is_essential() {
                tracing::error!(task = name, "Essential task lost, stopping the agent");
                shutdown.cancel();
            }
        };

        self.tasks.push(Supervised {
            name,
            kind,
            handle: tokio::spawn(supervised),
        });
        tracing::debug!(task = name, %kind, "Task spawned");
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<String> = self
            .tasks
            .iter()
            .map(|t| format!("{} ({})", t.name, t.kind))
            .collect();
        tracing::info!(count = self.tasks.len(), tasks = %names.join(", "), "Background tasks running");
    }

    /// Names of tasks that are no longer running although no shutdown was requested
    pub fn stopped_early(&self) -> Vec<&'static str> {
        if self.shutdown.is_cancelled() {
            return Vec::new();
        }
        self.tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.name)
            .collect()
    }

    /// Cancel every task and wait up to `grace` in total; stragglers are aborted
    pub async fn shutdown(self, grace: Duration) {
        tracing::info!(count = self.tasks.len(), "Stopping background tasks");
        self.shutdown.cancel();

        let deadline = Instant::now() + grace;
        for mut task in self.tasks {
            if tokio::time::timeout_at(deadline, &mut task.handle).await.is_err() {
                tracing::warn!(task = task.name, grace_secs = grace.as_secs(), "Task did not stop in time, aborting");
                task.handle.abort();
            }
        }

        tracing::info!("Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_shutdown_waits_for_cooperative_tasks() {
        let mut tasks = BackgroundTasks::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let token = tasks.shutdown_token();
        let flag = stopped.clone();
        tasks.spawn("poller", TaskKind::Worker, async move {
            token.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        tasks.spawn("sweep", TaskKind::Periodic, async {
            panic!("probe exploded");
        });

        assert_eq!(tasks.len(), 2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        // A non-essential panic is contained and does not stop the agent
        assert_eq!(tasks.stopped_early(), vec!["sweep"]);
        assert!(!tasks.shutdown_token().is_cancelled());

        tasks.shutdown(Duration::from_secs(1)).await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_lost_worker_cancels_shutdown_token() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("poller", TaskKind::Worker, async {
            panic!("store vanished");
        });

        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        tasks.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_aborts_stuck_task() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("listener", TaskKind::Listener, async {
            // Ignores the token
            std::future::pending::<()>().await;
        });

        let started = Instant::now();
        tasks.shutdown(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
