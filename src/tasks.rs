use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::audit::CleanReport;
use crate::gateway::{CommitInfo, StashEntry, WorktreeEntry, WorktreeStatus};
use crate::teleport::TeleportOutcome;

/// What a background task hands back to the interaction loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    Unit,
    Worktrees(Vec<WorktreeEntry>),
    Status(String, WorktreeStatus),
    History(String, Vec<CommitInfo>),
    Stashes(String, Vec<StashEntry>),
    Clean(CleanReport),
    Teleport(TeleportOutcome),
    CommitMessage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Refresh,
    Fetch,
    Pull,
    Push,
    Rebase,
    Status,
    History,
    StashList,
    Stage,
    Commit,
    GenerateMessage,
    Teleport,
    Add,
    Remove,
    Clean,
}

/// Concurrency unit: at most one in-flight task per key.
pub type TaskKey = (String, TaskKind);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a {kind:?} operation for '{worktree}' is already running")]
    Busy { worktree: String, kind: TaskKind },
    #[error("task executor is shut down")]
    Shutdown,
}

#[derive(Debug)]
pub struct TaskEvent {
    pub key: TaskKey,
    pub result: Result<TaskPayload, TaskFailure>,
}

type Work = Box<dyn FnOnce() -> Result<TaskPayload, String> + Send + 'static>;

struct Job {
    key: TaskKey,
    work: Work,
}

/// Bounded pool of worker threads running git-backed operations off the
/// interactive thread. Results come back over a single-consumer channel
/// drained once per tick; the caller never blocks on a task.
pub struct TaskExecutor {
    jobs: Sender<Job>,
    events: Receiver<TaskEvent>,
    in_flight: Arc<Mutex<HashSet<TaskKey>>>,
    cancelled: Arc<Mutex<HashSet<TaskKey>>>,
}

/// Removes the key from the in-flight set when the task body finishes,
/// including on panic, so a key can never be wedged busy forever.
struct InFlightGuard {
    key: TaskKey,
    in_flight: Arc<Mutex<HashSet<TaskKey>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

impl TaskExecutor {
    pub fn new(workers: usize, timeout: Duration) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::channel::<TaskEvent>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let cancelled = Arc::new(Mutex::new(HashSet::new()));

        for _ in 0..workers.max(1) {
            let job_rx = Arc::clone(&job_rx);
            let event_tx = event_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let cancelled = Arc::clone(&cancelled);
            thread::spawn(move || loop {
                let job = {
                    let Ok(rx) = job_rx.lock() else { break };
                    rx.recv()
                };
                let Ok(job) = job else { break };
                run_job(job, timeout, &in_flight, &cancelled, &event_tx);
            });
        }

        Self {
            jobs: job_tx,
            events: event_rx,
            in_flight,
            cancelled,
        }
    }

    /// Submits `work` under `key`. Rejected while a task with the same
    /// key is in flight; tasks for other keys run concurrently.
    pub fn submit<F>(&self, key: TaskKey, work: F) -> Result<(), SubmitError>
    where
        F: FnOnce() -> Result<TaskPayload, String> + Send + 'static,
    {
        {
            let Ok(mut in_flight) = self.in_flight.lock() else {
                return Err(SubmitError::Shutdown);
            };
            if !in_flight.insert(key.clone()) {
                return Err(SubmitError::Busy {
                    worktree: key.0,
                    kind: key.1,
                });
            }
        }
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.remove(&key);
        }
        if self
            .jobs
            .send(Job {
                key: key.clone(),
                work: Box::new(work),
            })
            .is_err()
        {
            if let Ok(mut in_flight) = self.in_flight.lock() {
                in_flight.remove(&key);
            }
            return Err(SubmitError::Shutdown);
        }
        Ok(())
    }

    pub fn is_busy(&self, key: &TaskKey) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }

    /// Marks one in-flight task so its result is discarded on arrival.
    pub fn cancel(&self, key: &TaskKey) {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.insert(key.clone());
        }
    }

    /// Cancels every in-flight task for a worktree, used when the
    /// worktree itself is removed mid-task.
    pub fn cancel_worktree(&self, worktree: &str) {
        let keys: Vec<TaskKey> = self
            .in_flight
            .lock()
            .map(|set| {
                set.iter()
                    .filter(|(name, _)| name == worktree)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.extend(keys);
        }
    }

    /// Non-blocking drain point, called once per render tick.
    pub fn try_recv(&self) -> Option<TaskEvent> {
        self.events.try_recv().ok()
    }
}

fn run_job(
    job: Job,
    timeout: Duration,
    in_flight: &Arc<Mutex<HashSet<TaskKey>>>,
    cancelled: &Arc<Mutex<HashSet<TaskKey>>>,
    event_tx: &Sender<TaskEvent>,
) {
    let Job { key, work } = job;
    let (done_tx, done_rx) = mpsc::channel();
    let guard = InFlightGuard {
        key: key.clone(),
        in_flight: Arc::clone(in_flight),
    };

    // The work runs on its own thread so the pool worker can enforce the
    // wall-clock bound. The guard travels with it: the key stays busy
    // until the work truly stops touching the worktree.
    thread::spawn(move || {
        let result = work();
        let _ = done_tx.send(result);
        drop(guard);
    });

    let result = match done_rx.recv_timeout(timeout) {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(message)) => Err(TaskFailure::Failed(message)),
        Err(RecvTimeoutError::Timeout) => Err(TaskFailure::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(TaskFailure::Failed("task thread panicked".to_string()))
        }
    };

    let was_cancelled = cancelled
        .lock()
        .map(|mut set| set.remove(&key))
        .unwrap_or(false);
    let result = if was_cancelled {
        Err(TaskFailure::Cancelled)
    } else {
        result
    };
    let _ = event_tx.send(TaskEvent { key, result });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_event(executor: &TaskExecutor) -> TaskEvent {
        for _ in 0..200 {
            if let Some(event) = executor.try_recv() {
                return event;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("no event arrived");
    }

    #[test]
    fn completion_delivers_payload_for_key() {
        let executor = TaskExecutor::new(2, Duration::from_secs(5));
        let key: TaskKey = ("dev".to_string(), TaskKind::Fetch);
        executor
            .submit(key.clone(), || Ok(TaskPayload::Unit))
            .unwrap();
        let event = wait_event(&executor);
        assert_eq!(event.key, key);
        assert_eq!(event.result.unwrap(), TaskPayload::Unit);
    }

    #[test]
    fn duplicate_submission_is_rejected_while_in_flight() {
        let executor = TaskExecutor::new(2, Duration::from_secs(5));
        let key: TaskKey = ("dev".to_string(), TaskKind::Push);
        executor
            .submit(key.clone(), || {
                thread::sleep(Duration::from_millis(200));
                Ok(TaskPayload::Unit)
            })
            .unwrap();
        assert!(executor.is_busy(&key));
        let second = executor.submit(key.clone(), || Ok(TaskPayload::Unit));
        assert!(matches!(second, Err(SubmitError::Busy { .. })));
        // Other keys are unaffected.
        executor
            .submit(("dev".to_string(), TaskKind::Fetch), || {
                Ok(TaskPayload::Unit)
            })
            .unwrap();
        wait_event(&executor);
        wait_event(&executor);
    }

    #[test]
    fn key_frees_up_after_completion() {
        let executor = TaskExecutor::new(1, Duration::from_secs(5));
        let key: TaskKey = ("main".to_string(), TaskKind::Status);
        executor
            .submit(key.clone(), || Ok(TaskPayload::Unit))
            .unwrap();
        wait_event(&executor);
        assert!(!executor.is_busy(&key));
        assert!(executor.submit(key, || Ok(TaskPayload::Unit)).is_ok());
    }

    #[test]
    fn cancelled_result_is_discarded() {
        let executor = TaskExecutor::new(1, Duration::from_secs(5));
        let key: TaskKey = ("dev".to_string(), TaskKind::Rebase);
        executor
            .submit(key.clone(), || {
                thread::sleep(Duration::from_millis(100));
                Ok(TaskPayload::Unit)
            })
            .unwrap();
        executor.cancel(&key);
        let event = wait_event(&executor);
        assert_eq!(event.result, Err(TaskFailure::Cancelled));
    }

    #[test]
    fn slow_work_reports_timeout() {
        let executor = TaskExecutor::new(1, Duration::from_millis(50));
        let key: TaskKey = ("dev".to_string(), TaskKind::Pull);
        executor
            .submit(key.clone(), || {
                thread::sleep(Duration::from_millis(500));
                Ok(TaskPayload::Unit)
            })
            .unwrap();
        let event = wait_event(&executor);
        assert!(matches!(event.result, Err(TaskFailure::TimedOut(_))));
        // The key stays busy until the straggler actually stops.
        assert!(executor.is_busy(&key));
    }

    #[test]
    fn failure_message_is_preserved() {
        let executor = TaskExecutor::new(1, Duration::from_secs(5));
        executor
            .submit(("dev".to_string(), TaskKind::Commit), || {
                Err("nothing staged".to_string())
            })
            .unwrap();
        let event = wait_event(&executor);
        assert_eq!(
            event.result,
            Err(TaskFailure::Failed("nothing staged".to_string()))
        );
    }
}
