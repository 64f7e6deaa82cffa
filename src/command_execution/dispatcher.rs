// Task dispatcher
//
// One worker slot runs operations off the caller's context, strictly in
// submission order. Results come back through a single ordered completion
// channel that the caller drains on its own task; the worker never touches
// caller-owned state.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::command_execution::{
    classifier::{Classifier, OperationProfile},
    error::{CommandError, CommandResult},
    types::{
        Completion, Disposition, DispatcherStatus, ExecutionResult, FailureKind, Outcome,
        TaskHandle, TaskId,
    },
};

/// Work submitted to the dispatcher. It owns everything it captured,
/// credentials included, and is dropped as soon as it has run.
pub type Operation = Box<dyn FnOnce() -> CommandResult<ExecutionResult> + Send + 'static>;

/// Dispatcher settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherConfig {
    /// Maximum number of tasks waiting behind the running one.
    /// `None` queues without limit; `Some(0)` rejects while a task runs.
    pub queue_capacity: Option<usize>,
}

struct Job {
    handle: TaskHandle,
    profile: OperationProfile,
    /// Taken out when the job is cancelled so captured state is released early
    operation: Option<Operation>,
}

struct DispatchState {
    queue: VecDeque<Job>,
    running: Option<TaskId>,
    accepting: bool,
}

impl DispatchState {
    /// Queued jobs that will still run; cancelled placeholders only hold
    /// their completion position
    fn waiting(&self) -> usize {
        self.queue.iter().filter(|job| job.operation.is_some()).count()
    }
}

struct Shared {
    state: Mutex<DispatchState>,
    wake: Notify,
    config: DispatcherConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        // A poisoned lock only means a holder panicked; the queue is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Submission side of the dispatcher
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

/// Ordered completion stream owned by the caller
pub struct Completions {
    receiver: mpsc::UnboundedReceiver<Completion>,
}

impl Dispatcher {
    /// Start the worker on the current tokio runtime
    pub fn spawn(classifier: Classifier, config: DispatcherConfig) -> (Self, Completions) {
        let shared = Arc::new(Shared {
            state: Mutex::new(DispatchState {
                queue: VecDeque::new(),
                running: None,
                accepting: true,
            }),
            wake: Notify::new(),
            config,
        });
        let (sender, receiver) = mpsc::unbounded_channel();

        let worker = tokio::spawn(run_worker(shared.clone(), classifier, sender));

        (
            Self {
                shared,
                worker: Some(worker),
            },
            Completions { receiver },
        )
    }

    /// Submit a named operation using default wording
    pub fn submit<F>(&self, name: impl Into<String>, operation: F) -> CommandResult<TaskHandle>
    where
        F: FnOnce() -> CommandResult<ExecutionResult> + Send + 'static,
    {
        self.submit_with_profile(OperationProfile::new(name), operation)
    }

    /// Submit an operation; returns immediately.
    ///
    /// Fails with `Busy` when the configured queue capacity is exhausted and
    /// with `DispatcherClosed` after shutdown. A rejected operation is dropped
    /// without running.
    pub fn submit_with_profile<F>(
        &self,
        profile: OperationProfile,
        operation: F,
    ) -> CommandResult<TaskHandle>
    where
        F: FnOnce() -> CommandResult<ExecutionResult> + Send + 'static,
    {
        let handle = TaskHandle {
            id: Uuid::new_v4(),
            name: profile.title.clone(),
        };

        {
            let mut state = self.shared.lock();
            if !state.accepting {
                return Err(CommandError::DispatcherClosed);
            }

            let running = usize::from(state.running.is_some());
            let queued = state.waiting();
            if let Some(capacity) = self.shared.config.queue_capacity {
                if running + queued > capacity {
                    log::debug!("Rejecting {}: {} running, {} queued", handle.name, running, queued);
                    return Err(CommandError::Busy { running, queued });
                }
            }

            state.queue.push_back(Job {
                handle: handle.clone(),
                profile,
                operation: Some(Box::new(operation)),
            });
        }

        log::info!("Queued task {} ({})", handle.name, handle.id);
        self.shared.wake.notify_one();
        Ok(handle)
    }

    /// Cancel a task that has not started yet.
    ///
    /// The task still produces exactly one completion (`Cancelled`), in its
    /// submission position. The running task cannot be cancelled.
    pub fn cancel(&self, id: TaskId) -> CommandResult<()> {
        let mut state = self.shared.lock();
        let job = state
            .queue
            .iter_mut()
            .find(|job| job.handle.id == id && job.operation.is_some())
            .ok_or(CommandError::NotCancellable(id))?;

        job.operation = None;
        log::info!("Cancelled queued task {} ({})", job.handle.name, id);
        Ok(())
    }

    /// Current occupancy
    pub fn status(&self) -> DispatcherStatus {
        let state = self.shared.lock();
        DispatcherStatus {
            running: state.running,
            queued: state.waiting(),
            accepting: state.accepting,
        }
    }

    /// Stop accepting work, let queued tasks finish, and wait for the worker
    pub async fn shutdown(mut self) -> CommandResult<()> {
        self.close();
        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| CommandError::internal(format!("Dispatcher worker failed: {}", e)))?;
        }
        Ok(())
    }

    fn close(&self) {
        self.shared.lock().accepting = false;
        self.shared.wake.notify_one();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // The worker drains what is already queued and then exits.
        self.close();
    }
}

impl Completions {
    /// Wait for the next completion; `None` once the dispatcher has shut down
    /// and every completion has been delivered
    pub async fn next(&mut self) -> Option<Completion> {
        self.receiver.recv().await
    }

}

async fn run_worker(
    shared: Arc<Shared>,
    classifier: Classifier,
    completions: mpsc::UnboundedSender<Completion>,
) {
    loop {
        let next = {
            let mut state = shared.lock();
            match state.queue.pop_front() {
                Some(job) => {
                    state.running = Some(job.handle.id);
                    Some(job)
                }
                None if !state.accepting => break,
                None => None,
            }
        };

        let Some(job) = next else {
            shared.wake.notified().await;
            continue;
        };

        let Job {
            handle,
            profile,
            operation,
        } = job;

        let disposition = match operation {
            Some(operation) => {
                log::debug!("Starting task {} ({})", handle.name, handle.id);
                run_operation(&classifier, &profile, operation).await
            }
            None => Disposition::Cancelled,
        };

        shared.lock().running = None;

        let completion = Completion {
            handle,
            disposition,
            completed_at: chrono::Utc::now(),
        };
        if completions.send(completion).is_err() {
            log::debug!("Completion receiver dropped; discarding result");
        }
    }

    log::debug!("Dispatcher worker stopped");
}

async fn run_operation(
    classifier: &Classifier,
    profile: &OperationProfile,
    operation: Operation,
) -> Disposition {
    match tokio::task::spawn_blocking(operation).await {
        Ok(Ok(result)) => Disposition::Completed(classifier.classify(&result, profile)),
        Ok(Err(CommandError::Validation(err))) => {
            log::info!("{} rejected: {}", profile.title, err);
            Disposition::Rejected(err)
        }
        Ok(Err(err)) => Disposition::Completed(internal_failure(format!(
            "{} failed: {}",
            profile.title, err
        ))),
        Err(join_err) => {
            let detail = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            log::warn!("{} terminated abnormally: {}", profile.title, detail);
            Disposition::Completed(internal_failure(format!(
                "{} terminated unexpectedly: {}",
                profile.title, detail
            )))
        }
    }
}

fn internal_failure(message: String) -> Outcome {
    Outcome::Failure {
        kind: FailureKind::Internal,
        message,
        stdout: String::new(),
        stderr: String::new(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_execution::error::ValidationError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    fn dispatcher(capacity: Option<usize>) -> (Dispatcher, Completions) {
        Dispatcher::spawn(
            Classifier::default(),
            DispatcherConfig {
                queue_capacity: capacity,
            },
        )
    }

    /// Operation that blocks until the returned sender fires
    fn gated() -> (std_mpsc::Sender<()>, impl FnOnce() -> CommandResult<ExecutionResult> + Send + 'static) {
        let (release, gate) = std_mpsc::channel::<()>();
        let operation = move || {
            let _ = gate.recv();
            Ok(ExecutionResult::exited(0, "", ""))
        };
        (release, operation)
    }

    async fn wait_until_running(dispatcher: &Dispatcher) {
        for _ in 0..200 {
            if dispatcher.status().running.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task never started");
    }

    #[tokio::test]
    async fn test_single_flight_fifo() {
        let (dispatcher, mut completions) = dispatcher(None);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for index in 0..4 {
            let active = active.clone();
            let peak = peak.clone();
            let order = order.clone();
            let handle = dispatcher
                .submit(format!("task-{}", index), move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    order.lock().unwrap().push(index);
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(ExecutionResult::exited(0, "", ""))
                })
                .unwrap();
            handles.push(handle);
        }

        for expected in &handles {
            let completion = completions.next().await.unwrap();
            assert_eq!(&completion.handle, expected);
            assert!(completion.outcome().unwrap().is_success());
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_busy_when_capacity_exhausted() {
        let (dispatcher, mut completions) = dispatcher(Some(0));
        let (release, operation) = gated();

        let first = dispatcher.submit("first", operation).unwrap();
        wait_until_running(&dispatcher).await;

        let err = dispatcher
            .submit("second", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap_err();
        assert!(matches!(err, CommandError::Busy { running: 1, queued: 0 }));

        release.send(()).unwrap();
        let completion = completions.next().await.unwrap();
        assert_eq!(completion.handle, first);

        // Slot is free again
        dispatcher
            .submit("third", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap();
        assert!(completions.next().await.unwrap().outcome().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_cancel_only_queued_tasks() {
        let (dispatcher, mut completions) = dispatcher(None);
        let (release, operation) = gated();
        let ran = Arc::new(AtomicUsize::new(0));

        let running = dispatcher.submit("running", operation).unwrap();
        wait_until_running(&dispatcher).await;

        let ran_clone = ran.clone();
        let queued = dispatcher
            .submit("queued", move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(ExecutionResult::exited(0, "", ""))
            })
            .unwrap();

        assert!(matches!(
            dispatcher.cancel(running.id),
            Err(CommandError::NotCancellable(_))
        ));
        dispatcher.cancel(queued.id).unwrap();
        assert!(dispatcher.cancel(queued.id).is_err());

        release.send(()).unwrap();

        let first = completions.next().await.unwrap();
        assert_eq!(first.handle, running);
        let second = completions.next().await.unwrap();
        assert_eq!(second.handle, queued);
        assert_eq!(second.disposition, Disposition::Cancelled);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_task_frees_its_queue_slot() {
        let (dispatcher, mut completions) = dispatcher(Some(1));
        let (release, operation) = gated();

        let a = dispatcher.submit("a", operation).unwrap();
        wait_until_running(&dispatcher).await;

        let b = dispatcher
            .submit("b", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap();
        dispatcher.cancel(b.id).unwrap();
        assert_eq!(dispatcher.status().queued, 0);

        let c = dispatcher
            .submit("c", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap();
        assert_eq!(dispatcher.status().queued, 1);

        release.send(()).unwrap();

        assert_eq!(completions.next().await.unwrap().handle, a);
        let cancelled = completions.next().await.unwrap();
        assert_eq!(cancelled.handle, b);
        assert_eq!(cancelled.disposition, Disposition::Cancelled);
        let last = completions.next().await.unwrap();
        assert_eq!(last.handle, c);
        assert!(last.outcome().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_failure() {
        let (dispatcher, mut completions) = dispatcher(None);
        dispatcher
            .submit("explode", || -> CommandResult<ExecutionResult> { panic!("boom") })
            .unwrap();

        let completion = completions.next().await.unwrap();
        match completion.outcome() {
            Some(Outcome::Failure { kind, message, .. }) => {
                assert_eq!(*kind, FailureKind::Internal);
                assert!(message.contains("boom"));
            }
            other => panic!("expected internal failure, got {:?}", other),
        }

        // Worker survives the panic
        dispatcher
            .submit("after", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap();
        assert!(completions.next().await.unwrap().outcome().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_validation_error_is_rejected_not_failed() {
        let (dispatcher, mut completions) = dispatcher(None);
        dispatcher
            .submit("needs password", || Err(ValidationError::EmptyCredential.into()))
            .unwrap();

        let completion = completions.next().await.unwrap();
        assert_eq!(
            completion.disposition,
            Disposition::Rejected(ValidationError::EmptyCredential)
        );
        assert!(completion.outcome().is_none());
    }

    #[tokio::test]
    async fn test_captured_state_is_released_after_completion() {
        let (dispatcher, mut completions) = dispatcher(None);
        let probe = Arc::new(String::from("secret"));
        let weak = Arc::downgrade(&probe);

        dispatcher
            .submit("capture", move || {
                assert_eq!(probe.as_str(), "secret");
                Ok(ExecutionResult::exited(0, "", ""))
            })
            .unwrap();

        completions.next().await.unwrap();
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_closes() {
        let (dispatcher, mut completions) = dispatcher(None);
        dispatcher
            .submit("last", || Ok(ExecutionResult::exited(0, "", "")))
            .unwrap();
        assert!(dispatcher.status().accepting);

        dispatcher.shutdown().await.unwrap();

        assert!(completions.next().await.is_some());
        assert!(completions.next().await.is_none());
    }

    #[tokio::test]
    async fn test_status_reports_idle() {
        let (dispatcher, _completions) = dispatcher(None);
        let status = dispatcher.status();
        assert_eq!(status.running, None);
        assert_eq!(status.queued, 0);
        assert!(status.accepting);
    }
}
