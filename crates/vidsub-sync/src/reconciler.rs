/*
[INPUT]:  TaskService port, ReconcilerConfig, ReconcilerObserver
[OUTPUT]: Task mirror kept in step with the remote service, one poll loop per active task
[POS]:    Execution layer - remote commands, reconciliation and polling
[UPDATE]: When changing command semantics, poll lifecycle or stale-response handling
*/

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vidsub_adapter::{AdapterError, Task, TaskId, TaskStatus, UploadFile};

use crate::config::ReconcilerConfig;
use crate::error::{RemoteCommand, RemoteCommandError};
use crate::mirror::TaskMirror;
use crate::observer::{ReconcileEvent, ReconcilerObserver, StopReason, TracingObserver};
use crate::poll::{PollHandle, PollRegistry};
use crate::service::{Diagnostic, TaskService};

pub type Result<T> = std::result::Result<T, RemoteCommandError>;

#[derive(Debug, Default)]
struct SharedState {
    mirror: TaskMirror,
    polls: PollRegistry,
}

struct Inner {
    service: Arc<dyn TaskService>,
    observer: Arc<dyn ReconcilerObserver>,
    config: ReconcilerConfig,
    // Never held across an await.
    state: Mutex<SharedState>,
    shutdown: CancellationToken,
    loading: AtomicUsize,
}

/// Outcome of applying one poll fetch.
enum PollStep {
    Continue,
    Backoff(Duration),
    Stop,
}

/// Keeps a local mirror of remote tasks and polls active ones to convergence.
///
/// Polls run as tokio tasks, so constructing a reconciler and starting polls
/// requires a tokio runtime. Dropping the reconciler cancels every poll.
pub struct TaskReconciler {
    inner: Arc<Inner>,
}

impl TaskReconciler {
    /// Reconciler that reports through `tracing`.
    pub fn new(service: Arc<dyn TaskService>, config: ReconcilerConfig) -> Self {
        Self::with_observer(service, config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        service: Arc<dyn TaskService>,
        config: ReconcilerConfig,
        observer: Arc<dyn ReconcilerObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                observer,
                config,
                state: Mutex::new(SharedState::default()),
                shutdown: CancellationToken::new(),
                loading: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.inner.config
    }

    /// Upload a video; on success it becomes the newest task and the current one.
    pub async fn create(&self, file: UploadFile) -> Result<Task> {
        let _loading = LoadingGuard::enter(&self.inner.loading);
        let task = self
            .inner
            .remote(RemoteCommand::Upload, None, self.inner.service.upload(file))
            .await?;

        self.inner.lock().mirror.insert_created(task.clone());
        self.inner.emit(ReconcileEvent::TaskCreated {
            task_id: task.id.clone(),
            status: task.status,
        });
        self.inner.emit(ReconcileEvent::CurrentTaskChanged {
            task_id: Some(task.id.clone()),
        });
        Ok(task)
    }

    /// Ask the service to process `task_id`, then poll it until it settles.
    pub async fn start_processing(&self, task_id: &TaskId) -> Result<()> {
        self.inner
            .remote(
                RemoteCommand::StartProcessing,
                Some(task_id),
                self.inner.service.start_processing(task_id),
            )
            .await?;
        self.start_polling(task_id.clone());
        Ok(())
    }

    /// Refresh one task. Only ids already in the mirror are updated.
    pub async fn fetch(&self, task_id: &TaskId) -> Result<Task> {
        self.inner.fetch(task_id).await
    }

    /// Replace the mirror's task list with the service listing.
    pub async fn list_all(&self) -> Result<Vec<Task>> {
        let _loading = LoadingGuard::enter(&self.inner.loading);
        let listing = self
            .inner
            .remote(RemoteCommand::ListAll, None, self.inner.service.list_tasks())
            .await?;

        let (tasks, current_before, current_after) = {
            let mut state = self.inner.lock();
            let before = state.mirror.current().map(|task| task.id.clone());
            state
                .mirror
                .replace_all(listing, self.inner.config.refresh_current_on_list);
            let after = state.mirror.current().map(|task| task.id.clone());
            (state.mirror.tasks().to_vec(), before, after)
        };

        self.inner.emit(ReconcileEvent::TasksListed { count: tasks.len() });
        if current_before != current_after {
            self.inner.emit(ReconcileEvent::CurrentTaskChanged {
                task_id: current_after,
            });
        }
        Ok(tasks)
    }

    /// Send a subtitle edit, then refresh the task. A failed edit skips the refresh.
    pub async fn submit_edit(&self, task_id: &TaskId, content: &Value) -> Result<Task> {
        self.inner
            .remote(
                RemoteCommand::SubmitEdit,
                Some(task_id),
                self.inner.service.submit_subtitle(task_id, content),
            )
            .await?;
        self.inner.emit(ReconcileEvent::EditSubmitted {
            task_id: task_id.clone(),
        });
        self.inner.fetch(task_id).await
    }

    /// Last known copy of `task_id`, fetched from the service when the
    /// mirror does not hold it.
    pub async fn latest_task(&self, task_id: &TaskId) -> Result<Task> {
        let known = {
            let state = self.inner.lock();
            match state.mirror.current() {
                Some(task) if &task.id == task_id => Some(task.clone()),
                _ => state.mirror.get(task_id).cloned(),
            }
        };
        match known {
            Some(task) => Ok(task),
            None => self.inner.fetch(task_id).await,
        }
    }

    /// Run a diagnostic probe; the mirror is not touched.
    pub async fn diagnose(&self, probe: Diagnostic) -> Result<Value> {
        let task_id = match &probe {
            Diagnostic::ExtractAudio(id)
            | Diagnostic::Transcribe(id)
            | Diagnostic::FullPipeline(id)
            | Diagnostic::Validate(id) => Some(id.clone()),
            Diagnostic::ServiceStatus | Diagnostic::FfmpegStatus => None,
        };
        self.inner
            .remote(
                RemoteCommand::Diagnostic,
                task_id.as_ref(),
                self.inner.service.diagnose(&probe),
            )
            .await
    }

    pub async fn extract_audio(&self, task_id: &TaskId) -> Result<Value> {
        self.diagnose(Diagnostic::ExtractAudio(task_id.clone())).await
    }

    pub async fn transcribe(&self, task_id: &TaskId) -> Result<Value> {
        self.diagnose(Diagnostic::Transcribe(task_id.clone())).await
    }

    pub async fn service_status(&self) -> Result<Value> {
        self.diagnose(Diagnostic::ServiceStatus).await
    }

    /// Start polling `task_id`, replacing any poll already running for it.
    ///
    /// Returns false once the reconciler has been shut down.
    pub fn start_polling(&self, task_id: TaskId) -> bool {
        if self.inner.shutdown.is_cancelled() {
            return false;
        }

        let (epoch, superseded) = {
            let mut state = self.inner.lock();
            let epoch = state.polls.next_epoch();
            let token = self.inner.shutdown.child_token();
            let previous = state
                .polls
                .insert(task_id.clone(), PollHandle::new(epoch, token.clone()));

            let task = tokio::spawn(run_poll(
                Arc::clone(&self.inner),
                task_id.clone(),
                epoch,
                token,
            ));
            if let Some(handle) = state.polls.get_mut(&task_id) {
                handle.attach(task);
            }
            (epoch, previous.map(|handle| handle.epoch))
        };

        if let Some(old_epoch) = superseded {
            self.inner.emit(ReconcileEvent::PollStopped {
                task_id: task_id.clone(),
                epoch: old_epoch,
                reason: StopReason::Superseded,
            });
        }
        self.inner.emit(ReconcileEvent::PollStarted { task_id, epoch });
        true
    }

    /// Stop polling `task_id`. Returns false if no poll was active.
    pub fn stop_polling(&self, task_id: &TaskId) -> bool {
        let removed = self.inner.lock().polls.remove(task_id);
        match removed {
            Some(handle) => {
                self.inner.emit(ReconcileEvent::PollStopped {
                    task_id: task_id.clone(),
                    epoch: handle.epoch,
                    reason: StopReason::Cancelled,
                });
                true
            }
            None => false,
        }
    }

    /// Stop every active poll, returning how many were stopped.
    pub fn stop_all_polling(&self) -> usize {
        let drained = self.inner.lock().polls.drain();
        let count = drained.len();
        for (task_id, handle) in drained {
            self.inner.emit(ReconcileEvent::PollStopped {
                task_id,
                epoch: handle.epoch,
                reason: StopReason::Cancelled,
            });
        }
        count
    }

    /// Stop all polls and refuse new ones.
    pub fn shutdown(&self) {
        self.stop_all_polling();
        self.inner.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Pure local assignment; no remote call and no membership check.
    pub fn set_current_task(&self, task: Option<Task>) {
        let task_id = task.as_ref().map(|task| task.id.clone());
        self.inner.lock().mirror.set_current(task);
        self.inner.emit(ReconcileEvent::CurrentTaskChanged { task_id });
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().mirror.tasks().to_vec()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.inner.lock().mirror.get(task_id).cloned()
    }

    pub fn current_task(&self) -> Option<Task> {
        self.inner.lock().mirror.current().cloned()
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.tasks_with_status(TaskStatus::Completed)
    }

    pub fn processing_tasks(&self) -> Vec<Task> {
        self.tasks_with_status(TaskStatus::Processing)
    }

    fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        self.inner
            .lock()
            .mirror
            .with_status(status)
            .cloned()
            .collect()
    }

    pub fn is_polling(&self, task_id: &TaskId) -> bool {
        self.inner.lock().polls.contains(task_id)
    }

    /// Ids with an active poll, sorted.
    pub fn active_polls(&self) -> Vec<TaskId> {
        self.inner.lock().polls.ids()
    }

    /// True while an upload or a full listing is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst) > 0
    }
}

impl Drop for TaskReconciler {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ReconcileEvent) {
        self.observer.on_event(&event);
    }

    /// Await a remote call, reporting and classifying a failure.
    async fn remote<T, F>(
        &self,
        command: RemoteCommand,
        task_id: Option<&TaskId>,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = vidsub_adapter::Result<T>>,
    {
        call.await.map_err(|err| self.command_failed(command, task_id, err))
    }

    fn command_failed(
        &self,
        command: RemoteCommand,
        task_id: Option<&TaskId>,
        err: AdapterError,
    ) -> RemoteCommandError {
        let err = RemoteCommandError::from_adapter(command, err);
        self.emit(ReconcileEvent::CommandFailed {
            command,
            task_id: task_id.cloned(),
            error: err.message.clone(),
        });
        err
    }

    async fn fetch(&self, task_id: &TaskId) -> Result<Task> {
        let task = self
            .remote(
                RemoteCommand::Fetch,
                Some(task_id),
                self.service.fetch_task(task_id),
            )
            .await?;
        let in_mirror = self.lock().mirror.reconcile(task.clone());
        self.emit(ReconcileEvent::TaskRefreshed {
            task_id: task.id.clone(),
            status: task.status,
            in_mirror,
        });
        Ok(task)
    }

    /// Apply one poll fetch, provided the poll that issued it is still current.
    fn apply_poll_result(
        &self,
        task_id: &TaskId,
        epoch: u64,
        result: vidsub_adapter::Result<Task>,
        failures: &mut u32,
    ) -> PollStep {
        let mut state = self.lock();
        if !state.polls.is_current(task_id, epoch) {
            drop(state);
            self.emit(ReconcileEvent::StaleResponseDiscarded {
                task_id: task_id.clone(),
                epoch,
            });
            return PollStep::Stop;
        }

        match result {
            Ok(task) => {
                *failures = 0;
                let status = task.status;
                let in_mirror = state.mirror.reconcile(task);
                let terminal = status.is_terminal();
                if terminal {
                    state.polls.remove_if_current(task_id, epoch);
                }
                drop(state);

                self.emit(ReconcileEvent::TaskRefreshed {
                    task_id: task_id.clone(),
                    status,
                    in_mirror,
                });
                if terminal {
                    self.emit(ReconcileEvent::PollStopped {
                        task_id: task_id.clone(),
                        epoch,
                        reason: StopReason::Terminal(status),
                    });
                    PollStep::Stop
                } else {
                    PollStep::Continue
                }
            }
            Err(err) => {
                let err = RemoteCommandError::from_adapter(RemoteCommand::Fetch, err);
                let policy = &self.config.retry;
                if err.is_transient() && *failures < policy.max_transient_retries {
                    *failures += 1;
                    let delay = policy.backoff(*failures);
                    drop(state);
                    self.emit(ReconcileEvent::PollRetrying {
                        task_id: task_id.clone(),
                        epoch,
                        attempt: *failures,
                        delay,
                        error: err.message,
                    });
                    return PollStep::Backoff(delay);
                }

                state.polls.remove_if_current(task_id, epoch);
                drop(state);
                self.emit(ReconcileEvent::CommandFailed {
                    command: RemoteCommand::Fetch,
                    task_id: Some(task_id.clone()),
                    error: err.message.clone(),
                });
                self.emit(ReconcileEvent::PollStopped {
                    task_id: task_id.clone(),
                    epoch,
                    reason: StopReason::FetchFailed(err.message),
                });
                PollStep::Stop
            }
        }
    }

    /// Drop the registry entry of a poll that exits on cancellation.
    fn release(&self, task_id: &TaskId, epoch: u64) {
        self.lock().polls.remove_if_current(task_id, epoch);
    }
}

/// Poll loop for one task id and one epoch.
///
/// Each fetch is awaited before the next tick is taken and missed ticks are
/// skipped, so a slow service never sees overlapping fetches for the same id.
async fn run_poll(inner: Arc<Inner>, task_id: TaskId, epoch: u64, shutdown: CancellationToken) {
    let period = inner.config.poll_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failures = 0u32;
    let mut retry_now = false;

    loop {
        if !retry_now {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }
        retry_now = false;

        debug!(task_id = %task_id, epoch, "poll tick");
        let result = inner.service.fetch_task(&task_id).await;
        match inner.apply_poll_result(&task_id, epoch, result, &mut failures) {
            PollStep::Continue => {}
            PollStep::Stop => return,
            PollStep::Backoff(delay) => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(delay) => retry_now = true,
                }
            }
        }
    }

    inner.release(&task_id, epoch);
}

struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
