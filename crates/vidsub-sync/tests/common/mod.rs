/*
[INPUT]:  Scripted remote responses and reconciler events
[OUTPUT]: Fake TaskService, recording observer and wait helpers
[POS]:    Test infrastructure - shared across reconciler test modules
[UPDATE]: When TaskService or ReconcileEvent change
*/

//! Common test utilities for vidsub-sync tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidsub_adapter::{AdapterError, Result, Task, TaskId, TaskStatus, UploadFile};
use vidsub_sync::{
    Diagnostic, ReconcileEvent, ReconcilerConfig, ReconcilerObserver, TaskReconciler, TaskService,
};

pub fn task(id: &str, status: TaskStatus) -> Task {
    Task::new(id, status)
}

pub fn api_error(code: i32, message: &str) -> AdapterError {
    AdapterError::Api {
        code,
        message: message.to_string(),
    }
}

pub fn transport_error() -> AdapterError {
    AdapterError::Timeout { duration: 30 }
}

/// TaskService that replays scripted responses.
///
/// Fetch scripts are per id; once a script runs dry the last successful task
/// for that id is repeated.
#[derive(Default)]
pub struct ScriptedService {
    uploads: Mutex<VecDeque<Result<Task>>>,
    processing: Mutex<VecDeque<Result<()>>>,
    fetches: Mutex<HashMap<TaskId, VecDeque<Result<Task>>>>,
    last_fetched: Mutex<HashMap<TaskId, Task>>,
    listings: Mutex<VecDeque<Result<Vec<Task>>>>,
    edits: Mutex<VecDeque<Result<()>>>,
    edited: Mutex<Vec<(TaskId, Value)>>,
    fetch_delay: Mutex<Duration>,
    upload_delay: Mutex<Duration>,
    pub fetch_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_upload(&self, result: Result<Task>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn push_processing(&self, result: Result<()>) {
        self.processing.lock().unwrap().push_back(result);
    }

    pub fn push_fetch(&self, id: &str, result: Result<Task>) {
        self.fetches
            .lock()
            .unwrap()
            .entry(TaskId::new(id))
            .or_default()
            .push_back(result);
    }

    pub fn push_listing(&self, result: Result<Vec<Task>>) {
        self.listings.lock().unwrap().push_back(result);
    }

    pub fn push_edit(&self, result: Result<()>) {
        self.edits.lock().unwrap().push_back(result);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = delay;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn edited(&self) -> Vec<(TaskId, Value)> {
        self.edited.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskService for ScriptedService {
    async fn upload(&self, _file: UploadFile) -> Result<Task> {
        let delay = *self.upload_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let next = self.uploads.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(api_error(500, "no scripted upload")))
    }

    async fn start_processing(&self, _task_id: &TaskId) -> Result<()> {
        let next = self.processing.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn fetch_task(&self, task_id: &TaskId) -> Result<Task> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .fetches
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front);
        let result = match scripted {
            Some(result) => result,
            None => match self.last_fetched.lock().unwrap().get(task_id) {
                Some(task) => Ok(task.clone()),
                None => Err(api_error(500, "获取任务状态失败: 任务不存在")),
            },
        };
        if let Ok(task) = &result {
            self.last_fetched
                .lock()
                .unwrap()
                .insert(task_id.clone(), task.clone());
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let next = self.listings.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submit_subtitle(&self, task_id: &TaskId, content: &Value) -> Result<()> {
        let next = self.edits.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if next.is_ok() {
            self.edited
                .lock()
                .unwrap()
                .push((task_id.clone(), content.clone()));
        }
        next
    }

    async fn diagnose(&self, probe: &Diagnostic) -> Result<Value> {
        Ok(Value::String(format!("{probe:?}")))
    }
}

/// Observer that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&ReconcileEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl ReconcilerObserver for RecordingObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Reconciler with the default 2s cadence wired to a scripted service
pub fn reconciler_with(
    service: &Arc<ScriptedService>,
    config: ReconcilerConfig,
) -> (TaskReconciler, Arc<RecordingObserver>) {
    let observer = RecordingObserver::new();
    let reconciler = TaskReconciler::with_observer(service.clone(), config, observer.clone());
    (reconciler, observer)
}

/// Poll `condition` every 10ms (virtual time under a paused clock) until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
