/*
[INPUT]:  Poll start/stop requests keyed by task id
[OUTPUT]: At most one live poll handle per id, each tagged with an epoch
[POS]:    State layer - active poll bookkeeping for TaskReconciler
[UPDATE]: When changing poll cancellation or generation semantics
*/

use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vidsub_adapter::TaskId;

#[derive(Debug)]
pub(crate) struct PollHandle {
    pub(crate) epoch: u64,
    shutdown: CancellationToken,
    // Dropping a JoinHandle detaches; cancellation goes through the token.
    _task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub(crate) fn new(epoch: u64, shutdown: CancellationToken) -> Self {
        Self {
            epoch,
            shutdown,
            _task: None,
        }
    }

    pub(crate) fn attach(&mut self, task: JoinHandle<()>) {
        self._task = Some(task);
    }

    /// Stop future ticks. A fetch already in flight still completes and is
    /// rejected by the epoch check.
    pub(crate) fn cancel(&self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Default)]
pub(crate) struct PollRegistry {
    handles: HashMap<TaskId, PollHandle>,
    next_epoch: u64,
}

impl PollRegistry {
    pub(crate) fn next_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    /// Register a handle, returning the one it replaced (already cancelled).
    pub(crate) fn insert(&mut self, task_id: TaskId, handle: PollHandle) -> Option<PollHandle> {
        let previous = self.handles.insert(task_id, handle);
        if let Some(previous) = &previous {
            previous.cancel();
        }
        previous
    }

    pub(crate) fn get_mut(&mut self, task_id: &TaskId) -> Option<&mut PollHandle> {
        self.handles.get_mut(task_id)
    }

    pub(crate) fn is_current(&self, task_id: &TaskId, epoch: u64) -> bool {
        self.handles
            .get(task_id)
            .is_some_and(|handle| handle.epoch == epoch)
    }

    pub(crate) fn contains(&self, task_id: &TaskId) -> bool {
        self.handles.contains_key(task_id)
    }

    /// Remove and cancel the handle for `task_id`, if any.
    pub(crate) fn remove(&mut self, task_id: &TaskId) -> Option<PollHandle> {
        let handle = self.handles.remove(task_id)?;
        handle.cancel();
        Some(handle)
    }

    /// Remove the handle only if it still belongs to `epoch`.
    pub(crate) fn remove_if_current(&mut self, task_id: &TaskId, epoch: u64) -> bool {
        if self.is_current(task_id, epoch) {
            self.remove(task_id);
            true
        } else {
            false
        }
    }

    pub(crate) fn drain(&mut self) -> Vec<(TaskId, PollHandle)> {
        let drained: Vec<(TaskId, PollHandle)> = self.handles.drain().collect();
        for (_, handle) in &drained {
            handle.cancel();
        }
        drained
    }

    pub(crate) fn ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.handles.keys().cloned().collect();
        ids.sort();
        ids
    }
}
