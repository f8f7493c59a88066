/*
[INPUT]:  Tasks returned by upload, fetch and list calls
[OUTPUT]: Ordered, id-unique local copy of remote tasks plus the current task
[POS]:    State layer - the mirror owned by TaskReconciler
[UPDATE]: When changing reconciliation or ordering rules
*/

use std::collections::HashSet;
use vidsub_adapter::{Task, TaskId, TaskStatus};

/// Local, possibly stale copy of remote task state.
///
/// `tasks` is newest-first and never holds two entries with the same id.
#[derive(Debug, Default, Clone)]
pub struct TaskMirror {
    tasks: Vec<Task>,
    current: Option<Task>,
}

impl TaskMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn current(&self) -> Option<&Task> {
        self.current.as_ref()
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == task_id)
    }

    pub fn position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Insert a newly created task at the front and make it current.
    pub fn insert_created(&mut self, task: Task) {
        if let Some(index) = self.position(&task.id) {
            self.tasks.remove(index);
        }
        self.current = Some(task.clone());
        self.tasks.insert(0, task);
    }

    /// Overwrite the entry with the same id in place; unseen ids are not appended.
    ///
    /// Returns whether the id was present in `tasks`.
    pub fn reconcile(&mut self, task: Task) -> bool {
        if self.current.as_ref().is_some_and(|current| current.id == task.id) {
            self.current = Some(task.clone());
        }
        match self.position(&task.id) {
            Some(index) => {
                self.tasks[index] = task;
                true
            }
            None => false,
        }
    }

    /// Replace all tasks with a remote listing, keeping remote order.
    ///
    /// Duplicate ids keep their first occurrence. A current task whose id is no
    /// longer listed is cleared; a listed one is refreshed only on request.
    pub fn replace_all(&mut self, listing: Vec<Task>, refresh_current: bool) {
        let mut seen = HashSet::with_capacity(listing.len());
        self.tasks = listing
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect();

        let Some(current_id) = self.current.as_ref().map(|task| task.id.clone()) else {
            return;
        };
        match self.get(&current_id) {
            None => self.current = None,
            Some(listed) if refresh_current => self.current = Some(listed.clone()),
            Some(_) => {}
        }
    }

    /// Plain assignment; membership in `tasks` is not checked.
    pub fn set_current(&mut self, task: Option<Task>) {
        self.current = task;
    }

    pub fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.status == status)
    }
}
