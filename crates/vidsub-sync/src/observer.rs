/*
[INPUT]:  Reconciler transitions, poll lifecycle changes and command failures
[OUTPUT]: Events delivered to pluggable sinks (tracing, channel, fan-out)
[POS]:    Observability layer - decouples the reconciler from presentation
[UPDATE]: When adding reconciler events or new sinks
*/

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vidsub_adapter::{TaskId, TaskStatus};

use crate::error::RemoteCommand;

/// Why a poll left the POLLING state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Remote status became COMPLETED or FAILED
    Terminal(TaskStatus),
    /// A fetch failed and the retry budget was exhausted
    FetchFailed(String),
    /// `stop_polling`, `stop_all_polling` or shutdown
    Cancelled,
    /// A new poll for the same id replaced this one
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    TaskCreated {
        task_id: TaskId,
        status: TaskStatus,
    },
    TaskRefreshed {
        task_id: TaskId,
        status: TaskStatus,
        in_mirror: bool,
    },
    TasksListed {
        count: usize,
    },
    CurrentTaskChanged {
        task_id: Option<TaskId>,
    },
    EditSubmitted {
        task_id: TaskId,
    },
    PollStarted {
        task_id: TaskId,
        epoch: u64,
    },
    PollRetrying {
        task_id: TaskId,
        epoch: u64,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    PollStopped {
        task_id: TaskId,
        epoch: u64,
        reason: StopReason,
    },
    /// Response of a poll that was stopped or replaced while the fetch was in flight
    StaleResponseDiscarded {
        task_id: TaskId,
        epoch: u64,
    },
    CommandFailed {
        command: RemoteCommand,
        task_id: Option<TaskId>,
        error: String,
    },
}

/// Sink for reconciler events. Called outside the reconciler's lock.
pub trait ReconcilerObserver: Send + Sync + 'static {
    fn on_event(&self, event: &ReconcileEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReconcilerObserver for NoopObserver {
    fn on_event(&self, _event: &ReconcileEvent) {}
}

/// Logs events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReconcilerObserver for TracingObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::TaskCreated { task_id, status } => {
                info!(task_id = %task_id, %status, "task created");
            }
            ReconcileEvent::TaskRefreshed {
                task_id,
                status,
                in_mirror,
            } => {
                debug!(task_id = %task_id, %status, in_mirror, "task refreshed");
            }
            ReconcileEvent::TasksListed { count } => {
                info!(count, "task list replaced");
            }
            ReconcileEvent::CurrentTaskChanged { task_id } => {
                debug!(task_id = ?task_id.as_ref().map(TaskId::as_str), "current task changed");
            }
            ReconcileEvent::EditSubmitted { task_id } => {
                info!(task_id = %task_id, "subtitle edit submitted");
            }
            ReconcileEvent::PollStarted { task_id, epoch } => {
                info!(task_id = %task_id, epoch, "poll started");
            }
            ReconcileEvent::PollRetrying {
                task_id,
                epoch,
                attempt,
                delay,
                error,
            } => {
                warn!(task_id = %task_id, epoch, attempt, ?delay, error = %error, "poll fetch failed, retrying");
            }
            ReconcileEvent::PollStopped {
                task_id,
                epoch,
                reason,
            } => match reason {
                StopReason::FetchFailed(error) => {
                    warn!(task_id = %task_id, epoch, error = %error, "poll stopped after fetch failure");
                }
                other => info!(task_id = %task_id, epoch, reason = ?other, "poll stopped"),
            },
            ReconcileEvent::StaleResponseDiscarded { task_id, epoch } => {
                warn!(task_id = %task_id, epoch, "discarded stale poll response");
            }
            ReconcileEvent::CommandFailed {
                command,
                task_id,
                error,
            } => {
                warn!(%command, task_id = ?task_id.as_ref().map(TaskId::as_str), error = %error, "remote command failed");
            }
        }
    }
}

/// Forwards events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ReconcileEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReconcilerObserver for ChannelObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Delivers each event to every inner observer in order
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn ReconcilerObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn ReconcilerObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl ReconcilerObserver for FanoutObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_event(&ReconcileEvent::TasksListed { count: 2 });
        assert_eq!(rx.try_recv().ok(), Some(ReconcileEvent::TasksListed { count: 2 }));
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_event(&ReconcileEvent::TasksListed { count: 0 });
    }

    #[test]
    fn test_fanout_delivers_to_all() {
        let (first, mut first_rx) = ChannelObserver::new();
        let (second, mut second_rx) = ChannelObserver::new();
        let fanout = FanoutObserver::new()
            .with(Arc::new(first))
            .with(Arc::new(TracingObserver))
            .with(Arc::new(second));

        let event = ReconcileEvent::EditSubmitted {
            task_id: TaskId::new("t1"),
        };
        fanout.on_event(&event);

        assert_eq!(first_rx.try_recv().ok(), Some(event.clone()));
        assert_eq!(second_rx.try_recv().ok(), Some(event));
    }
}
