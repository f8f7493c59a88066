/*
[INPUT]:  Public API exports for vidsub-sync crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod error;
pub mod mirror;
pub mod observer;
mod poll;
pub mod reconciler;
pub mod service;

// Re-export main types for convenience
pub use config::{ConfigError, HttpConfig, ReconcilerConfig, RetryPolicy, SyncConfig};
pub use error::{RemoteCommand, RemoteCommandError, RemoteErrorKind};
pub use mirror::TaskMirror;
pub use observer::{
    ChannelObserver, FanoutObserver, NoopObserver, ReconcileEvent, ReconcilerObserver, StopReason,
    TracingObserver,
};
pub use reconciler::TaskReconciler;
pub use service::{Diagnostic, TaskService};
