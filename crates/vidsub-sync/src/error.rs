/*
[INPUT]:  Adapter errors raised by remote task service calls
[OUTPUT]: RemoteCommandError carrying the command, failure class and message
[POS]:    Error handling layer - what crosses the reconciler boundary
[UPDATE]: When adding remote commands or changing error classification
*/

use std::fmt;
use thiserror::Error;
use vidsub_adapter::AdapterError;

/// Remote command issued by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Upload,
    StartProcessing,
    Fetch,
    ListAll,
    SubmitEdit,
    Diagnostic,
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteCommand::Upload => "upload",
            RemoteCommand::StartProcessing => "start processing",
            RemoteCommand::Fetch => "fetch task",
            RemoteCommand::ListAll => "list tasks",
            RemoteCommand::SubmitEdit => "submit edit",
            RemoteCommand::Diagnostic => "diagnostic",
        };
        f.write_str(name)
    }
}

/// Failure class of a remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connection failure, timeout or a response without an envelope
    Transport,
    /// Envelope with a non-zero code
    Application { code: i32 },
    /// Envelope arrived but could not be decoded, or the request could not be built
    Protocol,
}

/// Error surfaced by every reconciler command
#[derive(Debug, Clone, Error)]
#[error("{command} failed: {message}")]
pub struct RemoteCommandError {
    pub command: RemoteCommand,
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteCommandError {
    pub fn new(command: RemoteCommand, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            command,
            kind,
            message: message.into(),
        }
    }

    /// Classify an adapter failure, keeping the server message when one was sent.
    pub fn from_adapter(command: RemoteCommand, err: AdapterError) -> Self {
        let kind = match &err {
            AdapterError::Api { code, .. } => RemoteErrorKind::Application { code: *code },
            AdapterError::InvalidResponse(_) => RemoteErrorKind::Transport,
            _ if err.is_transport() => RemoteErrorKind::Transport,
            _ => RemoteErrorKind::Protocol,
        };
        let message = match err.server_message() {
            Some(message) => message.to_string(),
            None => err.to_string(),
        };
        Self::new(command, kind, message)
    }

    /// Worth retrying: the service never answered this request.
    pub fn is_transient(&self) -> bool {
        self.kind == RemoteErrorKind::Transport
    }
}
