use thiserror::Error;

use crate::types::{NativeCode, NativeId};

/// Error type for hook lifecycle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to acquire the native backend.
    #[error("backend init failed: {0}")]
    BackendInit(String),
    /// `start` was called on a hook that is already running.
    #[error("hook is already running")]
    AlreadyRunning,
    /// The hook was stopped. A stopped hook cannot be restarted.
    #[error("hook is stopped")]
    Stopped,
    /// The operation needs a running hook.
    #[error("hook is not running")]
    NotRunning,
    /// Requested device is not in the live set.
    #[error("device not found: {0}")]
    NotFound(NativeId),
    /// The hook thread could not be spawned.
    #[error("failed to spawn hook thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Convenient result alias for hook operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a native backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend cannot be used at all. Fatal when opening.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// A single call failed. Retried on the next tick.
    #[error("transient backend error: {0}")]
    Transient(String),
}

/// Errors produced while loading or saving binding documents.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("binding document error: {0}")]
    Document(#[from] serde_yaml::Error),
    #[error("native code {code} is mapped twice in {section}")]
    DuplicateCode { section: &'static str, code: NativeCode },
    #[error("unknown binding: {0}")]
    UnknownBinding(String),
}
