use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to read bindings from {path}: {source}")]
    ReadBindings {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid bindings in {path}: {source}")]
    Bindings {
        path: PathBuf,
        source: lockdown_gamepad::BindingError,
    },
    #[error("gamepad hook: {0}")]
    Hook(#[from] lockdown_gamepad::Error),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to run lock command: {0}")]
    LockSpawn(std::io::Error),
    #[error("lock command exited with {status}: {stderr}")]
    LockFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}
