use std::process::Command;

use colored::Colorize;

use crate::error::AppError;
use crate::{print_debug, print_warning};

#[cfg(windows)]
const DEFAULT_SHELL: (&str, &str) = ("cmd", "/C");
#[cfg(not(windows))]
const DEFAULT_SHELL: (&str, &str) = ("/bin/sh", "-c");

/// Locks the session by running a shell command.
pub(crate) struct Locker {
    command: Option<Box<str>>,
    shell: Box<str>,
    shell_flag: &'static str,
}

impl Locker {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.map(String::into_boxed_str),
            shell: DEFAULT_SHELL.0.into(),
            shell_flag: DEFAULT_SHELL.1,
        }
    }

    /// Runs the lock command. Without one, only reports that the session
    /// would have been locked.
    pub fn lock(&self) -> Result<(), AppError> {
        let Some(command) = self.command.as_deref() else {
            print_warning!("idle timeout reached, no lock command configured");
            return Ok(());
        };

        let output = Command::new(&*self.shell)
            .args([self.shell_flag, command])
            .output()
            .map_err(AppError::LockSpawn)?;
        if !output.status.success() {
            return Err(AppError::LockFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        print_debug!(
            "lock command output: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    #[cfg(test)]
    pub fn set_shell(&mut self, shell: Box<str>) {
        self.shell = shell;
    }
}
