use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lockdown_gamepad::DEFAULT_AXIS_DEADZONE;

/// Locks the session after a period without keyboard, mouse or gamepad input.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Minutes of inactivity before locking
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub minutes: u64,

    /// Gamepad poll interval in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_ms: u64,

    /// Gamepad rescan interval in milliseconds, 0 disables hot-plug detection
    #[arg(long, default_value_t = 1000)]
    pub pnp_ms: u64,

    /// Axis dead zone in 0.0..=1.0
    #[arg(long, default_value_t = DEFAULT_AXIS_DEADZONE)]
    pub deadzone: f32,

    /// YAML file with gamepad bindings
    #[arg(short, long)]
    pub bindings: Option<PathBuf>,

    /// Shell command that locks the session
    #[arg(long)]
    pub lock_command: Option<String>,

    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.minutes.saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// `None` when hot-plug detection is disabled.
    pub fn rescan_interval(&self) -> Option<Duration> {
        (self.pnp_ms > 0).then(|| Duration::from_millis(self.pnp_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["lockdownd"]).expect("defaults parse");
        assert_eq!(cli.idle_timeout(), Duration::from_secs(300));
        assert_eq!(cli.poll_interval(), Duration::from_millis(100));
        assert_eq!(cli.rescan_interval(), Some(Duration::from_millis(1000)));
        assert_eq!(cli.deadzone, DEFAULT_AXIS_DEADZONE);
        assert!(cli.bindings.is_none());
        assert!(cli.lock_command.is_none());
    }

    #[test]
    fn zero_rescan_interval_disables_hot_plug() {
        let cli = Cli::try_parse_from(["lockdownd", "--pnp-ms", "0"]).expect("parse");
        assert_eq!(cli.rescan_interval(), None);
    }

    #[test]
    fn zero_minutes_is_rejected() {
        assert!(Cli::try_parse_from(["lockdownd", "--minutes", "0"]).is_err());
    }

    #[test]
    fn full_command_line() {
        let cli = Cli::try_parse_from([
            "lockdownd",
            "-m",
            "2",
            "--poll-ms",
            "50",
            "--deadzone",
            "0.25",
            "-b",
            "pads.yaml",
            "--lock-command",
            "loginctl lock-session",
            "-v",
        ])
        .expect("parse");
        assert_eq!(cli.idle_timeout(), Duration::from_secs(120));
        assert_eq!(cli.poll_interval(), Duration::from_millis(50));
        assert_eq!(cli.deadzone, 0.25);
        assert_eq!(cli.bindings, Some(PathBuf::from("pads.yaml")));
        assert_eq!(cli.lock_command.as_deref(), Some("loginctl lock-session"));
        assert!(cli.verbose);
    }
}
