use std::time::Duration;

use crate::binding_set::BindingSet;
use crate::calibration::DEFAULT_AXIS_DEADZONE;

/// Hook configuration.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Pause between two ticks.
    pub sleep_time: Duration,
    /// Rescan for devices periodically. When off, devices are only
    /// enumerated on the first tick.
    pub plug_and_play: bool,
    /// Minimum time between two device scans.
    pub plug_and_play_interval: Duration,
    /// Dead zone for every axis of newly connected devices.
    pub axis_deadzone: f32,
    /// How long `start` waits for the backend to open.
    pub start_timeout: Duration,
    /// Per-device bindings. Devices without an entry use the default
    /// table of their kind.
    pub bindings: BindingSet,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            sleep_time: Duration::from_millis(100),
            plug_and_play: true,
            plug_and_play_interval: Duration::from_millis(1000),
            axis_deadzone: DEFAULT_AXIS_DEADZONE,
            start_timeout: Duration::from_secs(5),
            bindings: BindingSet::new(),
        }
    }
}
