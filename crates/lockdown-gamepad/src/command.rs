use std::time::Duration;

use crate::binding::Binding;
use crate::binding_set::BindingSet;
use crate::events::{DeviceHandler, HandlerSlot};
use crate::types::NativeId;

/// Internal commands sent to the hook thread. Applied between ticks.
pub(crate) enum Command {
    SetHandler { slot: HandlerSlot, handler: Option<DeviceHandler> },
    SetSleepTime(Duration),
    SetPlugAndPlay { enabled: bool, interval: Duration },
    SetAxisDeadzone(f32),
    SetBindings(BindingSet),
    Rebind { id: NativeId, binding: Binding },
    Stop,
}
