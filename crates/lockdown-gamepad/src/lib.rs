//! Gamepad hook: polls game controllers on a background thread, maps native
//! buttons and axes to virtual codes through per-device bindings and reports
//! changes, connections and disconnections to host callbacks.

mod backend;
mod binding;
mod binding_set;
mod calibration;
mod command;
mod config;
mod device;
mod error;
mod events;
mod hook;
mod runtime;
mod types;

#[cfg(feature = "sdl2-backend")]
pub use crate::backend::Sdl2Backend;
pub use crate::backend::{Backend, BackendFactory};
pub use crate::binding::{Binding, Mappings, HAT_BASE};
pub use crate::binding_set::BindingSet;
pub use crate::calibration::{apply_deadzone, normalize_axis, DEFAULT_AXIS_DEADZONE};
pub use crate::config::HookConfig;
pub use crate::device::Device;
pub use crate::error::{BackendError, BindingError, Error, Result};
pub use crate::events::{ControlKind, DeviceHandler, HandlerSlot, InputEvent};
pub use crate::hook::{Hook, RunState};
pub use crate::types::{
    Axis, Button, DeviceKind, NativeCode, NativeDevice, NativeId, RawState, VirtualCode,
};
