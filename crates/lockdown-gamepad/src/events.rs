use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::device::Device;
use crate::types::{Axis, Button, NativeCode, VirtualCode};

/// Kind of control an event was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Axis,
}

/// A single input change after mapping through a binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub kind: ControlKind,
    /// Native code of the control.
    pub native_id: NativeCode,
    /// Virtual code the binding mapped the control to.
    pub vc: VirtualCode,
    /// Raw value: `0`/`1` for buttons, the `i16` reading for axes.
    pub value: i32,
    /// `0.0`/`1.0` for buttons, normalized and dead-zoned for axes.
    pub virtual_value: f32,
    /// Capture time (monotonic).
    pub at: Instant,
    /// Hook tick that produced the event.
    pub sequence: u64,
}

impl InputEvent {
    /// Whether this is a button press.
    pub fn is_pressed(&self) -> bool {
        self.kind == ControlKind::Button && self.virtual_value > 0.5
    }

    pub fn button(&self) -> Option<Button> {
        match self.kind {
            ControlKind::Button => Button::from_code(self.vc),
            ControlKind::Axis => None,
        }
    }

    pub fn axis(&self) -> Option<Axis> {
        match self.kind {
            ControlKind::Axis => Axis::from_code(self.vc),
            ControlKind::Button => None,
        }
    }
}

/// Host callback. Receives the device that triggered the event.
pub type DeviceHandler = Arc<dyn Fn(&Arc<Device>) + Send + Sync>;

/// The four callback slots of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerSlot {
    Button,
    Axis,
    Connect,
    Disconnect,
}

impl fmt::Display for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerSlot::Button => "button",
            HandlerSlot::Axis => "axis",
            HandlerSlot::Connect => "connect",
            HandlerSlot::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}
