use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Instant;

use smallvec::SmallVec;

use crate::backend::Backend;
use crate::binding::Binding;
use crate::calibration::{apply_deadzone, normalize_axis, Calibration, Candidate};
use crate::error::BackendError;
use crate::events::{ControlKind, InputEvent};
use crate::types::{DeviceKind, NativeDevice, NativeId};

/// A connected controller.
///
/// Handlers receive devices as `&Arc<Device>` and may keep them. The name,
/// id, kind, binding snapshot and last events stay readable after the
/// device has been disconnected; polling state is private to the hook.
#[derive(Debug)]
pub struct Device {
    id: NativeId,
    name: String,
    kind: DeviceKind,
    connected: AtomicBool,
    binding: RwLock<Binding>,
    last_button: RwLock<Option<InputEvent>>,
    last_axis: RwLock<Option<InputEvent>>,
    poll: Mutex<PollState>,
}

#[derive(Debug)]
struct PollState {
    calibration: Calibration,
    pending: SmallVec<[Candidate; 8]>,
}

impl Device {
    pub(crate) fn new(info: NativeDevice, binding: Binding, deadzone: f32) -> Self {
        Self {
            id: info.id,
            name: info.name,
            kind: info.kind,
            connected: AtomicBool::new(true),
            binding: RwLock::new(binding),
            last_button: RwLock::new(None),
            last_axis: RwLock::new(None),
            poll: Mutex::new(PollState {
                calibration: Calibration::new(deadzone),
                pending: SmallVec::new(),
            }),
        }
    }

    pub fn id(&self) -> NativeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// False once the hook has reported the device as disconnected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Snapshot of the binding currently in use.
    pub fn binding(&self) -> Binding {
        match self.binding.read() {
            Ok(binding) => binding.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The most recent button event, if any.
    pub fn last_button_event(&self) -> Option<InputEvent> {
        read_event(&self.last_button)
    }

    /// The most recent axis event, if any.
    pub fn last_axis_event(&self) -> Option<InputEvent> {
        read_event(&self.last_axis)
    }

    pub fn axis_deadzone(&self) -> f32 {
        self.poll_state().calibration.deadzone()
    }

    /// Reads this device's raw state and queues every control that changed.
    /// Returns the number of queued candidates.
    pub(crate) fn poll_raw(&self, backend: &mut dyn Backend) -> Result<usize, BackendError> {
        let state = backend.read_state(self.id)?;
        let mut poll = self.poll_state();
        let changed = poll.calibration.diff(&state);
        poll.pending.extend(changed);
        Ok(poll.pending.len())
    }

    /// Maps queued candidates through the binding. Controls without a
    /// mapping are dropped.
    pub(crate) fn apply_binding(
        &self,
        sequence: u64,
        at: Instant,
    ) -> SmallVec<[InputEvent; 8]> {
        let mut poll = self.poll_state();
        let deadzone = poll.calibration.deadzone();
        let binding = match self.binding.read() {
            Ok(binding) => binding,
            Err(poisoned) => poisoned.into_inner(),
        };

        poll.pending
            .drain(..)
            .filter_map(|candidate| {
                let (vc, virtual_value) = match candidate.kind {
                    ControlKind::Button => {
                        let vc = binding.button(candidate.native)?;
                        (vc, if candidate.raw != 0 { 1.0 } else { 0.0 })
                    }
                    ControlKind::Axis => {
                        let vc = binding.axis(candidate.native)?;
                        let raw = i16::try_from(candidate.raw).unwrap_or_default();
                        (vc, apply_deadzone(normalize_axis(raw), deadzone))
                    }
                };
                Some(InputEvent {
                    kind: candidate.kind,
                    native_id: candidate.native,
                    vc,
                    value: candidate.raw,
                    virtual_value,
                    at,
                    sequence,
                })
            })
            .collect()
    }

    /// Makes `event` the latest of its kind.
    pub(crate) fn publish(&self, event: InputEvent) {
        let slot = match event.kind {
            ControlKind::Button => &self.last_button,
            ControlKind::Axis => &self.last_axis,
        };
        match slot.write() {
            Ok(mut last) => *last = Some(event),
            Err(poisoned) => *poisoned.into_inner() = Some(event),
        }
    }

    /// Swaps the binding. Already emitted events are not recomputed.
    pub(crate) fn set_binding(&self, binding: Binding) {
        match self.binding.write() {
            Ok(mut current) => *current = binding,
            Err(poisoned) => *poisoned.into_inner() = binding,
        }
    }

    pub(crate) fn set_deadzone(&self, deadzone: f32) {
        self.poll_state().calibration.set_deadzone(deadzone);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn poll_state(&self) -> MutexGuard<'_, PollState> {
        match self.poll.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn read_event(slot: &RwLock<Option<InputEvent>>) -> Option<InputEvent> {
    match slot.read() {
        Ok(event) => *event,
        Err(poisoned) => *poisoned.into_inner(),
    }
}
