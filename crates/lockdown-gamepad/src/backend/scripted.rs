use std::sync::{Arc, Mutex, MutexGuard};

use ahash::{AHashMap, AHashSet};

use crate::backend::{Backend, BackendFactory};
use crate::error::BackendError;
use crate::types::{DeviceKind, NativeCode, NativeDevice, NativeId, RawState};

/// In-memory backend driven by tests. Clones share the same script.
#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    devices: Vec<NativeDevice>,
    states: AHashMap<NativeId, RawState>,
    failing_reads: AHashSet<NativeId>,
    fail_enumeration: bool,
    enumerations: usize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().expect("script lock poisoned")
    }

    pub fn plug(&self, id: NativeId, kind: DeviceKind, name: &str) {
        let mut script = self.script();
        script.devices.retain(|d| d.id != id);
        script.devices.push(NativeDevice {
            id,
            kind,
            name: name.to_string(),
        });
        script.states.entry(id).or_default();
    }

    pub fn unplug(&self, id: NativeId) {
        let mut script = self.script();
        script.devices.retain(|d| d.id != id);
        script.states.remove(&id);
    }

    pub fn set_button(&self, id: NativeId, code: NativeCode, pressed: bool) {
        self.script().states.entry(id).or_default().set_button(code, pressed);
    }

    pub fn set_axis(&self, id: NativeId, code: NativeCode, value: i16) {
        self.script().states.entry(id).or_default().set_axis(code, value);
    }

    pub fn fail_reads(&self, id: NativeId, fail: bool) {
        let mut script = self.script();
        if fail {
            script.failing_reads.insert(id);
        } else {
            script.failing_reads.remove(&id);
        }
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.script().fail_enumeration = fail;
    }

    pub fn enumerations(&self) -> usize {
        self.script().enumerations
    }

    /// A factory handing out clones of this backend.
    pub fn factory(&self) -> BackendFactory {
        let backend = self.clone();
        Arc::new(move || Ok(Box::new(backend.clone()) as Box<dyn Backend>))
    }
}

impl Backend for ScriptedBackend {
    fn enumerate(&mut self) -> Result<Vec<NativeDevice>, BackendError> {
        let mut script = self.script();
        script.enumerations += 1;
        if script.fail_enumeration {
            return Err(BackendError::Transient("scripted enumeration failure".into()));
        }
        Ok(script.devices.clone())
    }

    fn read_state(&mut self, id: NativeId) -> Result<RawState, BackendError> {
        let script = self.script();
        if script.failing_reads.contains(&id) {
            return Err(BackendError::Transient(format!("scripted read failure for {id}")));
        }
        script
            .states
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::Transient(format!("device {id} is gone")))
    }
}
