use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use ahash::AHashSet;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::backend::{Backend, BackendFactory};
use crate::binding::Binding;
use crate::command::Command;
use crate::config::HookConfig;
use crate::device::Device;
use crate::error::BackendError;
use crate::events::{ControlKind, DeviceHandler, HandlerSlot};
use crate::hook::Inner;

/// Callback slots. Unset slots are no-ops.
#[derive(Clone, Default)]
pub(crate) struct Handlers {
    button: Option<DeviceHandler>,
    axis: Option<DeviceHandler>,
    connect: Option<DeviceHandler>,
    disconnect: Option<DeviceHandler>,
}

impl Handlers {
    pub fn set(&mut self, slot: HandlerSlot, handler: Option<DeviceHandler>) {
        let target = match slot {
            HandlerSlot::Button => &mut self.button,
            HandlerSlot::Axis => &mut self.axis,
            HandlerSlot::Connect => &mut self.connect,
            HandlerSlot::Disconnect => &mut self.disconnect,
        };
        *target = handler;
    }

    /// Invokes one handler. A panicking handler is logged so the rest of
    /// the tick still runs.
    fn invoke(&self, slot: HandlerSlot, device: &Arc<Device>) {
        let handler = match slot {
            HandlerSlot::Button => &self.button,
            HandlerSlot::Axis => &self.axis,
            HandlerSlot::Connect => &self.connect,
            HandlerSlot::Disconnect => &self.disconnect,
        };
        let Some(handler) = handler else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| handler(device))).is_err() {
            log::error!("{slot} handler panicked for device {}", device.id());
        }
    }
}

/// State owned by the hook thread.
pub(crate) struct Runtime {
    backend: Box<dyn Backend>,
    config: HookConfig,
    handlers: Handlers,
    inner: Arc<Inner>,
    devices: Vec<Arc<Device>>,
    last_scan: Option<Instant>,
    tick: u64,
}

impl Runtime {
    pub fn new(
        backend: Box<dyn Backend>,
        config: HookConfig,
        handlers: Handlers,
        inner: Arc<Inner>,
    ) -> Self {
        Self {
            backend,
            config,
            handlers,
            inner,
            devices: Vec::new(),
            last_scan: None,
            tick: 0,
        }
    }

    /// Applies a configuration command. Returns false on `Stop`.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::SetHandler { slot, handler } => self.handlers.set(slot, handler),
            Command::SetSleepTime(interval) => self.config.sleep_time = interval,
            Command::SetPlugAndPlay { enabled, interval } => {
                self.config.plug_and_play = enabled;
                self.config.plug_and_play_interval = interval;
            }
            Command::SetAxisDeadzone(deadzone) => {
                self.config.axis_deadzone = deadzone;
                for device in &self.devices {
                    device.set_deadzone(deadzone);
                }
            }
            Command::SetBindings(bindings) => self.config.bindings = bindings,
            Command::Rebind { id, binding } => {
                match self.devices.iter().find(|d| d.id() == id) {
                    Some(device) => {
                        log::debug!("rebind device {id} to {}", binding.name());
                        device.set_binding(binding);
                    }
                    None => log::warn!("rebind ignored, device {id} is not connected"),
                }
            }
            Command::Stop => return false,
        }
        true
    }

    /// Runs one tick: optional device scan, then a poll of every device.
    pub fn tick(&mut self, now: Instant) {
        self.tick += 1;
        if self.scan_due(now) {
            self.scan(now);
        }
        self.poll_devices(now);
    }

    pub fn sleep_time(&self) -> std::time::Duration {
        self.config.sleep_time
    }

    #[cfg(test)]
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    fn scan_due(&self, now: Instant) -> bool {
        match self.last_scan {
            None => true,
            Some(last) => {
                self.config.plug_and_play
                    && now.saturating_duration_since(last)
                        >= self.config.plug_and_play_interval
            }
        }
    }

    /// Reconciles the live set with the backend enumeration.
    fn scan(&mut self, now: Instant) {
        let present = match self.backend.enumerate() {
            Ok(present) => present,
            Err(e) => {
                // Keep the live set; retry on the next tick.
                log::warn!("device enumeration failed: {e}");
                return;
            }
        };
        self.last_scan = Some(now);

        let present_ids: AHashSet<_> = present.iter().map(|d| d.id).collect();
        let (kept, gone): (Vec<_>, Vec<_>) = self
            .devices
            .drain(..)
            .partition(|d| present_ids.contains(&d.id()));
        self.devices = kept;

        for device in gone {
            log::info!("{} disconnected (id={})", device.name(), device.id());
            device.mark_disconnected();
            self.handlers.invoke(HandlerSlot::Disconnect, &device);
        }

        for info in present {
            if self.devices.iter().any(|d| d.id() == info.id) {
                continue;
            }
            let binding = self
                .config
                .bindings
                .binding_for(&info.name)
                .cloned()
                .unwrap_or_else(|| Binding::default_for(info.kind));
            log::info!(
                "{} connected (id={}, kind={:?}, binding={})",
                info.name,
                info.id,
                info.kind,
                binding.name()
            );
            let device = Arc::new(Device::new(info, binding, self.config.axis_deadzone));
            self.devices.push(Arc::clone(&device));
            self.handlers.invoke(HandlerSlot::Connect, &device);
        }

        self.inner.publish_devices(&self.devices);
    }

    fn poll_devices(&mut self, now: Instant) {
        if self.devices.is_empty() {
            return;
        }
        self.backend.refresh();
        for device in &self.devices {
            if let Err(e) = device.poll_raw(self.backend.as_mut()) {
                log::debug!("read failed for device {}: {e}", device.id());
                continue;
            }
            for event in device.apply_binding(self.tick, now) {
                device.publish(event);
                let slot = match event.kind {
                    ControlKind::Button => HandlerSlot::Button,
                    ControlKind::Axis => HandlerSlot::Axis,
                };
                self.handlers.invoke(slot, device);
            }
        }
    }

    /// Marks every live device as disconnected without invoking handlers.
    fn shutdown(&mut self) {
        for device in self.devices.drain(..) {
            device.mark_disconnected();
        }
        self.inner.publish_devices(&self.devices);
    }
}

/// Starts the hook thread. The backend is opened on that thread and the
/// outcome is reported through `ready_tx` before the first tick. `ready_tx`
/// must be a rendezvous channel: if the caller stopped waiting, the send
/// fails and the thread exits without ticking.
pub(crate) fn start_runtime_thread(
    factory: BackendFactory,
    config: HookConfig,
    handlers: Handlers,
    inner: Arc<Inner>,
    cmd_rx: Receiver<Command>,
    ready_tx: Sender<Result<(), BackendError>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("gamepad-hook".into())
        .spawn(move || {
            let backend = match factory() {
                Ok(backend) => backend,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if ready_tx.send(Ok(())).is_err() {
                log::warn!("gamepad backend opened after start gave up");
                return;
            }

            let mut runtime = Runtime::new(backend, config, handlers, inner);
            run_loop(&mut runtime, &cmd_rx);
            runtime.shutdown();
            log::debug!("gamepad hook thread exited");
        })
}

fn run_loop(runtime: &mut Runtime, cmd_rx: &Receiver<Command>) {
    loop {
        runtime.tick(Instant::now());

        // The wait is the only suspension point; commands wake it early.
        let deadline = Instant::now() + runtime.sleep_time();
        loop {
            match cmd_rx.recv_deadline(deadline) {
                Ok(command) => {
                    if !runtime.apply(command) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}
