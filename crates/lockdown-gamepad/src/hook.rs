use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};

#[cfg(feature = "sdl2-backend")]
use crate::backend::Sdl2Backend;
use crate::backend::{Backend, BackendFactory};
use crate::binding::Binding;
use crate::binding_set::BindingSet;
use crate::command::Command;
use crate::config::HookConfig;
use crate::device::Device;
use crate::error::{BackendError, Error, Result};
use crate::events::{DeviceHandler, HandlerSlot};
use crate::runtime::{start_runtime_thread, Handlers};
use crate::types::NativeId;

/// Lifecycle of a [`Hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// State shared between the hook and its thread.
#[derive(Default)]
pub(crate) struct Inner {
    devices: RwLock<Vec<Arc<Device>>>,
}

impl Inner {
    pub(crate) fn publish_devices(&self, devices: &[Arc<Device>]) {
        let mut live = match self.devices.write() {
            Ok(live) => live,
            Err(poisoned) => poisoned.into_inner(),
        };
        live.clear();
        live.extend(devices.iter().cloned());
    }

    pub(crate) fn devices(&self) -> Vec<Arc<Device>> {
        match self.devices.read() {
            Ok(live) => live.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Background gamepad poller.
///
/// Configure it, register handlers and call [`Hook::start`]. Handlers run on
/// the hook thread; anything they share with other threads needs its own
/// synchronization. Changes made while running take effect between ticks.
///
/// ```no_run
/// use std::time::Duration;
/// use lockdown_gamepad::Hook;
///
/// let mut hook = Hook::new();
/// hook.set_plug_and_play(true, Duration::from_millis(1000));
/// hook.set_sleep_time(Duration::from_millis(100));
/// hook.set_connect_event_handler(|dev| println!("{} connected", dev.name()));
/// hook.start().expect("gamepad hook");
/// ```
pub struct Hook {
    factory: BackendFactory,
    config: HookConfig,
    handlers: Handlers,
    state: RunState,
    inner: Arc<Inner>,
    cmd_tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl Hook {
    /// Creates a hook on top of the SDL2 backend.
    #[cfg(feature = "sdl2-backend")]
    pub fn new() -> Self {
        Self::with_backend(|| {
            Sdl2Backend::open().map(|backend| Box::new(backend) as Box<dyn Backend>)
        })
    }

    /// Creates a hook whose backend is opened by `factory` on the hook
    /// thread each time the hook starts.
    pub fn with_backend<F>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn Backend>, BackendError>
            + Send
            + Sync
            + 'static,
    {
        Self::from_factory(Arc::new(factory))
    }

    pub(crate) fn from_factory(factory: BackendFactory) -> Self {
        Self {
            factory,
            config: HookConfig::default(),
            handlers: Handlers::default(),
            state: RunState::Idle,
            inner: Arc::new(Inner::default()),
            cmd_tx: None,
            worker: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// Replaces the whole configuration. Only allowed while idle.
    pub fn set_config(&mut self, config: HookConfig) -> Result<()> {
        match self.state {
            RunState::Idle => {
                self.config = config;
                Ok(())
            }
            RunState::Stopped => Err(Error::Stopped),
            RunState::Running | RunState::Stopping => Err(Error::AlreadyRunning),
        }
    }

    /// Enables or disables periodic device rescans.
    pub fn set_plug_and_play(&mut self, enabled: bool, interval: Duration) {
        self.config.plug_and_play = enabled;
        self.config.plug_and_play_interval = interval;
        self.send(Command::SetPlugAndPlay { enabled, interval });
    }

    /// Sets the pause between two ticks.
    pub fn set_sleep_time(&mut self, interval: Duration) {
        self.config.sleep_time = interval;
        self.send(Command::SetSleepTime(interval));
    }

    /// Sets the axis dead zone, clamped to `0.0..=1.0`. Applies to live
    /// devices as well.
    pub fn set_axis_deadzone(&mut self, deadzone: f32) {
        let deadzone = deadzone.clamp(0.0, 1.0);
        self.config.axis_deadzone = deadzone;
        self.send(Command::SetAxisDeadzone(deadzone));
    }

    /// Sets the per-device bindings used for future connections.
    pub fn set_bindings(&mut self, bindings: BindingSet) {
        self.config.bindings = bindings.clone();
        self.send(Command::SetBindings(bindings));
    }

    /// Swaps the binding of a connected device at the next tick boundary.
    pub fn rebind(&self, id: NativeId, binding: Binding) -> Result<()> {
        if self.state != RunState::Running {
            return Err(Error::NotRunning);
        }
        if !self.inner.devices().iter().any(|d| d.id() == id) {
            return Err(Error::NotFound(id));
        }
        self.send(Command::Rebind { id, binding });
        Ok(())
    }

    /// Snapshot of the connected devices as of the last scan.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.inner.devices()
    }

    pub fn set_button_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Arc<Device>) + Send + Sync + 'static,
    {
        self.set_handler(HandlerSlot::Button, Some(Arc::new(handler)));
    }

    pub fn set_axis_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Arc<Device>) + Send + Sync + 'static,
    {
        self.set_handler(HandlerSlot::Axis, Some(Arc::new(handler)));
    }

    pub fn set_connect_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Arc<Device>) + Send + Sync + 'static,
    {
        self.set_handler(HandlerSlot::Connect, Some(Arc::new(handler)));
    }

    pub fn set_disconnect_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&Arc<Device>) + Send + Sync + 'static,
    {
        self.set_handler(HandlerSlot::Disconnect, Some(Arc::new(handler)));
    }

    /// Removes the handler of a slot.
    pub fn clear_event_handler(&mut self, slot: HandlerSlot) {
        self.set_handler(slot, None);
    }

    fn set_handler(&mut self, slot: HandlerSlot, handler: Option<DeviceHandler>) {
        self.handlers.set(slot, handler.clone());
        self.send(Command::SetHandler { slot, handler });
    }

    /// Opens the backend and starts polling.
    ///
    /// Fails if the hook is running or stopped, or if the backend cannot be
    /// opened within [`HookConfig::start_timeout`]; in the latter case the
    /// hook stays idle.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            RunState::Idle => {}
            RunState::Running | RunState::Stopping => return Err(Error::AlreadyRunning),
            RunState::Stopped => return Err(Error::Stopped),
        }

        let (cmd_tx, cmd_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(0);
        let worker = start_runtime_thread(
            Arc::clone(&self.factory),
            self.config.clone(),
            self.handlers.clone(),
            Arc::clone(&self.inner),
            cmd_rx,
            ready_tx,
        )?;

        match ready_rx.recv_timeout(self.config.start_timeout) {
            Ok(Ok(())) => {
                log::debug!("gamepad hook started");
                self.cmd_tx = Some(cmd_tx);
                self.worker = Some(worker);
                self.state = RunState::Running;
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(Error::BackendInit(e.to_string()))
            }
            Err(RecvTimeoutError::Timeout) => {
                // The thread exits on its own once the factory returns.
                drop(worker);
                Err(Error::BackendInit(format!(
                    "backend did not open within {:?}",
                    self.config.start_timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.join();
                Err(Error::BackendInit("hook thread exited during startup".into()))
            }
        }
    }

    /// Stops polling and waits for the hook thread to exit. No handler runs
    /// after this returns. Stopping a stopped hook does nothing.
    pub fn stop(&mut self) {
        match self.state {
            RunState::Stopped => return,
            RunState::Idle => {
                self.state = RunState::Stopped;
                return;
            }
            RunState::Running | RunState::Stopping => {}
        }

        self.state = RunState::Stopping;
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Stop);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("gamepad hook thread panicked");
            }
        }
        self.state = RunState::Stopped;
        log::debug!("gamepad hook stopped");
    }

    fn send(&self, command: Command) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(command);
        }
    }
}

#[cfg(feature = "sdl2-backend")]
impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Hook {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backend::scripted::ScriptedBackend;
    use crate::types::DeviceKind;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_hook(backend: &ScriptedBackend) -> Hook {
        let mut hook = Hook::from_factory(backend.factory());
        hook.set_sleep_time(Duration::from_millis(5));
        hook.set_plug_and_play(true, Duration::from_millis(10));
        hook
    }

    #[test]
    fn start_fails_when_backend_is_unavailable() {
        let mut hook = Hook::with_backend(|| {
            Err(BackendError::Unavailable("no joystick driver".into()))
        });
        assert!(matches!(
            hook.start(),
            Err(Error::BackendInit(msg)) if msg.contains("no joystick driver")
        ));
        assert_eq!(hook.state(), RunState::Idle);
    }

    #[test]
    fn start_twice_is_rejected() {
        let backend = ScriptedBackend::new();
        let mut hook = fast_hook(&backend);
        hook.start().expect("start");
        assert!(matches!(hook.start(), Err(Error::AlreadyRunning)));
        hook.stop();
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let backend = ScriptedBackend::new();
        let mut hook = fast_hook(&backend);
        hook.start().expect("start");
        hook.stop();
        assert_eq!(hook.state(), RunState::Stopped);
        hook.stop();
        assert_eq!(hook.state(), RunState::Stopped);
        assert!(matches!(hook.start(), Err(Error::Stopped)));

        let mut idle = fast_hook(&backend);
        idle.stop();
        assert_eq!(idle.state(), RunState::Stopped);
    }

    #[test]
    fn handlers_run_on_hook_thread() {
        let backend = ScriptedBackend::new();
        backend.plug(1, DeviceKind::Generic, "Pad");
        backend.set_button(1, 0, false);

        let (tx, rx) = unbounded();
        let mut hook = fast_hook(&backend);
        let connect_tx = tx.clone();
        hook.set_connect_event_handler(move |dev| {
            let _ = connect_tx.send(format!("connect {}", dev.name()));
        });
        hook.set_button_event_handler(move |dev| {
            let pressed = dev.last_button_event().is_some_and(|e| e.is_pressed());
            let _ = tx.send(format!("button {pressed}"));
        });
        hook.start().expect("start");

        assert_eq!(rx.recv_timeout(WAIT).expect("connect"), "connect Pad");
        // Let the first poll seed the baseline.
        while hook.devices().is_empty() {
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_millis(20));
        backend.set_button(1, 0, true);
        assert_eq!(rx.recv_timeout(WAIT).expect("button"), "button true");
        hook.stop();
    }

    #[test]
    fn no_handler_runs_after_stop_returns() {
        let backend = ScriptedBackend::new();
        backend.plug(1, DeviceKind::Generic, "Pad");
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = unbounded();

        let mut hook = fast_hook(&backend);
        let counter = Arc::clone(&calls);
        hook.set_axis_event_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hook.set_connect_event_handler(move |_| {
            let _ = tx.send(());
        });
        hook.start().expect("start");
        rx.recv_timeout(WAIT).expect("connect");

        for value in [10000, -10000, 20000, -20000] {
            backend.set_axis(1, 0, value);
            std::thread::sleep(Duration::from_millis(10));
        }
        hook.stop();
        let after_stop = calls.load(Ordering::SeqCst);
        backend.set_axis(1, 0, 0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        assert!(hook.devices().is_empty());
    }

    #[test]
    fn rebind_requires_running_hook_and_known_device() {
        let backend = ScriptedBackend::new();
        let mut hook = fast_hook(&backend);
        assert!(matches!(hook.rebind(1, Binding::new("x")), Err(Error::NotRunning)));
        hook.start().expect("start");
        assert!(matches!(hook.rebind(1, Binding::new("x")), Err(Error::NotFound(1))));
        hook.stop();
    }

    #[test]
    fn set_config_only_while_idle() {
        let backend = ScriptedBackend::new();
        let mut hook = fast_hook(&backend);
        let config = HookConfig {
            axis_deadzone: 0.3,
            ..HookConfig::default()
        };
        hook.set_config(config.clone()).expect("idle hook accepts config");
        assert_eq!(hook.config().axis_deadzone, 0.3);
        hook.start().expect("start");
        assert!(matches!(hook.set_config(config), Err(Error::AlreadyRunning)));
    }

    #[test]
    fn start_gives_up_on_a_hanging_backend() {
        let backend = ScriptedBackend::new();
        backend.plug(1, DeviceKind::Generic, "Pad");
        let slow = backend.clone();
        let mut hook = Hook::with_backend(move || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Box::new(slow.clone()) as Box<dyn Backend>)
        });
        hook.set_config(HookConfig {
            start_timeout: Duration::from_millis(50),
            ..HookConfig::default()
        })
        .expect("idle hook accepts config");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        hook.set_connect_event_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(matches!(
            hook.start(),
            Err(Error::BackendInit(msg)) if msg.contains("did not open")
        ));
        assert_eq!(hook.state(), RunState::Idle);

        // The late backend must not start polling for an abandoned hook.
        std::thread::sleep(Duration::from_millis(500));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(hook.devices().is_empty());
    }

    #[test]
    fn panicking_handler_leaves_hook_running() {
        let backend = ScriptedBackend::new();
        backend.plug(1, DeviceKind::Generic, "One");
        backend.plug(2, DeviceKind::Generic, "Two");
        let (tx, rx) = unbounded();

        let mut hook = fast_hook(&backend);
        hook.set_connect_event_handler(move |dev| {
            let _ = tx.send(dev.id());
            assert_ne!(dev.id(), 1, "handler failure");
        });
        hook.start().expect("start");

        assert_eq!(rx.recv_timeout(WAIT).expect("first connect"), 1);
        assert_eq!(rx.recv_timeout(WAIT).expect("second connect"), 2);
        backend.plug(3, DeviceKind::Generic, "Three");
        assert_eq!(rx.recv_timeout(WAIT).expect("later connect"), 3);
        assert_eq!(hook.state(), RunState::Running);
        hook.stop();
        assert_eq!(hook.state(), RunState::Stopped);
    }

    #[test]
    fn device_list_survives_a_poisoned_lock() {
        let inner = Arc::new(Inner::default());
        let poisoner = Arc::clone(&inner);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.devices.write();
            panic!("poison");
        })
        .join();
        assert!(inner.devices.is_poisoned());

        let info = crate::types::NativeDevice {
            id: 4,
            kind: DeviceKind::Generic,
            name: "Pad".into(),
        };
        let device = Arc::new(Device::new(info, Binding::new("pad"), 0.1));
        inner.publish_devices(&[device]);
        assert_eq!(inner.devices().len(), 1);
    }
}
