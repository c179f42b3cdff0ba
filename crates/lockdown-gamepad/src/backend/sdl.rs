use sdl2::controller::{Axis as SdlAxis, Button as SdlButton, GameController};
use sdl2::event::{Event, EventType};
use sdl2::joystick::{HatState, Joystick};
use sdl2::{EventPump, GameControllerSubsystem, JoystickSubsystem, Sdl};

use crate::backend::Backend;
use crate::binding::HAT_BASE;
use crate::error::BackendError;
use crate::types::{Axis, Button, DeviceKind, NativeCode, NativeDevice, NativeId, RawState};

/// Input events the backend never reads. State is polled instead, so these
/// would only pile up in the SDL queue.
const IGNORED_EVENTS: [EventType; 8] = [
    EventType::JoyAxisMotion,
    EventType::JoyBallMotion,
    EventType::JoyHatMotion,
    EventType::JoyButtonDown,
    EventType::JoyButtonUp,
    EventType::ControllerAxisMotion,
    EventType::ControllerButtonDown,
    EventType::ControllerButtonUp,
];

/// Controller buttons in the backend's standard order. Their SDL indices
/// are the native codes of `DeviceKind::Xbox` devices.
const CONTROLLER_BUTTONS: [(SdlButton, Button); 16] = [
    (SdlButton::A, Button::A),
    (SdlButton::B, Button::B),
    (SdlButton::X, Button::X),
    (SdlButton::Y, Button::Y),
    (SdlButton::Back, Button::Back),
    (SdlButton::Guide, Button::Guide),
    (SdlButton::Start, Button::Start),
    (SdlButton::LeftStick, Button::LeftStick),
    (SdlButton::RightStick, Button::RightStick),
    (SdlButton::LeftShoulder, Button::LeftShoulder),
    (SdlButton::RightShoulder, Button::RightShoulder),
    (SdlButton::DPadUp, Button::DPadUp),
    (SdlButton::DPadDown, Button::DPadDown),
    (SdlButton::DPadLeft, Button::DPadLeft),
    (SdlButton::DPadRight, Button::DPadRight),
    (SdlButton::Misc1, Button::Misc),
];

const CONTROLLER_AXES: [(SdlAxis, Axis); 6] = [
    (SdlAxis::LeftX, Axis::LeftX),
    (SdlAxis::LeftY, Axis::LeftY),
    (SdlAxis::RightX, Axis::RightX),
    (SdlAxis::RightY, Axis::RightY),
    (SdlAxis::TriggerLeft, Axis::LeftTrigger),
    (SdlAxis::TriggerRight, Axis::RightTrigger),
];

/// Recognized pads are read through the controller API, which reports a
/// fixed layout whatever the driver. Everything else is read by raw index.
enum OpenDevice {
    Controller(GameController),
    Joystick(Joystick),
}

impl OpenDevice {
    fn instance_id(&self) -> NativeId {
        match self {
            OpenDevice::Controller(pad) => pad.instance_id(),
            OpenDevice::Joystick(joystick) => joystick.instance_id(),
        }
    }

    fn kind(&self) -> DeviceKind {
        match self {
            OpenDevice::Controller(_) => DeviceKind::Xbox,
            OpenDevice::Joystick(_) => DeviceKind::Generic,
        }
    }

    fn name(&self) -> String {
        match self {
            OpenDevice::Controller(pad) => pad.name(),
            OpenDevice::Joystick(joystick) => joystick.name(),
        }
    }

    fn attached(&self) -> bool {
        match self {
            OpenDevice::Controller(pad) => pad.attached(),
            OpenDevice::Joystick(joystick) => joystick.attached(),
        }
    }
}

/// SDL2 backend. Must be created and used on one thread.
pub struct Sdl2Backend {
    _sdl: Sdl,
    joysticks: JoystickSubsystem,
    controllers: GameControllerSubsystem,
    pump: EventPump,
    open: Vec<OpenDevice>,
}

impl Sdl2Backend {
    /// Initializes SDL and opens every device already attached.
    pub fn open() -> Result<Self, BackendError> {
        let sdl = sdl2::init().map_err(BackendError::Unavailable)?;
        let joysticks = sdl.joystick().map_err(BackendError::Unavailable)?;
        let controllers = sdl.game_controller().map_err(BackendError::Unavailable)?;
        let mut pump = sdl.event_pump().map_err(BackendError::Unavailable)?;
        for event_type in IGNORED_EVENTS {
            pump.disable_event(event_type);
        }

        let mut backend = Self {
            _sdl: sdl,
            joysticks,
            controllers,
            pump,
            open: Vec::new(),
        };

        // Attached devices are also announced through JoyDeviceAdded; opening
        // them here makes the first enumeration complete.
        let count = backend.joysticks.num_joysticks().map_err(BackendError::Unavailable)?;
        for index in 0..count {
            backend.open_index(index);
        }
        Ok(backend)
    }

    fn open_index(&mut self, index: u32) {
        let device = if self.controllers.is_game_controller(index) {
            self.controllers.open(index).map(OpenDevice::Controller)
        } else {
            self.joysticks.open(index).map(OpenDevice::Joystick)
        };
        let device = match device {
            Ok(device) => device,
            Err(e) => {
                log::debug!("failed to open device {index}: {e}");
                return;
            }
        };
        let id = device.instance_id();
        if self.open.iter().any(|o| o.instance_id() == id) {
            return;
        }
        log::debug!("opened device {id} ({}) as {:?}", device.name(), device.kind());
        self.open.push(device);
    }

    fn find(&self, id: NativeId) -> Option<&OpenDevice> {
        self.open.iter().find(|o| o.instance_id() == id)
    }
}

impl Backend for Sdl2Backend {
    fn enumerate(&mut self) -> Result<Vec<NativeDevice>, BackendError> {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        for event in self.pump.poll_iter() {
            match event {
                Event::JoyDeviceAdded { which, .. } => added.push(which),
                Event::JoyDeviceRemoved { which, .. } => removed.push(which),
                _ => {}
            }
        }

        self.open
            .retain(|o| !removed.contains(&o.instance_id()) && o.attached());
        for index in added {
            self.open_index(index);
        }

        Ok(self
            .open
            .iter()
            .map(|o| NativeDevice {
                id: o.instance_id(),
                kind: o.kind(),
                name: o.name(),
            })
            .collect())
    }

    fn read_state(&mut self, id: NativeId) -> Result<RawState, BackendError> {
        match self.find(id) {
            Some(OpenDevice::Controller(pad)) => read_controller(pad),
            Some(OpenDevice::Joystick(joystick)) => read_joystick(joystick),
            None => Err(BackendError::Transient(format!("device {id} is not open"))),
        }
    }

    fn refresh(&mut self) {
        self.pump.pump_events();
        self.joysticks.update();
        self.controllers.update();
    }
}

fn read_controller(pad: &GameController) -> Result<RawState, BackendError> {
    let mut state = RawState::default();
    for (button, _) in CONTROLLER_BUTTONS {
        state.buttons.push((controller_code(button as i32)?, pad.button(button)));
    }
    for (axis, _) in CONTROLLER_AXES {
        state.axes.push((controller_code(axis as i32)?, pad.axis(axis)));
    }
    Ok(state)
}

fn read_joystick(joystick: &Joystick) -> Result<RawState, BackendError> {
    let transient = |e: sdl2::IntegerOrSdlError| BackendError::Transient(e.to_string());

    let mut state = RawState::default();
    for index in 0..joystick.num_buttons() {
        let code = native_code(index)?;
        state.buttons.push((code, joystick.button(index).map_err(transient)?));
    }
    for hat in 0..joystick.num_hats() {
        let base = native_code(hat)
            .ok()
            .and_then(|h| h.checked_mul(4))
            .and_then(|offset| HAT_BASE.checked_add(offset))
            .ok_or_else(|| BackendError::Transient(format!("hat {hat} out of range")))?;
        let [up, right, down, left] = hat_directions(joystick.hat(hat).map_err(transient)?);
        state.buttons.extend([
            (base, up),
            (base + 1, right),
            (base + 2, down),
            (base + 3, left),
        ]);
    }
    for index in 0..joystick.num_axes() {
        let code = native_code(index)?;
        state.axes.push((code, joystick.axis(index).map_err(transient)?));
    }
    Ok(state)
}

fn controller_code(index: i32) -> Result<NativeCode, BackendError> {
    NativeCode::try_from(index)
        .map_err(|_| BackendError::Transient(format!("controller index {index} out of range")))
}

fn native_code(index: u32) -> Result<NativeCode, BackendError> {
    NativeCode::try_from(index)
        .map_err(|_| BackendError::Transient(format!("control index {index} out of range")))
}

/// Splits a hat position into up, right, down and left presses.
fn hat_directions(state: HatState) -> [bool; 4] {
    match state {
        HatState::Centered => [false, false, false, false],
        HatState::Up => [true, false, false, false],
        HatState::RightUp => [true, true, false, false],
        HatState::Right => [false, true, false, false],
        HatState::RightDown => [false, true, true, false],
        HatState::Down => [false, false, true, false],
        HatState::LeftDown => [false, false, true, true],
        HatState::Left => [false, false, false, true],
        HatState::LeftUp => [true, false, false, true],
    }
}
