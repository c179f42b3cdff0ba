/// Identifier the backend assigns to a connected device.
/// Unique among the devices present at the same time.
pub type NativeId = u32;

/// Raw hardware identifier of a single button or axis.
pub type NativeCode = u16;

/// Logical, layout-independent identifier of a button or axis.
pub type VirtualCode = u16;

/// Family of a device. Selects the default binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Xbox-style layout recognized by the backend as a game controller.
    Xbox,
    /// Any other joystick. Controls are mapped by index.
    Generic,
}

/// Well-known virtual button codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Button {
    A = 0,
    B,
    X,
    Y,
    Back,
    Guide,
    Start,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Misc,
}

impl Button {
    pub const ALL: [Button; 16] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Back,
        Button::Guide,
        Button::Start,
        Button::LeftStick,
        Button::RightStick,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
        Button::Misc,
    ];

    #[inline]
    pub fn code(self) -> VirtualCode {
        self as VirtualCode
    }

    /// Returns the named button for a virtual code, if it has one.
    pub fn from_code(code: VirtualCode) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

/// Well-known virtual axis codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Axis {
    LeftX = 0,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl Axis {
    pub const ALL: [Axis; 6] = [
        Axis::LeftX,
        Axis::LeftY,
        Axis::RightX,
        Axis::RightY,
        Axis::LeftTrigger,
        Axis::RightTrigger,
    ];

    #[inline]
    pub fn code(self) -> VirtualCode {
        self as VirtualCode
    }

    pub fn from_code(code: VirtualCode) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

/// A device as reported by backend enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDevice {
    pub id: NativeId,
    pub kind: DeviceKind,
    pub name: String,
}

/// Raw control values of one device, in native enumeration order.
///
/// Axis values use the full `i16` range with rest at `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawState {
    pub buttons: Vec<(NativeCode, bool)>,
    pub axes: Vec<(NativeCode, i16)>,
}

impl RawState {
    /// Sets a button value, keeping the position of an existing entry.
    pub fn set_button(&mut self, code: NativeCode, pressed: bool) {
        match self.buttons.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = pressed,
            None => self.buttons.push((code, pressed)),
        }
    }

    /// Sets an axis value, keeping the position of an existing entry.
    pub fn set_axis(&mut self, code: NativeCode, value: i16) {
        match self.axes.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = value,
            None => self.axes.push((code, value)),
        }
    }
}
