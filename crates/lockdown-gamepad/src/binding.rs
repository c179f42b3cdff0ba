//! Native to virtual code mapping profiles.
//!
//! A [`Binding`] maps the raw control codes of one device kind onto virtual
//! codes. Bindings persist as a small YAML document:
//!
//! ```yaml
//! name: pad
//! buttons:
//!   0x130: 0
//!   "16": 1
//! axes:
//!   0: 0
//! ```
//!
//! Keys may be integers, decimal strings or `0x` hex strings. JSON documents
//! parse as well.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Unexpected, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::BindingError;
use crate::types::{Axis, Button, DeviceKind, NativeCode, VirtualCode};

/// Native code of the first hat direction. Each hat `n` occupies four
/// consecutive codes starting at `HAT_BASE + 4 * n`: up, right, down, left.
pub const HAT_BASE: NativeCode = 0x100;

const GENERIC_BUTTONS: NativeCode = 32;
const GENERIC_AXES: NativeCode = 8;

/// Ordered native code to virtual code table.
pub type Mappings = BTreeMap<NativeCode, VirtualCode>;

/// A named mapping pair for buttons and axes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    name: String,
    buttons: Mappings,
    axes: Mappings,
}

impl Binding {
    /// Creates an empty binding.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buttons: Mappings::new(),
            axes: Mappings::new(),
        }
    }

    /// Returns the default table for a device kind.
    pub fn default_for(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Xbox => xbox_binding(),
            DeviceKind::Generic => generic_binding(),
        }
    }

    /// Parses a binding document. A code listed twice in one section, even
    /// spelled differently, is an error.
    pub fn parse(document: &str) -> Result<Self, BindingError> {
        let raw: BindingDocument = serde_yaml::from_str(document)?;
        raw.try_into()
    }

    /// Replaces this binding with the contents of `document`.
    /// On error the binding is left untouched.
    pub fn load(&mut self, document: &str) -> Result<(), BindingError> {
        *self = Self::parse(document)?;
        Ok(())
    }

    /// Serializes the binding. Mappings are written in native code order.
    pub fn save(&self) -> Result<String, BindingError> {
        Ok(serde_yaml::to_string(&BindingDocument::from(self))?)
    }

    /// Replaces name and mappings with a snapshot of `other`.
    pub fn copy(&mut self, other: &Binding) {
        self.clone_from(other);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn buttons(&self) -> &Mappings {
        &self.buttons
    }

    pub fn buttons_mut(&mut self) -> &mut Mappings {
        &mut self.buttons
    }

    pub fn axes(&self) -> &Mappings {
        &self.axes
    }

    pub fn axes_mut(&mut self) -> &mut Mappings {
        &mut self.axes
    }

    /// Builder-style button mapping insert.
    pub fn with_button(mut self, native: NativeCode, virtual_code: VirtualCode) -> Self {
        self.buttons.insert(native, virtual_code);
        self
    }

    /// Builder-style axis mapping insert.
    pub fn with_axis(mut self, native: NativeCode, virtual_code: VirtualCode) -> Self {
        self.axes.insert(native, virtual_code);
        self
    }

    #[inline]
    pub fn button(&self, native: NativeCode) -> Option<VirtualCode> {
        self.buttons.get(&native).copied()
    }

    #[inline]
    pub fn axis(&self, native: NativeCode) -> Option<VirtualCode> {
        self.axes.get(&native).copied()
    }
}

fn with_hat_dpad(binding: Binding) -> Binding {
    binding
        .with_button(HAT_BASE, Button::DPadUp.code())
        .with_button(HAT_BASE + 1, Button::DPadRight.code())
        .with_button(HAT_BASE + 2, Button::DPadDown.code())
        .with_button(HAT_BASE + 3, Button::DPadLeft.code())
}

/// Standard game controller layout. Native codes are the backend's
/// controller button and axis indices, which the virtual codes follow, so
/// the table is an identity. The d-pad arrives as buttons, not as a hat.
fn xbox_binding() -> Binding {
    let mut binding = Binding::new("xbox");
    binding
        .buttons
        .extend(Button::ALL.iter().map(|b| (b.code(), b.code())));
    binding
        .axes
        .extend(Axis::ALL.iter().map(|a| (a.code(), a.code())));
    binding
}

fn generic_binding() -> Binding {
    let mut binding = Binding::new("generic");
    binding.buttons.extend((0..GENERIC_BUTTONS).map(|code| (code, code)));
    binding.axes.extend((0..GENERIC_AXES).map(|code| (code, code)));
    with_hat_dpad(binding)
}

/// On-disk form of a binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BindingDocument {
    name: String,
    #[serde(default)]
    buttons: CodeEntries,
    #[serde(default)]
    axes: CodeEntries,
}

impl From<&Binding> for BindingDocument {
    fn from(binding: &Binding) -> Self {
        let keyed = |m: &Mappings| CodeEntries(m.iter().map(|(k, v)| (CodeKey(*k), *v)).collect());
        Self {
            name: binding.name.clone(),
            buttons: keyed(&binding.buttons),
            axes: keyed(&binding.axes),
        }
    }
}

impl TryFrom<BindingDocument> for Binding {
    type Error = BindingError;

    fn try_from(doc: BindingDocument) -> Result<Self, BindingError> {
        Ok(Self {
            buttons: doc.buttons.into_mappings("buttons")?,
            axes: doc.axes.into_mappings("axes")?,
            name: doc.name,
        })
    }
}

/// Mapping entries in document order. Keeps spellings of the same code
/// (`16` and `0x10`) apart until they are checked for collisions.
#[derive(Debug, Clone, Default)]
struct CodeEntries(Vec<(CodeKey, VirtualCode)>);

impl CodeEntries {
    fn into_mappings(self, section: &'static str) -> Result<Mappings, BindingError> {
        let mut mappings = Mappings::new();
        for (CodeKey(native), virtual_code) in self.0 {
            if mappings.insert(native, virtual_code).is_some() {
                return Err(BindingError::DuplicateCode { section, code: native });
            }
        }
        Ok(mappings)
    }
}

impl Serialize for CodeEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CodeEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CodeEntriesVisitor)
    }
}

struct CodeEntriesVisitor;

impl<'de> Visitor<'de> for CodeEntriesVisitor {
    type Value = CodeEntries;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of native codes to virtual codes")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CodeEntries, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<CodeKey, VirtualCode>()? {
            entries.push(entry);
        }
        Ok(CodeEntries(entries))
    }

    fn visit_unit<E: de::Error>(self) -> Result<CodeEntries, E> {
        Ok(CodeEntries::default())
    }
}

/// Mapping key accepting integers and numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
struct CodeKey(NativeCode);

impl<'de> Deserialize<'de> for CodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CodeKeyVisitor)
    }
}

struct CodeKeyVisitor;

impl Visitor<'_> for CodeKeyVisitor {
    type Value = CodeKey;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a native code as integer, decimal or 0x-prefixed string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CodeKey, E> {
        NativeCode::try_from(v)
            .map(CodeKey)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CodeKey, E> {
        NativeCode::try_from(v)
            .map(CodeKey)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CodeKey, E> {
        parse_code(v)
            .map(CodeKey)
            .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// Parses `"16"` or `"0x10"` into a native code.
fn parse_code(input: &str) -> Option<NativeCode> {
    let input = input.trim();
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => NativeCode::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}
