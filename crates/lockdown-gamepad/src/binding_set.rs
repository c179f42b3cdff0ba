use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::binding::{Binding, BindingDocument};
use crate::error::BindingError;

/// Named bindings plus the device names they apply to.
///
/// ```yaml
/// bindings:
///   - name: pad
///     buttons: { 0x130: 0 }
/// devices:
///   "Xbox Wireless Controller": pad
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    bindings: Vec<Binding>,
    devices: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BindingSetDocument {
    #[serde(default)]
    bindings: Vec<BindingDocument>,
    #[serde(default)]
    devices: BTreeMap<String, String>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a binding set document. Every device entry must name a
    /// binding defined in the same document.
    pub fn parse(document: &str) -> Result<Self, BindingError> {
        let raw: BindingSetDocument = serde_yaml::from_str(document)?;
        let mut set = Self::new();
        for binding in raw.bindings {
            set.insert(binding.try_into()?);
        }
        for (device, binding) in raw.devices {
            set.assign(device, binding)?;
        }
        Ok(set)
    }

    pub fn save(&self) -> Result<String, BindingError> {
        let doc = BindingSetDocument {
            bindings: self.bindings.iter().map(BindingDocument::from).collect(),
            devices: self.devices.clone(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }

    /// Adds a binding, replacing any binding with the same name.
    pub fn insert(&mut self, binding: Binding) {
        match self.bindings.iter_mut().find(|b| b.name() == binding.name()) {
            Some(existing) => existing.copy(&binding),
            None => self.bindings.push(binding),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name() == name)
    }

    /// Associates a device name with a binding of this set.
    pub fn assign(
        &mut self,
        device: impl Into<String>,
        binding: impl Into<String>,
    ) -> Result<(), BindingError> {
        let binding = binding.into();
        if self.get(&binding).is_none() {
            return Err(BindingError::UnknownBinding(binding));
        }
        self.devices.insert(device.into(), binding);
        Ok(())
    }

    /// Returns the binding assigned to a device name.
    pub fn binding_for(&self, device: &str) -> Option<&Binding> {
        self.devices.get(device).and_then(|name| self.get(name))
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
bindings:
  - name: pad
    buttons:
      0x130: 0
      0x131: 1
    axes:
      0: 0
  - name: stick
    buttons:
      "0": 0
devices:
  "Xbox Wireless Controller": pad
  "Arcade Stick": stick
"#;

    #[test]
    fn parse_resolves_device_bindings() {
        let set = BindingSet::parse(DOC).expect("should parse");
        assert_eq!(set.len(), 2);
        let pad = set
            .binding_for("Xbox Wireless Controller")
            .expect("pad assigned");
        assert_eq!(pad.name(), "pad");
        assert_eq!(pad.button(0x131), Some(1));
        assert!(set.binding_for("Unknown Pad").is_none());
    }

    #[test]
    fn parse_rejects_assignment_to_missing_binding() {
        let doc = "bindings: []\ndevices:\n  pad: missing\n";
        assert!(matches!(
            BindingSet::parse(doc),
            Err(BindingError::UnknownBinding(name)) if name == "missing"
        ));
    }

    #[test]
    fn save_then_parse_is_stable() {
        let set = BindingSet::parse(DOC).expect("should parse");
        let saved = set.save().expect("save");
        assert_eq!(BindingSet::parse(&saved).expect("reparse"), set);
    }

    #[test]
    fn insert_replaces_binding_with_same_name() {
        let mut set = BindingSet::new();
        set.insert(Binding::new("pad").with_button(1, 1));
        set.insert(Binding::new("pad").with_button(2, 2));
        assert_eq!(set.len(), 1);
        let pad = set.get("pad").expect("pad present");
        assert_eq!(pad.button(1), None);
        assert_eq!(pad.button(2), Some(2));
    }
}
