//! Axis normalization and per-control change detection.

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::events::ControlKind;
use crate::types::{NativeCode, RawState};

/// Default dead zone applied to every axis.
pub const DEFAULT_AXIS_DEADZONE: f32 = 0.1;

const AXIS_SCALE: f32 = i16::MAX as f32;

/// Scales a raw axis reading to `-1.0..=1.0`.
#[inline]
pub fn normalize_axis(raw: i16) -> f32 {
    (f32::from(raw) / AXIS_SCALE).clamp(-1.0, 1.0)
}

/// Collapses values inside the dead zone to exactly `0.0`.
#[inline]
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() <= deadzone {
        0.0
    } else {
        value
    }
}

/// A control whose value changed enough to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub kind: ControlKind,
    pub native: NativeCode,
    pub raw: i32,
}

/// Change detection state of one device.
#[derive(Debug)]
pub(crate) struct Calibration {
    deadzone: f32,
    seeded: bool,
    buttons: AHashMap<NativeCode, bool>,
    /// Last reported value per axis, not the last read one.
    axes: AHashMap<NativeCode, i16>,
}

impl Calibration {
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 1.0),
            seeded: false,
            buttons: AHashMap::new(),
            axes: AHashMap::new(),
        }
    }

    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    pub fn set_deadzone(&mut self, deadzone: f32) {
        self.deadzone = deadzone.clamp(0.0, 1.0);
    }

    /// Compares `state` with the stored values and returns the changed
    /// controls in native order. The first call only records a baseline.
    pub fn diff(&mut self, state: &RawState) -> SmallVec<[Candidate; 8]> {
        let mut changed = SmallVec::new();
        let seeded = self.seeded;
        self.seeded = true;

        for &(native, pressed) in &state.buttons {
            let previous = self.buttons.insert(native, pressed);
            if seeded && previous.unwrap_or(false) != pressed {
                changed.push(Candidate {
                    kind: ControlKind::Button,
                    native,
                    raw: i32::from(pressed),
                });
            }
        }

        for &(native, raw) in &state.axes {
            let Some(previous) = self.axes.get(&native).copied() else {
                self.axes.insert(native, raw);
                if seeded && self.axis_moved(0, raw) {
                    changed.push(Candidate {
                        kind: ControlKind::Axis,
                        native,
                        raw: i32::from(raw),
                    });
                }
                continue;
            };
            if seeded && self.axis_moved(previous, raw) {
                self.axes.insert(native, raw);
                changed.push(Candidate {
                    kind: ControlKind::Axis,
                    native,
                    raw: i32::from(raw),
                });
            }
        }

        changed
    }

    /// An axis is reported when it moved further than the dead zone since
    /// the last report, or when it entered or left the rest region.
    fn axis_moved(&self, previous: i16, current: i16) -> bool {
        let before = normalize_axis(previous);
        let after = normalize_axis(current);
        let at_rest_before = apply_deadzone(before, self.deadzone) == 0.0;
        let at_rest_after = apply_deadzone(after, self.deadzone) == 0.0;
        (after - before).abs() > self.deadzone || at_rest_before != at_rest_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(values: &[(NativeCode, i16)]) -> RawState {
        RawState {
            buttons: Vec::new(),
            axes: values.to_vec(),
        }
    }

    #[test]
    fn normalize_axis_covers_full_range() {
        assert_eq!(normalize_axis(0), 0.0);
        assert_eq!(normalize_axis(i16::MAX), 1.0);
        assert_eq!(normalize_axis(i16::MIN), -1.0);
    }

    #[test]
    fn deadzone_collapses_to_exact_rest() {
        let z = 0.2;
        for raw in [-6000_i16, -1, 0, 1, 6000] {
            assert_eq!(apply_deadzone(normalize_axis(raw), z), 0.0);
        }
        assert!(apply_deadzone(normalize_axis(7000), z) > z);
    }

    #[test]
    fn deadzone_output_is_monotonic_outside_zone() {
        let z = 0.1;
        let mut last = f32::MIN;
        for raw in (4000..=i16::MAX).step_by(97) {
            let v = apply_deadzone(normalize_axis(raw), z);
            assert!(v >= last);
            assert!(v <= 1.0);
            last = v;
        }
    }

    #[test]
    fn first_diff_only_seeds() {
        let mut cal = Calibration::new(0.1);
        let mut state = axes(&[(0, 20000)]);
        state.set_button(1, true);
        assert!(cal.diff(&state).is_empty());
        assert!(cal.diff(&state).is_empty());
    }

    #[test]
    fn button_flip_is_reported_once() {
        let mut cal = Calibration::new(0.1);
        let mut state = RawState::default();
        state.set_button(0x10, false);
        cal.diff(&state);

        state.set_button(0x10, true);
        let changed = cal.diff(&state);
        assert_eq!(
            changed.as_slice(),
            &[Candidate { kind: ControlKind::Button, native: 0x10, raw: 1 }]
        );
        assert!(cal.diff(&state).is_empty());
    }

    #[test]
    fn small_axis_drift_is_ignored_but_accumulates() {
        let mut cal = Calibration::new(0.1);
        cal.diff(&axes(&[(0, 16000)]));
        // ~0.06 away from the last report
        assert!(cal.diff(&axes(&[(0, 18000)])).is_empty());
        // ~0.12 away from the last report, though only ~0.06 from the last read
        assert_eq!(cal.diff(&axes(&[(0, 20000)])).len(), 1);
    }

    #[test]
    fn returning_to_rest_is_reported() {
        let mut cal = Calibration::new(0.1);
        cal.diff(&axes(&[(0, 0)]));
        assert_eq!(cal.diff(&axes(&[(0, 4000)])).len(), 1);
        // small step, but crosses into the rest region
        assert_eq!(cal.diff(&axes(&[(0, 2000)])).len(), 1);
        assert!(cal.diff(&axes(&[(0, 1000)])).is_empty());
    }
}
