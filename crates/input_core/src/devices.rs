// crates/input_core/src/devices.rs
//! The control graph the action runtime consumes: devices, their controls and
//! the current value of each control.

use glam::Vec2;
use input_arena::{Arena, Handle};
use input_shared::{ControlValue, ValueType};
use tracing::warn;

use crate::error::{InputError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct DeviceId(pub(crate) Handle);

/// A control is addressed by its device and its position in the device's
/// control list. Never owns the control.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ControlId {
    pub device: DeviceId,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlDesc {
    /// Hierarchical name, e.g. `leftStick` or `dpad/up`.
    pub name: String,
    pub aliases: Vec<String>,
    pub display_name: String,
    pub usages: Vec<String>,
    pub value_type: ValueType,
    pub default_value: ControlValue,
}

impl ControlDesc {
    pub fn button(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            display_name: name.to_string(),
            usages: Vec::new(),
            value_type: ValueType::Float,
            default_value: ControlValue::Float(0.0),
        }
    }

    pub fn axis(name: &str) -> Self {
        Self::button(name)
    }

    pub fn stick(name: &str) -> Self {
        Self {
            value_type: ValueType::Vector2,
            default_value: ControlValue::Vector2(Vec2::ZERO),
            ..Self::button(name)
        }
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usages.push(usage.to_string());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }
}

/// Names of the keys on the stock keyboard layout, in control order.
pub const KEYBOARD_KEYS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0",
    "space", "enter", "escape", "tab", "backspace", "leftShift", "rightShift", "leftCtrl",
    "rightCtrl", "leftAlt", "rightAlt", "upArrow", "downArrow", "leftArrow", "rightArrow",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDesc {
    pub name: String,
    pub layout: String,
    /// Layouts this device also answers to, e.g. a `DualShock` is a `Gamepad`.
    pub base_layouts: Vec<String>,
    pub usages: Vec<String>,
    /// Timeouts driven by this device keep firing during editor updates.
    pub run_in_background: bool,
    pub controls: Vec<ControlDesc>,
}

impl DeviceDesc {
    pub fn new(layout: &str) -> Self {
        Self {
            name: layout.to_string(),
            layout: layout.to_string(),
            base_layouts: Vec::new(),
            usages: Vec::new(),
            run_in_background: false,
            controls: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_base_layout(mut self, layout: &str) -> Self {
        self.base_layouts.push(layout.to_string());
        self
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usages.push(usage.to_string());
        self
    }

    pub fn with_control(mut self, control: ControlDesc) -> Self {
        self.controls.push(control);
        self
    }

    pub fn running_in_background(mut self) -> Self {
        self.run_in_background = true;
        self
    }

    pub fn keyboard() -> Self {
        let mut desc = Self::new("Keyboard");
        for key in KEYBOARD_KEYS {
            let display = if key.len() == 1 {
                key.to_uppercase()
            } else {
                key.to_string()
            };
            desc.controls
                .push(ControlDesc::button(key).with_display_name(&display));
        }
        desc
    }

    pub fn mouse() -> Self {
        Self::new("Mouse")
            .with_control(ControlDesc::button("leftButton").with_usage("PrimaryAction"))
            .with_control(ControlDesc::button("rightButton").with_usage("SecondaryAction"))
            .with_control(ControlDesc::button("middleButton"))
            .with_control(ControlDesc::stick("position").with_usage("Point"))
            .with_control(ControlDesc::stick("delta"))
            .with_control(ControlDesc::stick("scroll").with_usage("ScrollWheel"))
    }

    pub fn gamepad() -> Self {
        Self::new("Gamepad")
            .with_control(
                ControlDesc::button("buttonSouth")
                    .with_alias("a")
                    .with_alias("cross")
                    .with_usage("PrimaryAction")
                    .with_usage("Submit"),
            )
            .with_control(
                ControlDesc::button("buttonEast")
                    .with_alias("b")
                    .with_alias("circle")
                    .with_usage("Back")
                    .with_usage("Cancel"),
            )
            .with_control(ControlDesc::button("buttonWest").with_alias("x").with_alias("square"))
            .with_control(ControlDesc::button("buttonNorth").with_alias("y").with_alias("triangle"))
            .with_control(ControlDesc::button("leftShoulder"))
            .with_control(ControlDesc::button("rightShoulder"))
            .with_control(ControlDesc::axis("leftTrigger"))
            .with_control(ControlDesc::axis("rightTrigger"))
            .with_control(ControlDesc::button("start").with_usage("Menu"))
            .with_control(ControlDesc::button("select"))
            .with_control(ControlDesc::button("dpad/up"))
            .with_control(ControlDesc::button("dpad/down"))
            .with_control(ControlDesc::button("dpad/left"))
            .with_control(ControlDesc::button("dpad/right"))
            .with_control(ControlDesc::stick("leftStick").with_usage("Primary2DMotion"))
            .with_control(ControlDesc::stick("rightStick").with_usage("Secondary2DMotion"))
    }

    /// True if the device is of `layout` or derives from it (case-insensitive).
    pub fn is_layout(&self, layout: &str) -> bool {
        self.layout.eq_ignore_ascii_case(layout)
            || self.base_layouts.iter().any(|l| l.eq_ignore_ascii_case(layout))
    }
}

/// What the runtime needs from the external device/control object model.
pub trait ControlGraph {
    /// Device identities in enumeration order.
    fn device_ids(&self) -> &[DeviceId];
    fn device(&self, id: DeviceId) -> Option<&DeviceDesc>;
    fn value(&self, control: ControlId) -> Option<ControlValue>;
    /// Time the control last crossed the press point from below.
    fn press_time(&self, control: ControlId) -> Option<f64>;
    fn config_version(&self, device: DeviceId) -> u32;

    fn control_desc(&self, control: ControlId) -> Option<&ControlDesc> {
        self.device(control.device)?
            .controls
            .get(control.index as usize)
    }

    fn magnitude(&self, control: ControlId) -> f32 {
        self.value(control).map(|v| v.magnitude()).unwrap_or(0.0)
    }

    fn default_value(&self, control: ControlId) -> Option<ControlValue> {
        self.control_desc(control).map(|c| c.default_value)
    }

    /// Human-readable path such as `/Keyboard/space`.
    fn control_path(&self, control: ControlId) -> String {
        match (self.device(control.device), self.control_desc(control)) {
            (Some(device), Some(desc)) => format!("/{}/{}", device.name, desc.name),
            _ => "<removed>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ControlState {
    value: ControlValue,
    pressed: bool,
    press_time: Option<f64>,
}

struct DeviceEntry {
    desc: DeviceDesc,
    state: Vec<ControlState>,
    config_version: u32,
}

/// In-process control graph: owns device descriptions and current values.
#[derive(Default)]
pub struct DeviceSet {
    devices: Arena<DeviceEntry>,
    order: Vec<DeviceId>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, desc: DeviceDesc) -> DeviceId {
        let state = desc
            .controls
            .iter()
            .map(|c| ControlState {
                value: c.default_value,
                pressed: false,
                press_time: None,
            })
            .collect();
        let id = DeviceId(self.devices.insert(DeviceEntry {
            desc,
            state,
            config_version: 0,
        }));
        self.order.push(id);
        id
    }

    pub(crate) fn remove(&mut self, id: DeviceId) -> Option<DeviceDesc> {
        let entry = self.devices.remove(id.0)?;
        self.order.retain(|d| *d != id);
        Some(entry.desc)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a control by name or alias, case-insensitively.
    pub fn control(&self, device: DeviceId, name: &str) -> Option<ControlId> {
        let entry = self.devices.get(device.0)?;
        entry
            .desc
            .controls
            .iter()
            .position(|c| {
                c.name.eq_ignore_ascii_case(name)
                    || c.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
            })
            .map(|index| ControlId {
                device,
                index: index as u32,
            })
    }

    pub fn controls(&self, device: DeviceId) -> impl Iterator<Item = (ControlId, &ControlDesc)> {
        self.devices
            .get(device.0)
            .into_iter()
            .flat_map(move |entry| {
                entry.desc.controls.iter().enumerate().map(move |(index, desc)| {
                    (
                        ControlId {
                            device,
                            index: index as u32,
                        },
                        desc,
                    )
                })
            })
    }

    /// Store a new value. Returns false if the control is unknown, the value
    /// has the wrong type or nothing changed.
    pub(crate) fn write_value(
        &mut self,
        control: ControlId,
        value: ControlValue,
        time: f64,
        press_point: f32,
    ) -> bool {
        let Some(entry) = self.devices.get_mut(control.device.0) else {
            return false;
        };
        let index = control.index as usize;
        let (Some(desc), Some(state)) = (entry.desc.controls.get(index), entry.state.get_mut(index))
        else {
            return false;
        };
        if desc.value_type != value.value_type() {
            warn!(
                control = %desc.name,
                expected = %desc.value_type,
                actual = %value.value_type(),
                "dropping state change with mismatched value type"
            );
            return false;
        }
        if state.value == value {
            return false;
        }

        state.value = value;
        let magnitude = value.magnitude();
        if !state.pressed && magnitude >= press_point {
            state.pressed = true;
            state.press_time = Some(time);
        } else if state.pressed && magnitude < press_point {
            state.pressed = false;
        }
        true
    }

    /// Put every control of `device` back to its default value.
    pub(crate) fn reset_device(&mut self, device: DeviceId) -> bool {
        let Some(entry) = self.devices.get_mut(device.0) else {
            return false;
        };
        for (desc, state) in entry.desc.controls.iter().zip(entry.state.iter_mut()) {
            state.value = desc.default_value;
            state.pressed = false;
        }
        true
    }

    /// Remap a control's display name (e.g. a keyboard layout change). Bumps
    /// the device configuration version.
    pub(crate) fn set_display_name(&mut self, control: ControlId, display_name: &str) -> Result<()> {
        let entry = self
            .devices
            .get_mut(control.device.0)
            .ok_or(InputError::UnknownDevice)?;
        let desc = entry
            .desc
            .controls
            .get_mut(control.index as usize)
            .ok_or(InputError::UnknownDevice)?;
        desc.display_name = display_name.to_string();
        entry.config_version = entry.config_version.wrapping_add(1);
        Ok(())
    }
}

impl ControlGraph for DeviceSet {
    fn device_ids(&self) -> &[DeviceId] {
        &self.order
    }

    fn device(&self, id: DeviceId) -> Option<&DeviceDesc> {
        self.devices.get(id.0).map(|e| &e.desc)
    }

    fn value(&self, control: ControlId) -> Option<ControlValue> {
        self.devices
            .get(control.device.0)?
            .state
            .get(control.index as usize)
            .map(|s| s.value)
    }

    fn press_time(&self, control: ControlId) -> Option<f64> {
        self.devices
            .get(control.device.0)?
            .state
            .get(control.index as usize)?
            .press_time
    }

    fn config_version(&self, device: DeviceId) -> u32 {
        self.devices
            .get(device.0)
            .map(|e| e.config_version)
            .unwrap_or(0)
    }
}
