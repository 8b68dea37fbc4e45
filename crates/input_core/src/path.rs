// crates/input_core/src/path.rs
//! Binding path matching: `<Layout>{DeviceUsage}/segment/segment`.
//!
//! A device part is `<Layout>` or `*`. Control segments are names (aliases
//! honored, case-insensitive) or `*`. A lone `{Usage}` or `#(DisplayName)`
//! segment matches controls by usage or by their current display name.

use crate::devices::{ControlDesc, ControlGraph, ControlId, DeviceDesc};
use crate::error::{InputError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DevicePattern {
    Any,
    Layout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Name(String),
    Any,
    Usage(String),
    DisplayName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPath {
    device: DevicePattern,
    device_usage: Option<String>,
    segments: Vec<Segment>,
}

impl ControlPath {
    pub fn parse(text: &str) -> Result<Self> {
        let path = text.trim();
        let (device, rest) = if let Some(stripped) = path.strip_prefix('<') {
            let close = stripped
                .find('>')
                .ok_or_else(|| InputError::invalid_path(text, "unterminated '<'"))?;
            let layout = stripped[..close].trim();
            if layout.is_empty() {
                return Err(InputError::invalid_path(text, "empty layout name"));
            }
            (DevicePattern::Layout(layout.to_string()), &stripped[close + 1..])
        } else if let Some(stripped) = path.strip_prefix('*') {
            (DevicePattern::Any, stripped)
        } else {
            return Err(InputError::invalid_path(text, "expected '<Layout>' or '*'"));
        };

        let (device_usage, rest) = match rest.strip_prefix('{') {
            Some(stripped) => {
                let close = stripped
                    .find('}')
                    .ok_or_else(|| InputError::invalid_path(text, "unterminated '{'"))?;
                (Some(stripped[..close].to_string()), &stripped[close + 1..])
            }
            None => (None, rest),
        };

        let rest = rest
            .strip_prefix('/')
            .ok_or_else(|| InputError::invalid_path(text, "missing control part"))?;

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            let raw = raw.trim();
            let segment = if raw.is_empty() {
                return Err(InputError::invalid_path(text, "empty path segment"));
            } else if raw == "*" {
                Segment::Any
            } else if let Some(usage) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
                Segment::Usage(usage.to_string())
            } else if let Some(name) = raw.strip_prefix("#(").and_then(|r| r.strip_suffix(')')) {
                Segment::DisplayName(name.to_string())
            } else {
                Segment::Name(raw.to_string())
            };
            segments.push(segment);
        }

        let whole_control = segments
            .iter()
            .any(|s| matches!(s, Segment::Usage(_) | Segment::DisplayName(_)));
        if whole_control && segments.len() != 1 {
            return Err(InputError::invalid_path(
                text,
                "usage and display-name filters must be the only control segment",
            ));
        }

        Ok(Self {
            device,
            device_usage,
            segments,
        })
    }

    /// True if matches depend on display names, which change with device
    /// configuration (e.g. keyboard layout remaps).
    pub fn is_name_based(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::DisplayName(_)])
    }

    pub fn matches_device(&self, device: &DeviceDesc) -> bool {
        let layout_ok = match &self.device {
            DevicePattern::Any => true,
            DevicePattern::Layout(layout) => device.is_layout(layout),
        };
        let usage_ok = match &self.device_usage {
            None => true,
            Some(usage) => device.usages.iter().any(|u| u.eq_ignore_ascii_case(usage)),
        };
        layout_ok && usage_ok
    }

    pub fn matches_control(&self, control: &ControlDesc) -> bool {
        match self.segments.as_slice() {
            [Segment::Usage(usage)] => control.usages.iter().any(|u| u.eq_ignore_ascii_case(usage)),
            [Segment::DisplayName(name)] => control.display_name.eq_ignore_ascii_case(name),
            [Segment::Name(name)]
                if control.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)) =>
            {
                true
            }
            segments => {
                let parts: Vec<&str> = control.name.split('/').collect();
                parts.len() == segments.len()
                    && segments.iter().zip(parts).all(|(segment, part)| match segment {
                        Segment::Any => true,
                        Segment::Name(name) => name.eq_ignore_ascii_case(part),
                        Segment::Usage(_) | Segment::DisplayName(_) => false,
                    })
            }
        }
    }

    /// Fan out over every device in the graph, in enumeration order.
    pub fn resolve(&self, graph: &dyn ControlGraph, out: &mut Vec<ControlId>) {
        for &device_id in graph.device_ids() {
            let Some(device) = graph.device(device_id) else {
                continue;
            };
            if !self.matches_device(device) {
                continue;
            }
            for (index, control) in device.controls.iter().enumerate() {
                if self.matches_control(control) {
                    out.push(ControlId {
                        device: device_id,
                        index: index as u32,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{DeviceDesc, DeviceSet};

    fn resolve(devices: &DeviceSet, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        ControlPath::parse(path).unwrap().resolve(devices, &mut out);
        out.into_iter().map(|c| devices.control_path(c)).collect()
    }

    #[test]
    fn layout_and_name_match_case_insensitively() {
        let mut devices = DeviceSet::new();
        devices.add(DeviceDesc::keyboard());
        assert_eq!(resolve(&devices, "<keyboard>/SPACE"), vec!["/Keyboard/space"]);
    }

    #[test]
    fn wildcard_device_fans_out_across_devices() {
        let mut devices = DeviceSet::new();
        devices.add(DeviceDesc::gamepad().with_name("Gamepad1"));
        devices.add(DeviceDesc::gamepad().with_name("Gamepad2"));
        assert_eq!(
            resolve(&devices, "*/buttonSouth"),
            vec!["/Gamepad1/buttonSouth", "/Gamepad2/buttonSouth"]
        );
    }

    #[test]
    fn usage_filter_and_nested_wildcard() {
        let mut devices = DeviceSet::new();
        devices.add(DeviceDesc::gamepad());
        devices.add(DeviceDesc::mouse());
        assert_eq!(
            resolve(&devices, "*/{PrimaryAction}"),
            vec!["/Gamepad/buttonSouth", "/Mouse/leftButton"]
        );
        assert_eq!(resolve(&devices, "<Gamepad>/dpad/*").len(), 4);
        // A single '*' only matches top-level controls.
        assert!(!resolve(&devices, "<Gamepad>/*").contains(&"/Gamepad/dpad/up".to_string()));
    }

    #[test]
    fn base_layouts_and_device_usages() {
        let mut devices = DeviceSet::new();
        devices.add(
            DeviceDesc::gamepad()
                .with_name("DualShock")
                .with_base_layout("Gamepad")
                .with_usage("LeftHand"),
        );
        assert_eq!(resolve(&devices, "<Gamepad>{LeftHand}/cross").len(), 1);
        assert!(resolve(&devices, "<Gamepad>{RightHand}/cross").is_empty());
    }

    #[test]
    fn display_name_paths_are_name_based() {
        let mut devices = DeviceSet::new();
        devices.add(DeviceDesc::keyboard());
        let path = ControlPath::parse("<Keyboard>/#(Q)").unwrap();
        assert!(path.is_name_based());
        assert_eq!(resolve(&devices, "<Keyboard>/#(q)"), vec!["/Keyboard/q"]);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in ["Keyboard/space", "<Keyboard", "<>/a", "<Keyboard>", "<Keyboard>//a", "<Keyboard>/{Usage}/x"] {
            assert!(ControlPath::parse(path).is_err(), "{path} should not parse");
        }
    }

    #[test]
    fn unmatched_path_is_empty_not_error() {
        let mut devices = DeviceSet::new();
        devices.add(DeviceDesc::keyboard());
        assert!(resolve(&devices, "<Joystick>/trigger").is_empty());
    }
}
