// crates/input_core/src/map.rs
//! Declarative definitions: bindings, actions, action maps and the ids used
//! to address them once added to an `InputSystem`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use input_arena::Handle;
use input_shared::{ActionType, ValueType};

use crate::devices::DeviceId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AssetId(pub(crate) Handle);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MapId(pub(crate) Handle);

/// An action is addressed by its map and its position in that map. Indices
/// are stable while the map is enabled since structural edits are rejected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ActionId {
    pub map: MapId,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Plain,
    /// Header of a composite; `path` holds `Kind(param=value,...)`.
    Composite,
    /// Part of the closest preceding composite header.
    Part(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub path: String,
    pub override_path: Option<String>,
    /// Binding groups (e.g. control schemes) for masking.
    pub groups: Vec<String>,
    pub interactions: String,
    pub processors: String,
    pub kind: BindingKind,
}

impl Binding {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            override_path: None,
            groups: Vec::new(),
            interactions: String::new(),
            processors: String::new(),
            kind: BindingKind::Plain,
        }
    }

    pub fn composite(kind: &str) -> Self {
        Self {
            kind: BindingKind::Composite,
            ..Self::new(kind)
        }
    }

    pub fn part(name: &str, path: &str) -> Self {
        Self {
            kind: BindingKind::Part(name.to_string()),
            ..Self::new(path)
        }
    }

    /// `groups` is a `;`-separated list.
    pub fn with_groups(mut self, groups: &str) -> Self {
        self.groups = groups
            .split(';')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_interactions(mut self, interactions: &str) -> Self {
        self.interactions = interactions.to_string();
        self
    }

    pub fn with_processors(mut self, processors: &str) -> Self {
        self.processors = processors.to_string();
        self
    }

    pub fn effective_path(&self) -> &str {
        self.override_path.as_deref().unwrap_or(&self.path)
    }

    pub fn is_composite(&self) -> bool {
        self.kind == BindingKind::Composite
    }

    pub fn is_part(&self) -> bool {
        matches!(self.kind, BindingKind::Part(_))
    }
}

/// Restricts which bindings and devices take part in resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingMask {
    /// Only bindings carrying one of these groups resolve. Empty means no
    /// group restriction at this level.
    pub groups: Vec<String>,
    /// Only controls on these devices resolve.
    pub devices: Option<Vec<DeviceId>>,
}

impl BindingMask {
    pub fn groups(groups: &str) -> Self {
        Self {
            groups: Binding::new("").with_groups(groups).groups,
            devices: None,
        }
    }

    pub fn devices(devices: &[DeviceId]) -> Self {
        Self {
            groups: Vec::new(),
            devices: Some(devices.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub action_type: ActionType,
    pub bindings: Vec<Binding>,
    /// Applied to every binding, after the binding's own interactions.
    pub interactions: String,
    /// Applied to every binding, after the binding's own processors.
    pub processors: String,
    pub press_point: Option<f32>,
    pub expected_value_type: Option<ValueType>,
    pub binding_mask: Option<BindingMask>,
    /// Trigger on the first update after enabling if a bound control is
    /// already actuated.
    pub initial_state_check: bool,
}

impl Action {
    pub fn new(name: &str, action_type: ActionType) -> Self {
        Self {
            name: name.to_string(),
            action_type,
            bindings: Vec::new(),
            interactions: String::new(),
            processors: String::new(),
            press_point: None,
            expected_value_type: None,
            binding_mask: None,
            initial_state_check: action_type == ActionType::Value,
        }
    }

    pub fn button(name: &str) -> Self {
        Self::new(name, ActionType::Button)
    }

    pub fn value(name: &str) -> Self {
        Self::new(name, ActionType::Value)
    }

    pub fn pass_through(name: &str) -> Self {
        Self::new(name, ActionType::PassThrough)
    }

    pub fn with_binding(mut self, binding: impl Into<Binding>) -> Self {
        self.bindings.push(binding.into());
        self
    }

    /// Adds a composite header followed by one part binding per `(part, path)`.
    pub fn with_composite(mut self, kind: &str, parts: &[(&str, &str)]) -> Self {
        self.bindings.push(Binding::composite(kind));
        for (part, path) in parts {
            self.bindings.push(Binding::part(part, path));
        }
        self
    }

    pub fn with_interactions(mut self, interactions: &str) -> Self {
        self.interactions = interactions.to_string();
        self
    }

    pub fn with_processors(mut self, processors: &str) -> Self {
        self.processors = processors.to_string();
        self
    }

    pub fn with_press_point(mut self, press_point: f32) -> Self {
        self.press_point = Some(press_point);
        self
    }

    pub fn with_expected_value_type(mut self, value_type: ValueType) -> Self {
        self.expected_value_type = Some(value_type);
        self
    }

    pub fn with_initial_state_check(mut self, check: bool) -> Self {
        self.initial_state_check = check;
        self
    }

    /// Hash of everything that shapes the action's resolved runtime, minus
    /// the device set. Equal fingerprints mean interaction and composite
    /// layouts line up slot for slot.
    pub(crate) fn fingerprint(&self, masks: &[Option<&BindingMask>]) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.action_type.hash(&mut hasher);
        self.bindings.hash(&mut hasher);
        self.interactions.hash(&mut hasher);
        self.processors.hash(&mut hasher);
        self.press_point.map(f32::to_bits).hash(&mut hasher);
        masks.hash(&mut hasher);
        hasher.finish()
    }
}

impl From<&str> for Binding {
    fn from(path: &str) -> Self {
        Binding::new(path)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionMap {
    pub name: String,
    pub actions: Vec<Action>,
    pub binding_mask: Option<BindingMask>,
}

impl ActionMap {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actions: Vec::new(),
            binding_mask: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn action_index(&self, name: &str) -> Option<usize> {
        self.actions
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_helper_lays_out_header_then_parts() {
        let action = Action::value("Move").with_composite(
            "2DVector",
            &[("up", "<Keyboard>/w"), ("down", "<Keyboard>/s")],
        );
        assert!(action.bindings[0].is_composite());
        assert_eq!(action.bindings[1].kind, BindingKind::Part("up".into()));
        assert_eq!(action.bindings[2].path, "<Keyboard>/s");
    }

    #[test]
    fn override_path_wins() {
        let mut binding = Binding::new("<Keyboard>/space").with_groups("Keyboard; Mouse;");
        assert_eq!(binding.groups, vec!["Keyboard", "Mouse"]);
        binding.override_path = Some("<Gamepad>/buttonSouth".into());
        assert_eq!(binding.effective_path(), "<Gamepad>/buttonSouth");
    }

    #[test]
    fn fingerprint_tracks_binding_edits() {
        let action = Action::button("Fire").with_binding("<Mouse>/leftButton");
        let same = action.clone();
        let mut edited = action.clone();
        edited.bindings[0].override_path = Some("<Keyboard>/space".into());

        assert_eq!(action.fingerprint(&[]), same.fingerprint(&[]));
        assert_ne!(action.fingerprint(&[]), edited.fingerprint(&[]));
        let mask = BindingMask::groups("Keyboard");
        assert_ne!(action.fingerprint(&[]), action.fingerprint(&[Some(&mask)]));
    }

    #[test]
    fn value_actions_check_initial_state_by_default() {
        assert!(Action::value("Look").initial_state_check);
        assert!(!Action::button("Jump").initial_state_check);
    }
}
