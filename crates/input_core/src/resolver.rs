// crates/input_core/src/resolver.rs
//! Binding resolution: action definitions plus the live device set become
//! action slots. Also decides what runtime state survives a re-resolution.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::composites::Composite;
use crate::config::Settings;
use crate::devices::{ControlId, DeviceId, DeviceSet};
use crate::dispatch::Dispatcher;
use crate::map::{Action, ActionId, Binding, BindingKind, BindingMask};
use crate::params::NameAndParameters;
use crate::path::ControlPath;
use crate::phase::ActionState;
use crate::processors::Processor;
use crate::registry::Registries;
use crate::slot::{ActionSlot, CompositeSlot, InteractionSlot, ResolvedBinding, ResolvedKind};

pub(crate) struct ResolveContext<'a> {
    pub registries: &'a Registries,
    pub devices: &'a DeviceSet,
    pub settings: &'a Settings,
}

/// A binding that could not be resolved. The rest of the action still
/// resolves; the offending binding contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionIssue {
    pub map: String,
    pub action: String,
    pub binding: Option<usize>,
    pub message: String,
}

impl fmt::Display for ResolutionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding {
            Some(index) => write!(f, "{}/{} binding #{}: {}", self.map, self.action, index, self.message),
            None => write!(f, "{}/{}: {}", self.map, self.action, self.message),
        }
    }
}

struct Issues<'i> {
    map: &'i str,
    action: &'i str,
    out: &'i mut Vec<ResolutionIssue>,
}

impl Issues<'_> {
    fn report(&mut self, binding: Option<usize>, message: String) {
        warn!(map = self.map, action = self.action, binding = ?binding, %message, "binding not resolved");
        self.out.push(ResolutionIssue {
            map: self.map.to_string(),
            action: self.action.to_string(),
            binding,
            message,
        });
    }
}

/// Masks of the action, its map and its asset, combined. Groups come from
/// the most specific level that sets any; device lists intersect.
struct EffectiveMask<'m> {
    groups: &'m [String],
    devices: Option<Vec<DeviceId>>,
}

impl<'m> EffectiveMask<'m> {
    fn new(masks: &[Option<&'m BindingMask>]) -> Self {
        let groups = masks
            .iter()
            .flatten()
            .map(|m| m.groups.as_slice())
            .find(|g| !g.is_empty())
            .unwrap_or(&[]);
        let mut devices: Option<Vec<DeviceId>> = None;
        for list in masks.iter().flatten().filter_map(|m| m.devices.as_ref()) {
            devices = Some(match devices {
                None => list.clone(),
                Some(current) => current.into_iter().filter(|d| list.contains(d)).collect(),
            });
        }
        Self { groups, devices }
    }

    fn admits_binding(&self, binding: &Binding) -> bool {
        self.groups.is_empty()
            || binding
                .groups
                .iter()
                .any(|g| self.groups.iter().any(|m| m.eq_ignore_ascii_case(g)))
    }

    fn admits_control(&self, control: ControlId) -> bool {
        self.devices
            .as_ref()
            .map_or(true, |devices| devices.contains(&control.device))
    }
}

/// Where the parts following a header go.
#[derive(Clone, Copy)]
enum Header {
    None,
    Unresolved,
    Composite(usize),
}

/// `masks` is `[action, map, asset]`.
pub(crate) fn resolve_action(
    ctx: &ResolveContext<'_>,
    action: &Action,
    map_name: &str,
    masks: [Option<&BindingMask>; 3],
    issues: &mut Vec<ResolutionIssue>,
) -> ActionSlot {
    let mask = EffectiveMask::new(&masks);
    let mut issues = Issues {
        map: map_name,
        action: &action.name,
        out: issues,
    };
    let mut slot = ActionSlot {
        name: action.name.clone(),
        map_name: map_name.to_string(),
        action_type: action.action_type,
        press_point: ctx.settings.press_point_or_default(action.press_point),
        expected_value_type: action.expected_value_type,
        initial_state_check: action.initial_state_check,
        fingerprint: action.fingerprint(&masks),
        enabled: false,
        initial_check_pending: false,
        controls: Vec::new(),
        bindings: Vec::with_capacity(action.bindings.len()),
        composites: Vec::new(),
        interactions: Vec::new(),
        state: ActionState::default(),
    };
    let action_processors = parse_list(&action.processors, None, &mut issues);
    let action_interactions = parse_list(&action.interactions, None, &mut issues);

    let mut header = Header::None;
    for (index, binding) in action.bindings.iter().enumerate() {
        let start = slot.interactions.len();
        let resolved = match &binding.kind {
            BindingKind::Composite => {
                let processors = create_processors(ctx, binding, &action_processors, index, &mut issues);
                let interactions =
                    create_interactions(ctx, binding, &action_interactions, index, &mut slot, &mut issues);
                match create_composite(ctx, binding, index, &mut issues) {
                    Some(kind) => {
                        let complexity = kind.part_names().len();
                        slot.composites.push(CompositeSlot::new(kind, index));
                        let composite = slot.composites.len() - 1;
                        header = Header::Composite(composite);
                        ResolvedBinding {
                            kind: ResolvedKind::Composite(Some(composite)),
                            controls: Vec::new(),
                            processors,
                            interactions,
                            complexity,
                        }
                    }
                    None => {
                        header = Header::Unresolved;
                        ResolvedBinding {
                            kind: ResolvedKind::Composite(None),
                            controls: Vec::new(),
                            processors,
                            interactions,
                            complexity: 1,
                        }
                    }
                }
            }
            BindingKind::Part(name) => match header {
                Header::Composite(composite) => {
                    match slot.composites[composite].kind.part_index(name) {
                        Some(part) => {
                            let controls = if mask.admits_binding(binding) {
                                resolve_controls(ctx, binding, &mask, index, &mut issues)
                            } else {
                                Vec::new()
                            };
                            let part_slot = &mut slot.composites[composite].parts[part];
                            for &control in &controls {
                                if !part_slot.controls.iter().any(|(c, _)| *c == control) {
                                    part_slot.controls.push((control, index));
                                }
                            }
                            ResolvedBinding {
                                kind: ResolvedKind::Part { composite, part },
                                controls,
                                processors: create_processors(ctx, binding, &[], index, &mut issues),
                                interactions: start..start,
                                complexity: slot.composites[composite].parts.len(),
                            }
                        }
                        None => {
                            issues.report(Some(index), format!("composite has no part named '{name}'"));
                            ResolvedBinding::unresolved(start)
                        }
                    }
                }
                Header::Unresolved => ResolvedBinding::unresolved(start),
                Header::None => {
                    issues.report(Some(index), format!("part '{name}' does not follow a composite"));
                    ResolvedBinding::unresolved(start)
                }
            },
            BindingKind::Plain => {
                header = Header::None;
                if mask.admits_binding(binding) {
                    let controls = resolve_controls(ctx, binding, &mask, index, &mut issues);
                    let processors = create_processors(ctx, binding, &action_processors, index, &mut issues);
                    let interactions =
                        create_interactions(ctx, binding, &action_interactions, index, &mut slot, &mut issues);
                    ResolvedBinding {
                        kind: ResolvedKind::Plain,
                        controls,
                        processors,
                        interactions,
                        complexity: 1,
                    }
                } else {
                    ResolvedBinding::unresolved(start)
                }
            }
        };

        for &control in &resolved.controls {
            if !slot.controls.contains(&control) {
                slot.controls.push(control);
            }
        }
        slot.bindings.push(resolved);
    }
    slot
}

fn parse_list(text: &str, binding: Option<usize>, issues: &mut Issues<'_>) -> Vec<NameAndParameters> {
    match NameAndParameters::parse_list(text) {
        Ok(list) => list,
        Err(e) => {
            issues.report(binding, e.to_string());
            Vec::new()
        }
    }
}

fn create_composite(
    ctx: &ResolveContext<'_>,
    binding: &Binding,
    index: usize,
    issues: &mut Issues<'_>,
) -> Option<Box<dyn Composite>> {
    let params = match NameAndParameters::parse(binding.effective_path()) {
        Ok(params) => params,
        Err(e) => {
            issues.report(Some(index), e.to_string());
            return None;
        }
    };
    match ctx.registries.create_composite(&params) {
        Some(Ok(kind)) => Some(kind),
        Some(Err(e)) => {
            issues.report(Some(index), e.to_string());
            None
        }
        None => {
            issues.report(Some(index), format!("unknown composite '{}'", params.name));
            None
        }
    }
}

fn create_processors(
    ctx: &ResolveContext<'_>,
    binding: &Binding,
    inherited: &[NameAndParameters],
    index: usize,
    issues: &mut Issues<'_>,
) -> Vec<Box<dyn Processor>> {
    let own = parse_list(&binding.processors, Some(index), issues);
    let mut out = Vec::new();
    for params in own.iter().chain(inherited) {
        match ctx.registries.create_processor(params) {
            Some(Ok(processor)) => out.push(processor),
            Some(Err(e)) => issues.report(Some(index), e.to_string()),
            None => issues.report(Some(index), format!("unknown processor '{}'", params.name)),
        }
    }
    out
}

/// Instantiates the binding's interactions, then the action's, into
/// `slot.interactions`. Every binding gets its own instances.
fn create_interactions(
    ctx: &ResolveContext<'_>,
    binding: &Binding,
    inherited: &[NameAndParameters],
    index: usize,
    slot: &mut ActionSlot,
    issues: &mut Issues<'_>,
) -> std::ops::Range<usize> {
    let start = slot.interactions.len();
    let own = parse_list(&binding.interactions, Some(index), issues);
    for params in own.iter().chain(inherited) {
        match ctx.registries.create_interaction(params) {
            Some(Ok(interaction)) => slot
                .interactions
                .push(InteractionSlot::new(&params.name, index, interaction)),
            Some(Err(e)) => issues.report(Some(index), e.to_string()),
            None => issues.report(Some(index), format!("unknown interaction '{}'", params.name)),
        }
    }
    start..slot.interactions.len()
}

fn resolve_controls(
    ctx: &ResolveContext<'_>,
    binding: &Binding,
    mask: &EffectiveMask<'_>,
    index: usize,
    issues: &mut Issues<'_>,
) -> Vec<ControlId> {
    let path = match ControlPath::parse(binding.effective_path()) {
        Ok(path) => path,
        Err(e) => {
            issues.report(Some(index), e.to_string());
            return Vec::new();
        }
    };
    let mut controls = Vec::new();
    path.resolve(ctx.devices, &mut controls);
    controls.retain(|c| mask.admits_control(*c));
    controls
}

/// True if `new` only adds controls to `old`: same definitions, and every
/// binding and part keeps its previous controls in front.
pub(crate) fn is_additive(old: &ActionSlot, new: &ActionSlot) -> bool {
    old.fingerprint == new.fingerprint
        && old.bindings.len() == new.bindings.len()
        && old.interactions.len() == new.interactions.len()
        && old.composites.len() == new.composites.len()
        && old
            .bindings
            .iter()
            .zip(&new.bindings)
            .all(|(o, n)| n.controls.starts_with(&o.controls))
        && old.composites.iter().zip(&new.composites).all(|(o, n)| {
            o.parts
                .iter()
                .zip(&n.parts)
                .all(|(op, np)| np.controls.starts_with(&op.controls))
        })
}

/// Moves runtime state from the previous resolution into `new`. Additive
/// changes keep everything; otherwise an in-progress action cancels with its
/// default value and only the frame latches survive.
pub(crate) fn carry_over(
    dispatcher: &mut Dispatcher<'_>,
    id: ActionId,
    mut old: ActionSlot,
    new: &mut ActionSlot,
    time: f64,
) {
    new.enabled = old.enabled;
    new.initial_check_pending = old.initial_check_pending;

    if is_additive(&old, new) {
        new.state = std::mem::take(&mut old.state);
        new.interactions = std::mem::take(&mut old.interactions);
        for (o, n) in old.composites.iter().zip(new.composites.iter_mut()) {
            for (op, np) in o.parts.iter().zip(n.parts.iter_mut()) {
                np.driver = op.driver;
            }
        }
        return;
    }

    if old.enabled && old.state.phase.is_in_progress() {
        dispatcher.cancel_to_default(&mut old, id, time, false);
    }
    dispatcher.reset_interactions(&mut old);

    let latched = &old.state;
    new.state.pressed_in_update = latched.pressed_in_update;
    new.state.released_in_update = latched.released_in_update;
    new.state.performed_in_update = latched.performed_in_update;
    new.state.completed_in_update = latched.completed_in_update;
    if old.enabled {
        new.state.reset_to_waiting();
        new.initial_check_pending = new.initial_state_check;
    }
}

/// A bound control to watch, and the binding it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Monitor {
    pub action: ActionId,
    pub binding: usize,
    pub complexity: usize,
}

/// Registers monitors for every resolved control of `slot`. A control bound
/// twice through plain bindings of one action is watched once.
pub(crate) fn add_monitors(slot: &ActionSlot, id: ActionId, monitors: &mut HashMap<ControlId, Vec<Monitor>>) {
    let mut plain_seen: Vec<ControlId> = Vec::new();
    for (index, binding) in slot.bindings.iter().enumerate() {
        let plain = binding.kind == ResolvedKind::Plain;
        for &control in &binding.controls {
            if plain {
                if plain_seen.contains(&control) {
                    continue;
                }
                plain_seen.push(control);
            }
            let list = monitors.entry(control).or_default();
            if !list.iter().any(|m| m.action == id && m.binding == index) {
                list.push(Monitor {
                    action: id,
                    binding: index,
                    complexity: binding.complexity,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputDefaults;
    use crate::devices::{ControlGraph, DeviceDesc};
    use crate::map::MapId;
    use input_arena::Handle;

    struct Fixture {
        registries: Registries,
        devices: DeviceSet,
        settings: Settings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registries: InputDefaults::registries(),
                devices: DeviceSet::new(),
                settings: Settings::default(),
            }
        }

        fn resolve(&self, action: &Action, masks: [Option<&BindingMask>; 3]) -> (ActionSlot, Vec<ResolutionIssue>) {
            let ctx = ResolveContext {
                registries: &self.registries,
                devices: &self.devices,
                settings: &self.settings,
            };
            let mut issues = Vec::new();
            let slot = resolve_action(&ctx, action, "gameplay", masks, &mut issues);
            (slot, issues)
        }

        fn paths(&self, controls: &[ControlId]) -> Vec<String> {
            controls.iter().map(|c| self.devices.control_path(*c)).collect()
        }
    }

    #[test]
    fn controls_are_deduplicated_in_binding_order() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        let action = Action::button("jump")
            .with_binding("<Keyboard>/space")
            .with_binding("<Keyboard>/w")
            .with_binding("<Keyboard>/space");
        let (slot, issues) = fx.resolve(&action, [None; 3]);
        assert!(issues.is_empty());
        assert_eq!(fx.paths(&slot.controls), vec!["/Keyboard/space", "/Keyboard/w"]);
        assert_eq!(slot.bindings.len(), 3);
    }

    #[test]
    fn composite_parts_collect_under_their_header() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        let action = Action::value("move").with_composite(
            "2DVector",
            &[("up", "<Keyboard>/w"), ("down", "<Keyboard>/s"), ("up", "<Keyboard>/upArrow")],
        );
        let (slot, issues) = fx.resolve(&action, [None; 3]);
        assert!(issues.is_empty());
        assert_eq!(slot.composites.len(), 1);
        let up = &slot.composites[0].parts[0];
        assert_eq!(up.controls.len(), 2);
        assert!(slot.bindings[0].controls.is_empty());
        assert_eq!(slot.bindings[1].complexity, 4);
    }

    #[test]
    fn unknown_kinds_are_reported_but_do_not_abort() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        let action = Action::button("fire")
            .with_binding(Binding::new("<Keyboard>/space").with_interactions("doubleSecret"))
            .with_composite("Nope", &[("up", "<Keyboard>/w")])
            .with_composite("2DVector", &[("sideways", "<Keyboard>/a")])
            .with_binding("<Keyboard>/enter");
        let (slot, issues) = fx.resolve(&action, [None; 3]);

        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "unknown interaction 'doubleSecret'",
                "unknown composite 'Nope'",
                "composite has no part named 'sideways'",
            ]
        );
        assert_eq!(fx.paths(&slot.controls), vec!["/Keyboard/space", "/Keyboard/enter"]);
    }

    #[test]
    fn group_mask_uses_most_specific_level() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        fx.devices.add(DeviceDesc::gamepad());
        let action = Action::button("fire")
            .with_binding(Binding::new("<Keyboard>/space").with_groups("Keyboard"))
            .with_binding(Binding::new("<Gamepad>/buttonSouth").with_groups("Gamepad"))
            .with_binding("<Keyboard>/enter");

        let asset = BindingMask::groups("Keyboard");
        let map = BindingMask::groups("Gamepad");
        let (slot, _) = fx.resolve(&action, [None, Some(&map), Some(&asset)]);
        assert_eq!(fx.paths(&slot.controls), vec!["/Gamepad/buttonSouth"]);
    }

    #[test]
    fn device_masks_intersect() {
        let mut fx = Fixture::new();
        let first = fx.devices.add(DeviceDesc::gamepad().with_name("Pad1"));
        let second = fx.devices.add(DeviceDesc::gamepad().with_name("Pad2"));
        let action = Action::button("fire").with_binding("<Gamepad>/buttonSouth");

        let both = BindingMask::devices(&[first, second]);
        let only_second = BindingMask::devices(&[second]);
        let (slot, _) = fx.resolve(&action, [Some(&only_second), None, Some(&both)]);
        assert_eq!(fx.paths(&slot.controls), vec!["/Pad2/buttonSouth"]);
    }

    #[test]
    fn appended_device_is_additive_and_removal_is_not() {
        let mut fx = Fixture::new();
        let first = fx.devices.add(DeviceDesc::gamepad().with_name("Pad1"));
        let action = Action::button("fire").with_binding("*/buttonSouth");
        let (before, _) = fx.resolve(&action, [None; 3]);

        fx.devices.add(DeviceDesc::gamepad().with_name("Pad2"));
        let (after, _) = fx.resolve(&action, [None; 3]);
        assert!(is_additive(&before, &after));

        fx.devices.remove(first);
        let (removed, _) = fx.resolve(&action, [None; 3]);
        assert!(!is_additive(&after, &removed));
    }

    #[test]
    fn editing_a_binding_is_not_additive() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        let action = Action::button("fire").with_binding("<Keyboard>/space");
        let (before, _) = fx.resolve(&action, [None; 3]);
        let edited = action.clone().with_binding("<Keyboard>/enter");
        let (after, _) = fx.resolve(&edited, [None; 3]);
        assert!(!is_additive(&before, &after));
    }

    #[test]
    fn plain_duplicates_are_monitored_once() {
        let mut fx = Fixture::new();
        fx.devices.add(DeviceDesc::keyboard());
        let action = Action::button("fire")
            .with_binding("<Keyboard>/space")
            .with_binding("<Keyboard>/space")
            .with_composite("OneModifier", &[("modifier", "<Keyboard>/leftShift"), ("binding", "<Keyboard>/space")]);
        let (slot, _) = fx.resolve(&action, [None; 3]);

        let id = ActionId {
            map: MapId(Handle::new(0, 0)),
            index: 0,
        };
        let mut monitors = HashMap::new();
        add_monitors(&slot, id, &mut monitors);
        let space = slot.controls[0];
        let complexities: Vec<usize> = monitors[&space].iter().map(|m| m.complexity).collect();
        assert_eq!(complexities, vec![1, 2]);
    }
}
