// crates/input_core/src/callbacks.rs
//! Action callbacks and the deferred command queue handed to them.

use std::panic::{catch_unwind, AssertUnwindSafe};

use input_arena::{Arena, Handle};
use input_shared::ActionPhase;
use tracing::error;

use crate::devices::{DeviceDesc, DeviceId};
use crate::map::{ActionId, Binding, MapId};
use crate::notify::ActionEvent;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CallbackId(Handle);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CallbackKind {
    Started,
    Performed,
    Canceled,
    /// Every phase change of the target.
    Any,
}

impl CallbackKind {
    fn matches(self, phase: ActionPhase) -> bool {
        match self {
            CallbackKind::Started => phase == ActionPhase::Started,
            CallbackKind::Performed => phase == ActionPhase::Performed,
            CallbackKind::Canceled => phase == ActionPhase::Canceled,
            CallbackKind::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CallbackKind::Started => "started",
            CallbackKind::Performed => "performed",
            CallbackKind::Canceled => "canceled",
            CallbackKind::Any => "action triggered",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum CallbackTarget {
    Action(ActionId),
    /// Any action of the map.
    Map(MapId),
}

pub type ActionCallback = Box<dyn FnMut(&ActionEvent, &mut Commands)>;

struct CallbackEntry {
    target: CallbackTarget,
    kind: CallbackKind,
    /// Taken out while the callback runs.
    func: Option<ActionCallback>,
}

#[derive(Default)]
pub(crate) struct CallbackTable {
    entries: Arena<CallbackEntry>,
    order: Vec<CallbackId>,
    snapshot: Vec<CallbackId>,
}

impl CallbackTable {
    pub fn add(&mut self, target: CallbackTarget, kind: CallbackKind, func: ActionCallback) -> CallbackId {
        let id = CallbackId(self.entries.insert(CallbackEntry {
            target,
            kind,
            func: Some(func),
        }));
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: CallbackId) -> bool {
        if self.entries.remove(id.0).is_none() {
            return false;
        }
        self.order.retain(|c| *c != id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Drops callbacks of a removed action and shifts the ones registered on
    /// later actions of the same map down by one.
    pub fn action_removed(&mut self, removed: ActionId) {
        let stale: Vec<CallbackId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.entries
                    .get(id.0)
                    .is_some_and(|e| e.target == CallbackTarget::Action(removed))
            })
            .collect();
        for id in stale {
            self.remove(id);
        }
        for (_, entry) in self.entries.iter_mut() {
            if let CallbackTarget::Action(action) = &mut entry.target {
                if action.map == removed.map && action.index > removed.index {
                    action.index -= 1;
                }
            }
        }
    }

    pub fn map_removed(&mut self, map: MapId) {
        let stale: Vec<CallbackId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.entries.get(id.0).is_some_and(|e| match e.target {
                    CallbackTarget::Action(action) => action.map == map,
                    CallbackTarget::Map(m) => m == map,
                })
            })
            .collect();
        for id in stale {
            self.remove(id);
        }
    }

    /// Runs the action's own callbacks, then its map's, against a snapshot
    /// of the registrations. Removals requested during the round take effect
    /// once the round is over.
    pub fn invoke(&mut self, event: &ActionEvent, commands: &mut Commands, map: &str, action: &str) {
        let mut snapshot = std::mem::take(&mut self.snapshot);
        snapshot.clear();
        for wanted in [
            CallbackTarget::Action(event.action),
            CallbackTarget::Map(event.action.map),
        ] {
            snapshot.extend(self.order.iter().copied().filter(|id| {
                self.entries
                    .get(id.0)
                    .is_some_and(|e| e.target == wanted && e.kind.matches(event.phase))
            }));
        }

        for &id in &snapshot {
            let Some(entry) = self.entries.get_mut(id.0) else {
                continue;
            };
            let kind = entry.kind;
            // Already running further up the stack.
            let Some(mut func) = entry.func.take() else {
                continue;
            };

            let previous = commands.current.replace(id);
            let outcome = catch_unwind(AssertUnwindSafe(|| func(event, commands)));
            commands.current = previous;

            if let Some(entry) = self.entries.get_mut(id.0) {
                entry.func = Some(func);
            }
            if outcome.is_err() {
                error!(
                    map,
                    action,
                    callback = kind.name(),
                    phase = ?event.phase,
                    "action callback panicked"
                );
            }
        }
        self.snapshot = snapshot;

        for id in std::mem::take(&mut commands.removed_callbacks) {
            self.remove(id);
        }
    }
}

/// A system mutation requested from inside a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EnableAction(ActionId),
    DisableAction(ActionId),
    EnableMap(MapId),
    DisableMap(MapId),
    AddBinding { action: ActionId, binding: Binding },
    RemoveBinding { action: ActionId, index: usize },
    ApplyBindingOverride { action: ActionId, index: usize, path: Option<String> },
    AddDevice(DeviceDesc),
    RemoveDevice(DeviceId),
    ResetDevice(DeviceId),
}

/// Queue handed to callbacks. Everything queued here is applied after the
/// event being dispatched has finished, so the in-flight dispatch always
/// sees a stable set of bindings.
#[derive(Default)]
pub struct Commands {
    queue: Vec<Command>,
    removed_callbacks: Vec<CallbackId>,
    current: Option<CallbackId>,
}

impl Commands {
    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    pub fn enable_action(&mut self, action: ActionId) {
        self.push(Command::EnableAction(action));
    }

    pub fn disable_action(&mut self, action: ActionId) {
        self.push(Command::DisableAction(action));
    }

    pub fn enable_map(&mut self, map: MapId) {
        self.push(Command::EnableMap(map));
    }

    pub fn disable_map(&mut self, map: MapId) {
        self.push(Command::DisableMap(map));
    }

    pub fn add_binding(&mut self, action: ActionId, binding: Binding) {
        self.push(Command::AddBinding { action, binding });
    }

    pub fn remove_binding(&mut self, action: ActionId, index: usize) {
        self.push(Command::RemoveBinding { action, index });
    }

    pub fn apply_binding_override(&mut self, action: ActionId, index: usize, path: Option<&str>) {
        self.push(Command::ApplyBindingOverride {
            action,
            index,
            path: path.map(str::to_string),
        });
    }

    pub fn add_device(&mut self, desc: DeviceDesc) {
        self.push(Command::AddDevice(desc));
    }

    pub fn remove_device(&mut self, device: DeviceId) {
        self.push(Command::RemoveDevice(device));
    }

    pub fn reset_device(&mut self, device: DeviceId) {
        self.push(Command::ResetDevice(device));
    }

    /// Unregisters a callback once the current callback round finishes.
    pub fn remove_callback(&mut self, id: CallbackId) {
        if !self.removed_callbacks.contains(&id) {
            self.removed_callbacks.push(id);
        }
    }

    pub fn remove_current_callback(&mut self) {
        if let Some(id) = self.current {
            self.remove_callback(id);
        }
    }

    /// The callback currently running, if any.
    pub fn current_callback(&self) -> Option<CallbackId> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.queue)
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}
