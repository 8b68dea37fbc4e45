// crates/input_core/src/timeout.rs
//! Cooperative timer list. Polled by the update loop; nothing blocks on it.

use input_arena::{Arena, Handle};
use input_shared::UpdateKind;

use crate::devices::{ControlGraph, DeviceId};
use crate::map::ActionId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct TimeoutKey(Handle);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeoutEntry {
    pub due: f64,
    pub action: ActionId,
    /// Index of the interaction slot inside the action.
    pub interaction: usize,
    pub tag: u32,
    /// Device of the control that last drove the interaction.
    pub device: Option<DeviceId>,
    pub kind: UpdateKind,
}

#[derive(Default)]
pub(crate) struct TimeoutScheduler {
    entries: Arena<TimeoutEntry>,
    /// Sorted by due time; equal due times keep insertion order.
    order: Vec<TimeoutKey>,
}

impl TimeoutScheduler {
    pub fn schedule(&mut self, entry: TimeoutEntry) -> TimeoutKey {
        let key = TimeoutKey(self.entries.insert(entry));
        let entries = &self.entries;
        let position = self
            .order
            .partition_point(|k| entries.get(k.0).is_some_and(|e| e.due <= entry.due));
        self.order.insert(position, key);
        key
    }

    pub fn remove(&mut self, key: TimeoutKey) -> Option<TimeoutEntry> {
        let entry = self.entries.remove(key.0)?;
        self.order.retain(|k| *k != key);
        Some(entry)
    }

    /// Removes and returns the earliest entry due by `now` that may fire in
    /// an update of `kind`. Player timeouts are held back during editor
    /// updates unless their device keeps running in the background.
    pub fn pop_due(
        &mut self,
        now: f64,
        kind: UpdateKind,
        graph: &dyn ControlGraph,
    ) -> Option<(TimeoutKey, TimeoutEntry)> {
        let position = self.order.iter().position(|key| {
            let Some(entry) = self.entries.get(key.0) else {
                return false;
            };
            if entry.due > now {
                return false;
            }
            kind == UpdateKind::Player
                || entry.kind == UpdateKind::Editor
                || entry
                    .device
                    .and_then(|d| graph.device(d))
                    .is_some_and(|d| d.run_in_background)
        })?;
        let key = self.order.remove(position);
        let entry = self.entries.remove(key.0)?;
        Some((key, entry))
    }

    /// Drops every entry owned by `action`.
    pub fn remove_action(&mut self, action: ActionId) {
        let entries = &mut self.entries;
        self.order.retain(|key| {
            let owned = entries.get(key.0).is_some_and(|e| e.action == action);
            if owned {
                entries.remove(key.0);
            }
            !owned
        });
    }
}
