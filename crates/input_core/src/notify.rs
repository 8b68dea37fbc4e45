// crates/input_core/src/notify.rs
//! The ordered change stream observed from outside the pipeline.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use input_shared::{ActionPhase, ActionValue, ControlValue};
use tracing::error;

use crate::devices::ControlId;
use crate::map::{ActionId, AssetId, MapId};

/// Unit of binding resolution: every map of an asset resolves together; a
/// map outside any asset resolves on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveScope {
    Asset(AssetId),
    Map(MapId),
}

/// Payload of started/performed/canceled callbacks and notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub action: ActionId,
    pub phase: ActionPhase,
    pub control: Option<ControlId>,
    /// Name of the interaction driving the transition, if any.
    pub interaction: Option<Rc<str>>,
    pub value: ControlValue,
    pub time: f64,
    pub start_time: f64,
}

impl ActionEvent {
    pub fn read_value<T: ActionValue>(&self) -> Option<T> {
        T::from_value(self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    BoundControlsAboutToChange(ResolveScope),
    BoundControlsChanged(ResolveScope),
    ActionEnabled(ActionId),
    ActionDisabled(ActionId),
    MapEnabled(MapId),
    MapDisabled(MapId),
    ActionStarted(ActionEvent),
    ActionPerformed(ActionEvent),
    ActionCanceled(ActionEvent),
}

impl Notification {
    pub(crate) fn for_phase(event: &ActionEvent) -> Option<Self> {
        match event.phase {
            ActionPhase::Started => Some(Self::ActionStarted(event.clone())),
            ActionPhase::Performed => Some(Self::ActionPerformed(event.clone())),
            ActionPhase::Canceled => Some(Self::ActionCanceled(event.clone())),
            ActionPhase::Disabled | ActionPhase::Waiting => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&Notification)>;

#[derive(Default)]
pub(crate) struct NotificationBus {
    listeners: Vec<(ListenerId, Option<Listener>)>,
    next_id: u64,
}

impl NotificationBus {
    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Some(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, notification: &Notification) {
        for (id, slot) in self.listeners.iter_mut() {
            let Some(listener) = slot.as_mut() else {
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| listener(notification))).is_err() {
                error!(listener = ?id, ?notification, "notification listener panicked");
            }
        }
    }
}
