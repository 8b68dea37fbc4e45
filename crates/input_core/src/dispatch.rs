// crates/input_core/src/dispatch.rs
//! Per-event pipeline for one action: conflict admission, interactions or
//! the type policy, phase changes, then notifications and callbacks.

use std::panic::{catch_unwind, AssertUnwindSafe};

use input_shared::{ActionPhase, ActionType, ControlValue, UpdateKind};
use tracing::{error, trace};

use crate::callbacks::{CallbackTable, Commands};
use crate::config::Settings;
use crate::devices::{ControlGraph, ControlId, DeviceId, DeviceSet};
use crate::interactions::{ContextOp, InteractionContext, TimerInfo};
use crate::map::ActionId;
use crate::notify::{ActionEvent, Notification, NotificationBus};
use crate::phase::{policy_steps, Step};
use crate::slot::{ActionSlot, Trigger};
use crate::timeout::{TimeoutEntry, TimeoutKey, TimeoutScheduler};

/// What a phase change reports to callbacks.
#[derive(Debug, Clone, Copy)]
struct Transition {
    control: Option<ControlId>,
    value: ControlValue,
    time: f64,
    interaction: Option<usize>,
    // Off while disabling: the completion is not a frame event.
    latch: bool,
}

impl Transition {
    fn of(trigger: &Trigger) -> Self {
        Self {
            control: Some(trigger.source.control),
            value: trigger.value,
            time: trigger.time,
            interaction: None,
            latch: true,
        }
    }

    fn by(mut self, interaction: usize) -> Self {
        self.interaction = Some(interaction);
        self
    }
}

/// Borrowed view of everything a dispatch touches besides the action itself.
pub(crate) struct Dispatcher<'a> {
    pub settings: &'a Settings,
    pub devices: &'a DeviceSet,
    pub timeouts: &'a mut TimeoutScheduler,
    pub callbacks: &'a mut CallbackTable,
    pub bus: &'a mut NotificationBus,
    pub commands: &'a mut Commands,
    pub update: u64,
    pub update_kind: UpdateKind,
}

impl<'a> Dispatcher<'a> {
    /// A bound control of `binding` changed value.
    pub fn control_changed(
        &mut self,
        slot: &mut ActionSlot,
        id: ActionId,
        binding: usize,
        control: ControlId,
        time: f64,
    ) {
        if !slot.enabled {
            return;
        }
        let graph: &dyn ControlGraph = self.devices;
        if let Some(trigger) = slot.trigger_for(binding, control, time, graph, self.settings) {
            self.process_trigger(slot, id, trigger);
        }
    }

    /// Decides whether a change may drive the action. Pass-through actions
    /// take everything; others only follow the strongest source.
    fn admit(&self, slot: &ActionSlot, trigger: Trigger) -> Option<Trigger> {
        if slot.action_type == ActionType::PassThrough {
            return Some(trigger);
        }
        let state = &slot.state;
        let Some(current) = state.source else {
            return Some(trigger);
        };

        if current.same_as(&trigger.source) {
            if trigger.magnitude < state.magnitude {
                let stronger = slot.strongest(
                    Some(&trigger.source),
                    trigger.magnitude,
                    trigger.time,
                    self.devices,
                    self.settings,
                );
                if let Some(stronger) = stronger {
                    return Some(stronger);
                }
            }
            return Some(trigger);
        }

        if trigger.magnitude >= state.magnitude {
            Some(trigger)
        } else {
            trace!(
                action = %slot.qualified_name(),
                magnitude = trigger.magnitude,
                driving = state.magnitude,
                "ignoring weaker control"
            );
            None
        }
    }

    pub fn process_trigger(&mut self, slot: &mut ActionSlot, id: ActionId, trigger: Trigger) {
        let Some(trigger) = self.admit(slot, trigger) else {
            return;
        };
        let release = self.settings.release_point(slot.press_point);
        slot.state
            .track_press(trigger.magnitude, slot.press_point, release, self.update);

        let interactions = slot
            .bindings
            .get(trigger.source.binding)
            .map(|b| b.interactions.clone())
            .unwrap_or(0..0);
        if interactions.is_empty() {
            self.run_policy(slot, id, trigger);
        } else {
            for i in interactions {
                self.run_interaction(slot, id, i, trigger, None);
            }
        }
        settle_source(slot, &trigger);
    }

    fn run_policy(&mut self, slot: &mut ActionSlot, id: ActionId, trigger: Trigger) {
        let release = self.settings.release_point(slot.press_point);
        let steps = policy_steps(
            slot.action_type,
            slot.state.phase,
            trigger.magnitude,
            slot.press_point,
            release,
        );
        for step in steps.into_iter().flatten() {
            let t = Transition::of(&trigger);
            match step {
                Step::Start => self.change_phase(slot, id, ActionPhase::Started, t),
                Step::Perform { after } => {
                    self.change_phase(slot, id, ActionPhase::Performed, t);
                    self.settle_after_perform(slot, after);
                }
                Step::Release => self.change_phase(slot, id, ActionPhase::Started, t),
                Step::Cancel => self.cancel_with(slot, id, t),
            }
        }
    }

    /// Moves the action to `phase`, latches the frame stamps, then tells
    /// the bus and the callbacks, in that order.
    fn change_phase(&mut self, slot: &mut ActionSlot, id: ActionId, phase: ActionPhase, t: Transition) {
        let state = &mut slot.state;
        let previous = state.phase;
        if phase == ActionPhase::Performed && previous != ActionPhase::Performed {
            state.performed_in_update = Some(self.update);
        }
        if t.latch && previous == ActionPhase::Performed && phase != ActionPhase::Performed {
            state.completed_in_update = Some(self.update);
        }
        if phase == ActionPhase::Started && previous == ActionPhase::Waiting {
            state.start_time = t.time;
        }
        state.phase = phase;
        state.time = t.time;

        let event = ActionEvent {
            action: id,
            phase,
            control: t.control,
            interaction: t
                .interaction
                .and_then(|i| slot.interactions.get(i))
                .map(|is| is.name.clone()),
            value: t.value,
            time: t.time,
            start_time: slot.state.start_time,
        };
        trace!(action = %slot.qualified_name(), ?previous, ?phase, time = t.time, "phase change");

        if let Some(notification) = Notification::for_phase(&event) {
            self.bus.publish(&notification);
        }
        self.callbacks
            .invoke(&event, &mut *self.commands, &slot.map_name, &slot.name);
    }

    fn settle_after_perform(&mut self, slot: &mut ActionSlot, after: ActionPhase) {
        match after {
            ActionPhase::Waiting => {
                slot.state.completed_in_update = Some(self.update);
                slot.state.reset_to_waiting();
            }
            ActionPhase::Started => {
                slot.state.completed_in_update = Some(self.update);
                slot.state.phase = ActionPhase::Started;
            }
            _ => {}
        }
    }

    fn cancel_with(&mut self, slot: &mut ActionSlot, id: ActionId, t: Transition) {
        self.change_phase(slot, id, ActionPhase::Canceled, t);
        self.reset_interactions(slot);
        slot.state.reset_to_waiting();
    }

    /// Cancels an in-progress action reporting the default value, as when
    /// its controls disappear or the action is torn down.
    ///
    /// `disabling` leaves the released and completed frame flags alone.
    pub fn cancel_to_default(&mut self, slot: &mut ActionSlot, id: ActionId, time: f64, disabling: bool) {
        let t = Transition {
            control: slot.state.source.map(|s| s.control),
            value: slot.default_value(self.devices),
            time,
            interaction: slot.state.interaction,
            latch: !disabling,
        };
        if slot.state.is_pressed {
            slot.state.is_pressed = false;
            if !disabling {
                slot.state.released_in_update = Some(self.update);
            }
        }
        self.cancel_with(slot, id, t);
    }

    pub fn enable(&mut self, slot: &mut ActionSlot, id: ActionId) {
        if slot.enabled {
            return;
        }
        slot.enabled = true;
        slot.state.reset_to_waiting();
        slot.refresh_composites(self.devices, self.settings);
        slot.initial_check_pending = slot.initial_state_check;
        self.bus.publish(&Notification::ActionEnabled(id));
    }

    pub fn disable(&mut self, slot: &mut ActionSlot, id: ActionId, time: f64) {
        if !slot.enabled {
            return;
        }
        if slot.state.phase.is_in_progress() {
            self.cancel_to_default(slot, id, time, true);
        }
        self.reset_interactions(slot);
        self.timeouts.remove_action(id);
        slot.enabled = false;
        slot.initial_check_pending = false;
        slot.state.reset_to_waiting();
        slot.state.phase = ActionPhase::Disabled;
        slot.state.is_pressed = false;
        self.bus.publish(&Notification::ActionDisabled(id));
    }

    /// Runs an action whose controls were already actuated when it got
    /// enabled, as if the strongest of them had just changed.
    pub fn initial_check(&mut self, slot: &mut ActionSlot, id: ActionId, time: f64) {
        if !std::mem::take(&mut slot.initial_check_pending)
            || !slot.enabled
            || slot.state.phase != ActionPhase::Waiting
        {
            return;
        }
        slot.refresh_composites(self.devices, self.settings);
        if let Some(trigger) = slot.strongest(None, 0.0, time, self.devices, self.settings) {
            trace!(action = %slot.qualified_name(), "initial state check triggered");
            self.process_trigger(slot, id, trigger);
        }
    }

    /// A device went back to its default state. Actions it was driving
    /// cancel; pass-through actions also report the default value.
    pub fn device_reset(&mut self, slot: &mut ActionSlot, id: ActionId, device: DeviceId, time: f64) {
        slot.refresh_composites(self.devices, self.settings);
        if !slot.enabled || !slot.state.phase.is_in_progress() {
            return;
        }
        let Some(source) = slot.state.source else {
            return;
        };
        if !slot.source_on_device(&source, device) {
            return;
        }
        let value = slot.default_value(self.devices);
        self.cancel_to_default(slot, id, time, false);
        if slot.action_type == ActionType::PassThrough {
            let t = Transition {
                control: Some(source.control),
                value,
                time,
                interaction: None,
                latch: true,
            };
            self.change_phase(slot, id, ActionPhase::Performed, t);
            self.settle_after_perform(slot, ActionPhase::Waiting);
        }
    }

    fn run_interaction(
        &mut self,
        slot: &mut ActionSlot,
        id: ActionId,
        i: usize,
        trigger: Trigger,
        expired: Option<TimerInfo>,
    ) {
        let settings = self.settings;
        let press_point = slot.press_point;
        let Some(is) = slot.interactions.get_mut(i) else {
            return;
        };
        is.trigger = Some(trigger.source);
        let mut ctx = InteractionContext::new(
            settings,
            is.phase,
            trigger.value,
            trigger.magnitude,
            press_point,
            trigger.time,
            is.start_time,
            is.timer.map(|(_, timer)| timer),
            expired,
        );

        let interaction = &mut is.interaction;
        if catch_unwind(AssertUnwindSafe(|| interaction.process(&mut ctx))).is_err() {
            error!(
                map = %slot.map_name,
                action = %slot.name,
                interaction = %is.name,
                "interaction panicked; resetting it"
            );
            self.reset_interaction(slot, i);
            return;
        }

        for &op in ctx.ops() {
            match op {
                ContextOp::Started => self.interaction_started(slot, id, i, trigger),
                ContextOp::Performed { after } => self.interaction_performed(slot, id, i, trigger, after),
                ContextOp::Canceled => self.interaction_canceled(slot, id, i, trigger),
                ContextOp::SetTimeout { seconds, tag } => self.start_timeout(slot, id, i, &trigger, seconds, tag),
                ContextOp::ClearTimeout => self.stop_timer(slot, i),
                ContextOp::TotalTimeout { seconds } => slot.interactions[i].total_timeout = seconds,
            }
        }
    }

    fn interaction_started(&mut self, slot: &mut ActionSlot, id: ActionId, i: usize, trigger: Trigger) {
        let is = &mut slot.interactions[i];
        match is.phase {
            ActionPhase::Started => return,
            ActionPhase::Waiting => is.start_time = trigger.time,
            _ => {}
        }
        is.phase = ActionPhase::Started;

        let drives = match slot.state.phase {
            ActionPhase::Waiting => {
                slot.state.interaction = Some(i);
                true
            }
            ActionPhase::Performed => slot.state.interaction == Some(i),
            _ => false,
        };
        if drives {
            self.change_phase(slot, id, ActionPhase::Started, Transition::of(&trigger).by(i));
        }
    }

    fn interaction_performed(
        &mut self,
        slot: &mut ActionSlot,
        id: ActionId,
        i: usize,
        trigger: Trigger,
        after: ActionPhase,
    ) {
        self.stop_timer(slot, i);
        let t = Transition::of(&trigger).by(i);
        if slot.interactions[i].phase == ActionPhase::Waiting {
            slot.interactions[i].start_time = trigger.time;
        }
        if slot.state.phase == ActionPhase::Waiting {
            slot.state.interaction = Some(i);
            self.change_phase(slot, id, ActionPhase::Started, t);
        }
        slot.state.interaction = Some(i);
        self.change_phase(slot, id, ActionPhase::Performed, t);

        match after {
            ActionPhase::Waiting => {
                for j in slot.binding_interactions(i) {
                    self.reset_interaction(slot, j);
                }
                self.settle_after_perform(slot, ActionPhase::Waiting);
            }
            ActionPhase::Started => {
                slot.interactions[i].phase = ActionPhase::Started;
                self.settle_after_perform(slot, ActionPhase::Started);
            }
            _ => slot.interactions[i].phase = ActionPhase::Performed,
        }
    }

    fn interaction_canceled(&mut self, slot: &mut ActionSlot, id: ActionId, i: usize, trigger: Trigger) {
        let was = slot.interactions[i].phase;
        self.reset_interaction(slot, i);
        if was == ActionPhase::Waiting || slot.state.interaction != Some(i) {
            return;
        }

        self.change_phase(slot, id, ActionPhase::Canceled, Transition::of(&trigger).by(i));
        slot.state.reset_to_waiting();

        // Another interaction of the binding may still be going.
        let next = slot
            .binding_interactions(i)
            .find(|j| *j != i && slot.interactions[*j].phase == ActionPhase::Started);
        if let Some(j) = next {
            slot.state.interaction = Some(j);
            let t = Transition {
                time: slot.interactions[j].start_time,
                ..Transition::of(&trigger).by(j)
            };
            self.change_phase(slot, id, ActionPhase::Started, t);
        }
    }

    /// Resets every interaction instance of the action and drops its timers.
    pub fn reset_interactions(&mut self, slot: &mut ActionSlot) {
        for i in 0..slot.interactions.len() {
            self.reset_interaction(slot, i);
        }
    }

    fn reset_interaction(&mut self, slot: &mut ActionSlot, i: usize) {
        self.stop_timer(slot, i);
        if let Some(is) = slot.interactions.get_mut(i) {
            is.interaction.reset();
            is.phase = ActionPhase::Waiting;
            is.total_timeout = 0.0;
            is.timeout_done = 0.0;
        }
    }

    fn stop_timer(&mut self, slot: &mut ActionSlot, i: usize) {
        if let Some((key, _)) = slot.interactions.get_mut(i).and_then(|is| is.timer.take()) {
            self.timeouts.remove(key);
        }
    }

    fn start_timeout(
        &mut self,
        slot: &mut ActionSlot,
        id: ActionId,
        i: usize,
        trigger: &Trigger,
        seconds: f32,
        tag: u32,
    ) {
        let is = &mut slot.interactions[i];
        if let Some((key, running)) = is.timer.take() {
            is.timeout_done += ((trigger.time - running.start) as f32).max(0.0);
            self.timeouts.remove(key);
        }
        let key = self.timeouts.schedule(TimeoutEntry {
            due: trigger.time + seconds as f64,
            action: id,
            interaction: i,
            tag,
            device: Some(trigger.source.control.device),
            kind: self.update_kind,
        });
        is.timer = Some((
            key,
            TimerInfo {
                start: trigger.time,
                duration: seconds,
                tag,
            },
        ));
    }

    /// Re-runs the owning interaction with the current value of whatever
    /// last drove it. Entries superseded by a newer timer are ignored.
    pub fn fire_timeout(&mut self, slot: &mut ActionSlot, id: ActionId, key: TimeoutKey, entry: &TimeoutEntry) {
        if !slot.enabled {
            return;
        }
        let Some(is) = slot.interactions.get_mut(entry.interaction) else {
            return;
        };
        let info = match is.timer {
            Some((running, info)) if running == key => info,
            _ => {
                trace!(action = %slot.name, "dropping stale timeout");
                return;
            }
        };
        is.timer = None;
        is.timeout_done += info.duration;
        let Some(source) = is.trigger else {
            return;
        };
        let Some(trigger) = slot.current_trigger(source, entry.due, self.devices, self.settings) else {
            return;
        };

        trace!(action = %slot.qualified_name(), due = entry.due, tag = info.tag, "timeout fired");
        self.run_interaction(slot, id, entry.interaction, trigger, Some(info));
        settle_source(slot, &trigger);
    }
}

fn settle_source(slot: &mut ActionSlot, trigger: &Trigger) {
    if slot.state.phase.is_in_progress() {
        slot.state.source = Some(trigger.source);
        slot.state.magnitude = trigger.magnitude;
    } else {
        slot.state.source = None;
        slot.state.magnitude = 0.0;
    }
}
