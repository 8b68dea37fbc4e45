// crates/input_core/src/phase.rs
//! Per-action phase state and the built-in type policies used when an
//! action has no interactions.

use input_shared::{ActionPhase, ActionType};

use crate::devices::ControlId;

/// What is currently driving an action. Composites are identified by their
/// header binding, so every part control counts as the same source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Source {
    pub binding: usize,
    pub control: ControlId,
    pub composite: bool,
}

impl Source {
    pub fn same_as(&self, other: &Source) -> bool {
        if self.composite || other.composite {
            self.composite == other.composite && self.binding == other.binding
        } else {
            self.control == other.control
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActionState {
    pub phase: ActionPhase,
    pub source: Option<Source>,
    /// Magnitude of `source` when it was last processed.
    pub magnitude: f32,
    /// Interaction slot driving the current attempt.
    pub interaction: Option<usize>,
    pub start_time: f64,
    pub time: f64,
    pub is_pressed: bool,
    pub pressed_in_update: Option<u64>,
    pub released_in_update: Option<u64>,
    pub performed_in_update: Option<u64>,
    pub completed_in_update: Option<u64>,
}

impl ActionState {
    /// Back to `Waiting` with no driver. Frame-latched stamps survive.
    pub fn reset_to_waiting(&mut self) {
        self.phase = ActionPhase::Waiting;
        self.source = None;
        self.magnitude = 0.0;
        self.interaction = None;
    }

    /// Button-style press tracking with hysteresis, independent of phase.
    pub fn track_press(&mut self, magnitude: f32, press_point: f32, release_point: f32, update: u64) {
        if !self.is_pressed && magnitude >= press_point {
            self.is_pressed = true;
            self.pressed_in_update = Some(update);
        } else if self.is_pressed && magnitude < release_point {
            self.is_pressed = false;
            self.released_in_update = Some(update);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Start,
    Perform { after: ActionPhase },
    /// Performed back to Started without canceling (Button below release point).
    Release,
    Cancel,
}

/// At most two steps per event.
pub(crate) type Steps = [Option<Step>; 2];

pub(crate) fn policy_steps(
    action_type: ActionType,
    phase: ActionPhase,
    magnitude: f32,
    press_point: f32,
    release_point: f32,
) -> Steps {
    let actuated = magnitude > 0.0;
    match action_type {
        ActionType::Value => match phase {
            ActionPhase::Waiting if actuated => [
                Some(Step::Start),
                Some(Step::Perform {
                    after: ActionPhase::Started,
                }),
            ],
            ActionPhase::Started | ActionPhase::Performed if actuated => [
                Some(Step::Perform {
                    after: ActionPhase::Started,
                }),
                None,
            ],
            ActionPhase::Started | ActionPhase::Performed => [Some(Step::Cancel), None],
            _ => [None, None],
        },
        ActionType::Button => match phase {
            ActionPhase::Waiting if magnitude >= press_point => [
                Some(Step::Start),
                Some(Step::Perform {
                    after: ActionPhase::Performed,
                }),
            ],
            ActionPhase::Waiting if actuated => [Some(Step::Start), None],
            ActionPhase::Started if magnitude >= press_point => [
                Some(Step::Perform {
                    after: ActionPhase::Performed,
                }),
                None,
            ],
            ActionPhase::Started | ActionPhase::Performed if !actuated => [Some(Step::Cancel), None],
            ActionPhase::Performed if magnitude < release_point => [Some(Step::Release), None],
            _ => [None, None],
        },
        ActionType::PassThrough => [
            Some(Step::Perform {
                after: ActionPhase::Performed,
            }),
            None,
        ],
    }
}
