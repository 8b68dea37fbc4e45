// crates/input_core/src/interactions/mod.rs
//! Pluggable interactions: small state machines that decide when an action
//! starts, performs and cancels.

mod hold;
mod multi_tap;
mod press;
mod slow_tap;
mod tap;

pub use hold::HoldInteraction;
pub use multi_tap::MultiTapInteraction;
pub use press::{PressBehavior, PressInteraction};
pub use slow_tap::SlowTapInteraction;
pub use tap::TapInteraction;

use input_shared::{ActionPhase, ControlValue};
use tracing::warn;

use crate::config::Settings;
use crate::registry::Registries;

pub trait Interaction {
    /// Called for every admitted change of a bound control and whenever a
    /// timeout set through the context expires.
    fn process(&mut self, ctx: &mut InteractionContext<'_>);

    /// Back to the initial state. Called when the interaction cancels, when it
    /// performs and returns to waiting, and when the action cancels or is
    /// disabled.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ContextOp {
    Started,
    Performed { after: ActionPhase },
    Canceled,
    SetTimeout { seconds: f32, tag: u32 },
    ClearTimeout,
    TotalTimeout { seconds: f32 },
}

const MAX_OPS: usize = 8;

/// Timer of the interaction being processed, if one is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimerInfo {
    pub start: f64,
    pub duration: f32,
    pub tag: u32,
}

pub struct InteractionContext<'a> {
    settings: &'a Settings,
    phase: ActionPhase,
    value: ControlValue,
    magnitude: f32,
    press_point: f32,
    time: f64,
    start_time: f64,
    timer: Option<TimerInfo>,
    expired: Option<TimerInfo>,
    ops: [ContextOp; MAX_OPS],
    len: usize,
}

impl<'a> InteractionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: &'a Settings,
        phase: ActionPhase,
        value: ControlValue,
        magnitude: f32,
        press_point: f32,
        time: f64,
        start_time: f64,
        timer: Option<TimerInfo>,
        expired: Option<TimerInfo>,
    ) -> Self {
        Self {
            settings,
            phase,
            value,
            magnitude,
            press_point,
            time,
            start_time,
            timer,
            expired,
            ops: [ContextOp::Canceled; MAX_OPS],
            len: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Phase of this interaction, not of the action.
    pub fn phase(&self) -> ActionPhase {
        self.phase
    }

    pub fn is_waiting(&self) -> bool {
        self.phase == ActionPhase::Waiting
    }

    pub fn is_started(&self) -> bool {
        self.phase == ActionPhase::Started
    }

    pub fn value(&self) -> ControlValue {
        self.value
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    /// A threshold of zero or less means any actuation.
    pub fn control_is_actuated(&self, threshold: f32) -> bool {
        if threshold <= 0.0 {
            self.magnitude > 0.0
        } else {
            self.magnitude >= threshold
        }
    }

    /// Press point of the action (its override or the configured default).
    pub fn press_point(&self) -> f32 {
        self.press_point
    }

    pub fn release_point(&self, press_point: f32) -> f32 {
        self.settings.release_point(press_point)
    }

    /// Event time, or the due time when a timeout fired.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// When this interaction last left `Waiting`.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn timer_has_expired(&self) -> bool {
        self.expired.is_some()
    }

    /// Tag of the timeout that fired, if this call is a timeout.
    pub fn expired_tag(&self) -> Option<u32> {
        self.expired.map(|t| t.tag)
    }

    /// Fraction of the running timeout that has elapsed, in 0..=1.
    pub fn timeout_completion(&self) -> f32 {
        match (self.expired, self.timer) {
            (Some(_), _) => 1.0,
            (None, Some(timer)) if timer.duration > 0.0 => {
                (((self.time - timer.start) as f32) / timer.duration).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn started(&mut self) {
        self.push(ContextOp::Started);
    }

    /// Perform and go back to waiting.
    pub fn performed(&mut self) {
        self.push(ContextOp::Performed {
            after: ActionPhase::Waiting,
        });
    }

    pub fn perform_and_stay_started(&mut self) {
        self.push(ContextOp::Performed {
            after: ActionPhase::Started,
        });
    }

    pub fn perform_and_stay_performed(&mut self) {
        self.push(ContextOp::Performed {
            after: ActionPhase::Performed,
        });
    }

    pub fn canceled(&mut self) {
        self.push(ContextOp::Canceled);
    }

    /// Re-invoke `process` after `seconds` even without new input. Replaces
    /// any running timeout of this interaction.
    pub fn set_timeout(&mut self, seconds: f32) {
        self.set_timeout_with_tag(seconds, 0);
    }

    pub fn set_timeout_with_tag(&mut self, seconds: f32, tag: u32) {
        self.push(ContextOp::SetTimeout { seconds, tag });
    }

    /// Drops the running timeout, if any, without touching the phase.
    pub fn clear_timeout(&mut self) {
        self.push(ContextOp::ClearTimeout);
    }

    /// Total length of a multi-stage timeout, for completion reporting.
    pub fn set_total_timeout_completion_time(&mut self, seconds: f32) {
        self.push(ContextOp::TotalTimeout { seconds });
    }

    fn push(&mut self, op: ContextOp) {
        if self.len == MAX_OPS {
            warn!(?op, "interaction requested too many transitions in one call; dropping");
            return;
        }
        self.ops[self.len] = op;
        self.len += 1;
    }

    pub(crate) fn ops(&self) -> &[ContextOp] {
        &self.ops[..self.len]
    }
}

/// Shared `pressPoint` parameter handling: a non-positive value means the
/// action's press point.
pub(crate) fn press_point_or(param: f32, ctx: &InteractionContext<'_>) -> f32 {
    if param > 0.0 {
        param
    } else {
        ctx.press_point()
    }
}

/// Shared `duration` handling: a non-positive value means `default`.
pub(crate) fn or_default(param: f32, default: f32) -> f32 {
    if param > 0.0 {
        param
    } else {
        default
    }
}

pub fn register_builtins(registries: &mut Registries) {
    registries.register_interaction("press", |p| Ok(Box::new(PressInteraction::from_params(p)?)));
    registries.register_interaction("tap", |p| Ok(Box::new(TapInteraction::from_params(p)?)));
    registries.register_interaction("slowTap", |p| {
        Ok(Box::new(SlowTapInteraction::from_params(p)?))
    });
    registries.register_interaction("hold", |p| Ok(Box::new(HoldInteraction::from_params(p)?)));
    registries.register_interaction("multiTap", |p| {
        Ok(Box::new(MultiTapInteraction::from_params(p)?))
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Drives an interaction the way the dispatcher does, tracking the
    /// interaction's own phase and timer.
    pub struct Harness {
        pub settings: Settings,
        pub phase: ActionPhase,
        pub start_time: f64,
        pub timer: Option<TimerInfo>,
        pub log: Vec<ContextOp>,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                settings: Settings::default(),
                phase: ActionPhase::Waiting,
                start_time: 0.0,
                timer: None,
                log: Vec::new(),
            }
        }

        pub fn event(&mut self, interaction: &mut dyn Interaction, time: f64, magnitude: f32) {
            self.run(interaction, time, magnitude, None);
        }

        /// Fires the running timer if it is due by `time`.
        pub fn advance(&mut self, interaction: &mut dyn Interaction, time: f64, magnitude: f32) {
            if let Some(timer) = self.timer {
                let due = timer.start + timer.duration as f64;
                if due <= time {
                    self.timer = None;
                    self.run(interaction, due, magnitude, Some(timer));
                }
            }
        }

        fn run(
            &mut self,
            interaction: &mut dyn Interaction,
            time: f64,
            magnitude: f32,
            expired: Option<TimerInfo>,
        ) {
            let settings = self.settings.clone();
            let mut ctx = InteractionContext::new(
                &settings,
                self.phase,
                ControlValue::Float(magnitude),
                magnitude,
                settings.default_button_press_point,
                time,
                self.start_time,
                self.timer,
                expired,
            );
            interaction.process(&mut ctx);
            for op in ctx.ops().to_vec() {
                self.log.push(op);
                match op {
                    ContextOp::Started => {
                        if self.phase == ActionPhase::Waiting {
                            self.start_time = time;
                        }
                        self.phase = ActionPhase::Started;
                    }
                    ContextOp::Performed { after } => {
                        self.timer = None;
                        self.phase = after;
                        if after == ActionPhase::Waiting {
                            interaction.reset();
                        }
                    }
                    ContextOp::Canceled => {
                        self.timer = None;
                        self.phase = ActionPhase::Waiting;
                        interaction.reset();
                    }
                    ContextOp::SetTimeout { seconds, tag } => {
                        self.timer = Some(TimerInfo {
                            start: time,
                            duration: seconds,
                            tag,
                        });
                    }
                    ContextOp::ClearTimeout => self.timer = None,
                    ContextOp::TotalTimeout { .. } => {}
                }
            }
        }

        pub fn take(&mut self) -> Vec<ContextOp> {
            std::mem::take(&mut self.log)
        }
    }

    pub const PERFORMED: ContextOp = ContextOp::Performed {
        after: ActionPhase::Waiting,
    };
}
