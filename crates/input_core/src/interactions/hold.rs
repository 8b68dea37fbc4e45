// crates/input_core/src/interactions/hold.rs
use input_shared::ActionPhase;

use crate::error::Result;
use crate::params::NameAndParameters;

use super::{or_default, press_point_or, Interaction, InteractionContext};

/// Performs once the control has been held for `duration` and stays
/// performed until released.
#[derive(Debug, Clone, Default)]
pub struct HoldInteraction {
    pub duration: f32,
    pub press_point: f32,
    time_pressed: f64,
}

impl HoldInteraction {
    pub fn from_params(params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            duration: params.get_f32("duration")?.unwrap_or(0.0),
            press_point: params.get_f32("pressPoint")?.unwrap_or(0.0),
            time_pressed: 0.0,
        })
    }
}

impl Interaction for HoldInteraction {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let duration = or_default(self.duration, ctx.settings().default_hold_time);
        let press_point = press_point_or(self.press_point, ctx);

        if ctx.timer_has_expired() {
            ctx.perform_and_stay_performed();
            return;
        }

        match ctx.phase() {
            ActionPhase::Waiting => {
                if ctx.control_is_actuated(press_point) {
                    self.time_pressed = ctx.time();
                    ctx.started();
                    ctx.set_timeout(duration);
                }
            }
            ActionPhase::Started => {
                if ctx.time() - self.time_pressed >= duration as f64 {
                    ctx.perform_and_stay_performed();
                } else if !ctx.control_is_actuated(ctx.release_point(press_point)) {
                    ctx.canceled();
                }
            }
            ActionPhase::Performed => {
                if !ctx.control_is_actuated(press_point) {
                    ctx.canceled();
                }
            }
            ActionPhase::Disabled | ActionPhase::Canceled => {}
        }
    }

    fn reset(&mut self) {
        self.time_pressed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::ContextOp;
    use crate::interactions::testing::Harness;

    #[test]
    fn timeout_performs_then_release_cancels() {
        let mut hold = HoldInteraction::default();
        let mut h = Harness::new();
        h.event(&mut hold, 0.0, 1.0);
        h.take();
        h.advance(&mut hold, 0.5, 1.0);
        assert_eq!(
            h.take(),
            vec![ContextOp::Performed {
                after: ActionPhase::Performed
            }]
        );
        h.event(&mut hold, 0.9, 0.0);
        assert_eq!(h.take(), vec![ContextOp::Canceled]);
    }

    #[test]
    fn early_release_cancels() {
        let mut hold = HoldInteraction {
            duration: 1.0,
            ..Default::default()
        };
        let mut h = Harness::new();
        h.event(&mut hold, 0.0, 1.0);
        h.event(&mut hold, 0.5, 0.0);
        let ops = h.take();
        assert_eq!(ops.last(), Some(&ContextOp::Canceled));
        assert!(h.timer.is_none());
    }
}
