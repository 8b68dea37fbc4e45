// crates/input_core/src/interactions/slow_tap.rs
use crate::error::Result;
use crate::params::NameAndParameters;

use super::{or_default, press_point_or, Interaction, InteractionContext};

/// Performs if the control is held for at least `duration` and then released.
#[derive(Debug, Clone, Default)]
pub struct SlowTapInteraction {
    pub duration: f32,
    pub press_point: f32,
    slow_tap_start: f64,
}

impl SlowTapInteraction {
    pub fn from_params(params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            duration: params.get_f32("duration")?.unwrap_or(0.0),
            press_point: params.get_f32("pressPoint")?.unwrap_or(0.0),
            slow_tap_start: 0.0,
        })
    }
}

impl Interaction for SlowTapInteraction {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let duration = or_default(self.duration, ctx.settings().default_slow_tap_time);
        let press_point = press_point_or(self.press_point, ctx);

        if ctx.is_waiting() && ctx.control_is_actuated(press_point) {
            self.slow_tap_start = ctx.time();
            ctx.started();
            return;
        }

        if ctx.is_started() && !ctx.control_is_actuated(ctx.release_point(press_point)) {
            if ctx.time() - self.slow_tap_start >= duration as f64 {
                ctx.performed();
            } else {
                ctx.canceled();
            }
        }
    }

    fn reset(&mut self) {
        self.slow_tap_start = 0.0;
    }
}
