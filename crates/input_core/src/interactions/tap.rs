// crates/input_core/src/interactions/tap.rs
use crate::error::Result;
use crate::params::NameAndParameters;

use super::{or_default, press_point_or, Interaction, InteractionContext};

/// Performs if the control is pressed and released within `duration`.
/// Cancels once the window expires while still held.
#[derive(Debug, Clone, Default)]
pub struct TapInteraction {
    pub duration: f32,
    pub press_point: f32,
    tap_start: f64,
}

impl TapInteraction {
    pub fn from_params(params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            duration: params.get_f32("duration")?.unwrap_or(0.0),
            press_point: params.get_f32("pressPoint")?.unwrap_or(0.0),
            tap_start: 0.0,
        })
    }
}

impl Interaction for TapInteraction {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let duration = or_default(self.duration, ctx.settings().default_tap_time);
        let press_point = press_point_or(self.press_point, ctx);

        if ctx.timer_has_expired() {
            ctx.canceled();
            return;
        }

        if ctx.is_waiting() && ctx.control_is_actuated(press_point) {
            self.tap_start = ctx.time();
            ctx.started();
            // Nudge past the window so a release exactly at `duration` still taps.
            ctx.set_timeout(duration + 0.00001);
            return;
        }

        if ctx.is_started() && !ctx.control_is_actuated(ctx.release_point(press_point)) {
            if ctx.time() - self.tap_start <= duration as f64 {
                ctx.performed();
            } else {
                ctx.canceled();
            }
        }
    }

    fn reset(&mut self) {
        self.tap_start = 0.0;
    }
}
