// crates/input_core/src/interactions/multi_tap.rs
use crate::error::Result;
use crate::params::NameAndParameters;

use super::{or_default, press_point_or, Interaction, InteractionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TapPhase {
    #[default]
    None,
    WaitingForNextRelease,
    WaitingForNextPress,
}

/// Performs after `tap_count` taps, each no longer than `tap_time` and no
/// more than `tap_delay` apart.
#[derive(Debug, Clone)]
pub struct MultiTapInteraction {
    pub tap_time: f32,
    pub tap_delay: f32,
    pub tap_count: u32,
    pub press_point: f32,
    tap_phase: TapPhase,
    current_tap_count: u32,
    current_tap_start: f64,
    last_tap_release: f64,
}

impl Default for MultiTapInteraction {
    fn default() -> Self {
        Self {
            tap_time: 0.0,
            tap_delay: 0.0,
            tap_count: 2,
            press_point: 0.0,
            tap_phase: TapPhase::None,
            current_tap_count: 0,
            current_tap_start: 0.0,
            last_tap_release: 0.0,
        }
    }
}

impl MultiTapInteraction {
    pub fn from_params(params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            tap_time: params.get_f32("tapTime")?.unwrap_or(0.0),
            tap_delay: params.get_f32("tapDelay")?.unwrap_or(0.0),
            tap_count: params.get_u32("tapCount")?.unwrap_or(2).max(1),
            press_point: params.get_f32("pressPoint")?.unwrap_or(0.0),
            ..Self::default()
        })
    }
}

impl Interaction for MultiTapInteraction {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let tap_time = or_default(self.tap_time, ctx.settings().default_tap_time);
        let tap_delay = or_default(self.tap_delay, ctx.settings().multi_tap_delay_time);
        let press_point = press_point_or(self.press_point, ctx);

        if ctx.timer_has_expired() {
            ctx.canceled();
            return;
        }

        match self.tap_phase {
            TapPhase::None => {
                if ctx.control_is_actuated(press_point) {
                    self.tap_phase = TapPhase::WaitingForNextRelease;
                    self.current_tap_start = ctx.time();
                    ctx.started();
                    ctx.set_timeout(tap_time);
                    let taps = self.tap_count as f32;
                    ctx.set_total_timeout_completion_time(tap_time * taps + (taps - 1.0) * tap_delay);
                }
            }
            TapPhase::WaitingForNextRelease => {
                if !ctx.control_is_actuated(ctx.release_point(press_point)) {
                    if ctx.time() - self.current_tap_start <= tap_time as f64 {
                        self.current_tap_count += 1;
                        if self.current_tap_count >= self.tap_count {
                            ctx.performed();
                        } else {
                            self.tap_phase = TapPhase::WaitingForNextPress;
                            self.last_tap_release = ctx.time();
                            ctx.set_timeout(tap_delay);
                        }
                    } else {
                        ctx.canceled();
                    }
                }
            }
            TapPhase::WaitingForNextPress => {
                if ctx.control_is_actuated(press_point) {
                    if ctx.time() - self.last_tap_release <= tap_delay as f64 {
                        self.tap_phase = TapPhase::WaitingForNextRelease;
                        self.current_tap_start = ctx.time();
                        ctx.set_timeout(tap_time);
                    } else {
                        ctx.canceled();
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.tap_phase = TapPhase::None;
        self.current_tap_count = 0;
        self.current_tap_start = 0.0;
        self.last_tap_release = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::testing::{Harness, PERFORMED};
    use crate::interactions::ContextOp;

    fn ops_without_timers(h: &mut Harness) -> Vec<ContextOp> {
        h.take()
            .into_iter()
            .filter(|op| {
                !matches!(op, ContextOp::SetTimeout { .. } | ContextOp::TotalTimeout { .. })
            })
            .collect()
    }

    #[test]
    fn double_tap_performs() {
        let mut multi = MultiTapInteraction::default();
        let mut h = Harness::new();
        h.event(&mut multi, 0.0, 1.0);
        h.event(&mut multi, 0.1, 0.0);
        h.event(&mut multi, 0.3, 1.0);
        h.event(&mut multi, 0.4, 0.0);
        assert_eq!(ops_without_timers(&mut h), vec![ContextOp::Started, PERFORMED]);
    }

    #[test]
    fn waiting_too_long_between_taps_cancels() {
        let mut multi = MultiTapInteraction {
            tap_delay: 0.2,
            ..Default::default()
        };
        let mut h = Harness::new();
        h.event(&mut multi, 0.0, 1.0);
        h.event(&mut multi, 0.1, 0.0);
        h.advance(&mut multi, 1.0, 0.0);
        assert_eq!(ops_without_timers(&mut h), vec![ContextOp::Started, ContextOp::Canceled]);
    }

    #[test]
    fn total_completion_time_covers_every_tap() {
        let mut multi = MultiTapInteraction {
            tap_time: 0.2,
            tap_delay: 0.5,
            tap_count: 3,
            ..Default::default()
        };
        let mut h = Harness::new();
        h.event(&mut multi, 0.0, 1.0);
        let total = h.take().into_iter().find_map(|op| match op {
            ContextOp::TotalTimeout { seconds } => Some(seconds),
            _ => None,
        });
        assert!((total.unwrap() - 1.6).abs() < 1e-5);
    }
}
