// crates/input_core/src/interactions/press.rs
use crate::error::{InputError, Result};
use crate::params::NameAndParameters;

use super::{press_point_or, Interaction, InteractionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressBehavior {
    #[default]
    PressOnly,
    ReleaseOnly,
    PressAndRelease,
}

/// Explicit press/release point handling on top of any action type.
#[derive(Debug, Clone, Default)]
pub struct PressInteraction {
    pub behavior: PressBehavior,
    pub press_point: f32,
    waiting_for_release: bool,
}

impl PressInteraction {
    pub fn from_params(params: &NameAndParameters) -> Result<Self> {
        let behavior = match params.get("behavior") {
            None => PressBehavior::PressOnly,
            Some(b) if b.eq_ignore_ascii_case("pressOnly") || b == "0" => PressBehavior::PressOnly,
            Some(b) if b.eq_ignore_ascii_case("releaseOnly") || b == "1" => {
                PressBehavior::ReleaseOnly
            }
            Some(b) if b.eq_ignore_ascii_case("pressAndRelease") || b == "2" => {
                PressBehavior::PressAndRelease
            }
            Some(b) => {
                return Err(InputError::InvalidParameter {
                    name: "behavior".into(),
                    value: b.into(),
                })
            }
        };
        Ok(Self {
            behavior,
            press_point: params.get_f32("pressPoint")?.unwrap_or(0.0),
            waiting_for_release: false,
        })
    }

    /// Below the press point but off rest: started; back at rest: canceled.
    fn track_partial(ctx: &mut InteractionContext<'_>, actuation: f32) {
        let started = ctx.is_started();
        if actuation > 0.0 && !started {
            ctx.started();
        } else if at_rest(actuation) && started {
            ctx.canceled();
        }
    }
}

fn at_rest(actuation: f32) -> bool {
    actuation <= f32::EPSILON
}

impl Interaction for PressInteraction {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        let actuation = ctx.magnitude();
        let press_point = press_point_or(self.press_point, ctx);
        let release_point = ctx.release_point(press_point);

        match self.behavior {
            PressBehavior::PressOnly => {
                if self.waiting_for_release {
                    if actuation <= release_point {
                        self.waiting_for_release = false;
                        if at_rest(actuation) {
                            ctx.canceled();
                        } else {
                            ctx.started();
                        }
                    }
                } else if actuation >= press_point {
                    self.waiting_for_release = true;
                    ctx.perform_and_stay_performed();
                } else {
                    Self::track_partial(ctx, actuation);
                }
            }
            PressBehavior::ReleaseOnly => {
                if self.waiting_for_release {
                    if actuation <= release_point {
                        self.waiting_for_release = false;
                        ctx.performed();
                        ctx.canceled();
                    }
                } else if actuation >= press_point {
                    self.waiting_for_release = true;
                    if !ctx.is_started() {
                        ctx.started();
                    }
                } else {
                    Self::track_partial(ctx, actuation);
                }
            }
            PressBehavior::PressAndRelease => {
                if self.waiting_for_release {
                    if actuation <= release_point {
                        self.waiting_for_release = false;
                        ctx.performed();
                        if at_rest(actuation) {
                            ctx.canceled();
                        }
                    }
                } else if actuation >= press_point {
                    self.waiting_for_release = true;
                    ctx.perform_and_stay_performed();
                } else {
                    Self::track_partial(ctx, actuation);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.waiting_for_release = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::testing::{Harness, PERFORMED};
    use crate::interactions::ContextOp;
    use input_shared::ActionPhase;

    const STAY_PERFORMED: ContextOp = ContextOp::Performed {
        after: ActionPhase::Performed,
    };

    #[test]
    fn press_only_performs_on_press_and_cancels_on_release() {
        let mut press = PressInteraction::default();
        let mut h = Harness::new();
        h.event(&mut press, 0.0, 1.0);
        h.event(&mut press, 0.1, 0.0);
        assert_eq!(h.take(), vec![STAY_PERFORMED, ContextOp::Canceled]);
    }

    #[test]
    fn release_only_performs_on_release() {
        let mut press = PressInteraction {
            behavior: PressBehavior::ReleaseOnly,
            ..Default::default()
        };
        let mut h = Harness::new();
        h.event(&mut press, 0.0, 1.0);
        assert_eq!(h.take(), vec![ContextOp::Started]);
        h.event(&mut press, 0.1, 0.0);
        assert_eq!(h.take(), vec![PERFORMED, ContextOp::Canceled]);
    }

    #[test]
    fn press_and_release_performs_twice() {
        let mut press = PressInteraction::from_params(
            &NameAndParameters::parse("press(behavior=pressAndRelease)").unwrap(),
        )
        .unwrap();
        let mut h = Harness::new();
        h.event(&mut press, 0.0, 1.0);
        h.event(&mut press, 0.1, 0.0);
        assert_eq!(h.take(), vec![STAY_PERFORMED, PERFORMED, ContextOp::Canceled]);
    }

    #[test]
    fn unknown_behavior_is_rejected() {
        let params = NameAndParameters::parse("press(behavior=sometimes)").unwrap();
        assert!(PressInteraction::from_params(&params).is_err());
    }
}
