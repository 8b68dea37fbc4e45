// crates/input_core/tests/interactions.rs
mod common;

use common::{phases, Rig};
use input_core::{Action, ActionId, ActionMap, ActionPhase, Interaction, InteractionContext};

use ActionPhase::{Performed, Started};

/// Starts on press and performs once the control has been down for half a
/// second. Letting go stops the clock but keeps the action started.
#[derive(Default)]
struct Charge;

impl Interaction for Charge {
    fn process(&mut self, ctx: &mut InteractionContext<'_>) {
        if ctx.timer_has_expired() {
            ctx.performed();
            return;
        }
        let pressed = ctx.control_is_actuated(ctx.press_point());
        if ctx.is_waiting() && pressed {
            ctx.started();
            ctx.set_timeout(0.5);
        } else if ctx.is_started() && !pressed {
            ctx.clear_timeout();
        }
    }

    fn reset(&mut self) {}
}

fn charge_rig() -> (Rig, ActionId) {
    let mut rig = Rig::new();
    rig.input
        .registries_mut()
        .register_interaction("charge", |_| Ok(Box::new(Charge)));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::button("throw")
                .with_binding("<Keyboard>/t")
                .with_interactions("charge"),
        ),
    );
    (rig, actions[0])
}

#[test]
fn running_timeout_fires_while_held() {
    let (mut rig, throw) = charge_rig();
    let t = rig.key("t");
    let log = rig.record(throw);

    rig.set_at(0.0, t, 1.0);
    rig.advance_to(1.0);
    assert_eq!(phases(&log), vec![Started, Performed]);
}

#[test]
fn cleared_timeout_never_fires() {
    let (mut rig, throw) = charge_rig();
    let t = rig.key("t");
    let log = rig.record(throw);

    rig.set_at(0.0, t, 1.0);
    rig.set_at(0.1, t, 0.0);
    rig.advance_to(1.0);
    rig.advance_to(2.0);
    assert_eq!(phases(&log), vec![Started]);
    assert_eq!(rig.input.phase(throw).unwrap(), Started);
    assert_eq!(rig.input.timeout_completion_percentage(throw).unwrap(), 0.0);
}

#[test]
fn disabling_drops_pending_timeouts() {
    let (mut rig, throw) = charge_rig();
    let t = rig.key("t");
    let log = rig.record(throw);

    rig.set_at(0.0, t, 1.0);
    rig.input.disable_action(throw).unwrap();
    rig.input.enable_action(throw).unwrap();
    rig.advance_to(1.0);
    assert_eq!(phases(&log), vec![Started, ActionPhase::Canceled]);
    assert_eq!(rig.input.phase(throw).unwrap(), ActionPhase::Waiting);
}
