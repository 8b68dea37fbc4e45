// crates/input_core/tests/properties.rs
mod common;

use common::Rig;
use input_core::{Action, ActionMap, ActionPhase, Settings};
use proptest::prelude::*;

/// Trigger positions on both sides of the default press and release points.
const LEVELS: [f32; 8] = [0.0, 0.1, 0.3, 0.39, 0.45, 0.5, 0.7, 1.0];

fn levels() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(prop::sample::select(LEVELS.to_vec()), 1..40)
}

proptest! {
    #[test]
    fn button_follows_press_and_release_points(values in levels()) {
        let settings = Settings::default();
        let press = settings.default_button_press_point;
        let release = settings.release_point(press);

        let mut rig = Rig::new();
        let trigger = rig.pad("leftTrigger");
        let (_, actions) = rig.enable(
            ActionMap::new("gameplay").with_action(Action::button("fire").with_binding("<Gamepad>/leftTrigger")),
        );
        let fire = actions[0];

        let mut pressed = false;
        for value in values {
            rig.set(trigger, value);
            if !pressed && value >= press {
                pressed = true;
            } else if pressed && value < release {
                pressed = false;
            }
            let expected = if value == 0.0 {
                ActionPhase::Waiting
            } else if pressed {
                ActionPhase::Performed
            } else {
                ActionPhase::Started
            };
            prop_assert_eq!(rig.input.is_pressed(fire).unwrap(), pressed, "value {}", value);
            prop_assert_eq!(rig.input.phase(fire).unwrap(), expected, "value {}", value);
        }
    }

    #[test]
    fn value_action_follows_the_strongest_control(
        steps in prop::collection::vec((any::<bool>(), prop::sample::select(vec![0.0f32, 0.2, 0.4, 0.6, 0.8, 1.0])), 1..40)
    ) {
        let mut rig = Rig::new();
        let controls = [rig.pad("leftTrigger"), rig.pad("rightTrigger")];
        let (_, actions) = rig.enable(
            ActionMap::new("gameplay").with_action(
                Action::value("accelerate")
                    .with_binding("<Gamepad>/leftTrigger")
                    .with_binding("<Gamepad>/rightTrigger"),
            ),
        );
        let accelerate = actions[0];

        let mut current = [0.0f32; 2];
        for (right, value) in steps {
            let which = usize::from(right);
            rig.set(controls[which], value);
            current[which] = value;

            let strongest = current[0].max(current[1]);
            let active = rig.input.active_control(accelerate).unwrap();
            if strongest == 0.0 {
                prop_assert_eq!(active, None);
                prop_assert_eq!(rig.input.phase(accelerate).unwrap(), ActionPhase::Waiting);
            } else {
                let active = active.expect("an actuated control drives the action");
                let index = controls.iter().position(|c| *c == active).unwrap();
                prop_assert_eq!(current[index], strongest);
                prop_assert_eq!(rig.input.read_value::<f32>(accelerate).unwrap(), strongest);
            }
        }
    }
}
