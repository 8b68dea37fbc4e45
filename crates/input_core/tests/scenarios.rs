// crates/input_core/tests/scenarios.rs
mod common;

use common::{interactions, phases, Rig};
use input_core::{Action, ActionMap, ActionPhase, Settings};

use ActionPhase::{Canceled, Performed, Started};

#[test]
fn button_press_and_release_points() {
    let settings = Settings {
        default_button_press_point: 0.5,
        button_release_threshold: 0.8,
        ..Settings::default()
    };
    let mut rig = Rig::with_settings(settings);
    let trigger = rig.pad("leftTrigger");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(Action::button("fire").with_binding("<Gamepad>/leftTrigger")),
    );
    let fire = actions[0];
    let log = rig.record(fire);

    rig.set(trigger, 0.3);
    assert_eq!(phases(&log), vec![Started]);
    rig.set(trigger, 0.1);
    assert!(phases(&log).is_empty());
    rig.set(trigger, 0.6);
    assert_eq!(phases(&log), vec![Performed]);
    assert_eq!(rig.input.phase(fire).unwrap(), Performed);
    rig.set(trigger, 0.7);
    assert!(phases(&log).is_empty());
    rig.set(trigger, 0.3);
    assert_eq!(phases(&log), vec![Started]);
    assert_eq!(rig.input.phase(fire).unwrap(), Started);
    rig.set(trigger, 0.0);
    assert_eq!(phases(&log), vec![Canceled]);
    assert_eq!(rig.input.phase(fire).unwrap(), ActionPhase::Waiting);
}

#[test]
fn stronger_control_takes_over_a_value_action() {
    let mut rig = Rig::new();
    let (x, y) = (rig.pad("leftTrigger"), rig.pad("rightTrigger"));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::value("accelerate")
                .with_binding("<Gamepad>/leftTrigger")
                .with_binding("<Gamepad>/rightTrigger"),
        ),
    );
    let accelerate = actions[0];
    let log = rig.record(accelerate);

    rig.set(x, 0.3);
    assert_eq!(phases(&log), vec![Started, Performed]);
    assert_eq!(rig.input.active_control(accelerate).unwrap(), Some(x));

    rig.set(y, 0.2);
    assert!(phases(&log).is_empty());
    assert_eq!(rig.input.active_control(accelerate).unwrap(), Some(x));

    rig.set(y, 0.5);
    assert_eq!(phases(&log), vec![Performed]);
    assert_eq!(rig.input.active_control(accelerate).unwrap(), Some(y));
    assert_eq!(rig.input.read_value::<f32>(accelerate).unwrap(), 0.5);

    rig.set(x, 0.0);
    assert!(phases(&log).is_empty());

    rig.set(y, 0.0);
    assert_eq!(phases(&log), vec![Canceled]);
    assert_eq!(rig.input.active_control(accelerate).unwrap(), None);
}

#[test]
fn modifier_must_be_pressed_first() {
    let mut rig = Rig::new();
    let (m, b) = (rig.key("m"), rig.key("b"));
    let (_, actions) = rig.enable(ActionMap::new("gameplay").with_action(Action::button("map").with_composite(
        "OneModifier(modifiersFirst=true)",
        &[("modifier", "<Keyboard>/m"), ("binding", "<Keyboard>/b")],
    )));
    let log = rig.record(actions[0]);

    rig.set(b, 1.0);
    rig.set(m, 1.0);
    rig.set(b, 0.0);
    rig.set(m, 0.0);
    assert!(!phases(&log).contains(&Performed));

    rig.set(m, 1.0);
    rig.set(b, 1.0);
    rig.set(b, 0.0);
    rig.set(m, 0.0);
    let performed = phases(&log).into_iter().filter(|p| *p == Performed).count();
    assert_eq!(performed, 1);
}

#[test]
fn tap_then_slow_tap_hand_over() {
    let mut rig = Rig::new();
    let f = rig.key("f");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::button("fire")
                .with_binding("<Keyboard>/f")
                .with_interactions("tap(duration=0.1),slowTap(duration=0.5)"),
        ),
    );
    let log = rig.record(actions[0]);

    rig.set_at(1.0, f, 1.0);
    rig.set_at(1.05, f, 0.0);
    assert_eq!(
        interactions(&log),
        vec![(Started, "tap".to_string()), (Performed, "tap".to_string())]
    );

    rig.set_at(2.0, f, 1.0);
    rig.advance_to(2.3);
    rig.set_at(2.6, f, 0.0);
    assert_eq!(
        interactions(&log),
        vec![
            (Started, "tap".to_string()),
            (Canceled, "tap".to_string()),
            (Started, "slowTap".to_string()),
            (Performed, "slowTap".to_string()),
        ]
    );
}

#[test]
fn shortcut_consumes_the_shared_key() {
    let settings = Settings {
        shortcut_keys_consume_input: true,
        ..Settings::default()
    };
    let mut rig = Rig::with_settings(settings);
    let (ctrl, shift, b) = (rig.key("leftCtrl"), rig.key("leftShift"), rig.key("b"));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay")
            .with_action(Action::button("build").with_composite(
                "TwoModifiers",
                &[
                    ("modifier1", "<Keyboard>/leftCtrl"),
                    ("modifier2", "<Keyboard>/leftShift"),
                    ("binding", "<Keyboard>/b"),
                ],
            ))
            .with_action(Action::button("boost").with_binding("<Keyboard>/b")),
    );
    let (build, boost) = (actions[0], actions[1]);
    let build_log = rig.record(build);
    let boost_log = rig.record(boost);

    rig.set(ctrl, 1.0);
    rig.set(shift, 1.0);
    rig.set(b, 1.0);
    assert_eq!(phases(&build_log), vec![Started, Performed]);
    assert!(phases(&boost_log).is_empty());
}

#[test]
fn shared_key_reaches_both_actions_without_suppression() {
    let mut rig = Rig::new();
    let (ctrl, b) = (rig.key("leftCtrl"), rig.key("b"));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay")
            .with_action(Action::button("build").with_composite(
                "OneModifier",
                &[("modifier", "<Keyboard>/leftCtrl"), ("binding", "<Keyboard>/b")],
            ))
            .with_action(Action::button("boost").with_binding("<Keyboard>/b")),
    );
    let build_log = rig.record(actions[0]);
    let boost_log = rig.record(actions[1]);

    rig.set(ctrl, 1.0);
    rig.set(b, 1.0);
    assert_eq!(phases(&build_log), vec![Started, Performed]);
    assert_eq!(phases(&boost_log), vec![Started, Performed]);
}

#[test]
fn partial_shortcut_leaves_the_shared_key_alone() {
    let settings = Settings {
        shortcut_keys_consume_input: true,
        ..Settings::default()
    };
    let mut rig = Rig::with_settings(settings);
    let (ctrl, b) = (rig.key("leftCtrl"), rig.key("b"));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay")
            .with_action(Action::pass_through("chord").with_composite(
                "OneModifier",
                &[("modifier", "<Keyboard>/leftCtrl"), ("binding", "<Keyboard>/b")],
            ))
            .with_action(Action::button("boost").with_binding("<Keyboard>/b")),
    );
    let (chord, boost) = (actions[0], actions[1]);
    let chord_log = rig.record(chord);
    let boost_log = rig.record(boost);

    rig.set(b, 1.0);
    assert!(phases(&chord_log).is_empty());
    assert_eq!(phases(&boost_log), vec![Started, Performed]);

    rig.set(b, 0.0);
    rig.set(ctrl, 1.0);
    assert!(phases(&chord_log).is_empty());
    phases(&boost_log);

    // Completing the shortcut drives the chord and swallows b.
    rig.set(b, 1.0);
    assert_eq!(phases(&chord_log), vec![Performed]);
    assert!(phases(&boost_log).is_empty());
}

#[test]
fn reenabling_returns_to_waiting() {
    let mut rig = Rig::new();
    let f = rig.key("f");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::button("charge")
                .with_binding("<Keyboard>/f")
                .with_interactions("hold(duration=1)"),
        ),
    );
    let charge = actions[0];
    let log = rig.record(charge);

    rig.set_at(0.0, f, 1.0);
    assert_eq!(rig.input.phase(charge).unwrap(), Started);

    rig.input.disable_action(charge).unwrap();
    assert_eq!(phases(&log), vec![Started, Canceled]);
    assert_eq!(rig.input.phase(charge).unwrap(), ActionPhase::Disabled);

    rig.input.enable_action(charge).unwrap();
    assert_eq!(rig.input.phase(charge).unwrap(), ActionPhase::Waiting);
    assert_eq!(rig.input.active_control(charge).unwrap(), None);

    // The hold timer died with the disable.
    rig.advance_to(2.0);
    assert!(phases(&log).is_empty());
}
