// crates/input_core/tests/reads.rs
mod common;

use common::{phases, Rig};
use glam::Vec2;
use input_core::{Action, ActionMap, ActionPhase, InputError, UpdateKind, ValueType};

use ActionPhase::{Performed, Started};

fn fire_map() -> ActionMap {
    ActionMap::new("gameplay").with_action(Action::value("fire").with_binding("<Gamepad>/rightTrigger"))
}

#[test]
fn typed_read_with_the_wrong_type_names_everything() {
    let mut rig = Rig::new();
    let trigger = rig.pad("rightTrigger");
    let (_, actions) = rig.enable(fire_map());
    let fire = actions[0];

    // Idle actions read as the default of whatever type is asked for.
    assert_eq!(rig.input.read_value::<Vec2>(fire).unwrap(), Vec2::ZERO);

    rig.set(trigger, 0.7);
    assert_eq!(rig.input.read_value::<f32>(fire).unwrap(), 0.7);
    assert_eq!(
        rig.input.read_value::<Vec2>(fire),
        Err(InputError::ValueTypeMismatch {
            action: "gameplay/fire".to_string(),
            control: "/Gamepad/rightTrigger".to_string(),
            expected: ValueType::Vector2,
            actual: ValueType::Float,
        })
    );
}

#[test]
fn untyped_read_into_a_byte_buffer() {
    let mut rig = Rig::new();
    let trigger = rig.pad("rightTrigger");
    let (_, actions) = rig.enable(fire_map());
    let fire = actions[0];
    rig.set(trigger, 0.25);

    let mut buffer = [0u8; 8];
    assert_eq!(rig.input.read_value_into(fire, &mut buffer), Ok((ValueType::Float, 4)));
    assert_eq!(&buffer[..4], &0.25f32.to_ne_bytes());

    let mut short = [0u8; 2];
    assert_eq!(
        rig.input.read_value_into(fire, &mut short),
        Err(InputError::BufferTooSmall {
            action: "gameplay/fire".to_string(),
            required: 4,
            provided: 2,
        })
    );
}

#[test]
fn composite_values_and_part_controls() {
    let mut rig = Rig::new();
    let (w, d) = (rig.key("w"), rig.key("d"));
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(Action::value("move").with_composite(
            "2DVector(mode=digital)",
            &[
                ("up", "<Keyboard>/w"),
                ("down", "<Keyboard>/s"),
                ("left", "<Keyboard>/a"),
                ("right", "<Keyboard>/d"),
            ],
        )),
    );
    let movement = actions[0];

    rig.set(w, 1.0);
    rig.set(d, 1.0);
    assert_eq!(rig.input.read_value::<Vec2>(movement).unwrap(), Vec2::new(1.0, 1.0));
    assert_eq!(rig.input.composite_part_controls(movement, 0, "UP").unwrap(), vec![w]);
    assert_eq!(rig.input.binding_controls(movement, 4).unwrap(), &[d]);
    assert_eq!(
        rig.input.binding_controls(movement, 9),
        Err(InputError::UnknownBinding {
            action: "gameplay/move".to_string(),
            index: 9
        })
    );
    assert!(matches!(
        rig.input.composite_part_controls(movement, 0, "forward"),
        Err(InputError::InvalidParameter { .. })
    ));
    assert!(rig.input.composite_part_controls(movement, 1, "up").is_err());
}

#[test]
fn frame_flags_latch_until_the_next_update() {
    let mut rig = Rig::new();
    let space = rig.key("space");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(Action::button("jump").with_binding("<Keyboard>/space")),
    );
    let jump = actions[0];

    rig.set(space, 1.0);
    assert!(rig.input.was_pressed_this_frame(jump).unwrap());
    assert!(rig.input.was_performed_this_frame(jump).unwrap());
    assert!(rig.input.is_pressed(jump).unwrap());

    // Toggling the action does not clear the latches.
    rig.input.disable_action(jump).unwrap();
    rig.input.enable_action(jump).unwrap();
    assert!(rig.input.was_pressed_this_frame(jump).unwrap());
    assert!(rig.input.was_performed_this_frame(jump).unwrap());
    assert!(!rig.input.is_pressed(jump).unwrap());

    rig.advance_to(1.0);
    assert!(!rig.input.was_pressed_this_frame(jump).unwrap());
    assert!(!rig.input.was_performed_this_frame(jump).unwrap());

    rig.set(space, 0.0);
    rig.set(space, 1.0);
    rig.set(space, 0.0);
    assert!(rig.input.was_released_this_frame(jump).unwrap());
    assert!(rig.input.was_completed_this_frame(jump).unwrap());

    // Disabling a held button in a later frame is neither a release nor a completion.
    rig.set(space, 1.0);
    rig.advance_to(2.0);
    rig.input.disable_action(jump).unwrap();
    assert!(!rig.input.was_released_this_frame(jump).unwrap());
    assert!(!rig.input.was_completed_this_frame(jump).unwrap());
    assert_eq!(rig.input.phase(jump).unwrap(), ActionPhase::Disabled);
}

#[test]
fn value_actions_pick_up_controls_held_before_enabling() {
    let mut rig = Rig::new();
    let stick = rig.pad("leftStick");
    let map = rig
        .input
        .add_map(
            ActionMap::new("gameplay")
                .with_action(Action::value("look").with_binding("<Gamepad>/leftStick"))
                .with_action(Action::button("aim").with_binding("<Gamepad>/leftStick")),
            None,
        )
        .unwrap();
    rig.set_vec(stick, Vec2::new(0.0, 0.8));

    let look = rig.input.find_action("look").unwrap();
    let aim = rig.input.find_action("aim").unwrap();
    let look_log = rig.record(look);
    let aim_log = rig.record(aim);
    rig.input.enable_map(map).unwrap();
    assert!(phases(&look_log).is_empty());

    rig.advance_to(1.0);
    assert_eq!(phases(&look_log), vec![Started, Performed]);
    assert_eq!(rig.input.read_value::<Vec2>(look).unwrap(), Vec2::new(0.0, 0.8));
    // Buttons wait for the next change.
    assert!(phases(&aim_log).is_empty());
}

#[test]
fn timeout_completion_tracks_a_hold() {
    let mut rig = Rig::new();
    let e = rig.key("e");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::button("interact")
                .with_binding("<Keyboard>/e")
                .with_interactions("hold(duration=1)"),
        ),
    );
    let interact = actions[0];
    assert_eq!(rig.input.timeout_completion_percentage(interact).unwrap(), 0.0);

    rig.set_at(0.0, e, 1.0);
    rig.advance_to(0.25);
    assert_eq!(rig.input.timeout_completion_percentage(interact).unwrap(), 0.25);
    assert_eq!(rig.input.phase(interact).unwrap(), Started);

    rig.advance_to(1.5);
    assert_eq!(rig.input.phase(interact).unwrap(), Performed);
    assert_eq!(rig.input.timeout_completion_percentage(interact).unwrap(), 1.0);
}

#[test]
fn editor_updates_hold_back_player_timeouts() {
    let mut rig = Rig::new();
    let e = rig.key("e");
    let (_, actions) = rig.enable(
        ActionMap::new("gameplay").with_action(
            Action::button("interact")
                .with_binding("<Keyboard>/e")
                .with_interactions("hold(duration=0.5)"),
        ),
    );
    let interact = actions[0];
    let log = rig.record(interact);

    rig.set_at(0.0, e, 1.0);
    assert_eq!(phases(&log), vec![Started]);

    rig.input.update_with(1.0, UpdateKind::Editor);
    assert!(phases(&log).is_empty());

    rig.input.update_with(1.1, UpdateKind::Player);
    assert_eq!(phases(&log), vec![Performed]);
}

#[test]
fn stale_ids_are_rejected() {
    let mut rig = Rig::new();
    let (map, actions) = rig.enable(fire_map());
    let fire = actions[0];
    rig.input.disable_map(map).unwrap();
    rig.input.remove_map(map).unwrap();

    assert!(matches!(rig.input.phase(fire), Err(InputError::UnknownAction(_))));
    assert!(matches!(rig.input.enable_map(map), Err(InputError::UnknownMap(_))));
    assert!(rig.input.find_action("fire").is_none());
}
