// crates/input_demo/src/main.rs
//! Scripted walk through the action runtime: a keyboard and a gamepad drive
//! a small gameplay map and every phase change is logged.

use std::env;
use std::fs;

use glam::Vec2;
use input_core::{
    Action, ActionMap, ControlId, DeviceDesc, InputSystem, Notification, RawEvent, Settings,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAME: f64 = 1.0 / 60.0;

fn load_settings() -> Settings {
    let Some(path) = env::args().nth(1) else {
        return Settings::default();
    };
    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| Settings::from_toml_str(&text).map_err(|e| e.to_string()))
    {
        Ok(settings) => {
            info!(%path, "loaded input settings");
            settings
        }
        Err(error) => {
            warn!(%path, %error, "falling back to default input settings");
            Settings::default()
        }
    }
}

fn press(time: f64, control: ControlId, value: f32) -> RawEvent {
    RawEvent::state_change(time, control, value)
}

fn gameplay_map() -> ActionMap {
    ActionMap::new("gameplay")
        .with_action(
            Action::button("jump")
                .with_binding("<Keyboard>/space")
                .with_binding("<Gamepad>/buttonSouth"),
        )
        .with_action(
            Action::value("move")
                .with_composite(
                    "2DVector",
                    &[
                        ("up", "<Keyboard>/w"),
                        ("down", "<Keyboard>/s"),
                        ("left", "<Keyboard>/a"),
                        ("right", "<Keyboard>/d"),
                    ],
                )
                .with_binding("<Gamepad>/leftStick"),
        )
        .with_action(
            Action::button("fire")
                .with_binding("<Keyboard>/f")
                .with_interactions("tap(duration=0.2),slowTap(duration=0.5)"),
        )
        .with_action(Action::button("save").with_composite(
            "OneModifier",
            &[("modifier", "<Keyboard>/leftCtrl"), ("binding", "<Keyboard>/s")],
        ))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut input = InputSystem::with_settings(load_settings());
    let keyboard = input.add_device(DeviceDesc::keyboard());
    let gamepad = input.add_device(DeviceDesc::gamepad());

    let map = match input.add_map(gameplay_map(), None) {
        Ok(map) => map,
        Err(error) => {
            warn!(%error, "could not add the gameplay map");
            return;
        }
    };
    for issue in input.resolution_issues() {
        warn!(%issue, "binding problem");
    }

    input.subscribe(|notification| {
        if let Notification::MapEnabled(_) | Notification::MapDisabled(_) = notification {
            info!(?notification, "map state changed");
        }
    });
    let logged = input.on_map_action(map, |event, _| {
        info!(
            action = ?event.action,
            phase = ?event.phase,
            interaction = event.interaction.as_deref().unwrap_or("-"),
            value = ?event.value,
            time = event.time,
            "action"
        );
    });
    if let Err(error) = logged.and_then(|_| input.enable_map(map)) {
        warn!(%error, "could not enable the gameplay map");
        return;
    }

    let control = |device, name: &str| input.devices().control(device, name);
    let (Some(space), Some(w), Some(d), Some(f), Some(s), Some(ctrl), Some(stick)) = (
        control(keyboard, "space"),
        control(keyboard, "w"),
        control(keyboard, "d"),
        control(keyboard, "f"),
        control(keyboard, "s"),
        control(keyboard, "leftCtrl"),
        control(gamepad, "leftStick"),
    ) else {
        warn!("keyboard or gamepad layout is missing controls");
        return;
    };

    // Device threads would send through this; the script feeds it per frame.
    let sender = input.event_sender();
    let script = [
        press(0.01, space, 1.0),
        press(0.05, space, 0.0),
        press(0.10, w, 1.0),
        press(0.12, d, 1.0),
        RawEvent::state_change(0.20, stick, Vec2::new(0.0, -0.9)),
        press(0.30, w, 0.0),
        press(0.31, d, 0.0),
        RawEvent::state_change(0.40, stick, Vec2::ZERO),
        press(0.50, f, 1.0),
        press(0.55, f, 0.0),
        press(0.70, f, 1.0),
        press(1.40, f, 0.0),
        press(1.50, s, 1.0),
        press(1.52, ctrl, 1.0),
        press(1.60, s, 0.0),
        press(1.61, ctrl, 0.0),
        press(1.70, ctrl, 1.0),
        press(1.72, s, 1.0),
        press(1.80, s, 0.0),
        press(1.81, ctrl, 0.0),
    ];
    let mut pending = script.iter().peekable();

    let move_action = input.find_action("gameplay/move");
    let mut time = 0.0;
    while time < 2.0 {
        time += FRAME;
        while let Some(event) = pending.next_if(|e| e.time() <= time) {
            sender.send(*event);
        }
        input.update(time);
        if let Some(id) = move_action {
            if input.phase(id).is_ok_and(|p| p.is_in_progress()) {
                if let Ok(value) = input.read_value::<Vec2>(id) {
                    info!(x = value.x, y = value.y, "moving");
                }
            }
        }
    }

    if let Err(error) = input.disable_map(map) {
        warn!(%error, "could not disable the gameplay map");
    }
    info!(updates = input.update_count(), "script finished");
}
