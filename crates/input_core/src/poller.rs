// crates/input_core/src/poller.rs
//! Raw event intake: the event type fed to `InputSystem::update`, a channel
//! sender for device threads and a winit window-event front-end.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use glam::Vec2;
use input_shared::ControlValue;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::devices::{ControlId, DeviceId, DeviceSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawEvent {
    StateChange {
        time: f64,
        control: ControlId,
        value: ControlValue,
    },
    /// The device went back to its default state, e.g. on focus loss.
    DeviceReset { time: f64, device: DeviceId },
}

impl RawEvent {
    pub fn state_change(time: f64, control: ControlId, value: impl Into<ControlValue>) -> Self {
        RawEvent::StateChange {
            time,
            control,
            value: value.into(),
        }
    }

    pub fn time(&self) -> f64 {
        match self {
            RawEvent::StateChange { time, .. } | RawEvent::DeviceReset { time, .. } => *time,
        }
    }
}

/// Hands raw events from any thread to the update thread. Events are
/// drained at the start of the next `update`.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<RawEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: Sender<RawEvent>) -> Self {
        Self { tx }
    }

    /// False once the owning `InputSystem` is gone.
    pub fn send(&self, event: RawEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn state_change(&self, time: f64, control: ControlId, value: impl Into<ControlValue>) -> bool {
        self.send(RawEvent::state_change(time, control, value))
    }
}

/// Name of the keyboard control a physical key maps to.
pub fn key_control_name(key: KeyCode) -> Option<&'static str> {
    let name = match key {
        KeyCode::KeyA => "a",
        KeyCode::KeyB => "b",
        KeyCode::KeyC => "c",
        KeyCode::KeyD => "d",
        KeyCode::KeyE => "e",
        KeyCode::KeyF => "f",
        KeyCode::KeyG => "g",
        KeyCode::KeyH => "h",
        KeyCode::KeyI => "i",
        KeyCode::KeyJ => "j",
        KeyCode::KeyK => "k",
        KeyCode::KeyL => "l",
        KeyCode::KeyM => "m",
        KeyCode::KeyN => "n",
        KeyCode::KeyO => "o",
        KeyCode::KeyP => "p",
        KeyCode::KeyQ => "q",
        KeyCode::KeyR => "r",
        KeyCode::KeyS => "s",
        KeyCode::KeyT => "t",
        KeyCode::KeyU => "u",
        KeyCode::KeyV => "v",
        KeyCode::KeyW => "w",
        KeyCode::KeyX => "x",
        KeyCode::KeyY => "y",
        KeyCode::KeyZ => "z",
        KeyCode::Digit1 => "1",
        KeyCode::Digit2 => "2",
        KeyCode::Digit3 => "3",
        KeyCode::Digit4 => "4",
        KeyCode::Digit5 => "5",
        KeyCode::Digit6 => "6",
        KeyCode::Digit7 => "7",
        KeyCode::Digit8 => "8",
        KeyCode::Digit9 => "9",
        KeyCode::Digit0 => "0",
        KeyCode::Space => "space",
        KeyCode::Enter => "enter",
        KeyCode::Escape => "escape",
        KeyCode::Tab => "tab",
        KeyCode::Backspace => "backspace",
        KeyCode::ShiftLeft => "leftShift",
        KeyCode::ShiftRight => "rightShift",
        KeyCode::ControlLeft => "leftCtrl",
        KeyCode::ControlRight => "rightCtrl",
        KeyCode::AltLeft => "leftAlt",
        KeyCode::AltRight => "rightAlt",
        KeyCode::ArrowUp => "upArrow",
        KeyCode::ArrowDown => "downArrow",
        KeyCode::ArrowLeft => "leftArrow",
        KeyCode::ArrowRight => "rightArrow",
        _ => return None,
    };
    Some(name)
}

/// Translates winit window events into raw events for one keyboard and one
/// mouse device. Keeps raw key state out of the application loop.
pub struct InputPoller {
    sender: EventSender,
    keyboard: DeviceId,
    mouse: DeviceId,
    keys: HashMap<KeyCode, ControlId>,
    buttons: [Option<ControlId>; 3],
    position: Option<ControlId>,
    scroll: Option<ControlId>,
    active_keys: Vec<KeyCode>,
}

impl InputPoller {
    pub fn new(sender: EventSender, devices: &DeviceSet, keyboard: DeviceId, mouse: DeviceId) -> Self {
        let keys = devices
            .controls(keyboard)
            .filter_map(|(id, desc)| key_for_name(&desc.name).map(|key| (key, id)))
            .collect();
        Self {
            sender,
            keyboard,
            mouse,
            keys,
            buttons: [
                devices.control(mouse, "leftButton"),
                devices.control(mouse, "rightButton"),
                devices.control(mouse, "middleButton"),
            ],
            position: devices.control(mouse, "position"),
            scroll: devices.control(mouse, "scroll"),
            active_keys: Vec::new(),
        }
    }

    /// Process a single window event. Returns true if it produced input.
    pub fn handle_event(&mut self, event: &WindowEvent, time: f64) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event, time),
            WindowEvent::MouseInput { state, button, .. } => {
                let index = match button {
                    MouseButton::Left => 0,
                    MouseButton::Right => 1,
                    MouseButton::Middle => 2,
                    _ => return false,
                };
                let Some(control) = self.buttons[index] else {
                    return false;
                };
                self.sender.state_change(time, control, pressed_value(*state))
            }
            WindowEvent::CursorMoved { position, .. } => match self.position {
                Some(control) => self.sender.state_change(
                    time,
                    control,
                    Vec2::new(position.x as f32, position.y as f32),
                ),
                None => false,
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let Some(control) = self.scroll else {
                    return false;
                };
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(p) => Vec2::new(p.x as f32, p.y as f32),
                };
                self.sender.state_change(time, control, delta)
            }
            WindowEvent::Focused(false) => {
                self.active_keys.clear();
                let keyboard = self.sender.send(RawEvent::DeviceReset {
                    time,
                    device: self.keyboard,
                });
                let mouse = self.sender.send(RawEvent::DeviceReset {
                    time,
                    device: self.mouse,
                });
                keyboard && mouse
            }
            _ => false,
        }
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent, time: f64) -> bool {
        let PhysicalKey::Code(keycode) = key_event.physical_key else {
            return false;
        };
        if key_event.repeat {
            return false;
        }
        match key_event.state {
            ElementState::Pressed => {
                if !self.active_keys.contains(&keycode) {
                    self.active_keys.push(keycode);
                }
            }
            ElementState::Released => self.active_keys.retain(|&k| k != keycode),
        }
        match self.keys.get(&keycode) {
            Some(&control) => self
                .sender
                .state_change(time, control, pressed_value(key_event.state)),
            None => false,
        }
    }

    /// Returns true if a given physical key is currently held.
    pub fn is_key_active(&self, key: KeyCode) -> bool {
        self.active_keys.contains(&key)
    }

    pub fn active_keys(&self) -> &[KeyCode] {
        &self.active_keys
    }
}

fn pressed_value(state: ElementState) -> f32 {
    match state {
        ElementState::Pressed => 1.0,
        ElementState::Released => 0.0,
    }
}

const MAPPED_KEYS: &[KeyCode] = &[
    KeyCode::KeyA, KeyCode::KeyB, KeyCode::KeyC, KeyCode::KeyD, KeyCode::KeyE, KeyCode::KeyF,
    KeyCode::KeyG, KeyCode::KeyH, KeyCode::KeyI, KeyCode::KeyJ, KeyCode::KeyK, KeyCode::KeyL,
    KeyCode::KeyM, KeyCode::KeyN, KeyCode::KeyO, KeyCode::KeyP, KeyCode::KeyQ, KeyCode::KeyR,
    KeyCode::KeyS, KeyCode::KeyT, KeyCode::KeyU, KeyCode::KeyV, KeyCode::KeyW, KeyCode::KeyX,
    KeyCode::KeyY, KeyCode::KeyZ, KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3,
    KeyCode::Digit4, KeyCode::Digit5, KeyCode::Digit6, KeyCode::Digit7, KeyCode::Digit8,
    KeyCode::Digit9, KeyCode::Digit0, KeyCode::Space, KeyCode::Enter, KeyCode::Escape,
    KeyCode::Tab, KeyCode::Backspace, KeyCode::ShiftLeft, KeyCode::ShiftRight,
    KeyCode::ControlLeft, KeyCode::ControlRight, KeyCode::AltLeft, KeyCode::AltRight,
    KeyCode::ArrowUp, KeyCode::ArrowDown, KeyCode::ArrowLeft, KeyCode::ArrowRight,
];

fn key_for_name(name: &str) -> Option<KeyCode> {
    MAPPED_KEYS
        .iter()
        .copied()
        .find(|key| key_control_name(*key).is_some_and(|n| n.eq_ignore_ascii_case(name)))
}
