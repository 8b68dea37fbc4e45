// crates/input_core/tests/common/mod.rs
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use input_core::{
    ActionEvent, ActionId, ActionMap, ActionPhase, ControlId, ControlValue, DeviceDesc, DeviceId,
    InputSystem, MapId, RawEvent, Settings,
};

pub type Log = Rc<RefCell<Vec<ActionEvent>>>;

/// An input system with one keyboard and one gamepad.
pub struct Rig {
    pub input: InputSystem,
    pub keyboard: DeviceId,
    pub gamepad: DeviceId,
    pub time: f64,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let mut input = InputSystem::with_settings(settings);
        let keyboard = input.add_device(DeviceDesc::keyboard());
        let gamepad = input.add_device(DeviceDesc::gamepad());
        Self {
            input,
            keyboard,
            gamepad,
            time: 0.0,
        }
    }

    pub fn key(&self, name: &str) -> ControlId {
        self.input.devices().control(self.keyboard, name).unwrap()
    }

    pub fn pad(&self, name: &str) -> ControlId {
        self.input.devices().control(self.gamepad, name).unwrap()
    }

    /// Adds and enables `map`, returning the ids of its actions in order.
    pub fn enable(&mut self, map: ActionMap) -> (MapId, Vec<ActionId>) {
        let names: Vec<String> = map.actions.iter().map(|a| a.name.clone()).collect();
        let id = self.input.add_map(map, None).unwrap();
        self.input.enable_map(id).unwrap();
        let actions = names
            .iter()
            .map(|name| self.input.find_action(name).unwrap())
            .collect();
        (id, actions)
    }

    /// Records every phase change of `action`.
    pub fn record(&mut self, action: ActionId) -> Log {
        let log: Log = Rc::default();
        let sink = log.clone();
        self.input
            .on_action(action, move |event, _| sink.borrow_mut().push(event.clone()))
            .unwrap();
        log
    }

    /// Writes `value` at `time` and runs one update at that time.
    pub fn set_at(&mut self, time: f64, control: ControlId, value: f32) {
        self.write_at(time, control, ControlValue::Float(value));
    }

    /// Writes `value` one step after the last event.
    pub fn set(&mut self, control: ControlId, value: f32) {
        self.set_at(self.time + 0.01, control, value);
    }

    pub fn set_vec(&mut self, control: ControlId, value: Vec2) {
        self.write_at(self.time + 0.01, control, ControlValue::Vector2(value));
    }

    pub fn write_at(&mut self, time: f64, control: ControlId, value: ControlValue) {
        self.time = time;
        self.input.queue_event(RawEvent::state_change(time, control, value));
        self.input.update(time);
    }

    pub fn advance_to(&mut self, time: f64) {
        self.time = time;
        self.input.update(time);
    }
}

pub fn phases(log: &Log) -> Vec<ActionPhase> {
    log.borrow_mut().drain(..).map(|e| e.phase).collect()
}

pub fn interactions(log: &Log) -> Vec<(ActionPhase, String)> {
    log.borrow_mut()
        .drain(..)
        .map(|e| (e.phase, e.interaction.as_deref().unwrap_or("").to_string()))
        .collect()
}
