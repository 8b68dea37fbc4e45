// crates/input_shared/src/lib.rs

pub mod input_types;

pub use input_types::{
    ActionPhase, ActionType, ActionValue, ControlValue, UpdateKind, ValueType,
};
