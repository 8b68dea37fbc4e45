// crates/input_shared/src/input_types.rs
//! Plain value and phase types shared by the action runtime and its front-ends.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// The type tag of a control or action value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Float,
    Vector2,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Vector2 => "Vector2",
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            ValueType::Float => std::mem::size_of::<f32>(),
            ValueType::Vector2 => std::mem::size_of::<Vec2>(),
        }
    }

    pub fn default_value(self) -> ControlValue {
        match self {
            ValueType::Float => ControlValue::Float(0.0),
            ValueType::Vector2 => ControlValue::Vector2(Vec2::ZERO),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed control or action value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    Float(f32),
    Vector2(Vec2),
}

impl Default for ControlValue {
    fn default() -> Self {
        ControlValue::Float(0.0)
    }
}

impl ControlValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ControlValue::Float(_) => ValueType::Float,
            ControlValue::Vector2(_) => ValueType::Vector2,
        }
    }

    /// Scalar actuation level: absolute value for axes, length for vectors.
    pub fn magnitude(&self) -> f32 {
        match self {
            ControlValue::Float(v) => v.abs(),
            ControlValue::Vector2(v) => v.length(),
        }
    }

    pub fn is_at_rest(&self) -> bool {
        self.magnitude() == 0.0
    }

    pub fn as_float(&self) -> f32 {
        match self {
            ControlValue::Float(v) => *v,
            ControlValue::Vector2(v) => v.length(),
        }
    }

    /// Raw little-endian bytes of the value, as written by `write_bytes`.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ControlValue::Float(v) => bytemuck::bytes_of(v),
            ControlValue::Vector2(v) => bytemuck::bytes_of(v),
        }
    }

    /// Copies the raw value into `buffer`. Returns the number of bytes
    /// written, or `None` if the buffer is too small.
    pub fn write_bytes(&self, buffer: &mut [u8]) -> Option<usize> {
        let bytes = self.as_bytes();
        let target = buffer.get_mut(..bytes.len())?;
        target.copy_from_slice(bytes);
        Some(bytes.len())
    }
}

impl From<f32> for ControlValue {
    fn from(value: f32) -> Self {
        ControlValue::Float(value)
    }
}

impl From<Vec2> for ControlValue {
    fn from(value: Vec2) -> Self {
        ControlValue::Vector2(value)
    }
}

/// Rust types an action value can be read back as.
pub trait ActionValue: Sized + Default {
    const VALUE_TYPE: ValueType;

    fn from_value(value: ControlValue) -> Option<Self>;
}

impl ActionValue for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn from_value(value: ControlValue) -> Option<Self> {
        match value {
            ControlValue::Float(v) => Some(v),
            ControlValue::Vector2(_) => None,
        }
    }
}

impl ActionValue for Vec2 {
    const VALUE_TYPE: ValueType = ValueType::Vector2;

    fn from_value(value: ControlValue) -> Option<Self> {
        match value {
            ControlValue::Vector2(v) => Some(v),
            ControlValue::Float(_) => None,
        }
    }
}

/// How an action without interactions turns actuation into phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionType {
    #[default]
    Value,
    Button,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionPhase {
    #[default]
    Disabled,
    Waiting,
    Started,
    Performed,
    Canceled,
}

impl ActionPhase {
    pub fn is_in_progress(self) -> bool {
        matches!(self, ActionPhase::Started | ActionPhase::Performed)
    }
}

/// Which kind of update is being processed. Timeouts scheduled during player
/// updates are held back during editor updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateKind {
    #[default]
    Player,
    Editor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_is_length_for_vectors() {
        assert_eq!(ControlValue::Float(-0.25).magnitude(), 0.25);
        assert_eq!(ControlValue::Vector2(Vec2::new(3.0, 4.0)).magnitude(), 5.0);
        assert!(ValueType::Vector2.default_value().is_at_rest());
    }

    #[test]
    fn write_bytes_rejects_short_buffers() {
        let value = ControlValue::Vector2(Vec2::new(1.0, 2.0));
        let mut short = [0u8; 4];
        assert_eq!(value.write_bytes(&mut short), None);

        let mut buffer = [0u8; 8];
        assert_eq!(value.write_bytes(&mut buffer), Some(8));
        let read: Vec2 = bytemuck::pod_read_unaligned(&buffer);
        assert_eq!(read, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn typed_reads_check_the_tag() {
        assert_eq!(f32::from_value(ControlValue::Float(0.5)), Some(0.5));
        assert_eq!(Vec2::from_value(ControlValue::Float(0.5)), None);
        assert!(ActionPhase::Performed.is_in_progress());
        assert!(!ActionPhase::Canceled.is_in_progress());
    }
}
