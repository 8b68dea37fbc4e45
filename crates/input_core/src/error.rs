// crates/input_core/src/error.rs
use input_shared::ValueType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Structural edits are rejected while the affected action is enabled.
    #[error("cannot modify action '{action}' while it is enabled")]
    ActionEnabled { action: String },

    #[error("cannot modify action map '{map}' while any of its actions is enabled")]
    MapEnabled { map: String },

    #[error("no such action: {0}")]
    UnknownAction(String),

    #[error("no such action map: {0}")]
    UnknownMap(String),

    #[error("no such asset")]
    UnknownAsset,

    #[error("no such device")]
    UnknownDevice,

    #[error("action '{action}' has no binding at index {index}")]
    UnknownBinding { action: String, index: usize },

    #[error(
        "cannot read value of type '{expected}' from action '{action}': control '{control}' produces '{actual}'"
    )]
    ValueTypeMismatch {
        action: String,
        control: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error(
        "buffer of {provided} bytes is too small for the value of action '{action}' ({required} bytes required)"
    )]
    BufferTooSmall {
        action: String,
        required: usize,
        provided: usize,
    },

    #[error("invalid binding path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid parameter '{name}={value}'")]
    InvalidParameter { name: String, value: String },

    #[error("invalid settings: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, InputError>;

impl InputError {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
