// crates/input_core/src/lib.rs
//! Action input runtime: binds abstract actions to device controls and turns
//! control changes into started/performed/canceled phases.

// Definitions
pub mod config;
pub mod devices;
pub mod error;
pub mod map;
pub mod params;
pub mod path;
pub mod registry;

// Pluggable kinds
pub mod composites;
pub mod interactions;
pub mod processors;

// Runtime
mod callbacks;
mod dispatch;
mod notify;
mod phase;
mod poller;
mod read;
mod resolver;
mod slot;
mod system;
mod timeout;

pub use callbacks::{ActionCallback, CallbackId, CallbackKind, Command, Commands};
pub use composites::{Composite, PartValue};
pub use config::{InputDefaults, Settings};
pub use devices::{ControlDesc, ControlGraph, ControlId, DeviceDesc, DeviceId, DeviceSet};
pub use error::{InputError, Result};
pub use interactions::{Interaction, InteractionContext};
pub use map::{Action, ActionId, ActionMap, AssetId, Binding, BindingKind, BindingMask, MapId};
pub use notify::{ActionEvent, Listener, ListenerId, Notification, ResolveScope};
pub use params::NameAndParameters;
pub use path::ControlPath;
pub use poller::{key_control_name, EventSender, InputPoller, RawEvent};
pub use processors::Processor;
pub use registry::Registries;
pub use resolver::ResolutionIssue;
pub use system::InputSystem;

pub use input_shared::{ActionPhase, ActionType, ActionValue, ControlValue, UpdateKind, ValueType};
