// crates/input_core/src/read.rs
//! Read-side queries on `InputSystem`: values, frame flags, bound controls.

use input_shared::{ActionPhase, ActionValue, ControlValue, ValueType};

use crate::composites::Composite;
use crate::devices::{ControlGraph, ControlId};
use crate::error::{InputError, Result};
use crate::map::{ActionId, MapId};
use crate::slot::{ActionSlot, ResolvedKind};
use crate::system::InputSystem;

impl InputSystem {
    /// Current value of the action as `T`. An action nothing drives reads
    /// as `T::default()`.
    pub fn read_value<T: ActionValue>(&self, id: ActionId) -> Result<T> {
        let slot = self.slot(id)?;
        let Some((control, value)) = self.driving_value(slot) else {
            return Ok(T::default());
        };
        T::from_value(value).ok_or_else(|| InputError::ValueTypeMismatch {
            action: slot.qualified_name(),
            control: self.devices.control_path(control),
            expected: T::VALUE_TYPE,
            actual: value.value_type(),
        })
    }

    /// Current value without a static type; the default value of the bound
    /// controls while idle.
    pub fn read_control_value(&self, id: ActionId) -> Result<ControlValue> {
        let slot = self.slot(id)?;
        Ok(match self.driving_value(slot) {
            Some((_, value)) => value,
            None => slot.default_value(&self.devices),
        })
    }

    /// Writes the current value into `buffer` and reports its type and
    /// byte size.
    pub fn read_value_into(&self, id: ActionId, buffer: &mut [u8]) -> Result<(ValueType, usize)> {
        let value = self.read_control_value(id)?;
        let value_type = value.value_type();
        match value.write_bytes(buffer) {
            Some(written) => Ok((value_type, written)),
            None => Err(InputError::BufferTooSmall {
                action: self.slot(id)?.qualified_name(),
                required: value_type.size_in_bytes(),
                provided: buffer.len(),
            }),
        }
    }

    fn driving_value(&self, slot: &ActionSlot) -> Option<(ControlId, ControlValue)> {
        if !slot.state.phase.is_in_progress() {
            return None;
        }
        let source = slot.state.source?;
        let value = slot.source_value(source, &self.devices, self.settings())?;
        Some((source.control, value))
    }

    pub fn phase(&self, id: ActionId) -> Result<ActionPhase> {
        Ok(self.slot(id)?.state.phase)
    }

    pub fn is_enabled(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.enabled)
    }

    /// True if every action of the map is enabled.
    pub fn is_map_enabled(&self, map: MapId) -> Result<bool> {
        let entry = self
            .maps
            .get(map.0)
            .ok_or_else(|| InputError::UnknownMap(format!("{map:?}")))?;
        Ok(!entry.actions.is_empty() && entry.actions.iter().all(|slot| slot.enabled))
    }

    /// Button-style pressed state with release hysteresis.
    pub fn is_pressed(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.state.is_pressed)
    }

    pub fn was_pressed_this_frame(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.state.pressed_in_update == Some(self.update_count))
    }

    pub fn was_released_this_frame(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.state.released_in_update == Some(self.update_count))
    }

    pub fn was_performed_this_frame(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.state.performed_in_update == Some(self.update_count))
    }

    /// Released this frame after having performed.
    pub fn was_completed_this_frame(&self, id: ActionId) -> Result<bool> {
        Ok(self.slot(id)?.state.completed_in_update == Some(self.update_count))
    }

    /// The control currently driving the action, if it is in progress.
    pub fn active_control(&self, id: ActionId) -> Result<Option<ControlId>> {
        let state = &self.slot(id)?.state;
        Ok(state
            .phase
            .is_in_progress()
            .then_some(state.source)
            .flatten()
            .map(|s| s.control))
    }

    /// Every control the action is bound to, in binding order.
    pub fn bound_controls(&self, id: ActionId) -> Result<&[ControlId]> {
        Ok(&self.slot(id)?.controls)
    }

    /// Controls resolved for one binding. Composite headers list the
    /// controls of all their parts.
    pub fn binding_controls(&self, id: ActionId, binding: usize) -> Result<&[ControlId]> {
        let slot = self.slot(id)?;
        slot.bindings
            .get(binding)
            .map(|b| b.controls.as_slice())
            .ok_or_else(|| InputError::UnknownBinding {
                action: slot.qualified_name(),
                index: binding,
            })
    }

    /// Controls bound to the part `part` of the composite at `binding`.
    pub fn composite_part_controls(&self, id: ActionId, binding: usize, part: &str) -> Result<Vec<ControlId>> {
        let slot = self.slot(id)?;
        let unknown = || InputError::UnknownBinding {
            action: slot.qualified_name(),
            index: binding,
        };
        let Some(ResolvedKind::Composite(Some(index))) = slot.bindings.get(binding).map(|b| b.kind) else {
            return Err(unknown());
        };
        let composite = slot.composites.get(index).ok_or_else(unknown)?;
        let part_index = composite
            .kind
            .part_index(part)
            .ok_or_else(|| InputError::InvalidParameter {
                name: "part".to_string(),
                value: part.to_string(),
            })?;
        Ok(composite.parts[part_index]
            .controls
            .iter()
            .map(|(control, _)| *control)
            .collect())
    }

    /// Progress of the running interaction's timeout in `[0, 1]`. Performed
    /// actions report 1; multi-stage timeouts report against their total.
    pub fn timeout_completion_percentage(&self, id: ActionId) -> Result<f32> {
        let slot = self.slot(id)?;
        match slot.state.phase {
            ActionPhase::Performed => return Ok(1.0),
            ActionPhase::Started => {}
            _ => return Ok(0.0),
        }
        let Some(interaction) = slot.state.interaction.and_then(|i| slot.interactions.get(i)) else {
            return Ok(0.0);
        };
        let (elapsed, duration) = match interaction.timer {
            Some((_, timer)) => {
                let elapsed = ((self.time - timer.start) as f32).max(0.0).min(timer.duration);
                (elapsed, timer.duration)
            }
            None => (0.0, 0.0),
        };
        let completion = if interaction.total_timeout > 0.0 {
            (interaction.timeout_done + elapsed) / interaction.total_timeout
        } else if duration > 0.0 {
            elapsed / duration
        } else {
            0.0
        };
        Ok(completion.clamp(0.0, 1.0))
    }
}
