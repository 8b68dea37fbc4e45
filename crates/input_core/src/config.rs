// crates/input_core/src/config.rs

use serde::Deserialize;

use crate::error::{InputError, Result};
use crate::registry::Registries;

/// Read-only tuning values threaded through resolution, arbitration, the
/// default policies and interaction contexts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    pub default_button_press_point: f32,
    /// Fraction of the press point below which a pressed button counts as released.
    pub button_release_threshold: f32,
    pub default_deadzone_min: f32,
    pub default_deadzone_max: f32,
    pub shortcut_keys_consume_input: bool,
    pub default_tap_time: f32,
    pub default_slow_tap_time: f32,
    pub default_hold_time: f32,
    pub multi_tap_delay_time: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_button_press_point: 0.5,
            button_release_threshold: 0.75,
            default_deadzone_min: 0.125,
            default_deadzone_max: 0.925,
            shortcut_keys_consume_input: false,
            default_tap_time: 0.2,
            default_slow_tap_time: 0.5,
            default_hold_time: 0.4,
            multi_tap_delay_time: 0.75,
        }
    }
}

/// Smallest press point accepted; a zero press point would make every
/// actuation a press.
const MIN_PRESS_POINT: f32 = 0.0001;

impl Settings {
    /// Parse settings overrides from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| InputError::Config(e.to_string()))?;
        settings.validated()
    }

    fn validated(mut self) -> Result<Self> {
        if !(0.0..=1.0).contains(&self.button_release_threshold) {
            return Err(InputError::Config(format!(
                "button_release_threshold must be within 0..=1, got {}",
                self.button_release_threshold
            )));
        }
        if self.default_deadzone_min > self.default_deadzone_max {
            return Err(InputError::Config(format!(
                "default_deadzone_min ({}) exceeds default_deadzone_max ({})",
                self.default_deadzone_min, self.default_deadzone_max
            )));
        }
        self.default_button_press_point = self.default_button_press_point.max(MIN_PRESS_POINT);
        Ok(self)
    }

    pub fn press_point_or_default(&self, press_point: Option<f32>) -> f32 {
        match press_point {
            Some(p) if p > 0.0 => p,
            _ => self.default_button_press_point,
        }
    }

    pub fn release_point(&self, press_point: f32) -> f32 {
        press_point * self.button_release_threshold
    }
}

/// Centralized registration of the built-in composite, interaction and
/// processor kinds.
pub struct InputDefaults;

impl InputDefaults {
    /// Registries holding every built-in kind. Custom kinds can be added on
    /// top through `Registries::register_*`.
    pub fn registries() -> Registries {
        let mut registries = Registries::default();
        crate::composites::register_builtins(&mut registries);
        crate::interactions::register_builtins(&mut registries);
        crate::processors::register_builtins(&mut registries);
        registries
    }
}
