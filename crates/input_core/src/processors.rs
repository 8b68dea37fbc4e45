// crates/input_core/src/processors.rs
//! Per-binding value processors (`invert`, `scale(factor=2)`, ...).

use glam::Vec2;
use input_shared::ControlValue;

use crate::config::Settings;
use crate::error::Result;
use crate::params::NameAndParameters;
use crate::registry::Registries;

pub trait Processor {
    /// Values of a type the processor does not handle pass through unchanged.
    fn process(&self, value: ControlValue, settings: &Settings) -> ControlValue;
}

pub(crate) fn apply_all(
    processors: &[Box<dyn Processor>],
    mut value: ControlValue,
    settings: &Settings,
) -> ControlValue {
    for processor in processors {
        value = processor.process(value, settings);
    }
    value
}

struct Invert;

impl Processor for Invert {
    fn process(&self, value: ControlValue, _settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Float(v) => ControlValue::Float(-v),
            ControlValue::Vector2(v) => ControlValue::Vector2(-v),
        }
    }
}

struct Scale {
    factor: f32,
}

impl Processor for Scale {
    fn process(&self, value: ControlValue, _settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Float(v) => ControlValue::Float(v * self.factor),
            ControlValue::Vector2(v) => ControlValue::Vector2(v * self.factor),
        }
    }
}

struct Clamp {
    min: f32,
    max: f32,
}

impl Processor for Clamp {
    fn process(&self, value: ControlValue, _settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Float(v) => ControlValue::Float(v.clamp(self.min, self.max)),
            other => other,
        }
    }
}

/// Zero min/max fall back to the configured default deadzone.
#[derive(Clone, Copy)]
struct Deadzone {
    min: f32,
    max: f32,
}

impl Deadzone {
    fn parse(params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            min: params.get_f32("min")?.unwrap_or(0.0),
            max: params.get_f32("max")?.unwrap_or(0.0),
        })
    }

    fn bounds(&self, settings: &Settings) -> (f32, f32) {
        let min = if self.min != 0.0 { self.min } else { settings.default_deadzone_min };
        let max = if self.max != 0.0 { self.max } else { settings.default_deadzone_max };
        (min, max)
    }

    fn rescale(&self, magnitude: f32, settings: &Settings) -> f32 {
        let (min, max) = self.bounds(settings);
        if magnitude < min {
            0.0
        } else if magnitude > max || max <= min {
            1.0
        } else {
            (magnitude - min) / (max - min)
        }
    }
}

struct AxisDeadzone(Deadzone);

impl Processor for AxisDeadzone {
    fn process(&self, value: ControlValue, settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Float(v) => {
                let scaled = self.0.rescale(v.abs(), settings);
                ControlValue::Float(if scaled == 0.0 { 0.0 } else { scaled.copysign(v) })
            }
            other => other,
        }
    }
}

struct StickDeadzone(Deadzone);

impl Processor for StickDeadzone {
    fn process(&self, value: ControlValue, settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Vector2(v) => {
                let scaled = self.0.rescale(v.length(), settings);
                if scaled == 0.0 {
                    ControlValue::Vector2(Vec2::ZERO)
                } else {
                    ControlValue::Vector2(v.normalize_or_zero() * scaled)
                }
            }
            other => other,
        }
    }
}

struct Normalize {
    min: f32,
    max: f32,
}

impl Processor for Normalize {
    fn process(&self, value: ControlValue, _settings: &Settings) -> ControlValue {
        match value {
            ControlValue::Float(v) if self.max > self.min => {
                ControlValue::Float((v - self.min) / (self.max - self.min))
            }
            other => other,
        }
    }
}

pub fn register_builtins(registries: &mut Registries) {
    registries.register_processor("invert", |_| Ok(Box::new(Invert)));
    registries.register_processor("scale", |p| {
        Ok(Box::new(Scale {
            factor: p.get_f32("factor")?.unwrap_or(1.0),
        }))
    });
    registries.register_processor("clamp", |p| {
        Ok(Box::new(Clamp {
            min: p.get_f32("min")?.unwrap_or(0.0),
            max: p.get_f32("max")?.unwrap_or(1.0),
        }))
    });
    registries.register_processor("axisDeadzone", |p| {
        Ok(Box::new(AxisDeadzone(Deadzone::parse(p)?)))
    });
    registries.register_processor("stickDeadzone", |p| {
        Ok(Box::new(StickDeadzone(Deadzone::parse(p)?)))
    });
    registries.register_processor("normalize", |p| {
        Ok(Box::new(Normalize {
            min: p.get_f32("min")?.unwrap_or(0.0),
            max: p.get_f32("max")?.unwrap_or(1.0),
        }))
    });
}
