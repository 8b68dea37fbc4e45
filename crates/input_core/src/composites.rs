// crates/input_core/src/composites.rs
//! Composite kinds: virtual controls computed from named parts.

use glam::Vec2;
use input_shared::{ControlValue, ValueType};

use crate::error::{InputError, Result};
use crate::params::NameAndParameters;
use crate::registry::Registries;

/// Current state of one composite part, taken from the control driving it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartValue {
    pub value: ControlValue,
    pub magnitude: f32,
    /// Magnitude reached the press point.
    pub pressed: bool,
    pub press_time: Option<f64>,
}

impl Default for PartValue {
    fn default() -> Self {
        Self {
            value: ControlValue::Float(0.0),
            magnitude: 0.0,
            pressed: false,
            press_time: None,
        }
    }
}

impl PartValue {
    fn float(&self) -> f32 {
        self.value.as_float()
    }
}

/// `parts` is indexed like `part_names()`.
pub trait Composite {
    fn part_names(&self) -> &'static [&'static str];
    fn value_type(&self, parts: &[PartValue]) -> ValueType;
    fn evaluate(&self, parts: &[PartValue]) -> ControlValue;

    fn magnitude(&self, parts: &[PartValue]) -> f32 {
        self.evaluate(parts).magnitude()
    }

    /// True for shortcut-style composites that mean nothing until every
    /// part is held. Shortcut suppression keeps partial presses away from
    /// their action.
    fn needs_every_part(&self) -> bool {
        false
    }

    fn part_index(&self, name: &str) -> Option<usize> {
        self.part_names()
            .iter()
            .position(|p| p.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VectorMode {
    Analog,
    Digital,
    DigitalNormalized,
}

struct Vector2Composite {
    mode: VectorMode,
}

impl Vector2Composite {
    const UP: usize = 0;
    const DOWN: usize = 1;
    const LEFT: usize = 2;
    const RIGHT: usize = 3;

    fn parse(params: &NameAndParameters) -> Result<Self> {
        let mode = match params.get("mode") {
            None => VectorMode::DigitalNormalized,
            Some(m) if m.eq_ignore_ascii_case("analog") || m == "2" => VectorMode::Analog,
            Some(m) if m.eq_ignore_ascii_case("digital") || m == "1" => VectorMode::Digital,
            Some(m) if m.eq_ignore_ascii_case("digitalNormalized") || m == "0" => {
                VectorMode::DigitalNormalized
            }
            Some(m) => {
                return Err(InputError::InvalidParameter {
                    name: "mode".into(),
                    value: m.into(),
                })
            }
        };
        Ok(Self { mode })
    }
}

impl Composite for Vector2Composite {
    fn part_names(&self) -> &'static [&'static str] {
        &["up", "down", "left", "right"]
    }

    fn value_type(&self, _parts: &[PartValue]) -> ValueType {
        ValueType::Vector2
    }

    fn evaluate(&self, parts: &[PartValue]) -> ControlValue {
        let part = |i: usize| -> f32 {
            let p = parts.get(i).copied().unwrap_or_default();
            match self.mode {
                VectorMode::Analog => p.float().max(0.0),
                VectorMode::Digital | VectorMode::DigitalNormalized => {
                    if p.pressed {
                        1.0
                    } else {
                        0.0
                    }
                }
            }
        };
        let v = Vec2::new(part(Self::RIGHT) - part(Self::LEFT), part(Self::UP) - part(Self::DOWN));
        let v = match self.mode {
            VectorMode::DigitalNormalized => v.normalize_or_zero(),
            _ => v,
        };
        ControlValue::Vector2(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhichSideWins {
    Neither,
    Positive,
    Negative,
}

struct AxisComposite {
    min_value: f32,
    max_value: f32,
    which_side_wins: WhichSideWins,
}

impl AxisComposite {
    const NEGATIVE: usize = 0;
    const POSITIVE: usize = 1;

    fn parse(params: &NameAndParameters) -> Result<Self> {
        let which_side_wins = match params.get("whichSideWins") {
            None => WhichSideWins::Neither,
            Some(w) if w.eq_ignore_ascii_case("neither") || w == "0" => WhichSideWins::Neither,
            Some(w) if w.eq_ignore_ascii_case("positive") || w == "1" => WhichSideWins::Positive,
            Some(w) if w.eq_ignore_ascii_case("negative") || w == "2" => WhichSideWins::Negative,
            Some(w) => {
                return Err(InputError::InvalidParameter {
                    name: "whichSideWins".into(),
                    value: w.into(),
                })
            }
        };
        Ok(Self {
            min_value: params.get_f32("minValue")?.unwrap_or(-1.0),
            max_value: params.get_f32("maxValue")?.unwrap_or(1.0),
            which_side_wins,
        })
    }

    fn midpoint(&self) -> f32 {
        (self.max_value - self.min_value) / 2.0 + self.min_value
    }

    /// Signed actuation in -1..=1 before mapping into min..max.
    fn side(&self, parts: &[PartValue]) -> f32 {
        let negative = parts.get(Self::NEGATIVE).map(|p| p.magnitude).unwrap_or(0.0);
        let positive = parts.get(Self::POSITIVE).map(|p| p.magnitude).unwrap_or(0.0);
        let negative_down = negative > 0.0;
        let positive_down = positive > 0.0;

        if negative_down && positive_down {
            match self.which_side_wins {
                WhichSideWins::Neither => 0.0,
                WhichSideWins::Positive => positive,
                WhichSideWins::Negative => -negative,
            }
        } else if negative_down {
            -negative
        } else {
            positive
        }
    }
}

impl Composite for AxisComposite {
    fn part_names(&self) -> &'static [&'static str] {
        &["negative", "positive"]
    }

    fn value_type(&self, _parts: &[PartValue]) -> ValueType {
        ValueType::Float
    }

    fn evaluate(&self, parts: &[PartValue]) -> ControlValue {
        let side = self.side(parts).clamp(-1.0, 1.0);
        let midpoint = self.midpoint();
        let value = if side < 0.0 {
            midpoint - (midpoint - self.min_value) * -side
        } else {
            midpoint + (self.max_value - midpoint) * side
        };
        ControlValue::Float(value)
    }

    fn magnitude(&self, parts: &[PartValue]) -> f32 {
        self.side(parts).abs()
    }
}

/// `binding` only counts while the modifier(s) are pressed. With
/// `modifiersFirst`, a binding pressed strictly before a modifier is rejected.
struct ModifierComposite {
    modifiers: usize,
    modifiers_first: bool,
}

impl ModifierComposite {
    fn parse(modifiers: usize, params: &NameAndParameters) -> Result<Self> {
        Ok(Self {
            modifiers,
            modifiers_first: params.get_bool("modifiersFirst")?.unwrap_or(false),
        })
    }

    fn binding<'p>(&self, parts: &'p [PartValue]) -> Option<&'p PartValue> {
        parts.get(self.modifiers)
    }

    fn gate_open(&self, parts: &[PartValue]) -> bool {
        let Some(binding) = self.binding(parts) else {
            return false;
        };
        parts[..self.modifiers].iter().all(|modifier| {
            if !modifier.pressed {
                return false;
            }
            if !self.modifiers_first {
                return true;
            }
            match (binding.press_time, modifier.press_time) {
                (Some(binding_time), Some(modifier_time)) => binding_time >= modifier_time,
                _ => true,
            }
        })
    }
}

impl Composite for ModifierComposite {
    fn part_names(&self) -> &'static [&'static str] {
        if self.modifiers == 1 {
            &["modifier", "binding"]
        } else {
            &["modifier1", "modifier2", "binding"]
        }
    }

    fn value_type(&self, parts: &[PartValue]) -> ValueType {
        self.binding(parts)
            .map(|b| b.value.value_type())
            .unwrap_or(ValueType::Float)
    }

    fn evaluate(&self, parts: &[PartValue]) -> ControlValue {
        match self.binding(parts) {
            Some(binding) if self.gate_open(parts) => binding.value,
            _ => self.value_type(parts).default_value(),
        }
    }

    fn magnitude(&self, parts: &[PartValue]) -> f32 {
        match self.binding(parts) {
            Some(binding) if self.gate_open(parts) => binding.magnitude,
            _ => 0.0,
        }
    }

    fn needs_every_part(&self) -> bool {
        true
    }
}

pub fn register_builtins(registries: &mut Registries) {
    registries.register_composite("2DVector", |p| Ok(Box::new(Vector2Composite::parse(p)?)));
    registries.register_composite("Axis", |p| Ok(Box::new(AxisComposite::parse(p)?)));
    registries.register_composite("1DAxis", |p| Ok(Box::new(AxisComposite::parse(p)?)));
    registries.register_composite("OneModifier", |p| {
        Ok(Box::new(ModifierComposite::parse(1, p)?))
    });
    registries.register_composite("TwoModifiers", |p| {
        Ok(Box::new(ModifierComposite::parse(2, p)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(text: &str) -> Box<dyn Composite> {
        let mut registries = Registries::default();
        register_builtins(&mut registries);
        registries
            .create_composite(&NameAndParameters::parse(text).unwrap())
            .unwrap()
            .unwrap()
    }

    fn button(magnitude: f32, press_time: Option<f64>) -> PartValue {
        PartValue {
            value: ControlValue::Float(magnitude),
            magnitude,
            pressed: magnitude >= 0.5,
            press_time,
        }
    }

    #[test]
    fn digital_normalized_vector() {
        let composite = create("2DVector");
        let parts = [button(1.0, None), button(0.0, None), button(0.0, None), button(1.0, None)];
        match composite.evaluate(&parts) {
            ControlValue::Vector2(v) => {
                assert!((v.length() - 1.0).abs() < 1e-5);
                assert!(v.x > 0.0 && v.y > 0.0);
            }
            ControlValue::Float(_) => panic!("expected vector"),
        }
    }

    #[test]
    fn analog_vector_uses_raw_values() {
        let composite = create("2DVector(mode=analog)");
        let parts = [button(0.3, None), button(0.0, None), button(0.0, None), button(0.0, None)];
        assert_eq!(composite.evaluate(&parts), ControlValue::Vector2(Vec2::new(0.0, 0.3)));
        assert!((composite.magnitude(&parts) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn axis_sides_and_conflicts() {
        let neither = create("1DAxis");
        assert_eq!(neither.evaluate(&[button(1.0, None), button(0.0, None)]), ControlValue::Float(-1.0));
        assert_eq!(neither.evaluate(&[button(1.0, None), button(1.0, None)]), ControlValue::Float(0.0));
        assert_eq!(neither.magnitude(&[button(1.0, None), button(1.0, None)]), 0.0);

        let positive = create("Axis(whichSideWins=positive,minValue=0,maxValue=10)");
        assert_eq!(positive.evaluate(&[button(1.0, None), button(1.0, None)]), ControlValue::Float(10.0));
        assert_eq!(positive.evaluate(&[button(0.0, None), button(0.0, None)]), ControlValue::Float(5.0));
        assert_eq!(positive.magnitude(&[button(0.0, None), button(0.0, None)]), 0.0);
    }

    #[test]
    fn one_modifier_gates_binding() {
        let composite = create("OneModifier");
        assert_eq!(composite.magnitude(&[button(0.0, None), button(1.0, Some(1.0))]), 0.0);
        // Without the ordering flag, press order does not matter.
        assert_eq!(composite.magnitude(&[button(1.0, Some(2.0)), button(1.0, Some(1.0))]), 1.0);
    }

    #[test]
    fn modifiers_first_rejects_binding_pressed_earlier() {
        let composite = create("OneModifier(modifiersFirst=true)");
        assert_eq!(composite.magnitude(&[button(1.0, Some(2.0)), button(1.0, Some(1.0))]), 0.0);
        assert_eq!(composite.magnitude(&[button(1.0, Some(1.0)), button(1.0, Some(1.0))]), 1.0);
        assert_eq!(composite.magnitude(&[button(1.0, Some(1.0)), button(1.0, Some(2.0))]), 1.0);
    }

    #[test]
    fn two_modifiers_need_both() {
        let composite = create("TwoModifiers");
        assert_eq!(composite.part_names(), &["modifier1", "modifier2", "binding"]);
        let one = [button(1.0, None), button(0.0, None), button(1.0, None)];
        let both = [button(1.0, None), button(1.0, None), button(1.0, None)];
        assert_eq!(composite.magnitude(&one), 0.0);
        assert_eq!(composite.evaluate(&both), ControlValue::Float(1.0));
    }

    #[test]
    fn modifier_composite_follows_binding_value_type() {
        let composite = create("OneModifier");
        let stick = PartValue {
            value: ControlValue::Vector2(Vec2::X),
            magnitude: 1.0,
            pressed: true,
            press_time: None,
        };
        assert_eq!(composite.value_type(&[button(0.0, None), stick]), ValueType::Vector2);
        assert_eq!(
            composite.evaluate(&[button(0.0, None), stick]),
            ControlValue::Vector2(Vec2::ZERO)
        );
    }
}
