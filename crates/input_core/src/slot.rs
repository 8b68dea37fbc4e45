// crates/input_core/src/slot.rs
//! Resolved runtime of one action: bound controls per binding, composite
//! part drivers, interaction instances and the phase state.

use std::ops::Range;
use std::rc::Rc;

use input_shared::{ActionPhase, ActionType, ControlValue, ValueType};

use crate::composites::{Composite, PartValue};
use crate::config::Settings;
use crate::devices::{ControlGraph, ControlId, DeviceId};
use crate::interactions::{Interaction, TimerInfo};
use crate::phase::{ActionState, Source};
use crate::processors::{apply_all, Processor};
use crate::timeout::TimeoutKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedKind {
    Plain,
    /// Index into `ActionSlot::composites`; `None` if the kind is unknown.
    Composite(Option<usize>),
    Part { composite: usize, part: usize },
    Unresolved,
}

pub(crate) struct ResolvedBinding {
    pub kind: ResolvedKind,
    pub controls: Vec<ControlId>,
    pub processors: Vec<Box<dyn Processor>>,
    /// Interaction slots owned by this binding.
    pub interactions: Range<usize>,
    /// Number of controls that must be actuated together: parts for a
    /// composite, 1 otherwise.
    pub complexity: usize,
}

impl ResolvedBinding {
    pub fn unresolved(interaction_start: usize) -> Self {
        Self {
            kind: ResolvedKind::Unresolved,
            controls: Vec::new(),
            processors: Vec::new(),
            interactions: interaction_start..interaction_start,
            complexity: 1,
        }
    }
}

#[derive(Default)]
pub(crate) struct PartSlot {
    /// Bound controls with the part binding each came from.
    pub controls: Vec<(ControlId, usize)>,
    /// Index into `controls` of the control driving the part.
    pub driver: Option<usize>,
}

impl PartSlot {
    pub fn driver_control(&self) -> Option<ControlId> {
        self.driver
            .and_then(|d| self.controls.get(d))
            .map(|(control, _)| *control)
    }
}

pub(crate) struct CompositeSlot {
    pub kind: Box<dyn Composite>,
    pub header: usize,
    pub parts: Vec<PartSlot>,
    values: Vec<PartValue>,
    pub value: ControlValue,
    pub magnitude: f32,
}

impl CompositeSlot {
    pub fn new(kind: Box<dyn Composite>, header: usize) -> Self {
        let count = kind.part_names().len();
        Self {
            parts: (0..count).map(|_| PartSlot::default()).collect(),
            values: vec![PartValue::default(); count],
            value: kind.evaluate(&vec![PartValue::default(); count]),
            magnitude: 0.0,
            kind,
            header,
        }
    }

    pub fn all_parts_actuated(&self) -> bool {
        self.parts.iter().all(|p| p.driver.is_some())
    }
}

pub(crate) struct InteractionSlot {
    pub name: Rc<str>,
    pub binding: usize,
    pub interaction: Box<dyn Interaction>,
    pub phase: ActionPhase,
    pub start_time: f64,
    /// Last source that fed this interaction; timeouts re-read it.
    pub trigger: Option<Source>,
    pub timer: Option<(TimeoutKey, TimerInfo)>,
    pub total_timeout: f32,
    /// Seconds of earlier timeout stages already completed.
    pub timeout_done: f32,
}

impl InteractionSlot {
    pub fn new(name: &str, binding: usize, interaction: Box<dyn Interaction>) -> Self {
        Self {
            name: Rc::from(name),
            binding,
            interaction,
            phase: ActionPhase::Waiting,
            start_time: 0.0,
            trigger: None,
            timer: None,
            total_timeout: 0.0,
            timeout_done: 0.0,
        }
    }
}

/// A processed control change, attributed to its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Trigger {
    pub source: Source,
    pub value: ControlValue,
    pub magnitude: f32,
    pub time: f64,
}

pub(crate) struct ActionSlot {
    pub name: String,
    pub map_name: String,
    pub action_type: ActionType,
    pub press_point: f32,
    pub expected_value_type: Option<ValueType>,
    pub initial_state_check: bool,
    pub fingerprint: u64,
    pub enabled: bool,
    /// Checked on the next update after enabling.
    pub initial_check_pending: bool,
    /// Deduplicated, in binding order.
    pub controls: Vec<ControlId>,
    pub bindings: Vec<ResolvedBinding>,
    pub composites: Vec<CompositeSlot>,
    pub interactions: Vec<InteractionSlot>,
    pub state: ActionState,
}

impl ActionSlot {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.map_name, self.name)
    }

    fn plain_value(
        &self,
        binding: usize,
        control: ControlId,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> Option<ControlValue> {
        let raw = graph.value(control)?;
        let processors = self.bindings.get(binding).map(|b| b.processors.as_slice())?;
        Some(apply_all(processors, raw, settings))
    }

    fn part_value(
        &self,
        composite: usize,
        part: usize,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> PartValue {
        let slot = &self.composites[composite].parts[part];
        let pick = slot.driver.or(if slot.controls.is_empty() { None } else { Some(0) });
        let Some((control, binding)) = pick.and_then(|d| slot.controls.get(d)).copied() else {
            return PartValue::default();
        };
        let Some(value) = self.plain_value(binding, control, graph, settings) else {
            return PartValue::default();
        };
        let magnitude = if slot.driver.is_some() { value.magnitude() } else { 0.0 };
        PartValue {
            value,
            magnitude,
            pressed: magnitude >= settings.default_button_press_point,
            press_time: graph.press_time(control),
        }
    }

    fn part_control_magnitude(
        &self,
        composite: usize,
        part: usize,
        index: usize,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> f32 {
        let Some((control, binding)) = self.composites[composite].parts[part].controls.get(index) else {
            return 0.0;
        };
        self.plain_value(*binding, *control, graph, settings)
            .map(|v| v.magnitude())
            .unwrap_or(0.0)
    }

    /// Re-pick the part's driving control after `control` changed: the
    /// driver keeps the part unless another control is at least as strong;
    /// a weakening driver hands over to a stronger control.
    fn refresh_part(
        &mut self,
        composite: usize,
        part: usize,
        control: ControlId,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) {
        let slot = &self.composites[composite].parts[part];
        let Some(changed) = slot.controls.iter().position(|(c, _)| *c == control) else {
            return;
        };
        let magnitude = |i: usize| self.part_control_magnitude(composite, part, i, graph, settings);
        let changed_magnitude = magnitude(changed);

        let driver = match slot.driver {
            None if changed_magnitude > 0.0 => Some(changed),
            None => None,
            Some(current) if current == changed => {
                let stronger = (0..slot.controls.len())
                    .filter(|i| *i != changed)
                    .map(|i| (i, magnitude(i)))
                    .filter(|(_, m)| *m > changed_magnitude)
                    .fold(None, |best: Option<(usize, f32)>, (i, m)| match best {
                        Some((_, bm)) if bm >= m => best,
                        _ => Some((i, m)),
                    });
                match stronger {
                    Some((i, _)) => Some(i),
                    None if changed_magnitude > 0.0 => Some(changed),
                    None => None,
                }
            }
            Some(current) => {
                if changed_magnitude > 0.0 && changed_magnitude >= magnitude(current) {
                    Some(changed)
                } else {
                    Some(current)
                }
            }
        };
        self.composites[composite].parts[part].driver = driver;
    }

    /// Recompute the cached value and magnitude of a composite.
    pub fn evaluate_composite(&mut self, composite: usize, graph: &dyn ControlGraph, settings: &Settings) {
        let count = self.composites[composite].parts.len();
        let mut values = std::mem::take(&mut self.composites[composite].values);
        values.clear();
        for part in 0..count {
            values.push(self.part_value(composite, part, graph, settings));
        }
        let header = self.composites[composite].header;
        let slot = &mut self.composites[composite];
        let raw = slot.kind.evaluate(&values);
        slot.magnitude = slot.kind.magnitude(&values);
        slot.values = values;
        slot.value = match self.bindings.get(header) {
            Some(binding) => apply_all(&binding.processors, raw, settings),
            None => raw,
        };
    }

    /// Pick drivers from scratch for every part and re-evaluate. Used after
    /// resolution, enabling and device resets, when values changed without
    /// passing through the monitors.
    pub fn refresh_composites(&mut self, graph: &dyn ControlGraph, settings: &Settings) {
        for composite in 0..self.composites.len() {
            for part in 0..self.composites[composite].parts.len() {
                let count = self.composites[composite].parts[part].controls.len();
                let mut best: Option<(usize, f32)> = None;
                for i in 0..count {
                    let m = self.part_control_magnitude(composite, part, i, graph, settings);
                    if m > 0.0 && best.map_or(true, |(_, bm)| m > bm) {
                        best = Some((i, m));
                    }
                }
                self.composites[composite].parts[part].driver = best.map(|(i, _)| i);
            }
            self.evaluate_composite(composite, graph, settings);
        }
    }

    /// Re-reads the composite part that `control` feeds through `binding`
    /// without producing a trigger. Plain bindings are left alone.
    pub fn refresh_part_for(
        &mut self,
        binding: usize,
        control: ControlId,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) {
        if let Some(ResolvedKind::Part { composite, part }) = self.bindings.get(binding).map(|b| b.kind) {
            self.refresh_part(composite, part, control, graph, settings);
            self.evaluate_composite(composite, graph, settings);
        }
    }

    /// Whether `binding` is part of a shortcut composite that still misses
    /// some of its parts.
    pub fn shortcut_incomplete(&self, binding: usize) -> bool {
        match self.bindings.get(binding).map(|b| b.kind) {
            Some(ResolvedKind::Part { composite, .. }) => {
                let slot = &self.composites[composite];
                slot.kind.needs_every_part() && !slot.all_parts_actuated()
            }
            _ => false,
        }
    }

    /// Turn a change of `control` on `binding` into a trigger. Part changes
    /// update the part driver and yield the composite as source.
    pub fn trigger_for(
        &mut self,
        binding: usize,
        control: ControlId,
        time: f64,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> Option<Trigger> {
        match self.bindings.get(binding)?.kind {
            ResolvedKind::Plain => {
                let value = self.plain_value(binding, control, graph, settings)?;
                Some(Trigger {
                    source: Source {
                        binding,
                        control,
                        composite: false,
                    },
                    value,
                    magnitude: value.magnitude(),
                    time,
                })
            }
            ResolvedKind::Part { composite, .. } => {
                self.refresh_part_for(binding, control, graph, settings);
                let slot = &self.composites[composite];
                Some(Trigger {
                    source: Source {
                        binding: slot.header,
                        control,
                        composite: true,
                    },
                    value: slot.value,
                    magnitude: slot.magnitude,
                    time,
                })
            }
            ResolvedKind::Composite(_) | ResolvedKind::Unresolved => None,
        }
    }

    /// Current value of `source` as a trigger at `time`.
    pub fn current_trigger(
        &self,
        source: Source,
        time: f64,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> Option<Trigger> {
        let value = self.source_value(source, graph, settings)?;
        let magnitude = if source.composite {
            self.composite_of(source.binding).map(|c| c.magnitude)?
        } else {
            value.magnitude()
        };
        Some(Trigger {
            source,
            value,
            magnitude,
            time,
        })
    }

    pub fn source_value(
        &self,
        source: Source,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> Option<ControlValue> {
        if source.composite {
            self.composite_of(source.binding).map(|c| c.value)
        } else {
            self.plain_value(source.binding, source.control, graph, settings)
        }
    }

    fn composite_of(&self, header: usize) -> Option<&CompositeSlot> {
        match self.bindings.get(header)?.kind {
            ResolvedKind::Composite(Some(index)) => self.composites.get(index),
            _ => None,
        }
    }

    /// The strongest source other than `exclude` whose magnitude exceeds
    /// `above`. Ties keep the earlier binding.
    pub fn strongest(
        &self,
        exclude: Option<&Source>,
        above: f32,
        time: f64,
        graph: &dyn ControlGraph,
        settings: &Settings,
    ) -> Option<Trigger> {
        let mut best: Option<Trigger> = None;
        let mut consider = |trigger: Trigger| {
            if exclude.is_some_and(|e| e.same_as(&trigger.source)) || trigger.magnitude <= above {
                return;
            }
            if best.map_or(true, |b| trigger.magnitude > b.magnitude) {
                best = Some(trigger);
            }
        };

        for (index, binding) in self.bindings.iter().enumerate() {
            match binding.kind {
                ResolvedKind::Plain => {
                    for &control in &binding.controls {
                        let source = Source {
                            binding: index,
                            control,
                            composite: false,
                        };
                        if let Some(t) = self.current_trigger(source, time, graph, settings) {
                            consider(t);
                        }
                    }
                }
                ResolvedKind::Composite(Some(composite)) => {
                    let slot = &self.composites[composite];
                    let control = slot
                        .parts
                        .iter()
                        .find_map(|p| p.driver_control())
                        .or_else(|| slot.parts.iter().find_map(|p| p.controls.first().map(|c| c.0)));
                    if let Some(control) = control {
                        consider(Trigger {
                            source: Source {
                                binding: index,
                                control,
                                composite: true,
                            },
                            value: slot.value,
                            magnitude: slot.magnitude,
                            time,
                        });
                    }
                }
                _ => {}
            }
        }
        best
    }

    /// Controls whose actuation drives `source`.
    pub fn source_on_device(&self, source: &Source, device: DeviceId) -> bool {
        if !source.composite {
            return source.control.device == device;
        }
        self.composite_of(source.binding).is_some_and(|c| {
            c.parts
                .iter()
                .any(|p| p.controls.iter().any(|(control, _)| control.device == device))
        })
    }

    /// Controls taking part in `binding` for shortcut arbitration: the part
    /// drivers of its composite, or nothing extra for plain bindings.
    pub fn participating_controls(&self, binding: usize, out: &mut Vec<ControlId>) {
        if let Some(ResolvedKind::Part { composite, .. }) = self.bindings.get(binding).map(|b| b.kind) {
            out.extend(self.composites[composite].parts.iter().filter_map(|p| p.driver_control()));
        }
    }

    /// Default value reported when nothing drives the action.
    pub fn default_value(&self, graph: &dyn ControlGraph) -> ControlValue {
        if let Some(value_type) = self.expected_value_type {
            return value_type.default_value();
        }
        if let Some(source) = self.state.source {
            if source.composite {
                if let Some(c) = self.composite_of(source.binding) {
                    return c.kind.value_type(&c.values).default_value();
                }
            } else if let Some(value) = graph.default_value(source.control) {
                return value;
            }
        }
        self.controls
            .first()
            .and_then(|c| graph.default_value(*c))
            .unwrap_or_default()
    }

    pub fn binding_interactions(&self, interaction: usize) -> Range<usize> {
        self.interactions
            .get(interaction)
            .and_then(|i| self.bindings.get(i.binding))
            .map(|b| b.interactions.clone())
            .unwrap_or(0..0)
    }
}
