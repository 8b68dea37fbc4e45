// crates/input_core/src/system.rs
//! `InputSystem`: owns devices, action maps, resolved state, callbacks and
//! the timeout list, and runs the single-threaded update loop.

use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver};
use input_arena::Arena;
use input_shared::UpdateKind;
use tracing::{debug, info, warn};

use crate::callbacks::{ActionCallback, CallbackId, CallbackKind, CallbackTable, CallbackTarget, Command, Commands};
use crate::config::{InputDefaults, Settings};
use crate::devices::{ControlId, DeviceDesc, DeviceId, DeviceSet};
use crate::dispatch::Dispatcher;
use crate::error::{InputError, Result};
use crate::map::{Action, ActionId, ActionMap, AssetId, Binding, BindingMask, MapId};
use crate::notify::{ActionEvent, ListenerId, Notification, NotificationBus, ResolveScope};
use crate::poller::{EventSender, RawEvent};
use crate::registry::Registries;
use crate::resolver::{add_monitors, carry_over, resolve_action, Monitor, ResolutionIssue, ResolveContext};
use crate::slot::{ActionSlot, ResolvedKind};
use crate::timeout::TimeoutScheduler;

/// Rounds of callback-issued commands applied after one event before the
/// rest is dropped.
const MAX_COMMAND_ROUNDS: usize = 64;
/// Timeouts fired at one point in time before the rest waits for the next
/// update.
const MAX_TIMEOUTS_PER_STEP: usize = 1024;

struct AssetEntry {
    name: String,
    maps: Vec<MapId>,
    binding_mask: Option<BindingMask>,
}

pub(crate) struct MapEntry {
    pub map: ActionMap,
    pub asset: Option<AssetId>,
    pub actions: Vec<ActionSlot>,
    pub issues: Vec<ResolutionIssue>,
}

pub struct InputSystem {
    settings: Settings,
    registries: Registries,
    pub(crate) devices: DeviceSet,
    assets: Arena<AssetEntry>,
    pub(crate) maps: Arena<MapEntry>,
    map_order: Vec<MapId>,
    monitors: HashMap<ControlId, Vec<Monitor>>,
    timeouts: TimeoutScheduler,
    callbacks: CallbackTable,
    bus: NotificationBus,
    commands: Commands,
    queue: Vec<RawEvent>,
    sender: EventSender,
    receiver: Receiver<RawEvent>,
    dirty: Vec<ResolveScope>,
    pub(crate) update_count: u64,
    update_kind: UpdateKind,
    pub(crate) time: f64,
    /// Set while deferred commands are being applied.
    deferring: bool,
    scratch_monitors: Vec<Monitor>,
    scratch_controls: Vec<ControlId>,
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn unknown_action(id: ActionId) -> InputError {
    InputError::UnknownAction(format!("#{} in {:?}", id.index, id.map))
}

fn unknown_map(id: MapId) -> InputError {
    InputError::UnknownMap(format!("{id:?}"))
}

fn slot_mut(maps: &mut Arena<MapEntry>, id: ActionId) -> Option<&mut ActionSlot> {
    maps.get_mut(id.map.0)?.actions.get_mut(id.index as usize)
}

impl InputSystem {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::with_registries(settings, InputDefaults::registries())
    }

    pub fn with_registries(settings: Settings, registries: Registries) -> Self {
        let (tx, receiver) = unbounded();
        Self {
            settings,
            registries,
            devices: DeviceSet::new(),
            assets: Arena::new(),
            maps: Arena::new(),
            map_order: Vec::new(),
            monitors: HashMap::new(),
            timeouts: TimeoutScheduler::default(),
            callbacks: CallbackTable::default(),
            bus: NotificationBus::default(),
            commands: Commands::default(),
            queue: Vec::new(),
            sender: EventSender::new(tx),
            receiver,
            dirty: Vec::new(),
            update_count: 0,
            update_kind: UpdateKind::Player,
            time: 0.0,
            deferring: false,
            scratch_monitors: Vec::new(),
            scratch_controls: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Kinds registered here are picked up by the next resolution.
    pub fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }

    pub fn devices(&self) -> &DeviceSet {
        &self.devices
    }

    /// Number of `update` calls so far; frame queries compare against it.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    fn split(&mut self) -> (Dispatcher<'_>, &mut Arena<MapEntry>, &[MapId]) {
        let dispatcher = Dispatcher {
            settings: &self.settings,
            devices: &self.devices,
            timeouts: &mut self.timeouts,
            callbacks: &mut self.callbacks,
            bus: &mut self.bus,
            commands: &mut self.commands,
            update: self.update_count,
            update_kind: self.update_kind,
        };
        (dispatcher, &mut self.maps, &self.map_order)
    }

    pub(crate) fn slot(&self, id: ActionId) -> Result<&ActionSlot> {
        self.maps
            .get(id.map.0)
            .and_then(|entry| entry.actions.get(id.index as usize))
            .ok_or_else(|| unknown_action(id))
    }

    // ---- devices -------------------------------------------------------

    pub fn add_device(&mut self, desc: DeviceDesc) -> DeviceId {
        info!(device = %desc.name, layout = %desc.layout, "device added");
        let id = self.devices.add(desc);
        self.mark_all_dirty();
        self.flush();
        id
    }

    pub fn remove_device(&mut self, device: DeviceId) -> Result<()> {
        let desc = self.devices.remove(device).ok_or(InputError::UnknownDevice)?;
        info!(device = %desc.name, "device removed");
        self.mark_all_dirty();
        self.flush();
        Ok(())
    }

    /// Puts every control of `device` back to its default. Actions the
    /// device was driving cancel.
    pub fn reset_device(&mut self, device: DeviceId) -> Result<()> {
        self.reset_device_at(device, self.time)
    }

    fn reset_device_at(&mut self, device: DeviceId, time: f64) -> Result<()> {
        if !self.devices.reset_device(device) {
            return Err(InputError::UnknownDevice);
        }
        debug!(?device, "device reset");
        let (mut dispatcher, maps, order) = self.split();
        for &map in order {
            let Some(entry) = maps.get_mut(map.0) else {
                continue;
            };
            for (index, slot) in entry.actions.iter_mut().enumerate() {
                let id = ActionId {
                    map,
                    index: index as u32,
                };
                dispatcher.device_reset(slot, id, device, time);
            }
        }
        self.flush();
        Ok(())
    }

    /// Remaps a control's display name, as a keyboard layout change would.
    /// Bindings matching by display name re-resolve.
    pub fn set_control_display_name(&mut self, control: ControlId, display_name: &str) -> Result<()> {
        self.devices.set_display_name(control, display_name)?;
        let affected: Vec<MapId> = self
            .map_order
            .iter()
            .copied()
            .filter(|map| {
                self.maps.get(map.0).is_some_and(|entry| {
                    entry.map.actions.iter().any(|a| {
                        a.bindings
                            .iter()
                            .any(|b| b.effective_path().contains("#("))
                    })
                })
            })
            .collect();
        for map in affected {
            self.mark_map_dirty(map);
        }
        self.flush();
        Ok(())
    }

    // ---- structure -----------------------------------------------------

    /// An asset groups maps that resolve together and share a binding mask.
    pub fn create_asset(&mut self, name: &str) -> AssetId {
        AssetId(self.assets.insert(AssetEntry {
            name: name.to_string(),
            maps: Vec::new(),
            binding_mask: None,
        }))
    }

    pub fn add_map(&mut self, map: ActionMap, asset: Option<AssetId>) -> Result<MapId> {
        if let Some(asset) = asset {
            let entry = self.assets.get(asset.0).ok_or(InputError::UnknownAsset)?;
            for &other in &entry.maps {
                self.ensure_map_disabled(other)?;
            }
        }
        debug!(map = %map.name, actions = map.actions.len(), "adding action map");
        let id = MapId(self.maps.insert(MapEntry {
            map,
            asset,
            actions: Vec::new(),
            issues: Vec::new(),
        }));
        if let Some(entry) = asset.and_then(|a| self.assets.get_mut(a.0)) {
            entry.maps.push(id);
        }
        self.map_order.push(id);
        self.mark_map_dirty(id);
        self.flush();
        Ok(id)
    }

    pub fn remove_map(&mut self, map: MapId) -> Result<ActionMap> {
        self.ensure_map_disabled(map)?;
        let entry = self.maps.remove(map.0).ok_or_else(|| unknown_map(map))?;
        self.map_order.retain(|m| *m != map);
        if let Some(asset) = entry.asset.and_then(|a| self.assets.get_mut(a.0)) {
            asset.maps.retain(|m| *m != map);
        }
        self.callbacks.map_removed(map);
        if let Some(asset) = entry.asset {
            self.mark_dirty(ResolveScope::Asset(asset));
        }
        self.rebuild_monitors();
        self.flush();
        Ok(entry.map)
    }

    pub fn add_action(&mut self, map: MapId, action: Action) -> Result<ActionId> {
        self.ensure_map_disabled(map)?;
        let entry = self.maps.get_mut(map.0).ok_or_else(|| unknown_map(map))?;
        entry.map.actions.push(action);
        let id = ActionId {
            map,
            index: (entry.map.actions.len() - 1) as u32,
        };
        self.mark_map_dirty(map);
        self.flush();
        Ok(id)
    }

    /// Later actions of the map shift down by one; callbacks registered on
    /// them follow.
    pub fn remove_action(&mut self, id: ActionId) -> Result<Action> {
        if let Ok(slot) = self.slot(id) {
            if slot.enabled {
                return Err(InputError::ActionEnabled {
                    action: slot.qualified_name(),
                });
            }
        }
        self.ensure_map_disabled(id.map)?;
        let entry = self.maps.get_mut(id.map.0).ok_or_else(|| unknown_map(id.map))?;
        let index = id.index as usize;
        if index >= entry.map.actions.len() {
            return Err(unknown_action(id));
        }
        let action = entry.map.actions.remove(index);
        if index < entry.actions.len() {
            entry.actions.remove(index);
        }
        self.callbacks.action_removed(id);
        self.mark_map_dirty(id.map);
        self.flush();
        Ok(action)
    }

    /// Allowed while enabled; an in-progress action cancels.
    pub fn add_binding(&mut self, action: ActionId, binding: Binding) -> Result<usize> {
        let definition = self.action_mut(action)?;
        definition.bindings.push(binding);
        let index = definition.bindings.len() - 1;
        self.mark_map_dirty(action.map);
        self.flush();
        Ok(index)
    }

    pub fn remove_binding(&mut self, action: ActionId, index: usize) -> Result<Binding> {
        let definition = self.action_mut(action)?;
        if index >= definition.bindings.len() {
            return Err(InputError::UnknownBinding {
                action: definition.name.clone(),
                index,
            });
        }
        let binding = definition.bindings.remove(index);
        self.mark_map_dirty(action.map);
        self.flush();
        Ok(binding)
    }

    /// Replaces the path a binding resolves with; `None` restores the
    /// original path.
    pub fn apply_binding_override(&mut self, action: ActionId, index: usize, path: Option<&str>) -> Result<()> {
        let definition = self.action_mut(action)?;
        let name = definition.name.clone();
        let binding = definition
            .bindings
            .get_mut(index)
            .ok_or(InputError::UnknownBinding { action: name, index })?;
        binding.override_path = path.map(str::to_string);
        self.mark_map_dirty(action.map);
        self.flush();
        Ok(())
    }

    pub fn set_asset_binding_mask(&mut self, asset: AssetId, mask: Option<BindingMask>) -> Result<()> {
        let entry = self.assets.get_mut(asset.0).ok_or(InputError::UnknownAsset)?;
        entry.binding_mask = mask;
        self.mark_dirty(ResolveScope::Asset(asset));
        self.flush();
        Ok(())
    }

    pub fn set_map_binding_mask(&mut self, map: MapId, mask: Option<BindingMask>) -> Result<()> {
        let entry = self.maps.get_mut(map.0).ok_or_else(|| unknown_map(map))?;
        entry.map.binding_mask = mask;
        self.mark_map_dirty(map);
        self.flush();
        Ok(())
    }

    pub fn set_action_binding_mask(&mut self, action: ActionId, mask: Option<BindingMask>) -> Result<()> {
        self.action_mut(action)?.binding_mask = mask;
        self.mark_map_dirty(action.map);
        self.flush();
        Ok(())
    }

    fn action_mut(&mut self, id: ActionId) -> Result<&mut Action> {
        self.maps
            .get_mut(id.map.0)
            .and_then(|entry| entry.map.actions.get_mut(id.index as usize))
            .ok_or_else(|| unknown_action(id))
    }

    fn ensure_map_disabled(&self, map: MapId) -> Result<()> {
        let entry = self.maps.get(map.0).ok_or_else(|| unknown_map(map))?;
        match entry.actions.iter().find(|slot| slot.enabled) {
            Some(slot) => {
                debug!(map = %entry.map.name, action = %slot.name, "structural edit rejected");
                Err(InputError::MapEnabled {
                    map: entry.map.name.clone(),
                })
            }
            None => Ok(()),
        }
    }

    // ---- lookup --------------------------------------------------------

    pub fn find_map(&self, name: &str) -> Option<MapId> {
        self.map_order.iter().copied().find(|id| {
            self.maps
                .get(id.0)
                .is_some_and(|entry| entry.map.name.eq_ignore_ascii_case(name))
        })
    }

    /// Accepts `"map/action"` or a bare action name, searched across maps
    /// in the order they were added.
    pub fn find_action(&self, name: &str) -> Option<ActionId> {
        let (map_name, action_name) = match name.split_once('/') {
            Some((map, action)) => (Some(map), action),
            None => (None, name),
        };
        self.map_order.iter().copied().find_map(|map| {
            let entry = self.maps.get(map.0)?;
            if map_name.is_some_and(|m| !entry.map.name.eq_ignore_ascii_case(m)) {
                return None;
            }
            entry.map.action_index(action_name).map(|index| ActionId {
                map,
                index: index as u32,
            })
        })
    }

    pub fn map(&self, map: MapId) -> Option<&ActionMap> {
        self.maps.get(map.0).map(|entry| &entry.map)
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.map(id.map)?.actions.get(id.index as usize)
    }

    pub fn asset_maps(&self, asset: AssetId) -> &[MapId] {
        self.assets
            .get(asset.0)
            .map(|entry| entry.maps.as_slice())
            .unwrap_or(&[])
    }

    /// Problems found by the last resolution of every map.
    pub fn resolution_issues(&self) -> impl Iterator<Item = &ResolutionIssue> + '_ {
        self.map_order
            .iter()
            .filter_map(|map| self.maps.get(map.0))
            .flat_map(|entry| entry.issues.iter())
    }

    pub fn asset_resolution_issues(&self, asset: AssetId) -> Vec<&ResolutionIssue> {
        self.asset_maps(asset)
            .iter()
            .filter_map(|map| self.maps.get(map.0))
            .flat_map(|entry| entry.issues.iter())
            .collect()
    }

    // ---- enable / disable ----------------------------------------------

    pub fn enable_action(&mut self, id: ActionId) -> Result<()> {
        let (mut dispatcher, maps, _) = self.split();
        let slot = slot_mut(maps, id).ok_or_else(|| unknown_action(id))?;
        if !slot.enabled {
            debug!(action = %slot.qualified_name(), "enabling action");
            dispatcher.enable(slot, id);
        }
        self.flush();
        Ok(())
    }

    pub fn disable_action(&mut self, id: ActionId) -> Result<()> {
        let time = self.time;
        let (mut dispatcher, maps, _) = self.split();
        let slot = slot_mut(maps, id).ok_or_else(|| unknown_action(id))?;
        if slot.enabled {
            debug!(action = %slot.qualified_name(), "disabling action");
            dispatcher.disable(slot, id, time);
        }
        self.flush();
        Ok(())
    }

    pub fn enable_map(&mut self, map: MapId) -> Result<()> {
        let (mut dispatcher, maps, _) = self.split();
        let entry = maps.get_mut(map.0).ok_or_else(|| unknown_map(map))?;
        debug!(map = %entry.map.name, "enabling action map");
        for (index, slot) in entry.actions.iter_mut().enumerate() {
            dispatcher.enable(
                slot,
                ActionId {
                    map,
                    index: index as u32,
                },
            );
        }
        dispatcher.bus.publish(&Notification::MapEnabled(map));
        self.flush();
        Ok(())
    }

    pub fn disable_map(&mut self, map: MapId) -> Result<()> {
        let time = self.time;
        let (mut dispatcher, maps, _) = self.split();
        let entry = maps.get_mut(map.0).ok_or_else(|| unknown_map(map))?;
        debug!(map = %entry.map.name, "disabling action map");
        for (index, slot) in entry.actions.iter_mut().enumerate() {
            let id = ActionId {
                map,
                index: index as u32,
            };
            dispatcher.disable(slot, id, time);
        }
        dispatcher.bus.publish(&Notification::MapDisabled(map));
        self.flush();
        Ok(())
    }

    // ---- callbacks and observers ---------------------------------------

    fn add_callback(&mut self, target: CallbackTarget, kind: CallbackKind, func: ActionCallback) -> CallbackId {
        self.callbacks.add(target, kind, func)
    }

    pub fn on_started<F>(&mut self, action: ActionId, f: F) -> Result<CallbackId>
    where
        F: FnMut(&ActionEvent, &mut Commands) + 'static,
    {
        self.slot(action)?;
        Ok(self.add_callback(CallbackTarget::Action(action), CallbackKind::Started, Box::new(f)))
    }

    pub fn on_performed<F>(&mut self, action: ActionId, f: F) -> Result<CallbackId>
    where
        F: FnMut(&ActionEvent, &mut Commands) + 'static,
    {
        self.slot(action)?;
        Ok(self.add_callback(CallbackTarget::Action(action), CallbackKind::Performed, Box::new(f)))
    }

    pub fn on_canceled<F>(&mut self, action: ActionId, f: F) -> Result<CallbackId>
    where
        F: FnMut(&ActionEvent, &mut Commands) + 'static,
    {
        self.slot(action)?;
        Ok(self.add_callback(CallbackTarget::Action(action), CallbackKind::Canceled, Box::new(f)))
    }

    /// Every phase change of `action`.
    pub fn on_action<F>(&mut self, action: ActionId, f: F) -> Result<CallbackId>
    where
        F: FnMut(&ActionEvent, &mut Commands) + 'static,
    {
        self.slot(action)?;
        Ok(self.add_callback(CallbackTarget::Action(action), CallbackKind::Any, Box::new(f)))
    }

    /// Every phase change of any action in `map`. Runs after the action's
    /// own callbacks.
    pub fn on_map_action<F>(&mut self, map: MapId, f: F) -> Result<CallbackId>
    where
        F: FnMut(&ActionEvent, &mut Commands) + 'static,
    {
        if !self.maps.contains(map.0) {
            return Err(unknown_map(map));
        }
        Ok(self.add_callback(CallbackTarget::Map(map), CallbackKind::Any, Box::new(f)))
    }

    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.callbacks.remove(id)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Notification) + 'static,
    {
        self.bus.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ---- events and update ---------------------------------------------

    /// Queue an event from the update thread.
    pub fn queue_event(&mut self, event: RawEvent) {
        self.queue.push(event);
    }

    /// A sender for device threads.
    pub fn event_sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn update(&mut self, time: f64) {
        self.update_with(time, UpdateKind::Player);
    }

    /// Processes every queued event in timestamp order, firing timeouts that
    /// fall due before each event and up to `time` at the end.
    pub fn update_with(&mut self, time: f64, kind: UpdateKind) {
        self.update_count += 1;
        self.update_kind = kind;
        self.time = time;
        self.queue.extend(self.receiver.try_iter());
        let mut events = std::mem::take(&mut self.queue);
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));

        self.run_initial_checks(time);
        for event in events.drain(..) {
            self.fire_timeouts(event.time());
            self.dispatch_event(event);
            self.flush();
        }
        self.fire_timeouts(time);
        self.flush();

        // Keep the allocation.
        if self.queue.is_empty() {
            self.queue = events;
        }
    }

    fn run_initial_checks(&mut self, time: f64) {
        let (mut dispatcher, maps, order) = self.split();
        for &map in order {
            let Some(entry) = maps.get_mut(map.0) else {
                continue;
            };
            for (index, slot) in entry.actions.iter_mut().enumerate() {
                if slot.initial_check_pending {
                    let id = ActionId {
                        map,
                        index: index as u32,
                    };
                    dispatcher.initial_check(slot, id, time);
                }
            }
        }
        self.flush();
    }

    fn fire_timeouts(&mut self, now: f64) {
        for _ in 0..MAX_TIMEOUTS_PER_STEP {
            let Some((key, entry)) = self.timeouts.pop_due(now, self.update_kind, &self.devices) else {
                return;
            };
            let (mut dispatcher, maps, _) = self.split();
            if let Some(slot) = slot_mut(maps, entry.action) {
                dispatcher.fire_timeout(slot, entry.action, key, &entry);
            }
            self.flush();
        }
        warn!(now, "too many timeouts due at once; deferring the rest");
    }

    fn dispatch_event(&mut self, event: RawEvent) {
        match event {
            RawEvent::StateChange {
                time,
                control,
                value,
            } => {
                let press_point = self.settings.default_button_press_point;
                if self.devices.write_value(control, value, time, press_point) {
                    self.dispatch_state_change(control, time);
                }
            }
            RawEvent::DeviceReset { time, device } => {
                if let Err(e) = self.reset_device_at(device, time) {
                    warn!(error = %e, "dropping reset of unknown device");
                }
            }
        }
    }

    /// Feeds one control change to every action watching the control. With
    /// shortcut suppression on, bindings needing more controls go first, an
    /// idle shortcut composite only hears about the change once all its parts
    /// are held, and a completed multi-control binding consumes its controls
    /// for the rest of this event.
    fn dispatch_state_change(&mut self, control: ControlId, time: f64) {
        let Some(watchers) = self.monitors.get(&control) else {
            return;
        };
        let mut monitors = std::mem::take(&mut self.scratch_monitors);
        monitors.clear();
        monitors.extend_from_slice(watchers);
        let mut consumed = std::mem::take(&mut self.scratch_controls);
        consumed.clear();
        let shortcuts = self.settings.shortcut_keys_consume_input;
        if shortcuts {
            monitors.sort_by(|a, b| b.complexity.cmp(&a.complexity));
        }

        let mut participants = Vec::new();
        let (mut dispatcher, maps, _) = self.split();
        for monitor in &monitors {
            let Some(slot) = slot_mut(maps, monitor.action) else {
                continue;
            };
            if shortcuts && !consumed.is_empty() {
                participants.clear();
                participants.push(control);
                slot.participating_controls(monitor.binding, &mut participants);
                if participants.iter().any(|c| consumed.contains(c)) {
                    slot.refresh_part_for(monitor.binding, control, dispatcher.devices, dispatcher.settings);
                    debug!(action = %slot.qualified_name(), "input consumed by shortcut");
                    continue;
                }
            }
            if shortcuts && monitor.complexity > 1 && slot.enabled && !slot.state.phase.is_in_progress() {
                slot.refresh_part_for(monitor.binding, control, dispatcher.devices, dispatcher.settings);
                if slot.shortcut_incomplete(monitor.binding) {
                    debug!(action = %slot.qualified_name(), "shortcut not complete");
                    continue;
                }
            }

            dispatcher.control_changed(slot, monitor.action, monitor.binding, control, time);

            if shortcuts && monitor.complexity > 1 && slot.enabled {
                if let Some(ResolvedKind::Part { composite, .. }) = slot.bindings.get(monitor.binding).map(|b| b.kind) {
                    let composite = &slot.composites[composite];
                    if composite.all_parts_actuated() {
                        consumed.extend(composite.parts.iter().filter_map(|p| p.driver_control()));
                    }
                }
            }
        }

        self.scratch_monitors = monitors;
        self.scratch_controls = consumed;
    }

    // ---- deferred commands and resolution ------------------------------

    fn mark_dirty(&mut self, scope: ResolveScope) {
        if !self.dirty.contains(&scope) {
            self.dirty.push(scope);
        }
    }

    fn mark_map_dirty(&mut self, map: MapId) {
        let scope = match self.maps.get(map.0).and_then(|entry| entry.asset) {
            Some(asset) => ResolveScope::Asset(asset),
            None => ResolveScope::Map(map),
        };
        self.mark_dirty(scope);
    }

    fn mark_all_dirty(&mut self) {
        for map in self.map_order.clone() {
            self.mark_map_dirty(map);
        }
    }

    /// Applies queued commands and pending resolutions until both are
    /// exhausted. Re-entrant calls return immediately.
    fn flush(&mut self) {
        if self.deferring {
            return;
        }
        self.deferring = true;
        for round in 0.. {
            let commands = self.commands.take();
            if commands.is_empty() && self.dirty.is_empty() {
                break;
            }
            if round == MAX_COMMAND_ROUNDS {
                warn!(dropped = commands.len(), "callbacks keep queuing commands; dropping the rest");
                self.commands.clear();
                break;
            }
            for command in commands {
                if let Err(e) = self.apply_command(command) {
                    warn!(error = %e, "deferred command failed");
                }
            }
            self.resolve_dirty();
        }
        self.deferring = false;
    }

    fn apply_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::EnableAction(id) => self.enable_action(id),
            Command::DisableAction(id) => self.disable_action(id),
            Command::EnableMap(map) => self.enable_map(map),
            Command::DisableMap(map) => self.disable_map(map),
            Command::AddBinding { action, binding } => self.add_binding(action, binding).map(|_| ()),
            Command::RemoveBinding { action, index } => self.remove_binding(action, index).map(|_| ()),
            Command::ApplyBindingOverride { action, index, path } => {
                self.apply_binding_override(action, index, path.as_deref())
            }
            Command::AddDevice(desc) => {
                self.add_device(desc);
                Ok(())
            }
            Command::RemoveDevice(device) => self.remove_device(device),
            Command::ResetDevice(device) => self.reset_device(device),
        }
    }

    fn resolve_dirty(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        for scope in std::mem::take(&mut self.dirty) {
            self.resolve_scope(scope);
        }
        self.rebuild_monitors();
    }

    /// Rebuilds every map of `scope` against the current devices, carrying
    /// runtime state over where the change is additive.
    fn resolve_scope(&mut self, scope: ResolveScope) {
        let (map_ids, asset_mask, label) = match scope {
            ResolveScope::Asset(asset) => match self.assets.get(asset.0) {
                Some(entry) => (entry.maps.clone(), entry.binding_mask.clone(), entry.name.clone()),
                None => return,
            },
            ResolveScope::Map(map) => match self.maps.get(map.0) {
                Some(entry) => (vec![map], None, entry.map.name.clone()),
                None => return,
            },
        };
        debug!(scope = %label, maps = map_ids.len(), "resolving bindings");
        self.bus.publish(&Notification::BoundControlsAboutToChange(scope));

        let time = self.time;
        let ctx = ResolveContext {
            registries: &self.registries,
            devices: &self.devices,
            settings: &self.settings,
        };
        let mut dispatcher = Dispatcher {
            settings: &self.settings,
            devices: &self.devices,
            timeouts: &mut self.timeouts,
            callbacks: &mut self.callbacks,
            bus: &mut self.bus,
            commands: &mut self.commands,
            update: self.update_count,
            update_kind: self.update_kind,
        };
        for map in map_ids {
            let Some(entry) = self.maps.get_mut(map.0) else {
                continue;
            };
            entry.issues.clear();
            let mut previous = std::mem::take(&mut entry.actions).into_iter();
            let mut resolved = Vec::with_capacity(entry.map.actions.len());
            for (index, action) in entry.map.actions.iter().enumerate() {
                let masks = [
                    action.binding_mask.as_ref(),
                    entry.map.binding_mask.as_ref(),
                    asset_mask.as_ref(),
                ];
                let mut slot = resolve_action(&ctx, action, &entry.map.name, masks, &mut entry.issues);
                let id = ActionId {
                    map,
                    index: index as u32,
                };
                if let Some(old) = previous.next() {
                    carry_over(&mut dispatcher, id, old, &mut slot, time);
                }
                slot.refresh_composites(ctx.devices, ctx.settings);
                resolved.push(slot);
            }
            for mut stale in previous {
                dispatcher.reset_interactions(&mut stale);
            }
            entry.actions = resolved;
        }
        dispatcher
            .bus
            .publish(&Notification::BoundControlsChanged(scope));
        debug!(scope = %label, "bindings resolved");
    }

    fn rebuild_monitors(&mut self) {
        self.monitors.clear();
        for &map in &self.map_order {
            let Some(entry) = self.maps.get(map.0) else {
                continue;
            };
            for (index, slot) in entry.actions.iter().enumerate() {
                let id = ActionId {
                    map,
                    index: index as u32,
                };
                add_monitors(slot, id, &mut self.monitors);
            }
        }
    }
}
