use crate::{
  args::Args,
  block::Blocks,
  block_utility::BlockUtility,
  deferred::{Deferred, Reported, Resolver, Settlements},
  profiler::Profiler,
  target::Target,
  value::Value,
};
use derivative::Derivative;
use serde::Serialize;
use std::{collections::HashMap, rc::Rc, time::Instant};

pub type Primitive = Rc<dyn Fn(&Args, &mut BlockUtility<'_>) -> Reported>;

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct OpcodeInfo {
  pub opcode: String,
  pub is_hat: bool,
  pub is_edge_activated: bool,
  #[derivative(Debug = "ignore")]
  pub primitive: Option<Primitive>,
}

impl OpcodeInfo {
  pub fn has_primitive(&self) -> bool {
    self.primitive.is_some()
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HatInfo {
  pub edge_activated: bool,
}

#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct Registry {
  #[derivative(Debug = "ignore")]
  primitives: HashMap<String, Primitive>,
  hats: HashMap<String, HatInfo>,
}

impl Registry {
  pub fn get_opcode_function(&self, opcode: &str) -> Option<Primitive> {
    self.primitives.get(opcode).cloned()
  }

  pub fn get_is_hat(&self, opcode: &str) -> bool {
    self.hats.contains_key(opcode)
  }

  pub fn get_is_edge_activated_hat(&self, opcode: &str) -> bool {
    self.hats.get(opcode).is_some_and(|hat| hat.edge_activated)
  }
}

/// Memoized [`OpcodeInfo`] per opcode. Entries live until the registry
/// changes for that opcode or the cache is reset.
#[derive(Debug, Default)]
pub struct OpcodeCache {
  infos: HashMap<String, Rc<OpcodeInfo>>,
}

impl OpcodeCache {
  pub fn resolve(&mut self, opcode: &str, registry: &Registry) -> Rc<OpcodeInfo> {
    if let Some(info) = self.infos.get(opcode) {
      return Rc::clone(info);
    }
    let info = Rc::new(OpcodeInfo {
      opcode: opcode.to_string(),
      is_hat: registry.get_is_hat(opcode),
      is_edge_activated: registry.get_is_edge_activated_hat(opcode),
      primitive: registry.get_opcode_function(opcode),
    });
    self.infos.insert(opcode.to_string(), Rc::clone(&info));
    info
  }

  pub fn invalidate(&mut self, opcode: &str) {
    self.infos.remove(opcode);
  }

  pub fn clear(&mut self) {
    self.infos.clear();
  }

  pub fn len(&self) -> usize {
    self.infos.len()
  }

  pub fn is_empty(&self) -> bool {
    self.infos.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRecord {
  pub id: String,
  pub sprite_name: Option<String>,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuntimeEvent {
  VisualReport { block_id: String, value: Value },
  MonitorUpdate(MonitorRecord),
  Broadcast { id: Option<String>, name: String },
  Say { target: String, message: String },
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Runtime {
  registry: Registry,
  opcode_cache: OpcodeCache,
  edge_activated_values: HashMap<String, bool>,
  targets: Vec<Target>,
  #[derivative(Debug = "ignore")]
  pub flyout_blocks: Rc<Blocks>,
  #[derivative(Debug = "ignore")]
  pub monitor_blocks: Rc<Blocks>,
  pub profiler: Option<Profiler>,
  pub(crate) block_function_profiler_id: Option<u32>,
  pub(crate) settlements: Settlements,
  events: Vec<RuntimeEvent>,
  timer: Instant,
}

impl Default for Runtime {
  fn default() -> Self {
    Runtime {
      registry: Registry::default(),
      opcode_cache: OpcodeCache::default(),
      edge_activated_values: HashMap::new(),
      targets: Vec::new(),
      flyout_blocks: Rc::new(Blocks::new()),
      monitor_blocks: Rc::new(Blocks::new()),
      profiler: None,
      block_function_profiler_id: None,
      settlements: Settlements::default(),
      events: Vec::new(),
      timer: Instant::now(),
    }
  }
}

impl Runtime {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_primitive<F>(&mut self, opcode: &str, primitive: F)
  where
    F: Fn(&Args, &mut BlockUtility<'_>) -> Reported + 'static,
  {
    self
      .registry
      .primitives
      .insert(opcode.to_string(), Rc::new(primitive));
    self.opcode_cache.invalidate(opcode);
  }

  pub fn register_hat(&mut self, opcode: &str, edge_activated: bool) {
    self
      .registry
      .hats
      .insert(opcode.to_string(), HatInfo { edge_activated });
    self.opcode_cache.invalidate(opcode);
  }

  pub fn clear_registry(&mut self) {
    self.registry = Registry::default();
    self.opcode_cache.clear();
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn opcode_info(&mut self, opcode: &str) -> Rc<OpcodeInfo> {
    self.opcode_cache.resolve(opcode, &self.registry)
  }

  pub fn opcode_cache(&self) -> &OpcodeCache {
    &self.opcode_cache
  }

  pub fn reset_opcode_cache(&mut self) {
    self.opcode_cache.clear();
  }

  /// Records `value` as the latest predicate result of an edge-activated hat
  /// and returns the one it replaces (false when never seen).
  pub fn update_edge_activated_value(&mut self, block_id: &str, value: bool) -> bool {
    self
      .edge_activated_values
      .insert(block_id.to_string(), value)
      .unwrap_or(false)
  }

  pub fn clear_edge_activated_values(&mut self) {
    self.edge_activated_values.clear();
  }

  pub fn add_target(&mut self, target: Target) {
    self.targets.retain(|existing| existing.id != target.id);
    self.targets.push(target);
  }

  pub fn delete_target(&mut self, id: &str) -> Option<Target> {
    let index = self.targets.iter().position(|target| target.id == id)?;
    Some(self.targets.remove(index))
  }

  pub fn get_target_by_id(&self, id: &str) -> Option<&Target> {
    self.targets.iter().find(|target| target.id == id)
  }

  pub fn get_target_by_id_mut(&mut self, id: &str) -> Option<&mut Target> {
    self.targets.iter_mut().find(|target| target.id == id)
  }

  pub fn targets(&self) -> &[Target] {
    &self.targets
  }

  pub fn stage(&self) -> Option<&Target> {
    self.targets.iter().find(|target| target.is_stage)
  }

  pub fn stage_mut(&mut self) -> Option<&mut Target> {
    self.targets.iter_mut().find(|target| target.is_stage)
  }

  pub fn visual_report(&mut self, block_id: &str, value: &Value) {
    self.emit(RuntimeEvent::VisualReport {
      block_id: block_id.to_string(),
      value: value.clone(),
    });
  }

  pub fn request_update_monitor(&mut self, record: MonitorRecord) {
    self.emit(RuntimeEvent::MonitorUpdate(record));
  }

  pub fn emit(&mut self, event: RuntimeEvent) {
    self.events.push(event);
  }

  pub fn events(&self) -> &[RuntimeEvent] {
    &self.events
  }

  pub fn take_events(&mut self) -> Vec<RuntimeEvent> {
    std::mem::take(&mut self.events)
  }

  pub fn enable_profiler(&mut self) {
    self.profiler = Some(Profiler::new());
    self.block_function_profiler_id = None;
  }

  pub fn disable_profiler(&mut self) -> Option<Profiler> {
    self.block_function_profiler_id = None;
    self.profiler.take()
  }

  pub fn defer(&mut self) -> (Deferred, Resolver) {
    self.settlements.defer()
  }

  pub fn timer_seconds(&self) -> f64 {
    self.timer.elapsed().as_secs_f64()
  }

  pub fn reset_timer(&mut self) {
    self.timer = Instant::now();
  }
}
