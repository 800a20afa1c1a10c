use crate::{
  block::Block,
  error::LoadError,
  execute::BROADCAST_OPTION,
  json,
  primitives,
  runtime::{Runtime, RuntimeEvent},
  sequencer::Sequencer,
  target::Target,
  thread::Thread,
};
use log::debug;
use std::{path::Path, rc::Rc};

#[derive(Debug, Clone)]
pub struct Config {
  pub frame_rate: u32,
  /// Stop after this many ticks even if scripts are still running.
  pub max_ticks: Option<u64>,
  pub profile: bool,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      frame_rate: 30,
      max_ticks: None,
      profile: false,
    }
  }
}

#[derive(Debug)]
pub struct Project {
  pub config: Config,
  pub sequencer: Sequencer,
  pub threads: Vec<Thread>,
  pub ticks: u64,
  /// Events already scanned for broadcasts.
  dispatched: usize,
}

impl Project {
  pub fn load(path: impl AsRef<Path>, config: Config) -> Result<Project, LoadError> {
    Ok(Project::new(json::load(path)?, config))
  }

  pub fn parse(source: &str, config: Config) -> Result<Project, LoadError> {
    Ok(Project::new(json::parse(source)?, config))
  }

  pub fn new(targets: Vec<Target>, config: Config) -> Project {
    let mut runtime = Runtime::new();
    primitives::register_all(&mut runtime);
    for target in targets {
      runtime.add_target(target);
    }
    if config.profile {
      runtime.enable_profiler();
    }
    Project {
      config,
      sequencer: Sequencer::new(runtime),
      threads: Vec::new(),
      ticks: 0,
      dispatched: 0,
    }
  }

  pub fn runtime(&mut self) -> &mut Runtime {
    &mut self.sequencer.runtime
  }

  fn start_hats(&mut self, matches: impl Fn(&Block) -> bool) -> usize {
    let mut started = 0;
    for target in self.sequencer.runtime.targets() {
      for id in target.blocks.top_blocks() {
        let Some(hat) = target.blocks.get_block(&id) else {
          continue;
        };
        if matches(hat.as_ref()) {
          debug!("Starting {} script {id} on {}", hat.opcode, target.name);
          self
            .threads
            .push(Thread::new(id, Rc::clone(&target.blocks)).for_target(target.id.clone()));
          started += 1;
        }
      }
    }
    started
  }

  pub fn start_scripts(&mut self) -> usize {
    self.start_hats(|hat| hat.opcode == "event_whenflagclicked")
  }

  pub fn start_broadcast(&mut self, name: &str) -> usize {
    let name = name.to_lowercase();
    self.start_hats(|hat| {
      hat.opcode == "event_whenbroadcastreceived"
        && hat
          .field(BROADCAST_OPTION)
          .is_some_and(|field| field.value.to_string().to_lowercase() == name)
    })
  }

  pub fn execute_scripts(&mut self) {
    self.sequencer.step_threads(&mut self.threads);
    self.ticks += 1;
    let broadcasts: Vec<String> = self.sequencer.runtime.events()[self.dispatched..]
      .iter()
      .filter_map(|event| match event {
        RuntimeEvent::Broadcast { name, .. } => Some(name.clone()),
        _ => None,
      })
      .collect();
    self.dispatched = self.sequencer.runtime.events().len();
    for name in broadcasts {
      self.start_broadcast(&name);
    }
  }

  pub fn take_events(&mut self) -> Vec<RuntimeEvent> {
    self.dispatched = 0;
    self.sequencer.runtime.take_events()
  }

  pub fn is_finished(&self) -> bool {
    self.threads.is_empty() || self.config.max_ticks.is_some_and(|max| self.ticks >= max)
  }
}
