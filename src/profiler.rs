use std::{collections::HashMap, time::Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum ProfilerRecord {
  Start { id: u32, arg: String, timestamp: f64 },
  Stop { timestamp: f64 },
}

/// Aggregate for one start/stop pair argument (an opcode for block frames).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTotal {
  pub calls: u32,
  pub total_ms: f64,
}

#[derive(Debug)]
pub struct Profiler {
  names: HashMap<String, u32>,
  pub records: Vec<ProfilerRecord>,
  origin: Instant,
}

impl Default for Profiler {
  fn default() -> Self {
    Profiler {
      names: HashMap::new(),
      records: Vec::new(),
      origin: Instant::now(),
    }
  }
}

impl Profiler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn id_by_name(&mut self, name: &str) -> u32 {
    let next = self.names.len() as u32;
    *self.names.entry(name.to_string()).or_insert(next)
  }

  pub fn now(&self) -> f64 {
    self.origin.elapsed().as_secs_f64() * 1000.
  }

  pub fn start(&mut self, id: u32, arg: &str) {
    let timestamp = self.now();
    self.records.push(ProfilerRecord::Start {
      id,
      arg: arg.to_string(),
      timestamp,
    });
  }

  pub fn stop(&mut self) {
    let timestamp = self.now();
    self.records.push(ProfilerRecord::Stop { timestamp });
  }

  /// Folds matched start/stop pairs of frame `id` by argument.
  pub fn summary(&self, id: u32) -> HashMap<String, FrameTotal> {
    let mut totals: HashMap<String, FrameTotal> = HashMap::new();
    let mut open: Vec<(u32, &str, f64)> = Vec::new();
    for record in &self.records {
      match record {
        ProfilerRecord::Start {
          id: frame,
          arg,
          timestamp,
        } => open.push((*frame, arg.as_str(), *timestamp)),
        ProfilerRecord::Stop { timestamp } => {
          if let Some((frame, arg, started)) = open.pop() {
            if frame == id {
              let total = totals.entry(arg.to_string()).or_default();
              total.calls += 1;
              total.total_ms += timestamp - started;
            }
          }
        }
      }
    }
    totals
  }
}
