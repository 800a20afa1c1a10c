use crate::{block::Mutation, value::Value};
use std::collections::HashMap;

/// Input record key that carries the block's mutation.
pub const MUTATION_KEY: &str = "mutation";

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
  Value(Value),
  /// Something named by id: a variable, a list or a broadcast message.
  /// Broadcasts built from a plugged-in reporter have no id.
  Reference { id: Option<String>, name: String },
  Mutation(Mutation),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
  values: HashMap<String, Arg>,
}

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, arg: Arg) {
    self.values.insert(name.into(), arg);
  }

  pub fn get(&self, name: &str) -> Option<&Arg> {
    self.values.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn value(&self, name: &str) -> Option<&Value> {
    match self.values.get(name) {
      Some(Arg::Value(value)) => Some(value),
      _ => None,
    }
  }

  pub fn number(&self, name: &str) -> f64 {
    self.value(name).map_or(0., Value::to_f64)
  }

  pub fn string(&self, name: &str) -> String {
    self.value(name).map(Value::to_string).unwrap_or_default()
  }

  pub fn boolean(&self, name: &str) -> bool {
    self.value(name).is_some_and(Value::to_bool)
  }

  pub fn reference(&self, name: &str) -> Option<(Option<&str>, &str)> {
    match self.values.get(name) {
      Some(Arg::Reference { id, name }) => Some((id.as_deref(), name.as_str())),
      _ => None,
    }
  }

  pub fn mutation(&self) -> Option<&Mutation> {
    match self.values.get(MUTATION_KEY) {
      Some(Arg::Mutation(mutation)) => Some(mutation),
      _ => None,
    }
  }
}
