use crate::{block::Blocks, value::Value};
use std::{collections::HashMap, rc::Rc};

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
  pub name: String,
  pub value: Value,
}

#[derive(Debug)]
pub struct Target {
  pub id: String,
  pub name: String,
  pub is_stage: bool,
  pub blocks: Rc<Blocks>,
  pub variables: HashMap<String, Variable>,
}

impl Target {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Target {
      id: id.into(),
      name: name.into(),
      is_stage: false,
      blocks: Rc::new(Blocks::new()),
      variables: HashMap::new(),
    }
  }

  pub fn stage(id: impl Into<String>) -> Self {
    Target {
      is_stage: true,
      ..Target::new(id, "Stage")
    }
  }

  pub fn get_name(&self) -> &str {
    &self.name
  }

  pub fn lookup_variable(&self, id: &str, name: &str) -> Option<&Variable> {
    self
      .variables
      .get(id)
      .or_else(|| self.variables.values().find(|variable| variable.name == name))
  }

  pub fn lookup_variable_mut(&mut self, id: &str, name: &str) -> Option<&mut Variable> {
    if self.variables.contains_key(id) {
      return self.variables.get_mut(id);
    }
    self
      .variables
      .values_mut()
      .find(|variable| variable.name == name)
  }
}
