use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::{BTreeMap, HashMap}, rc::Rc};

/// Inputs with this prefix hold command stacks (C-block bodies) and are
/// never evaluated as reporters.
pub const BRANCH_INPUT_PREFIX: &str = "SUBSTACK";

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
  pub id: String,
  pub opcode: String,
  pub next: Option<String>,
  pub parent: Option<String>,
  pub inputs: Vec<Input>,
  pub fields: Vec<Field>,
  pub mutation: Option<Mutation>,
  pub shadow: bool,
  pub top_level: bool,
  pub target_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Input {
  pub name: String,
  pub block: Option<String>,
  pub shadow: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub name: String,
  pub value: Value,
  pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
  #[serde(default)]
  pub tag_name: String,
  #[serde(default)]
  pub children: Vec<serde_json::Value>,
  #[serde(flatten)]
  pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Block {
  pub fn new(id: impl Into<String>, opcode: impl Into<String>) -> Self {
    Block {
      id: id.into(),
      opcode: opcode.into(),
      next: None,
      parent: None,
      inputs: Vec::new(),
      fields: Vec::new(),
      mutation: None,
      shadow: false,
      top_level: false,
      target_id: None,
    }
  }

  pub fn with_next(mut self, next: impl Into<String>) -> Self {
    self.next = Some(next.into());
    self
  }

  pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
    self.parent = Some(parent.into());
    self
  }

  pub fn with_input(self, name: impl Into<String>, block: impl Into<String>) -> Self {
    let block = block.into();
    self.with_input_shadow(name, Some(block), None)
  }

  pub fn with_shadow_input(self, name: impl Into<String>, shadow: impl Into<String>) -> Self {
    let shadow = shadow.into();
    self.with_input_shadow(name, Some(shadow.clone()), Some(shadow))
  }

  pub fn with_input_shadow(
    mut self,
    name: impl Into<String>,
    block: Option<String>,
    shadow: Option<String>,
  ) -> Self {
    self.inputs.push(Input {
      name: name.into(),
      block,
      shadow,
    });
    self
  }

  pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.push(Field {
      name: name.into(),
      value: value.into(),
      id: None,
    });
    self
  }

  pub fn with_reference_field(
    mut self,
    name: impl Into<String>,
    value: impl Into<Value>,
    id: impl Into<String>,
  ) -> Self {
    self.fields.push(Field {
      name: name.into(),
      value: value.into(),
      id: Some(id.into()),
    });
    self
  }

  pub fn with_mutation(mut self, mutation: Mutation) -> Self {
    self.mutation = Some(mutation);
    self
  }

  pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
    self.target_id = Some(target_id.into());
    self
  }

  pub fn as_shadow(mut self) -> Self {
    self.shadow = true;
    self
  }

  pub fn as_top_level(mut self) -> Self {
    self.top_level = true;
    self
  }

  pub fn input(&self, name: &str) -> Option<&Input> {
    self.inputs.iter().find(|input| input.name == name)
  }

  pub fn field(&self, name: &str) -> Option<&Field> {
    self.fields.iter().find(|field| field.name == name)
  }
}

#[derive(Debug, Default)]
pub struct Blocks {
  blocks: RefCell<HashMap<String, Rc<Block>>>,
}

impl Blocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn create_block(&self, block: Block) {
    self
      .blocks
      .borrow_mut()
      .insert(block.id.clone(), Rc::new(block));
  }

  pub fn delete_block(&self, id: &str) -> Option<Rc<Block>> {
    self.blocks.borrow_mut().remove(id)
  }

  pub fn get_block(&self, id: &str) -> Option<Rc<Block>> {
    self.blocks.borrow().get(id).cloned()
  }

  pub fn len(&self) -> usize {
    self.blocks.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.borrow().is_empty()
  }

  pub fn get_inputs<'b>(&self, block: &'b Block) -> impl Iterator<Item = &'b Input> {
    block
      .inputs
      .iter()
      .filter(|input| !input.name.starts_with(BRANCH_INPUT_PREFIX))
  }

  pub fn get_next_block(&self, id: &str) -> Option<String> {
    self.blocks.borrow().get(id).and_then(|block| block.next.clone())
  }

  pub fn get_branch(&self, id: &str, branch_num: usize) -> Option<String> {
    let name = if branch_num > 1 {
      format!("{BRANCH_INPUT_PREFIX}{branch_num}")
    } else {
      BRANCH_INPUT_PREFIX.to_string()
    };
    let blocks = self.blocks.borrow();
    blocks
      .get(id)
      .and_then(|block| block.input(&name))
      .and_then(|input| input.block.clone())
  }

  /// Literal carried by a shadow block: its first field.
  pub fn get_shadow_value(&self, block: &Block) -> Option<Value> {
    block.fields.first().map(|field| field.value.clone())
  }

  pub fn get_id_name_field<'b>(&self, block: &'b Block) -> Option<&'b Field> {
    match block.fields.as_slice() {
      [field] if field.id.is_some() => Some(field),
      _ => None,
    }
  }

  pub fn top_blocks(&self) -> Vec<String> {
    let mut ids: Vec<String> = self
      .blocks
      .borrow()
      .values()
      .filter(|block| block.top_level)
      .map(|block| block.id.clone())
      .collect();
    ids.sort();
    ids
  }
}
