use crate::{
  block::{Block, Blocks, Field, Mutation},
  error::LoadError,
  target::{Target, Variable as TargetVariable},
  value::Value,
};
use serde::{de::{MapAccess, SeqAccess, Visitor}, Deserialize, Deserializer};
use std::{
  collections::HashMap,
  fmt::{self, Formatter},
  fs::File,
  io::BufReader,
  marker::PhantomData,
  path::Path,
  rc::Rc,
};

const INPUT_SAME_BLOCK_SHADOW: u64 = 1;
const INPUT_BLOCK_NO_SHADOW: u64 = 2;
const INPUT_DIFF_BLOCK_SHADOW: u64 = 3;

#[derive(Deserialize)]
struct Project {
  targets: Vec<TargetJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetJson {
  is_stage: bool,
  name: String,
  #[serde(default)]
  variables: HashMap<String, Variable>,
  #[serde(default)]
  blocks: HashMap<String, SerializedBlock>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SerializedBlock {
  Block(BlockJson),
  Primitive(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockJson {
  opcode: String,
  #[serde(default)]
  next: Option<String>,
  #[serde(default)]
  parent: Option<String>,
  #[serde(default)]
  inputs: Ordered<InputJson>,
  #[serde(default)]
  fields: Ordered<FieldJson>,
  #[serde(default)]
  shadow: bool,
  #[serde(default)]
  top_level: bool,
  #[serde(default)]
  mutation: Option<Mutation>,
}

/// A JSON object read as a list of entries in document order.
struct Ordered<T>(Vec<(String, T)>);

impl<T> Default for Ordered<T> {
  fn default() -> Self {
    Ordered(Vec::new())
  }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    struct OrderedVisitor<T>(PhantomData<T>);
    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
      type Value = Ordered<T>;
      fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "an object")
      }
      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, T>()? {
          entries.push(entry);
        }
        Ok(Ordered(entries))
      }
    }
    de.deserialize_map(OrderedVisitor(PhantomData))
  }
}

struct Variable {
  name: String,
  value: Value,
}

impl<'de> Deserialize<'de> for Variable {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    struct VariableVisitor;
    impl<'de> Visitor<'de> for VariableVisitor {
      type Value = Variable;
      fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[name, value, ...]")
      }
      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let name = seq
          .next_element::<String>()?
          .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
        let value = seq
          .next_element::<Value>()?
          .ok_or_else(|| serde::de::Error::invalid_length(1, &self))?;
        // Cloud variables carry a trailing flag.
        while seq.next_element::<serde_json::Value>()?.is_some() {}
        Ok(Variable { name, value })
      }
    }
    de.deserialize_seq(VariableVisitor)
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputRef {
  Id(String),
  Primitive(Vec<serde_json::Value>),
}

struct InputJson {
  kind: u64,
  first: Option<InputRef>,
  second: Option<InputRef>,
}

impl<'de> Deserialize<'de> for InputJson {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    struct InputVisitor;
    impl<'de> Visitor<'de> for InputVisitor {
      type Value = InputJson;
      fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[shadow type, block, shadow]")
      }
      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let kind = seq
          .next_element::<u64>()?
          .ok_or_else(|| serde::de::Error::invalid_length(0, &self))?;
        let first = seq.next_element::<Option<InputRef>>()?.flatten();
        let second = seq.next_element::<Option<InputRef>>()?.flatten();
        while seq.next_element::<serde_json::Value>()?.is_some() {}
        Ok(InputJson {
          kind,
          first,
          second,
        })
      }
    }
    de.deserialize_seq(InputVisitor)
  }
}

struct FieldJson {
  value: Value,
  id: Option<String>,
}

impl<'de> Deserialize<'de> for FieldJson {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    struct FieldVisitor;
    impl<'de> Visitor<'de> for FieldVisitor {
      type Value = FieldJson;
      fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[value, id]")
      }
      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let value = seq
          .next_element::<Option<Value>>()?
          .flatten()
          .unwrap_or_else(|| Value::String(String::new()));
        let id = seq.next_element::<Option<String>>()?.flatten();
        while seq.next_element::<serde_json::Value>()?.is_some() {}
        Ok(FieldJson { value, id })
      }
    }
    de.deserialize_seq(FieldVisitor)
  }
}

fn json_to_value(value: &serde_json::Value) -> Value {
  match value {
    serde_json::Value::Number(number) => Value::Number(number.as_f64().unwrap_or(0.)),
    serde_json::Value::String(string) => Value::String(string.clone()),
    serde_json::Value::Bool(boolean) => Value::Bool(*boolean),
    serde_json::Value::Null => Value::String(String::new()),
    other => Value::String(other.to_string()),
  }
}

fn json_to_string(value: Option<&serde_json::Value>) -> String {
  match value {
    Some(serde_json::Value::String(string)) => string.clone(),
    Some(other) => json_to_value(other).to_string(),
    None => String::new(),
  }
}

/// Expands a compressed primitive (`[4, "10"]`, `[12, "score", "id"]`, ...)
/// into the block it stands for.
fn primitive_block(id: String, primitive: &[serde_json::Value]) -> Result<Block, String> {
  let kind = primitive
    .first()
    .and_then(serde_json::Value::as_u64)
    .ok_or_else(|| format!("primitive without a type: {primitive:?}"))?;
  let literal = || primitive.get(1).map(json_to_value).unwrap_or_else(|| Value::String(String::new()));
  let reference = || (json_to_string(primitive.get(1)), json_to_string(primitive.get(2)));
  let block = match kind {
    4 => Block::new(id, "math_number").with_field("NUM", literal()).as_shadow(),
    5 => Block::new(id, "math_positive_number").with_field("NUM", literal()).as_shadow(),
    6 => Block::new(id, "math_whole_number").with_field("NUM", literal()).as_shadow(),
    7 => Block::new(id, "math_integer").with_field("NUM", literal()).as_shadow(),
    8 => Block::new(id, "math_angle").with_field("NUM", literal()).as_shadow(),
    9 => Block::new(id, "colour_picker").with_field("COLOUR", literal()).as_shadow(),
    10 => Block::new(id, "text").with_field("TEXT", literal()).as_shadow(),
    11 => {
      let (name, broadcast_id) = reference();
      Block::new(id, "event_broadcast_menu")
        .with_reference_field("BROADCAST_OPTION", name, broadcast_id)
        .as_shadow()
    }
    12 => {
      let (name, variable_id) = reference();
      Block::new(id, "data_variable").with_reference_field("VARIABLE", name, variable_id)
    }
    13 => {
      let (name, list_id) = reference();
      Block::new(id, "data_listcontents").with_reference_field("LIST", name, list_id)
    }
    other => return Err(format!("unknown primitive type {other}")),
  };
  Ok(block)
}

fn input_block(
  blocks: &Blocks,
  parent: &str,
  id: String,
  reference: Option<&InputRef>,
) -> Result<Option<String>, String> {
  match reference {
    None => Ok(None),
    Some(InputRef::Id(existing)) => Ok(Some(existing.clone())),
    Some(InputRef::Primitive(primitive)) => {
      let block = primitive_block(id.clone(), primitive)?.with_parent(parent);
      blocks.create_block(block);
      Ok(Some(id))
    }
  }
}

fn load_block(blocks: &Blocks, id: &str, json: &BlockJson) -> Result<(), LoadError> {
  let mut block = Block::new(id, json.opcode.clone());
  block.next = json.next.clone();
  block.parent = json.parent.clone();
  block.shadow = json.shadow;
  block.top_level = json.top_level;
  block.mutation = json.mutation.clone();
  for (name, field) in &json.fields.0 {
    block.fields.push(Field {
      name: name.clone(),
      value: field.value.clone(),
      id: field.id.clone(),
    });
  }
  for (name, input) in &json.inputs.0 {
    let bad_input = |reason: String| LoadError::BadInput {
      block: id.to_string(),
      input: name.clone(),
      reason,
    };
    let first_id = format!("{id}-{name}");
    let (block_id, shadow_id) = match input.kind {
      INPUT_SAME_BLOCK_SHADOW => {
        let shared = input_block(blocks, id, first_id, input.first.as_ref()).map_err(bad_input)?;
        (shared.clone(), shared)
      }
      INPUT_BLOCK_NO_SHADOW => {
        let block_id = input_block(blocks, id, first_id, input.first.as_ref()).map_err(bad_input)?;
        (block_id, None)
      }
      INPUT_DIFF_BLOCK_SHADOW => {
        let block_id =
          input_block(blocks, id, first_id.clone(), input.first.as_ref()).map_err(bad_input)?;
        let shadow_id = input_block(
          blocks,
          id,
          format!("{first_id}-shadow"),
          input.second.as_ref(),
        )
        .map_err(bad_input)?;
        (block_id, shadow_id)
      }
      other => return Err(bad_input(format!("unknown shadow type {other}"))),
    };
    block = block.with_input_shadow(name.clone(), block_id, shadow_id);
  }
  blocks.create_block(block);
  Ok(())
}

fn load_target(index: usize, json: &TargetJson) -> Result<Target, LoadError> {
  // Names are not unique across targets, so the id carries the position.
  let id = format!("{index}-{}", json.name);
  let mut target = if json.is_stage {
    Target::stage(id)
  } else {
    Target::new(id, json.name.clone())
  };
  target.name = json.name.clone();
  for (id, variable) in &json.variables {
    target.variables.insert(
      id.clone(),
      TargetVariable {
        name: variable.name.clone(),
        value: variable.value.clone(),
      },
    );
  }
  let blocks = Blocks::new();
  for (id, serialized) in &json.blocks {
    match serialized {
      SerializedBlock::Block(block) => load_block(&blocks, id, block)?,
      SerializedBlock::Primitive(primitive) => {
        let block = primitive_block(id.clone(), primitive).map_err(|reason| LoadError::BadInput {
          block: id.clone(),
          input: String::new(),
          reason,
        })?;
        blocks.create_block(block.as_top_level());
      }
    }
  }
  target.blocks = Rc::new(blocks);
  Ok(target)
}

pub fn parse(source: &str) -> Result<Vec<Target>, LoadError> {
  let project: Project = serde_json::from_str(source)?;
  build(project)
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<Target>, LoadError> {
  let project: Project = serde_json::from_reader(BufReader::new(File::open(path)?))?;
  build(project)
}

fn build(project: Project) -> Result<Vec<Target>, LoadError> {
  if project.targets.is_empty() {
    return Err(LoadError::NoTargets);
  }
  project
    .targets
    .iter()
    .enumerate()
    .map(|(index, target)| load_target(index, target))
    .collect()
}
