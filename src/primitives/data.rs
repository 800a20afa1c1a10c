use crate::{
  args::Args,
  block_utility::BlockUtility,
  deferred::Reported,
  runtime::Runtime,
  value::Value,
};
use log::warn;

pub fn register(runtime: &mut Runtime) {
  runtime.register_primitive("data_variable", get_variable);
  runtime.register_primitive("data_setvariableto", set_variable_to);
  runtime.register_primitive("data_changevariableby", change_variable_by);
}

fn variable_ref(args: &Args) -> Option<(String, String)> {
  let (id, name) = args.reference("VARIABLE")?;
  Some((id.unwrap_or(name).to_string(), name.to_string()))
}

fn get_variable(args: &Args, util: &mut BlockUtility) -> Reported {
  let Some((id, name)) = variable_ref(args) else {
    return Reported::none();
  };
  match util.lookup_or_create_variable(&id, &name) {
    Some(variable) => variable.value.clone().into(),
    None => {
      warn!("No target to hold variable {name}");
      Reported::none()
    }
  }
}

fn set_variable_to(args: &Args, util: &mut BlockUtility) -> Reported {
  let Some((id, name)) = variable_ref(args) else {
    return Reported::none();
  };
  let value = args
    .value("VALUE")
    .cloned()
    .unwrap_or_else(|| Value::String(String::new()));
  if let Some(variable) = util.lookup_or_create_variable(&id, &name) {
    variable.value = value;
  }
  Reported::none()
}

fn change_variable_by(args: &Args, util: &mut BlockUtility) -> Reported {
  let Some((id, name)) = variable_ref(args) else {
    return Reported::none();
  };
  let delta = args.number("VALUE");
  if let Some(variable) = util.lookup_or_create_variable(&id, &name) {
    variable.value = Value::Number(variable.value.to_f64() + delta);
  }
  Reported::none()
}
