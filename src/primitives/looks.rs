use crate::{
  args::Args,
  block_utility::BlockUtility,
  deferred::Reported,
  runtime::{Runtime, RuntimeEvent},
};
use log::info;

pub fn register(runtime: &mut Runtime) {
  runtime.register_primitive("looks_say", say);
  runtime.register_primitive("looks_think", say);
}

fn say(args: &Args, util: &mut BlockUtility) -> Reported {
  let message = args.string("MESSAGE");
  let target = util.target_name();
  info!("{target}: {message}");
  util.runtime().emit(RuntimeEvent::Say { target, message });
  Reported::none()
}
