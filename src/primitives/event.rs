use crate::{
  args::Args,
  block_utility::BlockUtility,
  deferred::Reported,
  execute::BROADCAST_OPTION,
  runtime::{Runtime, RuntimeEvent},
};

pub fn register(runtime: &mut Runtime) {
  runtime.register_hat("event_whenflagclicked", false);
  runtime.register_hat("event_whenbroadcastreceived", false);
  runtime.register_hat("event_whengreaterthan", true);
  runtime.register_primitive("event_whengreaterthan", when_greater_than);
  runtime.register_primitive("event_broadcast", broadcast);
  runtime.register_primitive("event_broadcastandwait", broadcast);
}

/// Edge-activated: fires when the sensor first rises above `VALUE`.
fn when_greater_than(args: &Args, util: &mut BlockUtility) -> Reported {
  let value = args.number("VALUE");
  let sensor = match args.string("WHENGREATERTHANMENU").to_lowercase().as_str() {
    "timer" => util.runtime().timer_seconds(),
    _ => -1.,
  };
  (sensor > value).into()
}

fn broadcast(args: &Args, util: &mut BlockUtility) -> Reported {
  if let Some((id, name)) = args.reference(BROADCAST_OPTION) {
    let event = RuntimeEvent::Broadcast {
      id: id.map(str::to_owned),
      name: name.to_string(),
    };
    util.runtime().emit(event);
  }
  Reported::none()
}
