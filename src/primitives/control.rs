use crate::{args::Args, block_utility::BlockUtility, deferred::Reported, runtime::Runtime};
use log::warn;
use std::{thread, time::Duration};

pub fn register(runtime: &mut Runtime) {
  runtime.register_primitive("control_repeat", repeat);
  runtime.register_primitive("control_repeat_until", repeat_until);
  runtime.register_primitive("control_forever", forever);
  runtime.register_primitive("control_if", if_);
  runtime.register_primitive("control_if_else", if_else);
  runtime.register_primitive("control_wait_until", wait_until);
  runtime.register_primitive("control_wait", wait);
  runtime.register_primitive("control_stop", stop);
}

fn repeat(args: &Args, util: &mut BlockUtility) -> Reported {
  // `as` saturates; negative counts run zero times.
  let times = args.number("TIMES").round().max(0.) as i64;
  let Some(frame) = util.stack_frame() else {
    return Reported::none();
  };
  let remaining = frame.loop_counter.get_or_insert(times);
  *remaining = remaining.saturating_sub(1);
  if *remaining >= 0 {
    util.start_branch(1, true);
  }
  Reported::none()
}

fn repeat_until(args: &Args, util: &mut BlockUtility) -> Reported {
  if !args.boolean("CONDITION") {
    util.start_branch(1, true);
  }
  Reported::none()
}

fn forever(_args: &Args, util: &mut BlockUtility) -> Reported {
  util.start_branch(1, true);
  Reported::none()
}

fn if_(args: &Args, util: &mut BlockUtility) -> Reported {
  if args.boolean("CONDITION") {
    util.start_branch(1, false);
  }
  Reported::none()
}

fn if_else(args: &Args, util: &mut BlockUtility) -> Reported {
  let branch = if args.boolean("CONDITION") { 1 } else { 2 };
  util.start_branch(branch, false);
  Reported::none()
}

fn wait_until(args: &Args, util: &mut BlockUtility) -> Reported {
  if !args.boolean("CONDITION") {
    util.yield_tick();
  }
  Reported::none()
}

/// Suspends the thread on a deferred result settled by a timer thread.
fn wait(args: &Args, util: &mut BlockUtility) -> Reported {
  let seconds = args.number("DURATION").max(0.);
  let (deferred, resolver) = util.defer();
  match Duration::try_from_secs_f64(seconds) {
    Ok(duration) => {
      thread::spawn(move || {
        thread::sleep(duration);
        resolver.resolve(None);
      });
    }
    Err(err) => {
      warn!("Cannot wait {seconds} seconds: {err}");
      resolver.resolve(None);
    }
  }
  Reported::Deferred(deferred)
}

fn stop(args: &Args, util: &mut BlockUtility) -> Reported {
  match args.string("STOP_OPTION").as_str() {
    "all" | "this script" => util.stop_this_script(),
    _ => {}
  }
  Reported::none()
}
