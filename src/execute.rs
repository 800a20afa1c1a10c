//! Evaluates the block on top of a thread's stack.
//!
//! Reporter inputs are resolved depth first by pushing them onto the same
//! stack, so a reporter that hands back a deferred result suspends the whole
//! thread in place. When the thread is resumed and re-enters the parent
//! block, inputs already in the parent frame's `reported` map are not
//! evaluated again.

use crate::{
  args::{Arg, Args, MUTATION_KEY},
  block::{Block, Blocks, Input},
  block_utility::BlockUtility,
  deferred::{Reported, Settlement},
  runtime::{MonitorRecord, Primitive, Runtime},
  sequencer::Sequencer,
  thread::{Awaiting, ReportSite, Status, Thread},
  value::Value,
};
use log::{trace, warn};
use std::rc::Rc;

pub const CUSTOM_BLOCK_INPUT: &str = "custom_block";
pub const BROADCAST_INPUT: &str = "BROADCAST_INPUT";
pub const BROADCAST_OPTION: &str = "BROADCAST_OPTION";

pub const BLOCK_FUNCTION_PROFILER_FRAME: &str = "blockFunction";

pub fn execute(sequencer: &mut Sequencer, thread: &mut Thread) {
  let Some(current_block_id) = thread.peek_stack().map(str::to_owned) else {
    return;
  };
  let frame_index = thread.stack().len() - 1;

  let Some((block, container)) = lookup_block(sequencer, thread, &current_block_id) else {
    // The script no longer exists.
    sequencer.retire_thread(thread);
    return;
  };

  let info = sequencer.runtime.opcode_info(&block.opcode);
  let site = ReportSite {
    block_id: current_block_id,
    frame_index,
    opcode: block.opcode.clone(),
    is_hat: info.is_hat,
    is_edge_activated: info.is_edge_activated,
  };

  let Some(primitive) = info.primitive.clone() else {
    if info.is_hat {
      // A hat without a predicate always fires.
      return;
    }
    if block.shadow {
      let value = container.get_shadow_value(&block);
      handle_report(sequencer, thread, value, &site);
    } else {
      warn!("Could not get implementation for opcode: {}", block.opcode);
    }
    thread.request_script_glow_in_frame = true;
    return;
  };

  let mut args = Args::new();
  match container.get_id_name_field(&block) {
    Some(field) => args.insert(
      field.name.clone(),
      Arg::Reference {
        id: field.id.clone(),
        name: field.value.to_string(),
      },
    ),
    None => {
      for field in &block.fields {
        args.insert(field.name.clone(), Arg::Value(field.value.clone()));
      }
    }
  }

  for input in container.get_inputs(&block) {
    if input.name == CUSTOM_BLOCK_INPUT {
      continue;
    }
    if let Some(input_block) = &input.block {
      let resolved = thread
        .frame(frame_index)
        .is_some_and(|frame| frame.reported.contains_key(&input.name));
      if !resolved {
        thread.push_stack(input_block.clone());
        if let Some(frame) = thread.frame_mut(frame_index) {
          frame.waiting_reporter = Some(input.name.clone());
        }
        execute(sequencer, thread);
        if matches!(thread.status, Status::PromiseWait | Status::Done) {
          // Resumption re-enters this block with `reported` as it is now.
          return;
        }
        if let Some(frame) = thread.frame_mut(frame_index) {
          frame.waiting_reporter = None;
        }
        thread.pop_stack();
      }
    }
    let input_value = thread
      .frame(frame_index)
      .and_then(|frame| frame.reported.get(&input.name))
      .cloned()
      .flatten();
    if input.name == BROADCAST_INPUT {
      if let Some(option) = broadcast_option(&container, input, input_value) {
        args.insert(BROADCAST_OPTION, option);
      }
    } else if let Some(value) = input_value {
      args.insert(input.name.clone(), Arg::Value(value));
    }
  }

  if let Some(mutation) = &block.mutation {
    args.insert(MUTATION_KEY, Arg::Mutation(mutation.clone()));
  }

  // Fresh inputs for the next time this position runs (loop, branch return).
  if let Some(frame) = thread.frame_mut(frame_index) {
    frame.reported.clear();
  }

  trace!("Executing {} ({})", site.block_id, block.opcode);
  match invoke(sequencer, thread, &primitive, &args, &block.opcode) {
    Reported::Immediate(value) => {
      if value.is_none() {
        thread.request_script_glow_in_frame = true;
      }
      if thread.status == Status::Running {
        handle_report(sequencer, thread, value, &site);
      }
    }
    Reported::Deferred(deferred) => {
      if thread.status == Status::Done {
        return;
      }
      if thread.status == Status::Running {
        thread.status = Status::PromiseWait;
      }
      thread.awaiting = Some(Awaiting {
        deferred: deferred.id(),
        site,
      });
    }
  }
}

fn lookup_block(
  sequencer: &Sequencer,
  thread: &Thread,
  block_id: &str,
) -> Option<(Rc<Block>, Rc<Blocks>)> {
  if let Some(block) = thread.blocks.get_block(block_id) {
    return Some((block, Rc::clone(&thread.blocks)));
  }
  let flyout = &sequencer.runtime.flyout_blocks;
  flyout
    .get_block(block_id)
    .map(|block| (block, Rc::clone(flyout)))
}

fn broadcast_option(container: &Blocks, input: &Input, value: Option<Value>) -> Option<Arg> {
  if input.block == input.shadow {
    let shadow = container.get_block(input.shadow.as_deref()?)?;
    let field = shadow.field(BROADCAST_OPTION)?;
    Some(Arg::Reference {
      id: field.id.clone(),
      name: field.value.to_string(),
    })
  } else {
    Some(Arg::Reference {
      id: None,
      name: value.map(|value| value.to_string()).unwrap_or_default(),
    })
  }
}

fn invoke(
  sequencer: &mut Sequencer,
  thread: &mut Thread,
  primitive: &Primitive,
  args: &Args,
  opcode: &str,
) -> Reported {
  let runtime = &mut sequencer.runtime;
  if let Some(profiler) = runtime.profiler.as_mut() {
    let id = *runtime
      .block_function_profiler_id
      .get_or_insert_with(|| profiler.id_by_name(BLOCK_FUNCTION_PROFILER_FRAME));
    profiler.start(id, opcode);
  }
  let reported = {
    let mut util = BlockUtility::new(sequencer, thread);
    primitive(args, &mut util)
  };
  if let Some(profiler) = sequencer.runtime.profiler.as_mut() {
    profiler.stop();
  }
  reported
}

fn handle_report(
  sequencer: &mut Sequencer,
  thread: &mut Thread,
  value: Option<Value>,
  site: &ReportSite,
) {
  thread.push_reported_value(site.frame_index, value.clone());
  if !site.is_hat {
    if let Some(value) = &value {
      let at_top = thread.top_block.is_some() && thread.top_block.as_deref() == thread.peek_stack();
      if at_top {
        if thread.stack_click {
          sequencer.runtime.visual_report(&site.block_id, value);
        }
        if thread.update_monitor && !update_monitor(&mut sequencer.runtime, &site.block_id, value) {
          return;
        }
      }
    }
    thread.status = Status::Running;
  } else if site.is_edge_activated {
    // A click always runs the script; edge tracking only applies to events.
    if !thread.stack_click {
      let new_value = value.as_ref().is_some_and(Value::is_truthy);
      let old_value = sequencer
        .runtime
        .update_edge_activated_value(&site.block_id, new_value);
      if old_value || !new_value {
        sequencer.retire_thread(thread);
      }
    }
  } else if !value.as_ref().is_some_and(Value::is_truthy) {
    sequencer.retire_thread(thread);
  }
}

/// Returns false when the monitor's target has been deleted.
fn update_monitor(runtime: &mut Runtime, block_id: &str, value: &Value) -> bool {
  let target_id = runtime
    .monitor_blocks
    .get_block(block_id)
    .and_then(|block| block.target_id.clone());
  let sprite_name = match target_id {
    Some(target_id) => match runtime.get_target_by_id(&target_id) {
      Some(target) => Some(target.get_name().to_string()),
      None => return false,
    },
    None => None,
  };
  runtime.request_update_monitor(MonitorRecord {
    id: block_id.to_string(),
    sprite_name,
    value: value.to_string(),
  });
  true
}

pub(crate) fn settle(sequencer: &mut Sequencer, thread: &mut Thread, settlement: Settlement) {
  if !thread.is_awaiting(settlement.id) {
    return;
  }
  let Some(Awaiting { site, .. }) = thread.awaiting.take() else {
    return;
  };
  match settlement.outcome {
    Ok(value) => {
      let finished_command = value.is_none();
      handle_report(sequencer, thread, value, &site);
      if finished_command {
        // Unwind to the next block to run, stopping at a loop so its body
        // can iterate again.
        while let Some(popped) = thread.pop_stack() {
          if let Some(next) = thread.blocks.get_next_block(&popped) {
            thread.push_stack(next);
            break;
          }
          if thread.peek_stack_frame().map_or(true, |frame| frame.is_loop) {
            break;
          }
        }
      } else {
        thread.pop_stack();
        if let Some(parent) = thread.peek_stack_frame_mut() {
          parent.waiting_reporter = None;
        }
      }
    }
    Err(reason) => {
      warn!("{} ({}) rejected: {reason}", site.block_id, site.opcode);
      thread.status = Status::Running;
      thread.pop_stack();
      if let Some(parent) = thread.peek_stack_frame_mut() {
        parent.waiting_reporter = None;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    block::Mutation,
    deferred::Resolver,
    profiler::ProfilerRecord,
    runtime::RuntimeEvent,
    target::Target,
  };
  use std::{cell::{Cell, RefCell}, collections::BTreeMap};

  fn blocks(list: Vec<Block>) -> Rc<Blocks> {
    let blocks = Blocks::new();
    for block in list {
      blocks.create_block(block);
    }
    Rc::new(blocks)
  }

  fn recorder(sequencer: &mut Sequencer, opcode: &str) -> Rc<RefCell<Vec<Args>>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    sequencer.runtime.register_primitive(opcode, move |args, _util| {
      sink.borrow_mut().push(args.clone());
      Reported::none()
    });
    calls
  }

  fn deferring(
    sequencer: &mut Sequencer,
    opcode: &str,
  ) -> (Rc<Cell<u32>>, Rc<RefCell<Option<Resolver>>>) {
    let count = Rc::new(Cell::new(0));
    let parked = Rc::new(RefCell::new(None));
    let (counter, slot) = (Rc::clone(&count), Rc::clone(&parked));
    sequencer.runtime.register_primitive(opcode, move |_args, util| {
      counter.set(counter.get() + 1);
      let (deferred, resolver) = util.defer();
      *slot.borrow_mut() = Some(resolver);
      Reported::Deferred(deferred)
    });
    (count, parked)
  }

  fn take(parked: &Rc<RefCell<Option<Resolver>>>) -> Resolver {
    parked.borrow_mut().take().expect("primitive did not defer")
  }

  #[test]
  fn hat_without_predicate_is_a_no_op() {
    let mut sequencer = Sequencer::default();
    sequencer.runtime.register_hat("event_whenflagclicked", false);
    let mut thread = Thread::new(
      "hat",
      blocks(vec![Block::new("hat", "event_whenflagclicked").as_top_level()]),
    );
    execute(&mut sequencer, &mut thread);
    assert_eq!(thread.status, Status::Running);
    assert_eq!(thread.stack(), ["hat".to_string()]);
    assert!(!thread.request_script_glow_in_frame);
  }

  #[test]
  fn shadow_literals_become_arguments() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "looks_say");
    let mut thread = Thread::new(
      "say",
      blocks(vec![
        Block::new("say", "looks_say").with_shadow_input("MESSAGE", "text"),
        Block::new("text", "text").with_field("TEXT", "hello").as_shadow(),
      ]),
    );
    execute(&mut sequencer, &mut thread);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].string("MESSAGE"), "hello");
    assert_eq!(thread.stack(), ["say".to_string()]);
    assert_eq!(thread.peek_stack_frame().unwrap().waiting_reporter, None);
  }

  #[test]
  fn reporter_values_land_in_the_parent_frame() {
    let mut sequencer = Sequencer::default();
    sequencer
      .runtime
      .register_primitive("answer", |_args, _util| Reported::from(42.));
    let mut thread = Thread::new("say", Rc::default());
    thread.peek_stack_frame_mut().unwrap().waiting_reporter = Some("MESSAGE".into());
    thread.push_stack("r");
    thread.blocks = blocks(vec![
      Block::new("say", "looks_say").with_input("MESSAGE", "r"),
      Block::new("r", "answer"),
    ]);
    execute(&mut sequencer, &mut thread);
    assert_eq!(thread.status, Status::Running);
    assert_eq!(
      thread.frame(0).unwrap().reported.get("MESSAGE"),
      Some(&Some(Value::Number(42.)))
    );
  }

  #[test]
  fn edge_activated_hats_fire_on_rising_edges() {
    let mut sequencer = Sequencer::default();
    sequencer.runtime.register_hat("sensor_above", true);
    let readings = Rc::new(RefCell::new(vec![true, false, true, true, false]));
    let source = Rc::clone(&readings);
    sequencer.runtime.register_primitive("sensor_above", move |_args, _util| {
      source.borrow_mut().pop().unwrap_or(false).into()
    });
    let script = blocks(vec![Block::new("hat", "sensor_above").as_top_level()]);
    let fired: Vec<bool> = (0..5)
      .map(|_| {
        let mut thread = Thread::new("hat", Rc::clone(&script));
        execute(&mut sequencer, &mut thread);
        thread.status != Status::Done
      })
      .collect();
    // Readings are popped from the back: false, true, true, false, true.
    assert_eq!(fired, vec![false, true, false, false, true]);
  }

  #[test]
  fn clicked_edge_hats_always_run() {
    let mut sequencer = Sequencer::default();
    sequencer.runtime.register_hat("sensor_above", true);
    sequencer
      .runtime
      .register_primitive("sensor_above", |_args, _util| true.into());
    let script = blocks(vec![Block::new("hat", "sensor_above").as_top_level()]);
    for _ in 0..2 {
      let mut thread = Thread::new("hat", Rc::clone(&script));
      thread.stack_click = true;
      execute(&mut sequencer, &mut thread);
      assert_eq!(thread.status, Status::Running);
    }
  }

  #[test]
  fn predicate_hats_gate_on_truthiness() {
    let mut sequencer = Sequencer::default();
    sequencer.runtime.register_hat("when", false);
    let reading = Rc::new(RefCell::new(Value::from("")));
    let source = Rc::clone(&reading);
    sequencer
      .runtime
      .register_primitive("when", move |_args, _util| source.borrow().clone().into());
    let script = blocks(vec![Block::new("hat", "when").as_top_level()]);
    let mut run = |value: Value| {
      *reading.borrow_mut() = value;
      let mut thread = Thread::new("hat", Rc::clone(&script));
      execute(&mut sequencer, &mut thread);
      thread.status
    };
    assert_eq!(run(Value::from("")), Status::Done);
    assert_eq!(run(Value::Number(0.)), Status::Done);
    assert_eq!(run(Value::from("0")), Status::Running);
    assert_eq!(run(Value::Bool(true)), Status::Running);
  }

  #[test]
  fn deferred_reporter_suspends_and_resumes_once() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "looks_say");
    let (count, parked) = deferring(&mut sequencer, "fetch");
    let mut threads = vec![Thread::new(
      "say",
      blocks(vec![
        Block::new("say", "looks_say").with_input("MESSAGE", "fetch"),
        Block::new("fetch", "fetch"),
      ]),
    )];

    sequencer.step_thread(&mut threads[0]);
    assert_eq!(threads[0].status, Status::PromiseWait);
    assert_eq!(threads[0].stack(), ["say".to_string(), "fetch".to_string()]);
    sequencer.step_thread(&mut threads[0]);
    assert_eq!(count.get(), 1);
    assert!(calls.borrow().is_empty());

    take(&parked).resolve(Some(Value::from("hi")));
    assert_eq!(sequencer.resume_settled(&mut threads), 1);
    assert_eq!(threads[0].status, Status::Running);
    assert_eq!(threads[0].stack(), ["say".to_string()]);
    assert_eq!(threads[0].peek_stack_frame().unwrap().waiting_reporter, None);

    sequencer.step_thread(&mut threads[0]);
    assert_eq!(count.get(), 1);
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(calls.borrow()[0].string("MESSAGE"), "hi");
    assert_eq!(threads[0].status, Status::Done);
  }

  #[test]
  fn resolved_inputs_are_not_evaluated_again_after_resuming() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "b");
    let x_calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&x_calls);
    sequencer.runtime.register_primitive("x", move |_args, _util| {
      counter.set(counter.get() + 1);
      Reported::from(1.)
    });
    let (y_calls, parked) = deferring(&mut sequencer, "y");
    let mut threads = vec![Thread::new(
      "b",
      blocks(vec![
        Block::new("b", "b").with_input("X", "x").with_input("Y", "y"),
        Block::new("x", "x").with_parent("b"),
        Block::new("y", "y").with_parent("b"),
      ]),
    )];

    sequencer.step_thread(&mut threads[0]);
    assert_eq!(threads[0].status, Status::PromiseWait);
    assert_eq!(
      threads[0].frame(0).unwrap().reported.get("X"),
      Some(&Some(Value::Number(1.)))
    );

    take(&parked).resolve(Some(Value::Number(2.)));
    sequencer.resume_settled(&mut threads);
    sequencer.step_thread(&mut threads[0]);

    assert_eq!(x_calls.get(), 1);
    assert_eq!(y_calls.get(), 1);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].number("X"), calls[0].number("Y")), (1., 2.));
    assert_eq!(threads[0].status, Status::Done);
  }

  #[test]
  fn finished_deferred_command_moves_to_the_next_block() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "after");
    let (_, parked) = deferring(&mut sequencer, "pause");
    let mut threads = vec![Thread::new(
      "a",
      blocks(vec![
        Block::new("a", "pause").with_next("b").as_top_level(),
        Block::new("b", "after"),
      ]),
    )];
    sequencer.step_thread(&mut threads[0]);
    assert_eq!(threads[0].status, Status::PromiseWait);

    take(&parked).resolve(None);
    sequencer.resume_settled(&mut threads);
    assert_eq!(threads[0].stack(), ["b".to_string()]);
    sequencer.step_thread(&mut threads[0]);
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(threads[0].status, Status::Done);
  }

  #[test]
  fn finished_deferred_command_stops_at_the_enclosing_loop() {
    let mut sequencer = Sequencer::default();
    sequencer
      .runtime
      .register_primitive("loop", |_args, util| {
        util.start_branch(1, true);
        Reported::none()
      });
    let (count, parked) = deferring(&mut sequencer, "pause");
    let mut threads = vec![Thread::new(
      "loop",
      blocks(vec![
        Block::new("loop", "loop").with_input("SUBSTACK", "a").as_top_level(),
        Block::new("a", "pause").with_parent("loop"),
      ]),
    )];
    sequencer.step_thread(&mut threads[0]);
    assert_eq!(threads[0].stack(), ["loop".to_string(), "a".to_string()]);

    take(&parked).resolve(None);
    sequencer.resume_settled(&mut threads);
    assert_eq!(threads[0].stack(), ["loop".to_string()]);
    assert_eq!(threads[0].status, Status::Running);

    sequencer.step_thread(&mut threads[0]);
    assert_eq!(count.get(), 2);
    assert_eq!(threads[0].status, Status::PromiseWait);
  }

  #[test]
  fn rejection_pops_the_reporter() {
    let mut sequencer = Sequencer::default();
    recorder(&mut sequencer, "looks_say");
    let (_, parked) = deferring(&mut sequencer, "fetch");
    let mut threads = vec![Thread::new(
      "say",
      blocks(vec![
        Block::new("say", "looks_say").with_input("MESSAGE", "fetch"),
        Block::new("fetch", "fetch"),
      ]),
    )];
    sequencer.step_thread(&mut threads[0]);
    take(&parked).reject("offline");
    sequencer.resume_settled(&mut threads);
    assert_eq!(threads[0].status, Status::Running);
    assert_eq!(threads[0].stack(), ["say".to_string()]);
    let frame = threads[0].peek_stack_frame().unwrap();
    assert_eq!(frame.waiting_reporter, None);
    assert!(!frame.reported.contains_key("MESSAGE"));
  }

  #[test]
  fn settlements_for_other_deferreds_are_ignored() {
    let mut sequencer = Sequencer::default();
    let (_, parked) = deferring(&mut sequencer, "pause");
    let mut threads = vec![Thread::new("a", blocks(vec![Block::new("a", "pause")]))];
    sequencer.step_thread(&mut threads[0]);
    let (_, stray) = sequencer.runtime.defer();
    stray.resolve(None);
    assert_eq!(sequencer.resume_settled(&mut threads), 0);
    assert_eq!(threads[0].status, Status::PromiseWait);
    drop(take(&parked));
  }

  #[test]
  fn broadcast_menu_becomes_a_reference() {
    let mut sequencer = Sequencer::default();
    crate::primitives::event::register(&mut sequencer.runtime);
    let mut thread = Thread::new(
      "send",
      blocks(vec![
        Block::new("send", "event_broadcast").with_shadow_input(BROADCAST_INPUT, "menu"),
        Block::new("menu", "event_broadcast_menu")
          .with_reference_field(BROADCAST_OPTION, "message1", "m1")
          .as_shadow(),
      ]),
    );
    execute(&mut sequencer, &mut thread);
    assert_eq!(
      sequencer.runtime.take_events(),
      vec![RuntimeEvent::Broadcast {
        id: Some("m1".to_string()),
        name: "message1".to_string()
      }]
    );
  }

  #[test]
  fn plugged_in_broadcast_uses_the_value_as_name() {
    let mut sequencer = Sequencer::default();
    crate::primitives::event::register(&mut sequencer.runtime);
    sequencer
      .runtime
      .register_primitive("name", |_args, _util| Reported::from(7.));
    let mut thread = Thread::new(
      "send",
      blocks(vec![
        Block::new("send", "event_broadcast").with_input_shadow(
          BROADCAST_INPUT,
          Some("name".to_string()),
          Some("menu".to_string()),
        ),
        Block::new("name", "name"),
        Block::new("menu", "event_broadcast_menu")
          .with_reference_field(BROADCAST_OPTION, "message1", "m1")
          .as_shadow(),
      ]),
    );
    execute(&mut sequencer, &mut thread);
    assert_eq!(
      sequencer.runtime.take_events(),
      vec![RuntimeEvent::Broadcast {
        id: None,
        name: "7".to_string()
      }]
    );
  }

  #[test]
  fn mutation_and_fields_are_passed_along() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "procedures_call");
    let mutation = Mutation {
      tag_name: "mutation".to_string(),
      children: Vec::new(),
      attributes: BTreeMap::from([("proccode".to_string(), serde_json::json!("jump %s"))]),
    };
    let mut thread = Thread::new(
      "call",
      blocks(vec![Block::new("call", "procedures_call")
        .with_field("A", 1.)
        .with_field("B", "two")
        .with_mutation(mutation.clone())]),
    );
    execute(&mut sequencer, &mut thread);
    let calls = calls.borrow();
    assert_eq!(calls[0].mutation(), Some(&mutation));
    assert_eq!(calls[0].number("A"), 1.);
    assert_eq!(calls[0].string("B"), "two");
  }

  #[test]
  fn single_id_field_is_passed_as_a_reference() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "data_hidevariable");
    let mut thread = Thread::new(
      "hide",
      blocks(vec![
        Block::new("hide", "data_hidevariable").with_reference_field("VARIABLE", "score", "v1")
      ]),
    );
    execute(&mut sequencer, &mut thread);
    assert_eq!(
      calls.borrow()[0].reference("VARIABLE"),
      Some((Some("v1"), "score"))
    );
  }

  #[test]
  fn missing_block_retires_the_thread() {
    let mut sequencer = Sequencer::default();
    let mut thread = Thread::new("gone", Rc::default());
    execute(&mut sequencer, &mut thread);
    assert_eq!(thread.status, Status::Done);
    assert!(thread.stack().is_empty());
  }

  #[test]
  fn flyout_blocks_are_found() {
    let mut sequencer = Sequencer::default();
    let calls = recorder(&mut sequencer, "looks_say");
    sequencer
      .runtime
      .flyout_blocks
      .create_block(Block::new("palette", "looks_say"));
    let mut thread = Thread::new("palette", Rc::default());
    execute(&mut sequencer, &mut thread);
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(thread.status, Status::Running);
  }

  #[test]
  fn unknown_opcodes_only_glow() {
    let mut sequencer = Sequencer::default();
    let mut thread = Thread::new("x", blocks(vec![Block::new("x", "extension_mystery")]));
    execute(&mut sequencer, &mut thread);
    assert!(thread.request_script_glow_in_frame);
    assert_eq!(thread.status, Status::Running);
    assert_eq!(thread.stack(), ["x".to_string()]);
  }

  #[test]
  fn top_level_reports_reach_the_host() {
    let mut sequencer = Sequencer::default();
    sequencer
      .runtime
      .register_primitive("answer", |_args, _util| Reported::from(5.));
    sequencer.runtime.add_target(Target::new("cat", "Cat"));
    sequencer
      .runtime
      .monitor_blocks
      .create_block(Block::new("answer", "answer").with_target("cat"));
    let mut thread = Thread::new("answer", blocks(vec![Block::new("answer", "answer")]));
    thread.stack_click = true;
    thread.update_monitor = true;
    execute(&mut sequencer, &mut thread);
    assert_eq!(thread.just_reported, Some(Value::Number(5.)));
    assert_eq!(
      sequencer.runtime.take_events(),
      vec![
        RuntimeEvent::VisualReport {
          block_id: "answer".to_string(),
          value: Value::Number(5.)
        },
        RuntimeEvent::MonitorUpdate(MonitorRecord {
          id: "answer".to_string(),
          sprite_name: Some("Cat".to_string()),
          value: "5".to_string()
        }),
      ]
    );
  }

  #[test]
  fn monitor_of_a_deleted_target_is_skipped() {
    let mut sequencer = Sequencer::default();
    sequencer
      .runtime
      .register_primitive("answer", |_args, _util| Reported::from(5.));
    sequencer
      .runtime
      .monitor_blocks
      .create_block(Block::new("answer", "answer").with_target("cat"));
    let mut thread = Thread::new("answer", blocks(vec![Block::new("answer", "answer")]));
    thread.update_monitor = true;
    execute(&mut sequencer, &mut thread);
    assert!(sequencer.runtime.take_events().is_empty());
  }

  #[test]
  fn profiler_records_each_call() {
    let mut sequencer = Sequencer::default();
    recorder(&mut sequencer, "looks_say");
    sequencer.runtime.enable_profiler();
    let script = blocks(vec![Block::new("say", "looks_say")]);
    for _ in 0..2 {
      execute(&mut sequencer, &mut Thread::new("say", Rc::clone(&script)));
    }
    let profiler = sequencer.runtime.profiler.as_mut().unwrap();
    let id = profiler.id_by_name(BLOCK_FUNCTION_PROFILER_FRAME);
    assert_eq!(profiler.records.len(), 4);
    assert!(matches!(
      &profiler.records[0],
      ProfilerRecord::Start { id: frame, arg, .. } if *frame == id && arg == "looks_say"
    ));
    assert_eq!(profiler.summary(id)["looks_say"].calls, 2);
  }
}
