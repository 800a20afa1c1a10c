use crate::{
  deferred::{Deferred, Resolver},
  runtime::Runtime,
  sequencer::Sequencer,
  target::{Target, Variable},
  thread::{StackFrame, Status, Thread},
  value::Value,
};

pub struct BlockUtility<'a> {
  pub sequencer: &'a mut Sequencer,
  pub thread: &'a mut Thread,
}

impl<'a> BlockUtility<'a> {
  pub fn new(sequencer: &'a mut Sequencer, thread: &'a mut Thread) -> Self {
    BlockUtility { sequencer, thread }
  }

  pub fn runtime(&mut self) -> &mut Runtime {
    &mut self.sequencer.runtime
  }

  pub fn thread(&mut self) -> &mut Thread {
    &mut *self.thread
  }

  pub fn stack_frame(&mut self) -> Option<&mut StackFrame> {
    self.thread.peek_stack_frame_mut()
  }

  pub fn start_branch(&mut self, branch_num: usize, is_loop: bool) {
    self.sequencer.step_to_branch(self.thread, branch_num, is_loop);
  }

  pub fn yield_tick(&mut self) {
    self.thread.status = Status::Yield;
  }

  pub fn defer(&mut self) -> (Deferred, Resolver) {
    self.sequencer.runtime.defer()
  }

  pub fn stop_this_script(&mut self) {
    self.sequencer.retire_thread(self.thread);
  }

  pub fn target(&self) -> Option<&Target> {
    let target_id = self.thread.target_id.as_deref()?;
    self.sequencer.runtime.get_target_by_id(target_id)
  }

  pub fn target_name(&self) -> String {
    self
      .target()
      .map(|target| target.get_name().to_string())
      .unwrap_or_default()
  }

  pub fn lookup_variable(&self, id: &str, name: &str) -> Option<&Variable> {
    let runtime = &self.sequencer.runtime;
    self
      .target()
      .and_then(|target| target.lookup_variable(id, name))
      .or_else(|| runtime.stage().and_then(|stage| stage.lookup_variable(id, name)))
  }

  /// Finds a variable on the thread's target, then on the stage, creating it
  /// on the target when neither has it.
  pub fn lookup_or_create_variable(&mut self, id: &str, name: &str) -> Option<&mut Variable> {
    let runtime = &mut self.sequencer.runtime;
    let target_id = self.thread.target_id.clone();
    let owner = target_id
      .as_deref()
      .filter(|target_id| {
        runtime
          .get_target_by_id(target_id)
          .is_some_and(|target| target.lookup_variable(id, name).is_some())
      })
      .map(str::to_owned)
      .or_else(|| {
        runtime
          .stage()
          .filter(|stage| stage.lookup_variable(id, name).is_some())
          .map(|stage| stage.id.clone())
      });
    match owner {
      Some(owner) => runtime
        .get_target_by_id_mut(&owner)?
        .lookup_variable_mut(id, name),
      None => {
        let target = match target_id {
          Some(target_id) => runtime.get_target_by_id_mut(&target_id),
          None => runtime.stage_mut(),
        }?;
        Some(target.variables.entry(id.to_string()).or_insert(Variable {
          name: name.to_string(),
          value: Value::Number(0.),
        }))
      }
    }
  }
}
