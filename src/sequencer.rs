use crate::{execute::{execute, settle}, runtime::Runtime, thread::{Status, Thread}};
use log::debug;

#[derive(Debug, Default)]
pub struct Sequencer {
  pub runtime: Runtime,
}

impl Sequencer {
  pub fn new(runtime: Runtime) -> Self {
    Sequencer { runtime }
  }

  pub fn retire_thread(&mut self, thread: &mut Thread) {
    debug!("Retiring thread for {:?}", thread.top_block);
    thread.retire();
  }

  /// Enters the `branch_num`th C-slot of the block on top of the stack. An
  /// empty loop body gives up the tick instead of spinning.
  pub fn step_to_branch(&mut self, thread: &mut Thread, branch_num: usize, is_loop: bool) {
    let Some(current) = thread.peek_stack().map(str::to_owned) else {
      return;
    };
    let branch = thread.blocks.get_branch(&current, branch_num.max(1));
    if let Some(frame) = thread.peek_stack_frame_mut() {
      frame.is_loop = is_loop;
    }
    match branch {
      Some(branch) => thread.push_stack(branch),
      None if is_loop => thread.status = Status::Yield,
      None => {}
    }
  }

  pub fn step_thread(&mut self, thread: &mut Thread) {
    match thread.status {
      Status::PromiseWait | Status::Done => return,
      Status::Yield => thread.status = Status::Running,
      Status::Running => {}
    }
    loop {
      let Some(current) = thread.peek_stack().map(str::to_owned) else {
        thread.status = Status::Done;
        return;
      };
      execute(self, thread);
      match thread.status {
        Status::Running => {}
        Status::Yield => {
          thread.status = Status::Running;
          return;
        }
        Status::PromiseWait | Status::Done => return,
      }
      if thread.peek_stack() != Some(current.as_str()) {
        // Control flow moved into a branch.
        continue;
      }
      while !thread.go_to_next_block() {
        let Some(frame) = thread.peek_stack_frame() else {
          thread.status = Status::Done;
          return;
        };
        if frame.is_loop || frame.waiting_reporter.is_some() {
          return;
        }
      }
    }
  }

  /// Resumes threads whose deferred results have settled. Returns how many
  /// settlements were applied.
  pub fn resume_settled(&mut self, threads: &mut [Thread]) -> usize {
    let mut applied = 0;
    for settlement in self.runtime.settlements.drain() {
      match threads
        .iter_mut()
        .find(|thread| thread.is_awaiting(settlement.id))
      {
        Some(thread) => {
          settle(self, thread, settlement);
          applied += 1;
        }
        None => debug!("No thread waiting on deferred {}", settlement.id),
      }
    }
    applied
  }

  pub fn step_threads(&mut self, threads: &mut Vec<Thread>) {
    self.resume_settled(threads);
    for thread in threads.iter_mut() {
      self.step_thread(thread);
    }
    threads.retain(|thread| thread.status != Status::Done);
  }
}
