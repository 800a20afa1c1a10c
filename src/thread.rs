use crate::{block::Blocks, deferred::DeferredId, value::Value};
use derivative::Derivative;
use std::{collections::HashMap, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Running,
  /// Suspended until a deferred result settles. The sequencer must not
  /// step the thread in this state.
  PromiseWait,
  Yield,
  Done,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StackFrame {
  pub reported: HashMap<String, Option<Value>>,
  pub waiting_reporter: Option<String>,
  pub is_loop: bool,
  pub loop_counter: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReportSite {
  pub block_id: String,
  pub frame_index: usize,
  pub opcode: String,
  pub is_hat: bool,
  pub is_edge_activated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Awaiting {
  pub deferred: DeferredId,
  pub site: ReportSite,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Thread {
  stack: Vec<String>,
  stack_frames: Vec<StackFrame>,
  pub status: Status,
  pub top_block: Option<String>,
  pub target_id: Option<String>,
  #[derivative(Debug = "ignore")]
  pub blocks: Rc<Blocks>,
  pub stack_click: bool,
  pub update_monitor: bool,
  pub request_script_glow_in_frame: bool,
  pub just_reported: Option<Value>,
  pub(crate) awaiting: Option<Awaiting>,
}

impl Thread {
  pub fn new(top_block: impl Into<String>, blocks: Rc<Blocks>) -> Self {
    let top_block = top_block.into();
    let mut thread = Thread {
      stack: Vec::new(),
      stack_frames: Vec::new(),
      status: Status::Running,
      top_block: Some(top_block.clone()),
      target_id: None,
      blocks,
      stack_click: false,
      update_monitor: false,
      request_script_glow_in_frame: false,
      just_reported: None,
      awaiting: None,
    };
    thread.push_stack(top_block);
    thread
  }

  pub fn for_target(mut self, target_id: impl Into<String>) -> Self {
    self.target_id = Some(target_id.into());
    self
  }

  pub fn push_stack(&mut self, block_id: impl Into<String>) {
    self.stack.push(block_id.into());
    self.stack_frames.push(StackFrame::default());
  }

  pub fn pop_stack(&mut self) -> Option<String> {
    self.stack_frames.pop();
    self.stack.pop()
  }

  pub fn peek_stack(&self) -> Option<&str> {
    self.stack.last().map(String::as_str)
  }

  pub fn peek_stack_frame(&self) -> Option<&StackFrame> {
    self.stack_frames.last()
  }

  pub fn peek_stack_frame_mut(&mut self) -> Option<&mut StackFrame> {
    self.stack_frames.last_mut()
  }

  pub fn frame(&self, index: usize) -> Option<&StackFrame> {
    self.stack_frames.get(index)
  }

  pub(crate) fn frame_mut(&mut self, index: usize) -> Option<&mut StackFrame> {
    self.stack_frames.get_mut(index)
  }

  pub fn stack(&self) -> &[String] {
    &self.stack
  }

  pub fn go_to_next_block(&mut self) -> bool {
    let next = self
      .peek_stack()
      .and_then(|block_id| self.blocks.get_next_block(block_id));
    match next {
      Some(next) => {
        if let Some(top) = self.stack.last_mut() {
          *top = next;
        }
        if let Some(frame) = self.stack_frames.last_mut() {
          *frame = StackFrame::default();
        }
        true
      }
      None => {
        self.pop_stack();
        false
      }
    }
  }

  pub fn push_reported_value(&mut self, frame_index: usize, value: Option<Value>) {
    let parent = frame_index
      .checked_sub(1)
      .and_then(|parent| self.stack_frames.get_mut(parent));
    match parent {
      Some(parent) => {
        if let Some(input) = parent.waiting_reporter.clone() {
          parent.reported.insert(input, value);
        }
      }
      None => self.just_reported = value,
    }
  }

  pub fn is_awaiting(&self, deferred: DeferredId) -> bool {
    self
      .awaiting
      .as_ref()
      .is_some_and(|awaiting| awaiting.deferred == deferred)
  }

  pub(crate) fn retire(&mut self) {
    self.stack.clear();
    self.stack_frames.clear();
    self.request_script_glow_in_frame = false;
    self.awaiting = None;
    self.status = Status::Done;
  }
}
