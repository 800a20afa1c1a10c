//! Results that are not available when a primitive returns.

use crate::value::Value;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::debug;

pub type DeferredId = u64;

#[derive(Debug, PartialEq)]
pub enum Reported {
  Immediate(Option<Value>),
  Deferred(Deferred),
}

impl Reported {
  pub fn none() -> Self {
    Reported::Immediate(None)
  }
}

impl Default for Reported {
  fn default() -> Self {
    Reported::none()
  }
}

impl From<Value> for Reported {
  fn from(value: Value) -> Self {
    Reported::Immediate(Some(value))
  }
}

impl From<f64> for Reported {
  fn from(number: f64) -> Self {
    Value::Number(number).into()
  }
}

impl From<bool> for Reported {
  fn from(boolean: bool) -> Self {
    Value::Bool(boolean).into()
  }
}

impl From<String> for Reported {
  fn from(string: String) -> Self {
    Value::String(string).into()
  }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Deferred {
  id: DeferredId,
}

impl Deferred {
  pub fn id(&self) -> DeferredId {
    self.id
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
  pub id: DeferredId,
  pub outcome: Result<Option<Value>, String>,
}

/// Settles one deferred result. Consumed on use, so a result settles once.
#[derive(Debug)]
pub struct Resolver {
  id: DeferredId,
  sender: Sender<Settlement>,
}

impl Resolver {
  pub fn id(&self) -> DeferredId {
    self.id
  }

  pub fn resolve(self, value: Option<Value>) {
    self.settle(Ok(value));
  }

  pub fn reject(self, reason: impl Into<String>) {
    self.settle(Err(reason.into()));
  }

  fn settle(self, outcome: Result<Option<Value>, String>) {
    if self
      .sender
      .send(Settlement {
        id: self.id,
        outcome,
      })
      .is_err()
    {
      debug!("Runtime gone before deferred {} settled", self.id);
    }
  }
}

#[derive(Debug)]
pub struct Settlements {
  next_id: DeferredId,
  sender: Sender<Settlement>,
  receiver: Receiver<Settlement>,
}

impl Default for Settlements {
  fn default() -> Self {
    let (sender, receiver) = unbounded();
    Settlements {
      next_id: 0,
      sender,
      receiver,
    }
  }
}

impl Settlements {
  pub fn defer(&mut self) -> (Deferred, Resolver) {
    self.next_id += 1;
    let id = self.next_id;
    (
      Deferred { id },
      Resolver {
        id,
        sender: self.sender.clone(),
      },
    )
  }

  pub fn drain(&self) -> Vec<Settlement> {
    self.receiver.try_iter().collect()
  }
}
