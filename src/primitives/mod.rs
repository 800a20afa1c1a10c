//! A small standard library of block implementations.

pub mod control;
pub mod data;
pub mod event;
pub mod looks;
pub mod operators;

use crate::runtime::Runtime;

pub fn register_all(runtime: &mut Runtime) {
  control::register(runtime);
  data::register(runtime);
  event::register(runtime);
  looks::register(runtime);
  operators::register(runtime);
}
