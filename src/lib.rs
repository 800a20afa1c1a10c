pub mod args;
pub mod block;
pub mod block_utility;
pub mod deferred;
pub mod error;
pub mod execute;
pub mod json;
pub mod primitives;
pub mod profiler;
pub mod project;
pub mod runtime;
pub mod sequencer;
pub mod target;
pub mod thread;
pub mod value;
