//! Architecture-independent port contract
//!
//! Frame building, the context-switch state machine, interrupt nesting,
//! hooks, redzones, timestamps, critical sections and the debug channel.

pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod ctx;
pub mod dcc;
pub mod error;
pub mod frame;
pub mod hooks;
pub mod kernel;
pub mod nesting;
pub mod redzone;
pub mod task;
pub mod ts;
pub mod types;
