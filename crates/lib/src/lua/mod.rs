//! Lua runtime for task units.
//!
//! Task units are Lua files that declare tasks by calling
//! `renconstruct.register(name, class)`. This module owns the Lua state,
//! loads units in isolated environments and adapts registered class tables to
//! the [`TaskClass`](crate::task::TaskClass) contract.
//!
//! # Submodules
//!
//! - [`loaders`] - isolated unit loading
//! - [`runtime`] - the Lua state and the `renconstruct` global
//! - [`task`] - Lua-backed task classes and instances

pub mod loaders;
pub mod runtime;
pub mod task;

use thiserror::Error;

pub use runtime::{Registration, TaskRuntime};
pub use task::LuaTaskClass;

/// A Lua error reduced to its rendered message.
///
/// `mlua::Error` is neither `Send` nor `Sync` without mlua's `send` feature,
/// which the `Rc`-backed userdata rules out. Errors leaving the Lua layer
/// carry this instead so callers can hand them to `anyhow` or across threads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
  message: String,
}

impl ScriptError {
  pub fn message(&self) -> &str {
    &self.message
  }
}

impl From<mlua::Error> for ScriptError {
  fn from(err: mlua::Error) -> Self {
    Self {
      message: err.to_string(),
    }
  }
}
