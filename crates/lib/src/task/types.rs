//! Task contract types.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

use crate::context::{BuildContext, OnBuilds};
use crate::lua::ScriptError;

/// The configuration subset handed to a single task.
pub type TaskConfig = serde_json::Map<String, serde_json::Value>;

/// A named point in the build pipeline at which tasks are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  PreBuild,
  PostBuild,
}

impl Stage {
  /// All stages in pipeline order.
  pub const ALL: [Stage; 2] = [Stage::PreBuild, Stage::PostBuild];

  /// Name of the hook a task implements for this stage.
  pub fn hook_name(self) -> &'static str {
    match self {
      Stage::PreBuild => "pre_build",
      Stage::PostBuild => "post_build",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.hook_name())
  }
}

/// Errors raised by task implementations.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("lua error: {0}")]
  Lua(#[from] ScriptError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("{0}")]
  Message(String),
}

impl TaskError {
  pub fn msg(message: impl Into<String>) -> Self {
    TaskError::Message(message.into())
  }
}

impl From<mlua::Error> for TaskError {
  fn from(err: mlua::Error) -> Self {
    TaskError::Lua(err.into())
  }
}

/// A constructible task implementation.
///
/// This is what a unit registers: the class-level half of a task. It may
/// check its configuration before anything runs and produces one [`Task`]
/// per build run.
pub trait TaskClass {
  /// Check and optionally rewrite the task's configuration subset.
  ///
  /// Called for every task before any task is instantiated. The default
  /// accepts the subset unchanged.
  fn validate_config(&self, config: TaskConfig) -> Result<TaskConfig, TaskError> {
    Ok(config)
  }

  /// Construct the task for one build run.
  fn instantiate(&self, config: TaskConfig, ctx: &BuildContext) -> Result<Box<dyn Task>, TaskError>;
}

/// A live task instance for a single build run.
pub trait Task {
  /// Whether this task has a hook for `stage`.
  fn implements(&self, stage: Stage) -> bool;

  /// Invoke the hook for `stage`.
  ///
  /// Only called when [`Task::implements`] returned true for that stage.
  fn run(&mut self, stage: Stage, on_builds: &OnBuilds) -> Result<(), TaskError>;
}

/// A discovered task implementation.
#[derive(Clone)]
pub struct TaskDescriptor {
  /// Name the task was registered under, suffix included.
  pub declared_name: String,
  /// Configuration key derived from `declared_name`.
  pub slug: String,
  /// Unit file the task was registered from; `None` for native tasks.
  pub source: Option<PathBuf>,
  pub class: Rc<dyn TaskClass>,
}

impl fmt::Debug for TaskDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskDescriptor")
      .field("declared_name", &self.declared_name)
      .field("slug", &self.slug)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

/// Serializable summary of a descriptor, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
  pub name: String,
  pub slug: String,
  pub source: Option<PathBuf>,
}

impl From<&TaskDescriptor> for TaskSummary {
  fn from(desc: &TaskDescriptor) -> Self {
    TaskSummary {
      name: desc.declared_name.clone(),
      slug: desc.slug.clone(),
      source: desc.source.clone(),
    }
  }
}
