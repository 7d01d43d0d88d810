//! Run-scoped state shared between the orchestrator and tasks.
//!
//! Everything here lives for exactly one build run: it is created when the
//! run starts and dropped with it. Nothing is a process-wide singleton.

mod on_builds;
mod registry;

use std::path::PathBuf;

pub use on_builds::OnBuilds;
pub use registry::SharedRegistry;

/// The directories, tool path and registry every task of a run is built with.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub input_dir: PathBuf,
  pub output_dir: PathBuf,
  /// Path of the external build tool, if one is configured.
  pub tool_path: Option<PathBuf>,
  /// Cross-task store, shared by reference between all tasks of a run.
  pub registry: SharedRegistry,
}

impl BuildContext {
  pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      input_dir: input_dir.into(),
      output_dir: output_dir.into(),
      tool_path: None,
      registry: SharedRegistry::new(),
    }
  }

  pub fn with_tool_path(mut self, tool_path: impl Into<PathBuf>) -> Self {
    self.tool_path = Some(tool_path.into());
    self
  }
}
