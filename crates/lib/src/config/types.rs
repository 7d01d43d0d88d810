use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrate::Priorities;
use crate::task::{TaskConfig, TaskDescriptor};

fn default_true() -> bool {
  true
}

/// Errors raised while reading a config file or applying it to discovered tasks.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config: {0}")]
  Parse(#[from] toml::de::Error),

  /// A task section names a slug no discovered task has.
  #[error("task '{slug}' is configured but no such task was discovered")]
  UnknownTask { slug: String },

  /// Two task sections resolve to the same slug.
  #[error("task '{slug}' is configured more than once")]
  DuplicateTask { slug: String },
}

/// The `[options]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
  /// Directory holding the task units, relative to the config file.
  pub task_dir: Option<PathBuf>,
  /// Empty the output directory before the run.
  pub clear_output_dir: bool,
  /// Path of the engine SDK, handed to tasks as `tool_path`.
  pub tool_path: Option<PathBuf>,
  /// Program and arguments of the build step.
  pub build_command: Option<Vec<String>>,
}

/// One `[tasks.<key>]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSection {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Slug of the task; defaults to the section key.
  #[serde(default)]
  pub name: Option<String>,
  /// Run only when one of these builds is active. Empty means always.
  #[serde(default)]
  pub on_builds: Vec<String>,
  #[serde(default)]
  pub priorities: Priorities,
  /// Everything else: the task's own options.
  #[serde(flatten)]
  pub options: TaskConfig,
}

impl TaskSection {
  pub fn slug<'a>(&'a self, key: &'a str) -> &'a str {
    self.name.as_deref().unwrap_or(key)
  }

  /// Whether this section applies when `active_builds` are being built.
  pub fn applies_to<S: AsRef<str>>(&self, active_builds: &[S]) -> bool {
    self.on_builds.is_empty()
      || self
        .on_builds
        .iter()
        .any(|b| active_builds.iter().any(|a| a.as_ref() == b))
  }
}

/// A whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub options: Options,
  /// Build name to whether it is produced.
  #[serde(default)]
  pub builds: BTreeMap<String, bool>,
  #[serde(default)]
  pub tasks: BTreeMap<String, TaskSection>,
}

/// A discovered task paired with its configured settings.
#[derive(Debug, Clone)]
pub struct SelectedTask {
  pub descriptor: TaskDescriptor,
  pub options: TaskConfig,
  pub priorities: Priorities,
}
