//! The renconstruct config file.
//!
//! ```toml
//! [options]
//! task_dir = "tasks"
//! build_command = ["renpy.sh", "distribute"]
//!
//! [builds]
//! pc = true
//! mac = false
//!
//! [tasks.example]
//! on_builds = ["pc"]
//! priorities = { pre_build = 1 }
//! message = "hello"
//! ```
//!
//! Keys of a task section other than `enabled`, `name`, `on_builds` and
//! `priorities` form the configuration subset handed to the task.

mod types;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use types::{Config, ConfigError, Options, SelectedTask, TaskSection};

use crate::context::BuildContext;
use crate::orchestrate::Orchestrator;
use crate::task::TaskDescriptor;

/// Task directory used when `options.task_dir` is not set.
pub const DEFAULT_TASK_DIR: &str = "tasks";

impl Config {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = Self::parse(&content)?;
    debug!(path = %path.display(), tasks = config.tasks.len(), "loaded config");
    Ok(config)
  }

  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(content)?)
  }

  /// Enabled builds, in name order.
  pub fn active_builds(&self) -> Vec<String> {
    self
      .builds
      .iter()
      .filter(|(_, enabled)| **enabled)
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Task directory, resolved against `base` when relative.
  pub fn task_dir(&self, base: &Path) -> PathBuf {
    let dir = self
      .options
      .task_dir
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_TASK_DIR));
    if dir.is_absolute() { dir } else { base.join(dir) }
  }

  /// Pair discovered tasks with their sections.
  ///
  /// Only configured tasks are selected. Disabled sections and sections
  /// whose `on_builds` share nothing with `active_builds` are left out.
  /// The result keeps discovery order.
  pub fn select<S: AsRef<str>>(
    &self,
    descriptors: &[TaskDescriptor],
    active_builds: &[S],
  ) -> Result<Vec<SelectedTask>, ConfigError> {
    let mut seen = BTreeSet::new();
    for (key, section) in &self.tasks {
      let slug = section.slug(key);
      if !seen.insert(slug) {
        return Err(ConfigError::DuplicateTask { slug: slug.to_string() });
      }
      if !descriptors.iter().any(|d| d.slug == slug) {
        return Err(ConfigError::UnknownTask { slug: slug.to_string() });
      }
    }

    let mut selected = Vec::new();
    for descriptor in descriptors {
      let Some(section) = self.section(&descriptor.slug) else {
        debug!(task = %descriptor.slug, "task not configured, skipping");
        continue;
      };
      if !section.enabled {
        debug!(task = %descriptor.slug, "task disabled, skipping");
        continue;
      }
      if !section.applies_to(active_builds) {
        debug!(task = %descriptor.slug, on_builds = ?section.on_builds, "no matching build active, skipping");
        continue;
      }
      selected.push(SelectedTask {
        descriptor: descriptor.clone(),
        options: section.options.clone(),
        priorities: section.priorities,
      });
    }
    Ok(selected)
  }

  fn section(&self, slug: &str) -> Option<&TaskSection> {
    self
      .tasks
      .iter()
      .find(|(key, section)| section.slug(key) == slug)
      .map(|(_, section)| section)
  }
}

/// Build the orchestrator for `selected` and the descriptor list to run it over.
pub fn assemble(
  ctx: BuildContext,
  builds: Vec<String>,
  selected: Vec<SelectedTask>,
) -> (Orchestrator, Vec<TaskDescriptor>) {
  let mut orchestrator = Orchestrator::new(ctx).with_builds(builds);
  let mut descriptors = Vec::with_capacity(selected.len());
  for task in selected {
    orchestrator = orchestrator
      .with_config(task.descriptor.slug.clone(), task.options)
      .with_priorities(task.descriptor.slug.clone(), task.priorities);
    descriptors.push(task.descriptor);
  }
  (orchestrator, descriptors)
}
