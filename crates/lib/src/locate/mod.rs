//! Task discovery.
//!
//! The [`Locator`] loads task units in order and turns every registration
//! whose name ends in the task suffix into a [`TaskDescriptor`]. Names
//! without the suffix are helpers and are skipped. Descriptors from all units
//! are returned as one flat list in file order, then registration order.
//!
//! The locator never deduplicates: two units may declare the same task name.
//! [`find_collisions`] reports such slugs for callers that want to reject them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::consts::UNIT_EXTENSION;
use crate::lua::{LuaTaskClass, ScriptError, TaskRuntime};
use crate::task::{TaskClass, TaskDescriptor, slugify, strip_task_suffix};

/// Errors that abort a discovery pass.
#[derive(Debug, Error)]
pub enum LoadError {
  /// A unit failed to load: unreadable, syntax error or error raised while running.
  #[error("failed to load task unit {}: {source}", path.display())]
  Unit {
    path: PathBuf,
    #[source]
    source: ScriptError,
  },

  /// The task directory could not be walked.
  #[error("failed to walk task directory: {0}")]
  Walk(#[from] walkdir::Error),

  /// The Lua runtime could not be set up.
  #[error("failed to initialize task runtime: {0}")]
  Runtime(#[source] ScriptError),
}

impl LoadError {
  /// The unit that failed, if the error is tied to one.
  pub fn path(&self) -> Option<&Path> {
    match self {
      LoadError::Unit { path, .. } => Some(path),
      _ => None,
    }
  }
}

/// Build a descriptor for a registration, or `None` when `name` is not a task.
///
/// A name whose stem yields an empty slug (`Task`, `_Task`) cannot be
/// addressed by a config key and is skipped as well.
pub fn describe(name: &str, class: Rc<dyn TaskClass>, source: Option<PathBuf>) -> Option<TaskDescriptor> {
  let Some(stem) = strip_task_suffix(name) else {
    debug!(name = %name, "skipping registration without task suffix");
    return None;
  };
  let slug = slugify(stem);
  if slug.is_empty() {
    warn!(name = %name, "skipping task with an empty name");
    return None;
  }
  Some(TaskDescriptor {
    declared_name: name.to_string(),
    slug,
    source,
    class,
  })
}

/// Describe a task implemented in Rust.
pub fn register_native(name: &str, class: Rc<dyn TaskClass>) -> Option<TaskDescriptor> {
  describe(name, class, None)
}

/// Finds task units under a directory and loads them.
pub struct Locator {
  runtime: TaskRuntime,
}

impl Locator {
  pub fn new() -> Result<Self, LoadError> {
    let runtime = TaskRuntime::new().map_err(|e| LoadError::Runtime(e.into()))?;
    Ok(Self { runtime })
  }

  /// Load `files` in order and collect the tasks they register.
  ///
  /// The first unit that fails to load aborts the pass.
  pub fn discover<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<TaskDescriptor>, LoadError> {
    let mut descriptors = Vec::new();

    for file in files {
      let path = file.as_ref();
      let registrations = self.runtime.load_unit(path).map_err(|source| LoadError::Unit {
        path: path.to_path_buf(),
        source: source.into(),
      })?;

      for registration in registrations {
        let class = Rc::new(LuaTaskClass::new(
          self.runtime.lua().clone(),
          registration.name.as_str(),
          registration.class,
        ));
        if let Some(descriptor) = describe(&registration.name, class, Some(path.to_path_buf())) {
          debug!(
            name = %descriptor.declared_name,
            slug = %descriptor.slug,
            path = %path.display(),
            "found task"
          );
          descriptors.push(descriptor);
        }
      }
    }

    info!(units = files.len(), tasks = descriptors.len(), "task discovery complete");
    Ok(descriptors)
  }

  /// Discover every unit under `dir`.
  ///
  /// `dir` is also put on `package.path` so units can `require` shared
  /// modules stored alongside them.
  pub fn discover_dir(&self, dir: &Path) -> Result<Vec<TaskDescriptor>, LoadError> {
    self
      .runtime
      .add_package_dir(dir)
      .map_err(|e| LoadError::Runtime(e.into()))?;
    let files = collect_unit_files(dir)?;
    self.discover(&files)
  }
}

/// Recursively list the unit files under `dir`, sorted by path.
pub fn collect_unit_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
  let mut files = Vec::new();
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    if path.extension().is_some_and(|ext| ext == UNIT_EXTENSION) {
      files.push(path.to_path_buf());
    }
  }
  Ok(files)
}

/// A slug declared by more than one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
  pub slug: String,
  /// Declared names and sources of every task sharing the slug, in discovery order.
  pub tasks: Vec<(String, Option<PathBuf>)>,
}

/// Report every slug that more than one descriptor maps to.
pub fn find_collisions(descriptors: &[TaskDescriptor]) -> Vec<Collision> {
  let mut by_slug: BTreeMap<&str, Vec<&TaskDescriptor>> = BTreeMap::new();
  for descriptor in descriptors {
    by_slug.entry(descriptor.slug.as_str()).or_default().push(descriptor);
  }

  by_slug
    .into_iter()
    .filter(|(_, tasks)| tasks.len() > 1)
    .map(|(slug, tasks)| Collision {
      slug: slug.to_string(),
      tasks: tasks
        .into_iter()
        .map(|d| (d.declared_name.clone(), d.source.clone()))
        .collect(),
    })
    .collect()
}
