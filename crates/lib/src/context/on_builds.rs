//! Build outcomes visible to task hooks.
//!
//! `OnBuilds` maps a build name (e.g. `mac`, `android_apk`) to the artifact
//! the build produced in the output directory, if any. It is seeded by
//! scanning the output directory, refreshed after the build step and shared
//! with every hook invocation of a run, so hooks may also record values for
//! hooks that run after them.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct OnBuilds {
  entries: Rc<RefCell<BTreeMap<String, Option<String>>>>,
}

impl OnBuilds {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed the collection by matching each build against the output directory.
  pub fn scan<S: AsRef<str>>(builds: &[S], output_dir: &Path) -> io::Result<Self> {
    let on_builds = Self::new();
    on_builds.refresh(builds, output_dir)?;
    Ok(on_builds)
  }

  /// Re-match `builds` against the output directory.
  ///
  /// Only the given build keys are overwritten.
  pub fn refresh<S: AsRef<str>>(&self, builds: &[S], output_dir: &Path) -> io::Result<()> {
    let matched = match_artifacts(builds, output_dir)?;
    let mut entries = self.entries.borrow_mut();
    for (build, artifact) in matched {
      debug!(build = %build, artifact = ?artifact, "matched build artifact");
      entries.insert(build, artifact);
    }
    Ok(())
  }

  /// The artifact recorded for `build`, if any.
  pub fn get(&self, build: &str) -> Option<String> {
    self.entries.borrow().get(build).cloned().flatten()
  }

  pub fn set(&self, build: impl Into<String>, artifact: Option<String>) {
    self.entries.borrow_mut().insert(build.into(), artifact);
  }

  /// Whether `build` has an entry, with or without an artifact.
  pub fn contains(&self, build: &str) -> bool {
    self.entries.borrow().contains_key(build)
  }

  pub fn builds(&self) -> Vec<String> {
    self.entries.borrow().keys().cloned().collect()
  }

  pub fn snapshot(&self) -> BTreeMap<String, Option<String>> {
    self.entries.borrow().clone()
  }
}

/// Name an output entry is matched by: the stem for files, the full name for
/// directories.
fn match_key(path: &Path) -> Option<String> {
  let name = if path.is_file() { path.file_stem() } else { path.file_name() };
  name.map(|n| n.to_string_lossy().into_owned())
}

/// Pair every build with the first unclaimed output entry whose name contains it.
///
/// Longer build names are matched first so that `android_aab` claims its
/// artifact before a shorter name that is a substring of it can.
fn match_artifacts<S: AsRef<str>>(builds: &[S], output_dir: &Path) -> io::Result<Vec<(String, Option<String>)>> {
  let mut builds: Vec<&str> = builds.iter().map(AsRef::as_ref).collect();
  builds.sort_by_key(|b| (Reverse(b.len()), *b));
  builds.dedup();

  let mut outputs: Vec<(String, PathBuf)> = match std::fs::read_dir(output_dir) {
    Ok(dir) => {
      let mut outputs = Vec::new();
      for entry in dir {
        let path = entry?.path();
        let hidden = path
          .file_name()
          .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden {
          continue;
        }
        if let Some(key) = match_key(&path) {
          outputs.push((key, path));
        }
      }
      outputs
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
    Err(e) => return Err(e),
  };
  outputs.sort_by(|a, b| b.0.cmp(&a.0));

  let mut claimed = HashSet::new();
  let mut matched = Vec::with_capacity(builds.len());
  for build in builds {
    let artifact = outputs
      .iter()
      .enumerate()
      .find(|(i, (key, _))| !claimed.contains(i) && key.contains(build))
      .map(|(i, (_, path))| {
        claimed.insert(i);
        path.to_string_lossy().into_owned()
      });
    matched.push((build.to_string(), artifact));
  }

  Ok(matched)
}

impl LuaUserData for OnBuilds {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("get", |_, this, build: String| Ok(this.get(&build)));

    methods.add_method("set", |_, this, (build, artifact): (String, Option<String>)| {
      this.set(build, artifact);
      Ok(())
    });

    methods.add_method("has", |_, this, build: String| Ok(this.contains(&build)));

    methods.add_method("builds", |_, this, ()| Ok(this.builds()));
  }
}
