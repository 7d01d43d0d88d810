use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// The demo task directory shipped with the repository.
pub fn demo_dir() -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

/// A scratch project with a task directory and an output directory.
pub struct Project {
  pub root: TempDir,
}

impl Project {
  pub fn new() -> Self {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("tasks")).unwrap();
    fs::create_dir_all(root.path().join("out")).unwrap();
    Self { root }
  }

  pub fn task_dir(&self) -> PathBuf {
    self.root.path().join("tasks")
  }

  pub fn output_dir(&self) -> PathBuf {
    self.root.path().join("out")
  }

  pub fn input_dir(&self) -> PathBuf {
    self.root.path().to_path_buf()
  }

  /// Write a unit under the task directory.
  pub fn unit(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.task_dir().join(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  /// Create an artifact in the output directory.
  pub fn artifact(&self, name: &str) -> PathBuf {
    let path = self.output_dir().join(name);
    fs::write(&path, b"").unwrap();
    path
  }
}
