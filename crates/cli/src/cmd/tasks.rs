//! Implementation of the `renconstruct tasks` command.

use std::path::Path;

use anyhow::{Context, Result};

use renconstruct_lib::locate::{Locator, find_collisions};
use renconstruct_lib::task::TaskSummary;

use crate::output::{OutputFormat, print_entry, print_info, print_json, print_warning};

pub fn cmd_tasks(dir: &Path, format: OutputFormat) -> Result<()> {
  let locator = Locator::new()?;
  let descriptors = locator
    .discover_dir(dir)
    .with_context(|| format!("Failed to load tasks from {}", dir.display()))?;
  let summaries: Vec<TaskSummary> = descriptors.iter().map(TaskSummary::from).collect();

  if format.is_json() {
    return print_json(&summaries);
  }

  if summaries.is_empty() {
    print_info(&format!("No tasks found in {}", dir.display()));
    return Ok(());
  }

  print_info(&format!("{} task(s) in {}", summaries.len(), dir.display()));
  for summary in &summaries {
    let source = summary
      .source
      .as_ref()
      .and_then(|p| p.strip_prefix(dir).ok())
      .map(|p| p.display().to_string())
      .unwrap_or_default();
    print_entry(&summary.slug, &format!("{} {}", summary.name, source));
  }

  for collision in find_collisions(&descriptors) {
    print_warning(&format!(
      "Task '{}' is declared {} times",
      collision.slug,
      collision.tasks.len()
    ));
  }

  Ok(())
}
