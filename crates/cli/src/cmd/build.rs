//! Implementation of the `renconstruct build` command.
//!
//! Loads the config, discovers the task units, and runs the selected tasks
//! around the configured build command.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use renconstruct_lib::config::{Config, assemble};
use renconstruct_lib::consts::{DEFAULT_CONFIG_FILE, ENV_INPUT_DIR, ENV_OUTPUT_DIR};
use renconstruct_lib::context::{BuildContext, OnBuilds};
use renconstruct_lib::locate::{Locator, find_collisions};
use renconstruct_lib::orchestrate::{BuildStep, BuildStepError};
use renconstruct_lib::task::Stage;

use crate::output::{format_duration, print_entry, print_error, print_info, print_stat, print_success};

/// Runs the configured build command as the build step.
///
/// The command runs in the input directory with the input and output
/// directories exported in its environment.
#[derive(Debug, Clone)]
pub struct CommandStep {
  program: String,
  args: Vec<String>,
}

impl CommandStep {
  pub fn from_argv(argv: &[String]) -> Result<Self> {
    let (program, args) = argv.split_first().context("build_command must name a program")?;
    Ok(Self {
      program: program.clone(),
      args: args.to_vec(),
    })
  }
}

impl BuildStep for CommandStep {
  fn build(&mut self, ctx: &BuildContext, _on_builds: &OnBuilds) -> Result<(), BuildStepError> {
    info!(program = %self.program, args = ?self.args, "running build command");
    let status = Command::new(&self.program)
      .args(&self.args)
      .current_dir(&ctx.input_dir)
      .env(ENV_INPUT_DIR, &ctx.input_dir)
      .env(ENV_OUTPUT_DIR, &ctx.output_dir)
      .status()
      .map_err(|e| format!("failed to start '{}': {}", self.program, e))?;

    if !status.success() {
      return Err(format!("'{}' exited with {}", self.program, status).into());
    }
    Ok(())
  }
}

/// Execute the build command.
///
/// - Loads the config (`<input_dir>/renconstruct.toml` unless given)
/// - Discovers task units and rejects task names declared twice
/// - Selects the configured tasks for the enabled builds
/// - Validates every task config before preparing the output directory
/// - Runs pre-build hooks, the build command and post-build hooks
pub fn cmd_build(
  input_dir: &Path,
  output_dir: &Path,
  config: Option<&Path>,
  tool_path: Option<&Path>,
  verbose: bool,
) -> Result<()> {
  let start = Instant::now();

  if !input_dir.is_dir() {
    bail!("Input directory does not exist: {}", input_dir.display());
  }
  let input_dir = std::path::absolute(input_dir).context("Failed to resolve input directory")?;
  let output_dir = std::path::absolute(output_dir).context("Failed to resolve output directory")?;

  let config_path = config
    .map(Path::to_path_buf)
    .unwrap_or_else(|| input_dir.join(DEFAULT_CONFIG_FILE));
  let config = Config::load(&config_path)?;
  let config_dir = config_path.parent().unwrap_or(Path::new("."));

  let builds = config.active_builds();
  if builds.is_empty() {
    bail!("No builds enabled in {}", config_path.display());
  }

  let task_dir = config.task_dir(config_dir);
  let locator = Locator::new()?;
  let descriptors = if task_dir.is_dir() {
    locator
      .discover_dir(&task_dir)
      .with_context(|| format!("Failed to load tasks from {}", task_dir.display()))?
  } else if config.options.task_dir.is_some() {
    bail!("Task directory does not exist: {}", task_dir.display());
  } else {
    warn!(path = %task_dir.display(), "task directory not found, running without tasks");
    Vec::new()
  };

  let collisions = find_collisions(&descriptors);
  if !collisions.is_empty() {
    for collision in &collisions {
      let sources: Vec<String> = collision
        .tasks
        .iter()
        .map(|(name, source)| match source {
          Some(path) => format!("{} ({})", name, path.display()),
          None => name.clone(),
        })
        .collect();
      print_error(&format!("Task '{}' is declared by: {}", collision.slug, sources.join(", ")));
    }
    bail!("{} task name(s) declared more than once", collisions.len());
  }

  let selected = config.select(&descriptors, &builds)?;

  let mut ctx = BuildContext::new(&input_dir, &output_dir);
  if let Some(tool_path) = tool_path.map(PathBuf::from).or_else(|| config.options.tool_path.clone()) {
    ctx = ctx.with_tool_path(tool_path);
  }
  let (orchestrator, tasks) = assemble(ctx, builds.clone(), selected);

  print_info(&format!(
    "Running {} task(s) for builds: {}",
    tasks.len(),
    builds.join(", ")
  ));

  let mut step = config
    .options
    .build_command
    .as_deref()
    .map(CommandStep::from_argv)
    .transpose()?;
  let step = step.as_mut().map(|s| s as &mut dyn BuildStep);

  // The output directory is only touched once every task config is valid.
  let mut run = orchestrator.start(&tasks);
  run.validate().context("Build failed")?;
  prepare_output_dir(&output_dir, config.options.clear_output_dir)?;
  let on_builds = OnBuilds::scan(&builds, &output_dir).context("Failed to scan output directory")?;
  let report = run.complete(&on_builds, step).context("Build failed")?;

  println!();
  print_success(&format!("Build complete in {}", format_duration(start.elapsed())));
  print_stat("Tasks", &report.tasks.to_string());
  print_stat("Pre-build hooks", &report.invoked(Stage::PreBuild).len().to_string());
  print_stat("Post-build hooks", &report.invoked(Stage::PostBuild).len().to_string());
  print_stat("Build command", if report.built { "ran" } else { "not configured" });

  if verbose {
    println!();
    println!("Hooks:");
    for invocation in &report.invocations {
      print_entry(&invocation.slug, &invocation.stage.to_string());
    }
  }

  println!();
  println!("Builds:");
  for build in &builds {
    let artifact = on_builds.get(build).unwrap_or_else(|| "no artifact".to_string());
    print_entry(build, &artifact);
  }

  Ok(())
}

fn prepare_output_dir(output_dir: &Path, clear: bool) -> Result<()> {
  if clear && output_dir.exists() {
    info!(path = %output_dir.display(), "clearing output directory");
    fs::remove_dir_all(output_dir)
      .with_context(|| format!("Failed to clear output directory: {}", output_dir.display()))?;
  }
  fs::create_dir_all(output_dir)
    .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
  Ok(())
}
