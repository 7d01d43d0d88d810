//! Types for orchestrating a build run.
//!
//! This module defines the phases a run moves through, the errors that end
//! a run, and the report a successful run produces.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{BuildContext, OnBuilds};
use crate::task::{Stage, TaskError};

/// Error type returned by a [`BuildStep`].
pub type BuildStepError = Box<dyn std::error::Error + Send + Sync>;

/// The build itself, run between the pre-build and post-build stages.
///
/// The orchestrator does not build anything; the caller supplies this step.
pub trait BuildStep {
  fn build(&mut self, ctx: &BuildContext, on_builds: &OnBuilds) -> Result<(), BuildStepError>;
}

impl<F> BuildStep for F
where
  F: FnMut(&BuildContext, &OnBuilds) -> Result<(), BuildStepError>,
{
  fn build(&mut self, ctx: &BuildContext, on_builds: &OnBuilds) -> Result<(), BuildStepError> {
    self(ctx, on_builds)
  }
}

/// Per-stage dispatch priority of a task. Lower runs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priorities {
  #[serde(default)]
  pub pre_build: usize,
  #[serde(default)]
  pub post_build: usize,
}

impl Priorities {
  pub fn for_stage(&self, stage: Stage) -> usize {
    match stage {
      Stage::PreBuild => self.pre_build,
      Stage::PostBuild => self.post_build,
    }
  }
}

/// A step of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Validating,
  Instantiating,
  Stage(Stage),
  Building,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Validating => f.write_str("validating"),
      Phase::Instantiating => f.write_str("instantiating"),
      Phase::Stage(stage) => write!(f, "stage {}", stage),
      Phase::Building => f.write_str("building"),
    }
  }
}

/// Where a run is.
///
/// `Idle -> Validating -> Instantiating -> Stage(PreBuild) -> Building ->
/// Stage(PostBuild) -> Done`, or `Failed` from any phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
  Idle,
  /// The phase that is running or last completed.
  Running(Phase),
  Done,
  Failed { phase: Phase, slug: Option<String> },
}

impl fmt::Display for RunState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunState::Idle => f.write_str("idle"),
      RunState::Running(phase) => write!(f, "{}", phase),
      RunState::Done => f.write_str("done"),
      RunState::Failed { phase, slug: Some(slug) } => write!(f, "failed during {} ({})", phase, slug),
      RunState::Failed { phase, slug: None } => write!(f, "failed during {}", phase),
    }
  }
}

/// Errors that end a build run.
#[derive(Debug, Error)]
pub enum OrchestrateError {
  /// A task rejected its configuration. No task has been instantiated.
  #[error("task '{slug}' rejected its configuration: {source}")]
  ConfigValidation {
    slug: String,
    #[source]
    source: TaskError,
  },

  /// A task could not be constructed.
  #[error("task '{slug}' could not be instantiated: {source}")]
  Instantiation {
    slug: String,
    #[source]
    source: TaskError,
  },

  /// A lifecycle hook failed.
  #[error("task '{slug}' failed in {stage}: {source}")]
  TaskExecution {
    slug: String,
    stage: Stage,
    #[source]
    source: TaskError,
  },

  /// The build step between the stages failed.
  #[error("build step failed: {source}")]
  BuildStep {
    #[source]
    source: BuildStepError,
  },

  /// Build outcomes could not be collected from the output directory.
  #[error("failed to scan output directory: {0}")]
  OutputScan(#[from] std::io::Error),

  /// A phase was started out of pipeline order.
  #[error("cannot start {requested} while the run is {state}")]
  OutOfOrder { requested: Phase, state: RunState },
}

impl OrchestrateError {
  /// Slug of the task that caused the failure, when one did.
  pub fn slug(&self) -> Option<&str> {
    match self {
      OrchestrateError::ConfigValidation { slug, .. }
      | OrchestrateError::Instantiation { slug, .. }
      | OrchestrateError::TaskExecution { slug, .. } => Some(slug),
      _ => None,
    }
  }
}

/// One hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
  pub stage: Stage,
  pub slug: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  /// Number of tasks instantiated.
  pub tasks: usize,
  /// Hooks invoked, in invocation order.
  pub invocations: Vec<Invocation>,
  /// Whether a build step ran between the stages.
  pub built: bool,
}

impl RunReport {
  /// Slugs invoked during `stage`, in order.
  pub fn invoked(&self, stage: Stage) -> Vec<&str> {
    self
      .invocations
      .iter()
      .filter(|i| i.stage == stage)
      .map(|i| i.slug.as_str())
      .collect()
  }
}
