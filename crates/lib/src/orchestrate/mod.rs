//! Build run orchestration.
//!
//! A run takes the discovered [`TaskDescriptor`]s through a fixed pipeline:
//!
//! 1. **Validating** - every task checks its configuration subset. Nothing
//!    is instantiated until all tasks have passed.
//! 2. **Instantiating** - one instance per descriptor.
//! 3. **Stage `pre_build`** - hooks run in dispatch order.
//! 4. **Building** - the caller's [`BuildStep`], then `on_builds` is refreshed
//!    from the output directory.
//! 5. **Stage `post_build`**.
//!
//! Tasks without a hook for a stage are skipped. The first failure ends the
//! run; nothing is retried.
//!
//! Dispatch order within a stage is discovery order, stably sorted by the
//! task's priority for that stage.

mod types;

use std::collections::BTreeMap;

use tracing::{debug, info};

pub use types::{
  BuildStep, BuildStepError, Invocation, OrchestrateError, Phase, Priorities, RunReport, RunState,
};

use crate::context::{BuildContext, OnBuilds};
use crate::task::{Stage, Task, TaskConfig, TaskDescriptor};

/// Per-run settings: the build context plus per-task configuration.
#[derive(Debug, Clone)]
pub struct Orchestrator {
  ctx: BuildContext,
  configs: BTreeMap<String, TaskConfig>,
  priorities: BTreeMap<String, Priorities>,
  builds: Vec<String>,
}

impl Orchestrator {
  pub fn new(ctx: BuildContext) -> Self {
    Self {
      ctx,
      configs: BTreeMap::new(),
      priorities: BTreeMap::new(),
      builds: Vec::new(),
    }
  }

  /// Set the configuration subset handed to the task with `slug`.
  ///
  /// Tasks without a subset receive an empty one.
  pub fn with_config(mut self, slug: impl Into<String>, config: TaskConfig) -> Self {
    self.configs.insert(slug.into(), config);
    self
  }

  pub fn with_priorities(mut self, slug: impl Into<String>, priorities: Priorities) -> Self {
    self.priorities.insert(slug.into(), priorities);
    self
  }

  /// Builds whose artifacts are re-matched into `on_builds` after the build step.
  pub fn with_builds<I, S>(mut self, builds: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.builds = builds.into_iter().map(Into::into).collect();
    self
  }

  pub fn context(&self) -> &BuildContext {
    &self.ctx
  }

  pub fn builds(&self) -> &[String] {
    &self.builds
  }

  /// Start a run over `descriptors`.
  pub fn start<'a>(&'a self, descriptors: &'a [TaskDescriptor]) -> BuildRun<'a> {
    BuildRun {
      orchestrator: self,
      descriptors,
      state: RunState::Idle,
      configs: Vec::new(),
      instances: Vec::new(),
      report: RunReport::default(),
    }
  }

  /// Run the whole pipeline without a build step.
  pub fn run(&self, descriptors: &[TaskDescriptor], on_builds: &OnBuilds) -> Result<RunReport, OrchestrateError> {
    self.run_with(descriptors, on_builds, None)
  }

  /// Run the whole pipeline, calling `step` between the stages.
  pub fn run_with(
    &self,
    descriptors: &[TaskDescriptor],
    on_builds: &OnBuilds,
    step: Option<&mut dyn BuildStep>,
  ) -> Result<RunReport, OrchestrateError> {
    let mut run = self.start(descriptors);
    run.validate()?;
    run.complete(on_builds, step)
  }
}

/// One build run.
///
/// Phases must be driven in pipeline order; [`Orchestrator::run_with`] does
/// so. Instances live exactly as long as the run.
pub struct BuildRun<'a> {
  orchestrator: &'a Orchestrator,
  descriptors: &'a [TaskDescriptor],
  state: RunState,
  configs: Vec<TaskConfig>,
  instances: Vec<Box<dyn Task>>,
  report: RunReport,
}

impl BuildRun<'_> {
  pub fn state(&self) -> &RunState {
    &self.state
  }

  /// Validate every task's configuration subset.
  pub fn validate(&mut self) -> Result<(), OrchestrateError> {
    self.enter(Phase::Validating, &RunState::Idle)?;
    let descriptors = self.descriptors;
    info!(tasks = descriptors.len(), "validating task configuration");

    let mut configs = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
      let raw = self
        .orchestrator
        .configs
        .get(&descriptor.slug)
        .cloned()
        .unwrap_or_default();
      debug!(task = %descriptor.slug, "validating config");
      match descriptor.class.validate_config(raw) {
        Ok(config) => configs.push(config),
        Err(source) => {
          return Err(self.fail(Some(&descriptor.slug), OrchestrateError::ConfigValidation {
            slug: descriptor.slug.clone(),
            source,
          }));
        }
      }
    }

    self.configs = configs;
    Ok(())
  }

  /// Construct one instance per descriptor from its validated configuration.
  pub fn instantiate(&mut self) -> Result<(), OrchestrateError> {
    self.enter(Phase::Instantiating, &RunState::Running(Phase::Validating))?;
    let descriptors = self.descriptors;
    info!(tasks = descriptors.len(), "instantiating tasks");

    let configs = std::mem::take(&mut self.configs);
    let mut instances = Vec::with_capacity(descriptors.len());
    for (descriptor, config) in descriptors.iter().zip(configs) {
      match descriptor.class.instantiate(config, &self.orchestrator.ctx) {
        Ok(instance) => instances.push(instance),
        Err(source) => {
          return Err(self.fail(Some(&descriptor.slug), OrchestrateError::Instantiation {
            slug: descriptor.slug.clone(),
            source,
          }));
        }
      }
    }

    self.instances = instances;
    self.report.tasks = self.instances.len();
    Ok(())
  }

  /// Invoke the `stage` hook of every instance that has one.
  pub fn dispatch(&mut self, stage: Stage, on_builds: &OnBuilds) -> Result<(), OrchestrateError> {
    let after = match stage {
      Stage::PreBuild => RunState::Running(Phase::Instantiating),
      Stage::PostBuild => RunState::Running(Phase::Building),
    };
    self.enter(Phase::Stage(stage), &after)?;

    let descriptors = self.descriptors;
    let mut current_priority = None;
    for index in self.dispatch_order(stage) {
      let slug = &descriptors[index].slug;
      if !self.instances[index].implements(stage) {
        debug!(task = %slug, stage = %stage, "task has no hook for stage, skipping");
        continue;
      }

      let priority = self.priority(index, stage);
      if current_priority != Some(priority) {
        info!(stage = %stage, priority, "running tasks at priority level");
        current_priority = Some(priority);
      }

      info!(task = %slug, stage = %stage, "running task");
      if let Err(source) = self.instances[index].run(stage, on_builds) {
        return Err(self.fail(Some(slug), OrchestrateError::TaskExecution {
          slug: slug.clone(),
          stage,
          source,
        }));
      }
      self.report.invocations.push(Invocation {
        stage,
        slug: slug.clone(),
      });
    }

    Ok(())
  }

  /// Run the build step, if any, and refresh `on_builds` afterwards.
  pub fn build(&mut self, step: Option<&mut dyn BuildStep>, on_builds: &OnBuilds) -> Result<(), OrchestrateError> {
    self.enter(Phase::Building, &RunState::Running(Phase::Stage(Stage::PreBuild)))?;

    let Some(step) = step else {
      debug!("no build step configured");
      return Ok(());
    };

    info!(output_dir = %self.orchestrator.ctx.output_dir.display(), "running build step");
    if let Err(source) = step.build(&self.orchestrator.ctx, on_builds) {
      return Err(self.fail(None, OrchestrateError::BuildStep { source }));
    }
    self.report.built = true;

    if let Err(e) = on_builds.refresh(&self.orchestrator.builds, &self.orchestrator.ctx.output_dir) {
      return Err(self.fail(None, OrchestrateError::OutputScan(e)));
    }
    Ok(())
  }

  /// Drive a validated run through instantiation, both stages and the
  /// build step, then finish it.
  ///
  /// Lets callers act between validation and the rest of the pipeline.
  pub fn complete(
    mut self,
    on_builds: &OnBuilds,
    step: Option<&mut dyn BuildStep>,
  ) -> Result<RunReport, OrchestrateError> {
    self.instantiate()?;
    self.dispatch(Stage::PreBuild, on_builds)?;
    self.build(step, on_builds)?;
    self.dispatch(Stage::PostBuild, on_builds)?;
    self.finish()
  }

  /// Complete the run and hand back its report.
  pub fn finish(mut self) -> Result<RunReport, OrchestrateError> {
    let expected = RunState::Running(Phase::Stage(Stage::PostBuild));
    if self.state != expected {
      return Err(OrchestrateError::OutOfOrder {
        requested: Phase::Stage(Stage::PostBuild),
        state: self.state,
      });
    }
    self.state = RunState::Done;
    info!(
      tasks = self.report.tasks,
      invocations = self.report.invocations.len(),
      "build run complete"
    );
    Ok(std::mem::take(&mut self.report))
  }

  fn enter(&mut self, phase: Phase, expected: &RunState) -> Result<(), OrchestrateError> {
    if &self.state != expected {
      return Err(OrchestrateError::OutOfOrder {
        requested: phase,
        state: self.state.clone(),
      });
    }
    self.state = RunState::Running(phase);
    Ok(())
  }

  fn fail(&mut self, slug: Option<&str>, err: OrchestrateError) -> OrchestrateError {
    if let RunState::Running(phase) = self.state {
      self.state = RunState::Failed {
        phase,
        slug: slug.map(str::to_string),
      };
    }
    err
  }

  fn priority(&self, index: usize, stage: Stage) -> usize {
    self
      .orchestrator
      .priorities
      .get(&self.descriptors[index].slug)
      .map(|p| p.for_stage(stage))
      .unwrap_or_default()
  }

  fn dispatch_order(&self, stage: Stage) -> Vec<usize> {
    let mut order: Vec<usize> = (0..self.instances.len()).collect();
    order.sort_by_key(|&i| self.priority(i, stage));
    order
  }
}
