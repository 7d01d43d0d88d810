use std::fs;

use renconstruct_lib::config::{Config, assemble};
use renconstruct_lib::context::{BuildContext, OnBuilds};
use renconstruct_lib::locate::Locator;
use renconstruct_lib::orchestrate::{BuildStepError, OrchestrateError, Orchestrator};
use renconstruct_lib::task::Stage;
use serde_json::json;

use super::common::{Project, demo_dir};

#[test]
fn demo_config_runs_every_selected_hook() {
  let demo = demo_dir();
  let config = Config::load(&demo.join("renconstruct.toml")).unwrap();
  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&config.task_dir(&demo)).unwrap();

  let builds = config.active_builds();
  let selected = config.select(&descriptors, &builds).unwrap();
  let project = Project::new();
  let ctx = BuildContext::new(project.input_dir(), project.output_dir());
  let registry = ctx.registry.clone();
  let (orchestrator, tasks) = assemble(ctx, builds, selected);

  let report = orchestrator.run(&tasks, &OnBuilds::new()).unwrap();

  assert_eq!(report.tasks, 3);
  assert_eq!(report.invoked(Stage::PreBuild), vec!["example", "another"]);
  assert_eq!(report.invoked(Stage::PostBuild), vec!["example", "yet_another"]);
  assert_eq!(registry.get("example_ran"), Some(json!(true)));
}

#[test]
fn hooks_see_artifacts_produced_by_the_build() {
  let project = Project::new();
  project.unit(
    "record.lua",
    r#"
      local RecordTask = {}
      function RecordTask:pre_build(on_builds)
        self.registry:set("before", on_builds:get("mac") or "none")
      end
      function RecordTask:post_build(on_builds)
        self.registry:set("after", on_builds:get("mac"))
        self.registry:set("android", on_builds:get("android_apk") or "none")
      end
      renconstruct.register("RecordTask", RecordTask)
    "#,
  );

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&project.task_dir()).unwrap();
  let builds = vec!["mac".to_string(), "android_apk".to_string()];
  let orchestrator =
    Orchestrator::new(BuildContext::new(project.input_dir(), project.output_dir())).with_builds(builds.clone());
  let on_builds = OnBuilds::scan(&builds, &project.output_dir()).unwrap();

  let out = project.output_dir();
  let mut step = move |_: &BuildContext, _: &OnBuilds| -> Result<(), BuildStepError> {
    fs::write(out.join("game-1.0-mac.zip"), b"")?;
    Ok(())
  };
  orchestrator.run_with(&descriptors, &on_builds, Some(&mut step)).unwrap();

  let registry = &orchestrator.context().registry;
  assert_eq!(registry.get("before"), Some(json!("none")));
  let after = registry.get("after").unwrap();
  assert!(after.as_str().unwrap().ends_with("game-1.0-mac.zip"), "{}", after);
  assert_eq!(registry.get("android"), Some(json!("none")));
}

#[test]
fn longer_build_names_claim_their_artifact_first() {
  let project = Project::new();
  let aab = project.artifact("game-1.0-android_aab.aab");
  let apk = project.artifact("game-1.0-android_apk.apk");
  project.artifact(".DS_Store");

  let on_builds = OnBuilds::scan(&["android_apk", "android_aab", "pc"], &project.output_dir()).unwrap();

  assert_eq!(on_builds.get("android_aab"), Some(aab.to_string_lossy().into_owned()));
  assert_eq!(on_builds.get("android_apk"), Some(apk.to_string_lossy().into_owned()));
  assert!(on_builds.contains("pc"));
  assert_eq!(on_builds.get("pc"), None);
}

#[test]
fn rejected_config_stops_the_run_before_any_hook() {
  let project = Project::new();
  project.unit(
    "strict.lua",
    r#"
      local StrictTask = {}
      function StrictTask.validate_config(config)
        if config.level == nil then error("level is required") end
        return config
      end
      renconstruct.register("StrictTask", StrictTask)

      local LoudTask = {}
      function LoudTask:init() self.registry:set("constructed", true) end
      renconstruct.register("LoudTask", LoudTask)
    "#,
  );

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&project.task_dir()).unwrap();
  let orchestrator = Orchestrator::new(BuildContext::new(project.input_dir(), project.output_dir()));

  let err = orchestrator.run(&descriptors, &OnBuilds::new()).unwrap_err();

  assert!(matches!(err, OrchestrateError::ConfigValidation { .. }));
  assert_eq!(err.slug(), Some("strict"));
  assert!(err.to_string().contains("level is required"), "{}", err);
  assert!(!orchestrator.context().registry.contains("constructed"));
}

#[test]
fn failing_hook_names_task_and_stage() {
  let project = Project::new();
  project.unit(
    "sign.lua",
    r#"
      local SignTask = {}
      function SignTask:post_build(on_builds) error("keystore missing") end
      renconstruct.register("SignTask", SignTask)
    "#,
  );

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&project.task_dir()).unwrap();
  let orchestrator = Orchestrator::new(BuildContext::new(project.input_dir(), project.output_dir()));

  let err = orchestrator.run(&descriptors, &OnBuilds::new()).unwrap_err();
  match err {
    OrchestrateError::TaskExecution { slug, stage, source } => {
      assert_eq!(slug, "sign");
      assert_eq!(stage, Stage::PostBuild);
      assert!(source.to_string().contains("keystore missing"));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn registry_is_shared_across_tasks_and_stages() {
  let project = Project::new();
  project.unit(
    "pair.lua",
    r#"
      local ProduceTask = {}
      function ProduceTask:pre_build(on_builds)
        self.registry:set("version", { major = 1, minor = 2 })
      end
      renconstruct.register("ProduceTask", ProduceTask)

      local ConsumeTask = {}
      function ConsumeTask:post_build(on_builds)
        local v = self.registry:get("version")
        self.registry:set("label", string.format("%d.%d", v.major, v.minor))
      end
      renconstruct.register("ConsumeTask", ConsumeTask)
    "#,
  );

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&project.task_dir()).unwrap();
  let orchestrator = Orchestrator::new(BuildContext::new(project.input_dir(), project.output_dir()));
  orchestrator.run(&descriptors, &OnBuilds::new()).unwrap();

  assert_eq!(orchestrator.context().registry.get("label"), Some(json!("1.2")));
}
