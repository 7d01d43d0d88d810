use renconstruct_lib::locate::{Locator, collect_unit_files, find_collisions};
use renconstruct_lib::task::TaskSummary;

use super::common::{Project, demo_dir};

#[test]
fn demo_tasks_are_found_in_file_order() {
  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&demo_dir().join("tasks")).unwrap();

  let found: Vec<(&str, &str)> = descriptors
    .iter()
    .map(|d| (d.declared_name.as_str(), d.slug.as_str()))
    .collect();

  // `nested/` sorts before `two_tasks.lua`.
  assert_eq!(
    found,
    vec![
      ("YetAnotherTask", "yet_another"),
      ("ExampleTask", "example"),
      ("AnotherTask", "another"),
    ]
  );
  assert!(find_collisions(&descriptors).is_empty());
}

#[test]
fn empty_task_dir_yields_no_tasks() {
  let project = Project::new();
  let locator = Locator::new().unwrap();
  assert!(locator.discover_dir(&project.task_dir()).unwrap().is_empty());
}

#[test]
fn units_without_tasks_contribute_nothing() {
  let project = Project::new();
  project.unit("helpers.lua", "local M = {} return M");
  project.unit("one.lua", r#"renconstruct.register("OneTask", {})"#);

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover_dir(&project.task_dir()).unwrap();
  assert_eq!(descriptors.len(), 1);
  assert_eq!(descriptors[0].slug, "one");
}

#[test]
fn same_name_in_two_units_is_a_collision() {
  let project = Project::new();
  project.unit("a.lua", r#"renconstruct.register("BuildIconsTask", {})"#);
  project.unit("b/c.lua", r#"renconstruct.register("BuildIconsTask", {})"#);

  let files = collect_unit_files(&project.task_dir()).unwrap();
  let locator = Locator::new().unwrap();
  let descriptors = locator.discover(&files).unwrap();

  assert_eq!(descriptors.len(), 2);
  let collisions = find_collisions(&descriptors);
  assert_eq!(collisions.len(), 1);
  assert_eq!(collisions[0].slug, "build_icons");
}

#[test]
fn summaries_serialize_for_listings() {
  let project = Project::new();
  let unit = project.unit("keystore.lua", r#"renconstruct.register("KeystoreTask", {})"#);

  let locator = Locator::new().unwrap();
  let descriptors = locator.discover(&[unit.clone()]).unwrap();
  let summaries: Vec<TaskSummary> = descriptors.iter().map(TaskSummary::from).collect();

  let json = serde_json::to_value(&summaries).unwrap();
  assert_eq!(json[0]["name"], "KeystoreTask");
  assert_eq!(json[0]["slug"], "keystore");
  assert_eq!(json[0]["source"], unit.to_string_lossy().as_ref());
}
