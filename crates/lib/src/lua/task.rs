//! Tasks implemented in Lua.
//!
//! A registered class table becomes a [`LuaTaskClass`]. Instances are plain
//! tables whose metatable points `__index` at the class, so hooks are looked
//! up on the class like methods.

use std::rc::Rc;

use mlua::prelude::*;
use serde_json::Value;

use crate::context::{BuildContext, OnBuilds};
use crate::task::{Stage, Task, TaskClass, TaskConfig, TaskError};

pub struct LuaTaskClass {
  lua: Rc<Lua>,
  name: String,
  class: LuaTable,
}

impl LuaTaskClass {
  pub fn new(lua: Rc<Lua>, name: impl Into<String>, class: LuaTable) -> Self {
    Self {
      lua,
      name: name.into(),
      class,
    }
  }

  fn class_function(&self, name: &str) -> Result<Option<LuaFunction>, TaskError> {
    match self.class.get::<LuaValue>(name)? {
      LuaValue::Function(f) => Ok(Some(f)),
      LuaValue::Nil => Ok(None),
      other => Err(TaskError::msg(format!(
        "{}.{} must be a function, got {}",
        self.name,
        name,
        other.type_name()
      ))),
    }
  }
}

impl TaskClass for LuaTaskClass {
  /// Calls `Class.validate_config(config)` when the class defines it.
  ///
  /// The function returns the subset to use; returning `nil` keeps the
  /// subset it was given.
  fn validate_config(&self, config: TaskConfig) -> Result<TaskConfig, TaskError> {
    let Some(validate) = self.class_function("validate_config")? else {
      return Ok(config);
    };

    let result: LuaValue = validate.call(self.lua.to_value(&config)?)?;
    match result {
      LuaValue::Nil => Ok(config),
      LuaValue::Table(_) => match self.lua.from_value::<Value>(result)? {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Ok(TaskConfig::new()),
        _ => Err(TaskError::msg(format!(
          "{}.validate_config must return a table with string keys",
          self.name
        ))),
      },
      other => Err(TaskError::msg(format!(
        "{}.validate_config must return a table or nil, got {}",
        self.name,
        other.type_name()
      ))),
    }
  }

  /// Builds the instance table and calls `Class.init` when defined.
  ///
  /// The instance already carries `config`, `input_dir`, `output_dir`,
  /// `tool_path` and `registry` when `init` runs; `init` receives the same
  /// values as arguments.
  fn instantiate(&self, config: TaskConfig, ctx: &BuildContext) -> Result<Box<dyn Task>, TaskError> {
    let lua = &self.lua;
    let config = lua.to_value(&config)?;
    let input_dir = ctx.input_dir.to_string_lossy().into_owned();
    let output_dir = ctx.output_dir.to_string_lossy().into_owned();
    let tool_path = ctx.tool_path.as_ref().map(|p| p.to_string_lossy().into_owned());
    let registry = lua.create_userdata(ctx.registry.clone())?;

    let instance = lua.create_table()?;
    instance.set("config", config.clone())?;
    instance.set("input_dir", input_dir.as_str())?;
    instance.set("output_dir", output_dir.as_str())?;
    instance.set("tool_path", tool_path.as_deref())?;
    instance.set("registry", registry.clone())?;

    let mt = lua.create_table()?;
    mt.set("__index", self.class.clone())?;
    instance.set_metatable(Some(mt))?;

    if let Some(init) = self.class_function("init")? {
      init.call::<()>((instance.clone(), config, input_dir, output_dir, tool_path, registry))?;
    }

    Ok(Box::new(LuaTask {
      _lua: self.lua.clone(),
      instance,
    }))
  }
}

struct LuaTask {
  _lua: Rc<Lua>,
  instance: LuaTable,
}

impl Task for LuaTask {
  fn implements(&self, stage: Stage) -> bool {
    matches!(self.instance.get::<LuaValue>(stage.hook_name()), Ok(LuaValue::Function(_)))
  }

  fn run(&mut self, stage: Stage, on_builds: &OnBuilds) -> Result<(), TaskError> {
    let hook: LuaFunction = self.instance.get(stage.hook_name())?;
    hook.call::<()>((self.instance.clone(), on_builds.clone()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn class_from(lua: &Rc<Lua>, source: &str) -> LuaTaskClass {
    let class: LuaTable = lua.load(source).eval().unwrap();
    LuaTaskClass::new(lua.clone(), "TestTask", class)
  }

  fn config(value: Value) -> TaskConfig {
    match value {
      Value::Object(map) => map,
      _ => panic!("config must be an object"),
    }
  }

  fn ctx() -> BuildContext {
    BuildContext::new("/in", "/out").with_tool_path("/sdk")
  }

  #[test]
  fn missing_validator_passes_config_through() {
    let lua = Rc::new(Lua::new());
    let class = class_from(&lua, "return {}");
    let validated = class.validate_config(config(json!({ "level": 3 }))).unwrap();
    assert_eq!(Value::Object(validated), json!({ "level": 3 }));
  }

  #[test]
  fn validator_can_rewrite_config() {
    let lua = Rc::new(Lua::new());
    let class = class_from(
      &lua,
      r#"
        return {
          validate_config = function(config)
            config.level = (config.level or 0) + 1
            config.checked = true
            return config
          end,
        }
      "#,
    );
    let validated = class.validate_config(config(json!({ "level": 3 }))).unwrap();
    assert_eq!(Value::Object(validated), json!({ "level": 4, "checked": true }));
  }

  #[test]
  fn validator_returning_nil_keeps_config() {
    let lua = Rc::new(Lua::new());
    let class = class_from(&lua, "return { validate_config = function(config) end }");
    let validated = class.validate_config(config(json!({ "a": "b" }))).unwrap();
    assert_eq!(Value::Object(validated), json!({ "a": "b" }));
  }

  #[test]
  fn validator_error_is_surfaced() {
    let lua = Rc::new(Lua::new());
    let class = class_from(
      &lua,
      r#"return { validate_config = function(config) error("level is required") end }"#,
    );
    let err = class.validate_config(TaskConfig::new()).unwrap_err().to_string();
    assert!(err.contains("level is required"), "{}", err);
  }

  #[test]
  fn validator_returning_scalar_is_rejected() {
    let lua = Rc::new(Lua::new());
    let class = class_from(&lua, "return { validate_config = function(config) return 1 end }");
    assert!(matches!(
      class.validate_config(TaskConfig::new()),
      Err(TaskError::Message(_))
    ));
  }

  #[test]
  fn instance_carries_constructor_values() {
    let lua = Rc::new(Lua::new());
    let class = class_from(
      &lua,
      r#"
        local T = {}
        function T:init(config, input_dir, output_dir, tool_path, registry)
          assert(self.config.flavor == config.flavor)
          assert(self.input_dir == input_dir and input_dir == "/in")
          assert(self.output_dir == "/out")
          assert(tool_path == "/sdk")
          registry:set("seen_flavor", config.flavor)
        end
        function T:pre_build(on_builds) end
        return T
      "#,
    );
    let ctx = ctx();
    let task = class.instantiate(config(json!({ "flavor": "mint" })), &ctx).unwrap();

    assert_eq!(ctx.registry.get("seen_flavor"), Some(json!("mint")));
    assert!(task.implements(Stage::PreBuild));
    assert!(!task.implements(Stage::PostBuild));
  }

  #[test]
  fn init_error_is_surfaced() {
    let lua = Rc::new(Lua::new());
    let class = class_from(&lua, r#"return { init = function(self) error("no sdk") end }"#);
    let err = class.instantiate(TaskConfig::new(), &ctx()).err().unwrap().to_string();
    assert!(err.contains("no sdk"), "{}", err);
  }

  #[test]
  fn hooks_receive_shared_on_builds() {
    let lua = Rc::new(Lua::new());
    let class = class_from(
      &lua,
      r#"
        local T = {}
        function T:post_build(on_builds)
          on_builds:set("copied", on_builds:get("mac"))
        end
        return T
      "#,
    );
    let mut task = class.instantiate(TaskConfig::new(), &ctx()).unwrap();
    let on_builds = OnBuilds::new();
    on_builds.set("mac", Some("/out/game-mac.zip".into()));

    task.run(Stage::PostBuild, &on_builds).unwrap();
    assert_eq!(on_builds.get("copied").as_deref(), Some("/out/game-mac.zip"));
  }

  #[test]
  fn non_function_hook_is_not_implemented() {
    let lua = Rc::new(Lua::new());
    let class = class_from(&lua, r#"return { pre_build = "not a function" }"#);
    let task = class.instantiate(TaskConfig::new(), &ctx()).unwrap();
    assert!(!task.implements(Stage::PreBuild));
  }
}
