use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::LUA_GLOBAL;
use crate::lua::loaders;

/// A `renconstruct.register(name, class)` call made by a unit.
#[derive(Debug, Clone)]
pub struct Registration {
  pub name: String,
  pub class: LuaTable,
}

/// The Lua state task units are loaded into.
///
/// One runtime backs a whole discovery pass; every class table a unit
/// registers stays owned by it, so the runtime is shared (`Rc`) with the
/// task handles created from those tables.
pub struct TaskRuntime {
  lua: Rc<Lua>,
  pending: Rc<RefCell<Vec<Registration>>>,
}

impl TaskRuntime {
  /// Create a runtime with the `renconstruct` global registered.
  pub fn new() -> LuaResult<Self> {
    let lua = Lua::new();
    let pending = Rc::new(RefCell::new(Vec::new()));
    register_globals(&lua, pending.clone())?;
    Ok(Self {
      lua: Rc::new(lua),
      pending,
    })
  }

  pub fn lua(&self) -> &Rc<Lua> {
    &self.lua
  }

  /// Load one unit and return what it registered, in call order.
  pub fn load_unit(&self, path: &Path) -> LuaResult<Vec<Registration>> {
    self.pending.borrow_mut().clear();
    let result = loaders::load_unit(&self.lua, path);
    let registered = std::mem::take(&mut *self.pending.borrow_mut());
    result?;
    debug!(path = %path.display(), count = registered.len(), "unit loaded");
    Ok(registered)
  }

  /// Let units `require` modules that live next to them.
  pub fn add_package_dir(&self, dir: &Path) -> LuaResult<()> {
    loaders::add_package_dir(&self.lua, dir)
  }
}

/// Register the `renconstruct` global table.
///
/// - `renconstruct.register(name, class)` - declare a task
/// - `renconstruct.info/warn/debug(message)` - log through the host's logger
fn register_globals(lua: &Lua, pending: Rc<RefCell<Vec<Registration>>>) -> LuaResult<()> {
  let rc = lua.create_table()?;

  let register = lua.create_function(move |_, (name, class): (LuaValue, LuaValue)| {
    let name = match name {
      LuaValue::String(s) => s.to_str()?.to_string(),
      other => {
        return Err(LuaError::external(format!(
          "register: task name must be a string, got {}",
          other.type_name()
        )));
      }
    };
    let class = match class {
      LuaValue::Table(t) => t,
      other => {
        return Err(LuaError::external(format!(
          "register: class for '{}' must be a table, got {}",
          name,
          other.type_name()
        )));
      }
    };
    pending.borrow_mut().push(Registration { name, class });
    Ok(())
  })?;
  rc.set("register", register)?;

  rc.set(
    "info",
    lua.create_function(|_, message: String| {
      info!(target: "renconstruct::task", "{}", message);
      Ok(())
    })?,
  )?;
  rc.set(
    "warn",
    lua.create_function(|_, message: String| {
      warn!(target: "renconstruct::task", "{}", message);
      Ok(())
    })?,
  )?;
  rc.set(
    "debug",
    lua.create_function(|_, message: String| {
      debug!(target: "renconstruct::task", "{}", message);
      Ok(())
    })?,
  )?;

  lua.globals().set(LUA_GLOBAL, rc)?;
  Ok(())
}
