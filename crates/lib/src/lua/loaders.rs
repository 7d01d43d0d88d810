//! Loading task units.
//!
//! Every unit runs in its own environment table so that helper locals and
//! globals one unit defines never leak into another. The environment falls
//! back to `_G` for reads, which keeps the standard library and the
//! `renconstruct` table reachable.

use std::fs;
use std::path::Path;

use mlua::prelude::*;

/// Load and execute a unit file in an isolated environment.
///
/// The environment carries:
/// - `__dir` - the directory containing the unit
/// - `__file` - the unit's own path
///
/// Writes to globals land in the environment table, reads fall through to `_G`.
pub fn load_unit(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))?;

  let content = fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  let dir = canonical_path
    .parent()
    .unwrap_or(Path::new("."))
    .to_string_lossy()
    .into_owned();

  let env = lua.create_table()?;
  env.set("__dir", dir)?;
  env.set("__file", canonical_path.to_string_lossy().into_owned())?;

  let mt = lua.create_table()?;
  mt.set("__index", lua.globals())?;
  env.set_metatable(Some(mt))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .set_environment(env)
    .eval::<LuaValue>()
}

/// Prepend `dir` to `package.path` so units can `require` siblings.
pub fn add_package_dir(lua: &Lua, dir: &Path) -> LuaResult<()> {
  let package: LuaTable = lua.globals().get("package")?;
  let current: String = package.get("path")?;
  let dir = dir.to_string_lossy();
  package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{current}"))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn unit_sees_its_own_dir() -> LuaResult<()> {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("unit.lua");
    fs::write(&path, "return __dir").unwrap();

    let lua = Lua::new();
    let dir: String = lua.unpack(load_unit(&lua, &path)?)?;

    let expected = dunce::canonicalize(temp.path()).unwrap();
    assert_eq!(dir, expected.to_string_lossy());
    Ok(())
  }

  #[test]
  fn unit_globals_do_not_leak() -> LuaResult<()> {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.lua");
    let second = temp.path().join("second.lua");
    fs::write(&first, "Helper = 1\nreturn Helper").unwrap();
    fs::write(&second, "return Helper").unwrap();

    let lua = Lua::new();
    let value: i64 = lua.unpack(load_unit(&lua, &first)?)?;
    assert_eq!(value, 1);
    assert!(load_unit(&lua, &second)?.is_nil());
    assert!(lua.globals().get::<LuaValue>("Helper")?.is_nil());
    Ok(())
  }

  #[test]
  fn unit_reads_globals() -> LuaResult<()> {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("unit.lua");
    fs::write(&path, "return string.upper('x')").unwrap();

    let lua = Lua::new();
    let value: String = lua.unpack(load_unit(&lua, &path)?)?;
    assert_eq!(value, "X");
    Ok(())
  }

  #[test]
  fn syntax_error_names_the_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.lua");
    fs::write(&path, "local x = ").unwrap();

    let lua = Lua::new();
    let err = load_unit(&lua, &path).unwrap_err().to_string();
    assert!(err.contains("broken.lua"), "{}", err);
  }

  #[test]
  fn missing_file_is_an_error() {
    let lua = Lua::new();
    assert!(load_unit(&lua, Path::new("/nonexistent/unit.lua")).is_err());
  }

  #[test]
  fn require_finds_siblings() -> LuaResult<()> {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("shared.lua"), "return { answer = 42 }").unwrap();
    let path = temp.path().join("unit.lua");
    fs::write(&path, "return require('shared').answer").unwrap();

    let lua = Lua::new();
    add_package_dir(&lua, temp.path())?;
    let value: i64 = lua.unpack(load_unit(&lua, &path)?)?;
    assert_eq!(value, 42);
    Ok(())
  }
}
