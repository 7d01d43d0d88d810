//! Run-scoped key/value store shared by every task of a build.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mlua::prelude::*;
use serde_json::Value;

/// A mutable store handed by reference to every task of one run.
///
/// Cloning yields another handle to the same store. Tasks use it to publish
/// state for tasks that run after them.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
  entries: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl SharedRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    self.entries.borrow().get(key).cloned()
  }

  /// Store `value` under `key`. Storing `null` removes the key.
  pub fn set(&self, key: impl Into<String>, value: Value) {
    let key = key.into();
    let mut entries = self.entries.borrow_mut();
    if value.is_null() {
      entries.remove(&key);
    } else {
      entries.insert(key, value);
    }
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.borrow().contains_key(key)
  }

  pub fn keys(&self) -> Vec<String> {
    self.entries.borrow().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }

  /// Whether both handles point at the same store.
  pub fn same_store(&self, other: &SharedRegistry) -> bool {
    Rc::ptr_eq(&self.entries, &other.entries)
  }
}

impl LuaUserData for SharedRegistry {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("get", |lua, this, key: String| match this.get(&key) {
      Some(value) => lua.to_value(&value),
      None => Ok(LuaValue::Nil),
    });

    methods.add_method("set", |lua, this, (key, value): (String, LuaValue)| {
      let value: Value = lua.from_value(value)?;
      this.set(key, value);
      Ok(())
    });

    methods.add_method("has", |_, this, key: String| Ok(this.contains(&key)));

    methods.add_method("keys", |_, this, ()| Ok(this.keys()));
  }
}
