//! Names shared between the Lua runtime, the locator and the config layer.

/// Suffix a registered name must carry to be picked up as a task.
pub const TASK_SUFFIX: &str = "Task";

/// Global table exposed to task units.
pub const LUA_GLOBAL: &str = "renconstruct";

/// File extension of task units.
pub const UNIT_EXTENSION: &str = "lua";

/// Config file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "renconstruct.toml";

/// Environment variables handed to the build step.
pub const ENV_INPUT_DIR: &str = "RENCONSTRUCT_INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "RENCONSTRUCT_OUTPUT_DIR";
