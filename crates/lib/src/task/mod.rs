//! Tasks: the pluggable units of build-time behavior.
//!
//! - `slug`: the naming convention that turns `YetAnotherTask` into `yet_another`
//! - `types`: the [`TaskClass`]/[`Task`] traits and [`TaskDescriptor`]

mod slug;
mod types;

pub use slug::{slugify, strip_task_suffix, task_slug};
pub use types::{Stage, Task, TaskClass, TaskConfig, TaskDescriptor, TaskError, TaskSummary};
