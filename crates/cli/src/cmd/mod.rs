mod build;
mod tasks;

pub use build::cmd_build;
pub use tasks::cmd_tasks;
