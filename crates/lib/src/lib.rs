//! renconstruct-lib: task discovery and build orchestration for renconstruct
//!
//! This crate provides the pieces a build run is made of:
//! - `locate`: loads task units and finds every registration named `*Task`
//! - `task`: the task contracts, stages and the slug transform
//! - `orchestrate`: validates, instantiates and dispatches tasks around the build
//! - `context`: run-scoped values shared with tasks (registry, `on_builds`)
//! - `config`: the TOML config file that selects and configures tasks

pub mod config;
pub mod consts;
pub mod context;
pub mod locate;
pub mod lua;
pub mod orchestrate;
pub mod task;
