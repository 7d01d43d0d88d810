mod common;
mod discovery_tests;
mod pipeline_tests;
