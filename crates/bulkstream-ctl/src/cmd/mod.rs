//! CLI command modules.

pub mod config;
pub mod index;
pub mod run;
