//! # fieldbox
//!
//! Library half of the `fieldbox` binary: configuration loading and the CLI
//! commands, kept here so integration tests can drive them directly.

pub mod cli;
pub mod config;
