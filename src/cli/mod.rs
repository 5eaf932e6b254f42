//! CLI module for cadence - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for the sweep daemon,
//! scheduling from files, and inspecting schedules.

pub mod commands;

pub use commands::{Cli, Commands};
