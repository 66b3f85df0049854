//! Command-line interface components
//!
//! This module contains CLI-specific code for the NetSound Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs, SearchArgs};
pub use commands::{execute_search, handle_config, handle_search, SearchOptions, SearchReport};
pub use progress::{ProgressConfig, ProgressDisplay};
