//! CLI command handlers
//!
//! This module contains all the command handlers for the bugmonitor CLI.
//! Each subcommand is implemented in its own module.

pub mod helpers;
pub mod init;
pub mod log;
pub mod process;
pub mod ranking;
pub mod tags;
pub mod watch;
