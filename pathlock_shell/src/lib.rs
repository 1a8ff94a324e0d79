//! # pathlock command
//!
//! Runs a program with its filesystem access locked down by Landlock:
//!
//! ```text
//! pathlock --bundle shared --rule d:rw:/srv/data -- /usr/bin/backup --now
//! ```
//!
//! Rules come from an optional TOML config file and from the command line.
//! The process locks itself and then replaces itself with the command, which
//! inherits the restriction.

pub mod cli;
pub mod config;
pub mod logging;
