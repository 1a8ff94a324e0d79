//! # pathlock
//!
//! Irrevocable filesystem self-sandboxing for a process, built on the Linux
//! Landlock LSM.
//!
//! A program describes the paths it needs and how it needs them, then calls
//! [`Locker::lock`] once, early, before running anything untrusted. From that
//! point every thread of the process, and every process it spawns, can only
//! reach those paths. The restriction can be narrowed further but never
//! lifted.
//!
//! ## Rules
//!
//! A [`PathRule`] names a file or directory and a mode made of:
//!
//! - `r` read files (and list directories)
//! - `w` write files (and truncate, on kernels with Landlock ABI v3+)
//! - `c` create and remove entries in a directory
//! - `x` execute
//!
//! Rules can be written as `"<d|f>:<mode>:<path>"`, e.g. `d:rw:/srv/data`.
//! A [`Bundle`] stands for a vetted group of common paths such as the shared
//! libraries needed to run dynamically linked programs.
//!
//! ## Safety levels
//!
//! Landlock needs Linux 5.13+ with the LSM enabled. [`Safety`] decides what
//! happens when it is missing or enforcement fails: `Mandatory` always fails,
//! `Try` never does, and the two levels in between distinguish non-Linux
//! platforms and Linux kernels without Landlock.
//!
//! ## Platform support
//!
//! On non-Linux platforms every lock is a no-op, so calling code needs no
//! conditional compilation; only `Mandatory` reports an error there.

pub mod abi;
#[cfg(target_os = "linux")]
pub mod access;
pub mod bundle;
pub mod compiler;
pub mod context;
pub mod enforce;
pub mod error;
pub mod locker;
pub mod rule;
pub mod safety;

pub use abi::{CapabilityLevel, Detection};
pub use bundle::Bundle;
pub use compiler::RuleSet;
pub use context::Context;
pub use enforce::{Enforcer, NoopEnforcer, default_enforcer};
pub use error::LockError;
pub use locker::Locker;
pub use rule::{PathRule, Rule};
pub use safety::Safety;

/// The Landlock ABI version of the running kernel, or why there is none.
pub fn detect() -> Result<u32, LockError> {
    Context::process().detection().version()
}

/// Whether Landlock can be enforced here.
pub fn available() -> bool {
    Context::process().detection().is_available()
}

/// Restrict the process to `rules` in one call.
pub fn lock<I, R>(rules: I, safety: Safety) -> Result<(), LockError>
where
    I: IntoIterator<Item = R>,
    R: Into<Rule>,
{
    Locker::new(rules).lock(safety)
}
