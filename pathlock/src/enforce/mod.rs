//! Platform enforcement back ends.
//!
//! Call sites only see the [`Enforcer`] trait. On Linux the default is
//! [`LandlockEnforcer`]; everywhere else it is [`NoopEnforcer`], which reports
//! the mechanism as absent so the safety policy can decide what to do.

#[cfg(target_os = "linux")]
mod broadcast;
#[cfg(target_os = "linux")]
mod landlock;

use crate::abi::{CapabilityLevel, Detection};
use crate::compiler::RuleSet;
use crate::error::LockError;

#[cfg(target_os = "linux")]
pub use self::landlock::LandlockEnforcer;

/// A way of committing a rule set to the running process.
pub trait Enforcer: Send + Sync {
    /// Query the platform once for the enforcement level it supports.
    fn detect(&self) -> Detection;

    /// Irrevocably restrict the process to `rules`.
    ///
    /// Only called when [`detect`](Enforcer::detect) reported support, with
    /// the detected level.
    fn enforce(&self, rules: &RuleSet, level: CapabilityLevel) -> Result<(), LockError>;
}

/// Enforcer for platforms without Landlock. Never restricts anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnforcer;

impl Enforcer for NoopEnforcer {
    fn detect(&self) -> Detection {
        Detection::NotLinux
    }

    fn enforce(&self, _rules: &RuleSet, _level: CapabilityLevel) -> Result<(), LockError> {
        Err(LockError::PlatformUnsupported(std::env::consts::OS))
    }
}

/// The enforcer for the platform this crate was built for.
pub fn default_enforcer() -> Box<dyn Enforcer> {
    #[cfg(target_os = "linux")]
    {
        Box::new(LandlockEnforcer)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(NoopEnforcer)
    }
}
