use std::fmt;
use std::str::FromStr;

use crate::error::LockError;

/// How strictly a lock attempt treats a missing or failing Landlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Safety {
    /// Fail on any problem, including platforms without Landlock.
    #[default]
    Mandatory,
    /// Fail on any problem on Linux, including kernels built without
    /// Landlock. Other platforms continue unrestricted.
    OnlySupported,
    /// Fail only if Landlock is available and enforcing it fails.
    OnlyAvailable,
    /// Never fail; continue unrestricted if enforcement does not happen.
    Try,
}

impl Safety {
    pub const ALL: [Safety; 4] = [
        Safety::Mandatory,
        Safety::OnlySupported,
        Safety::OnlyAvailable,
        Safety::Try,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Safety::Mandatory => "mandatory",
            Safety::OnlySupported => "only-supported",
            Safety::OnlyAvailable => "only-available",
            Safety::Try => "try",
        }
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Safety {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Safety::ALL
            .into_iter()
            .find(|safety| safety.name() == wanted)
            .ok_or_else(|| LockError::ImproperSafety(s.to_string()))
    }
}

/// What happened when a lock was attempted.
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    /// The platform has no Landlock at all.
    PlatformUnsupported,
    /// Linux, but this kernel cannot enforce Landlock.
    KernelUnsupported(LockError),
    /// Enforcement was attempted and did not complete.
    Failed(LockError),
}

/// Turn an outcome into the caller's result according to `safety`.
///
/// Malformed input and internal bugs are errors under every safety level.
pub fn resolve(safety: Safety, outcome: Outcome) -> Result<(), LockError> {
    match outcome {
        Outcome::Succeeded => Ok(()),
        Outcome::Failed(err)
            if err.is_validation() || matches!(err, LockError::UnexpectedState(_)) =>
        {
            Err(err)
        }
        Outcome::PlatformUnsupported => match safety {
            Safety::Mandatory => Err(LockError::EnforcementUnavailable(Box::new(
                LockError::PlatformUnsupported(std::env::consts::OS),
            ))),
            Safety::OnlySupported | Safety::OnlyAvailable | Safety::Try => {
                tracing::warn!(
                    %safety,
                    "landlock is not supported on this platform; continuing unrestricted"
                );
                Ok(())
            }
        },
        Outcome::KernelUnsupported(reason) => match safety {
            Safety::Mandatory | Safety::OnlySupported => {
                Err(LockError::EnforcementUnavailable(Box::new(reason)))
            }
            Safety::OnlyAvailable | Safety::Try => {
                tracing::warn!(%safety, %reason, "landlock unavailable; continuing unrestricted");
                Ok(())
            }
        },
        Outcome::Failed(err) => match safety {
            Safety::Try => {
                tracing::warn!(
                    error = %err,
                    "landlock enforcement failed; continuing unrestricted"
                );
                Ok(())
            }
            Safety::Mandatory | Safety::OnlySupported | Safety::OnlyAvailable => Err(err),
        },
    }
}
