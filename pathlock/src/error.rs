use std::io;

/// Errors produced while building or enforcing a filesystem lockdown.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("improper path")]
    ImproperPath,

    #[error("improper mode")]
    ImproperMode,

    #[error("improper filetype")]
    ImproperType,

    #[error("improper safety level '{0}' (expected mandatory, only-supported, only-available or try)")]
    ImproperSafety(String),

    #[error("unknown rule bundle '{0}'")]
    ImproperBundle(String),

    #[error("landlock version detection failure")]
    VersionUndetectable,

    #[error("landlock is not supported by this kernel{}", format_errno(*.errno))]
    MechanismUnsupported { errno: Option<i32> },

    #[error("landlock is not supported on this platform ({0})")]
    PlatformUnsupported(&'static str),

    #[error("landlock not available: {0}")]
    EnforcementUnavailable(#[source] Box<LockError>),

    #[error("landlock failed to lock: {0}")]
    EnforcementFailed(#[source] io::Error),

    #[error("landlock experienced an unexpected bug: {0}")]
    UnexpectedState(&'static str),
}

impl LockError {
    /// Malformed caller input. These are never downgraded by a lenient safety level.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LockError::ImproperPath
                | LockError::ImproperMode
                | LockError::ImproperType
                | LockError::ImproperSafety(_)
                | LockError::ImproperBundle(_)
        )
    }

    pub(crate) fn failed(err: io::Error) -> Self {
        LockError::EnforcementFailed(err)
    }
}

fn format_errno(errno: Option<i32>) -> String {
    match errno {
        Some(code) => format!(" (detection failed: {})", io::Error::from_raw_os_error(code)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(LockError::ImproperPath.is_validation());
        assert!(LockError::ImproperMode.is_validation());
        assert!(LockError::ImproperType.is_validation());
        assert!(LockError::ImproperBundle("x".into()).is_validation());
        assert!(!LockError::VersionUndetectable.is_validation());
        assert!(!LockError::UnexpectedState("x").is_validation());
        assert!(!LockError::failed(io::Error::from_raw_os_error(1)).is_validation());
    }

    #[test]
    fn test_unsupported_message_mentions_errno() {
        let err = LockError::MechanismUnsupported { errno: Some(38) };
        assert!(err.to_string().contains("detection failed"));

        let err = LockError::MechanismUnsupported { errno: None };
        assert_eq!(err.to_string(), "landlock is not supported by this kernel");
    }
}
