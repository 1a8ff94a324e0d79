//! Landlock ABI negotiation.
//!
//! The kernel reports the highest Landlock ABI revision it implements. Each
//! revision adds access rights: v2 adds `Refer`, v3 adds `Truncate`.

use std::fmt;

use crate::error::LockError;

/// Negotiated Landlock ABI revision. Zero means unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CapabilityLevel(u32);

impl CapabilityLevel {
    pub const UNSUPPORTED: CapabilityLevel = CapabilityLevel(0);

    pub const fn new(version: u32) -> Self {
        CapabilityLevel(version)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn is_supported(self) -> bool {
        self.0 > 0
    }

    /// Cross-directory link and rename (`Refer`) exists from v2.
    pub fn has_refer(self) -> bool {
        self.0 >= 2
    }

    /// `Truncate` exists from v3.
    pub fn has_truncate(self) -> bool {
        self.0 >= 3
    }

    /// The `landlock` crate ABI covering the rights we know how to grant.
    ///
    /// Capped at v3: later revisions only add rights no mode letter maps to,
    /// and handling them would deny them unconditionally.
    #[cfg(target_os = "linux")]
    pub(crate) fn abi(self) -> landlock::ABI {
        match self.0 {
            0 => landlock::ABI::Unsupported,
            1 => landlock::ABI::V1,
            2 => landlock::ABI::V2,
            _ => landlock::ABI::V3,
        }
    }
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_supported() {
            write!(f, "v{}", self.0)
        } else {
            f.write_str("unsupported")
        }
    }
}

/// Result of probing the running kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Landlock is usable at this revision.
    Supported(CapabilityLevel),
    /// The kernel knows the syscall but Landlock is compiled out or disabled.
    Disabled,
    /// The version query itself failed with this errno.
    Failed(i32),
    /// The kernel returned a value that is not a valid revision.
    Undetectable,
    /// Not a Linux system; the mechanism does not exist here at all.
    NotLinux,
}

impl Detection {
    /// Classify the raw return of the version query.
    pub fn from_raw(ret: i64, errno: i32) -> Self {
        match ret {
            -1 if errno != 0 => Detection::Failed(errno),
            v if v < 0 => Detection::Undetectable,
            0 => Detection::Disabled,
            v => match u32::try_from(v) {
                Ok(version) => Detection::Supported(CapabilityLevel::new(version)),
                Err(_) => Detection::Undetectable,
            },
        }
    }

    pub fn level(self) -> CapabilityLevel {
        match self {
            Detection::Supported(level) => level,
            _ => CapabilityLevel::UNSUPPORTED,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Detection::Supported(_))
    }

    /// The version, or the reason Landlock cannot be used.
    pub fn version(self) -> Result<u32, LockError> {
        match self {
            Detection::Supported(level) => Ok(level.get()),
            Detection::Disabled => Err(LockError::MechanismUnsupported { errno: None }),
            Detection::Failed(errno) => Err(LockError::MechanismUnsupported { errno: Some(errno) }),
            Detection::Undetectable => Err(LockError::VersionUndetectable),
            Detection::NotLinux => Err(LockError::PlatformUnsupported(std::env::consts::OS)),
        }
    }
}

#[cfg(target_os = "linux")]
const LANDLOCK_CREATE_RULESET_VERSION: libc::c_uint = 1 << 0;

/// Ask the kernel for its Landlock ABI revision.
#[cfg(target_os = "linux")]
pub(crate) fn query() -> Detection {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_landlock_create_ruleset,
            std::ptr::null::<libc::c_void>(),
            0usize,
            LANDLOCK_CREATE_RULESET_VERSION,
        )
    };
    let errno = if ret < 0 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    } else {
        0
    };
    let detection = Detection::from_raw(i64::from(ret), errno);
    tracing::debug!(?detection, "queried landlock abi");
    detection
}
