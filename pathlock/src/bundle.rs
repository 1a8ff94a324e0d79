//! Named groups of well-known paths that most programs need.
//!
//! Landlock refuses rules on paths that do not exist, so each catalog is
//! filtered down to the entries present on this machine before use. The
//! filtered result is cached in the [`Context`](crate::Context).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::LockError;
use crate::rule::PathRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bundle {
    /// Dynamic linker and shared library locations, needed to run dynamically
    /// linked binaries.
    Shared,
    /// Device nodes and files used for ordinary standard I/O.
    Stdio,
    /// Terminal devices and terminfo databases.
    Tty,
    /// Read, write and create access to the system temp directory.
    Tmp,
    /// Files used for system and virtual machine introspection.
    VmInfo,
    /// Files used for name resolution.
    Dns,
    /// TLS trust roots across common Linux distributions.
    Certs,
}

impl Bundle {
    pub const ALL: [Bundle; 7] = [
        Bundle::Shared,
        Bundle::Stdio,
        Bundle::Tty,
        Bundle::Tmp,
        Bundle::VmInfo,
        Bundle::Dns,
        Bundle::Certs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Bundle::Shared => "shared",
            Bundle::Stdio => "stdio",
            Bundle::Tty => "tty",
            Bundle::Tmp => "tmp",
            Bundle::VmInfo => "vminfo",
            Bundle::Dns => "dns",
            Bundle::Certs => "certs",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Every path this bundle may contribute, before existence filtering.
    pub fn candidates(self) -> Vec<PathRule> {
        match self {
            Bundle::Shared => vec![
                PathRule::file("/dev/null", "rw"),
                PathRule::dir("/lib", "rx"),
                PathRule::dir("/lib64", "rx"),
                PathRule::dir("/usr/lib", "rx"),
                PathRule::dir("/usr/lib64", "rx"),
                PathRule::dir("/usr/libexec", "rx"),
                PathRule::dir("/usr/local/lib", "rx"),
                PathRule::dir("/usr/local/lib64", "rx"),
                PathRule::file("/etc/ld.so.conf", "r"),
                PathRule::file("/etc/ld.so.cache", "r"),
                PathRule::dir("/etc/ld.so.conf.d", "r"),
            ],
            Bundle::Stdio => vec![
                PathRule::file("/dev/full", "rw"),
                PathRule::file("/dev/zero", "r"),
                PathRule::file("/dev/fd", "r"),
                PathRule::file("/dev/stdin", "rw"),
                PathRule::file("/dev/stdout", "rw"),
                PathRule::file("/dev/urandom", "r"),
                PathRule::dir("/dev/log", "w"),
                PathRule::dir("/usr/share/locale", "r"),
                PathRule::file("/proc/self/cmdline", "r"),
                PathRule::file("/usr/share/zoneinfo", "r"),
                PathRule::file("/usr/share/common-licenses", "r"),
                PathRule::file("/proc/sys/kernel/ngroups_max", "r"),
                PathRule::file("/proc/sys/kernel/cap_last_cap", "r"),
                PathRule::file("/proc/sys/vm/overcommit_memory", "r"),
            ],
            Bundle::Tty => vec![
                PathRule::file("/dev/tty", "rw"),
                PathRule::file("/dev/console", "rw"),
                PathRule::file("/etc/terminfo", "r"),
                PathRule::dir("/usr/lib/terminfo", "r"),
                PathRule::dir("/usr/share/terminfo", "r"),
            ],
            Bundle::Tmp => vec![PathRule::dir("/tmp", "rwc")],
            Bundle::VmInfo => vec![
                PathRule::file("/proc/stat", "r"),
                PathRule::file("/proc/meminfo", "r"),
                PathRule::file("/proc/cpuinfo", "r"),
                PathRule::file("/proc/diskstats", "r"),
                PathRule::file("/proc/self/maps", "r"),
                PathRule::file("/proc/sys/kernel/version", "r"),
                PathRule::file("/sys/devices/system/cpu", "r"),
            ],
            Bundle::Dns => vec![
                PathRule::file("/etc/hosts", "r"),
                PathRule::file("/hostname", "r"),
                PathRule::file("/etc/services", "r"),
                PathRule::file("/etc/protocols", "r"),
                PathRule::file("/etc/resolv.conf", "r"),
            ],
            Bundle::Certs => vec![
                // SLES, Debian
                PathRule::dir("/etc/ssl/certs", "r"),
                // Fedora, RHEL
                PathRule::dir("/etc/pki/tls/certs", "r"),
                // Android
                PathRule::dir("/sys/etc/security/cacerts", "r"),
                // OpenSUSE
                PathRule::file("/etc/ssl/ca-bundle.pem", "r"),
                // OpenELEC
                PathRule::file("/etc/pki/tls/cacert.pem", "r"),
                // RHEL 7
                PathRule::file("/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem", "r"),
                // Alpine
                PathRule::file("/etc/ssl/cert.pem", "r"),
            ],
        }
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bundle {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Bundle::ALL
            .into_iter()
            .find(|bundle| bundle.name() == wanted)
            .ok_or_else(|| LockError::ImproperBundle(s.to_string()))
    }
}

/// Keep the candidates whose path `exists` reports as present.
pub fn filter_existing<F>(candidates: Vec<PathRule>, exists: F) -> Vec<PathRule>
where
    F: Fn(&Path) -> bool,
{
    candidates
        .into_iter()
        .filter(|rule| {
            let present = exists(rule.path());
            if !present {
                tracing::trace!(path = %rule.path().display(), "skipping missing bundle path");
            }
            present
        })
        .collect()
}

/// Symlink targets naming an inode outside any mounted filesystem.
const ANONYMOUS_TARGETS: [&str; 3] = ["pipe:", "socket:", "anon_inode:"];

const MAX_LINK_HOPS: usize = 8;

/// Default existence check. The path must `stat` without error and must not
/// lead to a pipe or socket, which Landlock refuses to anchor a rule on.
pub fn path_usable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok() && !is_anonymous_stream(path)
}

/// Follow `path`'s symlinks looking for an anonymous target. `/dev/stdout`
/// ends at `pipe:[N]` when output is piped.
fn is_anonymous_stream(path: &Path) -> bool {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_LINK_HOPS {
        let Ok(target) = std::fs::read_link(&current) else {
            return false;
        };
        let anonymous = target
            .to_str()
            .is_some_and(|t| ANONYMOUS_TARGETS.iter().any(|prefix| t.starts_with(prefix)));
        if anonymous {
            return true;
        }
        current = match current.parent() {
            Some(parent) => parent.join(target),
            None => target,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_names_round_trip() {
        for bundle in Bundle::ALL {
            assert_eq!(bundle.name().parse::<Bundle>().unwrap(), bundle);
            assert_eq!(Bundle::ALL[bundle.index()], bundle);
        }
        assert_eq!(" DNS ".parse::<Bundle>().unwrap(), Bundle::Dns);
        assert!(matches!(
            "nope".parse::<Bundle>(),
            Err(LockError::ImproperBundle(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_catalogs_are_non_empty() {
        for bundle in Bundle::ALL {
            assert!(!bundle.candidates().is_empty(), "{bundle} has no candidates");
        }
    }

    #[test]
    fn test_tmp_bundle_is_writable_directory() {
        let tmp = Bundle::Tmp.candidates();
        assert_eq!(tmp, vec![PathRule::dir("/tmp", "rwc")]);
    }

    #[test]
    fn test_filter_keeps_only_existing() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present");
        std::fs::write(&present, b"x").unwrap();
        let missing = temp.path().join("missing");

        let kept = filter_existing(
            vec![PathRule::file(&present, "r"), PathRule::file(&missing, "r")],
            path_usable,
        );
        assert_eq!(kept, vec![PathRule::file(&present, "r")]);
    }

    #[test]
    fn test_filter_can_return_nothing() {
        let temp = TempDir::new().unwrap();
        let kept = filter_existing(
            vec![
                PathRule::file(temp.path().join("a"), "r"),
                PathRule::dir(temp.path().join("b"), "rw"),
            ],
            path_usable,
        );
        assert!(kept.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_piped_stream_is_not_usable() {
        use std::os::fd::AsRawFd;
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let (reader, writer) = std::io::pipe().unwrap();
        let stream = temp.path().join("stdout");
        symlink(format!("/proc/self/fd/{}", writer.as_raw_fd()), &stream).unwrap();
        let chained = temp.path().join("chained");
        symlink(&stream, &chained).unwrap();

        assert!(std::fs::metadata(&stream).is_ok());
        assert!(!path_usable(&stream));
        assert!(!path_usable(&chained));
        drop((reader, writer));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_regular_file_is_usable() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        std::fs::write(&target, b"x").unwrap();
        let link = temp.path().join("link");
        symlink("target", &link).unwrap();

        assert!(path_usable(&link));
    }

    #[test]
    fn test_filter_with_custom_check() {
        let kept = filter_existing(Bundle::Dns.candidates(), |p| p == Path::new("/etc/hosts"));
        assert_eq!(kept, vec![PathRule::file("/etc/hosts", "r")]);
    }
}
