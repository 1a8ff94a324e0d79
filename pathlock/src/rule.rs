use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pathlock_common::Keyed;

use crate::bundle::Bundle;
use crate::error::LockError;

/// A single filesystem target and the access granted on it.
///
/// The mode is a string of one or more of:
/// - `r` read
/// - `w` write
/// - `c` create and delete entries (directories only)
/// - `x` execute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathRule {
    path: PathBuf,
    mode: String,
    dir: bool,
}

impl PathRule {
    /// Build a rule from a kind (`file`/`f` or `dir`/`d`), a mode, and a path.
    pub fn new(kind: &str, mode: &str, path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref();
        if !is_proper_type(kind) {
            return Err(LockError::ImproperType);
        }
        if !is_proper_mode(mode) {
            return Err(LockError::ImproperMode);
        }
        if !is_proper_path(path) {
            return Err(LockError::ImproperPath);
        }
        Ok(Self {
            path: path.to_path_buf(),
            mode: mode.to_string(),
            dir: matches!(kind, "d" | "dir"),
        })
    }

    /// A rule for a regular file, FIFO, socket, or symlink.
    ///
    /// A file rule cannot be used to create or delete files.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty or `mode` is not made of `rwcx`.
    pub fn file(path: impl AsRef<Path>, mode: &str) -> Self {
        Self::literal(path.as_ref(), mode, false)
    }

    /// A rule for a directory and everything beneath it.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty or `mode` is not made of `rwcx`.
    pub fn dir(path: impl AsRef<Path>, mode: &str) -> Self {
        Self::literal(path.as_ref(), mode, true)
    }

    fn literal(path: &Path, mode: &str, dir: bool) -> Self {
        if !is_proper_path(path) {
            panic!("improper path");
        }
        if !is_proper_mode(mode) {
            panic!("improper mode {mode:?} for {}", path.display());
        }
        Self {
            path: path.to_path_buf(),
            mode: mode.to_string(),
            dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn is_dir(&self) -> bool {
        self.dir
    }

    /// The `<kind>:<mode>:<path>` form accepted by [`FromStr`].
    pub fn shorthand(&self) -> String {
        let kind = if self.dir { "d" } else { "f" };
        format!("{kind}:{}:{}", self.mode, self.path.display())
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.dir { "dir" } else { "file" };
        write!(f, "({}:{}:{})", self.mode, kind, self.path.display())
    }
}

/// Parses `"<kind>:<mode>:<path>"`, e.g. `d:rw:/home/me` or `f:x:/bin/cat`.
///
/// Only the first two colons separate fields, so the path may contain colons.
impl FromStr for PathRule {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LockError::ImproperPath);
        }
        let mut tokens = s.splitn(3, ':');
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(kind), Some(mode), Some(path)) => PathRule::new(kind, mode, path),
            _ => Err(LockError::ImproperPath),
        }
    }
}

impl Keyed for PathRule {
    type Key = PathBuf;

    fn key(&self) -> PathBuf {
        self.path.clone()
    }
}

/// An entry in a rule list: either a concrete path or a reference to a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Path(PathRule),
    Bundle(Bundle),
}

impl From<PathRule> for Rule {
    fn from(rule: PathRule) -> Self {
        Rule::Path(rule)
    }
}

impl From<Bundle> for Rule {
    fn from(bundle: Bundle) -> Self {
        Rule::Bundle(bundle)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Path(rule) => rule.fmt(f),
            Rule::Bundle(bundle) => write!(f, "<{bundle}>"),
        }
    }
}

pub fn is_proper_type(kind: &str) -> bool {
    matches!(kind, "d" | "f" | "dir" | "file")
}

/// Whether `mode` is non-empty and made only of `r`, `w`, `c`, `x`.
pub fn is_proper_mode(mode: &str) -> bool {
    !mode.is_empty() && mode.chars().all(|c| matches!(c, 'r' | 'w' | 'c' | 'x'))
}

pub fn is_proper_path(path: &Path) -> bool {
    !path.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directory_rule() {
        let rule: PathRule = "d:rw:/tmp".parse().unwrap();
        assert!(rule.is_dir());
        assert_eq!(rule.mode(), "rw");
        assert_eq!(rule.path(), Path::new("/tmp"));
    }

    #[test]
    fn test_parse_file_rule() {
        let rule: PathRule = "  f:x:/bin/cat\n".parse().unwrap();
        assert!(!rule.is_dir());
        assert_eq!(rule, PathRule::file("/bin/cat", "x"));
    }

    #[test]
    fn test_parse_keeps_colons_in_path() {
        let rule: PathRule = "f:r:/srv/a:b:c".parse().unwrap();
        assert_eq!(rule.path(), Path::new("/srv/a:b:c"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("f::/x".parse::<PathRule>(), Err(LockError::ImproperMode)));
        assert!(matches!("x:r:/x".parse::<PathRule>(), Err(LockError::ImproperType)));
        assert!(matches!("".parse::<PathRule>(), Err(LockError::ImproperPath)));
        assert!(matches!("   ".parse::<PathRule>(), Err(LockError::ImproperPath)));
        assert!(matches!("d:r".parse::<PathRule>(), Err(LockError::ImproperPath)));
        assert!(matches!("d:r:".parse::<PathRule>(), Err(LockError::ImproperPath)));
        assert!(matches!("d:rz:/x".parse::<PathRule>(), Err(LockError::ImproperMode)));
    }

    #[test]
    fn test_new_accepts_long_kinds() {
        assert!(PathRule::new("dir", "r", "/etc").unwrap().is_dir());
        assert!(!PathRule::new("file", "r", "/etc/hosts").unwrap().is_dir());
        assert!(matches!(
            PathRule::new("folder", "r", "/etc"),
            Err(LockError::ImproperType)
        ));
    }

    #[test]
    fn test_parse_matches_constructor() {
        let parsed: PathRule = "d:rwc:/var/lib/app".parse().unwrap();
        assert_eq!(parsed, PathRule::new("dir", "rwc", "/var/lib/app").unwrap());
        assert_eq!(parsed, PathRule::dir("/var/lib/app", "rwc"));
    }

    #[test]
    fn test_equality_includes_directory_flag() {
        assert_ne!(PathRule::file("/opt", "r"), PathRule::dir("/opt", "r"));
        assert_ne!(PathRule::dir("/opt", "r"), PathRule::dir("/opt", "rw"));
        assert_eq!(PathRule::dir("/opt", "r"), PathRule::dir("/opt", "r"));
    }

    #[test]
    fn test_key_is_path_only() {
        assert_eq!(
            PathRule::file("/opt", "r").key(),
            PathRule::dir("/opt", "rwc").key()
        );
    }

    #[test]
    fn test_rendering() {
        let rule = PathRule::dir("/tmp", "rwc");
        assert_eq!(rule.to_string(), "(rwc:dir:/tmp)");
        assert_eq!(rule.shorthand(), "d:rwc:/tmp");
        assert_eq!(rule.shorthand().parse::<PathRule>().unwrap(), rule);
        assert_eq!(Rule::from(Bundle::Dns).to_string(), "<dns>");
    }

    #[test]
    #[should_panic(expected = "improper path")]
    fn test_file_panics_on_empty_path() {
        let _ = PathRule::file("", "r");
    }

    #[test]
    #[should_panic(expected = "improper mode")]
    fn test_dir_panics_on_bad_mode() {
        let _ = PathRule::dir("/tmp", "rq");
    }
}
