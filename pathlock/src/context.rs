use std::fmt;
use std::path::Path;
use std::sync::{LazyLock, OnceLock};

use crate::abi::Detection;
use crate::bundle::{self, Bundle};
use crate::enforce::{self, Enforcer};
use crate::rule::PathRule;

type ExistsCheck = Box<dyn Fn(&Path) -> bool + Send + Sync>;

static PROCESS: LazyLock<Context> = LazyLock::new(Context::new);

/// Process-lifetime facts the lock machinery needs: which enforcer to use,
/// what the kernel supports, and which bundle paths exist.
///
/// Detection and bundle filtering each happen at most once per context, even
/// under concurrent first use, and never change afterwards.
pub struct Context {
    enforcer: Box<dyn Enforcer>,
    exists: ExistsCheck,
    detection: OnceLock<Detection>,
    bundles: [OnceLock<Vec<PathRule>>; Bundle::ALL.len()],
}

impl Context {
    /// A fresh context using the platform's default enforcer.
    pub fn new() -> Self {
        Self::with_enforcer(enforce::default_enforcer())
    }

    pub fn with_enforcer(enforcer: Box<dyn Enforcer>) -> Self {
        Self {
            enforcer,
            exists: Box::new(bundle::path_usable),
            detection: OnceLock::new(),
            bundles: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Replace the existence check used when filtering bundles.
    pub fn with_exists_check<F>(mut self, exists: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.exists = Box::new(exists);
        self
    }

    /// The context shared by the whole process.
    pub fn process() -> &'static Context {
        &PROCESS
    }

    /// What the platform supports, queried on first call.
    pub fn detection(&self) -> Detection {
        *self.detection.get_or_init(|| self.enforcer.detect())
    }

    /// The members of `bundle` that exist, filtered on first call.
    pub fn bundle(&self, bundle: Bundle) -> &[PathRule] {
        self.bundles[bundle.index()].get_or_init(|| {
            let kept = bundle::filter_existing(bundle.candidates(), |p| (self.exists)(p));
            tracing::debug!(%bundle, paths = kept.len(), "resolved rule bundle");
            kept
        })
    }

    pub(crate) fn enforcer(&self) -> &dyn Enforcer {
        self.enforcer.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("detection", &self.detection.get())
            .finish_non_exhaustive()
    }
}
