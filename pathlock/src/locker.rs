use std::fmt;

use crate::abi::Detection;
use crate::compiler::RuleSet;
use crate::context::Context;
use crate::error::LockError;
use crate::rule::Rule;
use crate::safety::{self, Outcome, Safety};

/// Restricts the current process to a fixed set of paths.
///
/// ```rust,no_run
/// use pathlock::{Bundle, Locker, PathRule, Rule, Safety};
///
/// let locker = Locker::new([
///     Rule::from(Bundle::Shared),
///     Rule::from(PathRule::dir("/srv/app", "rw")),
///     Rule::from(PathRule::file("/usr/bin/git", "rx")),
/// ]);
/// locker.lock(Safety::OnlyAvailable)?;
/// # Ok::<(), pathlock::LockError>(())
/// ```
#[derive(Debug)]
pub struct Locker<'c> {
    ctx: &'c Context,
    rules: RuleSet,
}

impl Locker<'static> {
    /// Build a locker against the process-wide context.
    pub fn new<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Locker::with_context(Context::process(), rules)
    }
}

impl<'c> Locker<'c> {
    pub fn with_context<I, R>(ctx: &'c Context, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self {
            ctx,
            rules: RuleSet::build(rules, ctx),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Commit the rules to every thread of this process.
    ///
    /// On success the restriction lasts for the rest of the process's life.
    /// Calling `lock` again can only narrow access further.
    pub fn lock(&self, safety: Safety) -> Result<(), LockError> {
        let outcome = self.attempt();
        if matches!(outcome, Outcome::Succeeded) {
            tracing::info!(rules = %self.rules, "landlock restrictions enforced");
        }
        safety::resolve(safety, outcome)
    }

    fn attempt(&self) -> Outcome {
        match self.ctx.detection() {
            Detection::NotLinux => Outcome::PlatformUnsupported,
            Detection::Supported(level) => {
                tracing::debug!(%level, rules = self.rules.len(), "enforcing landlock ruleset");
                match self.ctx.enforcer().enforce(&self.rules, level) {
                    Ok(()) => Outcome::Succeeded,
                    Err(err) => Outcome::Failed(err),
                }
            }
            unsupported => match unsupported.version() {
                Err(reason) => Outcome::KernelUnsupported(reason),
                Ok(_) => Outcome::Failed(LockError::UnexpectedState(
                    "unsupported detection reported a version",
                )),
            },
        }
    }
}

impl fmt::Display for Locker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rules, f)
    }
}
