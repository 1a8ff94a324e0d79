use std::error::Error;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use landlock::{
    CompatLevel, Compatible, PathBeneath, PathFd, Ruleset, RulesetAttr, RulesetCreated,
    RulesetCreatedAttr,
};

use crate::abi::{self, CapabilityLevel, Detection};
use crate::compiler::{CompiledRule, RuleSet};
use crate::error::LockError;

use super::{Enforcer, broadcast};

/// Enforces rules through the kernel's Landlock LSM.
#[derive(Debug, Default, Clone, Copy)]
pub struct LandlockEnforcer;

impl Enforcer for LandlockEnforcer {
    fn detect(&self) -> Detection {
        abi::query()
    }

    fn enforce(&self, rules: &RuleSet, level: CapabilityLevel) -> Result<(), LockError> {
        let compiled = rules.compile(level);
        let mut gateway = Gateway::new(level);
        let result = gateway.run(&compiled);
        if let Err(err) = &result {
            tracing::debug!(stage = gateway.stage(), error = %err, "landlock enforcement aborted");
        }
        result
    }
}

/// Progress of one enforcement attempt. A failed attempt leaves no kernel
/// state behind except what a completed broadcast already applied.
enum State {
    Unbuilt,
    RulesetCreated(RulesetCreated),
    RulesAttached(RulesetCreated),
    PrivilegesDropped(OwnedFd),
    Restricted,
    Failed,
}

struct Gateway {
    level: CapabilityLevel,
    state: State,
    attempted: &'static str,
}

impl Gateway {
    fn new(level: CapabilityLevel) -> Self {
        Self {
            level,
            state: State::Unbuilt,
            attempted: "unbuilt",
        }
    }

    fn stage(&self) -> &'static str {
        self.attempted
    }

    fn run(&mut self, rules: &[CompiledRule<'_>]) -> Result<(), LockError> {
        self.create()?;
        for rule in rules {
            if rule.access.is_empty() {
                // The kernel rejects a rule granting nothing.
                tracing::trace!(path = %rule.rule.path().display(), "skipped rule with no access");
                continue;
            }
            self.attach(rule)?;
        }
        self.drop_privileges()?;
        self.restrict()
    }

    fn create(&mut self) -> Result<(), LockError> {
        self.attempted = "create ruleset";
        let State::Unbuilt = self.state else {
            return Err(self.bug("ruleset created twice"));
        };
        let handled = crate::access::handled_access(self.level);
        let created = Ruleset::default()
            .set_compatibility(CompatLevel::HardRequirement)
            .handle_access(handled)
            .and_then(|ruleset| ruleset.create())
            .map_err(|e| self.fail(os_error(e)))?;
        self.state = State::RulesetCreated(created);
        Ok(())
    }

    fn attach(&mut self, rule: &CompiledRule<'_>) -> Result<(), LockError> {
        self.attempted = "add rule";
        let ruleset = match std::mem::replace(&mut self.state, State::Failed) {
            State::RulesetCreated(ruleset) | State::RulesAttached(ruleset) => ruleset,
            _ => return Err(self.bug("rule attached outside of ruleset construction")),
        };

        let path = rule.rule.path();
        let added = PathFd::new(path)
            .map_err(os_error)
            .and_then(|anchor| {
                ruleset
                    .add_rule(PathBeneath::new(anchor, rule.access))
                    .map_err(os_error)
            });
        let ruleset = match added {
            Ok(ruleset) => ruleset,
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "failed to add landlock rule"
                );
                return Err(self.fail(err));
            }
        };

        tracing::trace!(path = %path.display(), access = ?rule.access, "added landlock rule");
        self.state = State::RulesAttached(ruleset);
        Ok(())
    }

    fn drop_privileges(&mut self) -> Result<(), LockError> {
        self.attempted = "set no_new_privs";
        let ruleset = match std::mem::replace(&mut self.state, State::Failed) {
            State::RulesetCreated(ruleset) | State::RulesAttached(ruleset) => ruleset,
            _ => return Err(self.bug("privileges dropped before ruleset was built")),
        };
        let Some(ruleset) = Option::<OwnedFd>::from(ruleset) else {
            return Err(self.bug("ruleset has no file descriptor"));
        };
        broadcast::no_new_privs().map_err(|e| self.fail(e))?;
        self.state = State::PrivilegesDropped(ruleset);
        Ok(())
    }

    fn restrict(&mut self) -> Result<(), LockError> {
        self.attempted = "restrict self";
        let State::PrivilegesDropped(ruleset) = std::mem::replace(&mut self.state, State::Failed)
        else {
            return Err(self.bug("restrict called before privileges were dropped"));
        };
        broadcast::restrict_self(ruleset.as_raw_fd()).map_err(|e| self.fail(e))?;
        self.state = State::Restricted;
        Ok(())
    }

    fn fail(&mut self, err: io::Error) -> LockError {
        self.state = State::Failed;
        LockError::failed(err)
    }

    fn bug(&mut self, what: &'static str) -> LockError {
        self.state = State::Failed;
        LockError::UnexpectedState(what)
    }
}

/// The kernel errno behind a `landlock` crate error, if it carries one.
fn os_error<E>(err: E) -> io::Error
where
    E: Error + Send + Sync + 'static,
{
    let mut cause: Option<&(dyn Error + 'static)> = Some(&err);
    while let Some(current) = cause {
        if let Some(code) = current.downcast_ref::<io::Error>().and_then(io::Error::raw_os_error) {
            return io::Error::from_raw_os_error(code);
        }
        cause = current.source();
    }
    io::Error::other(err)
}
