use std::fmt;

use pathlock_common::KeyedSet;

use crate::context::Context;
use crate::rule::{PathRule, Rule};

/// The deduplicated, bundle-expanded rules for one lock attempt.
///
/// Each path is defined once. When the same path appears again, with any
/// mode, the later rule is dropped: the first rule for a path decides its
/// access and modes are never merged.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: KeyedSet<PathRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand bundles through `ctx` and insert everything in order.
    pub fn build<I, R>(rules: I, ctx: &Context) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        let mut set = Self::new();
        for rule in rules {
            match rule.into() {
                Rule::Path(rule) => {
                    set.insert(rule);
                }
                Rule::Bundle(bundle) => {
                    if !set.rules.insert_all(ctx.bundle(bundle).iter().cloned()) {
                        tracing::trace!(%bundle, "bundle added no new paths");
                    }
                }
            }
        }
        set
    }

    /// Insert a concrete rule. Returns `false` if its path was already defined.
    pub fn insert(&mut self, rule: PathRule) -> bool {
        if let Some(existing) = self.rules.get(&rule.path().to_path_buf()) {
            if existing != &rule {
                tracing::debug!(
                    kept = %existing,
                    dropped = %rule,
                    "path already defined; keeping the first rule"
                );
            }
            return false;
        }
        self.rules.insert(rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in enforcement order.
    pub fn iter(&self) -> impl Iterator<Item = &PathRule> {
        self.rules.iter()
    }

    /// Resolve every rule's access rights for `level`.
    #[cfg(target_os = "linux")]
    pub fn compile(&self, level: crate::abi::CapabilityLevel) -> Vec<CompiledRule<'_>> {
        self.rules
            .iter()
            .map(|rule| CompiledRule {
                rule,
                access: crate::access::rule_access(rule, level),
            })
            .collect()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .rules
            .render_with(|rule| format!("{}:{}", rule.mode(), rule.path().display()));
        f.write_str(&rendered)
    }
}

/// A rule paired with the access rights it grants.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy)]
pub struct CompiledRule<'a> {
    pub rule: &'a PathRule,
    pub access: landlock::BitFlags<landlock::AccessFs>,
}
