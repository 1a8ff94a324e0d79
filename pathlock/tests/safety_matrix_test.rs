//! Safety policy tests
//!
//! Every combination of safety level and lock outcome, driven through a
//! `Locker` with a scripted enforcer so no kernel support is needed.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pathlock::{
    CapabilityLevel, Context, Detection, Enforcer, LockError, Locker, PathRule, RuleSet, Safety,
};

/// An enforcer that reports a fixed detection and a fixed enforcement result.
struct ScriptedEnforcer {
    detection: Detection,
    enforce: EnforceFn,
    calls: Arc<AtomicUsize>,
}

impl Enforcer for ScriptedEnforcer {
    fn detect(&self) -> Detection {
        self.detection
    }

    fn enforce(&self, _rules: &RuleSet, _level: CapabilityLevel) -> Result<(), LockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.enforce)()
    }
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    PlatformUnsupported,
    KernelUnsupported,
    Failed,
    Succeeded,
}

impl Scenario {
    const ALL: [Scenario; 4] = [
        Scenario::PlatformUnsupported,
        Scenario::KernelUnsupported,
        Scenario::Failed,
        Scenario::Succeeded,
    ];

    fn context(self) -> (Context, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let supported = Detection::Supported(CapabilityLevel::new(3));
        let (detection, enforce) = match self {
            Scenario::PlatformUnsupported => (Detection::NotLinux, succeed as EnforceFn),
            Scenario::KernelUnsupported => (Detection::Disabled, succeed as EnforceFn),
            Scenario::Failed => (supported, fail_with_eperm as EnforceFn),
            Scenario::Succeeded => (supported, succeed as EnforceFn),
        };
        let enforcer = ScriptedEnforcer {
            detection,
            enforce,
            calls: Arc::clone(&calls),
        };
        (
            Context::with_enforcer(Box::new(enforcer)).with_exists_check(|_| false),
            calls,
        )
    }
}

type EnforceFn = fn() -> Result<(), LockError>;

fn succeed() -> Result<(), LockError> {
    Ok(())
}

fn fail_with_eperm() -> Result<(), LockError> {
    Err(LockError::EnforcementFailed(io::Error::from_raw_os_error(1)))
}

fn expected_ok(safety: Safety, scenario: Scenario) -> bool {
    match (safety, scenario) {
        (_, Scenario::Succeeded) => true,
        (Safety::Try, _) => true,
        (Safety::OnlyAvailable, Scenario::PlatformUnsupported | Scenario::KernelUnsupported) => {
            true
        }
        (Safety::OnlySupported, Scenario::PlatformUnsupported) => true,
        _ => false,
    }
}

#[test]
fn test_full_safety_matrix() {
    for safety in Safety::ALL {
        for scenario in Scenario::ALL {
            let (ctx, _) = scenario.context();
            let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "rw")]);
            let result = locker.lock(safety);
            assert_eq!(
                result.is_ok(),
                expected_ok(safety, scenario),
                "safety={safety} scenario={scenario:?} result={result:?}"
            );
        }
    }
}

#[test]
fn test_unavailable_errors_carry_reason() {
    let (ctx, calls) = Scenario::KernelUnsupported.context();
    let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "r")]);

    let err = locker.lock(Safety::OnlySupported).unwrap_err();
    match err {
        LockError::EnforcementUnavailable(reason) => assert!(matches!(
            *reason,
            LockError::MechanismUnsupported { errno: None }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0, "enforce must not run");
}

#[test]
fn test_platform_unsupported_under_mandatory() {
    let (ctx, calls) = Scenario::PlatformUnsupported.context();
    let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "r")]);

    let err = locker.lock(Safety::Mandatory).unwrap_err();
    assert!(matches!(
        err,
        LockError::EnforcementUnavailable(ref reason)
            if matches!(**reason, LockError::PlatformUnsupported(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_enforcement_failure_propagates_io_error() {
    let (ctx, calls) = Scenario::Failed.context();
    let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "r")]);

    let err = locker.lock(Safety::OnlyAvailable).unwrap_err();
    match err {
        LockError::EnforcementFailed(io) => assert_eq!(io.raw_os_error(), Some(1)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_each_lock_reaches_the_enforcer() {
    let (ctx, calls) = Scenario::Succeeded.context();
    let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "r")]);
    locker.lock(Safety::Mandatory).unwrap();
    locker.lock(Safety::Mandatory).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(ctx.detection(), Detection::Supported(CapabilityLevel::new(3)));
}

#[test]
fn test_undetectable_version_is_kernel_unsupported() {
    let enforcer = ScriptedEnforcer {
        detection: Detection::Undetectable,
        enforce: succeed,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let ctx = Context::with_enforcer(Box::new(enforcer));
    let locker = Locker::with_context(&ctx, [PathRule::dir("/tmp", "r")]);

    assert!(locker.lock(Safety::OnlyAvailable).is_ok());
    let err = locker.lock(Safety::Mandatory).unwrap_err();
    assert!(matches!(
        err,
        LockError::EnforcementUnavailable(ref reason)
            if matches!(**reason, LockError::VersionUndetectable)
    ));
}
