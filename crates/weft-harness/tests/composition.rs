#![forbid(unsafe_code)]

//! Integration tests: trait resolution driven end to end through the
//! public fixtures.

use std::cell::RefCell;
use std::rc::Rc;

use weft_compose::{ComposeError, Registry};
use weft_core::{Behavior, Host, Scheduler, Scope, ScopeError, Value, builtin_registry};
use weft_harness::{TestClock, TestHost};

type InstallLog = Rc<RefCell<Vec<&'static str>>>;

fn logged(label: &'static str, log: &InstallLog) -> Behavior {
    let log = Rc::clone(log);
    Behavior::new().on_init(move |_| {
        log.borrow_mut().push(label);
        Ok(())
    })
}

fn compose(
    registry: &Registry<Behavior>,
    requests: &[&str],
) -> (Scope, Rc<TestHost>, Rc<TestClock>) {
    let host = Rc::new(TestHost::new());
    let clock = Rc::new(TestClock::new());
    let scope = Scope::compose(
        Rc::clone(&host) as Rc<dyn Host>,
        Rc::clone(&clock) as Rc<dyn Scheduler>,
        registry,
        &requests.iter().map(|r| (*r).into()).collect::<Vec<_>>(),
    )
    .unwrap();
    (scope, host, clock)
}

// ============================================================================
// Resolution order
// ============================================================================

#[test]
fn dependencies_install_before_dependents_without_duplicates() {
    let log: InstallLog = Rc::new(RefCell::new(Vec::new()));
    let mut registry = builtin_registry();
    registry.add("io", &[], logged("io", &log)).unwrap();
    registry.add("cache", &["io"], logged("cache", &log)).unwrap();
    registry.add("feed", &["cache", "io"], logged("feed", &log)).unwrap();

    compose(&registry, &["feed", "cache", "io"]);
    assert_eq!(*log.borrow(), ["io", "cache", "feed"]);
}

#[test]
fn namespaced_traits_answer_to_both_names() {
    let log: InstallLog = Rc::new(RefCell::new(Vec::new()));
    let mut registry = builtin_registry();
    registry.add("forms.autosave", &[], logged("autosave", &log)).unwrap();
    assert!(registry.contains("forms.autosave"));
    assert!(registry.contains("autosave"));

    // Both spellings reach one definition, installed once.
    compose(&registry, &["forms.autosave", "autosave"]);
    assert_eq!(*log.borrow(), ["autosave"]);
}

#[test]
fn unknown_requests_fail_composition() {
    let registry = builtin_registry();
    let host: Rc<dyn Host> = Rc::new(TestHost::new());
    let clock: Rc<dyn Scheduler> = Rc::new(TestClock::new());
    let err = Scope::compose(host, clock, &registry, &["missing".into()]).unwrap_err();
    assert!(matches!(err, ScopeError::Compose(ComposeError::UnknownTrait { .. })));
}

// ============================================================================
// Shared instances
// ============================================================================

#[test]
fn shared_requests_merge_to_the_minimum_window() {
    let mut registry = builtin_registry();
    registry.add("slow-poll", &["defer-update(300)"], Behavior::new()).unwrap();
    registry.add("fast-poll", &["defer-update(100)"], Behavior::new()).unwrap();
    let (scope, host, clock) = compose(&registry, &["slow-poll", "fast-poll"]);
    host.mount(&scope);

    scope.defer_update();
    clock.advance(99);
    assert_eq!(host.render_count(), 0);
    clock.advance(1);
    assert_eq!(host.render_count(), 1);
}

#[test]
fn flavor_flips_are_rejected_same_flavor_overwrites() {
    let mut registry = builtin_registry();
    registry.add("poll", &[], Behavior::new()).unwrap();
    let err = registry.add_shared("poll", &[], |_| Behavior::new()).unwrap_err();
    assert!(matches!(err, ComposeError::DuplicateName { .. }));

    registry.add("poll", &[], Behavior::new()).unwrap();
}

// ============================================================================
// Two-phase state
// ============================================================================

#[test]
fn pre_mount_state_reads_back_and_commits_without_rendering() {
    let registry = builtin_registry();
    let (scope, host, _clock) = compose(&registry, &["state"]);

    scope.set_state("draft", Value::from("hello"));
    assert_eq!(host.render_count(), 0);
    assert_eq!(scope.state().get("draft"), Some(Value::from("hello")));

    host.mount(&scope);
    assert_eq!(host.render_count(), 0);

    scope.set_state("draft", Value::from("edited"));
    assert_eq!(host.render_count(), 1);
}
