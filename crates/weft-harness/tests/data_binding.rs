#![forbid(unsafe_code)]

//! Integration tests: data-source slots, loading state, populate, and the
//! activity tracker driven through the public fixtures.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_activity::ActivityContext;
use weft_bind::{INVALID_ATTR, LOADING_ATTR, RecordScope};
use weft_core::{
    Attributes, Callback, ErrorIndex, EventArgs, Host, Scheduler, Scope, Value, builtin_registry,
};
use weft_harness::{ScriptedTransport, TestClock, TestCollection, TestHost, TestModel};

fn scope_with(traits: &[&str]) -> (Scope, Rc<TestHost>, Rc<TestClock>) {
    weft_events::reset_event_router();
    weft_activity::reset_activity();
    let mut registry = builtin_registry();
    weft_events::register(&mut registry).unwrap();
    weft_bind::register(&mut registry).unwrap();
    let host = Rc::new(TestHost::new());
    let clock = Rc::new(TestClock::new());
    let scope = Scope::compose(
        Rc::clone(&host) as Rc<dyn Host>,
        Rc::clone(&clock) as Rc<dyn Scheduler>,
        &registry,
        &traits.iter().map(|t| (*t).into()).collect::<Vec<_>>(),
    )
    .unwrap();
    (scope, host, clock)
}

fn probe() -> (Rc<Cell<u32>>, Callback) {
    let hits = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&hits);
    (hits, Rc::new(move |_: &EventArgs| counter.set(counter.get() + 1)))
}

fn trace() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Loading state
// ============================================================================

#[test]
fn mounting_after_a_fetch_began_still_shows_loading() {
    trace();
    let (scope, host, _clock) = scope_with(&["model-activity-aware"]);
    let transport = ScriptedTransport::install();
    let model = TestModel::new();
    host.set_attr("model", Value::from(model.source()));

    model.fetch();
    assert!(model.is_fetch_pending());
    assert_eq!(scope.state().get(LOADING_ATTR), None);
    assert_eq!(host.render_count(), 0);

    // The activity announcement is long gone; the mount-time join finds it.
    host.mount(&scope);
    assert_eq!(scope.state().get(LOADING_ATTR), Some(Value::Bool(true)));
    assert_eq!(host.render_count(), 1);

    transport.succeed_next(EventArgs::EMPTY);
    assert_eq!(scope.state().get(LOADING_ATTR), Some(Value::Bool(false)));
    assert_eq!(host.render_count(), 2);
    assert!(model.has_been_fetched());
    assert!(!model.is_fetch_pending());
}

// ============================================================================
// Model sync
// ============================================================================

#[test]
fn fetch_merges_the_reply_attributes() {
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let model = TestModel::with_attrs(&[("title", Value::from("draft"))]);

    model.fetch();
    assert_eq!(transport.pending_methods(), ["read"]);
    assert!(model.is_fetch_pending());
    assert!(!model.has_been_fetched());

    let mut reply = Attributes::new();
    reply.insert("title".to_string(), Value::from("final"));
    reply.insert("pages".to_string(), Value::Int(321));
    transport.succeed_next(EventArgs::single(Value::data(reply)));

    assert!(model.has_been_fetched());
    assert!(!model.is_fetch_pending());
    assert_eq!(model.attr("title"), Some(Value::from("final")));
    assert_eq!(model.attr("pages"), Some(Value::Int(321)));
}

#[test]
fn when_fetched_joins_instead_of_refetching() {
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let model = TestModel::new();
    let (done, success) = probe();
    let (failed, error) = probe();

    // Nothing fetched, nothing pending: starts the fetch.
    model.when_fetched(Rc::clone(&success), Rc::clone(&error));
    assert_eq!(transport.pending(), 1);

    // A second ask joins the same in-flight read.
    model.when_fetched(Rc::clone(&success), Rc::clone(&error));
    assert_eq!(transport.pending(), 1);

    transport.succeed_next(EventArgs::EMPTY);
    assert_eq!(done.get(), 2);

    // Already fetched: immediate, no dispatch.
    model.when_fetched(Rc::clone(&success), Rc::clone(&error));
    assert_eq!(done.get(), 3);
    assert_eq!(transport.pending(), 0);
    assert_eq!(failed.get(), 0);
}

// ============================================================================
// Change routing
// ============================================================================

#[test]
fn model_changes_rerender_and_follow_the_slot() {
    let (scope, host, clock) = scope_with(&["model-change-aware"]);
    let first = TestModel::new();
    let second = TestModel::new();
    host.set_attr("model", Value::from(first.source()));
    host.mount(&scope);

    first.set("title", Value::from("a"));
    first.set("author", Value::from("b"));
    clock.advance(0);
    assert_eq!(host.render_count(), 1);

    let mut next = host.attrs();
    next.insert("model".to_string(), Value::from(second.source()));
    host.update(&scope, next);

    second.set("title", Value::from("c"));
    clock.advance(0);
    assert_eq!(host.render_count(), 2);
    first.set("title", Value::from("d"));
    clock.advance(0);
    assert_eq!(host.render_count(), 2);
}

#[test]
fn ui_echoes_do_not_rerender() {
    let (scope, host, clock) = scope_with(&["model-change-aware"]);
    let model = TestModel::new();
    host.set_attr("model", Value::from(model.source()));
    host.mount(&scope);

    model.set_echoed("title", Value::from("typed"));
    clock.advance(0);
    assert_eq!(host.render_count(), 0);
    assert_eq!(model.attr("title"), Some(Value::from("typed")));
}

#[test]
fn collection_mutations_rerender_through_their_event_class() {
    let (scope, host, clock) = scope_with(&["collection-change-aware"]);
    let list = TestCollection::new();
    host.set_attr("collection", Value::from(list.source()));
    host.mount(&scope);

    list.add(Value::from("beta"));
    list.add(Value::from("alpha"));
    clock.advance(0);
    assert_eq!(host.render_count(), 1);

    list.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    clock.advance(0);
    assert_eq!(host.render_count(), 2);
    assert_eq!(list.items(), [Value::from("alpha"), Value::from("beta")]);
}

#[test]
fn collection_fetch_resets_the_items() {
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let list = TestCollection::with_items(&[Value::from("stale")]);

    list.fetch();
    transport.succeed_next(EventArgs::single(Value::data(vec![
        Value::from("x"),
        Value::from("y"),
    ])));

    assert!(list.has_been_fetched());
    assert_eq!(list.items(), [Value::from("x"), Value::from("y")]);
}

// ============================================================================
// Populate and validation
// ============================================================================

fn input(name: &str, value: &str) -> Scope {
    let host = Rc::new(TestHost::new());
    host.set_attr("name", Value::from(name));
    host.set_attr("value", Value::from(value));
    let clock = Rc::new(TestClock::new());
    Scope::compose(
        host as Rc<dyn Host>,
        clock as Rc<dyn Scheduler>,
        &builtin_registry(),
        &[],
    )
    .unwrap()
}

#[test]
fn populate_applies_every_child_value() {
    let (scope, host, _clock) = scope_with(&["model-aware"]);
    let model = TestModel::new();
    host.set_attr("model", Value::from(model.source()));
    host.mount(&scope);
    host.add_child(input("title", "Moby-Dick"));
    host.add_child(input("author", "Melville"));

    let attrs = scope.populate_children().unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(model.attr("title"), Some(Value::from("Moby-Dick")));
    assert_eq!(model.attr("author"), Some(Value::from("Melville")));
}

#[test]
fn populate_failure_applies_nothing() {
    let (scope, host, _clock) = scope_with(&["model-aware"]);
    let model = TestModel::new();
    model.set_validator(|attrs| match attrs.get("title").and_then(|v| v.as_str()) {
        Some("") => Some(ErrorIndex::single("title", "required")),
        _ => None,
    });
    host.set_attr("model", Value::from(model.source()));
    host.mount(&scope);
    host.add_child(input("title", ""));
    host.add_child(input("author", "Melville"));

    let err = scope.populate_children().unwrap_err();
    assert_eq!(err.message_for("title"), Some("required"));
    assert_eq!(model.attr("title"), None);
    assert_eq!(model.attr("author"), None);
}

#[test]
fn validation_errors_land_in_state_and_clear_on_change() {
    let (scope, host, _clock) = scope_with(&["model-invalid-aware"]);
    let model = TestModel::new();
    model.set_validator(|attrs| match attrs.get("title").and_then(|v| v.as_str()) {
        Some("") => Some(ErrorIndex::single("title", "required")),
        _ => None,
    });
    host.set_attr("model", Value::from(model.source()));
    host.mount(&scope);

    assert!(model.try_set("title", Value::from("")).is_err());
    let index = scope
        .state()
        .get(INVALID_ATTR)
        .and_then(|v| v.data_as::<ErrorIndex>())
        .unwrap();
    assert_eq!(index.message_for("title"), Some("required"));

    model.set("title", Value::from("Moby"));
    assert_eq!(scope.state().get(INVALID_ATTR), Some(Value::Null));
}

// ============================================================================
// Activity tracking
// ============================================================================

#[test]
fn settled_fires_once_when_the_last_activity_finishes() {
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let model = TestModel::new();
    let (settled, callback) = probe();
    model.source().on("activity:settled", callback, None);

    model.fetch();
    model.save();
    assert_eq!(transport.pending_methods(), ["read", "update"]);

    transport.succeed_next(EventArgs::EMPTY);
    assert_eq!(settled.get(), 0);
    transport.fail_next(EventArgs::EMPTY);
    assert_eq!(settled.get(), 1);
}

#[test]
fn forwarding_is_refcounted() {
    weft_activity::reset_activity();
    let _transport = ScriptedTransport::install();
    let upstream = TestModel::new();
    let screen = TestModel::new();
    let (hits, callback) = probe();
    screen.source().on("activity", callback, None);

    weft_activity::forward(&upstream.source(), &screen.source(), None);
    weft_activity::forward(&upstream.source(), &screen.source(), None);

    upstream.fetch();
    assert_eq!(hits.get(), 1);

    weft_activity::unforward(&upstream.source(), &screen.source(), None);
    upstream.fetch();
    assert_eq!(hits.get(), 2);

    weft_activity::unforward(&upstream.source(), &screen.source(), None);
    upstream.fetch();
    assert_eq!(hits.get(), 2);

    // Surplus unforward is a no-op.
    weft_activity::unforward(&upstream.source(), &screen.source(), None);
}

#[test]
fn preventing_the_send_still_runs_the_terminal_sequence() {
    trace();
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let model = TestModel::new();

    // Grab the context from the announcement and suppress the dispatch.
    let seen: Rc<RefCell<Option<Rc<ActivityContext>>>> = Rc::new(RefCell::new(None));
    {
        let seen = Rc::clone(&seen);
        model.source().on(
            "activity",
            Rc::new(move |args: &EventArgs| {
                if let Some(context) = ActivityContext::from_args(args) {
                    let inner = Rc::clone(&context);
                    context.handle().once(
                        "before-send",
                        Rc::new(move |_: &EventArgs| inner.prevent_default()),
                        None,
                    );
                    *seen.borrow_mut() = Some(context);
                }
            }),
            None,
        );
    }

    let context = model.fetch();
    assert_eq!(transport.pending(), 0);
    assert!(context.is_pending());
    assert!(seen.borrow().is_some());

    let (success_hits, success) = probe();
    let (complete_hits, complete) = probe();
    context.handle().once("success", success, None);
    context.handle().once("complete", complete, None);

    assert!(context.complete_success(EventArgs::EMPTY));
    assert_eq!(success_hits.get(), 1);
    assert_eq!(complete_hits.get(), 1);
    // The captured fetch bookkeeping ran exactly as on the organic path.
    assert!(model.has_been_fetched());
}

#[test]
fn intercepting_the_reply_redirects_the_completion() {
    weft_activity::reset_activity();
    let transport = ScriptedTransport::install();
    let model = TestModel::new();

    let context = model.fetch();
    let inner = Rc::clone(&context);
    context.handle().once(
        "after-send",
        Rc::new(move |_: &EventArgs| inner.prevent_default()),
        None,
    );

    transport.succeed_next(EventArgs::EMPTY);
    assert!(context.is_pending());
    assert!(!model.has_been_fetched());

    assert!(context.complete_error(EventArgs::EMPTY));
    assert!(!context.is_pending());
    assert!(!model.has_been_fetched());
}
