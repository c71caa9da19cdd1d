//! Loading-state aggregation: any number of concurrent activities fold into
//! one boolean state attribute per component.
//!
//! # Invariants
//!
//! 1. The attribute is written exactly twice per busy window: once when the
//!    first pending activity arrives, once when the last one settles.
//!    Intermediate adds and removals touch nothing.
//! 2. A context is counted at most once, however many routes announce it
//!    (slot listener, mount-time join, bus window).
//! 3. The aggregate holds no strong reference cycle: a context's completion
//!    observer reaches back through weak handles only.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use weft_activity::ActivityContext;
use weft_core::{Callback, Scope, Source, Value};

pub(crate) const LOADING_KEY: &str = "weft-bind.loading";

/// Pending contexts per state attribute; edges are detected per attribute.
#[derive(Default)]
struct LoadingAggregate {
    active: RefCell<AHashMap<String, Vec<Rc<ActivityContext>>>>,
}

/// Fold `context` into the aggregate behind the `attr` state attribute.
///
/// The attribute goes truthy when the first pending activity arrives and
/// falsy when the last one settles. Contexts that already settled, and
/// contexts already held under `attr`, are ignored.
pub fn push_loading(scope: &Scope, context: &Rc<ActivityContext>, attr: &str) {
    if !context.is_pending() {
        return;
    }
    let aggregate = scope.extension(LOADING_KEY, LoadingAggregate::default);
    let rising = {
        let mut active = aggregate.active.borrow_mut();
        let held = active.entry(attr.to_string()).or_default();
        if held.iter().any(|h| Rc::ptr_eq(h, context)) {
            return;
        }
        held.push(Rc::clone(context));
        held.len() == 1
    };
    let weak = Rc::downgrade(context);
    let attr_name = attr.to_string();
    context.handle().once(
        "complete",
        scope.callback(move |scope, _| settle(scope, &weak, &attr_name)),
        None,
    );
    if rising {
        tracing::debug!(attr, method = context.method(), "loading started");
        scope.set_state(attr, Value::Bool(true));
    }
}

fn settle(scope: &Scope, context: &Weak<ActivityContext>, attr: &str) {
    let Some(context) = context.upgrade() else {
        return;
    };
    let aggregate = scope.extension(LOADING_KEY, LoadingAggregate::default);
    let drained = {
        let mut active = aggregate.active.borrow_mut();
        match active.get_mut(attr) {
            Some(held) => {
                let before = held.len();
                held.retain(|h| !Rc::ptr_eq(h, &context));
                let drained = before > 0 && held.is_empty();
                if held.is_empty() {
                    active.remove(attr);
                }
                drained
            }
            None => false,
        }
    };
    if drained {
        tracing::debug!(attr, "loading drained");
        scope.set_state(attr, Value::Bool(false));
    }
}

/// Adopt every activity already pending on `source`, optionally narrowed to
/// one method, as if each had been announced after the component mounted.
pub fn join_in_flight(scope: &Scope, source: &Source, method: Option<&str>, attr: &str) {
    for context in weft_activity::in_flight(source, method) {
        push_loading(scope, &context, attr);
    }
}

/// Run `f` while observing the process activity bus: every activity begun
/// during the call folds into `attr`'s aggregate. The observation is torn
/// down before returning, unwinding included.
pub fn load_while<R>(scope: &Scope, attr: &str, f: impl FnOnce() -> R) -> R {
    let bus = weft_activity::activity_bus();
    let attr_name = attr.to_string();
    let callback: Callback = scope.callback(move |scope, args| {
        if let Some(context) = ActivityContext::from_args(args) {
            push_loading(scope, &context, &attr_name);
        }
    });
    bus.on("activity", Rc::clone(&callback), None);
    let _guard = BusGuard { bus, callback };
    f()
}

struct BusGuard {
    bus: Source,
    callback: Callback,
}

impl Drop for BusGuard {
    fn drop(&mut self) {
        self.bus.off("activity", Some(&self.callback), None);
    }
}

// ---------------------------------------------------------------------------
