//! Per-source activity multisets, the transport seam, and the process bus.
//!
//! # Invariants
//!
//! - A context is registered before its announcements fire and before the
//!   transport sees the call, so `in_flight` never misses a pending
//!   operation.
//! - `activity:settled` fires exactly once per drain, when a source's
//!   multiset goes from occupied to empty.
//! - Announcements fan out source first, forward destinations second,
//!   process bus last.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use weft_core::{Callback, Emitter, EventArgs, Observed, Source, SourceId, Value};

use crate::context::{ActivityContext, ActivityOptions};
use crate::forward;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One outgoing call handed to the [`Transport`].
pub struct Dispatch {
    pub method: String,
    pub source: Source,
    pub context: Rc<ActivityContext>,
    /// Wrapped reply callbacks. Invoke exactly one of them at most once;
    /// never replying leaves the activity permanently pending, which the
    /// tracker tolerates.
    pub success: Callback,
    pub error: Callback,
}

/// The single interception point for outgoing async work.
pub trait Transport {
    fn dispatch(&self, request: Dispatch);
}

thread_local! {
    static HUB: RefCell<AHashMap<SourceId, Vec<Rc<ActivityContext>>>> =
        RefCell::new(AHashMap::new());
    static BUS: Source = Source::wrap(Rc::new(Emitter::new()));
    static TRANSPORT: RefCell<Option<Rc<dyn Transport>>> = const { RefCell::new(None) };
}

/// Install this thread's transport.
pub fn set_transport(transport: Rc<dyn Transport>) {
    TRANSPORT.with(|slot| *slot.borrow_mut() = Some(transport));
}

fn current_transport() -> Option<Rc<dyn Transport>> {
    TRANSPORT.with(|slot| slot.borrow().clone())
}

/// Process-wide bus that sees every begun activity; window-scoped
/// aggregation (`load_while`) listens here.
#[must_use]
pub fn activity_bus() -> Source {
    BUS.with(Source::clone)
}

/// Restore this thread's tracker to a blank slate: multisets, forwarding
/// rules, and the transport.
pub fn reset_activity() {
    HUB.with(|hub| hub.borrow_mut().clear());
    TRANSPORT.with(|slot| *slot.borrow_mut() = None);
    forward::clear_rules();
}

// ---------------------------------------------------------------------------
// begin
// ---------------------------------------------------------------------------

/// Begin a tracked activity against `source`.
///
/// The fresh context joins `source`'s multiset, `activity` and
/// `activity:{method}` announce it (on the source, then on every forward
/// destination with a linked copy, then on the process bus), and the
/// transport receives the wrapped call. A `before-send` listener on the
/// context may [`prevent_default`](ActivityContext::prevent_default) to
/// suppress the dispatch and drive the context manually.
pub fn begin(method: &str, source: &Source, options: ActivityOptions) -> Rc<ActivityContext> {
    let context = ActivityContext::new(method, source.clone(), options);
    register(&context);
    tracing::debug!(method, source = ?source.id(), "activity begun");

    announce(source, &context);
    let mut visited = AHashSet::new();
    visited.insert(source.id());
    forward::materialize(&context, source, &mut visited);
    announce(&activity_bus(), &context);

    context.reset_prevented();
    context.trigger("before-send", &EventArgs::single(context.as_value()));
    if context.was_prevented() {
        tracing::debug!(method, "dispatch suppressed");
        return context;
    }

    match current_transport() {
        Some(transport) => transport.dispatch(Dispatch {
            method: method.to_string(),
            source: source.clone(),
            context: Rc::clone(&context),
            success: success_wrapper(&context),
            error: error_wrapper(&context),
        }),
        None => tracing::warn!(method, "no transport configured; activity left pending"),
    }
    context
}

/// Fire `activity` and `activity:{method}` on `target` for `context`.
pub(crate) fn announce(target: &Source, context: &Rc<ActivityContext>) {
    let method = context.method();
    target.trigger(
        "activity",
        &EventArgs::new(vec![context.as_value(), Value::from(method)]),
    );
    target.trigger(&format!("activity:{method}"), &EventArgs::single(context.as_value()));
}

fn success_wrapper(context: &Rc<ActivityContext>) -> Callback {
    let context = Rc::clone(context);
    Rc::new(move |reply: &EventArgs| {
        if intercepted(&context, "success", reply) {
            return;
        }
        context.complete_success(reply.clone());
    })
}

fn error_wrapper(context: &Rc<ActivityContext>) -> Callback {
    let context = Rc::clone(context);
    Rc::new(move |reply: &EventArgs| {
        if intercepted(&context, "error", reply) {
            return;
        }
        context.complete_error(reply.clone());
    })
}

/// Fire the interceptable `after-send` and report whether the default
/// completion should be skipped: either a listener prevented it, or the
/// context already went terminal (a reply arriving after an abort).
fn intercepted(context: &Rc<ActivityContext>, kind: &str, reply: &EventArgs) -> bool {
    if !context.is_pending() {
        return true;
    }
    context.reset_prevented();
    let mut values = vec![context.as_value()];
    values.extend(reply.iter().cloned());
    values.push(Value::from(kind));
    context.trigger("after-send", &EventArgs::new(values));
    if context.was_prevented() {
        tracing::debug!(method = context.method(), kind, "default completion intercepted");
        return true;
    }
    false
}

// ---------------------------------------------------------------------------
// Multisets
// ---------------------------------------------------------------------------

pub(crate) fn register(context: &Rc<ActivityContext>) {
    HUB.with(|hub| {
        hub.borrow_mut()
            .entry(context.source().id())
            .or_default()
            .push(Rc::clone(context));
    });
}

pub(crate) fn unregister(context: &Rc<ActivityContext>) {
    let emptied = HUB.with(|hub| {
        let mut hub = hub.borrow_mut();
        let id = context.source().id();
        let Some(list) = hub.get_mut(&id) else {
            return false;
        };
        let before = list.len();
        list.retain(|entry| !Rc::ptr_eq(entry, context));
        if list.len() == before || !list.is_empty() {
            return false;
        }
        hub.remove(&id);
        true
    });
    if emptied {
        tracing::debug!(source = ?context.source().id(), "activity settled");
        context.source().trigger("activity:settled", &EventArgs::EMPTY);
    }
}

/// Pending contexts registered on `source`, optionally narrowed to one
/// method. Late-joining consumers scan this and observe each context's
/// `complete` directly.
#[must_use]
pub fn in_flight(source: &Source, method: Option<&str>) -> Vec<Rc<ActivityContext>> {
    HUB.with(|hub| {
        hub.borrow()
            .get(&source.id())
            .map(|list| {
                list.iter()
                    .filter(|context| method.is_none_or(|m| context.method() == m))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
