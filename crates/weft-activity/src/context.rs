//! The per-operation activity context and its state machine.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use weft_core::{Callback, ContextId, Emitter, EventArgs, Observed, Record, Source, SourceId, Value};

use crate::tracker;

// ---------------------------------------------------------------------------
// ActivityState
// ---------------------------------------------------------------------------

/// Lifecycle of one tracked operation. `Pending` is the only non-terminal
/// state; every transition out of it is one-way.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivityState {
    Pending,
    Succeeded,
    Failed,
    Aborted,
}

impl ActivityState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

// ---------------------------------------------------------------------------
// ActivityOptions
// ---------------------------------------------------------------------------

/// Callbacks captured at [`begin`](crate::begin); each is invoked at most
/// once, ahead of the matching terminal transition.
#[derive(Clone, Default)]
pub struct ActivityOptions {
    pub success: Option<Callback>,
    pub error: Option<Callback>,
}

impl ActivityOptions {
    #[must_use]
    pub fn on_success(mut self, callback: Callback) -> Self {
        self.success = Some(callback);
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: Callback) -> Self {
        self.error = Some(callback);
        self
    }
}

// ---------------------------------------------------------------------------
// ActivityContext
// ---------------------------------------------------------------------------

/// One tracked asynchronous operation.
///
/// The context is itself observable: `before-send`, `after-send`,
/// `success` / `error` / `abort`, and `complete` fire on it, so consumers
/// that pick it up from an `activity` announcement can watch the terminal
/// transition directly. Forwarded copies are linked here and transition
/// together with their origin.
pub struct ActivityContext {
    method: String,
    source: Source,
    state: Cell<ActivityState>,
    emitter: Emitter,
    forwards: RefCell<Vec<Rc<ActivityContext>>>,
    prevented: Cell<bool>,
    on_success: RefCell<Option<Callback>>,
    on_error: RefCell<Option<Callback>>,
}

impl ActivityContext {
    pub(crate) fn new(method: &str, source: Source, options: ActivityOptions) -> Rc<Self> {
        Rc::new(Self {
            method: method.to_string(),
            source,
            state: Cell::new(ActivityState::Pending),
            emitter: Emitter::new(),
            forwards: RefCell::new(Vec::new()),
            prevented: Cell::new(false),
            on_success: RefCell::new(options.success),
            on_error: RefCell::new(options.error),
        })
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The object this activity runs against.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    #[must_use]
    pub fn state(&self) -> ActivityState {
        self.state.get()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.get() == ActivityState::Pending
    }

    /// Copies materialized on forward destinations, in creation order.
    #[must_use]
    pub fn forwarded_to(&self) -> Vec<Rc<ActivityContext>> {
        self.forwards.borrow().clone()
    }

    /// Identity handle, for listener registration against the context
    /// itself.
    #[must_use]
    pub fn handle(self: &Rc<Self>) -> Source {
        Source::wrap(Rc::clone(self))
    }

    /// This context as an event payload value.
    #[must_use]
    pub fn as_value(self: &Rc<Self>) -> Value {
        Value::Data(Rc::clone(self) as Rc<dyn Any>)
    }

    /// Recover a context from an event payload.
    #[must_use]
    pub fn from_args(args: &EventArgs) -> Option<Rc<ActivityContext>> {
        args.iter().find_map(|value| value.data_as::<ActivityContext>())
    }

    /// Suppress the default behavior of the notification currently being
    /// dispatched: the transport call for `before-send`, the automatic
    /// completion for `after-send`. The caller then drives the context
    /// manually via [`complete_success`](Self::complete_success) /
    /// [`complete_error`](Self::complete_error).
    pub fn prevent_default(&self) {
        self.prevented.set(true);
    }

    pub(crate) fn reset_prevented(&self) {
        self.prevented.set(false);
    }

    pub(crate) fn was_prevented(&self) -> bool {
        self.prevented.get()
    }

    pub(crate) fn link_forward(&self, copy: &Rc<ActivityContext>) {
        self.forwards.borrow_mut().push(Rc::clone(copy));
    }

    /// Complete successfully: invoke the captured success callback, then
    /// fire `success` and `complete` on this context and every forwarded
    /// copy, then leave the multiset. Reports `false` once terminal.
    pub fn complete_success(self: &Rc<Self>, args: EventArgs) -> bool {
        if !self.is_pending() {
            return false;
        }
        if let Some(callback) = self.on_success.borrow_mut().take() {
            callback(&args);
        }
        self.finish(ActivityState::Succeeded, "success", &args)
    }

    /// [`complete_success`](Self::complete_success), error flavor.
    pub fn complete_error(self: &Rc<Self>, args: EventArgs) -> bool {
        if !self.is_pending() {
            return false;
        }
        if let Some(callback) = self.on_error.borrow_mut().take() {
            callback(&args);
        }
        self.finish(ActivityState::Failed, "error", &args)
    }

    /// Abort a pending activity: fires `abort` then `complete` and pops
    /// the multiset entry whether or not the transport ever replies.
    pub fn abort(self: &Rc<Self>) -> bool {
        self.finish(ActivityState::Aborted, "abort", &EventArgs::EMPTY)
    }

    fn finish(self: &Rc<Self>, next: ActivityState, event: &str, args: &EventArgs) -> bool {
        if !self.is_pending() {
            return false;
        }
        let mut tree = Vec::new();
        self.collect(&mut tree);
        for context in &tree {
            if context.is_pending() {
                context.state.set(next);
            }
        }
        tracing::debug!(
            method = self.method.as_str(),
            state = ?next,
            copies = tree.len() - 1,
            "activity finished"
        );
        for context in &tree {
            context.emitter.trigger(event, args);
        }
        for context in &tree {
            context.emitter.trigger("complete", args);
        }
        for context in &tree {
            tracker::unregister(context);
        }
        true
    }

    fn collect(self: &Rc<Self>, out: &mut Vec<Rc<ActivityContext>>) {
        out.push(Rc::clone(self));
        for copy in self.forwards.borrow().iter() {
            copy.collect(out);
        }
    }
}

impl Observed for ActivityContext {
    fn source_id(&self) -> SourceId {
        self.emitter.source_id()
    }

    fn on(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.emitter.on(event, callback, context);
    }

    fn once(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.emitter.once(event, callback, context);
    }

    fn off(&self, event: &str, callback: Option<&Callback>, context: Option<ContextId>) {
        self.emitter.off(event, callback, context);
    }

    fn trigger(&self, event: &str, args: &EventArgs) {
        self.emitter.trigger(event, args);
    }

    fn as_record(&self) -> Option<&dyn Record> {
        None
    }
}

impl fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityContext")
            .field("method", &self.method)
            .field("state", &self.state.get())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
