//! The observable-object contract and the in-crate event emitter.
//!
//! Everything the runtime binds to — data records, collections, buses,
//! activity contexts, even components themselves — is a [`Source`]: a cheap
//! cloneable handle over `Rc<dyn Observed>`, compared by identity. The
//! [`Observed`] contract is the classic `on`/`once`/`off`/`trigger` quartet;
//! [`Emitter`] is the implementation most types embed.
//!
//! # Invariants
//!
//! - Callbacks fire in registration order for a given event.
//! - Dispatch iterates a snapshot, so a callback may bind or unbind freely
//!   without skipping or double-delivering its siblings.
//! - `once` bindings are consumed before their first delivery, so re-entrant
//!   triggers cannot fire them twice.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use std::cell::RefCell;

use crate::record::Record;
use crate::value::EventArgs;

/// Stable identity of one observable object.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl SourceId {
    /// Allocate the next process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque owner token attached to a binding, so a component can unbind
/// "everything registered on behalf of X" without callback identity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ContextId(u64);

static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    #[must_use]
    pub fn next() -> Self {
        Self(CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Event callback. Compared by `Rc` identity when unbinding.
pub type Callback = Rc<dyn Fn(&EventArgs)>;

/// The observable-object contract consumed by the runtime.
pub trait Observed {
    /// Stable identity; slot comparison and activity bookkeeping key on it.
    fn source_id(&self) -> SourceId;

    /// Bind `callback` to `event`.
    fn on(&self, event: &str, callback: Callback, context: Option<ContextId>);

    /// Bind `callback` to fire at most once for `event`.
    fn once(&self, event: &str, callback: Callback, context: Option<ContextId>);

    /// Unbind. `callback` and `context` filter independently; passing
    /// neither clears every binding for `event`.
    fn off(&self, event: &str, callback: Option<&Callback>, context: Option<ContextId>);

    /// Fire `event` with `args`.
    fn trigger(&self, event: &str, args: &EventArgs);

    /// The richer data contract, when this observable is a record.
    fn as_record(&self) -> Option<&dyn Record> {
        None
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Cloneable identity handle over an observable object.
#[derive(Clone)]
pub struct Source(Rc<dyn Observed>);

impl Source {
    /// Wrap a concrete observable.
    pub fn wrap<T: Observed + 'static>(object: Rc<T>) -> Self {
        Self(object)
    }

    /// Wrap an already-erased observable.
    #[must_use]
    pub fn from_dyn(object: Rc<dyn Observed>) -> Self {
        Self(object)
    }

    #[must_use]
    pub fn id(&self) -> SourceId {
        self.0.source_id()
    }

    /// Identity comparison (same underlying allocation).
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn on(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.0.on(event, callback, context);
    }

    pub fn once(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.0.once(event, callback, context);
    }

    pub fn off(&self, event: &str, callback: Option<&Callback>, context: Option<ContextId>) {
        self.0.off(event, callback, context);
    }

    pub fn trigger(&self, event: &str, args: &EventArgs) {
        self.0.trigger(event, args);
    }

    /// The record contract, when the wrapped object provides it.
    #[must_use]
    pub fn record(&self) -> Option<&dyn Record> {
        self.0.as_record()
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({:?})", self.id())
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct EventBinding {
    callback: Callback,
    context: Option<ContextId>,
    once: bool,
}

/// Reference [`Observed`] implementation. Types that want to be observable
/// embed one and delegate the contract to it.
pub struct Emitter {
    id: SourceId,
    bindings: RefCell<AHashMap<String, Vec<EventBinding>>>,
}

impl Emitter {
    #[must_use]
    pub fn new() -> Self {
        Self { id: SourceId::next(), bindings: RefCell::new(AHashMap::new()) }
    }

    /// Number of live bindings for `event`.
    #[must_use]
    pub fn binding_count(&self, event: &str) -> usize {
        self.bindings.borrow().get(event).map_or(0, Vec::len)
    }

    fn add(&self, event: &str, callback: Callback, context: Option<ContextId>, once: bool) {
        self.bindings
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(EventBinding { callback, context, once });
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Observed for Emitter {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn on(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.add(event, callback, context, false);
    }

    fn once(&self, event: &str, callback: Callback, context: Option<ContextId>) {
        self.add(event, callback, context, true);
    }

    fn off(&self, event: &str, callback: Option<&Callback>, context: Option<ContextId>) {
        let mut bindings = self.bindings.borrow_mut();
        let Some(list) = bindings.get_mut(event) else {
            return;
        };
        list.retain(|b| {
            let callback_hit = callback.is_none_or(|cb| Rc::ptr_eq(&b.callback, cb));
            let context_hit = context.is_none() || b.context == context;
            !(callback_hit && context_hit)
        });
        if list.is_empty() {
            bindings.remove(event);
        }
    }

    fn trigger(&self, event: &str, args: &EventArgs) {
        // Snapshot before invoking; consume `once` entries up front so a
        // re-entrant trigger cannot deliver them twice.
        let snapshot: Vec<EventBinding> = {
            let mut bindings = self.bindings.borrow_mut();
            match bindings.get_mut(event) {
                Some(list) => {
                    let snap = list.clone();
                    list.retain(|b| !b.once);
                    if list.is_empty() {
                        bindings.remove(event);
                    }
                    snap
                }
                None => return,
            }
        };
        tracing::trace!(source = ?self.id, event, listeners = snapshot.len(), "trigger");
        for binding in snapshot {
            (binding.callback)(args);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
