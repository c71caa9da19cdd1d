//! Deferred subscription management keyed to the component mount phase.
//!
//! A [`ListenerSet`] records every subscription a component declares, at any
//! point in its life. Binding to the actual target happens when the
//! component mounts; unmounting unbinds but keeps the list, so a remount
//! rebinds identically. A target that does not exist yet at declaration time
//! is picked up at the next bind.
//!
//! # Invariants
//!
//! - Entries bind in registration order.
//! - [`ListenerSet::bind_all`] is idempotent: it drops every live binding
//!   before rebinding, so a doubled mount notification cannot double-deliver.
//! - Unmount retains the list; only [`ListenerSet::stop_listening`] removes
//!   entries.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use weft_core::{Behavior, Callback, ContextId, Scope, Source};

pub(crate) const LISTENERS_KEY: &str = "weft-events.listeners";

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// How a subscription's target is found at bind time.
#[derive(Clone)]
pub enum Target {
    /// A fixed object, captured at registration.
    Fixed(Source),
    /// Resolved fresh at every bind; an absent target defers the binding.
    Deferred(Rc<dyn Fn() -> Option<Source>>),
}

impl Target {
    #[must_use]
    pub fn resolve(&self) -> Option<Source> {
        match self {
            Self::Fixed(source) => Some(source.clone()),
            Self::Deferred(f) => f(),
        }
    }

    /// Target backed by an attribute-supplied object on `scope`.
    #[must_use]
    pub fn attribute(scope: &Scope, name: &str) -> Self {
        let weak = scope.downgrade();
        let name = name.to_string();
        Self::Deferred(Rc::new(move || {
            weak.upgrade().and_then(|scope| scope.source_attribute(&name))
        }))
    }

    /// Target backed by a named sibling component of `scope`.
    #[must_use]
    pub fn sibling(scope: &Scope, name: &str) -> Self {
        let weak = scope.downgrade();
        let name = name.to_string();
        Self::Deferred(Rc::new(move || {
            weak.upgrade().and_then(|scope| scope.host().sibling(&name))
        }))
    }

    /// The component's own observable surface.
    #[must_use]
    pub fn own(scope: &Scope) -> Self {
        Self::Fixed(scope.as_source())
    }
}

impl From<Source> for Target {
    fn from(source: Source) -> Self {
        Self::Fixed(source)
    }
}

impl From<&Source> for Target {
    fn from(source: &Source) -> Self {
        Self::Fixed(source.clone())
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(source) => write!(f, "Target::Fixed({source:?})"),
            Self::Deferred(_) => write!(f, "Target::Deferred"),
        }
    }
}

// ---------------------------------------------------------------------------
// ListenerSet
// ---------------------------------------------------------------------------

struct Entry {
    target: Target,
    event: String,
    callback: Callback,
    once: bool,
    group: Option<String>,
    bound_to: RefCell<Option<Source>>,
}

impl Entry {
    fn is_stale(&self) -> bool {
        match (&*self.bound_to.borrow(), self.target.resolve()) {
            (None, None) => false,
            (Some(bound), Some(current)) => !bound.same(&current),
            _ => true,
        }
    }
}

/// A component's retained subscription list.
pub struct ListenerSet {
    context: ContextId,
    entries: RefCell<Vec<Rc<Entry>>>,
    bound: Cell<bool>,
}

impl ListenerSet {
    #[must_use]
    pub fn new(context: ContextId) -> Self {
        Self { context, entries: RefCell::new(Vec::new()), bound: Cell::new(false) }
    }

    /// Register a subscription. Binds immediately when the set is already
    /// in its bound phase and the target resolves; defers otherwise.
    pub fn listen(&self, target: impl Into<Target>, event: &str, callback: Callback) {
        self.push(target.into(), event, callback, false, None);
    }

    /// Like [`listen`](Self::listen), delivered at most once per binding.
    pub fn listen_once(&self, target: impl Into<Target>, event: &str, callback: Callback) {
        self.push(target.into(), event, callback, true, None);
    }

    /// Register a subscription under a group tag, so a rebinder can later
    /// re-resolve every entry of the group at once.
    pub fn listen_grouped(
        &self,
        group: &str,
        target: impl Into<Target>,
        event: &str,
        callback: Callback,
        once: bool,
    ) {
        self.push(target.into(), event, callback, once, Some(group.to_string()));
    }

    fn push(&self, target: Target, event: &str, callback: Callback, once: bool, group: Option<String>) {
        let entry = Rc::new(Entry {
            target,
            event: event.to_string(),
            callback,
            once,
            group,
            bound_to: RefCell::new(None),
        });
        if self.bound.get() {
            self.bind_entry(&entry);
        }
        self.entries.borrow_mut().push(entry);
    }

    /// Remove entries matching the given filters (all `None` removes
    /// everything), unbinding live ones immediately. Targets are matched by
    /// resolved identity.
    pub fn stop_listening(
        &self,
        target: Option<&Source>,
        event: Option<&str>,
        callback: Option<&Callback>,
    ) {
        self.entries.borrow_mut().retain(|entry| {
            let target_hit = target
                .is_none_or(|t| entry.target.resolve().is_some_and(|resolved| resolved.same(t)));
            let event_hit = event.is_none_or(|e| entry.event == e);
            let callback_hit = callback.is_none_or(|cb| Rc::ptr_eq(&entry.callback, cb));
            let hit = target_hit && event_hit && callback_hit;
            if hit {
                self.unbind_entry(entry);
            }
            !hit
        });
    }

    /// Enter the bound phase: unbind any leftover bindings, then bind every
    /// entry whose target currently resolves, in registration order.
    pub fn bind_all(&self) {
        let snapshot = self.snapshot();
        for entry in &snapshot {
            self.unbind_entry(entry);
        }
        for entry in &snapshot {
            self.bind_entry(entry);
        }
        self.bound.set(true);
        tracing::trace!(context = ?self.context, entries = snapshot.len(), "listener set bound");
    }

    /// Leave the bound phase: unbind everything, retain the list.
    pub fn unbind_all(&self) {
        for entry in &self.snapshot() {
            self.unbind_entry(entry);
        }
        self.bound.set(false);
    }

    /// Bind any unbound entries of `group` (no-op outside the bound phase).
    pub fn bind_group(&self, group: &str) {
        if !self.bound.get() {
            return;
        }
        for entry in self.group_snapshot(group) {
            self.bind_entry(&entry);
        }
    }

    /// Unbind every entry of `group`, keeping the entries.
    pub fn unbind_group(&self, group: &str) {
        for entry in self.group_snapshot(group) {
            self.unbind_entry(&entry);
        }
    }

    /// Unbind and rebind every entry of `group`, re-resolving targets. Used
    /// when a deferred target's identity has changed.
    pub fn rebind_group(&self, group: &str) {
        let entries = self.group_snapshot(group);
        for entry in &entries {
            self.unbind_entry(entry);
        }
        if self.bound.get() {
            for entry in &entries {
                self.bind_entry(entry);
            }
        }
    }

    /// Whether any entry of `group` is bound to something other than what
    /// its target resolves to right now.
    #[must_use]
    pub fn group_is_stale(&self, group: &str) -> bool {
        self.group_snapshot(group).iter().any(|entry| entry.is_stale())
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn snapshot(&self) -> Vec<Rc<Entry>> {
        self.entries.borrow().clone()
    }

    fn group_snapshot(&self, group: &str) -> Vec<Rc<Entry>> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.group.as_deref() == Some(group))
            .cloned()
            .collect()
    }

    fn bind_entry(&self, entry: &Entry) {
        if entry.bound_to.borrow().is_some() {
            return;
        }
        if let Some(source) = entry.target.resolve() {
            if entry.once {
                source.once(&entry.event, Rc::clone(&entry.callback), Some(self.context));
            } else {
                source.on(&entry.event, Rc::clone(&entry.callback), Some(self.context));
            }
            *entry.bound_to.borrow_mut() = Some(source);
        }
    }

    fn unbind_entry(&self, entry: &Entry) {
        if let Some(source) = entry.bound_to.borrow_mut().take() {
            source.off(&entry.event, Some(&entry.callback), Some(self.context));
        }
    }
}

// ---------------------------------------------------------------------------
// Trait and accessor
// ---------------------------------------------------------------------------

/// The component's listener set, created on first use.
#[must_use]
pub fn listeners(scope: &Scope) -> Rc<ListenerSet> {
    let context = scope.context_id();
    scope.extension(LISTENERS_KEY, || ListenerSet::new(context))
}

/// The `listen` trait: bind the listener set on mount, unbind on unmount.
#[must_use]
pub fn listen_trait() -> Behavior {
    Behavior::new()
        .on_did_mount(|scope| listeners(scope).bind_all())
        .on_will_unmount(|scope| listeners(scope).unbind_all())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
