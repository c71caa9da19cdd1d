//! Per-component scope: composed behaviors and lifecycle dispatch.
//!
//! A [`Scope`] is what the runtime owns for one component instance: the
//! behaviors a composition resolved, the two-phase state store, an emitter
//! (components are observable objects too), a named-callback table, and the
//! host/scheduler capability handles. The host calls the lifecycle entry
//! points; the scope fans each one out to every installed behavior in
//! resolved order.
//!
//! # Invariants
//!
//! - Behavior hooks run in resolved (dependency) order, every time.
//! - `init` hooks run exactly once, during composition; a failing `init`
//!   aborts the composition before the component can mount.
//! - Callbacks built through [`Scope::callback`] hold a weak handle: they
//!   become no-ops once the scope is dropped, never dangling invocations.

use std::any::Any;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use weft_compose::{Composable, ComposeError, Registry, Request, TraitRef};

use crate::host::{Host, Scheduler};
use crate::source::{Callback, ContextId, Emitter, Observed, Source};
use crate::state::StateStore;
use crate::value::{Attributes, EventArgs, Value};

/// Error type behavior `init` hooks may fail with.
pub type InitError = Box<dyn Error + 'static>;

type HookFn = Rc<dyn Fn(&Scope)>;
type InitFn = Rc<dyn Fn(&Scope) -> Result<(), InitError>>;
type UpdateFn = Rc<dyn Fn(&Scope, &Attributes)>;
type VetoFn = Rc<dyn Fn(&Scope) -> bool>;

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// One composed unit of component behavior: further trait requirements plus
/// optional lifecycle hooks. This is the body type the trait registry
/// resolves.
#[derive(Clone, Default)]
pub struct Behavior {
    requires: Vec<TraitRef>,
    init: Option<InitFn>,
    will_mount: Option<HookFn>,
    did_mount: Option<HookFn>,
    will_update: Option<UpdateFn>,
    did_update: Option<HookFn>,
    will_unmount: Option<HookFn>,
    should_render: Option<VetoFn>,
}

impl Behavior {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a trait this behavior needs installed before it.
    #[must_use]
    pub fn require(mut self, dep: impl Into<TraitRef>) -> Self {
        self.requires.push(dep.into());
        self
    }

    /// Hook run once at composition; failure aborts the composition.
    #[must_use]
    pub fn on_init(mut self, f: impl Fn(&Scope) -> Result<(), InitError> + 'static) -> Self {
        self.init = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_will_mount(mut self, f: impl Fn(&Scope) + 'static) -> Self {
        self.will_mount = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_did_mount(mut self, f: impl Fn(&Scope) + 'static) -> Self {
        self.did_mount = Some(Rc::new(f));
        self
    }

    /// Hook run before an update pass, with the incoming attributes.
    #[must_use]
    pub fn on_will_update(mut self, f: impl Fn(&Scope, &Attributes) + 'static) -> Self {
        self.will_update = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_did_update(mut self, f: impl Fn(&Scope) + 'static) -> Self {
        self.did_update = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn on_will_unmount(mut self, f: impl Fn(&Scope) + 'static) -> Self {
        self.will_unmount = Some(Rc::new(f));
        self
    }

    /// Render veto: if any installed behavior answers `false`, the host
    /// should skip the synchronous render.
    #[must_use]
    pub fn with_should_render(mut self, f: impl Fn(&Scope) -> bool + 'static) -> Self {
        self.should_render = Some(Rc::new(f));
        self
    }
}

impl Composable for Behavior {
    fn dependencies(&self) -> &[TraitRef] {
        &self.requires
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior").field("requires", &self.requires).finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Composition failure: either the trait resolution itself, or a behavior's
/// `init` hook.
#[derive(Debug)]
pub enum ScopeError {
    /// The trait registry rejected the request list.
    Compose(ComposeError),
    /// A behavior failed to initialize.
    Init(InitError),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compose(e) => write!(f, "trait composition failed: {e}"),
            Self::Init(e) => write!(f, "behavior initialization failed: {e}"),
        }
    }
}

impl Error for ScopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Compose(e) => Some(e),
            Self::Init(e) => Some(e.as_ref()),
        }
    }
}

impl From<ComposeError> for ScopeError {
    fn from(e: ComposeError) -> Self {
        Self::Compose(e)
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

pub(crate) struct ScopeInner {
    context: ContextId,
    host: Rc<dyn Host>,
    scheduler: Rc<dyn Scheduler>,
    state: StateStore,
    emitter: Rc<Emitter>,
    behaviors: RefCell<Vec<Behavior>>,
    methods: RefCell<AHashMap<String, Callback>>,
    extensions: RefCell<AHashMap<&'static str, Rc<dyn Any>>>,
}

/// Cheap cloneable handle to one component's runtime scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Resolve `requests` against `registry` and build the scope, running
    /// every behavior's `init` hook in resolved order.
    pub fn compose(
        host: Rc<dyn Host>,
        scheduler: Rc<dyn Scheduler>,
        registry: &Registry<Behavior>,
        requests: &[Request<Behavior>],
    ) -> Result<Self, ScopeError> {
        let behaviors = registry.resolve(requests)?;
        Self::assemble(host, scheduler, behaviors)
    }

    /// Build a scope from already-resolved behaviors and run their `init`
    /// hooks.
    pub(crate) fn assemble(
        host: Rc<dyn Host>,
        scheduler: Rc<dyn Scheduler>,
        behaviors: Vec<Behavior>,
    ) -> Result<Self, ScopeError> {
        let scope = Self {
            inner: Rc::new(ScopeInner {
                context: ContextId::next(),
                host,
                scheduler,
                state: StateStore::new(),
                emitter: Rc::new(Emitter::new()),
                behaviors: RefCell::new(behaviors),
                methods: RefCell::new(AHashMap::new()),
                extensions: RefCell::new(AHashMap::new()),
            }),
        };
        let snapshot = scope.behaviors();
        for behavior in &snapshot {
            if let Some(init) = &behavior.init {
                init(&scope).map_err(ScopeError::Init)?;
            }
        }
        tracing::debug!(context = ?scope.inner.context, behaviors = snapshot.len(), "scope composed");
        Ok(scope)
    }

    fn behaviors(&self) -> Vec<Behavior> {
        self.inner.behaviors.borrow().clone()
    }

    // ── Lifecycle entry points (called by the host) ──────────────────────

    pub fn will_mount(&self) {
        tracing::trace!(context = ?self.inner.context, "will_mount");
        for b in self.behaviors() {
            if let Some(hook) = &b.will_mount {
                hook(self);
            }
        }
    }

    pub fn did_mount(&self) {
        tracing::trace!(context = ?self.inner.context, "did_mount");
        for b in self.behaviors() {
            if let Some(hook) = &b.did_mount {
                hook(self);
            }
        }
    }

    pub fn will_update(&self, next: &Attributes) {
        for b in self.behaviors() {
            if let Some(hook) = &b.will_update {
                hook(self, next);
            }
        }
    }

    pub fn did_update(&self) {
        for b in self.behaviors() {
            if let Some(hook) = &b.did_update {
                hook(self);
            }
        }
    }

    pub fn will_unmount(&self) {
        tracing::trace!(context = ?self.inner.context, "will_unmount");
        for b in self.behaviors() {
            if let Some(hook) = &b.will_unmount {
                hook(self);
            }
        }
    }

    /// Whether a synchronous render should proceed. `false` as soon as any
    /// behavior vetoes (a pending coalescing timer, typically).
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.behaviors()
            .iter()
            .all(|b| b.should_render.as_ref().is_none_or(|veto| veto(self)))
    }

    // ── Capabilities ─────────────────────────────────────────────────────

    #[must_use]
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.inner.host
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// Owner token for bindings registered on behalf of this component.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.inner.context
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.host.is_live()
    }

    pub fn request_render(&self) {
        self.inner.host.request_render();
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.inner.host.attribute(name)
    }

    /// Attribute interpreted as an observable handle.
    #[must_use]
    pub fn source_attribute(&self, name: &str) -> Option<Source> {
        self.attribute(name).and_then(|v| v.as_source())
    }

    // ── State ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.inner.state
    }

    /// Write state; requests a render when the component is live.
    pub fn set_state(&self, key: &str, value: Value) {
        self.inner.state.set(key, value);
        if self.is_live() {
            self.inner.host.request_render();
        }
    }

    // ── Observable surface ───────────────────────────────────────────────

    /// This component as an observable object.
    #[must_use]
    pub fn as_source(&self) -> Source {
        Source::wrap(Rc::clone(&self.inner.emitter))
    }

    pub fn on(&self, event: &str, callback: Callback) {
        self.inner.emitter.on(event, callback, None);
    }

    pub fn off(&self, event: &str, callback: Option<&Callback>) {
        self.inner.emitter.off(event, callback, None);
    }

    pub fn trigger(&self, event: &str, args: &EventArgs) {
        self.inner.emitter.trigger(event, args);
    }

    // ── Named callbacks ──────────────────────────────────────────────────

    /// Register a named callback usable as a declarative descriptor value.
    pub fn define_method(&self, name: &str, callback: Callback) {
        self.inner.methods.borrow_mut().insert(name.to_string(), callback);
    }

    /// Look up a named callback. `"request-render"` and `"defer-update"`
    /// are always available.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Callback> {
        if let Some(cb) = self.inner.methods.borrow().get(name) {
            return Some(Rc::clone(cb));
        }
        match name {
            "request-render" => Some(self.callback(|scope, _| scope.request_render())),
            "defer-update" => Some(self.callback(|scope, _| scope.defer_update())),
            _ => None,
        }
    }

    // ── Callback adapters ────────────────────────────────────────────────

    /// Build an event callback holding a weak scope handle; it becomes a
    /// no-op once the scope is dropped.
    pub fn callback(&self, f: impl Fn(&Scope, &EventArgs) + 'static) -> Callback {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move |args: &EventArgs| {
            if let Some(inner) = weak.upgrade() {
                f(&Scope { inner }, args);
            }
        })
    }

    /// Like [`callback`](Self::callback), shaped for the scheduler.
    pub fn task(&self, f: impl Fn(&Scope) + 'static) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                f(&Scope { inner });
            }
        })
    }

    /// Callback that triggers `event` on this component with a bound
    /// payload, ignoring whatever payload invoked it.
    #[must_use]
    pub fn trigger_with(&self, event: &str, bound: EventArgs) -> Callback {
        let event = event.to_string();
        self.callback(move |scope, _| scope.trigger(&event, &bound))
    }

    /// Callback that invokes `callback` with a bound payload, ignoring
    /// whatever payload invoked it.
    #[must_use]
    pub fn call_with(&self, callback: Callback, bound: EventArgs) -> Callback {
        Rc::new(move |_: &EventArgs| callback(&bound))
    }

    // ── Extension slots ──────────────────────────────────────────────────

    /// Per-scope typed bookkeeping slot, created on first access. Keys are
    /// crate-namespaced (`"weft-events.listeners"`); reusing a key with a
    /// different type is a bug and resets the slot in release builds.
    pub fn extension<T: Any>(&self, key: &'static str, init: impl FnOnce() -> T) -> Rc<T> {
        {
            let extensions = self.inner.extensions.borrow();
            if let Some(existing) = extensions.get(key) {
                if let Ok(hit) = Rc::clone(existing).downcast::<T>() {
                    return hit;
                }
                debug_assert!(false, "extension key `{key}` reused with a different type");
            }
        }
        let fresh = Rc::new(init());
        self.inner
            .extensions
            .borrow_mut()
            .insert(key, Rc::clone(&fresh) as Rc<dyn Any>);
        fresh
    }

    /// Weak handle for long-lived captures that must not keep the scope
    /// alive (extension bookkeeping, deferred target resolvers).
    #[must_use]
    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.inner))
    }
}

/// Weak counterpart of [`Scope`]; upgrade before use.
#[derive(Clone)]
pub struct WeakScope(Weak<ScopeInner>);

impl WeakScope {
    #[must_use]
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(|inner| Scope { inner })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:?})", self.inner.context)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
