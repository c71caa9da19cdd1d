//! Built-in traits and the thread-default trait registry.
//!
//! Two traits ship with the core:
//!
//! - `state`: commits the two-phase [`StateStore`](crate::StateStore) when
//!   the component mounts, applying pre-mount writes in one pass with no
//!   render request.
//! - `defer-update`: a shared-instance factory providing the coalescing
//!   render timer. Several traits may request it with different delays
//!   (`defer-update(300)`, `defer-update(100)`); one instance is installed
//!   honoring the minimum.
//!
//! # Invariants
//!
//! - At most one coalescing timer exists per component; calls to
//!   [`Scope::defer_update`] while it is pending are absorbed.
//! - The effective delay is resolved at call time: the
//!   `defer-update-interval` attribute, else the smallest composed request,
//!   else the thread default. A negative delay renders immediately.
//! - Unmount cancels the pending timer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_compose::{Arg, ArgList, Registry, Request};

use crate::host::{Host, Scheduler, TimerId};
use crate::scope::{Behavior, Scope, ScopeError};

const DEFER_KEY: &str = "weft-core.defer-update";

#[derive(Default)]
struct DeferState {
    requested: Cell<Option<i64>>,
    timer: Cell<Option<TimerId>>,
}

thread_local! {
    static DEFAULT_DEFER_INTERVAL: Cell<i64> = const { Cell::new(0) };
    static DEFAULT_REGISTRY: RefCell<Registry<Behavior>> = RefCell::new(builtin_registry());
}

// ---------------------------------------------------------------------------
// Registry plumbing
// ---------------------------------------------------------------------------

/// Fresh registry preloaded with the built-in traits.
#[must_use]
pub fn builtin_registry() -> Registry<Behavior> {
    let mut reg = Registry::new();
    install_builtins(&mut reg);
    reg
}

/// Install the built-in traits into an existing registry.
pub fn install_builtins(reg: &mut Registry<Behavior>) {
    let state = Behavior::new().on_will_mount(|scope| scope.state().commit());
    reg.add("state", &[], state).expect("builtin trait names are well formed");
    reg.add_shared("defer-update", &[], defer_update_trait)
        .expect("builtin trait names are well formed");
}

/// Run `f` against this thread's default registry.
pub fn with_default_registry<R>(f: impl FnOnce(&mut Registry<Behavior>) -> R) -> R {
    DEFAULT_REGISTRY.with(|reg| f(&mut reg.borrow_mut()))
}

/// Restore this thread's default registry to the built-ins alone.
pub fn reset_default_registry() {
    DEFAULT_REGISTRY.with(|reg| *reg.borrow_mut() = builtin_registry());
}

/// Thread-wide fallback for the coalescing delay, in milliseconds.
pub fn set_default_defer_interval(ms: i64) {
    DEFAULT_DEFER_INTERVAL.with(|cell| cell.set(ms));
}

#[must_use]
pub fn default_defer_interval() -> i64 {
    DEFAULT_DEFER_INTERVAL.with(Cell::get)
}

// ---------------------------------------------------------------------------
// defer-update
// ---------------------------------------------------------------------------

fn defer_update_trait(lists: &[ArgList]) -> Behavior {
    let requested = lists.iter().filter_map(|args| args.first().and_then(Arg::as_i64)).min();
    Behavior::new()
        .on_init(move |scope| {
            scope.extension(DEFER_KEY, DeferState::default).requested.set(requested);
            Ok(())
        })
        .with_should_render(|scope| {
            scope.extension(DEFER_KEY, DeferState::default).timer.get().is_none()
        })
        .on_will_unmount(|scope| {
            let defer = scope.extension(DEFER_KEY, DeferState::default);
            if let Some(timer) = defer.timer.take() {
                scope.scheduler().cancel(timer);
            }
        })
}

impl Scope {
    /// Compose against this thread's default registry. Trait resolution
    /// happens before `init` hooks run, so hooks may touch the default
    /// registry themselves.
    pub fn compose_default(
        host: Rc<dyn Host>,
        scheduler: Rc<dyn Scheduler>,
        requests: &[Request<Behavior>],
    ) -> Result<Self, ScopeError> {
        let behaviors =
            DEFAULT_REGISTRY.with(|reg| reg.borrow().resolve(requests)).map_err(ScopeError::Compose)?;
        Self::assemble(host, scheduler, behaviors)
    }

    /// Coalesced render request. The first call arms one timer; further
    /// calls while it is pending are absorbed into the same window.
    pub fn defer_update(&self) {
        let defer = self.extension(DEFER_KEY, DeferState::default);
        if defer.timer.get().is_some() {
            return;
        }
        let interval = self.defer_interval(&defer);
        if interval < 0 {
            self.request_render();
            return;
        }
        let fire = self.task(|scope| {
            let defer = scope.extension(DEFER_KEY, DeferState::default);
            defer.timer.set(None);
            scope.request_render();
        });
        let timer = self.scheduler().schedule(u64::try_from(interval).unwrap_or(0), fire);
        defer.timer.set(Some(timer));
        tracing::trace!(context = ?self.context_id(), interval, "render deferred");
    }

    fn defer_interval(&self, defer: &DeferState) -> i64 {
        self.attribute("defer-update-interval")
            .and_then(|v| v.as_i64())
            .or_else(|| defer.requested.get())
            .unwrap_or_else(default_defer_interval)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
