//! Capability seams onto the host UI framework.
//!
//! The rendering/commit pipeline is a black box; the runtime only needs the
//! small contracts here. A host drives a scope's lifecycle entry points in
//! this order:
//!
//! - mount: `will_mount` → host marks the component live → `did_mount`;
//! - update: `will_update(next)` → host swaps attributes → `did_update`;
//! - unmount: `will_unmount` → host marks the component dead.
//!
//! `is_live()` must answer `true` from `did_mount` through `will_unmount`
//! inclusive. Timers are the host's task queue, never threads: everything
//! scheduled fires on the same thread the scope lives on.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::scope::Scope;
use crate::source::Source;
use crate::value::{Attributes, Value};

/// Per-component host capabilities.
pub trait Host {
    /// Whether the component is currently mounted.
    fn is_live(&self) -> bool;

    /// Ask the host to re-render the component.
    fn request_render(&self);

    /// Current value of one attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Snapshot of all current attributes.
    fn attributes(&self) -> Attributes;

    /// Sibling component (by host-assigned name) as an observable, for
    /// ref-style event descriptors.
    fn sibling(&self, _name: &str) -> Option<Source> {
        None
    }

    /// Child scopes, for populate-style aggregation.
    fn children(&self) -> Vec<Scope> {
        Vec::new()
    }

    /// Whether the component is visible; visibility-aware intervals skip
    /// ticks while this is `false`.
    fn is_visible(&self) -> bool {
        true
    }
}

/// Handle to one scheduled timer.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimerId(u64);

static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl TimerId {
    /// Allocate the next process-unique id. Scheduler implementations share
    /// this allocator so ids never collide across schedulers.
    #[must_use]
    pub fn next() -> Self {
        Self(TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Host task-queue timers.
pub trait Scheduler {
    /// Run `callback` once after `delay_ms`.
    fn schedule(&self, delay_ms: u64, callback: Rc<dyn Fn()>) -> TimerId;

    /// Run `callback` every `interval_ms` until cancelled.
    fn schedule_repeating(&self, interval_ms: u64, callback: Rc<dyn Fn()>) -> TimerId;

    /// Cancel a pending timer; unknown ids are ignored.
    fn cancel(&self, id: TimerId);
}
