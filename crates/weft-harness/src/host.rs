//! Scripted stand-ins for the `Host` and `Scheduler` capability seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use weft_core::{Attributes, Host, Scheduler, Scope, Source, TimerId, Value};

// ---------------------------------------------------------------------------
// TestHost
// ---------------------------------------------------------------------------

/// Recording host. Owns the attribute map, counts render requests, and
/// drives the documented lifecycle ordering through [`mount`](Self::mount),
/// [`update`](Self::update), [`unmount`](Self::unmount) and
/// [`remount`](Self::remount). Siblings and children register by hand.
pub struct TestHost {
    live: Cell<bool>,
    visible: Cell<bool>,
    renders: Cell<u32>,
    attrs: RefCell<Attributes>,
    siblings: RefCell<AHashMap<String, Source>>,
    children: RefCell<Vec<Scope>>,
}

impl TestHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: Cell::new(false),
            visible: Cell::new(true),
            renders: Cell::new(0),
            attrs: RefCell::new(Attributes::new()),
            siblings: RefCell::new(AHashMap::new()),
            children: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_attrs(attrs: Attributes) -> Self {
        let host = Self::new();
        *host.attrs.borrow_mut() = attrs;
        host
    }

    /// Render requests received so far.
    #[must_use]
    pub fn render_count(&self) -> u32 {
        self.renders.get()
    }

    /// Write one attribute in place, without running an update pass.
    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    /// Snapshot of the current attributes.
    #[must_use]
    pub fn attrs(&self) -> Attributes {
        self.attrs.borrow().clone()
    }

    /// Register a named sibling for `ref:`-style descriptors.
    pub fn set_sibling(&self, name: &str, source: Source) {
        self.siblings.borrow_mut().insert(name.to_string(), source);
    }

    /// Register a child scope for populate-style aggregation.
    pub fn add_child(&self, child: Scope) {
        self.children.borrow_mut().push(child);
    }

    /// Toggle visibility; visibility-aware intervals skip ticks while
    /// hidden.
    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    /// Run the mount pass: `will_mount`, go live, `did_mount`.
    pub fn mount(&self, scope: &Scope) {
        scope.will_mount();
        self.live.set(true);
        scope.did_mount();
    }

    /// Run one update pass: `will_update(next)`, swap attributes,
    /// `did_update`.
    pub fn update(&self, scope: &Scope, next: Attributes) {
        scope.will_update(&next);
        *self.attrs.borrow_mut() = next;
        scope.did_update();
    }

    /// Run the unmount pass: `will_unmount`, go dead.
    pub fn unmount(&self, scope: &Scope) {
        scope.will_unmount();
        self.live.set(false);
    }

    /// Unmount then mount again, as a host reusing the component would.
    pub fn remount(&self, scope: &Scope) {
        self.unmount(scope);
        self.mount(scope);
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for TestHost {
    fn is_live(&self) -> bool {
        self.live.get()
    }

    fn request_render(&self) {
        self.renders.set(self.renders.get() + 1);
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    fn attributes(&self) -> Attributes {
        self.attrs.borrow().clone()
    }

    fn sibling(&self, name: &str) -> Option<Source> {
        self.siblings.borrow().get(name).cloned()
    }

    fn children(&self) -> Vec<Scope> {
        self.children.borrow().clone()
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

// ---------------------------------------------------------------------------
// TestClock
// ---------------------------------------------------------------------------

struct TimerEntry {
    id: TimerId,
    due: u64,
    every: Option<u64>,
    callback: Rc<dyn Fn()>,
}

/// Manually advanced scheduler. Timers fire in due order while the clock
/// steps through [`advance`](Self::advance); repeating timers re-arm.
pub struct TestClock {
    now: Cell<u64>,
    timers: RefCell<Vec<TimerEntry>>,
}

impl TestClock {
    #[must_use]
    pub fn new() -> Self {
        Self { now: Cell::new(0), timers: RefCell::new(Vec::new()) }
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Timers currently armed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Step the clock forward, firing every timer that falls due within
    /// the window, earliest first. A callback scheduling further timers
    /// inside the window is honored in the same pass.
    pub fn advance(&self, ms: u64) {
        let target = self.now.get() + ms;
        loop {
            // Earliest due timer within the window, first-registered wins ties.
            let next = {
                let timers = self.timers.borrow();
                timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| t.due)
                    .map(|(i, _)| i)
            };
            let Some(idx) = next else { break };
            let callback = {
                let mut timers = self.timers.borrow_mut();
                let entry = &mut timers[idx];
                self.now.set(entry.due);
                let callback = Rc::clone(&entry.callback);
                if let Some(every) = entry.every {
                    entry.due += every.max(1);
                } else {
                    timers.remove(idx);
                }
                callback
            };
            callback();
        }
        self.now.set(target);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestClock {
    fn schedule(&self, delay_ms: u64, callback: Rc<dyn Fn()>) -> TimerId {
        let id = TimerId::next();
        self.timers.borrow_mut().push(TimerEntry {
            id,
            due: self.now.get() + delay_ms,
            every: None,
            callback,
        });
        id
    }

    fn schedule_repeating(&self, interval_ms: u64, callback: Rc<dyn Fn()>) -> TimerId {
        let id = TimerId::next();
        self.timers.borrow_mut().push(TimerEntry {
            id,
            due: self.now.get() + interval_ms,
            every: Some(interval_ms),
            callback,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.timers.borrow_mut().retain(|t| t.id != id);
    }
}
