//! In-crate test fixtures: a recording host and two schedulers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::{Host, Scheduler, TimerId};
use crate::scope::Scope;
use crate::value::{Attributes, Value};

// ---------------------------------------------------------------------------
// StubHost
// ---------------------------------------------------------------------------

/// Minimal host that records render requests and drives the documented
/// lifecycle ordering through its `mount`/`update`/`unmount` helpers.
pub(crate) struct StubHost {
    live: Cell<bool>,
    renders: Cell<u32>,
    attrs: RefCell<Attributes>,
}

impl StubHost {
    pub(crate) fn new() -> Self {
        Self {
            live: Cell::new(false),
            renders: Cell::new(0),
            attrs: RefCell::new(Attributes::new()),
        }
    }

    pub(crate) fn with_attrs(attrs: Attributes) -> Self {
        let host = Self::new();
        *host.attrs.borrow_mut() = attrs;
        host
    }

    pub(crate) fn render_count(&self) -> u32 {
        self.renders.get()
    }

    pub(crate) fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    pub(crate) fn mount(&self, scope: &Scope) {
        scope.will_mount();
        self.live.set(true);
        scope.did_mount();
    }

    pub(crate) fn update(&self, scope: &Scope, next: Attributes) {
        scope.will_update(&next);
        *self.attrs.borrow_mut() = next;
        scope.did_update();
    }

    pub(crate) fn unmount(&self, scope: &Scope) {
        scope.will_unmount();
        self.live.set(false);
    }
}

impl Host for StubHost {
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
}

// ---------------------------------------------------------------------------
// Schedulers
// ---------------------------------------------------------------------------

/// Scheduler for tests that never exercise timers.
pub(crate) struct NullClock;

impl Scheduler for NullClock {
    fn schedule(&self, _delay_ms: u64, _callback: Rc<dyn Fn()>) -> TimerId {
        TimerId::next()
    }

    fn schedule_repeating(&self, _interval_ms: u64, _callback: Rc<dyn Fn()>) -> TimerId {
        TimerId::next()
    }

    fn cancel(&self, _id: TimerId) {}
}

struct TimerEntry {
    id: TimerId,
    due: u64,
    every: Option<u64>,
    callback: Rc<dyn Fn()>,
}

/// Manually advanced scheduler; timers fire in due order while the clock
/// steps through `advance`.
pub(crate) struct ManualClock {
    now: Cell<u64>,
    timers: RefCell<Vec<TimerEntry>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self { now: Cell::new(0), timers: RefCell::new(Vec::new()) }
    }

    pub(crate) fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    pub(crate) fn advance(&self, ms: u64) {
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

impl Scheduler for ManualClock {
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
