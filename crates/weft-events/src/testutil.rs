//! Test fixtures: recording host, manual clock, probe callbacks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use weft_core::{
    Attributes, Callback, EventArgs, Emitter, Host, Scheduler, Scope, Source, TimerId, Value,
    builtin_registry,
};

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub(crate) struct StubHost {
    live: Cell<bool>,
    visible: Cell<bool>,
    renders: Cell<u32>,
    attrs: RefCell<Attributes>,
    siblings: RefCell<AHashMap<String, Source>>,
}

impl StubHost {
    pub(crate) fn new() -> Self {
        Self {
            live: Cell::new(false),
            visible: Cell::new(true),
            renders: Cell::new(0),
            attrs: RefCell::new(Attributes::new()),
            siblings: RefCell::new(AHashMap::new()),
        }
    }

    pub(crate) fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    pub(crate) fn set_sibling(&self, name: &str, source: Source) {
        self.siblings.borrow_mut().insert(name.to_string(), source);
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
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

    fn sibling(&self, name: &str) -> Option<Source> {
        self.siblings.borrow().get(name).cloned()
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

struct TimerEntry {
    id: TimerId,
    due: u64,
    every: Option<u64>,
    callback: Rc<dyn Fn()>,
}

pub(crate) struct ManualClock {
    now: Cell<u64>,
    timers: RefCell<Vec<TimerEntry>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self { now: Cell::new(0), timers: RefCell::new(Vec::new()) }
    }

    pub(crate) fn advance(&self, ms: u64) {
        let target = self.now.get() + ms;
        loop {
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

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub(crate) fn scope_clocked(traits: &[&str]) -> (Scope, Rc<StubHost>, Rc<ManualClock>) {
    let mut registry = builtin_registry();
    crate::register(&mut registry).unwrap();
    let host = Rc::new(StubHost::new());
    let clock = Rc::new(ManualClock::new());
    let scope = Scope::compose(
        Rc::clone(&host) as Rc<dyn Host>,
        Rc::clone(&clock) as Rc<dyn Scheduler>,
        &registry,
        &traits.iter().map(|t| (*t).into()).collect::<Vec<_>>(),
    )
    .unwrap();
    (scope, host, clock)
}

pub(crate) fn scope_with(traits: &[&str]) -> (Scope, Rc<StubHost>) {
    let (scope, host, _clock) = scope_clocked(traits);
    (scope, host)
}

pub(crate) fn emitter_source() -> (Source, Rc<Emitter>) {
    let emitter = Rc::new(Emitter::new());
    (Source::wrap(Rc::clone(&emitter)), emitter)
}

pub(crate) fn probe() -> (Rc<Cell<u32>>, Callback) {
    let hits = Rc::new(Cell::new(0u32));
    let probe = Rc::clone(&hits);
    (hits, Rc::new(move |_: &EventArgs| probe.set(probe.get() + 1)))
}

pub(crate) fn value_probe() -> (Rc<RefCell<Vec<i64>>>, Callback) {
    let seen: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));
    let probe = Rc::clone(&seen);
    let callback: Callback = Rc::new(move |args: &EventArgs| {
        probe.borrow_mut().push(args.get(0).and_then(Value::as_i64).unwrap_or(-1));
    });
    (seen, callback)
}
