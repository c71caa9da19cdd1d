//! Test fixtures: recording host, manual clock, a record-bearing model
//! stub, and a queueing transport.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_activity::{Dispatch, Transport};
use weft_core::{
    Attributes, Callback, ContextId, Emitter, ErrorIndex, EventArgs, Host, Observed, Record,
    Scheduler, Scope, SetOptions, Source, SourceId, TimerId, Value, builtin_registry,
};

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub(crate) struct StubHost {
    live: Cell<bool>,
    renders: Cell<u32>,
    attrs: RefCell<Attributes>,
    children: RefCell<Vec<Scope>>,
}

impl StubHost {
    pub(crate) fn new() -> Self {
        Self {
            live: Cell::new(false),
            renders: Cell::new(0),
            attrs: RefCell::new(Attributes::new()),
            children: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    pub(crate) fn add_child(&self, child: Scope) {
        self.children.borrow_mut().push(child);
    }

    pub(crate) fn render_count(&self) -> u32 {
        self.renders.get()
    }

    pub(crate) fn attributes(&self) -> Attributes {
        self.attrs.borrow().clone()
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

    fn children(&self) -> Vec<Scope> {
        self.children.borrow().clone()
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
// Model stub
// ---------------------------------------------------------------------------

type Validator = Box<dyn Fn(&Attributes) -> Option<ErrorIndex>>;

/// Observable record with a pluggable validator. `set` fires one `change`
/// per written key, carrying the key name; a failed validated write fires
/// `invalid` with the error index and applies nothing.
pub(crate) struct StubModel {
    emitter: Emitter,
    attrs: RefCell<Attributes>,
    validator: RefCell<Option<Validator>>,
}

impl StubModel {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            emitter: Emitter::new(),
            attrs: RefCell::new(Attributes::new()),
            validator: RefCell::new(None),
        })
    }

    pub(crate) fn with_attrs(pairs: &[(&str, Value)]) -> Rc<Self> {
        let model = Self::new();
        for (key, value) in pairs {
            model.attrs.borrow_mut().insert((*key).to_string(), value.clone());
        }
        model
    }

    pub(crate) fn source(self: &Rc<Self>) -> Source {
        Source::wrap(Rc::clone(self))
    }

    pub(crate) fn set_validator(
        &self,
        validator: impl Fn(&Attributes) -> Option<ErrorIndex> + 'static,
    ) {
        *self.validator.borrow_mut() = Some(Box::new(validator));
    }

    pub(crate) fn attr(&self, key: &str) -> Option<Value> {
        Record::attr(self, key)
    }

    pub(crate) fn set(&self, key: &str, value: Value) {
        let _ = self.set_attr(key, value, &SetOptions::default());
    }

    pub(crate) fn set_echoed(&self, key: &str, value: Value) {
        let _ = self.set_attr(key, value, &SetOptions::echoed());
    }

    pub(crate) fn try_set(&self, key: &str, value: Value) -> Result<(), ErrorIndex> {
        self.set_attr(key, value, &SetOptions::validated())
    }
}

impl Record for StubModel {
    fn attr(&self, key: &str) -> Option<Value> {
        self.attrs.borrow().get(key).cloned()
    }

    fn set_attrs(&self, attrs: &Attributes, options: &SetOptions) -> Result<(), ErrorIndex> {
        if options.validate {
            if let Some(index) = self.validate_attrs(attrs) {
                self.emitter.trigger("invalid", &EventArgs::single(Value::data(index.clone())));
                return Err(index);
            }
        }
        for (key, value) in attrs {
            self.attrs.borrow_mut().insert(key.clone(), value.clone());
        }
        for key in attrs.keys() {
            let change = EventArgs::single(Value::Str(key.clone()));
            let change = if options.echo { change.with_echo() } else { change };
            self.emitter.trigger("change", &change);
        }
        Ok(())
    }

    fn validate_attrs(&self, attrs: &Attributes) -> Option<ErrorIndex> {
        self.validator.borrow().as_ref().and_then(|validate| validate(attrs))
    }
}

impl Observed for StubModel {
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
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Transport that queues dispatches for the test to reply to.
pub(crate) struct QueueTransport {
    queue: RefCell<Vec<Dispatch>>,
}

impl QueueTransport {
    pub(crate) fn install() -> Rc<Self> {
        let transport = Rc::new(Self { queue: RefCell::new(Vec::new()) });
        weft_activity::set_transport(Rc::clone(&transport) as Rc<dyn Transport>);
        transport
    }

    pub(crate) fn succeed_next(&self, reply: EventArgs) {
        let dispatch = self.queue.borrow_mut().remove(0);
        (dispatch.success)(&reply);
    }

    pub(crate) fn fail_next(&self, reply: EventArgs) {
        let dispatch = self.queue.borrow_mut().remove(0);
        (dispatch.error)(&reply);
    }
}

impl Transport for QueueTransport {
    fn dispatch(&self, request: Dispatch) {
        self.queue.borrow_mut().push(request);
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub(crate) fn scope_clocked(traits: &[&str]) -> (Scope, Rc<StubHost>, Rc<ManualClock>) {
    weft_events::reset_event_router();
    weft_activity::reset_activity();
    let mut registry = builtin_registry();
    weft_events::register(&mut registry).unwrap();
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
