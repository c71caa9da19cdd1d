//! In-memory observables for tests: an attribute-map model and an item
//! vector collection, both driving the activity tracker for fetches.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use weft_activity::{ActivityContext, ActivityOptions};
use weft_core::{
    Attributes, Callback, ContextId, Emitter, ErrorIndex, EventArgs, Observed, Record, SetOptions,
    Source, SourceId, Value,
};

type Validator = Box<dyn Fn(&Attributes) -> Option<ErrorIndex>>;

// ---------------------------------------------------------------------------
// TestModel
// ---------------------------------------------------------------------------

/// Observable record with a pluggable validator and activity-tracked sync.
///
/// Writes fire one `change` per written key, carrying the key name; a
/// validated write that fails fires `invalid` with the error index and
/// applies nothing. [`fetch`](Self::fetch) and [`save`](Self::save) begin
/// `read` / `update` activities against the installed transport; a
/// successful reply merges any [`Attributes`] payload it carries back into
/// the model.
pub struct TestModel {
    emitter: Emitter,
    attrs: RefCell<Attributes>,
    validator: RefCell<Option<Validator>>,
    fetched: Cell<bool>,
}

impl TestModel {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            emitter: Emitter::new(),
            attrs: RefCell::new(Attributes::new()),
            validator: RefCell::new(None),
            fetched: Cell::new(false),
        })
    }

    #[must_use]
    pub fn with_attrs(pairs: &[(&str, Value)]) -> Rc<Self> {
        let model = Self::new();
        for (key, value) in pairs {
            model.attrs.borrow_mut().insert((*key).to_string(), value.clone());
        }
        model
    }

    /// This model as a subscription target.
    #[must_use]
    pub fn source(self: &Rc<Self>) -> Source {
        Source::wrap(Rc::clone(self))
    }

    /// Install the validator consulted by validated writes and dry runs.
    pub fn set_validator(
        &self,
        validator: impl Fn(&Attributes) -> Option<ErrorIndex> + 'static,
    ) {
        *self.validator.borrow_mut() = Some(Box::new(validator));
    }

    #[must_use]
    pub fn attr(&self, key: &str) -> Option<Value> {
        Record::attr(self, key)
    }

    /// Unvalidated write; fires `change`.
    pub fn set(&self, key: &str, value: Value) {
        let _ = self.set_attr(key, value, &SetOptions::default());
    }

    /// Write marked as a UI echo; change-aware components skip the
    /// re-render.
    pub fn set_echoed(&self, key: &str, value: Value) {
        let _ = self.set_attr(key, value, &SetOptions::echoed());
    }

    /// Validated write: on failure nothing is applied and the error index
    /// comes back (and `invalid` has fired).
    pub fn try_set(&self, key: &str, value: Value) -> Result<(), ErrorIndex> {
        self.set_attr(key, value, &SetOptions::validated())
    }

    /// Whether a fetch has ever completed successfully.
    #[must_use]
    pub fn has_been_fetched(&self) -> bool {
        self.fetched.get()
    }

    /// Whether a `read` activity is currently in flight for this model.
    #[must_use]
    pub fn is_fetch_pending(self: &Rc<Self>) -> bool {
        !weft_activity::in_flight(&self.source(), Some("read")).is_empty()
    }

    /// Begin a `read` activity. A successful reply merges any attribute
    /// payload and marks the model fetched.
    pub fn fetch(self: &Rc<Self>) -> Rc<ActivityContext> {
        let model = Rc::clone(self);
        let apply: Callback = Rc::new(move |reply: &EventArgs| {
            model.fetched.set(true);
            model.apply_reply(reply);
        });
        weft_activity::begin("read", &self.source(), ActivityOptions::default().on_success(apply))
    }

    /// Begin an `update` activity. A successful reply merges any attribute
    /// payload (the server echo) without touching the fetched flag.
    pub fn save(self: &Rc<Self>) -> Rc<ActivityContext> {
        let model = Rc::clone(self);
        let apply: Callback = Rc::new(move |reply: &EventArgs| model.apply_reply(reply));
        weft_activity::begin("update", &self.source(), ActivityOptions::default().on_success(apply))
    }

    /// Run `success` once the model has been fetched: immediately when it
    /// already was, by joining the in-flight fetch when one is pending,
    /// else by starting a fresh fetch. `error` fires if the joined or
    /// started fetch fails.
    pub fn when_fetched(self: &Rc<Self>, success: Callback, error: Callback) {
        if self.fetched.get() {
            success(&EventArgs::EMPTY);
            return;
        }
        let context = match weft_activity::in_flight(&self.source(), Some("read")).first() {
            Some(context) => Rc::clone(context),
            None => self.fetch(),
        };
        let handle = context.handle();
        handle.once("success", success, None);
        handle.once("error", error, None);
    }

    fn apply_reply(&self, reply: &EventArgs) {
        for value in reply.iter() {
            if let Some(attrs) = value.data_as::<Attributes>() {
                tracing::debug!(keys = attrs.len(), "reply attributes merged");
                let _ = self.set_attrs(&attrs, &SetOptions::default());
            }
        }
    }
}

impl Record for TestModel {
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

impl Observed for TestModel {
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
// TestCollection
// ---------------------------------------------------------------------------

/// Observable item vector firing the collection change class: `add`,
/// `remove`, `reset`, `sort`. [`fetch`](Self::fetch) begins a `read`
/// activity; a successful reply carrying a `Vec<Value>` payload replaces
/// the items and fires `reset`.
pub struct TestCollection {
    emitter: Emitter,
    items: RefCell<Vec<Value>>,
    fetched: Cell<bool>,
}

impl TestCollection {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            emitter: Emitter::new(),
            items: RefCell::new(Vec::new()),
            fetched: Cell::new(false),
        })
    }

    #[must_use]
    pub fn with_items(items: &[Value]) -> Rc<Self> {
        let collection = Self::new();
        *collection.items.borrow_mut() = items.to_vec();
        collection
    }

    /// This collection as a subscription target.
    #[must_use]
    pub fn source(self: &Rc<Self>) -> Source {
        Source::wrap(Rc::clone(self))
    }

    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Append one item; fires `add` with the item.
    pub fn add(&self, item: Value) {
        self.items.borrow_mut().push(item.clone());
        self.emitter.trigger("add", &EventArgs::single(item));
    }

    /// Remove the item at `index`; fires `remove` with it. Out-of-range
    /// indices are ignored.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.emitter.trigger("remove", &EventArgs::single(removed.clone()));
        Some(removed)
    }

    /// Replace every item; fires `reset`.
    pub fn reset(&self, items: Vec<Value>) {
        *self.items.borrow_mut() = items;
        self.emitter.trigger("reset", &EventArgs::EMPTY);
    }

    /// Reorder in place with `compare`; fires `sort`.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.items.borrow_mut().sort_by(compare);
        self.emitter.trigger("sort", &EventArgs::EMPTY);
    }

    /// Whether a fetch has ever completed successfully.
    #[must_use]
    pub fn has_been_fetched(&self) -> bool {
        self.fetched.get()
    }

    /// Whether a `read` activity is currently in flight for this
    /// collection.
    #[must_use]
    pub fn is_fetch_pending(self: &Rc<Self>) -> bool {
        !weft_activity::in_flight(&self.source(), Some("read")).is_empty()
    }

    /// Begin a `read` activity. A successful reply carrying a
    /// `Vec<Value>` payload replaces the items and fires `reset`.
    pub fn fetch(self: &Rc<Self>) -> Rc<ActivityContext> {
        let collection = Rc::clone(self);
        let apply: Callback = Rc::new(move |reply: &EventArgs| {
            collection.fetched.set(true);
            for value in reply.iter() {
                if let Some(items) = value.data_as::<Vec<Value>>() {
                    tracing::debug!(items = items.len(), "reply items applied");
                    collection.reset(items.as_ref().clone());
                }
            }
        });
        weft_activity::begin("read", &self.source(), ActivityOptions::default().on_success(apply))
    }
}

impl Observed for TestCollection {
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
}
