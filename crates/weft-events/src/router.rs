//! Routing from descriptor maps to live handler bindings.
//!
//! # Invariants
//!
//! - [`manage_events`] validates the whole map before touching component
//!   state: a bad key installs nothing.
//! - Unknown kinds, methods, and modifiers are fatal at install time.
//! - After every update pass, the `events` trait unbinds and rebinds any
//!   handler reporting itself stale.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use weft_compose::Arg;
use weft_core::{Behavior, Callback, Scope};

use crate::descriptor::{DescriptorValue, Descriptors, EventKey, Modifier};
use crate::{kinds, modifiers, EventsError};

const HANDLERS_KEY: &str = "weft-events.handlers";

// ---------------------------------------------------------------------------
// Handler contract
// ---------------------------------------------------------------------------

/// A live binding produced by a kind factory.
pub trait Handler {
    /// One-time setup when the descriptor is installed.
    fn initialize(&self, _scope: &Scope) {}

    /// Activate the binding.
    fn on(&self, scope: &Scope);

    /// Deactivate the binding; entries survive for a later [`on`](Self::on).
    fn off(&self, scope: &Scope);

    /// Whether the bound target has changed identity since activation.
    fn is_stale(&self, _scope: &Scope) -> bool {
        false
    }
}

/// What a kind factory receives: the parsed key plus the fully wrapped
/// callback.
pub struct HandlerRequest {
    pub kind: String,
    pub path: String,
    pub callback: Callback,
}

pub type HandlerFactory =
    Rc<dyn Fn(&Scope, &HandlerRequest) -> Result<Rc<dyn Handler>, EventsError>>;

/// Builds the wrapped callback for `*name(args)->` prefixes.
pub type ModifierFactory =
    Rc<dyn Fn(&Scope, &[Arg], Callback) -> Result<Callback, EventsError>>;

// ---------------------------------------------------------------------------
// Kind table
// ---------------------------------------------------------------------------

/// Kind lookup table: exact names first, then patterns in registration
/// order.
#[derive(Default)]
pub struct HandlerRegistry {
    exact: AHashMap<String, HandlerFactory>,
    patterns: Vec<(Rc<dyn Fn(&str) -> bool>, HandlerFactory)>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table preloaded with the built-in kinds.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        kinds::install(&mut table);
        table
    }

    /// Register a kind by exact name.
    pub fn handle(
        &mut self,
        kind: &str,
        factory: impl Fn(&Scope, &HandlerRequest) -> Result<Rc<dyn Handler>, EventsError> + 'static,
    ) {
        self.exact.insert(kind.to_string(), Rc::new(factory));
    }

    /// Register a kind matched by predicate (for bracketed or derived kind
    /// names that cannot be enumerated up front).
    pub fn handle_pattern(
        &mut self,
        matches: impl Fn(&str) -> bool + 'static,
        factory: impl Fn(&Scope, &HandlerRequest) -> Result<Rc<dyn Handler>, EventsError> + 'static,
    ) {
        self.patterns.push((Rc::new(matches), Rc::new(factory)));
    }

    pub(crate) fn lookup(&self, kind: &str) -> Option<HandlerFactory> {
        if let Some(factory) = self.exact.get(kind) {
            return Some(Rc::clone(factory));
        }
        self.patterns.iter().find(|(hit, _)| hit(kind)).map(|(_, factory)| Rc::clone(factory))
    }
}

thread_local! {
    static KINDS: RefCell<HandlerRegistry> = RefCell::new(HandlerRegistry::with_builtins());
    static MODIFIERS: RefCell<AHashMap<String, ModifierFactory>> =
        RefCell::new(modifiers::builtins());
}

/// Run `f` against this thread's kind table.
pub fn with_event_kinds<R>(f: impl FnOnce(&mut HandlerRegistry) -> R) -> R {
    KINDS.with(|table| f(&mut table.borrow_mut()))
}

/// Register a callback wrapper reachable as `*name(...)->`.
pub fn register_modifier(
    name: &str,
    factory: impl Fn(&Scope, &[Arg], Callback) -> Result<Callback, EventsError> + 'static,
) {
    MODIFIERS.with(|table| table.borrow_mut().insert(name.to_string(), Rc::new(factory)));
}

/// Restore this thread's kind and modifier tables to the built-ins.
pub fn reset_event_router() {
    KINDS.with(|table| *table.borrow_mut() = HandlerRegistry::with_builtins());
    MODIFIERS.with(|table| *table.borrow_mut() = modifiers::builtins());
}

// ---------------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------------

/// A descriptor installed on a component.
pub struct InstalledHandler {
    key: String,
    handler: Rc<dyn Handler>,
}

impl InstalledHandler {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn on(&self, scope: &Scope) {
        self.handler.on(scope);
    }

    pub fn off(&self, scope: &Scope) {
        self.handler.off(scope);
    }

    #[must_use]
    pub fn is_stale(&self, scope: &Scope) -> bool {
        self.handler.is_stale(scope)
    }
}

fn installed(scope: &Scope) -> Rc<RefCell<Vec<Rc<InstalledHandler>>>> {
    scope.extension(HANDLERS_KEY, || RefCell::new(Vec::new()))
}

fn handler_snapshot(scope: &Scope) -> Vec<Rc<InstalledHandler>> {
    installed(scope).borrow().clone()
}

/// Install a descriptor map on `scope`. Every key is parsed and resolved
/// before anything binds; handlers activate immediately when the component
/// is already live, otherwise at the next mount.
pub fn manage_events(scope: &Scope, descriptors: &Descriptors) -> Result<(), EventsError> {
    let mut fresh = Vec::new();
    for (key, value) in descriptors.entries() {
        let parsed = EventKey::parse(key)?;
        let base = resolve_value(scope, value)?;
        let callback = apply_modifiers(scope, &parsed.modifiers, base)?;
        let request =
            HandlerRequest { kind: parsed.kind.clone(), path: parsed.path.clone(), callback };
        let factory = KINDS
            .with(|table| table.borrow().lookup(&parsed.kind))
            .ok_or_else(|| EventsError::UnhandledKind { kind: parsed.kind.clone() })?;
        let handler = factory(scope, &request)?;
        fresh.push(Rc::new(InstalledHandler { key: key.clone(), handler }));
    }

    let live = scope.is_live();
    for entry in fresh {
        entry.handler.initialize(scope);
        if live {
            entry.handler.on(scope);
        }
        tracing::trace!(key = entry.key.as_str(), live, "event descriptor installed");
        installed(scope).borrow_mut().push(entry);
    }
    Ok(())
}

fn resolve_value(scope: &Scope, value: &DescriptorValue) -> Result<Callback, EventsError> {
    match value {
        DescriptorValue::Callback(callback) => Ok(Rc::clone(callback)),
        DescriptorValue::Method(name) => scope
            .method(name)
            .ok_or_else(|| EventsError::UnknownMethod { name: name.clone() }),
    }
}

fn apply_modifiers(
    scope: &Scope,
    mods: &[Modifier],
    base: Callback,
) -> Result<Callback, EventsError> {
    // Each modifier wraps the callback built so far, left to right, so the
    // one nearest the key ends up outermost and sees the raw event first.
    let mut wrapped = base;
    for m in mods {
        let factory = MODIFIERS
            .with(|table| table.borrow().get(&m.name).cloned())
            .ok_or_else(|| EventsError::UnknownModifier { name: m.name.clone() })?;
        wrapped = factory(scope, &m.args, wrapped)?;
    }
    Ok(wrapped)
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The `events` trait: activate installed handlers on mount, deactivate on
/// unmount, and rebind stale ones after each update pass.
#[must_use]
pub fn events_trait() -> Behavior {
    Behavior::new()
        .require("listen")
        .on_did_mount(|scope| {
            for entry in handler_snapshot(scope) {
                entry.handler.on(scope);
            }
        })
        .on_did_update(|scope| {
            for entry in handler_snapshot(scope) {
                if entry.handler.is_stale(scope) {
                    tracing::debug!(key = entry.key.as_str(), "stale handler rebound");
                    entry.handler.off(scope);
                    entry.handler.on(scope);
                }
            }
        })
        .on_will_unmount(|scope| {
            for entry in handler_snapshot(scope) {
                entry.handler.off(scope);
            }
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{emitter_source, probe, scope_clocked, scope_with};
    use crate::{bus, EventsError};
    use weft_core::{EventArgs, Host, Value};

    #[test]
    fn method_descriptors_route_self_events() {
        let (scope, host) = scope_with(&["events"]);
        let (hits, callback) = probe();
        scope.define_method("on-save", callback);
        manage_events(&scope, &Descriptors::new().method("saved", "on-save")).unwrap();

        scope.trigger("saved", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 0);

        host.mount(&scope);
        scope.trigger("saved", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);

        host.unmount(&scope);
        scope.trigger("saved", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn bus_descriptors_reach_the_shared_bus() {
        let (scope, host) = scope_with(&["events"]);
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("bus:app:refresh", callback)).unwrap();
        host.mount(&scope);

        bus().trigger("app:refresh", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
        host.unmount(&scope);
        bus().trigger("app:refresh", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn installing_while_live_binds_immediately() {
        let (scope, host) = scope_with(&["events"]);
        host.mount(&scope);
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("self:poke", callback)).unwrap();
        scope.trigger("poke", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn attr_handlers_rebind_when_the_attribute_changes_identity() {
        let (scope, host) = scope_with(&["events"]);
        let (old, _e1) = emitter_source();
        let (new, _e2) = emitter_source();
        host.set_attr("feed", Value::Source(old.clone()));
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("attr:feed:tick", callback)).unwrap();
        host.mount(&scope);

        old.trigger("tick", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);

        let mut next = host.attributes();
        next.insert("feed".into(), Value::Source(new.clone()));
        host.update(&scope, next);

        old.trigger("tick", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
        new.trigger("tick", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn modifier_nearest_the_key_sees_the_event_first() {
        // `after(2)` is outermost: the first trigger never reaches `once`,
        // the second does and fires it, the third is consumed by `once`.
        let (scope, host) = scope_with(&["events"]);
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("*once->*after(2)->self:go", callback))
            .unwrap();
        host.mount(&scope);

        scope.trigger("go", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 0);
        scope.trigger("go", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
        scope.trigger("go", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unknown_modifier_is_fatal() {
        let (scope, _host) = scope_with(&["events"]);
        let (_hits, callback) = probe();
        let err = manage_events(
            &scope,
            &Descriptors::new().callback("*warp(9)->self:go", callback),
        )
        .unwrap_err();
        assert!(matches!(err, EventsError::UnknownModifier { ref name } if name == "warp"));
    }

    #[test]
    fn unknown_kind_is_fatal_and_installs_nothing() {
        let (scope, host) = scope_with(&["events"]);
        let (hits, callback) = probe();
        let map = Descriptors::new()
            .callback("self:poke", Rc::clone(&callback))
            .callback("warp:whatever", callback);
        let err = manage_events(&scope, &map).unwrap_err();
        assert!(matches!(err, EventsError::UnhandledKind { ref kind } if kind == "warp"));

        host.mount(&scope);
        scope.trigger("poke", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn unknown_method_is_fatal() {
        let (scope, _host) = scope_with(&["events"]);
        let err =
            manage_events(&scope, &Descriptors::new().method("self:poke", "missing")).unwrap_err();
        assert!(matches!(err, EventsError::UnknownMethod { ref name } if name == "missing"));
    }

    #[test]
    fn custom_kinds_extend_the_table() {
        reset_event_router();
        with_event_kinds(|table| {
            table.handle("noop", |_, _| {
                struct Quiet;
                impl Handler for Quiet {
                    fn on(&self, _: &Scope) {}
                    fn off(&self, _: &Scope) {}
                }
                Ok(Rc::new(Quiet))
            });
        });
        let (scope, _host) = scope_with(&["events"]);
        manage_events(&scope, &Descriptors::new().method("noop:x", "request-render")).unwrap();
        reset_event_router();
        let err = manage_events(&scope, &Descriptors::new().method("noop:x", "request-render"))
            .unwrap_err();
        assert!(matches!(err, EventsError::UnhandledKind { .. }));
    }

    #[test]
    fn interval_descriptors_tick_only_while_mounted() {
        let (scope, host, clock) = scope_clocked(&["events"]);
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("interval:100", callback)).unwrap();

        clock.advance(250);
        assert_eq!(hits.get(), 0);

        host.mount(&scope);
        clock.advance(250);
        assert_eq!(hits.get(), 2);

        host.unmount(&scope);
        clock.advance(500);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn active_interval_respects_host_visibility() {
        let (scope, host, clock) = scope_clocked(&["events"]);
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("active-interval:100", callback))
            .unwrap();
        host.mount(&scope);

        clock.advance(200);
        assert_eq!(hits.get(), 2);

        host.set_visible(false);
        clock.advance(200);
        assert_eq!(hits.get(), 2);

        host.set_visible(true);
        clock.advance(100);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn ref_descriptors_bind_to_named_siblings() {
        let (scope, host) = scope_with(&["events"]);
        let (sibling, _emitter) = emitter_source();
        host.set_sibling("toolbar", sibling.clone());
        let (hits, callback) = probe();
        manage_events(&scope, &Descriptors::new().callback("ref:toolbar:pressed", callback))
            .unwrap();
        host.mount(&scope);

        sibling.trigger("pressed", &EventArgs::EMPTY);
        assert_eq!(hits.get(), 1);
    }
}
