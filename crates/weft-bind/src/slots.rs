//! Named data-source slots and the per-update rebinder.
//!
//! A slot names an externally supplied observable: locally overridden via
//! [`SlotScope::set_slot`], otherwise read from the source-valued attribute
//! of the same name. Subscriptions registered through a slot join one
//! listener group per slot; when the resolved source changes identity
//! across an update pass, the whole group transfers from the old source to
//! the new one in a single synchronous rebind.
//!
//! # Invariants
//!
//! - An unchanged slot is never rebound and never triggers a render.
//! - Transfer preserves callback identity, `on`/`once` mode, and
//!   registration order (the listener group rebinds in list order).
//! - `None → Some` only binds; `Some → None` only unbinds.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use weft_core::{Attributes, Callback, Scope, Source, Value};
use weft_events::{Target, listeners};

pub(crate) const SLOTS_KEY: &str = "weft-bind.slots";

/// Listener group tag for subscriptions resolved against `slot`.
#[must_use]
pub fn slot_group(slot: &str) -> String {
    format!("slot:{slot}")
}

// ---------------------------------------------------------------------------
// Slot table
// ---------------------------------------------------------------------------

struct SlotEntry {
    name: String,
    /// Local override; wins over the owning attribute.
    local: RefCell<Option<Source>>,
    /// Snapshot the deferred listener targets read. Updated only by
    /// [`sync_entry`], so resolution is stable between update passes.
    resolved: RefCell<Option<Source>>,
}

pub(crate) struct SlotTable {
    entries: RefCell<Vec<Rc<SlotEntry>>>,
    families: RefCell<AHashMap<String, Vec<String>>>,
}

impl SlotTable {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            families: RefCell::new(AHashMap::new()),
        }
    }

    fn entry(&self, name: &str) -> Option<Rc<SlotEntry>> {
        self.entries.borrow().iter().find(|e| e.name == name).cloned()
    }

    fn ensure(&self, scope: &Scope, name: &str) -> Rc<SlotEntry> {
        if let Some(entry) = self.entry(name) {
            return entry;
        }
        let entry = Rc::new(SlotEntry {
            name: name.to_string(),
            local: RefCell::new(None),
            resolved: RefCell::new(scope.source_attribute(name)),
        });
        self.entries.borrow_mut().push(Rc::clone(&entry));
        entry
    }

    fn ordered(&self) -> Vec<Rc<SlotEntry>> {
        self.entries.borrow().clone()
    }

    pub(crate) fn register_family(&self, family: &str, names: &[String]) {
        let mut families = self.families.borrow_mut();
        let list = families.entry(family.to_string()).or_default();
        for name in names {
            if !list.iter().any(|n| n == name) {
                list.push(name.clone());
            }
        }
    }

    /// Slot names tracked for `family`, defaulting to the family name
    /// itself when nothing registered one.
    pub(crate) fn family_slots(&self, family: &str) -> Vec<String> {
        self.families
            .borrow()
            .get(family)
            .filter(|names| !names.is_empty())
            .cloned()
            .unwrap_or_else(|| vec![family.to_string()])
    }
}

pub(crate) fn slot_table(scope: &Scope) -> Rc<SlotTable> {
    scope.extension(SLOTS_KEY, SlotTable::new)
}

/// Family slot names for `scope`, primary slot first.
pub(crate) fn family_slots(scope: &Scope, family: &str) -> Vec<String> {
    slot_table(scope).family_slots(family)
}

// ---------------------------------------------------------------------------
// Rebinder
// ---------------------------------------------------------------------------

/// Re-resolve one slot and, when the source identity changed, transfer its
/// listener group. Reports whether anything changed.
fn sync_entry(scope: &Scope, entry: &SlotEntry, next: Option<&Attributes>) -> bool {
    let fresh = entry.local.borrow().clone().or_else(|| match next {
        Some(attrs) => attrs.get(&entry.name).and_then(Value::as_source),
        None => scope.source_attribute(&entry.name),
    });
    let changed = {
        let current = entry.resolved.borrow();
        match (&*current, &fresh) {
            (None, None) => false,
            (Some(a), Some(b)) => !a.same(b),
            _ => true,
        }
    };
    if !changed {
        return false;
    }
    *entry.resolved.borrow_mut() = fresh;
    tracing::debug!(slot = entry.name.as_str(), "slot source changed; transferring subscriptions");
    listeners(scope).rebind_group(&slot_group(&entry.name));
    true
}

/// Re-resolve every tracked slot. Idempotent within one pass: a second call
/// sees every snapshot already current and does nothing.
pub(crate) fn sync_all(scope: &Scope, next: Option<&Attributes>) {
    for entry in slot_table(scope).ordered() {
        sync_entry(scope, &entry, next);
    }
}

/// Deferred target reading `slot`'s resolved snapshot.
pub(crate) fn slot_target(scope: &Scope, slot: &str) -> Target {
    slot_table(scope).ensure(scope, slot);
    let weak = scope.downgrade();
    let name = slot.to_string();
    Target::Deferred(Rc::new(move || {
        let scope = weak.upgrade()?;
        slot_table(&scope).entry(&name).and_then(|entry| entry.resolved.borrow().clone())
    }))
}

// ---------------------------------------------------------------------------
// Scope surface
// ---------------------------------------------------------------------------

/// Slot accessors on [`Scope`].
///
/// The `model` / `collection` shorthands operate on those families'
/// tracked slots: the accessor returns the first slot that currently
/// resolves, the mutator and event registrations use the primary (first
/// tracked) slot.
pub trait SlotScope {
    /// Currently resolved source for `name`.
    fn slot(&self, name: &str) -> Option<Source>;

    /// Override `name` locally, winning over the owning attribute. When the
    /// resolution changes, the slot's subscriptions transfer immediately
    /// and a live component requests a render.
    fn set_slot(&self, name: &str, source: Option<Source>);

    /// Add `name` to the tracked set without going through a family trait.
    fn track_slot(&self, name: &str);

    /// Register a subscription resolved against `slot` at every bind.
    fn slot_on(&self, slot: &str, event: &str, callback: Callback);

    /// [`slot_on`](Self::slot_on), delivered at most once per binding.
    fn slot_once(&self, slot: &str, event: &str, callback: Callback);

    /// Remove slot subscriptions matching `event` and, when given, the
    /// exact callback.
    fn slot_off(&self, slot: &str, event: &str, callback: Option<&Callback>);

    fn model(&self) -> Option<Source>;
    fn set_model(&self, source: Option<Source>);
    fn model_on(&self, event: &str, callback: Callback);
    fn model_once(&self, event: &str, callback: Callback);
    fn model_off(&self, event: &str, callback: Option<&Callback>);

    fn collection(&self) -> Option<Source>;
    fn set_collection(&self, source: Option<Source>);
    fn collection_on(&self, event: &str, callback: Callback);
    fn collection_once(&self, event: &str, callback: Callback);
    fn collection_off(&self, event: &str, callback: Option<&Callback>);
}

fn family_accessor(scope: &Scope, family: &str) -> Option<Source> {
    for name in family_slots(scope, family) {
        if let Some(source) = scope.slot(&name) {
            return Some(source);
        }
    }
    None
}

fn primary_slot(scope: &Scope, family: &str) -> String {
    family_slots(scope, family).remove(0)
}

impl SlotScope for Scope {
    fn slot(&self, name: &str) -> Option<Source> {
        match slot_table(self).entry(name) {
            Some(entry) => entry.resolved.borrow().clone(),
            None => self.source_attribute(name),
        }
    }

    fn set_slot(&self, name: &str, source: Option<Source>) {
        let entry = slot_table(self).ensure(self, name);
        *entry.local.borrow_mut() = source;
        if sync_entry(self, &entry, None) && self.is_live() {
            self.request_render();
        }
    }

    fn track_slot(&self, name: &str) {
        slot_table(self).ensure(self, name);
    }

    fn slot_on(&self, slot: &str, event: &str, callback: Callback) {
        listeners(self).listen_grouped(
            &slot_group(slot),
            slot_target(self, slot),
            event,
            callback,
            false,
        );
    }

    fn slot_once(&self, slot: &str, event: &str, callback: Callback) {
        listeners(self).listen_grouped(
            &slot_group(slot),
            slot_target(self, slot),
            event,
            callback,
            true,
        );
    }

    fn slot_off(&self, slot: &str, event: &str, callback: Option<&Callback>) {
        let resolved = self.slot(slot);
        listeners(self).stop_listening(resolved.as_ref(), Some(event), callback);
    }

    fn model(&self) -> Option<Source> {
        family_accessor(self, "model")
    }

    fn set_model(&self, source: Option<Source>) {
        self.set_slot(&primary_slot(self, "model"), source);
    }

    fn model_on(&self, event: &str, callback: Callback) {
        self.slot_on(&primary_slot(self, "model"), event, callback);
    }

    fn model_once(&self, event: &str, callback: Callback) {
        self.slot_once(&primary_slot(self, "model"), event, callback);
    }

    fn model_off(&self, event: &str, callback: Option<&Callback>) {
        self.slot_off(&primary_slot(self, "model"), event, callback);
    }

    fn collection(&self) -> Option<Source> {
        family_accessor(self, "collection")
    }

    fn set_collection(&self, source: Option<Source>) {
        self.set_slot(&primary_slot(self, "collection"), source);
    }

    fn collection_on(&self, event: &str, callback: Callback) {
        self.slot_on(&primary_slot(self, "collection"), event, callback);
    }

    fn collection_once(&self, event: &str, callback: Callback) {
        self.slot_once(&primary_slot(self, "collection"), event, callback);
    }

    fn collection_off(&self, event: &str, callback: Option<&Callback>) {
        self.slot_off(&primary_slot(self, "collection"), event, callback);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
