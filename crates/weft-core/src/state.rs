//! Two-phase component state.
//!
//! Components accept state writes before the host's backing store exists
//! (during composition and pre-mount configuration). Rather than branching
//! on store presence at every call site, writes land in a staging buffer
//! until the store is committed — the `state` built-in trait commits on the
//! first mount — and go straight to the live map afterwards.
//!
//! # Invariants
//!
//! - The staging buffer merges into the live map exactly once; staged
//!   entries win over anything already live at commit time.
//! - Reads see live entries first, then staged ones while uncommitted.
//! - Commit state survives unmount; a remount does not re-stage.

use std::cell::{Cell, RefCell};

use ahash::AHashMap;

use crate::value::Value;

/// Per-component key/value state with a pre-mount staging phase.
pub struct StateStore {
    staged: RefCell<AHashMap<String, Value>>,
    live: RefCell<AHashMap<String, Value>>,
    committed: Cell<bool>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            staged: RefCell::new(AHashMap::new()),
            live: RefCell::new(AHashMap::new()),
            committed: Cell::new(false),
        }
    }

    /// Read one key, wherever it currently lives.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.live.borrow().get(key) {
            return Some(v.clone());
        }
        if !self.committed.get() {
            return self.staged.borrow().get(key).cloned();
        }
        None
    }

    /// Truthiness of one key; absent reads as falsy.
    #[must_use]
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.is_truthy())
    }

    /// Write one key: staged before commit, live after.
    pub fn set(&self, key: &str, value: Value) {
        if self.committed.get() {
            self.live.borrow_mut().insert(key.to_string(), value);
        } else {
            self.staged.borrow_mut().insert(key.to_string(), value);
        }
    }

    /// Remove one key from both phases.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let staged = self.staged.borrow_mut().remove(key);
        self.live.borrow_mut().remove(key).or(staged)
    }

    /// Merge the staging buffer into the live map. Idempotent; the first
    /// call flips the store into pass-through mode.
    pub fn commit(&self) {
        if self.committed.replace(true) {
            return;
        }
        let staged = std::mem::take(&mut *self.staged.borrow_mut());
        if !staged.is_empty() {
            tracing::trace!(entries = staged.len(), "staged state committed");
        }
        self.live.borrow_mut().extend(staged);
    }

    /// Whether the staging phase has ended.
    #[must_use]
    pub fn committed(&self) -> bool {
        self.committed.get()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
