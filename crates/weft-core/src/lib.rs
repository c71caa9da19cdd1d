#![forbid(unsafe_code)]

//! Component runtime for weft: scopes, observable sources, and two-phase
//! state.
//!
//! This crate is the seam between the trait resolver ([`weft_compose`]) and
//! a host UI framework:
//!
//! - [`Scope`]: one component instance's runtime — composed [`Behavior`]s,
//!   lifecycle dispatch, a [`StateStore`], named callbacks, and extension
//!   slots.
//! - [`Source`] / [`Observed`]: identity-carrying handles to observable
//!   objects, with [`Emitter`] as the in-crate implementation.
//! - [`Value`] / [`EventArgs`]: the loosely-typed attribute and event
//!   payload model shared by every weft crate.
//! - [`Record`]: mutable keyed data objects with validation reported as an
//!   [`ErrorIndex`], never thrown.
//! - [`Host`] / [`Scheduler`]: the capability contracts a host framework
//!   implements.
//!
//! # Architecture
//!
//! Everything is single-threaded: `Rc`/`RefCell` ownership, thread-local
//! defaults, callbacks dispatched synchronously. A `Scope` is a cheap
//! cloneable handle; callbacks built through [`Scope::callback`] hold weak
//! references so a dropped component never receives another event.
//!
//! State is two-phase: writes before mount are staged, and the built-in
//! `state` trait applies them in one pass at mount with no render request.
//! Render requests issued through [`Scope::defer_update`] coalesce into a
//! single timer per component (the shared `defer-update` trait).
//!
//! # Invariants
//!
//! 1. Behavior hooks run in resolved dependency order, every phase.
//! 2. Event callbacks fire in registration order for a given event on a
//!    given emitter.
//! 3. A scope's state store commits at most once; post-commit writes land
//!    directly in live state.
//! 4. At most one coalescing render timer exists per component.
//! 5. Configuration errors ([`ScopeError`]) surface at composition time,
//!    before the component can mount.

mod builtin;
mod host;
mod record;
mod scope;
mod source;
mod state;
mod value;

#[cfg(test)]
pub(crate) mod testutil;

pub use builtin::{
    builtin_registry, default_defer_interval, install_builtins, reset_default_registry,
    set_default_defer_interval, with_default_registry,
};
pub use host::{Host, Scheduler, TimerId};
pub use record::{ErrorIndex, Record, SetOptions};
pub use scope::{Behavior, InitError, Scope, ScopeError, WeakScope};
pub use source::{Callback, ContextId, Emitter, Observed, Source, SourceId};
pub use state::StateStore;
pub use value::{Attributes, EventArgs, Value};
