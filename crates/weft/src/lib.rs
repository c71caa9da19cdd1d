#![forbid(unsafe_code)]

//! Batteries-included surface for weft: compose behavior traits onto
//! host-driven components, route events declaratively, bind data sources,
//! and track async activities — one dependency, one [`install`] call.
//!
//! # Architecture
//!
//! Thin facade over the member crates:
//!
//! - [`weft_compose`]: trait registry, references, dependency resolution.
//! - [`weft_core`]: scopes, observable sources, values, two-phase state.
//! - [`weft_events`] (`events` feature): listener sets and descriptor
//!   routing.
//! - [`weft_activity`] (`activity` feature): async activity tracking and
//!   the transport seam.
//! - [`weft_bind`] (`bind` feature): data-source slots and the
//!   model/collection trait packs.
//!
//! The two core crates re-export flat at the root; the feature-gated crates
//! keep their own namespaces ([`events`], [`activity`], [`bind`]) with the
//! everyday names collected in [`prelude`].
//!
//! # Invariants
//!
//! 1. [`install`] is idempotent: packs already present in the default
//!    registry are left untouched.
//! 2. The facade adds no behavior of its own; everything here is a
//!    re-export or a registration call into the member crates.

pub use weft_compose::{Arg, ArgList, ComposeError, Registry, Request, TraitRef};
pub use weft_core::{
    Attributes, Behavior, Callback, ContextId, Emitter, ErrorIndex, EventArgs, Host, InitError,
    Observed, Record, Scheduler, Scope, ScopeError, SetOptions, Source, SourceId, StateStore,
    TimerId, Value, WeakScope, builtin_registry, default_defer_interval, install_builtins,
    reset_default_registry, set_default_defer_interval, with_default_registry,
};

#[cfg(feature = "activity")]
pub use weft_activity as activity;
#[cfg(feature = "bind")]
pub use weft_bind as bind;
#[cfg(feature = "events")]
pub use weft_events as events;

/// The names nearly every component module touches.
pub mod prelude {
    pub use weft_compose::{Registry, Request, TraitRef};
    pub use weft_core::{
        Attributes, Behavior, Callback, EventArgs, Host, Observed, Record, Scheduler, Scope,
        Source, Value,
    };

    #[cfg(feature = "activity")]
    pub use weft_activity::{ActivityContext, ActivityOptions, Dispatch, Transport};
    #[cfg(feature = "bind")]
    pub use weft_bind::{RecordScope, SlotScope};
    #[cfg(feature = "events")]
    pub use weft_events::{Descriptors, ListenerSet, listeners, manage_events};
}

/// Register every enabled trait pack (and its event kinds) into this
/// thread's default registry, so [`Scope::compose_default`] resolves the
/// full built-in vocabulary. Packs whose lead trait is already registered
/// are skipped, so calling this from multiple entry points is safe.
#[cfg(feature = "events")]
pub fn install() -> Result<(), ComposeError> {
    with_default_registry(|registry| {
        if !registry.contains("listen") {
            weft_events::register(registry)?;
        }
        #[cfg(feature = "bind")]
        if !registry.contains("model-aware") {
            weft_bind::register(registry)?;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
