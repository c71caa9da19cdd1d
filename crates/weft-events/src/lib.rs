#![forbid(unsafe_code)]

//! Declarative event routing and deferred subscription management for weft
//! components.
//!
//! Two layers:
//!
//! - [`ListenerSet`]: a component's retained subscription list. Bindings
//!   defer until the component mounts, unbind at unmount, and rebind
//!   identically at remount; group tags let a rebinder atomically move a
//!   set of entries to a new target.
//! - [`manage_events`]: installs string-keyed descriptor maps. Keys follow
//!   `[*modifier(args)->]{kind}:{path}`; kinds resolve the target (own
//!   events, the process [`bus`], attribute-supplied objects, siblings,
//!   timers), modifiers wrap the callback (throttling, debouncing,
//!   single-shot and friends).
//!
//! # Architecture
//!
//! The `listen` trait binds the listener set to the mount phase; the
//! `events` trait (which requires it) drives installed handlers and, after
//! every update pass, rebinds any handler whose underlying target changed
//! identity. Kind and modifier tables are thread-local and extensible
//! through [`with_event_kinds`] and [`register_modifier`].
//!
//! # Invariants
//!
//! 1. No subscription is lost because its target did not exist yet;
//!    deferred targets are re-resolved at every bind.
//! 2. Descriptor maps install all-or-nothing; configuration errors are
//!    fatal at install time.
//! 3. Stale handler rebinding happens synchronously within the update pass
//!    that detected it.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

use weft_compose::{ComposeError, Registry};
use weft_core::{Behavior, Emitter, Source};

mod descriptor;
mod kinds;
mod listen;
mod modifiers;
mod router;

#[cfg(test)]
pub(crate) mod testutil;

pub use descriptor::{DescriptorValue, Descriptors, EventKey, Modifier};
pub use kinds::ListenHandler;
pub use listen::{ListenerSet, Target, listen_trait, listeners};
pub use router::{
    Handler, HandlerFactory, HandlerRegistry, HandlerRequest, InstalledHandler, ModifierFactory,
    events_trait, manage_events, register_modifier, reset_event_router, with_event_kinds,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration errors raised while installing descriptors. All of these
/// indicate a programming mistake and surface before any binding happens.
#[derive(Debug)]
#[non_exhaustive]
pub enum EventsError {
    /// The descriptor key does not follow the grammar.
    BadDescriptor { key: String, reason: &'static str },
    /// No kind factory matches the key's kind segment.
    UnhandledKind { kind: String },
    /// A method-name descriptor value has no matching scope method.
    UnknownMethod { name: String },
    /// A `*name->` prefix names no registered modifier.
    UnknownModifier { name: String },
    /// A modifier rejected its literal argument list.
    BadModifierArgs { name: &'static str, expected: &'static str },
}

impl fmt::Display for EventsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDescriptor { key, reason } => {
                write!(f, "malformed event descriptor `{key}`: {reason}")
            }
            Self::UnhandledKind { kind } => {
                write!(f, "no handler registered for event kind `{kind}`")
            }
            Self::UnknownMethod { name } => write!(f, "no component method named `{name}`"),
            Self::UnknownModifier { name } => write!(f, "unknown event modifier `*{name}`"),
            Self::BadModifierArgs { name, expected } => {
                write!(f, "modifier `*{name}` expects {expected}")
            }
        }
    }
}

impl Error for EventsError {}

// ---------------------------------------------------------------------------
// Bus and registration
// ---------------------------------------------------------------------------

thread_local! {
    static BUS: Source = Source::wrap(Rc::new(Emitter::new()));
}

/// The process-wide application event bus, target of the `bus:` kind.
#[must_use]
pub fn bus() -> Source {
    BUS.with(Clone::clone)
}

/// Register the `listen` and `events` traits into `registry`.
pub fn register(registry: &mut Registry<Behavior>) -> Result<(), ComposeError> {
    registry.add("listen", &[], listen::listen_trait())?;
    registry.add("events", &[], router::events_trait())?;
    Ok(())
}
