//! Named, composable, parameterized behavior units ("traits") and the
//! resolver that expands a requested list of them into a dependency-ordered,
//! deduplicated installation sequence.
//!
//! The registry is generic over the composed body type `B`, so it can carry
//! anything from lifecycle-hook bundles to plain strings in tests. A trait is
//! one of four flavors:
//!
//! - a **value**: a ready-made body, installed as-is;
//! - a **factory**: invoked per request with that request's argument list;
//! - a **shared factory**: invoked once per composition with *every*
//!   argument list collected across the whole expansion;
//! - a **group**: dependencies only, no body of its own.
//!
//! # Invariants
//!
//! - In a resolved sequence, every trait's dependencies appear strictly
//!   before it.
//! - No trait name is installed twice in one resolution; a shared factory is
//!   installed exactly once, pre-merged.
//! - Registration is additive. Re-registering a name overwrites, except that
//!   a name may never change shared flavor (see [`ComposeError::DuplicateName`]).
//!
//! # Failure Modes
//!
//! | Error | When |
//! |-------|------|
//! | [`ComposeError::UnknownTrait`] | a requested or depended-on name is not registered |
//! | [`ComposeError::UnsupportedParameters`] | arguments supplied to a non-factory trait |
//! | [`ComposeError::DuplicateName`] | re-registration flips the shared flavor |
//! | [`ComposeError::CyclicDependency`] | the dependency graph loops |
//! | [`ComposeError::BadTraitRef`] | a call-string reference does not parse |
//!
//! All of these are configuration errors: they surface when a composition is
//! resolved, before anything backed by it runs.
//!
//! # Example
//!
//! ```
//! use weft_compose::{Composable, Registry, TraitRef};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Part(&'static str);
//! impl Composable for Part {}
//!
//! let mut reg: Registry<Part> = Registry::new();
//! reg.add("render", &[], Part("render")).unwrap();
//! reg.add("focus", &["render"], Part("focus")).unwrap();
//!
//! let parts = reg.resolve_named(&["focus"]).unwrap();
//! assert_eq!(parts, vec![Part("render"), Part("focus")]);
//! ```

#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;

mod registry;
mod resolve;
mod traitref;

pub use registry::Registry;
pub use resolve::Request;
pub use traitref::{Arg, ArgList, TraitRef};

// ---------------------------------------------------------------------------
// Composable
// ---------------------------------------------------------------------------

/// Contract a composed body type implements so structural entries (bodies
/// passed directly into a resolution, or produced by a factory) can declare
/// further dependencies of their own.
///
/// The default implementation declares none, which is right for leaf bodies.
pub trait Composable {
    /// Trait references that must be installed before this body.
    fn dependencies(&self) -> &[TraitRef] {
        &[]
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration error raised while registering or resolving traits.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ComposeError {
    /// A requested or depended-on trait name is not registered.
    UnknownTrait {
        /// The name that failed to resolve.
        name: String,
    },
    /// Arguments were supplied to a trait that takes none (a value or group).
    UnsupportedParameters {
        /// The non-factory trait that received arguments.
        name: String,
    },
    /// Re-registration attempted to change a name's shared flavor.
    DuplicateName {
        /// The contested name.
        name: String,
    },
    /// The dependency graph loops through the named chain.
    CyclicDependency {
        /// Names along the loop, ending where it closes.
        chain: Vec<String>,
    },
    /// A call-string trait reference did not parse.
    BadTraitRef {
        /// The offending input.
        input: String,
        /// What the parser objected to.
        reason: &'static str,
    },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrait { name } => write!(f, "unknown trait `{name}`"),
            Self::UnsupportedParameters { name } => {
                write!(f, "trait `{name}` does not accept parameters")
            }
            Self::DuplicateName { name } => {
                write!(f, "trait `{name}` is already registered with a different shared flavor")
            }
            Self::CyclicDependency { chain } => {
                write!(f, "cyclic trait dependency: {}", chain.join(" -> "))
            }
            Self::BadTraitRef { input, reason } => {
                write!(f, "malformed trait reference `{input}`: {reason}")
            }
        }
    }
}

impl Error for ComposeError {}
