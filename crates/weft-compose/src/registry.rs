//! Process-wide trait definitions: registration, namespacing, injection.
//!
//! Names may be namespaced (`"weft-bind.model-aware"`). Registering a
//! namespaced name also claims the bare suffix (`"model-aware"`) when that
//! suffix is still free, so unambiguous short names keep working when several
//! packs layer onto one registry. A suffix already taken is left alone.
//!
//! # Invariants
//!
//! - Registration is additive; nothing is ever removed.
//! - Re-registration overwrites, but a name can never change shared flavor.
//! - Injected dependencies accumulate; they are resolved after a trait's
//!   statically declared dependencies.

use std::rc::Rc;

use ahash::AHashMap;

use crate::traitref::{Arg, ArgList, TraitRef};
use crate::ComposeError;

/// How a definition produces its body during resolution.
pub(crate) enum BodyKind<B> {
    /// Ready-made body, cloned into the output.
    Value(B),
    /// Invoked per request with that request's arguments.
    Factory(Rc<dyn Fn(&[Arg]) -> B>),
    /// Invoked once per composition with every collected argument list.
    Shared(Rc<dyn Fn(&[ArgList]) -> B>),
    /// Dependencies only.
    Group,
}

impl<B> BodyKind<B> {
    fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

pub(crate) struct Def<B> {
    /// Canonical (full) name; the visited set keys on this, so a trait
    /// reached through its namespace alias dedupes against the short form.
    pub(crate) name: String,
    pub(crate) deps: Vec<TraitRef>,
    pub(crate) body: BodyKind<B>,
}

/// Registry of named trait definitions, generic over the composed body type.
///
/// See the crate docs for the registration/resolution contract and
/// [`Registry::resolve`](crate::Registry::resolve) for the expansion
/// algorithm.
pub struct Registry<B> {
    pub(crate) defs: AHashMap<String, Rc<Def<B>>>,
    pub(crate) injected: AHashMap<String, Vec<TraitRef>>,
}

impl<B> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Registry<B> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { defs: AHashMap::new(), injected: AHashMap::new() }
    }

    /// Register a plain value trait.
    pub fn add(&mut self, name: &str, deps: &[&str], body: B) -> Result<(), ComposeError> {
        let deps = parse_deps(deps)?;
        self.insert(name, deps, BodyKind::Value(body))
    }

    /// Register a factory trait, invoked per request with its arguments.
    pub fn add_factory(
        &mut self,
        name: &str,
        deps: &[&str],
        factory: impl Fn(&[Arg]) -> B + 'static,
    ) -> Result<(), ComposeError> {
        let deps = parse_deps(deps)?;
        self.insert(name, deps, BodyKind::Factory(Rc::new(factory)))
    }

    /// Register a shared-instance factory trait: every request in one
    /// composition contributes its argument list, and the factory runs once
    /// with all of them.
    pub fn add_shared(
        &mut self,
        name: &str,
        deps: &[&str],
        factory: impl Fn(&[ArgList]) -> B + 'static,
    ) -> Result<(), ComposeError> {
        let deps = parse_deps(deps)?;
        self.insert(name, deps, BodyKind::Shared(Rc::new(factory)))
    }

    /// Register a group: a name that expands to its dependencies and
    /// contributes no body of its own.
    pub fn alias(&mut self, name: &str, deps: &[&str]) -> Result<(), ComposeError> {
        let deps = parse_deps(deps)?;
        self.insert(name, deps, BodyKind::Group)
    }

    /// Attach extra dependencies to an already-registered trait, out of band.
    /// They resolve after the trait's statically declared dependencies.
    pub fn inject(&mut self, name: &str, deps: &[&str]) -> Result<(), ComposeError> {
        let canon = match self.defs.get(name) {
            Some(def) => def.name.clone(),
            None => return Err(ComposeError::UnknownTrait { name: name.to_string() }),
        };
        let parsed = parse_deps(deps)?;
        self.injected.entry(canon).or_default().extend(parsed);
        Ok(())
    }

    /// Whether `name` (full or bare-suffix form) is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    fn insert(
        &mut self,
        name: &str,
        deps: Vec<TraitRef>,
        body: BodyKind<B>,
    ) -> Result<(), ComposeError> {
        validate_name(name)?;
        if let Some(existing) = self.defs.get(name) {
            if existing.body.is_shared() != body.is_shared() {
                return Err(ComposeError::DuplicateName { name: name.to_string() });
            }
        }
        let def = Rc::new(Def { name: name.to_string(), deps, body });
        let prev = self.defs.insert(name.to_string(), Rc::clone(&def));

        // Claim the bare suffix of a namespaced name when it is free, or
        // keep it current when it already tracks this same definition.
        if let Some((_, suffix)) = name.rsplit_once('.') {
            if !suffix.is_empty() {
                let claim = match (self.defs.get(suffix), &prev) {
                    (None, _) => true,
                    (Some(cur), Some(old)) => Rc::ptr_eq(cur, old),
                    (Some(_), None) => false,
                };
                if claim {
                    self.defs.insert(suffix.to_string(), def);
                }
            }
        }
        tracing::trace!(name, "trait registered");
        Ok(())
    }
}

fn parse_deps(deps: &[&str]) -> Result<Vec<TraitRef>, ComposeError> {
    deps.iter().map(|d| TraitRef::parse(d)).collect()
}

fn validate_name(name: &str) -> Result<(), ComposeError> {
    if name.is_empty() || name.contains(['(', ')', ',']) || name.trim() != name {
        return Err(ComposeError::BadTraitRef {
            input: name.to_string(),
            reason: "trait names may not be empty, padded, or contain '(' ')' ','",
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
