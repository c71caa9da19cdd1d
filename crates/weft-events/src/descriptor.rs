//! Descriptor key grammar: `[*modifier(args)->]...{kind}:{path}`.
//!
//! Examples of accepted keys:
//!
//! - `bus:app:refresh` — kind `bus`, path `app:refresh`
//! - `attr:feed:change` — kind `attr`, path `feed:change`
//! - `*throttle(300)->interval:1000` — one modifier, then kind and path
//! - `*once:saved` — `:` is accepted as the modifier separator too
//! - `submitted` — no colon: shorthand for `self:submitted`
//!
//! Modifier argument literals get the same coercion as trait parameters:
//! integers and `true`/`false` become typed values, everything else passes
//! through as text.

use weft_compose::{ArgList, TraitRef};
use weft_core::Callback;

use crate::EventsError;

// ---------------------------------------------------------------------------
// EventKey
// ---------------------------------------------------------------------------

/// One modifier application, in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub args: ArgList,
}

/// A parsed descriptor key.
#[derive(Clone, Debug, PartialEq)]
pub struct EventKey {
    pub modifiers: Vec<Modifier>,
    pub kind: String,
    pub path: String,
}

impl EventKey {
    /// Parse a descriptor key. Keys without a `:` are shorthand for the
    /// `self` kind (the component's own events).
    pub fn parse(key: &str) -> Result<Self, EventsError> {
        let bad = |reason: &'static str| EventsError::BadDescriptor {
            key: key.to_string(),
            reason,
        };
        let mut rest = key.trim();
        if rest.is_empty() {
            return Err(bad("empty descriptor key"));
        }

        let mut modifiers = Vec::new();
        while let Some(stripped) = rest.strip_prefix('*') {
            let Some((head, tail)) = split_modifier(stripped) else {
                return Err(bad("modifier is missing `->` or `:`"));
            };
            let parsed =
                TraitRef::parse(head.trim()).map_err(|_| bad("malformed modifier"))?;
            let name = parsed.name().to_string();
            modifiers.push(Modifier { name, args: parsed.into_args() });
            rest = tail.trim();
        }
        if rest.is_empty() {
            return Err(bad("nothing after the modifiers"));
        }

        let (kind, path) = match rest.split_once(':') {
            Some((kind, path)) => (kind.to_string(), path.to_string()),
            None => ("self".to_string(), rest.to_string()),
        };
        if kind.is_empty() {
            return Err(bad("empty kind"));
        }
        Ok(Self { modifiers, kind, path })
    }
}

/// Split one modifier token off the front of `stripped` (the text after the
/// leading `*`). The token ends at the first `->` or `:` past its optional
/// parenthesized argument list; both separators are accepted.
fn split_modifier(stripped: &str) -> Option<(&str, &str)> {
    let scan_from = match stripped.find('(') {
        Some(open) => open + stripped[open..].find(')')? + 1,
        None => 0,
    };
    let tail = &stripped[scan_from..];
    let (at, width) = match (tail.find("->"), tail.find(':')) {
        (Some(arrow), Some(colon)) if colon < arrow => (colon, 1),
        (Some(arrow), _) => (arrow, 2),
        (None, Some(colon)) => (colon, 1),
        (None, None) => return None,
    };
    let cut = scan_from + at;
    Some((&stripped[..cut], &stripped[cut + width..]))
}

// ---------------------------------------------------------------------------
// Descriptor maps
// ---------------------------------------------------------------------------

/// What a descriptor key maps to.
#[derive(Clone)]
pub enum DescriptorValue {
    /// A named callback looked up through [`Scope::method`] at install
    /// time.
    ///
    /// [`Scope::method`]: weft_core::Scope::method
    Method(String),
    /// A callback supplied directly; it carries its own invocation context.
    Callback(Callback),
}

/// Ordered descriptor map, flattened. Nested maps join their keys with `:`.
#[derive(Clone, Default)]
pub struct Descriptors {
    entries: Vec<(String, DescriptorValue)>,
}

impl Descriptors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to the scope method named `method`.
    #[must_use]
    pub fn method(mut self, key: &str, method: &str) -> Self {
        self.entries.push((key.to_string(), DescriptorValue::Method(method.to_string())));
        self
    }

    /// Map `key` to an explicit callback.
    #[must_use]
    pub fn callback(mut self, key: &str, callback: Callback) -> Self {
        self.entries.push((key.to_string(), DescriptorValue::Callback(callback)));
        self
    }

    /// Splice a nested map under `prefix`, joining keys with `:`.
    #[must_use]
    pub fn nested(mut self, prefix: &str, inner: Descriptors) -> Self {
        for (key, value) in inner.entries {
            self.entries.push((format!("{prefix}:{key}"), value));
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &(String, DescriptorValue)> {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
