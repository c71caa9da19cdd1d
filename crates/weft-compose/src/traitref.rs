//! Typed trait references parsed from call-like strings.
//!
//! `"deferUpdate(300)"` becomes a [`TraitRef`] with one [`Arg::Int`]; bare
//! names carry an empty argument list. The grammar is deliberately small:
//!
//! ```text
//! ref   := name | name '(' args ')'
//! args  := ε | arg (',' arg)*
//! arg   := integer | float | 'true' | 'false' | text
//! ```
//!
//! Numeric and boolean literals are coerced; anything else passes through as
//! text, with one matching pair of surrounding quotes stripped if present.

use std::fmt;

use crate::ComposeError;

/// One literal argument from a trait reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Integer literal, e.g. `300`.
    Int(i64),
    /// Float literal, e.g. `0.5`.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// Anything else, quotes stripped.
    Text(String),
}

/// Ordered argument list attached to one trait request.
pub type ArgList = Vec<Arg>;

impl Arg {
    /// Coerce one raw (already trimmed) token into a typed literal.
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(x) = raw.parse::<f64>() {
            return Self::Float(x);
        }
        Self::Text(strip_quotes(raw).to_string())
    }

    /// Integer value, if this literal is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value widened to `f64` (covers both `Int` and `Float`).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Boolean value, if this literal is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text payload, if this literal is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

// ---------------------------------------------------------------------------
// TraitRef
// ---------------------------------------------------------------------------

/// A trait name plus its optional ordered argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitRef {
    name: String,
    args: ArgList,
}

impl TraitRef {
    /// Reference a trait by bare name, no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }

    /// Reference a trait with explicit arguments.
    pub fn with_args(name: impl Into<String>, args: ArgList) -> Self {
        Self { name: name.into(), args }
    }

    /// Parse the call-string form: `"name"` or `"name(a, b)"`.
    pub fn parse(input: &str) -> Result<Self, ComposeError> {
        let bad = |reason| ComposeError::BadTraitRef { input: input.to_string(), reason };
        let s = input.trim();
        if s.is_empty() {
            return Err(bad("empty reference"));
        }
        let Some(open) = s.find('(') else {
            if s.contains(')') || s.contains(',') {
                return Err(bad("stray ')' or ',' outside an argument list"));
            }
            return Ok(Self::new(s));
        };
        let name = s[..open].trim_end();
        if name.is_empty() {
            return Err(bad("missing name before '('"));
        }
        let rest = &s[open + 1..];
        let Some(close) = rest.rfind(')') else {
            return Err(bad("unterminated argument list"));
        };
        if !rest[close + 1..].trim().is_empty() {
            return Err(bad("trailing input after ')'"));
        }
        let inner = &rest[..close];
        if inner.contains('(') || inner.contains(')') {
            return Err(bad("nested parentheses in arguments"));
        }
        let args = if inner.trim().is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|raw| Arg::coerce(raw.trim())).collect()
        };
        Ok(Self { name: name.to_string(), args })
    }

    /// The referenced trait name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached argument list (possibly empty).
    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Consume the reference, yielding its argument list.
    #[must_use]
    pub fn into_args(self) -> ArgList {
        self.args
    }
}

impl fmt::Display for TraitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.name);
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl From<&str> for TraitRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
