//! Dynamic values carried through attributes, component state, and events.
//!
//! The host framework and the observable objects around it traffic in
//! loosely typed data; [`Value`] is the closed enum standing in for that,
//! with JS-like truthiness so "the attribute is falsy" has one meaning
//! everywhere. [`EventArgs`] is the positional payload of a `trigger` call,
//! plus the echo flag used to mark change notifications that originated from
//! the UI during a two-way edit.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::source::Source;

/// Attribute map supplied by the host per component.
pub type Attributes = AHashMap<String, Value>;

/// One dynamic value.
#[derive(Clone)]
pub enum Value {
    /// Absent / cleared.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Handle to an observable object (compared by identity).
    Source(Source),
    /// Opaque payload (compared by allocation identity).
    Data(Rc<dyn Any>),
}

impl Value {
    /// Wrap an arbitrary payload.
    pub fn data<T: Any>(value: T) -> Self {
        Self::Data(Rc::new(value))
    }

    /// JS-like truthiness: `Null`, `false`, `0`, `0.0`, and `""` are falsy;
    /// everything else (sources and data included) is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Source(_) | Self::Data(_) => true,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The observable handle, if this value is one.
    #[must_use]
    pub fn as_source(&self) -> Option<Source> {
        match self {
            Self::Source(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Downcast a `Data` payload to a concrete type.
    #[must_use]
    pub fn data_as<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Self::Data(d) => Rc::clone(d).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Source(a), Self::Source(b)) => a.same(b),
            (Self::Data(a), Self::Data(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Source(s) => write!(f, "{s:?}"),
            Self::Data(_) => f.write_str("Data(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<Source> for Value {
    fn from(s: Source) -> Self {
        Self::Source(s)
    }
}

// ---------------------------------------------------------------------------
// EventArgs
// ---------------------------------------------------------------------------

/// Positional payload of one `trigger` call.
///
/// The `echo` flag marks a mutation notification whose effect is already
/// reflected in the UI (an in-progress two-way edit); change-aware consumers
/// suppress their re-render request when they see it.
#[derive(Clone, Default)]
pub struct EventArgs {
    values: Vec<Value>,
    echo: bool,
}

impl EventArgs {
    /// No payload, no echo.
    pub const EMPTY: EventArgs = EventArgs { values: Vec::new(), echo: false };

    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, echo: false }
    }

    /// Single-value payload.
    #[must_use]
    pub fn single(value: Value) -> Self {
        Self::new(vec![value])
    }

    /// Mark this payload as an echoed (UI-originated) change.
    #[must_use]
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    #[must_use]
    pub fn is_echo(&self) -> bool {
        self.echo
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The observable at `index`, if that position holds one.
    #[must_use]
    pub fn source_at(&self, index: usize) -> Option<Source> {
        self.values.get(index).and_then(Value::as_source)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}

impl fmt::Debug for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventArgs")
            .field("values", &self.values)
            .field("echo", &self.echo)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
