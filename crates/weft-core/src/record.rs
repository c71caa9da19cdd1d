//! Optional data contract for observables that are records.
//!
//! Slot helpers that read, write, validate, or populate data objects need
//! more than `on`/`off`/`trigger`; [`Record`] is that seam, reached through
//! [`Observed::as_record`](crate::Observed::as_record). Validation failures
//! are recoverable values — an [`ErrorIndex`] — never panics or propagated
//! errors, so a failed populate/submit simply does not proceed.

use std::error::Error;
use std::fmt;

use ahash::AHashMap;

use crate::value::{Attributes, Value};

/// Options attached to a record mutation.
#[derive(Clone, Debug, Default)]
pub struct SetOptions {
    /// Run the record's validator; on failure nothing is applied.
    pub validate: bool,
    /// Mark resulting change notifications as echoed (UI-originated), so
    /// change-aware components skip their re-render request.
    pub echo: bool,
}

impl SetOptions {
    /// `validate: true`, everything else default.
    #[must_use]
    pub fn validated() -> Self {
        Self { validate: true, ..Self::default() }
    }

    /// `echo: true`, everything else default.
    #[must_use]
    pub fn echoed() -> Self {
        Self { echo: true, ..Self::default() }
    }
}

/// Field-keyed validation error index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorIndex {
    by_field: AHashMap<String, String>,
}

impl ErrorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index with a single entry.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut index = Self::new();
        index.insert(field, message);
        index
    }

    /// Normalize a list of `(field, message)` pairs; later entries for the
    /// same field win.
    pub fn from_pairs<F, M>(pairs: impl IntoIterator<Item = (F, M)>) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        let mut index = Self::new();
        for (field, message) in pairs {
            index.insert(field, message);
        }
        index
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.by_field.insert(field.into(), message.into());
    }

    /// Fold another index in; its entries win on collision.
    pub fn merge(&mut self, other: ErrorIndex) {
        self.by_field.extend(other.by_field);
    }

    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.by_field.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_field.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }
}

impl fmt::Display for ErrorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.by_field.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        f.write_str("validation failed:")?;
        for (field, message) in fields {
            write!(f, " {field}: {message};")?;
        }
        Ok(())
    }
}

impl Error for ErrorIndex {}

/// The record contract: attribute access plus validated mutation.
pub trait Record {
    /// Current value of one attribute.
    fn attr(&self, key: &str) -> Option<Value>;

    /// Apply `attrs`. With `options.validate`, a failing validator leaves the
    /// record untouched and returns the index.
    fn set_attrs(&self, attrs: &Attributes, options: &SetOptions) -> Result<(), ErrorIndex>;

    /// Dry-run validation of `attrs` against the record.
    fn validate_attrs(&self, attrs: &Attributes) -> Option<ErrorIndex>;

    /// Single-attribute convenience over [`set_attrs`](Self::set_attrs).
    fn set_attr(&self, key: &str, value: Value, options: &SetOptions) -> Result<(), ErrorIndex> {
        let mut attrs = Attributes::new();
        attrs.insert(key.to_string(), value);
        self.set_attrs(&attrs, options)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
