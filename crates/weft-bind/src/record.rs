//! Record helpers over the primary model slot: reading and writing single
//! attributes, populating a model from input components, and the routing of
//! validation error indexes into component state.
//!
//! Validation failures are recoverable values. A failed populate returns
//! the [`ErrorIndex`] and applies nothing; nothing here panics or throws.

use weft_core::{Attributes, ErrorIndex, EventArgs, Scope, SetOptions, Value};

use crate::slots::SlotScope;

/// Record access through the component's primary model slot.
pub trait RecordScope {
    /// The model attribute this component binds: the `key` attribute, else
    /// `ref`, else `name`.
    fn bind_key(&self) -> Option<String>;

    /// The component's current input value: two-way edit state first, the
    /// `value` attribute as the static fallback.
    fn input_value(&self) -> Option<Value>;

    /// Read one attribute of the primary model.
    fn model_value(&self, key: &str) -> Option<Value>;

    /// Write one attribute of the primary model.
    fn set_model_value(
        &self,
        key: &str,
        value: Value,
        options: &SetOptions,
    ) -> Result<(), ErrorIndex>;

    /// Collect `(bind_key, input_value)` pairs from `children` and apply
    /// them to the primary model with validation. On failure the model is
    /// untouched and the index is returned; without a model the collected
    /// attributes are returned unapplied.
    fn populate(&self, children: &[Scope]) -> Result<Attributes, ErrorIndex>;

    /// [`populate`](Self::populate) over the host's own child scopes.
    fn populate_children(&self) -> Result<Attributes, ErrorIndex>;

    /// Dry-run validation of `attrs` against the primary model.
    fn validate_model(&self, attrs: &Attributes) -> Option<ErrorIndex>;
}

impl RecordScope for Scope {
    fn bind_key(&self) -> Option<String> {
        for name in ["key", "ref", "name"] {
            let value = self.attribute(name).and_then(|v| v.as_str().map(str::to_string));
            if let Some(key) = value {
                if !key.is_empty() {
                    return Some(key);
                }
            }
        }
        None
    }

    fn input_value(&self) -> Option<Value> {
        self.state().get("value").or_else(|| self.attribute("value"))
    }

    fn model_value(&self, key: &str) -> Option<Value> {
        self.model()?.record()?.attr(key)
    }

    fn set_model_value(
        &self,
        key: &str,
        value: Value,
        options: &SetOptions,
    ) -> Result<(), ErrorIndex> {
        let Some(source) = self.model() else {
            tracing::warn!(key, "no model to write");
            return Ok(());
        };
        let Some(record) = source.record() else {
            tracing::warn!(key, "model does not implement the record contract");
            return Ok(());
        };
        record.set_attr(key, value, options)
    }

    fn populate(&self, children: &[Scope]) -> Result<Attributes, ErrorIndex> {
        let mut attrs = Attributes::new();
        for child in children {
            let (Some(key), Some(value)) = (child.bind_key(), child.input_value()) else {
                continue;
            };
            attrs.insert(key, value);
        }
        let Some(source) = self.model() else {
            return Ok(attrs);
        };
        let Some(record) = source.record() else {
            return Ok(attrs);
        };
        record.set_attrs(&attrs, &SetOptions::validated())?;
        Ok(attrs)
    }

    fn populate_children(&self) -> Result<Attributes, ErrorIndex> {
        self.populate(&self.host().children())
    }

    fn validate_model(&self, attrs: &Attributes) -> Option<ErrorIndex> {
        self.model()?.record()?.validate_attrs(attrs)
    }
}

/// Recover a validation error index from an event payload.
#[must_use]
pub fn index_errors(args: &EventArgs) -> Option<ErrorIndex> {
    args.iter().find_map(|value| value.data_as::<ErrorIndex>()).map(|index| (*index).clone())
}

/// Drop entries for fields named in a change notification from the error
/// index held in `attr` state. A notification naming no indexed field, or
/// naming no fields at all, leaves the state untouched.
pub(crate) fn clear_resolved_errors(scope: &Scope, attr: &str, args: &EventArgs) {
    let Some(current) = scope.state().get(attr).and_then(|v| v.data_as::<ErrorIndex>()) else {
        return;
    };
    let changed: Vec<&str> = args.iter().filter_map(Value::as_str).collect();
    if !changed.iter().any(|field| current.message_for(field).is_some()) {
        return;
    }
    let remaining =
        ErrorIndex::from_pairs(current.iter().filter(|(field, _)| !changed.contains(field)));
    if remaining.is_empty() {
        scope.set_state(attr, Value::Null);
    } else {
        scope.set_state(attr, Value::data(remaining));
    }
}

// ---------------------------------------------------------------------------
