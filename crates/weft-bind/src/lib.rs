#![forbid(unsafe_code)]

//! Data-source slots and the model/collection trait packs for weft
//! components.
//!
//! A slot names one externally supplied observable a component tracks,
//! resolved from a local override or from the source-valued attribute of
//! the same name. Everything else layers on that: subscriptions registered
//! against a slot transfer wholesale when its source changes identity, the
//! family trait packs route mutation/activity/validation events from
//! tracked slots into component state, and the record helpers populate and
//! validate the primary model from input components.
//!
//! # Architecture
//!
//! - [`slots`](SlotScope): the slot table, the per-update rebinder, and the
//!   `{prefix}On`-style accessor surface (`slot_on`, `model_on`, ...).
//! - `aware`: the `{family}-aware` trait packs and [`register`], including
//!   the `model`/`collection` event-descriptor kinds.
//! - `loading`: per-attribute aggregation of pending activities with
//!   first-in/last-out edge detection.
//! - `record`: populate/validate helpers and error-index routing.
//!
//! # Invariants
//!
//! 1. An unchanged slot is never rebound and never triggers a render; a
//!    changed one transfers its whole listener group synchronously within
//!    the update pass that detected the change.
//! 2. Transfer preserves callback identity, `on`/`once` mode, and
//!    registration order.
//! 3. A loading state attribute is written exactly twice per busy window:
//!    at the first-in edge and at the last-out edge.
//! 4. Validation failures are recoverable values; a failed populate applies
//!    nothing and surfaces the error index.

mod aware;
mod kinds;
mod loading;
mod record;
mod slots;

#[cfg(test)]
pub(crate) mod testutil;

pub use aware::{INVALID_ATTR, LOADING_ATTR, register};
pub use loading::{join_in_flight, load_while, push_loading};
pub use record::{RecordScope, index_errors};
pub use slots::{SlotScope, slot_group};
