#![forbid(unsafe_code)]

//! Deterministic test fixtures for weft components.
//!
//! Everything a component reaches through the capability seams has a
//! scripted double here: a recording [`TestHost`], a manually advanced
//! [`TestClock`], a [`ScriptedTransport`] that queues outgoing activity
//! until the test replies, and in-memory observables ([`TestModel`],
//! [`TestCollection`]) carrying the fetch bookkeeping the binding traits
//! expect. The [`strategies`] module adds proptest generators for the two
//! string grammars (descriptor keys, trait references).
//!
//! # Architecture
//!
//! - [`TestHost`] / [`TestClock`] stand in for `Host` and `Scheduler`;
//!   the test drives lifecycle (`mount`, `update`, `unmount`, `remount`)
//!   and time (`advance`) by hand.
//! - [`ScriptedTransport`] stands in for `Transport`; dispatches queue in
//!   order and resolve through `succeed_next` / `fail_next`.
//! - [`TestModel`] / [`TestCollection`] implement `Observed` (the model
//!   also `Record`) over plain attribute maps and item vectors, firing
//!   the conventional `change` / `add` / `remove` / `reset` / `sort` /
//!   `invalid` events.
//!
//! # Invariants
//!
//! 1. Nothing here touches wall-clock time or real I/O; a test's outcome
//!    is a pure function of the calls it scripts.
//! 2. Timers fire in due order while [`TestClock::advance`] runs, with
//!    the first-registered timer winning ties.
//! 3. Transport replies resolve the oldest dispatch first and complete
//!    each activity at most once.

mod data;
mod host;
mod transport;

pub mod strategies;

pub use data::{TestCollection, TestModel};
pub use host::{TestClock, TestHost};
pub use transport::ScriptedTransport;
