//! Reference-counted tracking of asynchronous activity.
//!
//! [`begin`] wraps one outgoing async operation in an [`ActivityContext`]
//! that observers watch for its terminal transition. The context joins the
//! owning source's activity multiset before the transport sees the call
//! and leaves it on completion, so `activity:settled` fires exactly once
//! when the last concurrent operation drains. Forwarding mirrors one
//! object's activity onto another, and a process-wide bus sees every begun
//! activity for window-scoped aggregation.
//!
//! # Architecture
//!
//! - [`ActivityContext`]: the `Pending → Succeeded | Failed | Aborted`
//!   state machine, with interceptable `before-send` / `after-send`
//!   notifications.
//! - tracker: per-source multisets, [`begin`], [`in_flight`], the
//!   [`Transport`] seam, and the process bus.
//! - forwarding: reference-counted `(source, dest, filter)` rules with
//!   RAII teardown.
//!
//! # Invariants
//!
//! 1. State transitions are one-way; a terminal context ignores every
//!    later reply, completion, and abort.
//! 2. A context is registered before its announcements fire and before
//!    the transport dispatches, so [`in_flight`] never misses a pending
//!    operation.
//! 3. `activity:settled` fires exactly once per drain, when a multiset
//!    goes from occupied to empty.
//! 4. Forwarded copies transition with their origin; per event, the
//!    origin notifies first, then its copies in creation order.

#![forbid(unsafe_code)]

mod context;
mod forward;
mod tracker;
#[cfg(test)]
mod testutil;

pub use context::{ActivityContext, ActivityOptions, ActivityState};
pub use forward::{forward, forward_scoped, forward_while, unforward, ForwardGuard};
pub use tracker::{
    activity_bus, begin, in_flight, reset_activity, set_transport, Dispatch, Transport,
};
