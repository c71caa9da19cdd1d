//! Built-in descriptor kinds.
//!
//! | Kind | Path | Target |
//! |------|------|--------|
//! | `self` | `{event}` | the component's own events |
//! | `bus` | `{event}` | the process-wide [`bus`](crate::bus) |
//! | `attr` | `{name}:{event}` | attribute-supplied object, rebinds on identity change |
//! | `ref` | `{name}:{event}` | named sibling component, rebinds on identity change |
//! | `interval` | `{ms}` | repeating timer while mounted |
//! | `active-interval` | `{ms}` | repeating timer, skipped while the host is hidden |

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use weft_core::{Callback, EventArgs, Scope, TimerId};

use crate::listen::{Target, listeners};
use crate::router::{Handler, HandlerRegistry, HandlerRequest};
use crate::EventsError;

static GROUP_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_group() -> String {
    format!("events:{}", GROUP_SEQ.fetch_add(1, Ordering::Relaxed))
}

fn bad(req: &HandlerRequest, reason: &'static str) -> EventsError {
    EventsError::BadDescriptor { key: format!("{}:{}", req.kind, req.path), reason }
}

// ---------------------------------------------------------------------------
// Source-backed kinds
// ---------------------------------------------------------------------------

/// Handler backed by a grouped listener-set entry; activation and staleness
/// run through the set so these bindings share the mount lifecycle with
/// plain `listen` calls.
pub struct ListenHandler {
    group: String,
    target: Target,
    event: String,
    callback: Callback,
}

impl ListenHandler {
    #[must_use]
    pub fn new(target: Target, event: &str, callback: Callback) -> Self {
        Self { group: next_group(), target, event: event.to_string(), callback }
    }
}

impl Handler for ListenHandler {
    fn initialize(&self, scope: &Scope) {
        listeners(scope).listen_grouped(
            &self.group,
            self.target.clone(),
            &self.event,
            Rc::clone(&self.callback),
            false,
        );
    }

    fn on(&self, scope: &Scope) {
        listeners(scope).bind_group(&self.group);
    }

    fn off(&self, scope: &Scope) {
        listeners(scope).unbind_group(&self.group);
    }

    fn is_stale(&self, scope: &Scope) -> bool {
        listeners(scope).group_is_stale(&self.group)
    }
}

fn name_and_event(req: &HandlerRequest) -> Result<(&str, &str), EventsError> {
    match req.path.split_once(':') {
        Some((name, event)) if !name.is_empty() && !event.is_empty() => Ok((name, event)),
        _ => Err(bad(req, "expected `{name}:{event}`")),
    }
}

// ---------------------------------------------------------------------------
// Interval kinds
// ---------------------------------------------------------------------------

struct IntervalHandler {
    ms: u64,
    active_only: bool,
    callback: Callback,
    timer: Cell<Option<TimerId>>,
}

impl Handler for IntervalHandler {
    fn on(&self, scope: &Scope) {
        if self.timer.get().is_some() {
            return;
        }
        let callback = Rc::clone(&self.callback);
        let active_only = self.active_only;
        let tick = scope.task(move |scope| {
            if active_only && !scope.host().is_visible() {
                return;
            }
            callback(&EventArgs::EMPTY);
        });
        self.timer.set(Some(scope.scheduler().schedule_repeating(self.ms, tick)));
    }

    fn off(&self, scope: &Scope) {
        if let Some(timer) = self.timer.take() {
            scope.scheduler().cancel(timer);
        }
    }
}

fn interval_ms(req: &HandlerRequest) -> Result<u64, EventsError> {
    req.path.parse::<u64>().map_err(|_| bad(req, "expected a period in ms"))
}

// ---------------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------------

pub(crate) fn install(table: &mut HandlerRegistry) {
    table.handle("self", |scope, req| {
        if req.path.is_empty() {
            return Err(bad(req, "expected an event name"));
        }
        Ok(Rc::new(ListenHandler::new(
            Target::own(scope),
            &req.path,
            Rc::clone(&req.callback),
        )))
    });

    table.handle("bus", |_scope, req| {
        if req.path.is_empty() {
            return Err(bad(req, "expected an event name"));
        }
        Ok(Rc::new(ListenHandler::new(
            Target::Fixed(crate::bus()),
            &req.path,
            Rc::clone(&req.callback),
        )))
    });

    table.handle("attr", |scope, req| {
        let (name, event) = name_and_event(req)?;
        Ok(Rc::new(ListenHandler::new(
            Target::attribute(scope, name),
            event,
            Rc::clone(&req.callback),
        )))
    });

    table.handle("ref", |scope, req| {
        let (name, event) = name_and_event(req)?;
        Ok(Rc::new(ListenHandler::new(
            Target::sibling(scope, name),
            event,
            Rc::clone(&req.callback),
        )))
    });

    table.handle("interval", |_scope, req| {
        Ok(Rc::new(IntervalHandler {
            ms: interval_ms(req)?,
            active_only: false,
            callback: Rc::clone(&req.callback),
            timer: Cell::new(None),
        }))
    });

    table.handle("active-interval", |_scope, req| {
        Ok(Rc::new(IntervalHandler {
            ms: interval_ms(req)?,
            active_only: true,
            callback: Rc::clone(&req.callback),
            timer: Cell::new(None),
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scope_with;

    fn request(kind: &str, path: &str) -> HandlerRequest {
        HandlerRequest {
            kind: kind.to_string(),
            path: path.to_string(),
            callback: Rc::new(|_: &EventArgs| {}),
        }
    }

    #[test]
    fn malformed_paths_are_rejected_per_kind() {
        let (scope, _host) = scope_with(&[]);
        let table = HandlerRegistry::with_builtins();
        let cases = [
            ("self", ""),
            ("bus", ""),
            ("attr", "feed"),
            ("attr", ":change"),
            ("ref", "toolbar:"),
            ("interval", "soon"),
            ("active-interval", ""),
        ];
        for (kind, path) in cases {
            let req = request(kind, path);
            let factory = table.lookup(kind).unwrap();
            let err = factory(&scope, &req).err().unwrap();
            assert!(
                matches!(err, EventsError::BadDescriptor { .. }),
                "kind {kind} path {path:?} should be rejected"
            );
        }
    }
}
