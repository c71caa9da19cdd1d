//! `model` and `collection` descriptor kinds.
//!
//! | Kind | Path | Target |
//! |------|------|--------|
//! | `model` | `{event}` | the model family's primary slot |
//! | `model[name]` | `{event}` | the named slot |
//! | `collection` | `{event}` | the collection family's primary slot |
//! | `collection[name]` | `{event}` | the named slot |
//!
//! Targets resolve through the slot's snapshot, so a handler installed
//! before the slot has a source binds as soon as one appears, and the
//! router's staleness pass moves the binding after a slot transfer.

use std::rc::Rc;

use weft_events::{EventsError, HandlerRegistry, ListenHandler};

use crate::aware::FAMILIES;
use crate::slots;

fn bracket_slot<'k>(kind: &'k str, family: &str) -> Option<&'k str> {
    kind.strip_prefix(family)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|slot| !slot.is_empty())
}

fn missing_event(kind: &str) -> EventsError {
    EventsError::BadDescriptor { key: format!("{kind}:"), reason: "expected an event name" }
}

pub(crate) fn install(table: &mut HandlerRegistry) {
    for family in FAMILIES {
        table.handle(family, move |scope, req| {
            if req.path.is_empty() {
                return Err(missing_event(&req.kind));
            }
            let slot = slots::family_slots(scope, family).remove(0);
            Ok(Rc::new(ListenHandler::new(
                slots::slot_target(scope, &slot),
                &req.path,
                Rc::clone(&req.callback),
            )))
        });
    }

    table.handle_pattern(
        |kind| FAMILIES.iter().any(|family| bracket_slot(kind, family).is_some()),
        |scope, req| {
            if req.path.is_empty() {
                return Err(missing_event(&req.kind));
            }
            let slot = FAMILIES
                .iter()
                .find_map(|family| bracket_slot(&req.kind, family))
                .ok_or_else(|| EventsError::UnhandledKind { kind: req.kind.clone() })?;
            Ok(Rc::new(ListenHandler::new(
                slots::slot_target(scope, slot),
                &req.path,
                Rc::clone(&req.callback),
            )))
        },
    );
}

// ---------------------------------------------------------------------------
