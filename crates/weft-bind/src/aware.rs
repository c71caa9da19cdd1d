//! Family trait packs: for each data-source family (`model`, `collection`)
//! a base `-aware` trait that tracks slots, plus derived traits that route
//! slot events into renders, loading state, and validation state.
//!
//! Every derived trait sits on `{family}-events`, an empty anchor pulling in
//! `{family}-aware` and `listen`, so any mix of them shares one slot table
//! and one listener set:
//!
//! - `{family}-change-aware`: mutation events request one coalesced deferred
//!   render, unless the notification is flagged as an echo.
//! - `{family}-activity-aware`: announced activities drive the `loading`
//!   state attribute, and activities already in flight are joined at mount.
//! - `{family}-load-on` / `{family}-update-on`: method-filtered loading and
//!   refresh; filters come from trait arguments plus the `load-on` /
//!   `update-on` attributes, read when the activity fires.
//! - `{family}-invalid-aware`: validation failures land in the `invalid`
//!   state attribute; later field changes clear the errors they resolve.
//!
//! `change-aware` and `activity-aware` are aliases covering both families.

use weft_activity::ActivityContext;
use weft_compose::{ArgList, ComposeError, Registry};
use weft_core::{Behavior, Scope, Value};

use crate::kinds;
use crate::loading;
use crate::record;
use crate::slots::{self, SlotScope};

pub(crate) const FAMILIES: [&str; 2] = ["model", "collection"];

/// State attribute driven by the activity-aware traits.
pub const LOADING_ATTR: &str = "loading";

/// State attribute driven by `{family}-invalid-aware`.
pub const INVALID_ATTR: &str = "invalid";

// ---------------------------------------------------------------------------
// Slot tracking
// ---------------------------------------------------------------------------

fn slot_names(family: &str, lists: &[ArgList]) -> Vec<String> {
    let mut names = Vec::new();
    for list in lists {
        for arg in list {
            let name = arg.to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    if names.is_empty() {
        names.push(family.to_string());
    }
    names
}

/// The base tracking trait for one family. Shared across all requests in a
/// composition: every requested slot name is tracked, defaulting to the
/// family name itself, and the tracked set is re-synced before mount and
/// before every update pass.
fn aware_trait(family: &'static str, lists: &[ArgList]) -> Behavior {
    let names = slot_names(family, lists);
    Behavior::new()
        .on_init(move |scope| {
            slots::slot_table(scope).register_family(family, &names);
            for name in &names {
                scope.track_slot(name);
            }
            Ok(())
        })
        .on_will_mount(|scope| slots::sync_all(scope, None))
        .on_will_update(|scope, next| slots::sync_all(scope, Some(next)))
}

// ---------------------------------------------------------------------------
// Change routing
// ---------------------------------------------------------------------------

fn change_class(family: &str) -> &'static [&'static str] {
    match family {
        "collection" => &["add", "remove", "reset", "sort"],
        _ => &["change"],
    }
}

/// Mutation events on any tracked slot request one coalesced deferred
/// render. Echo notifications (a two-way edit already reflected in the UI)
/// are suppressed.
fn change_aware_trait(family: &'static str) -> Behavior {
    Behavior::new().on_init(move |scope| {
        for slot in slots::family_slots(scope, family) {
            for event in change_class(family) {
                scope.slot_on(
                    &slot,
                    event,
                    scope.callback(|scope, args| {
                        if !args.is_echo() {
                            scope.defer_update();
                        }
                    }),
                );
            }
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Activity routing
// ---------------------------------------------------------------------------

/// Any activity announced by a tracked slot drives the `loading` state
/// attribute; activities already in flight when the component mounts are
/// joined so late subscribers report them too.
fn activity_aware_trait(family: &'static str) -> Behavior {
    Behavior::new()
        .on_init(move |scope| {
            for slot in slots::family_slots(scope, family) {
                scope.slot_on(
                    &slot,
                    "activity",
                    scope.callback(|scope, args| {
                        if let Some(context) = ActivityContext::from_args(args) {
                            loading::push_loading(scope, &context, LOADING_ATTR);
                        }
                    }),
                );
            }
            Ok(())
        })
        .on_did_mount(move |scope| {
            for slot in slots::family_slots(scope, family) {
                if let Some(source) = scope.slot(&slot) {
                    loading::join_in_flight(scope, &source, None, LOADING_ATTR);
                }
            }
        })
}

/// Comma-separated names in a text attribute, trimmed, empties dropped.
fn attribute_list(scope: &Scope, name: &str) -> Vec<String> {
    scope
        .attribute(name)
        .and_then(|value| value.as_str().map(str::to_string))
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn method_enabled(scope: &Scope, attr: &str, fixed: &[String], method: &str) -> bool {
    if fixed.iter().any(|name| name == method) {
        return true;
    }
    attribute_list(scope, attr).iter().any(|name| name == method)
}

fn method_names(lists: &[ArgList]) -> Vec<String> {
    let mut names = Vec::new();
    for list in lists {
        for arg in list {
            let name = arg.to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Like the activity-aware trait but filtered: only activities whose method
/// matches a trait argument or the `load-on` attribute touch `loading`.
fn load_on_trait(family: &'static str, lists: &[ArgList]) -> Behavior {
    let methods = method_names(lists);
    Behavior::new().on_init(move |scope| {
        for slot in slots::family_slots(scope, family) {
            let methods = methods.clone();
            scope.slot_on(
                &slot,
                "activity",
                scope.callback(move |scope, args| {
                    let Some(context) = ActivityContext::from_args(args) else {
                        return;
                    };
                    if method_enabled(scope, "load-on", &methods, context.method()) {
                        loading::push_loading(scope, &context, LOADING_ATTR);
                    }
                }),
            );
        }
        Ok(())
    })
}

/// Refresh on completion: when a matching activity settles, request one
/// coalesced deferred render. Filters work like `{family}-load-on`, against
/// trait arguments and the `update-on` attribute.
fn update_on_trait(family: &'static str, lists: &[ArgList]) -> Behavior {
    let methods = method_names(lists);
    Behavior::new().on_init(move |scope| {
        for slot in slots::family_slots(scope, family) {
            let methods = methods.clone();
            scope.slot_on(
                &slot,
                "activity",
                scope.callback(move |scope, args| {
                    let Some(context) = ActivityContext::from_args(args) else {
                        return;
                    };
                    if !method_enabled(scope, "update-on", &methods, context.method()) {
                        return;
                    }
                    context.handle().once(
                        "complete",
                        scope.callback(|scope, _| scope.defer_update()),
                        None,
                    );
                }),
            );
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Validation routing
// ---------------------------------------------------------------------------

/// Validation failures on any tracked slot land in the `invalid` state
/// attribute as a structured error index. A later change notification
/// naming changed fields clears the errors those fields resolved.
fn invalid_aware_trait(family: &'static str) -> Behavior {
    Behavior::new().on_init(move |scope| {
        for slot in slots::family_slots(scope, family) {
            scope.slot_on(
                &slot,
                "invalid",
                scope.callback(|scope, args| {
                    if let Some(index) = record::index_errors(args) {
                        scope.set_state(INVALID_ATTR, Value::data(index));
                    }
                }),
            );
            scope.slot_on(
                &slot,
                "change",
                scope.callback(|scope, args| {
                    record::clear_resolved_errors(scope, INVALID_ATTR, args);
                }),
            );
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the family trait packs into `registry` and the `model` /
/// `collection` event kinds into this thread's kind table.
pub fn register(registry: &mut Registry<Behavior>) -> Result<(), ComposeError> {
    for family in FAMILIES {
        let aware = format!("{family}-aware");
        let events = format!("{family}-events");
        registry.add_shared(&aware, &[], move |lists| aware_trait(family, lists))?;
        registry.add(&events, &[&aware, "listen"], Behavior::new())?;
        registry.add(
            &format!("{family}-change-aware"),
            &[&events, "defer-update"],
            change_aware_trait(family),
        )?;
        registry.add(
            &format!("{family}-activity-aware"),
            &[&events],
            activity_aware_trait(family),
        )?;
        registry.add_shared(&format!("{family}-load-on"), &[&events], move |lists| {
            load_on_trait(family, lists)
        })?;
        registry.add_shared(&format!("{family}-update-on"), &[&events, "defer-update"], move |lists| {
            update_on_trait(family, lists)
        })?;
        registry.add(
            &format!("{family}-invalid-aware"),
            &[&events],
            invalid_aware_trait(family),
        )?;
    }
    registry.alias("change-aware", &["model-change-aware", "collection-change-aware"])?;
    registry.alias("activity-aware", &["model-activity-aware", "collection-activity-aware"])?;
    weft_events::with_event_kinds(kinds::install);
    Ok(())
}

// ---------------------------------------------------------------------------
