//! Built-in descriptor modifiers: `*name(args)->` callback wrappers.
//!
//! | Modifier | Effect |
//! |----------|--------|
//! | `throttle(ms)` | leading-edge invoke, trailing invoke with the latest payload |
//! | `debounce(ms)` | invoke once, `ms` after the burst goes quiet |
//! | `delay(ms)` | every invoke runs `ms` later |
//! | `defer` | every invoke runs on the next timer turn |
//! | `once` | at most one invoke, ever |
//! | `after(n)` | invokes from the `n`th call on |
//! | `before(n)` | invokes while called fewer than `n` times |

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use web_time::Instant;
use weft_compose::Arg;
use weft_core::{Callback, EventArgs, Scope, TimerId};

use crate::router::ModifierFactory;
use crate::EventsError;

pub(crate) fn builtins() -> AHashMap<String, ModifierFactory> {
    let mut table: AHashMap<String, ModifierFactory> = AHashMap::new();
    table.insert("throttle".into(), Rc::new(throttle));
    table.insert("debounce".into(), Rc::new(debounce));
    table.insert("delay".into(), Rc::new(delay));
    table.insert("defer".into(), Rc::new(defer));
    table.insert("once".into(), Rc::new(once));
    table.insert("after".into(), Rc::new(after));
    table.insert("before".into(), Rc::new(before));
    table
}

fn ms_arg(name: &'static str, args: &[Arg]) -> Result<u64, EventsError> {
    args.first()
        .and_then(Arg::as_i64)
        .and_then(|ms| u64::try_from(ms).ok())
        .ok_or(EventsError::BadModifierArgs { name, expected: "a delay in ms" })
}

fn count_arg(name: &'static str, args: &[Arg]) -> Result<u64, EventsError> {
    args.first()
        .and_then(Arg::as_i64)
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or(EventsError::BadModifierArgs { name, expected: "a positive call count" })
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

fn throttle(scope: &Scope, args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let ms = ms_arg("throttle", args)?;
    let scheduler = Rc::clone(scope.scheduler());
    let last_fire: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
    let trailing: Rc<RefCell<Option<EventArgs>>> = Rc::new(RefCell::new(None));
    let armed = Rc::new(Cell::new(false));
    Ok(Rc::new(move |event_args: &EventArgs| {
        let now = Instant::now();
        let elapsed = last_fire.get().map_or(u64::MAX, |t| {
            u64::try_from(now.duration_since(t).as_millis()).unwrap_or(u64::MAX)
        });
        if elapsed >= ms && !armed.get() {
            last_fire.set(Some(now));
            inner(event_args);
            return;
        }
        // Inside the window: remember the payload, arm one trailing fire.
        *trailing.borrow_mut() = Some(event_args.clone());
        if armed.replace(true) {
            return;
        }
        let fire = {
            let inner = Rc::clone(&inner);
            let last_fire = Rc::clone(&last_fire);
            let trailing = Rc::clone(&trailing);
            let armed = Rc::clone(&armed);
            Rc::new(move || {
                armed.set(false);
                if let Some(args) = trailing.borrow_mut().take() {
                    last_fire.set(Some(Instant::now()));
                    inner(&args);
                }
            })
        };
        scheduler.schedule(ms.saturating_sub(elapsed).max(1), fire);
    }))
}

fn debounce(scope: &Scope, args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let ms = ms_arg("debounce", args)?;
    let scheduler = Rc::clone(scope.scheduler());
    let pending: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
    let latest: Rc<RefCell<Option<EventArgs>>> = Rc::new(RefCell::new(None));
    Ok(Rc::new(move |event_args: &EventArgs| {
        *latest.borrow_mut() = Some(event_args.clone());
        if let Some(timer) = pending.take() {
            scheduler.cancel(timer);
        }
        let fire = {
            let inner = Rc::clone(&inner);
            let pending = Rc::clone(&pending);
            let latest = Rc::clone(&latest);
            Rc::new(move || {
                pending.set(None);
                if let Some(args) = latest.borrow_mut().take() {
                    inner(&args);
                }
            })
        };
        pending.set(Some(scheduler.schedule(ms, fire)));
    }))
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

fn delay(scope: &Scope, args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let ms = ms_arg("delay", args)?;
    let scheduler = Rc::clone(scope.scheduler());
    Ok(Rc::new(move |event_args: &EventArgs| {
        let inner = Rc::clone(&inner);
        let args = event_args.clone();
        scheduler.schedule(ms, Rc::new(move || inner(&args)));
    }))
}

fn defer(scope: &Scope, _args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let scheduler = Rc::clone(scope.scheduler());
    Ok(Rc::new(move |event_args: &EventArgs| {
        let inner = Rc::clone(&inner);
        let args = event_args.clone();
        scheduler.schedule(0, Rc::new(move || inner(&args)));
    }))
}

// ---------------------------------------------------------------------------
// Call counting
// ---------------------------------------------------------------------------

fn once(_scope: &Scope, _args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let fired = Cell::new(false);
    Ok(Rc::new(move |event_args: &EventArgs| {
        if !fired.replace(true) {
            inner(event_args);
        }
    }))
}

fn after(_scope: &Scope, args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let threshold = count_arg("after", args)?;
    let calls = Cell::new(0u64);
    Ok(Rc::new(move |event_args: &EventArgs| {
        calls.set(calls.get() + 1);
        if calls.get() >= threshold {
            inner(event_args);
        }
    }))
}

fn before(_scope: &Scope, args: &[Arg], inner: Callback) -> Result<Callback, EventsError> {
    let threshold = count_arg("before", args)?;
    let calls = Cell::new(0u64);
    Ok(Rc::new(move |event_args: &EventArgs| {
        calls.set(calls.get() + 1);
        if calls.get() < threshold {
            inner(event_args);
        }
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
