//! Reference-counted forwarding of one object's activity onto another.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashSet;
use weft_core::{Source, SourceId};

use crate::context::{ActivityContext, ActivityOptions};
use crate::tracker;

struct ForwardRule {
    source: Source,
    dest: Source,
    filter: Option<String>,
    count: Cell<usize>,
}

impl ForwardRule {
    fn matches_triple(&self, source: &Source, dest: &Source, filter: Option<&str>) -> bool {
        self.source.same(source) && self.dest.same(dest) && self.filter.as_deref() == filter
    }

    fn applies_to(&self, source: &Source, method: &str) -> bool {
        self.source.same(source) && self.filter.as_deref().is_none_or(|f| f == method)
    }
}

thread_local! {
    static RULES: RefCell<Vec<ForwardRule>> = const { RefCell::new(Vec::new()) };
}

/// Mirror every activity begun on `source` onto `dest`, optionally only
/// for the `filter` method. Reference-counted per `(source, dest, filter)`
/// triple; each call needs a matching [`unforward`].
pub fn forward(source: &Source, dest: &Source, filter: Option<&str>) {
    RULES.with(|rules| {
        let mut rules = rules.borrow_mut();
        if let Some(rule) = rules.iter().find(|r| r.matches_triple(source, dest, filter)) {
            rule.count.set(rule.count.get() + 1);
            return;
        }
        tracing::debug!(source = ?source.id(), dest = ?dest.id(), filter = ?filter, "forwarding activity");
        rules.push(ForwardRule {
            source: source.clone(),
            dest: dest.clone(),
            filter: filter.map(str::to_string),
            count: Cell::new(1),
        });
    });
}

/// Release one reference to a forwarding rule; the rule disappears with
/// the last reference. Unmatched calls are ignored.
pub fn unforward(source: &Source, dest: &Source, filter: Option<&str>) {
    RULES.with(|rules| {
        let mut rules = rules.borrow_mut();
        let Some(index) = rules.iter().position(|r| r.matches_triple(source, dest, filter))
        else {
            return;
        };
        if rules[index].count.get() > 1 {
            let count = &rules[index].count;
            count.set(count.get() - 1);
        } else {
            rules.remove(index);
        }
    });
}

/// RAII handle releasing one forwarding reference on drop.
pub struct ForwardGuard {
    source: Source,
    dest: Source,
    filter: Option<String>,
}

impl Drop for ForwardGuard {
    fn drop(&mut self) {
        unforward(&self.source, &self.dest, self.filter.as_deref());
    }
}

/// [`forward`] with RAII teardown.
#[must_use]
pub fn forward_scoped(source: &Source, dest: &Source, filter: Option<&str>) -> ForwardGuard {
    forward(source, dest, filter);
    ForwardGuard {
        source: source.clone(),
        dest: dest.clone(),
        filter: filter.map(str::to_string),
    }
}

/// Run `f` with forwarding in place; the rule reference is released on the
/// way out even if `f` panics.
pub fn forward_while<R>(
    source: &Source,
    dest: &Source,
    filter: Option<&str>,
    f: impl FnOnce() -> R,
) -> R {
    let _guard = forward_scoped(source, dest, filter);
    f()
}

/// Materialize linked copies of `origin` on every forward destination
/// reachable from `source`, announcing each on its destination. `visited`
/// keeps rule cycles from looping.
pub(crate) fn materialize(
    origin: &Rc<ActivityContext>,
    source: &Source,
    visited: &mut AHashSet<SourceId>,
) {
    let destinations: Vec<Source> = RULES.with(|rules| {
        rules
            .borrow()
            .iter()
            .filter(|rule| rule.applies_to(source, origin.method()))
            .map(|rule| rule.dest.clone())
            .collect()
    });
    for dest in destinations {
        if !visited.insert(dest.id()) {
            continue;
        }
        let copy = ActivityContext::new(origin.method(), dest.clone(), ActivityOptions::default());
        tracker::register(&copy);
        origin.link_forward(&copy);
        tracker::announce(&dest, &copy);
        materialize(&copy, &dest, visited);
    }
}

pub(crate) fn clear_rules() {
    RULES.with(|rules| rules.borrow_mut().clear());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
