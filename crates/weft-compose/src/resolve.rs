//! Depth-first expansion of trait requests into an installation sequence.
//!
//! One [`Expansion`] lives for one top-level resolution: it owns the visited
//! set (keyed by canonical trait name), the in-progress stack used for cycle
//! detection, and the argument lists collected for shared factories. Shared
//! factories reserve a placeholder slot at their first request and are
//! invoked exactly once during the finalize pass, with every argument list
//! the whole expansion contributed.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::registry::{BodyKind, Registry};
use crate::traitref::{ArgList, TraitRef};
use crate::{Composable, ComposeError};

/// One entry in a composition request: a name to parse, a parsed reference,
/// a concrete body, or a nested list (flattened in order).
pub enum Request<B> {
    /// Call-string form, parsed during resolution.
    Name(String),
    /// Already-parsed reference.
    Ref(TraitRef),
    /// Concrete structural body, spliced after its own declared dependencies.
    Body(B),
    /// Nested request list, flattened in order.
    List(Vec<Request<B>>),
}

impl<B> From<&str> for Request<B> {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl<B> From<String> for Request<B> {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl<B> From<TraitRef> for Request<B> {
    fn from(r: TraitRef) -> Self {
        Self::Ref(r)
    }
}

impl<B> From<Vec<Request<B>>> for Request<B> {
    fn from(list: Vec<Request<B>>) -> Self {
        Self::List(list)
    }
}

enum Slot<B> {
    Body(B),
    Pending { name: String, factory: Rc<dyn Fn(&[ArgList]) -> B> },
}

struct Expansion<'r, B> {
    reg: &'r Registry<B>,
    out: Vec<Slot<B>>,
    visited: AHashSet<String>,
    stack: Vec<String>,
    shared_args: AHashMap<String, Vec<ArgList>>,
}

impl<B: Clone + Composable> Registry<B> {
    /// Expand `requests` into the ordered, deduplicated installation list.
    ///
    /// Guarantees on success: every trait's dependencies (declared, injected,
    /// and structural) appear strictly before it, and no trait name is
    /// installed twice — a shared factory appears exactly once, invoked with
    /// the merge of every argument list requested for it.
    pub fn resolve(&self, requests: &[Request<B>]) -> Result<Vec<B>, ComposeError> {
        let mut exp = Expansion {
            reg: self,
            out: Vec::new(),
            visited: AHashSet::new(),
            stack: Vec::new(),
            shared_args: AHashMap::new(),
        };
        for req in requests {
            exp.push_request(req)?;
        }
        let installed = exp.finalize();
        tracing::debug!(requested = requests.len(), installed = installed.len(), "composition resolved");
        Ok(installed)
    }

    /// [`resolve`](Self::resolve) for a plain list of call-strings.
    pub fn resolve_named(&self, names: &[&str]) -> Result<Vec<B>, ComposeError> {
        let requests: Vec<Request<B>> =
            names.iter().map(|n| Request::Name((*n).to_string())).collect();
        self.resolve(&requests)
    }
}

impl<B: Clone + Composable> Expansion<'_, B> {
    fn push_request(&mut self, req: &Request<B>) -> Result<(), ComposeError> {
        match req {
            Request::List(items) => {
                for item in items {
                    self.push_request(item)?;
                }
                Ok(())
            }
            Request::Name(s) => {
                let r = TraitRef::parse(s)?;
                self.push_ref(&r)
            }
            Request::Ref(r) => self.push_ref(r),
            Request::Body(b) => self.push_structural(b.clone()),
        }
    }

    fn push_ref(&mut self, tr: &TraitRef) -> Result<(), ComposeError> {
        let reg = self.reg;
        let def = match reg.defs.get(tr.name()) {
            Some(def) => Rc::clone(def),
            None => return Err(ComposeError::UnknownTrait { name: tr.name().to_string() }),
        };
        let canon = def.name.clone();

        if !tr.args().is_empty()
            && matches!(def.body, BodyKind::Value(_) | BodyKind::Group)
        {
            return Err(ComposeError::UnsupportedParameters { name: canon });
        }

        if self.visited.contains(&canon) {
            // Later requests for a shared factory still contribute their
            // argument lists; everything else is simply already installed.
            if matches!(def.body, BodyKind::Shared(_)) && !tr.args().is_empty() {
                self.shared_args.entry(canon).or_default().push(tr.args().to_vec());
            }
            return Ok(());
        }

        if self.stack.contains(&canon) {
            let mut chain = self.stack.clone();
            chain.push(canon);
            return Err(ComposeError::CyclicDependency { chain });
        }
        self.stack.push(canon.clone());

        for dep in &def.deps {
            self.push_ref(dep)?;
        }
        if let Some(extra) = reg.injected.get(&canon) {
            for dep in extra {
                self.push_ref(dep)?;
            }
        }

        match &def.body {
            BodyKind::Group => {
                self.visited.insert(canon);
            }
            BodyKind::Value(body) => {
                self.visited.insert(canon);
                // The body's own dependency annotation materializes here,
                // after registry deps and injections.
                self.push_structural(body.clone())?;
            }
            BodyKind::Factory(factory) => {
                // Visited before recursing, so a factory result may refer
                // back to its own name without looping.
                self.visited.insert(canon);
                let body = factory(tr.args());
                self.push_structural(body)?;
            }
            BodyKind::Shared(factory) => {
                self.visited.insert(canon.clone());
                if !tr.args().is_empty() {
                    self.shared_args
                        .entry(canon.clone())
                        .or_default()
                        .push(tr.args().to_vec());
                }
                self.out.push(Slot::Pending { name: canon, factory: Rc::clone(factory) });
            }
        }

        self.stack.pop();
        Ok(())
    }

    fn push_structural(&mut self, body: B) -> Result<(), ComposeError> {
        let deps = body.dependencies().to_vec();
        for dep in &deps {
            self.push_ref(dep)?;
        }
        self.out.push(Slot::Body(body));
        Ok(())
    }

    fn finalize(mut self) -> Vec<B> {
        let mut installed = Vec::with_capacity(self.out.len());
        for slot in self.out {
            match slot {
                Slot::Body(b) => installed.push(b),
                Slot::Pending { name, factory } => {
                    let lists = self.shared_args.remove(&name).unwrap_or_default();
                    tracing::trace!(name, lists = lists.len(), "shared trait instantiated");
                    installed.push(factory(&lists));
                }
            }
        }
        installed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
