//! Shared test fixtures.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{Callback, Emitter, EventArgs, Source};

use crate::tracker::{set_transport, Dispatch, Transport};

/// A transport that queues dispatches for the test to resolve by hand.
pub struct QueueTransport {
    queue: RefCell<Vec<Dispatch>>,
}

impl QueueTransport {
    /// Build one and install it as this thread's transport.
    pub fn install() -> Rc<Self> {
        let transport = Rc::new(Self { queue: RefCell::new(Vec::new()) });
        set_transport(Rc::clone(&transport) as Rc<dyn Transport>);
        transport
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Resolve the oldest dispatch successfully.
    pub fn succeed_next(&self, reply: EventArgs) {
        let dispatch = self.queue.borrow_mut().remove(0);
        (dispatch.success)(&reply);
    }

    /// Resolve the oldest dispatch with an error.
    pub fn fail_next(&self, reply: EventArgs) {
        let dispatch = self.queue.borrow_mut().remove(0);
        (dispatch.error)(&reply);
    }
}

impl Transport for QueueTransport {
    fn dispatch(&self, request: Dispatch) {
        self.queue.borrow_mut().push(request);
    }
}

pub fn emitter_source() -> (Source, Rc<Emitter>) {
    let emitter = Rc::new(Emitter::new());
    (Source::wrap(Rc::clone(&emitter)), emitter)
}

/// Ordered label log plus a factory producing callbacks that append one
/// label per invocation.
pub fn log_probe() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> Callback) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let factory = {
        let log = Rc::clone(&log);
        move |label: &'static str| -> Callback {
            let log = Rc::clone(&log);
            Rc::new(move |_: &EventArgs| log.borrow_mut().push(label.to_string()))
        }
    };
    (log, factory)
}
