//! Scripted stand-in for the `Transport` seam.

use std::cell::RefCell;
use std::rc::Rc;

use weft_activity::{Dispatch, Transport};
use weft_core::EventArgs;

/// Transport that queues every dispatch for the test to resolve by hand.
/// Replies always settle the oldest dispatch first.
///
/// The reply helpers panic when nothing is pending; a test that replies
/// blind has already lost track of its script.
pub struct ScriptedTransport {
    queue: RefCell<Vec<Dispatch>>,
}

impl ScriptedTransport {
    /// Build one and install it as this thread's transport.
    pub fn install() -> Rc<Self> {
        let transport = Rc::new(Self { queue: RefCell::new(Vec::new()) });
        weft_activity::set_transport(Rc::clone(&transport) as Rc<dyn Transport>);
        transport
    }

    /// Dispatches waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Method names of the waiting dispatches, oldest first.
    #[must_use]
    pub fn pending_methods(&self) -> Vec<String> {
        self.queue.borrow().iter().map(|d| d.method.clone()).collect()
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

impl Transport for ScriptedTransport {
    fn dispatch(&self, request: Dispatch) {
        tracing::trace!(method = request.method.as_str(), "dispatch queued");
        self.queue.borrow_mut().push(request);
    }
}
