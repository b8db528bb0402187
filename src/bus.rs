//! Typed publish/subscribe event bus.
//!
//! Handlers for a given bus run in registration order, and the handler list
//! is snapshotted before each dispatch pass: handlers added or removed while
//! an event is being delivered do not take part in (or drop out of) the pass
//! that is already underway.

use std::cell::RefCell;
use std::rc::Rc;

type Handler<E> = Rc<RefCell<dyn FnMut(&E)>>;

/// Identifies one subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub struct EventBus<E> {
    handlers: Rc<RefCell<Vec<(u64, Handler<E>)>>>,
    next_id: Rc<RefCell<u64>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        EventBus {
            handlers: Rc::clone(&self.handlers),
            next_id: Rc::clone(&self.next_id),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        EventBus {
            handlers: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    pub fn subscribe(&self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let mut next = self.next_id.borrow_mut();
        let id = *next;
        *next += 1;
        self.handlers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(handler))));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.borrow_mut().retain(|(h, _)| *h != id.0);
    }

    /// Deliver `event` to every handler registered at the time of the call.
    pub fn emit(&self, event: &E) {
        // Snapshot so reentrant subscribe/unsubscribe cannot perturb this pass.
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            (handler.borrow_mut())(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}
