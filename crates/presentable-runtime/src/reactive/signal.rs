#![forbid(unsafe_code)]

//! Fire-and-forget event publisher.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::subscribers::{Subscribers, Subscription};

/// A multi-subscriber event stream.
///
/// Unlike [`Observable`](super::Observable), a `Signal` holds no value:
/// every [`emit`](Self::emit) reaches every live subscriber.
pub struct Signal<T> {
    subscribers: Rc<RefCell<Subscribers<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Subscribers::new())),
        }
    }

    /// Deliver `value` to every live subscriber in registration order.
    pub fn emit(&self, value: &T) {
        let callbacks = self.subscribers.borrow_mut().snapshot();
        for callback in callbacks {
            callback(value);
        }
    }

    /// Register an event callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.subscribers.borrow_mut().add(callback)
    }

    /// Number of subscriptions that are still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().live_count()
    }
}
