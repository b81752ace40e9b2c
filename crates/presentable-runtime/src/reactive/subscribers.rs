#![forbid(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// RAII guard for a registered callback.
///
/// The guard owns the only strong reference to the callback. Dropping it
/// makes the subscriber list's weak entry dead, which is skipped and
/// pruned on the next notification or registration.
#[must_use = "dropping a Subscription immediately unsubscribes the callback"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl Subscription {
    fn new<T: 'static>(callback: Rc<dyn Fn(&T)>) -> Self {
        Self {
            _callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Subscriber callbacks in registration order.
pub(crate) struct Subscribers<T> {
    entries: Vec<Weak<dyn Fn(&T)>>,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.entries.retain(|entry| entry.strong_count() > 0);
        let strong: Rc<dyn Fn(&T)> = Rc::new(callback);
        self.entries.push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Upgrade every live callback, pruning the dead ones.
    ///
    /// The returned strong references keep callbacks alive for the current
    /// notification cycle only.
    pub(crate) fn snapshot(&mut self) -> Vec<Rc<dyn Fn(&T)>> {
        let mut live = Vec::with_capacity(self.entries.len());
        let before = self.entries.len();
        self.entries.retain(|entry| match entry.upgrade() {
            Some(callback) => {
                live.push(callback);
                true
            }
            None => false,
        });
        if self.entries.len() != before {
            tracing::trace!(
                pruned = before - self.entries.len(),
                "pruned dropped subscribers"
            );
        }
        live
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_prunes_dropped_entries() {
        let mut subscribers = Subscribers::<u32>::new();
        for _ in 0..100 {
            let guard = subscribers.add(|_| {});
            drop(guard);
        }
        assert!(subscribers.entries.len() <= 1);
        assert_eq!(subscribers.live_count(), 0);

        let _kept = subscribers.add(|_| {});
        assert_eq!(subscribers.entries.len(), 1);
        assert_eq!(subscribers.live_count(), 1);
    }
}
