#![forbid(unsafe_code)]

//! Lifecycle event fan-out for presentation targets.
//!
//! Each target owns one [`PresentationEvents`], which carries two channels:
//! an unbounded stream of subscribers and a single, weakly held
//! [`PresentationDelegate`]. Both receive every event, synchronously, stream
//! first.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use presentable_runtime::{Signal, Subscription};

use crate::target::Overlay;

/// A presentation lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationEvent {
    /// Fired before the surface is attached and animated in.
    WillPresent,
    /// Fired after the present transition completes.
    DidPresent,
    /// Fired before the surface is detached and animated out.
    WillDismiss,
}

/// Single-slot observer of one overlay's lifecycle.
pub trait PresentationDelegate {
    fn overlay_will_present(&self, _overlay: &Overlay) {}

    fn overlay_did_present(&self, _overlay: &Overlay) {}

    fn overlay_will_dismiss(&self, _overlay: &Overlay) {}
}

/// Event channels embedded in every [`PresentationTarget`](crate::PresentationTarget).
pub struct PresentationEvents {
    stream: Signal<PresentationEvent>,
    delegate: RefCell<Option<Weak<dyn PresentationDelegate>>>,
}

impl Default for PresentationEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PresentationEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationEvents")
            .field("subscribers", &self.stream.subscriber_count())
            .field("has_delegate", &self.has_delegate())
            .finish()
    }
}

impl PresentationEvents {
    pub fn new() -> Self {
        Self {
            stream: Signal::new(),
            delegate: RefCell::new(None),
        }
    }

    /// Subscribe to every lifecycle event. Drop the guard to unsubscribe.
    pub fn subscribe(&self, callback: impl Fn(&PresentationEvent) + 'static) -> Subscription {
        self.stream.subscribe(callback)
    }

    /// Install the delegate, replacing any previous one.
    ///
    /// Only a weak reference is kept; the caller owns the delegate.
    pub fn set_delegate<D: PresentationDelegate + 'static>(&self, delegate: &Rc<D>) {
        let weak = Rc::downgrade(delegate);
        let weak: Weak<dyn PresentationDelegate> = weak;
        *self.delegate.borrow_mut() = Some(weak);
    }

    pub fn clear_delegate(&self) {
        self.delegate.borrow_mut().take();
    }

    /// Whether a delegate is installed and still alive.
    pub fn has_delegate(&self) -> bool {
        self.delegate
            .borrow()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.stream.subscriber_count()
    }

    pub(crate) fn dispatch(&self, event: PresentationEvent, overlay: &Overlay) {
        self.stream.emit(&event);
        let delegate = self.delegate.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(delegate) = delegate {
            match event {
                PresentationEvent::WillPresent => delegate.overlay_will_present(overlay),
                PresentationEvent::DidPresent => delegate.overlay_did_present(overlay),
                PresentationEvent::WillDismiss => delegate.overlay_will_dismiss(overlay),
            }
        }
    }
}
