#![forbid(unsafe_code)]

//! Change-tracking and event primitives.
//!
//! - [`Observable`]: a shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks. Used for continuously changing
//!   state such as the visible keyboard height.
//! - [`Signal`]: a value-less publish point. Every `emit` reaches every live
//!   subscriber, equal or not. Used for discrete lifecycle events.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! Both primitives use `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` function pointers; the
//! strong reference lives in the [`Subscription`] guard. Dead entries are
//! cleaned up lazily during notification and registration.
//!
//! Callbacks always run with no internal borrow held, so a callback may
//! subscribe, drop subscriptions, or set the value that triggered it.
//!
//! # Invariants
//!
//! 1. `Observable` version increments exactly once per mutation that
//!    changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting an `Observable` to a value equal to the current one is a
//!    no-op (no version bump, no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.

mod observable;
mod signal;
mod subscribers;

pub use observable::Observable;
pub use signal::Signal;
pub use subscribers::Subscription;
