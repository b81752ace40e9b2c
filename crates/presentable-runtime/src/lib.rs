#![forbid(unsafe_code)]

//! Reactive primitives shared by the presentable overlay stack.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and assumes the
//! UI-thread affinity of its callers.

pub mod reactive;

pub use reactive::{Observable, Signal, Subscription};
