#![forbid(unsafe_code)]

//! Visible keyboard height stream.
//!
//! Measuring the keyboard is the platform's job; the platform feeds
//! heights in through [`KeyboardMonitor::set_visible_height`]. Containers
//! observe it for at most one overlay each.

use std::rc::Rc;

use presentable_runtime::{Observable, Subscription};

/// Shared, observable visible keyboard height in points.
#[derive(Debug, Clone, Default)]
pub struct KeyboardMonitor {
    height: Observable<f32>,
}

impl KeyboardMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new visible height. Negative values clamp to 0; non-finite
    /// values are ignored.
    pub fn set_visible_height(&self, height: f32) {
        if !height.is_finite() {
            tracing::trace!(height, "ignoring non-finite keyboard height");
            return;
        }
        self.height.set(height.max(0.0));
    }

    pub fn visible_height(&self) -> f32 {
        self.height.get()
    }

    /// Observe the height: `callback` runs once with the current height,
    /// then on every change until the guard is dropped.
    pub fn observe(&self, callback: impl Fn(f32) + 'static) -> Subscription {
        let callback = Rc::new(callback);
        let replay = Rc::clone(&callback);
        let subscription = self.height.subscribe(move |height| (*callback)(*height));
        (*replay)(self.visible_height());
        subscription
    }

    /// Number of live observations.
    pub fn observer_count(&self) -> usize {
        self.height.subscriber_count()
    }
}
