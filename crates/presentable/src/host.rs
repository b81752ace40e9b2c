#![forbid(unsafe_code)]

//! Boundary between the presentation core and the view/window layer.
//!
//! [`HostEnvironment`] lists every call the core makes into rendering,
//! layout, and windowing territory. Nothing else in this crate touches a
//! view tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::navigator::WeakStack;
use crate::screen::Screen;
use crate::target::{KeyboardAnchor, Overlay};

/// Global counter for unique container IDs.
static CONTAINER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an overlay container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    pub(crate) fn next() -> Self {
        Self(CONTAINER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Animated geometry of an overlay relative to its resting frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Vertical offset as a fraction of the overlay's height.
    /// `0.0` rests in place; `1.0` sits entirely below the host's bottom edge.
    pub offset: f64,
    /// Uniform scale around the overlay's center.
    pub scale: f64,
}

impl Placement {
    /// Final, resting placement.
    pub const RESTING: Self = Self {
        offset: 0.0,
        scale: 1.0,
    };

    /// Fully below the host's bottom edge.
    pub const BELOW_EDGE: Self = Self {
        offset: 1.0,
        scale: 1.0,
    };

    pub const fn scaled(scale: f64) -> Self {
        Self { offset: 0.0, scale }
    }

    pub const fn offset(offset: f64) -> Self {
        Self { offset, scale: 1.0 }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::RESTING
    }
}

/// Outbound primitives supplied by the UI framework.
///
/// All calls happen on the UI thread. Implementations may call back into
/// the [`PresentationStack`](crate::PresentationStack) from inside any of
/// these methods; the stack never holds internal borrows across them.
pub trait HostEnvironment {
    /// Whether a root presenter exists to show the host context from.
    fn has_root(&self) -> bool;

    /// Begin showing the shared host context.
    ///
    /// Call [`HostCompletion::complete`] once it is on screen, either
    /// synchronously from inside this method or later.
    fn show_host(&self, done: HostCompletion);

    /// Close the shared host context.
    fn hide_host(&self);

    /// Resign the current first responder (dismisses the keyboard).
    fn resign_focus(&self);

    /// Add the overlay's surface to the container's surface.
    fn attach_surface(&self, container: ContainerId, overlay: &Overlay);

    /// Remove the overlay's surface from the hierarchy.
    fn remove_surface(&self, overlay: &Overlay);

    /// Whether the overlay's surface currently has a parent.
    fn is_attached(&self, overlay: &Overlay) -> bool;

    /// Apply an animation frame to the overlay.
    fn set_placement(&self, overlay: &Overlay, placement: Placement);

    /// Shift the overlay's anchor up by `offset` points for the keyboard.
    fn set_keyboard_offset(&self, overlay: &Overlay, anchor: KeyboardAnchor, offset: f32);

    /// Tint the container background black at `alpha`.
    fn set_background_alpha(&self, container: ContainerId, alpha: f32);

    /// Run a layout pass on the container.
    fn layout(&self, container: ContainerId);

    /// Push a screen container onto the host navigation history.
    fn push_container(&self, container: ContainerId, screen: &Screen);

    /// Pop the top of the host navigation history.
    fn pop_container(&self);

    /// Drop every pushed container from the host navigation history.
    fn clear_history(&self);
}

/// Single-use token reporting that the host context finished showing.
///
/// Consumed by [`complete`](Self::complete), so it can fire at most once.
#[must_use = "the host context never finishes materializing unless the completion is invoked"]
pub struct HostCompletion {
    stack: WeakStack,
}

impl HostCompletion {
    pub(crate) fn new(stack: WeakStack) -> Self {
        Self { stack }
    }

    /// Report completion; deferred presentation requests run from here.
    pub fn complete(self) {
        match self.stack.upgrade() {
            Some(stack) => stack.host_did_show(),
            None => tracing::trace!("stack dropped before host completion"),
        }
    }
}

impl fmt::Debug for HostCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCompletion").finish_non_exhaustive()
    }
}
