#![forbid(unsafe_code)]

//! Presentation target contract and the [`Overlay`] identity handle.
//!
//! A concrete overlay surface (sheet, popup, alert) implements
//! [`PresentationTarget`]. The stack never holds the implementation
//! directly; it holds an [`Overlay`] handle, which fixes the surface's
//! identity and transition style at construction time.
//!
//! # Defaults
//!
//! | Property | Default |
//! |----------|---------|
//! | `transition_type` | [`TransitionType::Center`] |
//! | `background_alpha` | [`DEFAULT_BACKGROUND_ALPHA`] (0.38) |
//! | `should_observe_keyboard` | `false` |
//! | `should_dismiss_on_background_tap` | `true` |

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::{PresentationEvent, PresentationEvents};
use crate::navigator::{PresentationStack, misuse};
use crate::screen::Screen;

/// Background dimming used when a target does not override it.
pub const DEFAULT_BACKGROUND_ALPHA: f32 = 0.38;

/// Global counter for unique overlay IDs.
static OVERLAY_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an overlay handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(u64);

impl OverlayId {
    fn next() -> Self {
        Self(OVERLAY_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// How an overlay enters and leaves the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransitionType {
    /// Slides up from the host's bottom edge (sheet).
    Bottom,
    /// Scales up from the center (popup).
    #[default]
    Center,
}

impl TransitionType {
    /// Which edge keyboard avoidance moves for this style.
    #[inline]
    pub const fn keyboard_anchor(self) -> KeyboardAnchor {
        match self {
            Self::Bottom => KeyboardAnchor::BottomEdge,
            Self::Center => KeyboardAnchor::VerticalCenter,
        }
    }
}

/// The constraint keyboard avoidance shifts upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardAnchor {
    /// The overlay's bottom edge, relative to the container's bottom.
    BottomEdge,
    /// The overlay's vertical center, relative to the container's center.
    VerticalCenter,
}

/// Capabilities a surface must expose to be presented as an overlay.
///
/// Hooks take `&self`: targets are shared through `Rc`, so any state a
/// hook mutates belongs in a `Cell`/`RefCell`.
pub trait PresentationTarget {
    /// Transition style. Read once, when the [`Overlay`] handle is created.
    fn transition_type(&self) -> TransitionType {
        TransitionType::Center
    }

    /// Whether this surface moves with the on-screen keyboard.
    fn should_observe_keyboard(&self) -> bool {
        false
    }

    /// Dimming this surface asks of its container, in `[0.0, 1.0]`.
    fn background_alpha(&self) -> f32 {
        DEFAULT_BACKGROUND_ALPHA
    }

    /// Whether a tap on the container background dismisses this surface.
    fn should_dismiss_on_background_tap(&self) -> bool {
        true
    }

    /// Event channels for this surface.
    fn events(&self) -> &PresentationEvents;

    /// Called before the surface is attached and animated in.
    fn will_present(&self) {}

    /// Called after the present transition completes.
    fn did_present(&self) {}

    /// Called before the surface is detached and animated out.
    fn will_dismiss(&self) {}
}

/// Cloneable identity handle for a presented surface.
///
/// Equality and hashing use the handle's [`OverlayId`]: clones of one
/// handle are the same overlay, two handles over equal targets are not.
#[derive(Clone)]
pub struct Overlay {
    id: OverlayId,
    transition: TransitionType,
    target: Rc<dyn PresentationTarget>,
}

impl Overlay {
    /// Wrap a target in a new overlay handle.
    pub fn new(target: impl PresentationTarget + 'static) -> Self {
        Self::from_rc(Rc::new(target))
    }

    /// Wrap an already shared target in a new overlay handle.
    pub fn from_rc(target: Rc<dyn PresentationTarget>) -> Self {
        Self {
            id: OverlayId::next(),
            transition: target.transition_type(),
            target,
        }
    }

    #[inline]
    pub fn id(&self) -> OverlayId {
        self.id
    }

    /// The wrapped target.
    pub fn target(&self) -> &dyn PresentationTarget {
        &*self.target
    }

    /// Transition style, fixed for the lifetime of this handle.
    #[inline]
    pub fn transition_type(&self) -> TransitionType {
        self.transition
    }

    pub fn should_observe_keyboard(&self) -> bool {
        self.target.should_observe_keyboard()
    }

    /// Requested dimming, clamped to `[0.0, 1.0]` (NaN reads as 0).
    pub fn background_alpha(&self) -> f32 {
        let alpha = self.target.background_alpha();
        if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        }
    }

    pub fn should_dismiss_on_background_tap(&self) -> bool {
        self.target.should_dismiss_on_background_tap()
    }

    /// Event channels of the wrapped target.
    pub fn events(&self) -> &PresentationEvents {
        self.target.events()
    }

    // --- Self-driven presentation ---

    /// Present on the installed global stack.
    pub fn present(&self) {
        if let Some(stack) = global_stack("Overlay::present") {
            stack.present_overlay(self);
        }
    }

    /// Dismiss from the installed global stack.
    pub fn dismiss(&self) {
        if let Some(stack) = global_stack("Overlay::dismiss") {
            stack.pop_overlay(self);
        }
    }

    /// Push a full screen from inside this overlay, on the global stack.
    pub fn push_screen(&self, screen: &Screen) {
        if let Some(stack) = global_stack("Overlay::push_screen") {
            stack.push_screen(screen);
        }
    }

    /// Present on an explicit stack.
    pub fn present_on(&self, stack: &PresentationStack) {
        stack.present_overlay(self);
    }

    /// Dismiss from an explicit stack.
    pub fn dismiss_from(&self, stack: &PresentationStack) {
        stack.pop_overlay(self);
    }

    /// Push a full screen on an explicit stack.
    pub fn push_screen_on(&self, stack: &PresentationStack, screen: &Screen) {
        stack.push_screen(screen);
    }

    /// Deliver one lifecycle event: hook, then stream, then delegate.
    pub(crate) fn notify(&self, event: PresentationEvent) {
        tracing::trace!(overlay = %self.id, ?event, "lifecycle event");
        match event {
            PresentationEvent::WillPresent => self.target.will_present(),
            PresentationEvent::DidPresent => self.target.did_present(),
            PresentationEvent::WillDismiss => self.target.will_dismiss(),
        }
        self.target.events().dispatch(event, self);
    }
}

fn global_stack(operation: &'static str) -> Option<PresentationStack> {
    let stack = PresentationStack::global();
    if stack.is_none() {
        tracing::debug!(operation, "self-driven call without a global stack");
        misuse("self-driven presentation requires PresentationStack::install_global");
    }
    stack
}

impl PartialEq for Overlay {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Overlay {}

impl Hash for Overlay {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("id", &self.id)
            .field("transition", &self.transition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        events: PresentationEvents,
    }

    impl PresentationTarget for Plain {
        fn events(&self) -> &PresentationEvents {
            &self.events
        }
    }

    struct Loud {
        events: PresentationEvents,
    }

    impl PresentationTarget for Loud {
        fn transition_type(&self) -> TransitionType {
            TransitionType::Bottom
        }

        fn background_alpha(&self) -> f32 {
            3.0
        }

        fn events(&self) -> &PresentationEvents {
            &self.events
        }
    }

    #[test]
    fn default_policy() {
        let overlay = Overlay::new(Plain {
            events: PresentationEvents::new(),
        });
        assert_eq!(overlay.transition_type(), TransitionType::Center);
        assert_eq!(overlay.background_alpha(), DEFAULT_BACKGROUND_ALPHA);
        assert!(!overlay.should_observe_keyboard());
        assert!(overlay.should_dismiss_on_background_tap());
    }

    #[test]
    fn alpha_is_clamped() {
        let overlay = Overlay::new(Loud {
            events: PresentationEvents::new(),
        });
        assert_eq!(overlay.background_alpha(), 1.0);
        assert_eq!(overlay.transition_type(), TransitionType::Bottom);
    }

    #[test]
    fn identity_follows_the_handle() {
        let target: Rc<dyn PresentationTarget> = Rc::new(Plain {
            events: PresentationEvents::new(),
        });
        let a = Overlay::from_rc(Rc::clone(&target));
        let b = Overlay::from_rc(target);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn anchors_follow_transition() {
        assert_eq!(
            TransitionType::Bottom.keyboard_anchor(),
            KeyboardAnchor::BottomEdge
        );
        assert_eq!(
            TransitionType::Center.keyboard_anchor(),
            KeyboardAnchor::VerticalCenter
        );
    }
}
