#![forbid(unsafe_code)]

//! Overlay container: the surface that hosts stacked overlays.
//!
//! One root container lives inside the shared host context; each pushed
//! screen gets a container of its own. A container tracks which overlays
//! it currently hosts and derives two things from that list:
//!
//! 1. the background dimming (maximum alpha over hosted overlays), and
//! 2. keyboard avoidance for the topmost overlay that asks for it.
//!
//! # Invariants
//!
//! - At most one keyboard observation exists per container, always for the
//!   topmost hosted overlay that observes the keyboard, and only while the
//!   container is visible.
//! - The dimming pushed to the host equals the maximum hosted alpha, or 0.
//!
//! # Failure Modes
//!
//! - A keyboard update for an overlay whose surface has been detached is
//!   dropped silently.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use presentable_runtime::Subscription;

use crate::host::{ContainerId, HostEnvironment};
use crate::keyboard::KeyboardMonitor;
use crate::navigator::WeakStack;
use crate::screen::Screen;
use crate::target::Overlay;

// --- Background tap recognition ---

/// What a touch landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchTarget {
    /// The container's own background.
    Background,
    /// Any surface inside the container (an overlay or its content).
    Descendant,
}

/// A tap delivered to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapGesture {
    target: TouchTarget,
    claimed_by_other: bool,
}

impl TapGesture {
    /// A tap on the container background.
    pub const fn on_background() -> Self {
        Self {
            target: TouchTarget::Background,
            claimed_by_other: false,
        }
    }

    /// A tap on something inside the container.
    pub const fn on_descendant() -> Self {
        Self {
            target: TouchTarget::Descendant,
            claimed_by_other: false,
        }
    }

    /// Mark the tap as recognized by another recognizer as well.
    pub const fn claimed_by_other(mut self, claimed: bool) -> Self {
        self.claimed_by_other = claimed;
        self
    }

    pub const fn target(&self) -> TouchTarget {
        self.target
    }

    pub const fn is_claimed_by_other(&self) -> bool {
        self.claimed_by_other
    }
}

/// Tap recognizer installed on every container.
///
/// Receives only touches that land on the background itself, and yields to
/// any other recognizer that also wants the tap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundTapRecognizer;

impl BackgroundTapRecognizer {
    pub fn should_receive(&self, gesture: &TapGesture) -> bool {
        gesture.target == TouchTarget::Background
    }

    /// Other recognizers always take precedence.
    pub fn requires_failure_of_others(&self) -> bool {
        true
    }

    pub fn recognizes(&self, gesture: &TapGesture) -> bool {
        self.should_receive(gesture)
            && !(self.requires_failure_of_others() && gesture.claimed_by_other)
    }
}

// --- Container ---

struct KeyboardObservation {
    overlay: Overlay,
    _subscription: Subscription,
}

struct ContainerInner {
    id: ContainerId,
    host: Rc<dyn HostEnvironment>,
    keyboard: KeyboardMonitor,
    stack: WeakStack,
    screen: Option<Screen>,
    overlays: RefCell<Vec<Overlay>>,
    background_alpha: Cell<f32>,
    observation: RefCell<Option<KeyboardObservation>>,
    visible: Cell<bool>,
    recognizer: BackgroundTapRecognizer,
}

/// Cloneable handle to one overlay container.
#[derive(Clone)]
pub struct OverlayContainer {
    inner: Rc<ContainerInner>,
}

impl OverlayContainer {
    /// The root container of the host context. Visible from creation.
    pub(crate) fn root(
        host: Rc<dyn HostEnvironment>,
        keyboard: KeyboardMonitor,
        stack: WeakStack,
    ) -> Self {
        Self::build(host, keyboard, stack, None, true)
    }

    /// A container adopting `screen` as its sole child.
    ///
    /// Invisible until [`will_appear`](Self::will_appear).
    pub(crate) fn for_screen(
        host: Rc<dyn HostEnvironment>,
        keyboard: KeyboardMonitor,
        stack: WeakStack,
        screen: &Screen,
    ) -> Self {
        let container = Self::build(host, keyboard, stack, Some(screen.clone()), false);
        let id = container.id();
        screen.hosted().will_move_to_container(id);
        screen.hosted().did_move_to_container(id);
        container
    }

    fn build(
        host: Rc<dyn HostEnvironment>,
        keyboard: KeyboardMonitor,
        stack: WeakStack,
        screen: Option<Screen>,
        visible: bool,
    ) -> Self {
        let id = ContainerId::next();
        tracing::trace!(container = %id, screen = screen.as_ref().map(|s| s.id().get()), "container created");
        Self {
            inner: Rc::new(ContainerInner {
                id,
                host,
                keyboard,
                stack,
                screen,
                overlays: RefCell::new(Vec::new()),
                background_alpha: Cell::new(0.0),
                observation: RefCell::new(None),
                visible: Cell::new(visible),
                recognizer: BackgroundTapRecognizer,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// The adopted screen, for screen containers.
    pub fn screen(&self) -> Option<&Screen> {
        self.inner.screen.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.screen.is_none()
    }

    /// Hosted overlays, bottom to top.
    pub fn overlays(&self) -> Vec<Overlay> {
        self.inner.overlays.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.overlays.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.overlays.borrow().is_empty()
    }

    /// The most recently attached overlay still hosted.
    pub fn top(&self) -> Option<Overlay> {
        self.inner.overlays.borrow().last().cloned()
    }

    pub fn contains(&self, overlay: &Overlay) -> bool {
        self.inner.overlays.borrow().contains(overlay)
    }

    /// Current dimming of the background.
    pub fn background_alpha(&self) -> f32 {
        self.inner.background_alpha.get()
    }

    /// The overlay whose keyboard avoidance is currently active.
    pub fn observed_overlay(&self) -> Option<Overlay> {
        self.inner
            .observation
            .borrow()
            .as_ref()
            .map(|observation| observation.overlay.clone())
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    pub fn recognizer(&self) -> BackgroundTapRecognizer {
        self.inner.recognizer
    }

    // --- Membership ---

    /// Start hosting `overlay` on top. Attaching a hosted overlay is a no-op.
    pub fn attach(&self, overlay: &Overlay) {
        {
            let mut overlays = self.inner.overlays.borrow_mut();
            if overlays.contains(overlay) {
                return;
            }
            overlays.push(overlay.clone());
        }
        tracing::trace!(container = %self.id(), overlay = %overlay.id(), "overlay attached");
        self.overlays_changed();
    }

    /// Stop hosting the topmost overlay and return it.
    pub fn detach(&self) -> Option<Overlay> {
        let top = self.inner.overlays.borrow_mut().pop()?;
        tracing::trace!(container = %self.id(), overlay = %top.id(), "overlay detached");
        self.overlays_changed();
        Some(top)
    }

    /// Stop hosting `overlay`, wherever it sits. Returns whether it was hosted.
    pub fn remove(&self, overlay: &Overlay) -> bool {
        let removed = {
            let mut overlays = self.inner.overlays.borrow_mut();
            match overlays.iter().position(|hosted| hosted == overlay) {
                Some(index) => {
                    overlays.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            tracing::trace!(container = %self.id(), overlay = %overlay.id(), "overlay removed");
            self.overlays_changed();
        }
        removed
    }

    /// Stop hosting everything; returns the former overlays, bottom to top.
    pub(crate) fn clear(&self) -> Vec<Overlay> {
        let cleared = std::mem::take(&mut *self.inner.overlays.borrow_mut());
        if !cleared.is_empty() {
            self.overlays_changed();
        }
        cleared
    }

    // --- Lifecycle ---

    /// The container is about to become visible; keyboard observation resumes.
    pub fn will_appear(&self) {
        self.inner.visible.set(true);
        self.refresh_keyboard();
    }

    /// The container is about to be covered or removed; observation stops.
    pub fn will_disappear(&self) {
        self.inner.visible.set(false);
        self.refresh_keyboard();
    }

    /// The container moved to a new parent; `None` means it left the
    /// hierarchy, which purges its items from the stack.
    pub fn did_move_to_parent(&self, parent: Option<ContainerId>) {
        match parent {
            Some(parent) => {
                tracing::trace!(container = %self.id(), %parent, "container moved");
            }
            None => {
                tracing::debug!(container = %self.id(), "container left the hierarchy");
                if let Some(stack) = self.inner.stack.upgrade() {
                    stack.purge(self);
                }
            }
        }
    }

    /// Route a tap to the background recognizer.
    ///
    /// Returns whether the tap dismissed the topmost overlay.
    pub fn handle_background_tap(&self, gesture: &TapGesture) -> bool {
        if !self.inner.recognizer.recognizes(gesture) {
            return false;
        }
        let Some(top) = self.top() else {
            return false;
        };
        if !top.should_dismiss_on_background_tap() {
            tracing::trace!(container = %self.id(), overlay = %top.id(), "background tap ignored");
            return false;
        }
        let Some(stack) = self.inner.stack.upgrade() else {
            return false;
        };
        tracing::debug!(container = %self.id(), overlay = %top.id(), "background tap dismisses overlay");
        stack.pop_overlay(&top);
        true
    }

    // --- Derived state ---

    fn overlays_changed(&self) {
        self.refresh_alpha();
        self.refresh_keyboard();
    }

    fn refresh_alpha(&self) {
        let alpha = self
            .inner
            .overlays
            .borrow()
            .iter()
            .map(Overlay::background_alpha)
            .fold(0.0_f32, f32::max);
        if alpha != self.inner.background_alpha.get() {
            self.inner.background_alpha.set(alpha);
            self.inner.host.set_background_alpha(self.id(), alpha);
        }
    }

    fn refresh_keyboard(&self) {
        let desired = if self.is_visible() {
            self.inner
                .overlays
                .borrow()
                .iter()
                .rev()
                .find(|overlay| overlay.should_observe_keyboard())
                .cloned()
        } else {
            None
        };
        if self.observed_overlay() == desired {
            return;
        }
        let previous = self.inner.observation.borrow_mut().take();
        drop(previous);
        if let Some(overlay) = desired {
            tracing::trace!(container = %self.id(), overlay = %overlay.id(), "observing keyboard");
            let subscription = self.observe_keyboard(&overlay);
            *self.inner.observation.borrow_mut() = Some(KeyboardObservation {
                overlay,
                _subscription: subscription,
            });
        }
    }

    fn observe_keyboard(&self, overlay: &Overlay) -> Subscription {
        let weak = Rc::downgrade(&self.inner);
        let observed = overlay.clone();
        self.inner.keyboard.observe(move |height| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let hosted = inner.overlays.borrow().contains(&observed);
            if !hosted || !inner.host.is_attached(&observed) {
                return;
            }
            let anchor = observed.transition_type().keyboard_anchor();
            inner.host.set_keyboard_offset(&observed, anchor, height);
            inner.host.layout(inner.id);
        })
    }
}

impl PartialEq for OverlayContainer {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for OverlayContainer {}

impl fmt::Debug for OverlayContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayContainer")
            .field("id", &self.inner.id)
            .field("screen", &self.inner.screen)
            .field("overlays", &self.len())
            .field("visible", &self.is_visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::PresentationStack;
    use crate::target::TransitionType;
    use crate::testing::{RecordingHost, TestOverlay, TestScreen};

    fn setup() -> (Rc<RecordingHost>, KeyboardMonitor, PresentationStack) {
        let host = Rc::new(RecordingHost::new());
        let keyboard = KeyboardMonitor::new();
        let stack = PresentationStack::new(host.clone(), keyboard.clone());
        (host, keyboard, stack)
    }

    #[test]
    fn recognizer_rules() {
        let recognizer = BackgroundTapRecognizer;
        assert!(recognizer.recognizes(&TapGesture::on_background()));
        assert!(!recognizer.recognizes(&TapGesture::on_descendant()));
        assert!(!recognizer.recognizes(&TapGesture::on_background().claimed_by_other(true)));
        assert!(recognizer.requires_failure_of_others());
    }

    #[test]
    fn alpha_is_the_maximum_over_hosted_overlays() {
        let (host, _keyboard, stack) = setup();
        let root = stack.root();
        let faint = TestOverlay::new().alpha(0.2).build();
        let dark = TestOverlay::new().alpha(0.7).build();

        root.attach(&faint);
        root.attach(&dark);
        assert_eq!(root.background_alpha(), 0.7);
        assert_eq!(host.background_alpha(root.id()), Some(0.7));

        assert_eq!(root.detach(), Some(dark));
        assert_eq!(root.background_alpha(), 0.2);
        assert!(root.remove(&faint));
        assert_eq!(root.background_alpha(), 0.0);
        assert!(!root.remove(&faint));
    }

    #[test]
    fn attach_is_idempotent() {
        let (_host, _keyboard, stack) = setup();
        let root = stack.root();
        let overlay = TestOverlay::new().build();
        root.attach(&overlay);
        root.attach(&overlay);
        assert_eq!(root.len(), 1);
        assert_eq!(root.top(), Some(overlay));
    }

    #[test]
    fn keyboard_follows_the_topmost_observer() {
        let (host, keyboard, stack) = setup();
        let root = stack.root();
        let sheet = TestOverlay::new()
            .transition(TransitionType::Bottom)
            .observe_keyboard(true)
            .build();
        let plain = TestOverlay::new().build();

        host.attach_surface(root.id(), &sheet);
        root.attach(&sheet);
        assert_eq!(root.observed_overlay(), Some(sheet.clone()));
        assert_eq!(keyboard.observer_count(), 1);

        keyboard.set_visible_height(216.0);
        assert_eq!(host.keyboard_offset(&sheet), Some(216.0));

        root.attach(&plain);
        assert_eq!(root.observed_overlay(), Some(sheet.clone()));
        assert_eq!(keyboard.observer_count(), 1);

        keyboard.set_visible_height(180.0);
        assert_eq!(host.keyboard_offset(&sheet), Some(180.0));

        let form = TestOverlay::new().observe_keyboard(true).build();
        root.attach(&form);
        assert_eq!(root.observed_overlay(), Some(form.clone()));
        assert_eq!(keyboard.observer_count(), 1);

        root.remove(&form);
        assert_eq!(root.observed_overlay(), Some(sheet.clone()));

        root.remove(&sheet);
        assert_eq!(root.observed_overlay(), None);
        assert_eq!(keyboard.observer_count(), 0);
    }

    #[test]
    fn hidden_containers_do_not_observe() {
        let (_host, keyboard, stack) = setup();
        let root = stack.root();
        let sheet = TestOverlay::new().observe_keyboard(true).build();
        root.attach(&sheet);
        root.will_disappear();
        assert!(!root.is_visible());
        assert_eq!(keyboard.observer_count(), 0);
        root.will_appear();
        assert_eq!(keyboard.observer_count(), 1);
    }

    #[test]
    fn detached_surfaces_ignore_keyboard_updates() {
        let (host, keyboard, stack) = setup();
        let root = stack.root();
        let sheet = TestOverlay::new().observe_keyboard(true).build();
        root.attach(&sheet);
        keyboard.set_visible_height(100.0);
        assert_eq!(host.keyboard_offset(&sheet), None);
    }

    #[test]
    fn screen_container_adopts_its_screen() {
        let (_host, _keyboard, stack) = setup();
        let (screen, log) = TestScreen::with_log();
        stack.push_screen(&screen);
        let container = stack.top_container();
        assert_eq!(container.screen(), Some(&screen));
        assert!(!container.is_root());
        assert_eq!(
            *log.borrow(),
            vec![
                format!("will_move:{}", container.id()),
                format!("did_move:{}", container.id()),
            ]
        );
    }
}
