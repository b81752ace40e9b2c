#![forbid(unsafe_code)]

//! The presentation stack: ordered overlays and screens above a lazily
//! materialized host context.
//!
//! `PresentationStack` owns the logical stack of [`PresentableItem`]s, the
//! lifecycle of the single shared host context, and the sequencing of
//! lifecycle hooks around transitions.
//!
//! # Host lifecycle
//!
//! ```text
//!   Hidden ──present/push──▶ Materializing ──complete()──▶ Shown
//!     ▲                          │ (requests queue FIFO)      │
//!     └──────── stack empty ─────┴────────────────────────────┘
//! ```
//!
//! Requests that arrive while the host is materializing are queued and
//! replayed in order once [`HostCompletion::complete`] fires. A teardown
//! that lands while materializing is deferred until completion.
//!
//! # Invariants
//!
//! - Once transitions settle, the stack is empty iff the host is hidden.
//! - `show_host` is never issued while a previous show is in flight.
//! - `hide_host` is issued at most once per shown host context.
//! - No internal borrow is held across a hook, event, or host call, so all
//!   of them may call back into the stack.
//!
//! # Failure Modes
//!
//! - Popping an overlay that is not on the stack is a silent no-op.
//! - Presenting or pushing with no host root is a programmer error: logged
//!   at `error!`, asserted in debug builds, ignored in release builds.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use web_time::Instant;

use crate::animation::{Transition, TransitionAnimator, TransitionDirection, TransitionStart};
use crate::config::{ConfigError, NavigatorConfig};
use crate::container::OverlayContainer;
use crate::events::PresentationEvent;
use crate::host::{ContainerId, HostCompletion, HostEnvironment, Placement};
use crate::item::PresentableItem;
use crate::keyboard::KeyboardMonitor;
use crate::screen::Screen;
use crate::target::Overlay;

thread_local! {
    static GLOBAL_STACK: RefCell<Option<PresentationStack>> = const { RefCell::new(None) };
}

/// Report a programmer error: always logged, fatal in debug builds.
#[track_caller]
pub(crate) fn misuse(message: &'static str) {
    tracing::error!("{message}");
    if cfg!(debug_assertions) {
        panic!("{message}");
    }
}

/// Lifecycle of the shared host context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPhase {
    Hidden,
    Materializing,
    Shown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Hidden,
    Materializing { hide_on_arrival: bool },
    Shown,
}

impl Phase {
    fn public(self) -> HostPhase {
        match self {
            Self::Hidden => HostPhase::Hidden,
            Self::Materializing { .. } => HostPhase::Materializing,
            Self::Shown => HostPhase::Shown,
        }
    }
}

#[derive(Debug, Clone)]
enum PendingRequest {
    Present(Overlay),
    Push(Screen),
}

struct StackState {
    items: Vec<PresentableItem>,
    history: Vec<OverlayContainer>,
    phase: Phase,
    pending: VecDeque<PendingRequest>,
    /// Overlays whose `WillDismiss` is currently being delivered.
    dismissing: Vec<Overlay>,
    last_frame: Option<Instant>,
}

struct StackInner {
    host: Rc<dyn HostEnvironment>,
    keyboard: KeyboardMonitor,
    config: NavigatorConfig,
    root: OverlayContainer,
    state: RefCell<StackState>,
    animator: RefCell<TransitionAnimator>,
}

/// Weak back-reference held by containers and host completions.
#[derive(Clone)]
pub(crate) struct WeakStack(Weak<StackInner>);

impl WeakStack {
    pub(crate) fn upgrade(&self) -> Option<PresentationStack> {
        self.0.upgrade().map(|inner| PresentationStack { inner })
    }
}

/// Cloneable handle to one presentation stack.
#[derive(Clone)]
pub struct PresentationStack {
    inner: Rc<StackInner>,
}

impl PresentationStack {
    /// Create a stack with the default configuration.
    pub fn new(host: Rc<dyn HostEnvironment>, keyboard: KeyboardMonitor) -> Self {
        Self::build(host, keyboard, NavigatorConfig::default())
    }

    /// Create a stack with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is out of range.
    pub fn with_config(
        host: Rc<dyn HostEnvironment>,
        keyboard: KeyboardMonitor,
        config: NavigatorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(host, keyboard, config))
    }

    fn build(
        host: Rc<dyn HostEnvironment>,
        keyboard: KeyboardMonitor,
        config: NavigatorConfig,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<StackInner>| StackInner {
            root: OverlayContainer::root(
                Rc::clone(&host),
                keyboard.clone(),
                WeakStack(weak.clone()),
            ),
            host,
            keyboard,
            config,
            state: RefCell::new(StackState {
                items: Vec::new(),
                history: Vec::new(),
                phase: Phase::Hidden,
                pending: VecDeque::new(),
                dismissing: Vec::new(),
                last_frame: None,
            }),
            animator: RefCell::new(TransitionAnimator::new()),
        });
        tracing::debug!(root = %inner.root.id(), "presentation stack created");
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> WeakStack {
        WeakStack(Rc::downgrade(&self.inner))
    }

    // --- Global instance ---

    /// Make this stack the thread's global stack, used by
    /// [`Overlay::present`] and friends.
    pub fn install_global(&self) {
        GLOBAL_STACK.with(|slot| *slot.borrow_mut() = Some(self.clone()));
    }

    /// The thread's global stack, if one is installed.
    pub fn global() -> Option<Self> {
        GLOBAL_STACK.with(|slot| slot.borrow().clone())
    }

    /// Uninstall and return the thread's global stack.
    pub fn reset_global() -> Option<Self> {
        GLOBAL_STACK.with(|slot| slot.borrow_mut().take())
    }

    // --- Requests ---

    /// Present `overlay` in the topmost container.
    ///
    /// Presenting an overlay that is already on the stack, or already
    /// queued, is ignored.
    pub fn present_overlay(&self, overlay: &Overlay) {
        let _span = tracing::debug_span!("present_overlay", overlay = %overlay.id()).entered();
        if !self.inner.host.has_root() {
            misuse("present_overlay called without a host root");
            return;
        }
        let queued =
            self.is_queued(|request| matches!(request, PendingRequest::Present(o) if o == overlay));
        if queued || self.contains(overlay) {
            tracing::debug!("overlay already presented; ignoring");
            return;
        }
        self.request(PendingRequest::Present(overlay.clone()));
    }

    /// Push `screen` in a new container onto the host navigation history.
    pub fn push_screen(&self, screen: &Screen) {
        let _span = tracing::debug_span!("push_screen", screen = %screen.id()).entered();
        if !self.inner.host.has_root() {
            misuse("push_screen called without a host root");
            return;
        }
        let queued =
            self.is_queued(|request| matches!(request, PendingRequest::Push(s) if s == screen));
        if queued || self.contains_screen(screen) {
            tracing::debug!("screen already pushed; ignoring");
            return;
        }
        self.request(PendingRequest::Push(screen.clone()));
    }

    fn is_queued(&self, predicate: impl Fn(&PendingRequest) -> bool) -> bool {
        self.inner.state.borrow().pending.iter().any(predicate)
    }

    fn request(&self, request: PendingRequest) {
        let phase = self.inner.state.borrow().phase;
        match phase {
            Phase::Shown => self.execute(request),
            Phase::Materializing { .. } => {
                let mut state = self.inner.state.borrow_mut();
                state.pending.push_back(request);
                state.phase = Phase::Materializing {
                    hide_on_arrival: false,
                };
                tracing::debug!(queued = state.pending.len(), "request queued behind host materialization");
            }
            Phase::Hidden => {
                {
                    let mut state = self.inner.state.borrow_mut();
                    state.pending.push_back(request);
                    state.phase = Phase::Materializing {
                        hide_on_arrival: false,
                    };
                }
                tracing::info!("materializing host context");
                self.inner
                    .host
                    .show_host(HostCompletion::new(self.downgrade()));
            }
        }
    }

    pub(crate) fn host_did_show(&self) {
        let phase = self.inner.state.borrow().phase;
        let Phase::Materializing { hide_on_arrival } = phase else {
            tracing::warn!(?phase, "host completion without a pending show");
            return;
        };
        self.inner.state.borrow_mut().phase = Phase::Shown;
        tracing::debug!(hide_on_arrival, "host context shown");
        if !hide_on_arrival {
            self.drain_pending();
        }
        self.dismiss_if_empty();
    }

    fn drain_pending(&self) {
        loop {
            let next = {
                let mut state = self.inner.state.borrow_mut();
                if state.phase != Phase::Shown {
                    break;
                }
                state.pending.pop_front()
            };
            match next {
                Some(request) => self.execute(request),
                None => break,
            }
        }
    }

    fn execute(&self, request: PendingRequest) {
        match request {
            PendingRequest::Present(overlay) => self.execute_present(&overlay),
            PendingRequest::Push(screen) => self.execute_push(&screen),
        }
    }

    fn execute_present(&self, overlay: &Overlay) {
        if self.inner.config.resign_focus {
            self.inner.host.resign_focus();
        }
        let in_flight = self.inner.animator.borrow_mut().finish(overlay);
        if let Some(transition) = in_flight {
            self.settle(transition, false);
        }

        let container = self.top_container();
        let depth = {
            let mut state = self.inner.state.borrow_mut();
            state.items.push(PresentableItem::Overlay(overlay.clone()));
            state.items.len()
        };
        tracing::debug!(overlay = %overlay.id(), container = %container.id(), depth, "overlay presented");

        overlay.notify(PresentationEvent::WillPresent);
        if !self.contains(overlay) {
            tracing::debug!(overlay = %overlay.id(), "overlay left the stack during willPresent");
            return;
        }
        self.inner.host.attach_surface(container.id(), overlay);
        container.attach(overlay);
        self.start_transition(overlay, TransitionDirection::Present);
    }

    fn execute_push(&self, screen: &Screen) {
        if self.inner.config.resign_focus {
            self.inner.host.resign_focus();
        }
        let container = OverlayContainer::for_screen(
            Rc::clone(&self.inner.host),
            self.inner.keyboard.clone(),
            self.downgrade(),
            screen,
        );
        let covered = self.top_container();
        let history_len = {
            let mut state = self.inner.state.borrow_mut();
            state.items.push(PresentableItem::Screen(container.clone()));
            state.history.push(container.clone());
            state.history.len()
        };
        tracing::debug!(screen = %screen.id(), container = %container.id(), history_len, "screen pushed");
        covered.will_disappear();
        self.inner.host.push_container(container.id(), screen);
        container.will_appear();
    }

    // --- Transitions ---

    fn start_transition(&self, overlay: &Overlay, direction: TransitionDirection) {
        let attached = self.inner.host.is_attached(overlay);
        let start =
            self.inner
                .animator
                .borrow_mut()
                .start(overlay, direction, &self.inner.config, attached);
        match start {
            TransitionStart::Running { initial, .. } => {
                self.inner.host.set_placement(overlay, initial);
            }
            TransitionStart::Finished(transition) => self.settle(transition, true),
        }
    }

    /// Complete a transition. Dismissals tear down when `teardown` is set.
    fn settle(&self, transition: Transition, teardown: bool) {
        let overlay = transition.overlay;
        match transition.direction {
            TransitionDirection::Present => {
                self.inner.host.set_placement(&overlay, Placement::RESTING);
                overlay.notify(PresentationEvent::DidPresent);
            }
            TransitionDirection::Dismiss => {
                self.inner.host.remove_surface(&overlay);
                tracing::trace!(overlay = %overlay.id(), "overlay surface removed");
                if teardown {
                    self.dismiss_if_empty();
                }
            }
        }
    }

    /// Advance running transitions by `delta`.
    pub fn tick(&self, delta: Duration) {
        let update = self.inner.animator.borrow_mut().tick(delta);
        for (overlay, placement) in &update.placements {
            self.inner.host.set_placement(overlay, *placement);
        }
        for transition in update.finished {
            self.settle(transition, true);
        }
    }

    /// Advance running transitions to the frame at `now`.
    ///
    /// The first frame after the host is shown advances by zero.
    pub fn on_frame(&self, now: Instant) {
        let delta = {
            let mut state = self.inner.state.borrow_mut();
            let previous = state.last_frame.replace(now);
            previous.map_or(Duration::ZERO, |previous| now.saturating_duration_since(previous))
        };
        self.tick(delta);
    }

    // --- Removal ---

    /// Pop the most recent item.
    ///
    /// With an empty stack this cancels the latest queued request, if any,
    /// and tears down.
    pub fn pop(&self) {
        let _span = tracing::debug_span!("pop").entered();
        let top = self.inner.state.borrow().items.last().cloned();
        match top {
            Some(PresentableItem::Overlay(overlay)) => self.dismiss_overlay(&overlay),
            Some(PresentableItem::Screen(container)) => self.pop_screen(&container),
            None => {
                let cancelled = self.inner.state.borrow_mut().pending.pop_back();
                if let Some(request) = cancelled {
                    tracing::debug!(?request, "queued request cancelled");
                }
                self.dismiss_if_empty();
            }
        }
    }

    /// Pop `overlay` wherever it sits. A no-op if it is not on the stack.
    pub fn pop_overlay(&self, overlay: &Overlay) {
        let _span = tracing::debug_span!("pop_overlay", overlay = %overlay.id()).entered();
        if self.contains(overlay) {
            self.dismiss_overlay(overlay);
            return;
        }
        let dequeued = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.pending.len();
            state
                .pending
                .retain(|request| !matches!(request, PendingRequest::Present(o) if o == overlay));
            before != state.pending.len()
        };
        if dequeued {
            tracing::debug!("queued overlay withdrawn");
            self.dismiss_if_empty();
        } else {
            tracing::trace!("overlay not on the stack; nothing to pop");
        }
    }

    fn dismiss_overlay(&self, overlay: &Overlay) {
        let in_flight = self.inner.animator.borrow_mut().finish(overlay);
        if let Some(transition) = in_flight {
            self.settle(transition, false);
        }
        {
            let mut state = self.inner.state.borrow_mut();
            if state.dismissing.contains(overlay) {
                tracing::trace!(overlay = %overlay.id(), "dismissal already in progress");
                return;
            }
            if !state.items.iter().any(|item| item.overlay() == Some(overlay)) {
                tracing::trace!(overlay = %overlay.id(), "overlay already left the stack");
                return;
            }
            state.dismissing.push(overlay.clone());
        }
        overlay.notify(PresentationEvent::WillDismiss);
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            state.dismissing.retain(|entry| entry != overlay);
            let index = state
                .items
                .iter()
                .position(|item| item.overlay() == Some(overlay));
            index.map(|index| state.items.remove(index)).is_some()
        };
        if !removed {
            tracing::trace!(overlay = %overlay.id(), "overlay left the stack during will_dismiss");
            return;
        }
        tracing::debug!(overlay = %overlay.id(), depth = self.depth(), "overlay dismissed");
        if let Some(container) = self.container_holding(overlay) {
            container.remove(overlay);
        }
        self.start_transition(overlay, TransitionDirection::Dismiss);
    }

    fn pop_screen(&self, container: &OverlayContainer) {
        let revealed = {
            let mut state = self.inner.state.borrow_mut();
            state.items.retain(|item| item.container() != Some(container));
            state.history.retain(|entry| entry != container);
            state.history.last().cloned()
        };
        let revealed = revealed.unwrap_or_else(|| self.inner.root.clone());
        tracing::debug!(container = %container.id(), revealed = %revealed.id(), "screen popped");
        self.discard(container);
        container.will_disappear();
        self.inner.host.pop_container();
        revealed.will_appear();
        self.revalidate();
        self.dismiss_if_empty();
    }

    /// Clear the whole stack and the host navigation history, then tear
    /// down. No dismiss hooks fire.
    pub fn pop_all(&self) {
        let _span = tracing::debug_span!("pop_all").entered();
        let drained = self.inner.animator.borrow_mut().drain();
        for transition in drained {
            self.settle(transition, false);
        }
        let (history, cleared) = {
            let mut state = self.inner.state.borrow_mut();
            let cleared = state.items.len() + state.pending.len();
            state.items.clear();
            state.pending.clear();
            (std::mem::take(&mut state.history), cleared)
        };
        tracing::debug!(cleared, screens = history.len(), "stack cleared");
        for container in history.iter().rev() {
            self.discard(container);
            container.will_disappear();
        }
        self.discard(&self.inner.root);
        self.inner.root.will_appear();
        if !history.is_empty() {
            self.inner.host.clear_history();
        }
        self.dismiss_if_empty();
    }

    /// Drop every entry owned by `container`, which has left the hierarchy.
    pub(crate) fn purge(&self, container: &OverlayContainer) {
        let _span = tracing::debug_span!("purge", container = %container.id()).entered();
        let owned = container.overlays();
        let revealed = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.items.len();
            state.items.retain(|item| match item {
                PresentableItem::Overlay(overlay) => !owned.contains(overlay),
                PresentableItem::Screen(entry) => entry != container,
            });
            let was_top = state.history.last() == Some(container);
            state.history.retain(|entry| entry != container);
            tracing::debug!(removed = before - state.items.len(), "container entries purged");
            was_top.then(|| {
                state
                    .history
                    .last()
                    .cloned()
                    .unwrap_or_else(|| self.inner.root.clone())
            })
        };
        self.discard(container);
        if !container.is_root() {
            container.will_disappear();
        }
        if let Some(revealed) = revealed {
            revealed.will_appear();
        }
        self.revalidate();
        self.dismiss_if_empty();
    }

    /// Detach every overlay surface still hosted by `container`.
    fn discard(&self, container: &OverlayContainer) {
        for overlay in container.clear() {
            let in_flight = self.inner.animator.borrow_mut().finish(&overlay);
            if let Some(transition) = in_flight {
                self.settle(transition, false);
            }
            self.inner.host.remove_surface(&overlay);
        }
    }

    /// Drop entries whose container is no longer live.
    fn revalidate(&self) {
        let root = &self.inner.root;
        let mut state = self.inner.state.borrow_mut();
        let StackState { items, history, .. } = &mut *state;
        let before = items.len();
        items.retain(|item| match item {
            PresentableItem::Overlay(overlay) => {
                root.contains(overlay) || history.iter().any(|entry| entry.contains(overlay))
            }
            PresentableItem::Screen(container) => history.contains(container),
        });
        let stale = before - items.len();
        if stale > 0 {
            tracing::debug!(stale, "stale entries dropped");
        }
    }

    /// Hide the host context if nothing is on the stack or queued.
    fn dismiss_if_empty(&self) {
        let hide = {
            let mut state = self.inner.state.borrow_mut();
            if !state.items.is_empty() || !state.pending.is_empty() {
                return;
            }
            match state.phase {
                Phase::Shown => {
                    state.phase = Phase::Hidden;
                    state.last_frame = None;
                    true
                }
                Phase::Materializing { .. } => {
                    state.phase = Phase::Materializing {
                        hide_on_arrival: true,
                    };
                    tracing::debug!("teardown deferred until the host is shown");
                    false
                }
                Phase::Hidden => false,
            }
        };
        if hide {
            tracing::info!("hiding host context");
            self.inner.host.hide_host();
        } else {
            tracing::trace!("teardown skipped");
        }
    }

    // --- Queries ---

    /// Number of items on the stack.
    pub fn depth(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().items.is_empty()
    }

    /// Items, bottom to top.
    pub fn items(&self) -> Vec<PresentableItem> {
        self.inner.state.borrow().items.clone()
    }

    pub fn top(&self) -> Option<PresentableItem> {
        self.inner.state.borrow().items.last().cloned()
    }

    pub fn contains(&self, overlay: &Overlay) -> bool {
        self.inner
            .state
            .borrow()
            .items
            .iter()
            .any(|item| item.overlay() == Some(overlay))
    }

    pub fn contains_screen(&self, screen: &Screen) -> bool {
        self.inner
            .state
            .borrow()
            .items
            .iter()
            .any(|item| item.screen() == Some(screen))
    }

    /// Number of screen containers on the host navigation history.
    pub fn history_len(&self) -> usize {
        self.inner.state.borrow().history.len()
    }

    /// The container living directly in the host context.
    pub fn root(&self) -> OverlayContainer {
        self.inner.root.clone()
    }

    /// The container new overlays are presented into.
    pub fn top_container(&self) -> OverlayContainer {
        self.inner
            .state
            .borrow()
            .history
            .last()
            .cloned()
            .unwrap_or_else(|| self.inner.root.clone())
    }

    /// Look up a live container by id.
    pub fn container(&self, id: ContainerId) -> Option<OverlayContainer> {
        if self.inner.root.id() == id {
            return Some(self.inner.root.clone());
        }
        self.inner
            .state
            .borrow()
            .history
            .iter()
            .find(|container| container.id() == id)
            .cloned()
    }

    fn container_holding(&self, overlay: &Overlay) -> Option<OverlayContainer> {
        if self.inner.root.contains(overlay) {
            return Some(self.inner.root.clone());
        }
        self.inner
            .state
            .borrow()
            .history
            .iter()
            .rev()
            .find(|container| container.contains(overlay))
            .cloned()
    }

    pub fn is_host_shown(&self) -> bool {
        self.host_phase() == HostPhase::Shown
    }

    pub fn host_phase(&self) -> HostPhase {
        self.inner.state.borrow().phase.public()
    }

    /// Number of requests waiting for the host to finish materializing.
    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    /// Whether any transition is running.
    pub fn is_animating(&self) -> bool {
        !self.inner.animator.borrow().is_empty()
    }

    /// Whether `overlay` has a running transition.
    pub fn is_transitioning(&self, overlay: &Overlay) -> bool {
        self.inner.animator.borrow().is_animating(overlay)
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.inner.config
    }

    pub fn keyboard(&self) -> &KeyboardMonitor {
        &self.inner.keyboard
    }
}

impl fmt::Debug for PresentationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("PresentationStack")
            .field("depth", &state.items.len())
            .field("history", &state.history.len())
            .field("phase", &state.phase)
            .field("pending", &state.pending.len())
            .finish()
    }
}
