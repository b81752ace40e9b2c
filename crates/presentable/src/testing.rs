#![forbid(unsafe_code)]

//! Test doubles: a recording [`HostEnvironment`] and configurable targets.
//!
//! [`RecordingHost`] keeps a log of every outbound call and a small model
//! of the host state (shown flag, attached surfaces, navigation history,
//! per-container dimming, placements, keyboard offsets) so tests can assert
//! on either. Show completion is automatic by default; a
//! [`deferred`](RecordingHost::deferred) host holds it until
//! [`complete_show`](RecordingHost::complete_show).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::events::PresentationEvents;
use crate::host::{ContainerId, HostCompletion, HostEnvironment, Placement};
use crate::navigator::PresentationStack;
use crate::screen::{HostedScreen, Screen, ScreenId};
use crate::target::{
    DEFAULT_BACKGROUND_ALPHA, KeyboardAnchor, Overlay, OverlayId, PresentationTarget,
    TransitionType,
};

/// Shared, ordered log of hook and lifecycle entries.
pub type HookLog = Rc<RefCell<Vec<String>>>;

/// Create an empty [`HookLog`].
pub fn hook_log() -> HookLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// One outbound call made by the stack or a container.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    ShowHost,
    HideHost,
    ResignFocus,
    AttachSurface(ContainerId, OverlayId),
    RemoveSurface(OverlayId),
    SetPlacement(OverlayId, Placement),
    SetKeyboardOffset(OverlayId, KeyboardAnchor, f32),
    SetBackgroundAlpha(ContainerId, f32),
    Layout(ContainerId),
    PushContainer(ContainerId, ScreenId),
    PopContainer,
    ClearHistory,
}

/// In-memory host that records every call.
pub struct RecordingHost {
    has_root: Cell<bool>,
    auto_complete: Cell<bool>,
    calls: RefCell<Vec<HostCall>>,
    pending_show: RefCell<Option<HostCompletion>>,
    shown: Cell<bool>,
    attached: RefCell<HashMap<OverlayId, ContainerId>>,
    history: RefCell<Vec<ContainerId>>,
    alphas: RefCell<HashMap<ContainerId, f32>>,
    placements: RefCell<HashMap<OverlayId, Placement>>,
    keyboard_offsets: RefCell<HashMap<OverlayId, f32>>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    /// A host with a root that completes every show synchronously.
    pub fn new() -> Self {
        Self {
            has_root: Cell::new(true),
            auto_complete: Cell::new(true),
            calls: RefCell::new(Vec::new()),
            pending_show: RefCell::new(None),
            shown: Cell::new(false),
            attached: RefCell::new(HashMap::new()),
            history: RefCell::new(Vec::new()),
            alphas: RefCell::new(HashMap::new()),
            placements: RefCell::new(HashMap::new()),
            keyboard_offsets: RefCell::new(HashMap::new()),
        }
    }

    /// A host whose shows complete only on [`complete_show`](Self::complete_show).
    pub fn deferred() -> Self {
        let host = Self::new();
        host.auto_complete.set(false);
        host
    }

    /// A host with no root presenter.
    pub fn without_root() -> Self {
        let host = Self::new();
        host.has_root.set(false);
        host
    }

    pub fn set_has_root(&self, has_root: bool) {
        self.has_root.set(has_root);
    }

    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.set(enabled);
    }

    /// Finish a held show. Returns whether one was pending.
    pub fn complete_show(&self) -> bool {
        let pending = self.pending_show.borrow_mut().take();
        match pending {
            Some(done) => {
                self.shown.set(true);
                done.complete();
                true
            }
            None => false,
        }
    }

    pub fn has_pending_show(&self) -> bool {
        self.pending_show.borrow().is_some()
    }

    /// Simulate the host's own back action on the top pushed container.
    ///
    /// Returns whether there was anything to pop.
    pub fn simulate_back(&self, stack: &PresentationStack) -> bool {
        let popped = self.history.borrow_mut().pop();
        let Some(id) = popped else {
            return false;
        };
        if let Some(container) = stack.container(id) {
            container.did_move_to_parent(None);
        }
        true
    }

    // --- Inspection ---

    pub fn is_shown(&self) -> bool {
        self.shown.get()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn show_count(&self) -> usize {
        self.count(|call| matches!(call, HostCall::ShowHost))
    }

    pub fn hide_count(&self) -> usize {
        self.count(|call| matches!(call, HostCall::HideHost))
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn background_alpha(&self, container: ContainerId) -> Option<f32> {
        self.alphas.borrow().get(&container).copied()
    }

    pub fn placement(&self, overlay: &Overlay) -> Option<Placement> {
        self.placements.borrow().get(&overlay.id()).copied()
    }

    pub fn keyboard_offset(&self, overlay: &Overlay) -> Option<f32> {
        self.keyboard_offsets.borrow().get(&overlay.id()).copied()
    }

    pub fn is_surface_attached(&self, overlay: &Overlay) -> bool {
        self.attached.borrow().contains_key(&overlay.id())
    }

    /// The container an overlay's surface is attached to.
    pub fn surface_parent(&self, overlay: &Overlay) -> Option<ContainerId> {
        self.attached.borrow().get(&overlay.id()).copied()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.borrow().len()
    }

    fn record(&self, call: HostCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl HostEnvironment for RecordingHost {
    fn has_root(&self) -> bool {
        self.has_root.get()
    }

    fn show_host(&self, done: HostCompletion) {
        self.record(HostCall::ShowHost);
        if self.auto_complete.get() {
            self.shown.set(true);
            done.complete();
        } else {
            let previous = self.pending_show.borrow_mut().replace(done);
            assert!(previous.is_none(), "show_host issued while a show is in flight");
        }
    }

    fn hide_host(&self) {
        self.record(HostCall::HideHost);
        self.shown.set(false);
    }

    fn resign_focus(&self) {
        self.record(HostCall::ResignFocus);
    }

    fn attach_surface(&self, container: ContainerId, overlay: &Overlay) {
        self.record(HostCall::AttachSurface(container, overlay.id()));
        self.attached.borrow_mut().insert(overlay.id(), container);
    }

    fn remove_surface(&self, overlay: &Overlay) {
        self.record(HostCall::RemoveSurface(overlay.id()));
        self.attached.borrow_mut().remove(&overlay.id());
    }

    fn is_attached(&self, overlay: &Overlay) -> bool {
        self.is_surface_attached(overlay)
    }

    fn set_placement(&self, overlay: &Overlay, placement: Placement) {
        self.record(HostCall::SetPlacement(overlay.id(), placement));
        self.placements.borrow_mut().insert(overlay.id(), placement);
    }

    fn set_keyboard_offset(&self, overlay: &Overlay, anchor: KeyboardAnchor, offset: f32) {
        self.record(HostCall::SetKeyboardOffset(overlay.id(), anchor, offset));
        self.keyboard_offsets
            .borrow_mut()
            .insert(overlay.id(), offset);
    }

    fn set_background_alpha(&self, container: ContainerId, alpha: f32) {
        self.record(HostCall::SetBackgroundAlpha(container, alpha));
        self.alphas.borrow_mut().insert(container, alpha);
    }

    fn layout(&self, container: ContainerId) {
        self.record(HostCall::Layout(container));
    }

    fn push_container(&self, container: ContainerId, screen: &Screen) {
        self.record(HostCall::PushContainer(container, screen.id()));
        self.history.borrow_mut().push(container);
    }

    fn pop_container(&self) {
        self.record(HostCall::PopContainer);
        self.history.borrow_mut().pop();
    }

    fn clear_history(&self) {
        self.record(HostCall::ClearHistory);
        self.history.borrow_mut().clear();
    }
}

// --- Targets ---

/// Builder for an overlay backed by a configurable test target.
#[derive(Debug, Clone)]
pub struct TestOverlay {
    transition: TransitionType,
    alpha: f32,
    observe_keyboard: bool,
    dismiss_on_tap: bool,
    label: String,
    log: Option<HookLog>,
}

impl Default for TestOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl TestOverlay {
    pub fn new() -> Self {
        Self {
            transition: TransitionType::Center,
            alpha: DEFAULT_BACKGROUND_ALPHA,
            observe_keyboard: false,
            dismiss_on_tap: true,
            label: String::new(),
            log: None,
        }
    }

    pub fn transition(mut self, transition: TransitionType) -> Self {
        self.transition = transition;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn observe_keyboard(mut self, observe: bool) -> Self {
        self.observe_keyboard = observe;
        self
    }

    pub fn dismiss_on_tap(mut self, dismiss: bool) -> Self {
        self.dismiss_on_tap = dismiss;
        self
    }

    /// Prefix for log entries.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Record every hook call into `log`.
    pub fn log(mut self, log: &HookLog) -> Self {
        self.log = Some(Rc::clone(log));
        self
    }

    pub fn build(self) -> Overlay {
        Overlay::new(TestTarget {
            config: self,
            events: PresentationEvents::new(),
        })
    }
}

fn entry(label: &str, name: &str) -> String {
    if label.is_empty() {
        name.to_owned()
    } else {
        format!("{label}:{name}")
    }
}

struct TestTarget {
    config: TestOverlay,
    events: PresentationEvents,
}

impl TestTarget {
    fn log(&self, name: &str) {
        if let Some(log) = &self.config.log {
            log.borrow_mut().push(entry(&self.config.label, name));
        }
    }
}

impl PresentationTarget for TestTarget {
    fn transition_type(&self) -> TransitionType {
        self.config.transition
    }

    fn should_observe_keyboard(&self) -> bool {
        self.config.observe_keyboard
    }

    fn background_alpha(&self) -> f32 {
        self.config.alpha
    }

    fn should_dismiss_on_background_tap(&self) -> bool {
        self.config.dismiss_on_tap
    }

    fn events(&self) -> &PresentationEvents {
        &self.events
    }

    fn will_present(&self) {
        self.log("will_present");
    }

    fn did_present(&self) {
        self.log("did_present");
    }

    fn will_dismiss(&self) {
        self.log("will_dismiss");
    }
}

/// Builder for a screen that logs its container adoption.
#[derive(Debug, Clone, Default)]
pub struct TestScreen {
    label: String,
    log: Option<HookLog>,
}

impl TestScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// A screen paired with a fresh log.
    pub fn with_log() -> (Screen, HookLog) {
        let log = hook_log();
        (Self::new().log(&log).build(), log)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn log(mut self, log: &HookLog) -> Self {
        self.log = Some(Rc::clone(log));
        self
    }

    pub fn build(self) -> Screen {
        Screen::new(TestHostedScreen { config: self })
    }
}

struct TestHostedScreen {
    config: TestScreen,
}

impl TestHostedScreen {
    fn log(&self, name: &str, container: ContainerId) {
        if let Some(log) = &self.config.log {
            log.borrow_mut()
                .push(entry(&self.config.label, &format!("{name}:{container}")));
        }
    }
}

impl HostedScreen for TestHostedScreen {
    fn will_move_to_container(&self, container: ContainerId) {
        self.log("will_move", container);
    }

    fn did_move_to_container(&self, container: ContainerId) {
        self.log("did_move", container);
    }
}
