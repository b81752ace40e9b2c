//! Hook ordering, event fan-out, and deferred host materialization.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use presentable_harness::{HookLog, RecordingHost, TestOverlay, TestScreen, hook_log};
use presentable::{
    HostPhase, KeyboardMonitor, NavigatorConfig, Overlay, OverlayContainer, PresentableItem,
    PresentationDelegate, PresentationEvent, PresentationEvents, PresentationStack,
    PresentationTarget, TransitionType,
};

/// Target that records how far the host and container had progressed
/// whenever one of its hooks runs.
struct Probe {
    host: Rc<RecordingHost>,
    root: OverlayContainer,
    log: HookLog,
    events: PresentationEvents,
}

impl Probe {
    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!(
            "{hook} surfaces={} hosted={}",
            self.host.attached_count(),
            self.root.len()
        ));
    }
}

impl PresentationTarget for Probe {
    fn transition_type(&self) -> TransitionType {
        TransitionType::Bottom
    }

    fn events(&self) -> &PresentationEvents {
        &self.events
    }

    fn will_present(&self) {
        self.record("will_present");
    }

    fn did_present(&self) {
        self.record("did_present");
    }

    fn will_dismiss(&self) {
        self.record("will_dismiss");
    }
}

fn stack(host: &Rc<RecordingHost>, config: NavigatorConfig) -> PresentationStack {
    PresentationStack::with_config(host.clone(), KeyboardMonitor::new(), config)
        .expect("valid config")
}

#[test]
fn hooks_bracket_attach_animation_and_detach() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::default());
    let log = hook_log();
    let overlay = Overlay::new(Probe {
        host: Rc::clone(&host),
        root: stack.root(),
        log: Rc::clone(&log),
        events: PresentationEvents::new(),
    });

    stack.present_overlay(&overlay);
    assert_eq!(*log.borrow(), vec!["will_present surfaces=0 hosted=0"]);

    stack.tick(Duration::from_millis(250));
    assert_eq!(log.borrow().len(), 1, "didPresent waits for the animation");

    stack.tick(Duration::from_millis(250));
    stack.pop();
    stack.tick(Duration::from_millis(500));
    assert_eq!(
        *log.borrow(),
        vec![
            "will_present surfaces=0 hosted=0",
            "did_present surfaces=1 hosted=1",
            "will_dismiss surfaces=1 hosted=1",
        ]
    );
    assert!(!host.is_surface_attached(&overlay));
}

#[test]
fn dismissing_mid_animation_completes_the_present_first() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::default());
    let log = hook_log();
    let sheet = TestOverlay::new()
        .transition(TransitionType::Bottom)
        .log(&log)
        .build();

    stack.present_overlay(&sheet);
    stack.tick(Duration::from_millis(100));
    stack.pop_overlay(&sheet);
    assert_eq!(
        *log.borrow(),
        vec!["will_present", "did_present", "will_dismiss"]
    );
}

struct Recorder {
    log: HookLog,
}

impl PresentationDelegate for Recorder {
    fn overlay_will_present(&self, _overlay: &Overlay) {
        self.log.borrow_mut().push("delegate:will_present".into());
    }

    fn overlay_did_present(&self, _overlay: &Overlay) {
        self.log.borrow_mut().push("delegate:did_present".into());
    }

    fn overlay_will_dismiss(&self, _overlay: &Overlay) {
        self.log.borrow_mut().push("delegate:will_dismiss".into());
    }
}

#[test]
fn hook_stream_and_delegate_fire_in_order() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let log = hook_log();
    let overlay = TestOverlay::new().label("hook").log(&log).build();

    let stream_log = Rc::clone(&log);
    let _subscription = overlay.events().subscribe(move |event| {
        stream_log.borrow_mut().push(format!("stream:{event:?}"));
    });
    let delegate = Rc::new(Recorder {
        log: Rc::clone(&log),
    });
    overlay.events().set_delegate(&delegate);

    stack.present_overlay(&overlay);
    stack.pop();
    assert_eq!(
        *log.borrow(),
        vec![
            "hook:will_present",
            "stream:WillPresent",
            "delegate:will_present",
            "hook:did_present",
            "stream:DidPresent",
            "delegate:did_present",
            "hook:will_dismiss",
            "stream:WillDismiss",
            "delegate:will_dismiss",
        ]
    );
}

#[test]
fn screens_receive_no_presentation_hooks() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let log = hook_log();
    let screen = TestScreen::new().label("s1").log(&log).build();
    stack.push_screen(&screen);
    stack.pop();
    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("s1:will_move:container#"));
    assert!(log[1].starts_with("s1:did_move:container#"));
}

#[test]
fn overlays_may_dismiss_themselves_from_a_hook() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let overlay = TestOverlay::new().build();

    let handle = overlay.clone();
    let reentrant = stack.clone();
    let _subscription = overlay.events().subscribe(move |event| {
        if *event == PresentationEvent::DidPresent {
            reentrant.pop_overlay(&handle);
        }
    });

    stack.present_overlay(&overlay);
    assert!(stack.is_empty());
    assert!(!host.is_shown());
    assert_eq!(host.hide_count(), 1);
}

#[test]
fn will_dismiss_sees_the_overlay_still_on_the_stack() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let overlay = TestOverlay::new().build();

    let seen = Rc::new(RefCell::new(None));
    let record = Rc::clone(&seen);
    let handle = overlay.clone();
    let observer = stack.clone();
    let _subscription = overlay.events().subscribe(move |event| {
        if *event == PresentationEvent::WillDismiss {
            *record.borrow_mut() = Some((
                observer.depth(),
                observer.contains(&handle),
                observer.root().contains(&handle),
            ));
        }
    });

    stack.present_overlay(&overlay);
    stack.pop();
    assert_eq!(*seen.borrow(), Some((1, true, true)));
    assert!(stack.is_empty());
    assert!(stack.root().is_empty());
    assert!(!host.is_shown());
}

#[test]
fn popping_again_from_will_dismiss_dismisses_once() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let keep = TestOverlay::new().build();
    let overlay = TestOverlay::new().build();

    let dismissals = Rc::new(RefCell::new(0));
    let count = Rc::clone(&dismissals);
    let handle = overlay.clone();
    let reentrant = stack.clone();
    let _subscription = overlay.events().subscribe(move |event| {
        if *event == PresentationEvent::WillDismiss {
            *count.borrow_mut() += 1;
            reentrant.pop_overlay(&handle);
        }
    });

    stack.present_overlay(&keep);
    stack.present_overlay(&overlay);
    stack.pop();
    assert_eq!(*dismissals.borrow(), 1);
    assert_eq!(stack.items(), vec![PresentableItem::Overlay(keep)]);
    assert!(host.is_shown());
}

#[test]
fn overlay_withdrawn_during_will_present_is_never_attached() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    let overlay = TestOverlay::new().build();

    let handle = overlay.clone();
    let reentrant = stack.clone();
    let _subscription = overlay.events().subscribe(move |event| {
        if *event == PresentationEvent::WillPresent {
            reentrant.pop_overlay(&handle);
        }
    });

    stack.present_overlay(&overlay);
    assert!(stack.is_empty());
    assert!(stack.root().is_empty());
    assert!(!host.is_surface_attached(&overlay));
    assert!(!host.is_shown());
}

#[test]
fn re_presenting_during_dismissal_restarts_cleanly() {
    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::default());
    let keep = TestOverlay::new().build();
    let sheet = TestOverlay::new().transition(TransitionType::Bottom).build();
    stack.present_overlay(&keep);
    stack.present_overlay(&sheet);
    stack.tick(Duration::from_secs(1));

    stack.pop();
    assert!(stack.is_transitioning(&sheet));
    stack.present_overlay(&sheet);
    assert!(stack.contains(&sheet));
    assert!(host.is_surface_attached(&sheet));
    stack.tick(Duration::from_secs(1));
    assert!(host.is_surface_attached(&sheet));
    assert_eq!(stack.depth(), 2);
}

// --- Deferred materialization ---

#[test]
fn deferred_requests_replay_in_order() {
    let host = Rc::new(RecordingHost::deferred());
    let stack = stack(&host, NavigatorConfig::instant());
    let o1 = TestOverlay::new().build();
    let s1 = TestScreen::new().build();
    let o2 = TestOverlay::new().build();

    stack.present_overlay(&o1);
    stack.push_screen(&s1);
    stack.present_overlay(&o2);
    assert_eq!(stack.pending_len(), 3);
    assert_eq!(host.show_count(), 1);
    assert_eq!(host.attached_count(), 0);

    assert!(host.complete_show());
    let items = stack.items();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], PresentableItem::Overlay(o1.clone()));
    assert_eq!(items[1].screen(), Some(&s1));
    assert_eq!(items[2], PresentableItem::Overlay(o2.clone()));
    assert_eq!(host.surface_parent(&o1), Some(stack.root().id()));
    assert_eq!(host.surface_parent(&o2), Some(stack.top_container().id()));
}

#[test]
fn withdrawn_requests_never_run() {
    let host = Rc::new(RecordingHost::deferred());
    let stack = stack(&host, NavigatorConfig::instant());
    let o1 = TestOverlay::new().build();
    let o2 = TestOverlay::new().build();
    stack.present_overlay(&o1);
    stack.present_overlay(&o2);
    stack.pop_overlay(&o1);
    assert_eq!(stack.pending_len(), 1);

    host.complete_show();
    assert_eq!(stack.items(), vec![PresentableItem::Overlay(o2)]);
    assert!(!host.is_surface_attached(&o1));
}

#[test]
fn teardown_waits_for_materialization() {
    let host = Rc::new(RecordingHost::deferred());
    let stack = stack(&host, NavigatorConfig::instant());
    stack.present_overlay(&TestOverlay::new().build());
    stack.pop_all();
    assert_eq!(stack.host_phase(), HostPhase::Materializing);
    assert_eq!(host.hide_count(), 0);

    host.complete_show();
    assert_eq!(stack.host_phase(), HostPhase::Hidden);
    assert_eq!(host.hide_count(), 1);
    assert!(!host.is_shown());
}

#[test]
fn a_new_request_cancels_a_deferred_teardown() {
    let host = Rc::new(RecordingHost::deferred());
    let stack = stack(&host, NavigatorConfig::instant());
    let first = TestOverlay::new().build();
    let second = TestOverlay::new().build();
    stack.present_overlay(&first);
    stack.pop();
    stack.present_overlay(&second);

    host.complete_show();
    assert!(stack.is_host_shown());
    assert_eq!(stack.items(), vec![PresentableItem::Overlay(second)]);
    assert_eq!(host.hide_count(), 0);
    assert_eq!(host.show_count(), 1);
}

#[test]
fn dropped_stack_ignores_late_completion() {
    let host = Rc::new(RecordingHost::deferred());
    {
        let stack = stack(&host, NavigatorConfig::instant());
        stack.present_overlay(&TestOverlay::new().build());
    }
    assert!(host.complete_show());
    assert_eq!(host.attached_count(), 0);
}

#[test]
fn subscribers_can_unsubscribe() {
    let overlay = TestOverlay::new().build();
    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    let subscription = overlay.events().subscribe(move |_| *counter.borrow_mut() += 1);
    assert_eq!(overlay.events().subscriber_count(), 1);
    drop(subscription);

    let host = Rc::new(RecordingHost::new());
    let stack = stack(&host, NavigatorConfig::instant());
    stack.present_overlay(&overlay);
    assert_eq!(*seen.borrow(), 0);
    assert_eq!(overlay.events().subscriber_count(), 0);
}
