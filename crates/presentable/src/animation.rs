#![forbid(unsafe_code)]

//! Tick-driven spring transitions for presenting and dismissing overlays.
//!
//! The animator owns no clock. The stack feeds it elapsed time through
//! [`TransitionAnimator::tick`] and applies the returned placements to the
//! host; finished transitions are handed back for completion.
//!
//! # Motion
//!
//! | Style | Present | Dismiss |
//! |-------|---------|---------|
//! | Bottom | slides up from below the edge | slides down below the edge |
//! | Center | scales up from `min_scale` | removed immediately |
//!
//! A bottom dismiss of a surface that was never attached also completes
//! immediately, as does everything under reduced motion.
//!
//! # Invariants
//!
//! - At most one transition per overlay is active at a time.
//! - `SpringCurve::progress` is 0.0 at the start and exactly 1.0 once the
//!   duration has elapsed.

use std::time::Duration;

use crate::config::{NavigatorConfig, SpringConfig};
use crate::host::Placement;
use crate::target::{Overlay, TransitionType};

/// `ln(1000)`: the envelope decays to 0.1% of the travel at `duration`.
const SETTLE_DECAY: f64 = 6.907_755_278_982_137;

/// Which way a transition moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionDirection {
    Present,
    Dismiss,
}

/// Identifier of one started transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionHandle(u64);

impl TransitionHandle {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A transition that was started, and possibly finished.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub handle: TransitionHandle,
    pub overlay: Overlay,
    pub direction: TransitionDirection,
    pub style: TransitionType,
}

/// Outcome of [`TransitionAnimator::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionStart {
    /// Running; apply `initial` before the first frame.
    Running {
        handle: TransitionHandle,
        initial: Placement,
    },
    /// Nothing to animate; complete right away.
    Finished(Transition),
}

/// Placements and completions produced by one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    pub placements: Vec<(Overlay, Placement)>,
    pub finished: Vec<Transition>,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty() && self.finished.is_empty()
    }
}

/// Damped spring from 0.0 to 1.0 over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringCurve {
    duration: Duration,
    damping: f64,
    initial_velocity: f64,
}

impl SpringCurve {
    pub fn new(config: &SpringConfig) -> Self {
        Self {
            duration: config.duration,
            damping: config.damping.clamp(f64::EPSILON, 1.0),
            initial_velocity: config.initial_velocity,
        }
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Progress at `elapsed`. May overshoot 1.0 for underdamped springs.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return 1.0;
        }
        let total = self.duration.as_secs_f64();
        let t = elapsed.as_secs_f64();
        let zeta = self.damping;
        let omega = SETTLE_DECAY / (zeta * total);
        let v0 = self.initial_velocity;
        let y0 = -1.0;

        let displacement = if zeta < 1.0 {
            let damped = omega * (1.0 - zeta * zeta).sqrt();
            let envelope = (-zeta * omega * t).exp();
            envelope
                * (y0 * (damped * t).cos() + ((v0 + zeta * omega * y0) / damped) * (damped * t).sin())
        } else {
            (-omega * t).exp() * (y0 + (v0 + omega * y0) * t)
        };
        1.0 + displacement
    }
}

struct ActiveTransition {
    transition: Transition,
    curve: SpringCurve,
    min_scale: f64,
    elapsed: Duration,
}

impl ActiveTransition {
    fn placement(&self) -> Placement {
        let progress = self.curve.progress(self.elapsed);
        placement_at(
            self.transition.style,
            self.transition.direction,
            progress,
            self.min_scale,
        )
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.curve.duration()
    }
}

fn placement_at(
    style: TransitionType,
    direction: TransitionDirection,
    progress: f64,
    min_scale: f64,
) -> Placement {
    match (style, direction) {
        (TransitionType::Bottom, TransitionDirection::Present) => Placement::offset(1.0 - progress),
        (TransitionType::Bottom, TransitionDirection::Dismiss) => Placement::offset(progress),
        (TransitionType::Center, TransitionDirection::Present) => {
            Placement::scaled(min_scale + (1.0 - min_scale) * progress)
        }
        (TransitionType::Center, TransitionDirection::Dismiss) => Placement::RESTING,
    }
}

/// Set of running transitions, advanced by [`tick`](Self::tick).
#[derive(Default)]
pub struct TransitionAnimator {
    active: Vec<ActiveTransition>,
    next_handle: u64,
}

impl std::fmt::Debug for TransitionAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionAnimator")
            .field("active", &self.active.len())
            .finish()
    }
}

impl TransitionAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start moving `overlay` in `direction`.
    ///
    /// `attached` reports whether the overlay's surface has a parent;
    /// a bottom dismiss of a detached surface has nothing to animate.
    pub fn start(
        &mut self,
        overlay: &Overlay,
        direction: TransitionDirection,
        config: &NavigatorConfig,
        attached: bool,
    ) -> TransitionStart {
        let style = overlay.transition_type();
        self.next_handle += 1;
        let transition = Transition {
            handle: TransitionHandle(self.next_handle),
            overlay: overlay.clone(),
            direction,
            style,
        };

        let spring = match style {
            TransitionType::Bottom => &config.bottom,
            TransitionType::Center => &config.center,
        };
        let immediate = config.reduced_motion
            || spring.duration.is_zero()
            || match (style, direction) {
                (TransitionType::Center, TransitionDirection::Dismiss) => true,
                (TransitionType::Bottom, TransitionDirection::Dismiss) => !attached,
                (_, TransitionDirection::Present) => false,
            };
        if immediate {
            tracing::trace!(overlay = %overlay.id(), ?direction, ?style, "transition completes immediately");
            return TransitionStart::Finished(transition);
        }

        debug_assert!(
            !self.is_animating(overlay),
            "overlay already has an active transition"
        );
        let active = ActiveTransition {
            transition,
            curve: SpringCurve::new(spring),
            min_scale: config.min_scale,
            elapsed: Duration::ZERO,
        };
        let handle = active.transition.handle;
        let initial = active.placement();
        tracing::trace!(overlay = %overlay.id(), ?direction, ?style, handle = handle.get(), "transition started");
        self.active.push(active);
        TransitionStart::Running { handle, initial }
    }

    /// Advance every running transition by `delta`.
    pub fn tick(&mut self, delta: Duration) -> FrameUpdate {
        let mut update = FrameUpdate::default();
        if self.active.is_empty() {
            return update;
        }
        for active in &mut self.active {
            active.elapsed = active.elapsed.saturating_add(delta);
        }
        let (done, running): (Vec<_>, Vec<_>) =
            self.active.drain(..).partition(ActiveTransition::is_done);
        for active in &running {
            update
                .placements
                .push((active.transition.overlay.clone(), active.placement()));
        }
        update.finished = done.into_iter().map(|active| active.transition).collect();
        self.active = running;
        update
    }

    /// Stop the overlay's transition at its end state and return it.
    pub fn finish(&mut self, overlay: &Overlay) -> Option<Transition> {
        let index = self
            .active
            .iter()
            .position(|active| active.transition.overlay == *overlay)?;
        Some(self.active.remove(index).transition)
    }

    /// Stop every transition, oldest first.
    pub fn drain(&mut self) -> Vec<Transition> {
        self.active
            .drain(..)
            .map(|active| active.transition)
            .collect()
    }

    pub fn is_animating(&self, overlay: &Overlay) -> bool {
        self.active
            .iter()
            .any(|active| active.transition.overlay == *overlay)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PresentationEvents;
    use crate::target::PresentationTarget;

    struct Surface {
        style: TransitionType,
        events: PresentationEvents,
    }

    impl PresentationTarget for Surface {
        fn transition_type(&self) -> TransitionType {
            self.style
        }

        fn events(&self) -> &PresentationEvents {
            &self.events
        }
    }

    fn overlay(style: TransitionType) -> Overlay {
        Overlay::new(Surface {
            style,
            events: PresentationEvents::new(),
        })
    }

    fn peak(curve: &SpringCurve) -> f64 {
        (0..=600)
            .map(|ms| curve.progress(Duration::from_millis(ms)))
            .fold(f64::MIN, f64::max)
    }

    #[test]
    fn curve_endpoints() {
        for spring in [SpringConfig::BOTTOM, SpringConfig::CENTER] {
            let curve = SpringCurve::new(&spring);
            assert!(curve.progress(Duration::ZERO).abs() < 1e-9);
            assert_eq!(curve.progress(spring.duration), 1.0);
            assert_eq!(curve.progress(spring.duration * 2), 1.0);
        }
    }

    #[test]
    fn center_spring_overshoots_and_bottom_barely_does() {
        assert!(peak(&SpringCurve::new(&SpringConfig::CENTER)) > 1.0);
        assert!(peak(&SpringCurve::new(&SpringConfig::BOTTOM)) <= 1.01);
    }

    #[test]
    fn critically_damped_curve_is_monotonic() {
        let curve = SpringCurve::new(&SpringConfig::new(Duration::from_millis(300), 1.0, 0.0));
        let mut last = curve.progress(Duration::ZERO);
        for ms in 1..=300 {
            let next = curve.progress(Duration::from_millis(ms));
            assert!(next >= last - 1e-12, "regressed at {ms}ms");
            last = next;
        }
    }

    #[test]
    fn bottom_present_starts_below_the_edge() {
        let mut animator = TransitionAnimator::new();
        let sheet = overlay(TransitionType::Bottom);
        let start = animator.start(
            &sheet,
            TransitionDirection::Present,
            &NavigatorConfig::default(),
            true,
        );
        match start {
            TransitionStart::Running { initial, .. } => assert_eq!(initial.offset, 1.0),
            other => panic!("expected running transition, got {other:?}"),
        }
        assert!(animator.is_animating(&sheet));

        let mid = animator.tick(Duration::from_millis(100));
        assert_eq!(mid.placements.len(), 1);
        assert!(mid.placements[0].1.offset < 1.0);

        let end = animator.tick(Duration::from_millis(400));
        assert!(end.placements.is_empty());
        assert_eq!(end.finished.len(), 1);
        assert_eq!(end.finished[0].overlay, sheet);
        assert!(animator.is_empty());
    }

    #[test]
    fn center_present_scales_from_min() {
        let mut animator = TransitionAnimator::new();
        let popup = overlay(TransitionType::Center);
        let config = NavigatorConfig::default().min_scale(0.5);
        match animator.start(&popup, TransitionDirection::Present, &config, true) {
            TransitionStart::Running { initial, .. } => assert_eq!(initial.scale, 0.5),
            other => panic!("expected running transition, got {other:?}"),
        }
    }

    #[test]
    fn immediate_cases() {
        let mut animator = TransitionAnimator::new();
        let config = NavigatorConfig::default();
        let popup = overlay(TransitionType::Center);
        let sheet = overlay(TransitionType::Bottom);

        assert!(matches!(
            animator.start(&popup, TransitionDirection::Dismiss, &config, true),
            TransitionStart::Finished(_)
        ));
        assert!(matches!(
            animator.start(&sheet, TransitionDirection::Dismiss, &config, false),
            TransitionStart::Finished(_)
        ));
        assert!(matches!(
            animator.start(&sheet, TransitionDirection::Present, &NavigatorConfig::instant(), true),
            TransitionStart::Finished(_)
        ));
        let zero = config.bottom(SpringConfig::new(Duration::ZERO, 0.9, 0.8));
        assert!(matches!(
            animator.start(&sheet, TransitionDirection::Present, &zero, true),
            TransitionStart::Finished(_)
        ));
        assert!(animator.is_empty());
    }

    #[test]
    fn bottom_dismiss_animates_when_attached() {
        let mut animator = TransitionAnimator::new();
        let sheet = overlay(TransitionType::Bottom);
        let start = animator.start(
            &sheet,
            TransitionDirection::Dismiss,
            &NavigatorConfig::default(),
            true,
        );
        assert!(matches!(start, TransitionStart::Running { .. }));
        let frame = animator.tick(Duration::from_millis(250));
        assert!(frame.placements[0].1.offset > 0.0);
    }

    #[test]
    fn finish_and_drain() {
        let mut animator = TransitionAnimator::new();
        let config = NavigatorConfig::default();
        let a = overlay(TransitionType::Bottom);
        let b = overlay(TransitionType::Center);
        let _ = animator.start(&a, TransitionDirection::Present, &config, true);
        let _ = animator.start(&b, TransitionDirection::Present, &config, true);

        let finished = animator.finish(&a).expect("a is running");
        assert_eq!(finished.direction, TransitionDirection::Present);
        assert!(animator.finish(&a).is_none());

        let drained = animator.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].overlay, b);
        assert!(animator.tick(Duration::from_millis(16)).is_empty());
    }
}
