#![forbid(unsafe_code)]

//! Stacked overlay presentation.
//!
//! A [`PresentationStack`] keeps an ordered stack of overlays (sheets,
//! popups) and pushed screens above a single shared host context. It
//! materializes the host on first use, tears it down when the stack
//! empties, sequences lifecycle hooks around spring transitions, and lets
//! each [`OverlayContainer`] derive background dimming and keyboard
//! avoidance from the overlays it hosts.
//!
//! Everything view-related goes through [`HostEnvironment`]. The
//! `test-helpers` feature exposes a recording host and scripted targets in
//! `testing`; the `presentable-harness` crate builds on them.

pub mod animation;
pub mod config;
pub mod container;
pub mod events;
pub mod host;
pub mod item;
pub mod keyboard;
pub mod navigator;
pub mod screen;
pub mod target;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use animation::{
    FrameUpdate, SpringCurve, Transition, TransitionAnimator, TransitionDirection,
    TransitionHandle, TransitionStart,
};
pub use config::{ConfigError, NavigatorConfig, SpringConfig};
pub use container::{BackgroundTapRecognizer, OverlayContainer, TapGesture, TouchTarget};
pub use events::{PresentationDelegate, PresentationEvent, PresentationEvents};
pub use host::{ContainerId, HostCompletion, HostEnvironment, Placement};
pub use item::PresentableItem;
pub use keyboard::KeyboardMonitor;
pub use navigator::{HostPhase, PresentationStack};
pub use presentable_runtime::Subscription;
pub use screen::{HostedScreen, Screen, ScreenId};
pub use target::{
    DEFAULT_BACKGROUND_ALPHA, KeyboardAnchor, Overlay, OverlayId, PresentationTarget,
    TransitionType,
};
