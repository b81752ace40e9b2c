#![forbid(unsafe_code)]

//! Test harness for the presentable overlay stack.
//!
//! Re-exports the recording host and scripted targets from
//! `presentable::testing` and carries the end-to-end suites under `tests/`:
//! scenario walkthroughs, lifecycle ordering, structured logging, and
//! property tests over random operation sequences.
//!
//! ```
//! use std::rc::Rc;
//! use presentable::{KeyboardMonitor, NavigatorConfig, PresentationStack};
//! use presentable_harness::{RecordingHost, TestOverlay};
//!
//! let host = Rc::new(RecordingHost::new());
//! let stack = PresentationStack::with_config(
//!     host.clone(),
//!     KeyboardMonitor::new(),
//!     NavigatorConfig::instant(),
//! )?;
//!
//! let popup = TestOverlay::new().alpha(0.5).build();
//! stack.present_overlay(&popup);
//! assert!(host.is_shown());
//! assert_eq!(stack.root().background_alpha(), 0.5);
//!
//! stack.pop();
//! assert!(!host.is_shown());
//! # Ok::<(), presentable::ConfigError>(())
//! ```

pub use presentable::testing::{
    HookLog, HostCall, RecordingHost, TestOverlay, TestScreen, hook_log,
};
