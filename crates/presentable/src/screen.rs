#![forbid(unsafe_code)]

//! Full-screen destinations pushed onto the host navigation history.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::host::ContainerId;

/// Global counter for unique screen IDs.
static SCREEN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a screen handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(u64);

impl ScreenId {
    fn next() -> Self {
        Self(SCREEN_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen#{}", self.0)
    }
}

/// A screen that can be adopted by an overlay container.
///
/// Screens use the host's own push/pop transition and receive no
/// present/dismiss hooks; they only learn which container hosts them.
pub trait HostedScreen {
    /// Called before the container adopts this screen as its sole child.
    fn will_move_to_container(&self, _container: ContainerId) {}

    /// Called once the container has adopted this screen.
    fn did_move_to_container(&self, _container: ContainerId) {}
}

/// Cloneable identity handle for a pushed screen.
#[derive(Clone)]
pub struct Screen {
    id: ScreenId,
    hosted: Rc<dyn HostedScreen>,
}

impl Screen {
    pub fn new(screen: impl HostedScreen + 'static) -> Self {
        Self::from_rc(Rc::new(screen))
    }

    pub fn from_rc(hosted: Rc<dyn HostedScreen>) -> Self {
        Self {
            id: ScreenId::next(),
            hosted,
        }
    }

    #[inline]
    pub fn id(&self) -> ScreenId {
        self.id
    }

    pub fn hosted(&self) -> &dyn HostedScreen {
        &*self.hosted
    }
}

impl PartialEq for Screen {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Screen {}

impl Hash for Screen {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen").field("id", &self.id).finish()
    }
}
