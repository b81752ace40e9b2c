#![forbid(unsafe_code)]

//! Unit of bookkeeping on the presentation stack.

use crate::container::OverlayContainer;
use crate::screen::Screen;
use crate::target::Overlay;

/// One entry of the presentation stack.
///
/// An overlay entry lives inside whichever container was topmost when it
/// was presented; a screen entry *is* the container created for the
/// pushed screen. Equality is identity of the wrapped handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentableItem {
    Overlay(Overlay),
    Screen(OverlayContainer),
}

impl PresentableItem {
    pub fn overlay(&self) -> Option<&Overlay> {
        match self {
            Self::Overlay(overlay) => Some(overlay),
            Self::Screen(_) => None,
        }
    }

    /// The container created for a pushed screen.
    pub fn container(&self) -> Option<&OverlayContainer> {
        match self {
            Self::Overlay(_) => None,
            Self::Screen(container) => Some(container),
        }
    }

    /// The pushed screen itself.
    pub fn screen(&self) -> Option<&Screen> {
        self.container().and_then(OverlayContainer::screen)
    }

    #[inline]
    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::Overlay(_))
    }

    #[inline]
    pub fn is_screen(&self) -> bool {
        matches!(self, Self::Screen(_))
    }
}
