#![forbid(unsafe_code)]

//! Semantic touch events emitted by the recognizer.
//!
//! # Invariants
//!
//! Per surface, the emitted sequence is well-formed:
//! 1. A gesture opens with `Tap` (start inside) or `TouchEnter` (moved in).
//! 2. `TouchHold` occurs at most once, and only inside an open gesture.
//! 3. A gesture closes with exactly one of `Tapped`, `TouchRelease`, or
//!    `TouchLeave`, or closes silently (debounced end, disable, unregister).

use std::fmt;

use bitflags::bitflags;

use crate::event::InputEvent;
use crate::geometry::Point;
use crate::registry::SurfaceId;

/// The six semantic event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    /// Contact began inside the surface.
    Tap,
    /// Short contact released inside the surface.
    Tapped,
    /// Contact held past the hold threshold.
    TouchHold,
    /// Held or entered contact released inside the surface.
    TouchRelease,
    /// Contact that began elsewhere moved into the surface.
    TouchEnter,
    /// Contact left the surface, or the container scrolled.
    TouchLeave,
}

impl TouchEventKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Tap,
        Self::Tapped,
        Self::TouchHold,
        Self::TouchRelease,
        Self::TouchEnter,
        Self::TouchLeave,
    ];

    /// Hyphenated event name (`"touch-hold"`), usable as a style class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::Tapped => "tapped",
            Self::TouchHold => "touch-hold",
            Self::TouchRelease => "touch-release",
            Self::TouchEnter => "touch-enter",
            Self::TouchLeave => "touch-leave",
        }
    }

    /// The mask bit selecting this kind.
    #[must_use]
    pub const fn mask(self) -> TouchEventMask {
        match self {
            Self::Tap => TouchEventMask::TAP,
            Self::Tapped => TouchEventMask::TAPPED,
            Self::TouchHold => TouchEventMask::TOUCH_HOLD,
            Self::TouchRelease => TouchEventMask::TOUCH_RELEASE,
            Self::TouchEnter => TouchEventMask::TOUCH_ENTER,
            Self::TouchLeave => TouchEventMask::TOUCH_LEAVE,
        }
    }

    /// True for kinds that end a gesture.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Tapped | Self::TouchRelease | Self::TouchLeave)
    }

    /// True for kinds that begin a gesture.
    #[must_use]
    pub const fn opens_gesture(self) -> bool {
        matches!(self, Self::Tap | Self::TouchEnter)
    }
}

impl fmt::Display for TouchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of event kinds a subscriber wants to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TouchEventMask: u8 {
        const TAP           = 0b0000_0001;
        const TAPPED        = 0b0000_0010;
        const TOUCH_HOLD    = 0b0000_0100;
        const TOUCH_RELEASE = 0b0000_1000;
        const TOUCH_ENTER   = 0b0001_0000;
        const TOUCH_LEAVE   = 0b0010_0000;
        /// Every kind that closes a gesture.
        const TERMINAL = Self::TAPPED.bits() | Self::TOUCH_RELEASE.bits() | Self::TOUCH_LEAVE.bits();
    }
}

impl From<TouchEventKind> for TouchEventMask {
    fn from(kind: TouchEventKind) -> Self {
        kind.mask()
    }
}

/// A semantic event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchEventKind,
    /// Pointer position the event refers to. For `TouchHold` this is the
    /// position captured when the hold timer was armed.
    pub position: Point,
    pub target: SurfaceId,
    /// The raw input that produced the event.
    pub raw: InputEvent,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
