#![forbid(unsafe_code)]

//! Raw input events supplied by the host.
//!
//! # Design Notes
//!
//! - Timestamps come from the host and are never read from a clock here.
//! - `Start::target` is `Some` when the host binds input directly to one
//!   surface's element, `None` when the recognizer should resolve which
//!   surfaces the point hits.
//! - Scroll samples carry no timestamp; they only update the offset that
//!   drift checks read.

use web_time::Instant;

use crate::geometry::Point;
use crate::registry::SurfaceId;
use crate::scroll::ContainerRef;

/// Low-level pointer/touch input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Finger/pointer down.
    Start {
        /// Directly bound surface, or `None` to hit-test all surfaces.
        target: Option<SurfaceId>,
        position: Point,
        timestamp: Instant,
    },

    /// Finger/pointer moved while down.
    Move { position: Point, timestamp: Instant },

    /// Finger/pointer released.
    End { position: Point, timestamp: Instant },

    /// A scroll container reported a new offset.
    Scroll { container: ContainerRef, offset: f64 },
}

impl InputEvent {
    /// A start bound to one surface.
    #[must_use]
    pub fn start_on(target: SurfaceId, position: Point, timestamp: Instant) -> Self {
        Self::Start {
            target: Some(target),
            position,
            timestamp,
        }
    }

    /// A start resolved by hit-testing every surface.
    #[must_use]
    pub fn start_at(position: Point, timestamp: Instant) -> Self {
        Self::Start {
            target: None,
            position,
            timestamp,
        }
    }

    #[must_use]
    pub fn moved(position: Point, timestamp: Instant) -> Self {
        Self::Move {
            position,
            timestamp,
        }
    }

    #[must_use]
    pub fn end(position: Point, timestamp: Instant) -> Self {
        Self::End {
            position,
            timestamp,
        }
    }

    #[must_use]
    pub fn scroll(container: ContainerRef, offset: f64) -> Self {
        Self::Scroll { container, offset }
    }

    /// Host timestamp, for pointer events.
    #[must_use]
    pub fn timestamp(&self) -> Option<Instant> {
        match self {
            Self::Start { timestamp, .. }
            | Self::Move { timestamp, .. }
            | Self::End { timestamp, .. } => Some(*timestamp),
            Self::Scroll { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
