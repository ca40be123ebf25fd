#![forbid(unsafe_code)]

//! Scroll drift detection.
//!
//! A tap that turns into a scroll is not a tap. At the start of every
//! gesture the recognizer captures a baseline offset for each surface's
//! scroll container; any later check compares the live offset against that
//! baseline. Drift is measured relative to where the gesture began, never
//! continuously re-based.
//!
//! Offsets come from two places. Hosts may push them as
//! [`InputEvent::Scroll`](crate::event::InputEvent::Scroll) samples, or let
//! the tracker poll [`Scene::scroll_offset`]. A pushed sample wins over the
//! polled value for the same container.

use ahash::AHashMap;

use crate::geometry::{GeometryHandle, Scene};

/// The scroll container a surface lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContainerRef {
    /// The document / window-level scroll.
    #[default]
    Root,
    /// An overflowing ancestor element.
    Element(GeometryHandle),
}

impl From<GeometryHandle> for ContainerRef {
    fn from(handle: GeometryHandle) -> Self {
        Self::Element(handle)
    }
}

/// Latest known scroll offsets, keyed by container.
#[derive(Debug, Clone, Default)]
pub struct ScrollTracker {
    pushed: AHashMap<ContainerRef, f64>,
}

impl ScrollTracker {
    /// Create a tracker with no pushed samples.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pushed scroll sample.
    pub fn record(&mut self, container: ContainerRef, offset: f64) {
        self.pushed.insert(container, offset);
    }

    /// Drop the pushed sample for `container`, reverting to polling.
    pub fn forget(&mut self, container: ContainerRef) -> bool {
        self.pushed.remove(&container).is_some()
    }

    /// Current offset of `container`. Unknown containers read as zero.
    #[must_use]
    pub fn offset<S: Scene + ?Sized>(&self, scene: &S, container: ContainerRef) -> f64 {
        self.pushed
            .get(&container)
            .copied()
            .or_else(|| scene.scroll_offset(container))
            .unwrap_or(0.0)
    }

    /// Capture the offset a new gesture is measured against.
    #[inline]
    #[must_use]
    pub fn baseline<S: Scene + ?Sized>(&self, scene: &S, container: ContainerRef) -> f64 {
        self.offset(scene, container)
    }

    /// Whether `container` has moved at least `epsilon` away from `baseline`.
    #[must_use]
    pub fn has_drifted<S: Scene + ?Sized>(
        &self,
        scene: &S,
        container: ContainerRef,
        baseline: f64,
        epsilon: f64,
    ) -> bool {
        (self.offset(scene, container) - baseline).abs() >= epsilon
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
