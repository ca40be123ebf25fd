#![forbid(unsafe_code)]

//! Tracked surfaces and their per-surface gesture state.
//!
//! [`SurfaceRegistry`] is the single owner of every [`Surface`] and of the
//! hold timers armed on their behalf. Surfaces are keyed by a monotonically
//! increasing [`SurfaceId`], so iteration order is registration order.
//!
//! # Invariants
//!
//! 1. A surface in [`GestureState::Idle`] has no pending hold timer.
//! 2. Every state-clearing transition (reset, disable, unregister) cancels
//!    the pending timer and bumps the surface's gesture generation, so a
//!    timer that still fires for an older generation is recognizably stale.
//! 3. Surfaces never reference each other.

use std::collections::BTreeMap;

use tracing::{debug, trace};
use web_time::{Duration, Instant};

use crate::event::InputEvent;
use crate::geometry::{GeometryHandle, Point};
use crate::scroll::ContainerRef;
use crate::timer::{TimerQueue, TimerToken};
use crate::touch_event::TouchEventKind;

// ---------------------------------------------------------------------------
// Identifiers and options
// ---------------------------------------------------------------------------

/// Stable identifier of a registered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Wrap a raw id. Ids are normally produced by [`SurfaceRegistry::register`].
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Registration options for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    /// Extend the hit region to the union of the direct children's boxes.
    pub propagate_children: bool,
    /// Scroll container used for drift checks.
    pub container: ContainerRef,
    /// Whether input for this surface is processed at all.
    pub enabled: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            propagate_children: false,
            container: ContainerRef::Root,
            enabled: true,
        }
    }
}

impl SurfaceOptions {
    #[must_use]
    pub fn propagate_children(mut self, propagate: bool) -> Self {
        self.propagate_children = propagate;
        self
    }

    #[must_use]
    pub fn container(mut self, container: impl Into<ContainerRef>) -> Self {
        self.container = container.into();
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// Per-surface gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    /// No interaction in progress.
    #[default]
    Idle,
    /// Contact began inside the surface and has not reached the hold threshold.
    Tapping,
    /// Contact began elsewhere and moved into the surface.
    Entered,
    /// Hold threshold elapsed while the interaction stayed valid.
    Holding,
}

impl GestureState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Payload of a hold timer: enough to emit `touch-hold` without looking
/// anything else up, plus the generation that makes stale fires detectable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HoldRequest {
    pub(crate) surface: SurfaceId,
    pub(crate) generation: u64,
    pub(crate) position: Point,
    pub(crate) raw: InputEvent,
}

/// A tracked interactive region.
#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    handle: GeometryHandle,
    pub(crate) propagate_children: bool,
    pub(crate) container: ContainerRef,
    pub(crate) enabled: bool,
    pub(crate) state: GestureState,
    pub(crate) gesture_start: Option<Instant>,
    pub(crate) scroll_baseline: f64,
    pub(crate) pending_timer: Option<TimerToken>,
    pub(crate) generation: u64,
    pub(crate) drifted: bool,
    pub(crate) last_event: Option<TouchEventKind>,
}

impl Surface {
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Geometry handle the surface was registered with.
    #[must_use]
    pub fn handle(&self) -> GeometryHandle {
        self.handle
    }

    #[must_use]
    pub fn propagates_children(&self) -> bool {
        self.propagate_children
    }

    #[must_use]
    pub fn container(&self) -> ContainerRef {
        self.container
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// When the current interaction began; `None` while idle.
    #[must_use]
    pub fn gesture_start(&self) -> Option<Instant> {
        self.gesture_start
    }

    /// Container offset captured when the current gesture began.
    #[must_use]
    pub fn scroll_baseline(&self) -> f64 {
        self.scroll_baseline
    }

    /// Whether a hold timer is armed for this surface.
    #[must_use]
    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.is_some()
    }

    /// Drift observed at the last scroll tick.
    #[must_use]
    pub fn has_drifted(&self) -> bool {
        self.drifted
    }

    /// Kind of the most recent event emitted for this surface.
    ///
    /// Survives the reset that follows a terminal event, so hosts can style
    /// a surface by its last interaction outcome.
    #[must_use]
    pub fn last_event(&self) -> Option<TouchEventKind> {
        self.last_event
    }
}

// ---------------------------------------------------------------------------
// SurfaceRegistry
// ---------------------------------------------------------------------------

/// Owner of every tracked surface and its hold timer.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: BTreeMap<SurfaceId, Surface>,
    timers: TimerQueue<HoldRequest>,
    next_id: u64,
}

impl SurfaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking the element behind `handle`.
    ///
    /// Registering the same handle twice yields two independent surfaces.
    pub fn register(&mut self, handle: GeometryHandle, options: SurfaceOptions) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.insert(
            id,
            Surface {
                id,
                handle,
                propagate_children: options.propagate_children,
                container: options.container,
                enabled: options.enabled,
                state: GestureState::Idle,
                gesture_start: None,
                scroll_baseline: 0.0,
                pending_timer: None,
                generation: 0,
                drifted: false,
                last_event: None,
            },
        );
        debug!(surface = id.0, handle = handle.0, "surface registered");
        id
    }

    /// Stop tracking a surface, abandoning any in-flight gesture.
    ///
    /// Returns `false` if the id is unknown.
    pub fn unregister(&mut self, id: SurfaceId) -> bool {
        if !self.reset(id) {
            return false;
        }
        self.surfaces.remove(&id);
        debug!(surface = id.0, "surface unregistered");
        true
    }

    /// Enable or disable a surface. Disabling mid-gesture abandons the
    /// gesture without emitting anything.
    pub fn set_enabled(&mut self, id: SurfaceId, enabled: bool) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return false;
        };
        surface.enabled = enabled;
        if !enabled {
            self.reset(id);
        }
        debug!(surface = id.0, enabled, "surface enabled changed");
        true
    }

    /// Change the scroll container. An in-flight baseline is kept as is.
    pub fn set_container(&mut self, id: SurfaceId, container: impl Into<ContainerRef>) -> bool {
        match self.surfaces.get_mut(&id) {
            Some(surface) => {
                surface.container = container.into();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    #[must_use]
    pub fn state(&self, id: SurfaceId) -> Option<GestureState> {
        self.surfaces.get(&id).map(|s| s.state)
    }

    /// Snapshot of ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.surfaces.keys().copied().collect()
    }

    /// Surfaces in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Surface> {
        self.surfaces.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Number of armed hold timers across all surfaces.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest hold deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Return a surface to Idle: cancel its timer and invalidate its generation.
    pub(crate) fn reset(&mut self, id: SurfaceId) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return false;
        };
        if let Some(token) = surface.pending_timer.take() {
            self.timers.cancel(token);
        }
        surface.state = GestureState::Idle;
        surface.gesture_start = None;
        surface.drifted = false;
        surface.generation += 1;
        true
    }

    /// Arm (or re-arm) the hold timer of a surface for its current generation.
    pub(crate) fn arm_hold(
        &mut self,
        id: SurfaceId,
        now: Instant,
        delay: Duration,
        position: Point,
        raw: InputEvent,
    ) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        if let Some(token) = surface.pending_timer.take() {
            self.timers.cancel(token);
        }
        let request = HoldRequest {
            surface: id,
            generation: surface.generation,
            position,
            raw,
        };
        surface.pending_timer = self.timers.arm(now, delay, request);
        if surface.pending_timer.is_none() {
            trace!(surface = id.0, "hold deadline out of range, timer not armed");
        }
    }

    /// Pop every hold timer due at `now`, detaching fired tokens from their surfaces.
    pub(crate) fn expire_holds(&mut self, now: Instant) -> Vec<HoldRequest> {
        let fired = self.timers.expire(now);
        let mut requests = Vec::with_capacity(fired.len());
        for (token, request) in fired {
            if let Some(surface) = self.surfaces.get_mut(&request.surface)
                && surface.pending_timer == Some(token)
            {
                surface.pending_timer = None;
            }
            requests.push(request);
        }
        requests
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_250: Duration = Duration::from_millis(250);

    fn arm(reg: &mut SurfaceRegistry, id: SurfaceId, t: Instant) {
        reg.get_mut(id).unwrap().state = GestureState::Tapping;
        reg.arm_hold(
            id,
            t,
            MS_250,
            Point::default(),
            InputEvent::start_on(id, Point::default(), t),
        );
    }

    #[test]
    fn ids_are_fresh_and_in_registration_order() {
        let mut reg = SurfaceRegistry::new();
        let h = GeometryHandle(7);
        let a = reg.register(h, SurfaceOptions::default());
        let b = reg.register(h, SurfaceOptions::default());
        let c = reg.register(GeometryHandle(1), SurfaceOptions::default());

        assert_ne!(a, b);
        assert_eq!(reg.ids(), vec![a, b, c]);
        assert_eq!(reg.get(a).unwrap().handle(), reg.get(b).unwrap().handle());
    }

    #[test]
    fn options_are_applied() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(
            GeometryHandle(1),
            SurfaceOptions::default()
                .propagate_children(true)
                .container(GeometryHandle(9))
                .enabled(false),
        );
        let s = reg.get(id).unwrap();
        assert!(s.propagates_children());
        assert_eq!(s.container(), ContainerRef::Element(GeometryHandle(9)));
        assert!(!s.is_enabled());
        assert_eq!(s.state(), GestureState::Idle);
    }

    #[test]
    fn unregister_cancels_timer_and_unknown_is_noop() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(GeometryHandle(1), SurfaceOptions::default());
        let t = Instant::now();
        arm(&mut reg, id, t);
        assert_eq!(reg.pending_timers(), 1);

        assert!(reg.unregister(id));
        assert_eq!(reg.pending_timers(), 0);
        assert!(reg.is_empty());
        assert!(!reg.unregister(id));
        assert!(reg.expire_holds(t + MS_250).is_empty());
    }

    #[test]
    fn disabling_mid_gesture_resets() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(GeometryHandle(1), SurfaceOptions::default());
        arm(&mut reg, id, Instant::now());

        assert!(reg.set_enabled(id, false));
        let s = reg.get(id).unwrap();
        assert_eq!(s.state(), GestureState::Idle);
        assert!(!s.has_pending_timer());
        assert_eq!(reg.pending_timers(), 0);
        assert!(!reg.set_enabled(SurfaceId::from_raw(99), true));
    }

    #[test]
    fn set_container_keeps_baseline() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(GeometryHandle(1), SurfaceOptions::default());
        reg.get_mut(id).unwrap().scroll_baseline = 30.0;

        assert!(reg.set_container(id, GeometryHandle(5)));
        let s = reg.get(id).unwrap();
        assert_eq!(s.container(), ContainerRef::Element(GeometryHandle(5)));
        assert_eq!(s.scroll_baseline(), 30.0);
        assert!(!reg.set_container(SurfaceId::from_raw(42), ContainerRef::Root));
    }

    #[test]
    fn reset_bumps_generation_so_old_requests_are_stale() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(GeometryHandle(1), SurfaceOptions::default());
        let before = reg.get(id).unwrap().generation;
        reg.reset(id);
        assert_eq!(reg.get(id).unwrap().generation, before + 1);
    }

    #[test]
    fn rearming_replaces_pending_timer() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(GeometryHandle(1), SurfaceOptions::default());
        let t = Instant::now();
        arm(&mut reg, id, t);
        arm(&mut reg, id, t + Duration::from_millis(100));
        assert_eq!(reg.pending_timers(), 1);

        assert!(reg.expire_holds(t + MS_250).is_empty());
        let fired = reg.expire_holds(t + Duration::from_millis(350));
        assert_eq!(fired.len(), 1);
        assert!(!reg.get(id).unwrap().has_pending_timer());
    }
}
