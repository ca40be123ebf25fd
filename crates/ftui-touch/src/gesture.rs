#![forbid(unsafe_code)]

//! Touch recognition: turns raw pointer input into semantic touch events.
//!
//! [`TouchRecognizer`] tracks any number of surfaces sharing one input
//! stream. Each surface runs its own state machine:
//!
//! ```text
//!            start (inside)              timer
//!   Idle ─────────────────────► Tapping ───────► Holding
//!    ▲ │ move in                  │ end: tapped     │ end: touch-release
//!    │ └──────────► Entered ──────┼─────────────────┤
//!    │               │ timer ─► Holding             │
//!    └───────────────┴── move out / scroll: touch-leave
//! ```
//!
//! # Invariants
//!
//! 1. A surface is Idle iff it has no in-flight gesture; Idle surfaces never
//!    hold an armed timer.
//! 2. While a surface is Tapping, moves are ignored: the contact began
//!    inside, so enter/leave do not apply until it is released or held.
//! 3. A hold timer acts only if the generation it captured still matches
//!    the surface and the surface is still Tapping or Entered.
//! 4. Disabling or unregistering a surface abandons its gesture silently.
//! 5. Events are published after the handler producing them has finished
//!    updating state, in the order they were produced.
//!
//! # Failure Modes
//!
//! - An end within `end_debounce` of a tap start is dropped silently. Such
//!   ends arrive when a scroll begins right after contact and the input
//!   layer still reports a near-simultaneous release.
//! - If the container scrolls past `scroll_epsilon` since the gesture began,
//!   the next move or end resolves the gesture as a leave, and a pending
//!   hold does nothing.
//! - A surface whose element left the scene never hits, so its gesture
//!   resolves as a leave on the next check.

use tracing::{debug, trace, trace_span};
use web_time::Instant;

use crate::bus::{EventBus, SubscriptionToken};
use crate::config::{GestureConfig, HitPolicy};
use crate::event::InputEvent;
use crate::geometry::{GeometryHandle, GeometryOracle, Point, Scene, SceneGraph};
use crate::registry::{GestureState, Surface, SurfaceId, SurfaceOptions, SurfaceRegistry};
use crate::scroll::{ContainerRef, ScrollTracker};
use crate::touch_event::{TouchEvent, TouchEventKind, TouchEventMask};

// ---------------------------------------------------------------------------
// TouchRecognizer
// ---------------------------------------------------------------------------

/// Stateful recognizer for tap, hold, and enter/leave gestures.
///
/// Feed raw input through [`process`](TouchRecognizer::process) and call
/// [`tick`](TouchRecognizer::tick) when [`next_deadline`](TouchRecognizer::next_deadline)
/// passes, so holds fire without waiting for the next input.
pub struct TouchRecognizer<S: Scene = SceneGraph> {
    config: GestureConfig,
    scene: S,
    registry: SurfaceRegistry,
    scroll: ScrollTracker,
    bus: EventBus,
}

impl<S: Scene> std::fmt::Debug for TouchRecognizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TouchRecognizer")
            .field("surfaces", &self.registry.len())
            .field("pending_timers", &self.registry.pending_timers())
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

impl<S: Scene> TouchRecognizer<S> {
    /// Create a recognizer over `scene`.
    #[must_use]
    pub fn new(config: GestureConfig, scene: S) -> Self {
        Self {
            config,
            scene,
            registry: SurfaceRegistry::new(),
            scroll: ScrollTracker::new(),
            bus: EventBus::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replace the configuration. In-flight timers keep their deadlines.
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene, for hosts that move elements around.
    #[inline]
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    // --- Registration -----------------------------------------------------

    /// Track the element behind `handle` as a surface.
    ///
    /// The scroll baseline is taken from the container's current offset, so
    /// a surface registered mid-gesture is not mistaken for a scrolled one.
    pub fn register(&mut self, handle: GeometryHandle, options: SurfaceOptions) -> SurfaceId {
        let id = self.registry.register(handle, options);
        if let Some(surface) = self.registry.get_mut(id) {
            surface.scroll_baseline = self.scroll.baseline(&self.scene, options.container);
        }
        id
    }

    /// Stop tracking a surface. Unknown ids are ignored.
    pub fn unregister(&mut self, id: SurfaceId) -> bool {
        self.registry.unregister(id)
    }

    /// Enable or disable a surface; disabling abandons its gesture silently.
    pub fn set_enabled(&mut self, id: SurfaceId, enabled: bool) -> bool {
        self.registry.set_enabled(id, enabled)
    }

    /// Change the scroll container used for a surface's drift checks.
    pub fn set_container(&mut self, id: SurfaceId, container: impl Into<ContainerRef>) -> bool {
        self.registry.set_container(id, container)
    }

    #[must_use]
    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn state(&self, id: SurfaceId) -> Option<GestureState> {
        self.registry.state(id)
    }

    // --- Subscriptions ----------------------------------------------------

    /// Listen for events whose kind is in `mask`, across all surfaces.
    pub fn subscribe(
        &mut self,
        mask: impl Into<TouchEventMask>,
        listener: impl FnMut(&TouchEvent) + 'static,
    ) -> SubscriptionToken {
        self.bus.subscribe(mask, listener)
    }

    /// Listen for events whose kind is in `mask`, for one surface.
    pub fn subscribe_target(
        &mut self,
        target: SurfaceId,
        mask: impl Into<TouchEventMask>,
        listener: impl FnMut(&TouchEvent) + 'static,
    ) -> SubscriptionToken {
        self.bus.subscribe_target(target, mask, listener)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.bus.unsubscribe(token)
    }

    // --- Input ------------------------------------------------------------

    /// Process a raw input event, returning the semantic events produced.
    ///
    /// Hold timers due at or before the input's timestamp fire first, so a
    /// late host timer can never reorder a hold after the release that
    /// follows it. Returned events have already been published on the bus.
    pub fn process(&mut self, input: &InputEvent) -> Vec<TouchEvent> {
        let _span = trace_span!("touch_input", kind = input_name(input)).entered();
        let mut out = Vec::with_capacity(2);

        if let Some(now) = input.timestamp() {
            self.fire_holds(now, &mut out);
        }

        match *input {
            InputEvent::Start {
                target,
                position,
                timestamp,
            } => self.on_start_inner(target, position, timestamp, input, &mut out),
            InputEvent::Move {
                position,
                timestamp,
            } => self.on_move_inner(position, timestamp, input, &mut out),
            InputEvent::End {
                position,
                timestamp,
            } => self.on_end_inner(position, timestamp, input, &mut out),
            InputEvent::Scroll { container, offset } => {
                self.scroll.record(container, offset);
                self.on_scroll_tick();
            }
        }

        self.publish(&out);
        out
    }

    /// Contact began. `target` binds it to one surface; `None` hit-tests all.
    pub fn on_start(
        &mut self,
        target: Option<SurfaceId>,
        position: Point,
        timestamp: Instant,
    ) -> Vec<TouchEvent> {
        self.process(&InputEvent::Start {
            target,
            position,
            timestamp,
        })
    }

    /// Contact moved.
    pub fn on_move(&mut self, position: Point, timestamp: Instant) -> Vec<TouchEvent> {
        self.process(&InputEvent::moved(position, timestamp))
    }

    /// Contact released.
    pub fn on_end(&mut self, position: Point, timestamp: Instant) -> Vec<TouchEvent> {
        self.process(&InputEvent::end(position, timestamp))
    }

    /// Recompute scroll drift for every active surface. Never emits; the
    /// cached drift is what [`Surface::has_drifted`] reports, while move and
    /// end decisions re-read the live offset.
    pub fn on_scroll_tick(&mut self) {
        let epsilon = self.config.scroll_epsilon;
        for surface in self.registry.iter_mut() {
            if !surface.state.is_active() {
                continue;
            }
            surface.drifted = self.scroll.has_drifted(
                &self.scene,
                surface.container,
                surface.scroll_baseline,
                epsilon,
            );
        }
    }

    /// Drop the pushed scroll sample for `container`, so its offset is polled
    /// from the scene again. Returns `false` if nothing was pushed for it.
    pub fn forget_scroll(&mut self, container: ContainerRef) -> bool {
        self.scroll.forget(container)
    }

    /// Fire every hold timer due at `now`. The host's timer callback.
    pub fn tick(&mut self, now: Instant) -> Vec<TouchEvent> {
        let mut out = Vec::new();
        self.fire_holds(now, &mut out);
        self.publish(&out);
        out
    }

    /// When the next hold timer is due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry.next_deadline()
    }

    /// Abandon every in-flight gesture without emitting anything
    /// (focus loss, window blur).
    pub fn reset_all(&mut self) {
        for id in self.registry.ids() {
            self.registry.reset(id);
        }
        debug!("all gestures reset");
    }
}

// ---------------------------------------------------------------------------
// Internal handlers
// ---------------------------------------------------------------------------

impl<S: Scene> TouchRecognizer<S> {
    fn on_start_inner(
        &mut self,
        target: Option<SurfaceId>,
        position: Point,
        timestamp: Instant,
        raw: &InputEvent,
        out: &mut Vec<TouchEvent>,
    ) {
        // A new gesture: drift is measured from here for every surface.
        for surface in self.registry.iter_mut() {
            surface.scroll_baseline = self.scroll.baseline(&self.scene, surface.container);
            surface.drifted = false;
        }

        let targets: Vec<SurfaceId> = match target {
            Some(id) => match self.registry.get(id) {
                Some(surface) if surface.enabled => vec![id],
                Some(_) => {
                    trace!(surface = id.raw(), "start on disabled surface ignored");
                    Vec::new()
                }
                None => {
                    trace!(surface = id.raw(), "start on unknown surface ignored");
                    Vec::new()
                }
            },
            None => self
                .registry
                .iter()
                .filter(|s| s.enabled && self.hits(s, position))
                .map(Surface::id)
                .collect(),
        };

        for id in targets {
            if self.registry.state(id).is_some_and(GestureState::is_active) {
                debug!(surface = id.raw(), "start during active gesture, restarting");
                self.registry.reset(id);
            }
            self.transition(id, GestureState::Tapping, Some(timestamp));
            self.emit(id, TouchEventKind::Tap, position, raw, out);
            self.registry
                .arm_hold(id, timestamp, self.config.hold_threshold, position, *raw);
        }
    }

    fn on_move_inner(
        &mut self,
        position: Point,
        timestamp: Instant,
        raw: &InputEvent,
        out: &mut Vec<TouchEvent>,
    ) {
        for id in self.registry.ids() {
            let Some(surface) = self.registry.get(id) else {
                continue;
            };
            if !surface.enabled || surface.state == GestureState::Tapping {
                continue;
            }
            let active = surface.state.is_active();

            if self.is_scrolling(surface) {
                if active {
                    self.leave(id, position, raw, out);
                }
                continue;
            }

            let hit = self.hits(surface, position);
            if active && !hit {
                self.leave(id, position, raw, out);
            } else if !active && hit {
                self.transition(id, GestureState::Entered, Some(timestamp));
                self.emit(id, TouchEventKind::TouchEnter, position, raw, out);
                self.registry
                    .arm_hold(id, timestamp, self.config.hold_threshold, position, *raw);
            }
        }
    }

    fn on_end_inner(
        &mut self,
        position: Point,
        timestamp: Instant,
        raw: &InputEvent,
        out: &mut Vec<TouchEvent>,
    ) {
        for id in self.registry.ids() {
            let Some(surface) = self.registry.get(id) else {
                continue;
            };
            if !surface.enabled || !surface.state.is_active() {
                continue;
            }
            let state = surface.state;

            if state == GestureState::Tapping
                && surface.gesture_start.is_some_and(|t0| {
                    timestamp.saturating_duration_since(t0) < self.config.end_debounce
                })
            {
                trace!(surface = id.raw(), "end within debounce window, tap cancelled");
                self.registry.reset(id);
                continue;
            }

            if self.is_scrolling(surface) || !self.hits(surface, position) {
                self.leave(id, position, raw, out);
                continue;
            }

            let kind = match state {
                GestureState::Tapping => TouchEventKind::Tapped,
                GestureState::Holding | GestureState::Entered => TouchEventKind::TouchRelease,
                GestureState::Idle => continue,
            };
            self.emit(id, kind, position, raw, out);
            self.transition(id, GestureState::Idle, None);
            self.registry.reset(id);
        }
    }

    fn fire_holds(&mut self, now: Instant, out: &mut Vec<TouchEvent>) {
        for request in self.registry.expire_holds(now) {
            let id = request.surface;
            let Some(surface) = self.registry.get(id) else {
                trace!(surface = id.raw(), "hold timer for unregistered surface dropped");
                continue;
            };
            let armable = matches!(surface.state, GestureState::Tapping | GestureState::Entered);
            if surface.generation != request.generation || !armable {
                trace!(surface = id.raw(), "stale hold timer dropped");
                continue;
            }
            if self.is_scrolling(surface) {
                trace!(surface = id.raw(), "hold suppressed by scroll");
                continue;
            }
            self.transition(id, GestureState::Holding, None);
            self.emit(
                id,
                TouchEventKind::TouchHold,
                request.position,
                &request.raw,
                out,
            );
        }
    }

    fn leave(
        &mut self,
        id: SurfaceId,
        position: Point,
        raw: &InputEvent,
        out: &mut Vec<TouchEvent>,
    ) {
        self.emit(id, TouchEventKind::TouchLeave, position, raw, out);
        self.transition(id, GestureState::Idle, None);
        self.registry.reset(id);
    }

    /// Move a surface to `to`, optionally stamping a new gesture start.
    fn transition(&mut self, id: SurfaceId, to: GestureState, started: Option<Instant>) {
        let Some(surface) = self.registry.get_mut(id) else {
            return;
        };
        debug!(
            surface = id.raw(),
            from = ?surface.state,
            to = ?to,
            "touch state transition"
        );
        surface.state = to;
        if started.is_some() {
            surface.gesture_start = started;
        }
    }

    fn emit(
        &mut self,
        id: SurfaceId,
        kind: TouchEventKind,
        position: Point,
        raw: &InputEvent,
        out: &mut Vec<TouchEvent>,
    ) {
        if let Some(surface) = self.registry.get_mut(id) {
            surface.last_event = Some(kind);
        }
        debug!(
            surface = id.raw(),
            event = kind.as_str(),
            x = position.x,
            y = position.y,
            "touch event"
        );
        out.push(TouchEvent {
            kind,
            position,
            target: id,
            raw: *raw,
        });
    }

    fn publish(&mut self, events: &[TouchEvent]) {
        for event in events {
            self.bus.publish(event);
        }
    }

    /// Whether `position` is on `surface` under the configured hit policy.
    fn hits(&self, surface: &Surface, position: Point) -> bool {
        let handle = surface.handle();
        let inside =
            GeometryOracle::contains(&self.scene, handle, position, surface.propagate_children);
        match self.config.hit_policy {
            HitPolicy::Bounds => inside,
            HitPolicy::Topmost => {
                inside && GeometryOracle::is_topmost(&self.scene, handle, position)
            }
        }
    }

    fn is_scrolling(&self, surface: &Surface) -> bool {
        self.scroll.has_drifted(
            &self.scene,
            surface.container,
            surface.scroll_baseline,
            self.config.scroll_epsilon,
        )
    }
}

fn input_name(input: &InputEvent) -> &'static str {
    match input {
        InputEvent::Start { .. } => "start",
        InputEvent::Move { .. } => "move",
        InputEvent::End { .. } => "end",
        InputEvent::Scroll { .. } => "scroll",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
