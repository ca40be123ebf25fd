#![forbid(unsafe_code)]

//! Touch: tap, hold, and enter/leave recognition over tracked surfaces.
//!
//! # Role in FrankenTUI
//! `ftui-touch` sits between a host's raw pointer stream and the widgets
//! that care about touch outcomes. The host describes its element tree
//! through [`geometry::Scene`], registers the elements it wants tracked as
//! surfaces, and feeds [`event::InputEvent`]s in; listeners receive
//! [`touch_event::TouchEvent`]s out.
//!
//! # Primary responsibilities
//! - **TouchRecognizer**: per-surface state machine (tap, hold, enter, leave).
//! - **GeometryOracle**: containment (optionally including child boxes) and
//!   topmost hit testing.
//! - **ScrollTracker**: invalidates touches that turn into scrolls.
//! - **TimerQueue**: host-driven hold timers with stale-fire protection.
//! - **EventBus**: ordered, typed delivery to listeners.
//!
//! # Example
//!
//! ```
//! use ftui_touch::{GestureConfig, Point, Rect, SceneGraph, SurfaceOptions, TouchRecognizer};
//! use ftui_touch::TouchEventKind;
//! use web_time::{Duration, Instant};
//!
//! let mut scene = SceneGraph::new();
//! let button = scene.insert_root(Rect::new(0.0, 0.0, 100.0, 100.0));
//!
//! let mut touch = TouchRecognizer::new(GestureConfig::default(), scene);
//! let id = touch.register(button, SurfaceOptions::default());
//!
//! let t0 = Instant::now();
//! touch.on_start(Some(id), Point::new(50.0, 50.0), t0);
//! let events = touch.on_end(Point::new(50.0, 50.0), t0 + Duration::from_millis(100));
//! assert_eq!(events[0].kind, TouchEventKind::Tapped);
//! ```

pub mod bus;
pub mod config;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod registry;
pub mod scroll;
pub mod timer;
pub mod touch_event;

pub use bus::{EventBus, SubscriptionToken};
pub use config::{ConfigError, GestureConfig, HitPolicy};
pub use event::InputEvent;
pub use geometry::{GeometryHandle, GeometryOracle, Point, Rect, Scene, SceneGraph};
pub use gesture::TouchRecognizer;
pub use registry::{GestureState, Surface, SurfaceId, SurfaceOptions, SurfaceRegistry};
pub use scroll::{ContainerRef, ScrollTracker};
pub use timer::{TimerQueue, TimerToken};
pub use touch_event::{TouchEvent, TouchEventKind, TouchEventMask};
