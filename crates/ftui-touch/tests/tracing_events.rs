//! Structured logging emitted while recognizing gestures.

use std::fmt;
use std::sync::{Arc, Mutex};

use ftui_touch::{GestureConfig, Point, Rect, SceneGraph, SurfaceOptions, TouchRecognizer};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use web_time::{Duration, Instant};

#[derive(Debug, Default, Clone)]
struct Record {
    message: String,
    event: Option<String>,
}

struct FieldVisitor<'a>(&'a mut Record);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "event" {
            self.0.event = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.message = format!("{value:?}");
        }
    }
}

#[derive(Clone, Default)]
struct EventCapture(Arc<Mutex<Vec<Record>>>);

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut record = Record::default();
        event.record(&mut FieldVisitor(&mut record));
        self.0.lock().unwrap().push(record);
    }
}

#[test]
fn emitted_events_are_logged_with_their_wire_names() {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    tracing::subscriber::with_default(subscriber, || {
        let mut scene = SceneGraph::new();
        let handle = scene.insert_root(Rect::new(0.0, 0.0, 100.0, 100.0));
        let mut tr = TouchRecognizer::new(GestureConfig::default(), scene);
        let id = tr.register(handle, SurfaceOptions::default());
        let t = Instant::now();

        tr.on_start(Some(id), Point::new(50.0, 50.0), t);
        tr.on_end(Point::new(50.0, 50.0), t + Duration::from_millis(400));
    });

    let records = capture.0.lock().unwrap();
    let emitted: Vec<&str> = records
        .iter()
        .filter(|r| r.message == "touch event")
        .filter_map(|r| r.event.as_deref())
        .collect();
    assert_eq!(emitted, ["tap", "touch-hold", "touch-release"]);

    let transitions = records
        .iter()
        .filter(|r| r.message == "touch state transition")
        .count();
    // Idle -> Tapping -> Holding -> Idle
    assert_eq!(transitions, 3);

    assert!(records.iter().any(|r| r.message == "surface registered"));
}
