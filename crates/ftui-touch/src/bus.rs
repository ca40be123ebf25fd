#![forbid(unsafe_code)]

//! Ordered, synchronous delivery of [`TouchEvent`]s to listeners.
//!
//! Subscribers pick the kinds they care about with a [`TouchEventMask`] and
//! optionally a single target surface. Delivery happens on the publishing
//! thread, in subscription order, before `publish` returns.
//!
//! # Failure Modes
//!
//! - A listener cannot reach back into the recognizer that owns the bus
//!   (it holds `&mut` for the duration of dispatch). Listeners that need to
//!   reconfigure surfaces should record the intent and apply it after the
//!   current input has been processed.

use std::fmt;

use crate::registry::SurfaceId;
use crate::touch_event::{TouchEvent, TouchEventMask};

type Listener = Box<dyn FnMut(&TouchEvent)>;

/// Handle returned by a subscription; pass it to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct Subscriber {
    token: SubscriptionToken,
    mask: TouchEventMask,
    target: Option<SurfaceId>,
    listener: Listener,
}

/// Typed publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_token: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event whose kind is in `mask`.
    pub fn subscribe(
        &mut self,
        mask: impl Into<TouchEventMask>,
        listener: impl FnMut(&TouchEvent) + 'static,
    ) -> SubscriptionToken {
        self.push(mask.into(), None, Box::new(listener))
    }

    /// Receive events in `mask` emitted for one surface only.
    pub fn subscribe_target(
        &mut self,
        target: SurfaceId,
        mask: impl Into<TouchEventMask>,
        listener: impl FnMut(&TouchEvent) + 'static,
    ) -> SubscriptionToken {
        self.push(mask.into(), Some(target), Box::new(listener))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.token != token);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every matching subscriber. Returns how many received it.
    pub fn publish(&mut self, event: &TouchEvent) -> usize {
        let bit = event.kind.mask();
        let mut delivered = 0;
        for sub in &mut self.subscribers {
            if !sub.mask.contains(bit) {
                continue;
            }
            if sub.target.is_some_and(|t| t != event.target) {
                continue;
            }
            (sub.listener)(event);
            delivered += 1;
        }
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn push(
        &mut self,
        mask: TouchEventMask,
        target: Option<SurfaceId>,
        listener: Listener,
    ) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscribers.push(Subscriber {
            token,
            mask,
            target,
            listener,
        });
        token
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
