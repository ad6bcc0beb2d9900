//! In-process publish/subscribe bus.
//!
//! Subscriptions are scoped to a context handle.  Releasing a context drops
//! every subscription still registered under it, so a session that forgets
//! to unsubscribe cannot leak deliveries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use docview_core::{BusChannel, InboundBusEvent};
use tracing::{debug, trace};

use crate::application::host::BusPublisher;
use crate::application::lifecycle::{EventBus, EventSink};
use crate::application::session::SessionEvent;
use crate::domain::session::{ContextHandle, SubscriptionId};

struct Subscription {
    context: ContextHandle,
    channel: BusChannel,
    sink: EventSink,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    contexts: BTreeSet<ContextHandle>,
    /// Ordered by id so deliveries follow subscription order.
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl BusState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// The bus used when the bridge runs as a single process.
#[derive(Default)]
pub struct InProcessBus {
    state: Mutex<BusState>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions across all contexts.
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Number of context handles not yet released.
    pub fn live_contexts(&self) -> usize {
        self.lock().contexts.len()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventBus for InProcessBus {
    fn create_context(&self) -> ContextHandle {
        let mut state = self.lock();
        let context = ContextHandle(state.next_id());
        state.contexts.insert(context);
        context
    }

    fn subscribe(
        &self,
        context: ContextHandle,
        channel: BusChannel,
        sink: EventSink,
    ) -> SubscriptionId {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_id());
        state.subscriptions.insert(
            id,
            Subscription {
                context,
                channel,
                sink,
            },
        );
        trace!("bus: subscription {} on {channel} (context {})", id.0, context.0);
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.lock().subscriptions.remove(&subscription);
    }

    fn release_context(&self, context: ContextHandle) {
        let mut state = self.lock();
        state.contexts.remove(&context);
        let before = state.subscriptions.len();
        state.subscriptions.retain(|_, sub| sub.context != context);
        let dropped = before - state.subscriptions.len();
        if dropped > 0 {
            debug!("bus: context {} released with {dropped} live subscriptions", context.0);
        }
    }
}

impl BusPublisher for InProcessBus {
    fn publish(&self, channel: BusChannel, event: &InboundBusEvent) -> usize {
        let state = self.lock();
        state
            .subscriptions
            .values()
            .filter(|sub| sub.channel == channel)
            .filter(|sub| {
                sub.sink
                    .send(SessionEvent::Bus {
                        channel,
                        event: event.clone(),
                    })
                    .is_ok()
            })
            .count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
