use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

/// Buffered notifications per subscription before new ones are dropped.
pub const SUBSCRIPTION_BUFFER: usize = 16;

/// Closed subscriptions are swept once this many are registered.
const SWEEP_THRESHOLD: usize = 16;

/// Keyed wake-up channel.
///
/// Publishing never blocks: a subscriber whose buffer is full misses the
/// message and finds out on its next re-check. Receivers treat every message
/// as "something changed, look again".
pub struct NotificationBus<T> {
    inner: Arc<Mutex<BusState<T>>>,
}

struct BusState<T> {
    topics: FxHashMap<String, Vec<mpsc::Sender<T>>>,
    registered: usize,
}

impl<T> BusState<T> {
    fn sweep(&mut self) {
        let before = self.registered;
        self.topics.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
        self.registered = self.topics.values().map(Vec::len).sum();
        trace!(
            removed = before - self.registered,
            remaining = self.registered,
            "Swept closed subscriptions"
        );
    }
}

impl<T: Clone + Send + 'static> NotificationBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusState {
                topics: FxHashMap::default(),
                registered: 0,
            })),
        }
    }

    pub fn subscribe(&self, key: &str) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.registered >= SWEEP_THRESHOLD {
            state.sweep();
        }
        state.topics.entry(key.to_string()).or_default().push(tx);
        state.registered += 1;
        Subscription { receiver: rx }
    }

    /// Deliver `payload` to every open subscription on `key`.
    ///
    /// Returns how many subscribers accepted it.
    pub fn publish(&self, key: &str, payload: T) -> usize {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(senders) = state.topics.get(key) else {
            return 0;
        };
        senders
            .iter()
            .filter(|tx| tx.try_send(payload.clone()).is_ok())
            .count()
    }

    /// Registered subscriptions, including closed ones not yet swept.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .registered
    }
}

impl<T: Clone + Send + 'static> Default for NotificationBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for NotificationBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("NotificationBus")
            .field("topics", &state.topics.len())
            .field("registered", &state.registered)
            .finish()
    }
}

/// Receiving end of one subscription. Dropping it unsubscribes.
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next notification. `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Stop accepting notifications; the bus sweeps it later.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
