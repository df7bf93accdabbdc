/*!
 * Trace Broadcaster - fan-out channel for sampled traces
 * Uses tokio broadcast channel; the receiver count doubles as the
 * "is anyone watching" guard
 */

use crate::capture::Trace;
use crate::utils::config::DEFAULT_CHANNEL_CAPACITY;
use log::debug;
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Publish/subscribe primitive for traces
///
/// The sender lives behind a lock only so that `close` works through a
/// shared reference; publishing and counting take the read side.
#[derive(Debug)]
pub struct TraceBroadcaster {
    sender: RwLock<Option<broadcast::Sender<Trace>>>,
}

impl TraceBroadcaster {
    /// Create new broadcaster with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Subscribe to every trace published from now on
    ///
    /// After `close`, the returned receiver reports end-of-stream at once.
    pub fn subscribe(&self) -> broadcast::Receiver<Trace> {
        match self.sender.read().as_ref() {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Publish a trace to all current subscribers
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, trace: Trace) -> usize {
        match self.sender.read().as_ref() {
            // Err only means nobody is subscribed
            Some(sender) => sender.send(trace).unwrap_or(0),
            None => 0,
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, |sender| sender.receiver_count())
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// End the channel
    ///
    /// Subscribers still receive every trace already buffered, then observe
    /// end-of-stream. Closing twice is harmless.
    pub fn close(&self) {
        if let Some(sender) = self.sender.write().take() {
            debug!(
                "Closing trace channel with {} subscriber(s)",
                sender.receiver_count()
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

impl Default for TraceBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
