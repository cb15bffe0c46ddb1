//! Broadcast event bus distributing daemon lifecycle and sync events to any
//! number of subscribers (the IPC surface, metrics exporters, log sinks).
//!
//! Built on `tokio::sync::broadcast`: every subscriber gets every event
//! published after it subscribed, and a slow subscriber that falls behind
//! the bus's buffer sees [`tokio::sync::broadcast::error::RecvError::Lagged`]
//! rather than stalling publishers.

use tokio::sync::broadcast;

/// Default number of in-flight events the bus buffers per subscriber before
/// the slowest one starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// One notable occurrence in the daemon's lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A peer's session reached the `Established` state.
    PeerConnected {
        /// The peer's opaque identifier.
        peer_id: String,
    },
    /// A peer's session ended, voluntarily or otherwise.
    PeerDisconnected {
        /// The peer's opaque identifier.
        peer_id: String,
        /// Human-readable reason, e.g. `"idle timeout"` or `"remote reset"`.
        reason: String,
    },
    /// A peer's session was reset: a sequence-number violation or a
    /// liveness timeout, as opposed to a clean disconnect.
    PeerReset {
        /// The peer's opaque identifier.
        peer_id: String,
        /// Human-readable reset cause.
        reason: String,
    },
    /// A file transfer (delta or full) began.
    SyncStarted {
        /// Path relative to the watched root.
        path: String,
        /// Peer the transfer is with.
        peer_id: String,
    },
    /// A file transfer committed successfully.
    SyncCompleted {
        /// Path relative to the watched root.
        path: String,
        /// Peer the transfer was with.
        peer_id: String,
        /// Bytes actually sent over the wire (post-delta-compression).
        bytes_transferred: u64,
    },
    /// A file transfer aborted before committing.
    SyncFailed {
        /// Path relative to the watched root.
        path: String,
        /// Peer the transfer was with.
        peer_id: String,
        /// Human-readable failure reason.
        reason: String,
    },
    /// Two peers produced independent edits of the same path.
    ConflictDetected {
        /// Path the conflict occurred on.
        path: String,
    },
    /// A file was removed, locally or via a propagated `DELETE_FILE`.
    FileDeleted {
        /// Path relative to the watched root.
        path: String,
    },
    /// The auto-remesh loop changed which peers are actively synced with.
    RemeshTriggered {
        /// Peers added to the active mesh.
        added: Vec<String>,
        /// Peers dropped from the active mesh.
        dropped: Vec<String>,
    },
}

/// Publishes [`Event`]s to any number of subscribers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus with [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with a custom per-subscriber buffer size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber. It will receive every event published
    /// from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an event. Returns the number of subscribers it was
    /// delivered to; `0` simply means nobody is currently listening, which
    /// is not an error.
    pub fn publish(&self, event: Event) -> usize {
        match self.sender.send(event.clone()) {
            Ok(count) => count,
            Err(_no_subscribers) => {
                tracing::trace!(target: "sentinelfs::events", ?event, "published with no subscribers");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::PeerConnected {
            peer_id: "peer-a".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            Event::PeerConnected {
                peer_id: "peer-a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::FileDeleted {
            path: "a.txt".to_string(),
        });

        assert_eq!(
            rx1.recv().await.unwrap(),
            Event::FileDeleted {
                path: "a.txt".to_string()
            }
        );
        assert_eq!(
            rx2.recv().await.unwrap(),
            Event::FileDeleted {
                path: "a.txt".to_string()
            }
        );
    }

    #[test]
    fn publish_with_no_subscribers_returns_zero() {
        let bus = EventBus::new();
        let delivered = bus.publish(Event::FileDeleted {
            path: "a.txt".to_string(),
        });
        assert_eq!(delivered, 0);
    }
}
