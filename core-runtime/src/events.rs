//! # Event Bus System
//!
//! Provides an event-driven architecture for the heritage media core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules and host applications through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, DownloadEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = CoreEvent::Download(DownloadEvent::Queued {
//!     content_id: "perf-12-clip-3".to_string(),
//!     title: "Mawwal in Bayati".to_string(),
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```no_run
//! use core_runtime::events::{EventBus, CoreEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = subscriber.recv().await {
//!         println!("Received: {:?}", event);
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of
//! errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates
//!   shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a signal
//! to exit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events. Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Download lifecycle events
    Download(DownloadEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Download(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Download(DownloadEvent::Queued { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Download Events
// ============================================================================

/// Events related to the offline download lifecycle.
///
/// Ids are carried as plain strings so hosts can consume events without
/// depending on the catalog crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// A download request was accepted and queued.
    Queued {
        /// The catalog id of the content being downloaded.
        content_id: String,
        /// Display title captured at request time.
        title: String,
    },
    /// A transfer worker picked up the job and started streaming.
    Started {
        /// The catalog id of the content being downloaded.
        content_id: String,
        /// Total size reported by the remote, if known.
        total_bytes: Option<u64>,
    },
    /// Incremental transfer progress.
    Progress {
        /// The catalog id of the content being downloaded.
        content_id: String,
        /// Bytes written to local storage so far.
        bytes_downloaded: u64,
        /// Total size reported by the remote, if known.
        total_bytes: Option<u64>,
    },
    /// The transfer finished and the file was promoted to final storage.
    Completed {
        /// The catalog id of the content that was downloaded.
        content_id: String,
        /// Absolute path of the downloaded file.
        local_path: String,
    },
    /// The transfer failed; the record remains visible with its reason.
    Failed {
        /// The catalog id of the content that failed.
        content_id: String,
        /// Human-readable failure reason.
        error: String,
    },
    /// The transfer was paused by the user.
    Paused {
        /// The catalog id of the paused content.
        content_id: String,
    },
    /// A paused download re-entered the queue.
    Resumed {
        /// The catalog id of the resumed content.
        content_id: String,
    },
    /// The download was cancelled and its record deleted.
    Cancelled {
        /// The catalog id of the cancelled content.
        content_id: String,
    },
    /// A completed download was removed and its file unlinked.
    Removed {
        /// The catalog id of the removed content.
        content_id: String,
    },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Queued { .. } => "Download queued",
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Failed { .. } => "Download failed",
            DownloadEvent::Paused { .. } => "Download paused",
            DownloadEvent::Resumed { .. } => "Download resumed",
            DownloadEvent::Cancelled { .. } => "Download cancelled",
            DownloadEvent::Removed { .. } => "Download removed",
        }
    }

    /// The content id this event refers to.
    pub fn content_id(&self) -> &str {
        match self {
            DownloadEvent::Queued { content_id, .. }
            | DownloadEvent::Started { content_id, .. }
            | DownloadEvent::Progress { content_id, .. }
            | DownloadEvent::Completed { content_id, .. }
            | DownloadEvent::Failed { content_id, .. }
            | DownloadEvent::Paused { content_id }
            | DownloadEvent::Resumed { content_id }
            | DownloadEvent::Cancelled { content_id }
            | DownloadEvent::Removed { content_id } => content_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for publishing core events.
///
/// Cloning an `EventBus` is cheap; clones share the same channel.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, CoreEvent, DownloadEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut sub_a = event_bus.subscribe();
/// let mut sub_b = event_bus.subscribe();
///
/// let event = CoreEvent::Download(DownloadEvent::Paused {
///     content_id: "perf-7-clip-1".to_string(),
/// });
///
/// // Both subscribers receive the event
/// event_bus.emit(event).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// This provides a more ergonomic API for consuming events with optional
/// filtering by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent, EventSeverity};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Only surface failures
/// let mut failures = stream.filter(|event| {
///     event.severity() >= EventSeverity::Error
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next
    /// matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(content_id: &str) -> CoreEvent {
        CoreEvent::Download(DownloadEvent::Queued {
            content_id: content_id.to_string(),
            title: "Test Performance".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);

        // Should error when no subscribers
        assert!(bus.emit(queued("perf-1-clip-1")).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = queued("perf-1-clip-1");
        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Download(DownloadEvent::Progress {
            content_id: "perf-2-clip-4".to_string(),
            bytes_downloaded: 1024,
            total_bytes: Some(4096),
        });

        bus.emit(event.clone()).ok();

        let received1 = sub1.recv().await.unwrap();
        let received2 = sub2.recv().await.unwrap();

        assert_eq!(received1, event);
        assert_eq!(received2, event);
    }

    #[tokio::test]
    async fn test_event_stream_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).filter(|event| {
            matches!(event, CoreEvent::Download(DownloadEvent::Failed { .. }))
        });

        bus.emit(queued("perf-1-clip-1")).ok();
        bus.emit(CoreEvent::Download(DownloadEvent::Failed {
            content_id: "perf-1-clip-1".to_string(),
            error: "connection reset".to_string(),
        }))
        .ok();

        // The queued event is skipped; only the failure comes through
        let received = stream.recv().await.unwrap();
        assert!(matches!(
            received,
            CoreEvent::Download(DownloadEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_event_stream_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Download(DownloadEvent::Failed {
            content_id: "perf-1-clip-1".to_string(),
            error: "disk full".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let progress = CoreEvent::Download(DownloadEvent::Progress {
            content_id: "perf-1-clip-1".to_string(),
            bytes_downloaded: 10,
            total_bytes: None,
        });
        assert_eq!(progress.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_content_id_accessor() {
        let event = DownloadEvent::Cancelled {
            content_id: "perf-9-clip-2".to_string(),
        };
        assert_eq!(event.content_id(), "perf-9-clip-2");
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = CoreEvent::Download(DownloadEvent::Completed {
            content_id: "perf-3-clip-1".to_string(),
            local_path: "/data/downloads/perf-3-clip-1.mp4".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
