//! # Event Bus System
//!
//! Typed broadcast channel used to publish engine events to the host layer.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **EventBus**: Central broadcast channel for publishing events of one type `E`
//! - **EventStream**: Wrapper for consuming events with optional filtering
//! - **Subscription Management**: Any number of independent subscribers, each
//!   released explicitly with [`EventStream::unsubscribe`] or by dropping it
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ Player       ├──────────────>│ EventBus  ├─────────────────>│ Now-playing│
//! └──────────────┘               │ (broadcast│                  └────────────┘
//! ┌──────────────┐     emit      │  channel) │     subscribe    ┌────────────┐
//! │ SleepTimer   ├──────────────>│           ├─────────────────>│ UI layer   │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::EventBus;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus: EventBus<String> = EventBus::new(16);
//! let mut stream = bus.stream();
//!
//! bus.emit("ready".to_string()).ok();
//! assert_eq!(stream.recv().await.unwrap(), "ready");
//!
//! stream.unsubscribe();
//! assert_eq!(bus.subscriber_count(), 0);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber continues with newer events.
//! - **`RecvError::Closed`**: The bus was dropped. Subscribers should exit.
//!
//! Emitting with no subscribers returns `Err`; publishers that do not care
//! whether anyone is listening call `.ok()` on the result.

use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus for events of type `E`.
///
/// Cloning the bus yields another handle to the same channel.
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: E) -> Result<usize, SendError<E>> {
        self.sender.send(event)
    }

    /// Creates a raw receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<E> {
        self.sender.subscribe()
    }

    /// Creates an [`EventStream`] for all future events.
    pub fn stream(&self) -> EventStream<E> {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus: EventBus<u32> = EventBus::new(8);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering and explicit unsubscribe.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let event_bus: EventBus<i32> = EventBus::new(8);
/// let even_only = EventStream::new(event_bus.subscribe()).filter(|n| n % 2 == 0);
/// # drop(even_only);
/// ```
pub struct EventStream<E> {
    receiver: Receiver<E>,
    filter: Option<EventFilter<E>>,
}

impl<E: Clone> EventStream<E> {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<E>) -> Self {
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
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &E) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if the bus has been dropped.
    pub async fn recv(&mut self) -> Result<E, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<E, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
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

    /// Drains every event currently buffered that passes the filter.
    ///
    /// Lag is skipped over; the returned list only contains received events.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Some(next) = self.try_recv() {
            match next {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }

    /// Releases this subscription. The bus stops counting it immediately.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<E> fmt::Debug for EventStream<E> {
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
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Started(u32),
        Stopped,
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus: EventBus<TestEvent> = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(TestEvent::Stopped).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.stream();
        let mut sub2 = bus.stream();

        assert_eq!(bus.emit(TestEvent::Started(1)).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), TestEvent::Started(1));
        assert_eq!(sub2.recv().await.unwrap(), TestEvent::Started(1));
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_subscription() {
        let bus = EventBus::new(10);
        let first = bus.stream();
        let mut second = bus.stream();
        assert_eq!(bus.subscriber_count(), 2);

        first.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(TestEvent::Stopped).unwrap();
        assert_eq!(second.recv().await.unwrap(), TestEvent::Stopped);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = bus
            .stream()
            .filter(|event| matches!(event, TestEvent::Stopped));

        bus.emit(TestEvent::Started(1)).ok();
        bus.emit(TestEvent::Stopped).ok();

        assert_eq!(stream.recv().await.unwrap(), TestEvent::Stopped);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = bus.stream();

        for n in 0..5 {
            bus.emit(TestEvent::Started(n)).ok();
        }

        assert!(matches!(stream.recv().await, Err(RecvError::Lagged(_))));
        assert_eq!(stream.recv().await.unwrap(), TestEvent::Started(3));
    }

    #[tokio::test]
    async fn test_closed_when_bus_dropped() {
        let bus: EventBus<TestEvent> = EventBus::new(4);
        let mut stream = bus.stream();
        drop(bus);

        assert!(matches!(stream.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = Arc::new(EventBus::new(64));
        let mut stream = bus.stream();

        let mut handles = Vec::new();
        for n in 0..8 {
            let bus = Arc::clone(&bus);
            handles.push(tokio::spawn(async move {
                bus.emit(TestEvent::Started(n)).ok();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(stream.drain().len(), 8);
    }

    #[test]
    fn test_try_recv_empty() {
        let bus: EventBus<TestEvent> = EventBus::new(4);
        let mut stream = bus.stream();
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_drain_applies_filter() {
        let bus = EventBus::new(8);
        let mut stream = bus
            .stream()
            .filter(|event| matches!(event, TestEvent::Started(_)));

        bus.emit(TestEvent::Started(1)).ok();
        bus.emit(TestEvent::Stopped).ok();
        bus.emit(TestEvent::Started(2)).ok();

        assert_eq!(
            stream.drain(),
            vec![TestEvent::Started(1), TestEvent::Started(2)]
        );
    }
}
