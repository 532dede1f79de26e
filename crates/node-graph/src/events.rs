//! Graph change events
//!
//! The manager reports every mutation as a `GraphEvent`. Consumers either
//! subscribe to one payload type with [`EventBus::on`], to a kind with
//! [`EventBus::on_kind`], or attach an [`EventSink`] that forwards every
//! event (e.g. over a channel to a UI thread).
//!
//! Delivery is synchronous and in subscription order. A listener that
//! returns an error or panics is logged and skipped; later listeners still
//! run and the mutation that emitted the event is unaffected.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{Connection, ConnectionId, NodeId, NodeInstance, Position};

/// Trait for forwarding graph events
///
/// This abstracts over the transport mechanism (channel, IPC bridge, etc.)
/// so the manager can be embedded in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error raised by a listener or sink
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn channel_closed() -> Self {
        Self::new("Channel closed")
    }
}

/// The eight kinds of graph event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphEventKind {
    NodeAdded,
    NodeRemoved,
    NodeUpdated,
    NodeMoved,
    ConnectionAdded,
    ConnectionRemoved,
    GraphCleared,
    GraphLoaded,
}

impl GraphEventKind {
    pub const ALL: [GraphEventKind; 8] = [
        Self::NodeAdded,
        Self::NodeRemoved,
        Self::NodeUpdated,
        Self::NodeMoved,
        Self::ConnectionAdded,
        Self::ConnectionRemoved,
        Self::GraphCleared,
        Self::GraphLoaded,
    ];

    /// Wire name of the kind (e.g. `node-added`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeAdded => "node-added",
            Self::NodeRemoved => "node-removed",
            Self::NodeUpdated => "node-updated",
            Self::NodeMoved => "node-moved",
            Self::ConnectionAdded => "connection-added",
            Self::ConnectionRemoved => "connection-removed",
            Self::GraphCleared => "graph-cleared",
            Self::GraphLoaded => "graph-loaded",
        }
    }
}

impl fmt::Display for GraphEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAdded {
    pub node: NodeInstance,
}

/// A node was removed, along with its connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRemoved {
    pub node_id: NodeId,
    pub removed_connections: Vec<ConnectionId>,
}

/// One data key of a node changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdated {
    pub node_id: NodeId,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<serde_json::Value>,
}

/// A node was moved on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMoved {
    pub node_id: NodeId,
    pub position: Position,
}

/// A connection was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAdded {
    pub connection: Connection,
}

/// Why a connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemovalReason {
    /// Removed on request
    Explicit,
    /// Displaced by a new connection into a single-connection input
    Replaced,
}

/// A connection was removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRemoved {
    pub connection_id: ConnectionId,
    pub reason: RemovalReason,
}

/// The graph was emptied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphCleared {}

/// A graph was loaded from a guide document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLoaded {
    pub module: String,
    pub node_count: usize,
    pub connection_count: usize,
}

/// Events emitted by the graph manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GraphEvent {
    NodeAdded(NodeAdded),
    NodeRemoved(NodeRemoved),
    NodeUpdated(NodeUpdated),
    NodeMoved(NodeMoved),
    ConnectionAdded(ConnectionAdded),
    ConnectionRemoved(ConnectionRemoved),
    GraphCleared(GraphCleared),
    GraphLoaded(GraphLoaded),
}

impl GraphEvent {
    pub fn kind(&self) -> GraphEventKind {
        match self {
            Self::NodeAdded(_) => GraphEventKind::NodeAdded,
            Self::NodeRemoved(_) => GraphEventKind::NodeRemoved,
            Self::NodeUpdated(_) => GraphEventKind::NodeUpdated,
            Self::NodeMoved(_) => GraphEventKind::NodeMoved,
            Self::ConnectionAdded(_) => GraphEventKind::ConnectionAdded,
            Self::ConnectionRemoved(_) => GraphEventKind::ConnectionRemoved,
            Self::GraphCleared(_) => GraphEventKind::GraphCleared,
            Self::GraphLoaded(_) => GraphEventKind::GraphLoaded,
        }
    }
}

/// Payload type of one event kind
pub trait EventPayload: Clone + Send + 'static {
    const KIND: GraphEventKind;

    /// Borrow the payload if the event is of this kind
    fn from_event(event: &GraphEvent) -> Option<&Self>;

    fn into_event(self) -> GraphEvent;
}

macro_rules! event_payload {
    ($($payload:ident),* $(,)?) => {
        $(
            impl EventPayload for $payload {
                const KIND: GraphEventKind = GraphEventKind::$payload;

                fn from_event(event: &GraphEvent) -> Option<&Self> {
                    match event {
                        GraphEvent::$payload(payload) => Some(payload),
                        _ => None,
                    }
                }

                fn into_event(self) -> GraphEvent {
                    GraphEvent::$payload(self)
                }
            }

            impl From<$payload> for GraphEvent {
                fn from(payload: $payload) -> Self {
                    payload.into_event()
                }
            }
        )*
    };
}

event_payload!(
    NodeAdded,
    NodeRemoved,
    NodeUpdated,
    NodeMoved,
    ConnectionAdded,
    ConnectionRemoved,
    GraphCleared,
    GraphLoaded,
);

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GraphEvent) -> Result<(), EventError> + Send>;

struct Subscription {
    id: ListenerId,
    /// `None` receives every kind
    kind: Option<GraphEventKind>,
    listener: Listener,
}

/// Synchronous event dispatcher
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one payload type
    pub fn on<P, F>(&mut self, mut listener: F) -> ListenerId
    where
        P: EventPayload,
        F: FnMut(&P) -> Result<(), EventError> + Send + 'static,
    {
        self.subscribe(
            Some(P::KIND),
            Box::new(move |event| match P::from_event(event) {
                Some(payload) => listener(payload),
                None => Ok(()),
            }),
        )
    }

    /// Subscribe to one kind with the whole event
    pub fn on_kind<F>(&mut self, kind: GraphEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) -> Result<(), EventError> + Send + 'static,
    {
        self.subscribe(Some(kind), Box::new(listener))
    }

    /// Subscribe to every kind
    pub fn on_any<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) -> Result<(), EventError> + Send + 'static,
    {
        self.subscribe(None, Box::new(listener))
    }

    /// Forward every event to a sink
    pub fn attach_sink(&mut self, sink: Arc<dyn EventSink>) -> ListenerId {
        self.on_any(move |event| sink.send(event.clone()))
    }

    fn subscribe(&mut self, kind: Option<GraphEventKind>, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.subscriptions.push(Subscription { id, kind, listener });
        id
    }

    /// Remove a subscription
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver an event to every matching listener
    pub fn emit(&mut self, event: &GraphEvent) {
        let kind = event.kind();
        for subscription in &mut self.subscriptions {
            if subscription.kind.is_some_and(|k| k != kind) {
                continue;
            }
            let listener = &mut subscription.listener;
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Listener for '{}' failed: {}", kind, e),
                Err(panic) => log::error!(
                    "Listener for '{}' panicked: {}",
                    kind,
                    panic_message(panic.as_ref())
                ),
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Drop every subscription
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: GraphEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GraphEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.lock().clone()
    }

    /// Kinds of the collected events, in order
    pub fn kinds(&self) -> Vec<GraphEventKind> {
        self.lock().iter().map(GraphEvent::kind).collect()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn moved(id: &str) -> GraphEvent {
        NodeMoved {
            node_id: id.to_string(),
            position: Position::new(1.0, 2.0),
        }
        .into()
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(moved("a")).unwrap();
        assert_eq!(json["type"], "node-moved");
        assert_eq!(json["nodeId"], "a");

        let json = serde_json::to_value(GraphEvent::from(GraphCleared {})).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "graph-cleared" }));

        let removed: GraphEvent = serde_json::from_value(serde_json::json!({
            "type": "connection-removed",
            "connectionId": "c1",
            "reason": "replaced"
        }))
        .unwrap();
        assert_eq!(removed.kind(), GraphEventKind::ConnectionRemoved);
    }

    #[test]
    fn test_kind_names() {
        for kind in GraphEventKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn test_typed_subscription() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on::<NodeMoved, _>(move |payload| {
            sink.lock().unwrap().push(payload.node_id.clone());
            Ok(())
        });

        bus.emit(&moved("a"));
        bus.emit(&GraphCleared {}.into());
        bus.emit(&moved("b"));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_failing_listeners_do_not_stop_delivery() {
        let mut bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.on_any(|_| Err(EventError::new("boom")));
        bus.on_any(|_| panic!("listener bug"));
        let counter = count.clone();
        bus.on_kind(GraphEventKind::NodeMoved, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&moved("a"));
        bus.emit(&moved("b"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_off_and_sinks() {
        let mut bus = EventBus::new();
        let sink = Arc::new(VecEventSink::new());
        let id = bus.attach_sink(sink.clone());
        assert_eq!(bus.listener_count(), 1);

        bus.emit(&moved("a"));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&moved("b"));

        assert_eq!(sink.kinds(), vec![GraphEventKind::NodeMoved]);
        sink.clear();
        assert!(sink.events().is_empty());

        bus.attach_sink(Arc::new(NullEventSink));
        bus.emit(&moved("c"));
    }
}
