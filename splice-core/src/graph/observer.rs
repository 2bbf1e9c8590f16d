//! Graph Observers
//!
//! Anything outside the graph that needs to react to changes (parameter
//! panels, the render scheduler, the timeline view) registers a callback
//! here. Callbacks run synchronously, in registration order, on the thread
//! that mutated the graph.

use super::edge::EdgeId;
use super::node::NodeId;
use crate::time::TimeRange;

/// Unique identifier for an observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A change to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    EdgeAdded {
        edge: EdgeId,
        output: NodeId,
        input: NodeId,
    },
    EdgeRemoved {
        edge: EdgeId,
        output: NodeId,
        input: NodeId,
    },
    /// An input's stored value changed.
    ValueChanged { node: NodeId, param: String },
    /// A node's cached output over `range` is stale.
    CacheInvalidated { node: NodeId, range: TimeRange },
    BlocksLinked(NodeId, NodeId),
}

/// A registered callback.
struct Observer {
    id: ObserverId,
    /// The callback to invoke for each event.
    notify: Box<dyn Fn(&GraphEvent) + Send + Sync>,
}

impl Observer {
    /// Deliver one event.
    fn notify(&self, event: &GraphEvent) {
        (self.notify)(event);
    }
}

/// Ordered list of observers.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Observer>,
    next_id: u64,
}

impl ObserverList {
    /// Register a callback. It receives every event from now on.
    pub fn subscribe<F>(&mut self, notify: F) -> ObserverId
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(Observer {
            id,
            notify: Box::new(notify),
        });
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Deliver an event to every observer, in registration order.
    pub fn notify(&self, event: &GraphEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}
