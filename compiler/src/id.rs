// id.rs — Stable identifiers for graph nodes and pins
//
// Nodes and pins live in arenas owned by `Graph`. Ids are allocated
// monotonically and never reused, so a stored id doubles as a weak reference:
// once the slot is emptied the id resolves to nothing instead of to a
// different node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Stable identifier for a pin. Pins are owned by exactly one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Allocator for node and pin ids. Produces monotonically increasing ids.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_node: u32,
    next_pin: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn alloc_pin(&mut self) -> PinId {
        let id = PinId(self.next_pin);
        self.next_pin += 1;
        id
    }

    /// Ensure the next node id is strictly greater than `id`. Used when a
    /// document supplies its own node ids.
    pub fn reserve_node(&mut self, id: NodeId) {
        if id.0 >= self.next_node {
            self.next_node = id.0 + 1;
        }
    }

    pub fn peek_node(&self) -> NodeId {
        NodeId(self.next_node)
    }
}
