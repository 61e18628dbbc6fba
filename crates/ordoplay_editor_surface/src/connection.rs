// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the surface.
//!
//! A connection is an undirected edge between two pins. Its endpoints are
//! kept in a canonical order so that `A-B` and `B-A` compare equal, which lets
//! the surface store each edge exactly once even though the file lists it
//! from both sides.

use crate::node::NodeId;
use crate::pin::PinId;
use serde::{Deserialize, Serialize};

/// Address of a pin within a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinRef {
    /// Owning node
    pub node: NodeId,
    /// Pin within the node
    pub pin: PinId,
}

impl PinRef {
    /// Create a pin address
    pub fn new(node: NodeId, pin: PinId) -> Self {
        Self { node, pin }
    }
}

/// An undirected connection between two pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    a: PinRef,
    b: PinRef,
}

impl Connection {
    /// Create a connection; endpoint order does not matter
    pub fn new(first: PinRef, second: PinRef) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    /// Both endpoints in canonical order
    pub fn endpoints(&self) -> (PinRef, PinRef) {
        (self.a, self.b)
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.a.node == node_id || self.b.node == node_id
    }

    /// Check if this connection involves a specific pin
    pub fn involves_pin(&self, pin: PinRef) -> bool {
        self.a == pin || self.b == pin
    }

    /// The endpoint across from `pin`, if `pin` is one of the endpoints
    pub fn other(&self, pin: PinRef) -> Option<PinRef> {
        if self.a == pin {
            Some(self.b)
        } else if self.b == pin {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A connection record read from the stream whose target is not resolved yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHint {
    /// Pin whose table listed the connection
    pub source: PinRef,
    /// Target node id as stored in the file
    pub target_node: NodeId,
    /// Target pin id as stored in the file
    pub target_pin: PinId,
}

impl ConnectionHint {
    /// Target address as stored in the file
    pub fn target(&self) -> PinRef {
        PinRef::new(self.target_node, self.target_pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(node: u32, pin: u8) -> PinRef {
        PinRef::new(NodeId(node), PinId(pin))
    }

    #[test]
    fn test_direction_insensitive() {
        let ab = Connection::new(pin(1, 0), pin(2, 3));
        let ba = Connection::new(pin(2, 3), pin(1, 0));
        assert_eq!(ab, ba);
        assert_eq!(ab.endpoints(), (pin(1, 0), pin(2, 3)));
    }

    #[test]
    fn test_other_endpoint() {
        let c = Connection::new(pin(5, 1), pin(2, 0));
        assert_eq!(c.other(pin(5, 1)), Some(pin(2, 0)));
        assert_eq!(c.other(pin(2, 0)), Some(pin(5, 1)));
        assert_eq!(c.other(pin(5, 0)), None);
        assert!(c.involves_node(NodeId(2)));
        assert!(!c.involves_pin(pin(2, 1)));
    }
}
