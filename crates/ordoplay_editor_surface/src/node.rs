// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions and the node factory.

use crate::meta::SurfaceMeta;
use crate::parameter::Parameter;
use crate::pin::{Pin, PinId};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a node, unique within one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// `(group, type)` pair selecting a node schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKind {
    /// Node group (e.g. math, textures, parameters)
    pub group_id: u16,
    /// Node type within the group
    pub type_id: u16,
}

impl NodeKind {
    /// Create a node kind
    pub const fn new(group_id: u16, type_id: u16) -> Self {
        Self { group_id, type_id }
    }
}

/// Schema for one node kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeArchetype {
    /// Kind this schema describes
    pub kind: NodeKind,
    /// Display name
    pub title: String,
    /// Default values; their count and kinds fix the node's value slots
    pub default_values: Vec<Value>,
    /// Pins every instance starts with
    pub pins: Vec<Pin>,
    /// Value slot holding a bound parameter id, for parameter getter nodes
    pub parameter_slot: Option<usize>,
}

impl NodeArchetype {
    /// Create a schema with no values and no pins
    pub fn new(kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            default_values: Vec::new(),
            pins: Vec::new(),
            parameter_slot: None,
        }
    }

    /// Set the default values
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.default_values = values;
        self
    }

    /// Add a pin
    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pins.push(pin);
        self
    }

    /// Mark a value slot as holding a parameter id
    pub fn with_parameter_slot(mut self, slot: usize) -> Self {
        self.parameter_slot = Some(slot);
        self
    }
}

/// A node instance in the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Schema selector
    pub kind: NodeKind,
    /// Display name (can be customized)
    pub title: String,
    /// Value slots; length and kinds are fixed by the schema
    pub values: Vec<Value>,
    /// Pins keyed by their id
    pins: IndexMap<PinId, Pin>,
    /// Metadata chunks
    pub meta: SurfaceMeta,
    /// Position on the canvas
    pub position: [f32; 2],
    /// Whether the node is selected in the editor
    pub selected: bool,
}

impl Node {
    /// Create a node with no values or pins
    pub fn new(id: NodeId, kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            values: Vec::new(),
            pins: IndexMap::new(),
            meta: SurfaceMeta::new(),
            position: [0.0, 0.0],
            selected: false,
        }
    }

    /// Create a node from a schema
    pub fn from_archetype(id: NodeId, archetype: &NodeArchetype) -> Self {
        let mut node = Self::new(id, archetype.kind, archetype.title.clone());
        node.values = archetype.default_values.clone();
        for pin in &archetype.pins {
            node.add_pin(pin.clone());
        }
        node
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Add a pin, replacing any pin with the same id
    pub fn add_pin(&mut self, pin: Pin) {
        self.pins.insert(pin.id, pin);
    }

    /// Get a pin by ID
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.pins.get(&pin_id)
    }

    /// Get all pins in declaration order
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    /// Number of pins
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }
}

/// Creates schema-bound nodes and receives node lifecycle notifications.
///
/// The surface holds the factory as an injected capability; nothing in this
/// crate keeps a global registry.
pub trait NodeFactory: Send + Sync {
    /// Instantiate a node for the given kind, or `None` if the kind is unknown
    fn create_node(&self, id: NodeId, group_id: u16, type_id: u16) -> Option<Node>;

    /// Called after a node's body was read from a stream
    fn on_node_loaded(&self, _node: &mut Node) {}

    /// Called for every node once the whole surface finished loading
    fn on_surface_loaded(&self, _node: &mut Node) {}

    /// Called for every node when a parameter is added
    fn on_param_created(&self, _node: &mut Node, _param: &Parameter) {}

    /// Called for every node when a parameter is renamed
    fn on_param_renamed(&self, _node: &mut Node, _param: &Parameter) {}

    /// Called for every node when a parameter is removed
    fn on_param_deleted(&self, _node: &mut Node, _param: &Parameter) {}
}

/// Registry of available node schemas
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    archetypes: IndexMap<NodeKind, NodeArchetype>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of schemas
    pub fn from_archetypes(archetypes: impl IntoIterator<Item = NodeArchetype>) -> Self {
        let mut registry = Self::new();
        for archetype in archetypes {
            registry.register(archetype);
        }
        registry
    }

    /// Register a schema, replacing any previous one for the same kind
    pub fn register(&mut self, archetype: NodeArchetype) {
        self.archetypes.insert(archetype.kind, archetype);
    }

    /// Get a schema by kind
    pub fn get(&self, kind: NodeKind) -> Option<&NodeArchetype> {
        self.archetypes.get(&kind)
    }

    /// Get all registered schemas
    pub fn archetypes(&self) -> impl Iterator<Item = &NodeArchetype> {
        self.archetypes.values()
    }

    /// Get schemas in a group
    pub fn archetypes_in_group(&self, group_id: u16) -> impl Iterator<Item = &NodeArchetype> {
        self.archetypes.values().filter(move |a| a.kind.group_id == group_id)
    }

    fn bound_parameter(&self, node: &Node) -> Option<usize> {
        let slot = self.get(node.kind)?.parameter_slot?;
        (slot < node.values.len()).then_some(slot)
    }
}

impl NodeFactory for NodeRegistry {
    fn create_node(&self, id: NodeId, group_id: u16, type_id: u16) -> Option<Node> {
        self.get(NodeKind::new(group_id, type_id))
            .map(|archetype| Node::from_archetype(id, archetype))
    }

    fn on_node_loaded(&self, node: &mut Node) {
        let Some(archetype) = self.get(node.kind) else {
            return;
        };
        for (slot, (value, default)) in node.values.iter().zip(&archetype.default_values).enumerate() {
            if value.value_type() != default.value_type() {
                tracing::warn!(
                    node = node.id.0,
                    slot,
                    stored = ?value.value_type(),
                    expected = ?default.value_type(),
                    "Node value kind differs from schema"
                );
            }
        }
    }

    fn on_param_renamed(&self, node: &mut Node, param: &Parameter) {
        if let Some(slot) = self.bound_parameter(node) {
            if node.values[slot] == Value::Guid(param.id) {
                node.title = param.name.clone();
            }
        }
    }

    fn on_param_deleted(&self, node: &mut Node, param: &Parameter) {
        if let Some(slot) = self.bound_parameter(node) {
            if node.values[slot] == Value::Guid(param.id) {
                node.values[slot] = Value::Guid(uuid::Uuid::nil());
                if let Some(archetype) = self.get(node.kind) {
                    node.title = archetype.title.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinType;
    use uuid::Uuid;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeArchetype::new(NodeKind::new(2, 1), "Float")
                .with_values(vec![Value::Float(0.0)])
                .with_pin(Pin::output(0, "Value", PinType::FLOAT)),
        );
        registry.register(
            NodeArchetype::new(NodeKind::new(6, 1), "Get Parameter")
                .with_values(vec![Value::Guid(Uuid::nil())])
                .with_pin(Pin::output(0, "Value", PinType::VARIABLE))
                .with_parameter_slot(0),
        );
        registry
    }

    #[test]
    fn test_create_from_registry() {
        let registry = registry();
        let node = registry.create_node(NodeId(7), 2, 1).unwrap();
        assert_eq!(node.id, NodeId(7));
        assert_eq!(node.values, vec![Value::Float(0.0)]);
        assert_eq!(node.pin_count(), 1);
        assert!(node.pin(PinId(0)).is_some());

        assert!(registry.create_node(NodeId(8), 2, 99).is_none());
        let copy = NodeRegistry::from_archetypes(registry.archetypes().cloned());
        assert_eq!(copy.archetypes().count(), 2);
        assert_eq!(registry.archetypes_in_group(6).count(), 1);
    }

    #[test]
    fn test_parameter_binding_hooks() {
        let registry = registry();
        let mut node = registry.create_node(NodeId(1), 6, 1).unwrap();
        let mut param = Parameter::new("Speed", Value::Float(1.0));
        node.values[0] = Value::Guid(param.id);

        param.name = "Velocity".to_string();
        registry.on_param_renamed(&mut node, &param);
        assert_eq!(node.title, "Velocity");

        registry.on_param_deleted(&mut node, &param);
        assert_eq!(node.values[0], Value::Guid(Uuid::nil()));
        assert_eq!(node.title, "Get Parameter");
    }
}
