// SPDX-License-Identifier: MIT OR Apache-2.0
//! The surface: container owning nodes, parameters and connections.

use crate::codec::{load_graph, save_graph, GraphData};
use crate::config::SurfaceConfig;
use crate::connection::{Connection, PinRef};
use crate::error::{EditError, Result};
use crate::meta::{NodeMeta, SurfaceMeta, ViewMeta, NODE_CANVAS_META, SURFACE_VIEW_META};
use crate::node::{Node, NodeFactory, NodeId};
use crate::parameter::{Parameter, ParameterType};
use crate::pin::Pin;
use crate::stream::{SurfaceReader, SurfaceWriter};
use crate::value::Value;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Receives edited-state notifications from a surface
pub trait SurfaceOwner: Send + Sync {
    /// Called when the surface's edited flag changes or after a load
    fn on_surface_edited_changed(&self, edited: bool);
}

/// A Visject surface graph.
///
/// All mutation goes through `&mut self`; callers sharing a surface between
/// threads must serialize access themselves.
pub struct Surface {
    graph: GraphData,
    factory: Arc<dyn NodeFactory>,
    owner: Option<Arc<dyn SurfaceOwner>>,
    config: SurfaceConfig,
    view: ViewMeta,
    edited: bool,
    enabled: bool,
    next_node_id: u32,
}

impl Surface {
    /// Create an empty surface that instantiates nodes through `factory`
    pub fn new(factory: Arc<dyn NodeFactory>) -> Self {
        Self {
            graph: GraphData::default(),
            factory,
            owner: None,
            config: SurfaceConfig::default(),
            view: ViewMeta::default(),
            edited: false,
            enabled: true,
            next_node_id: 1,
        }
    }

    /// Use custom codec settings
    pub fn with_config(mut self, config: SurfaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an owner notified about edited-state changes
    pub fn with_owner(mut self, owner: Arc<dyn SurfaceOwner>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Codec settings
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Load / save
    // ------------------------------------------------------------------

    /// Replace the surface contents with a graph read from `bytes`.
    ///
    /// The previous contents are discarded before parsing starts. On failure
    /// the surface is left empty.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        self.enabled = false;
        self.graph = GraphData::default();
        self.view = ViewMeta::default();
        self.next_node_id = 1;

        let result = load_graph(&mut SurfaceReader::new(bytes), self.factory.as_ref(), &self.config);
        self.enabled = true;

        self.graph = match result {
            Ok(graph) => graph,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load surface");
                return Err(err);
            }
        };

        self.view = self
            .graph
            .meta
            .entry(SURFACE_VIEW_META)
            .and_then(ViewMeta::from_bytes)
            .unwrap_or_default();

        for node in self.graph.nodes.values_mut() {
            if let Some(meta) = node.meta.entry(NODE_CANVAS_META).and_then(NodeMeta::from_bytes) {
                node.position = meta.position;
                node.selected = meta.selected;
            }
        }
        self.next_node_id = self
            .graph
            .nodes
            .keys()
            .map(|id| id.0.saturating_add(1))
            .max()
            .unwrap_or(1)
            .max(1);

        for node in self.graph.nodes.values_mut() {
            self.factory.on_surface_loaded(node);
        }

        self.edited = false;
        if let Some(owner) = &self.owner {
            owner.on_surface_edited_changed(false);
        }
        Ok(())
    }

    /// Write the surface into a fresh byte buffer.
    ///
    /// View state and node canvas state are flushed into the metadata stores
    /// first; those stores are cleared before the known entries are written.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        self.enabled = false;

        self.graph.meta.release();
        self.graph.meta.add_entry(SURFACE_VIEW_META, self.view.to_bytes());
        for node in self.graph.nodes.values_mut() {
            let meta = NodeMeta {
                position: node.position,
                selected: node.selected,
            };
            node.meta.release();
            node.meta.add_entry(NODE_CANVAS_META, meta.to_bytes());
        }

        let mut writer = SurfaceWriter::new(Vec::new());
        let result = save_graph(&mut writer, &self.graph, &self.config);
        self.enabled = true;

        if let Err(err) = result {
            tracing::warn!(error = %err, "Failed to save surface");
            return Err(err);
        }

        if self.edited {
            self.edited = false;
            if let Some(owner) = &self.owner {
                owner.on_surface_edited_changed(false);
            }
        }
        Ok(writer.into_inner())
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Whether the surface changed since the last load or save
    pub fn is_edited(&self) -> bool {
        self.edited
    }

    /// Whether change notifications are live (false during load/save)
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flag the surface as changed
    pub fn mark_edited(&mut self) {
        if self.edited {
            return;
        }
        self.edited = true;
        if self.enabled {
            if let Some(owner) = &self.owner {
                owner.on_surface_edited_changed(true);
            }
        }
    }

    /// Zoom factor of the view
    pub fn view_scale(&self) -> f32 {
        self.view.scale
    }

    /// Canvas point at the center of the view
    pub fn view_center(&self) -> [f32; 2] {
        self.view.view_center
    }

    /// Move or zoom the view
    pub fn set_view(&mut self, center: [f32; 2], scale: f32) {
        self.view = ViewMeta {
            view_center: center,
            scale,
        };
    }

    /// Surface-level metadata
    pub fn meta(&self) -> &SurfaceMeta {
        &self.graph.meta
    }

    /// Surface-level metadata (mutable)
    pub fn meta_mut(&mut self) -> &mut SurfaceMeta {
        &mut self.graph.meta
    }

    /// Engine build read from the last loaded stream
    pub fn engine_build(&self) -> u32 {
        self.graph.engine_build
    }

    /// The underlying graph data
    pub fn graph(&self) -> &GraphData {
        &self.graph
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.graph.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.graph.nodes.get_mut(&node_id)
    }

    /// Get all nodes in order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.nodes.len()
    }

    /// Create a node of the given kind with a fresh id
    pub fn spawn_node(&mut self, group_id: u16, type_id: u16) -> std::result::Result<NodeId, EditError> {
        let id = NodeId(self.next_node_id);
        let next = self.next_node_id.checked_add(1).ok_or(EditError::NodeIdsExhausted)?;
        let node = self
            .factory
            .create_node(id, group_id, type_id)
            .ok_or(EditError::UnknownNodeType { group_id, type_id })?;

        self.next_node_id = next;
        self.graph.nodes.insert(id, node);
        self.mark_edited();
        Ok(id)
    }

    /// Remove a node, its connections and every parameter reference to it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.graph.nodes.shift_remove(&node_id)?;
        self.graph.connections.retain(|c| !c.involves_node(node_id));
        for param in &mut self.graph.parameters {
            param.referenced_by.retain(|id| *id != node_id);
        }
        self.mark_edited();
        Some(node)
    }

    /// Move a node on the canvas
    pub fn set_node_position(&mut self, node_id: NodeId, position: [f32; 2]) -> std::result::Result<(), EditError> {
        let node = self.node_mut(node_id).ok_or(EditError::NodeNotFound(node_id))?;
        node.position = position;
        self.mark_edited();
        Ok(())
    }

    /// Select or deselect a node
    pub fn set_node_selected(&mut self, node_id: NodeId, selected: bool) -> std::result::Result<(), EditError> {
        let node = self.node_mut(node_id).ok_or(EditError::NodeNotFound(node_id))?;
        node.selected = selected;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connect two pins
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> std::result::Result<Connection, EditError> {
        if from.node == to.node {
            return Err(EditError::SelfLoop);
        }

        let source_pin = self.find_pin(from)?;
        let target_pin = self.find_pin(to)?;
        if !source_pin.can_connect(target_pin) {
            return Err(EditError::IncompatiblePins);
        }

        let connection = Connection::new(from, to);
        if self.graph.connections.contains(&connection) {
            return Err(EditError::AlreadyConnected);
        }
        for (pin, end) in [(source_pin, from), (target_pin, to)] {
            if !pin.multi_connect && self.graph.connections.iter().any(|c| c.involves_pin(end)) {
                return Err(EditError::PinAlreadyConnected {
                    node: end.node,
                    pin: end.pin,
                });
            }
        }

        self.graph.connections.insert(connection);
        self.mark_edited();
        Ok(connection)
    }

    /// Remove the connection between two pins, if any
    pub fn disconnect(&mut self, a: PinRef, b: PinRef) -> bool {
        let removed = self.graph.connections.shift_remove(&Connection::new(a, b));
        if removed {
            self.mark_edited();
        }
        removed
    }

    /// Pins connected to `pin`
    pub fn connections_of(&self, pin: PinRef) -> Vec<PinRef> {
        self.graph
            .connections
            .iter()
            .filter_map(|c| c.other(pin))
            .collect()
    }

    /// Whether the two pins are connected
    pub fn are_connected(&self, a: PinRef, b: PinRef) -> bool {
        self.graph.connections.contains(&Connection::new(a, b))
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.connections.iter()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.graph.connections.iter().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.graph.connections.len()
    }

    fn find_pin(&self, pin: PinRef) -> std::result::Result<&Pin, EditError> {
        self.node(pin.node)
            .ok_or(EditError::NodeNotFound(pin.node))?
            .pin(pin.pin)
            .ok_or(EditError::PinNotFound {
                node: pin.node,
                pin: pin.pin,
            })
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Get all parameters in order
    pub fn parameters(&self) -> &[Parameter] {
        &self.graph.parameters
    }

    /// Get a parameter by ID
    pub fn parameter(&self, id: Uuid) -> Option<&Parameter> {
        self.graph.parameters.iter().find(|p| p.id == id)
    }

    /// Get a parameter by name
    pub fn parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.graph.parameters.iter().find(|p| p.name == name)
    }

    /// Add a parameter and notify every node
    pub fn add_parameter(&mut self, param: Parameter) -> std::result::Result<Uuid, EditError> {
        self.check_parameter_name(&param.name)?;
        check_parameter_value(param.param_type, &param.value)?;
        if self.parameter_by_name(&param.name).is_some() {
            return Err(EditError::DuplicateParameterName(param.name));
        }
        let id = param.id;
        for node in self.graph.nodes.values_mut() {
            self.factory.on_param_created(node, &param);
        }
        self.graph.parameters.push(param);
        self.mark_edited();
        Ok(id)
    }

    /// Rename a parameter and notify every node
    pub fn rename_parameter(&mut self, id: Uuid, name: impl Into<String>) -> std::result::Result<(), EditError> {
        let name = name.into();
        self.check_parameter_name(&name)?;
        if self.graph.parameters.iter().any(|p| p.name == name && p.id != id) {
            return Err(EditError::DuplicateParameterName(name));
        }

        let GraphData { nodes, parameters, .. } = &mut self.graph;
        let param = parameters
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EditError::ParameterNotFound(id))?;
        param.name = name;
        for node in nodes.values_mut() {
            self.factory.on_param_renamed(node, param);
        }
        self.mark_edited();
        Ok(())
    }

    /// Remove a parameter and notify every node
    pub fn remove_parameter(&mut self, id: Uuid) -> std::result::Result<Parameter, EditError> {
        let index = self
            .graph
            .parameters
            .iter()
            .position(|p| p.id == id)
            .ok_or(EditError::ParameterNotFound(id))?;
        let param = self.graph.parameters.remove(index);
        for node in self.graph.nodes.values_mut() {
            self.factory.on_param_deleted(node, &param);
        }
        self.mark_edited();
        Ok(param)
    }

    /// Record that `node_id` reads the parameter
    pub fn reference_parameter(&mut self, id: Uuid, node_id: NodeId) -> std::result::Result<(), EditError> {
        if !self.graph.nodes.contains_key(&node_id) {
            return Err(EditError::NodeNotFound(node_id));
        }
        let param = self
            .graph
            .parameters
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EditError::ParameterNotFound(id))?;
        if !param.is_referenced_by(node_id) {
            param.referenced_by.push(node_id);
            self.mark_edited();
        }
        Ok(())
    }

    /// Set a parameter's value; its kind must match the parameter type
    pub fn set_parameter_value(&mut self, id: Uuid, value: Value) -> std::result::Result<(), EditError> {
        let param = self
            .graph
            .parameters
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EditError::ParameterNotFound(id))?;
        check_parameter_value(param.param_type, &value)?;
        param.value = value;
        self.mark_edited();
        Ok(())
    }

    fn check_parameter_name(&self, name: &str) -> std::result::Result<(), EditError> {
        let length = name.encode_utf16().count();
        let limit = self.config.max_name_length;
        if length >= limit {
            return Err(EditError::NameTooLong { length, limit });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Render nodes, parameters and connections as pretty RON
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        let snapshot = SurfaceSnapshot {
            view_center: self.view.view_center,
            view_scale: self.view.scale,
            nodes: self.graph.nodes.values().collect(),
            parameters: &self.graph.parameters,
            connections: self.graph.connections.iter().map(Connection::endpoints).collect(),
        };
        ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::default())
    }
}

fn check_parameter_value(expected: ParameterType, value: &Value) -> std::result::Result<(), EditError> {
    let found = value.value_type();
    if ParameterType::from(found) != expected {
        return Err(EditError::ValueTypeMismatch { expected, found });
    }
    Ok(())
}

#[derive(Serialize)]
struct SurfaceSnapshot<'a> {
    view_center: [f32; 2],
    view_scale: f32,
    nodes: Vec<&'a Node>,
    parameters: &'a [Parameter],
    connections: Vec<(PinRef, PinRef)>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("nodes", &self.graph.nodes.len())
            .field("parameters", &self.graph.parameters.len())
            .field("connections", &self.graph.connections.len())
            .field("edited", &self.edited)
            .finish_non_exhaustive()
    }
}
