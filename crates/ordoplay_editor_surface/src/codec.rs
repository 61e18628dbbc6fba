// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary surface format.
//!
//! The layout is shared byte-for-byte with the native runtime:
//!
//! ```text
//! [magic: i32][engine_build: u32][time_saved: i64]
//! [node_count: i32][param_count: i32]
//! node_count  x [id: u32][type_id: u16][group_id: u16]
//! param_count x [type: u8][id: guid][name: str97][public, static, ui_visible, ui_editable: u8]
//!               [ref_count: i32][refs: u32...][value][meta]
//! node_count  x [values_count: i32][values...][pin_count: u16]
//!               pin_count x [id: u8][default_type: u32][conn_count: u16][(node: u32, pin: u8)...]
//!               [meta]
//! [surface meta][terminator: u8 = '\t']
//! ```
//!
//! Connections may name nodes that appear later in the stream, so they are
//! buffered as [`ConnectionHint`]s and linked after every node body is read.

use crate::config::SurfaceConfig;
use crate::connection::{Connection, ConnectionHint, PinRef};
use crate::error::{Result, SurfaceError};
use crate::meta::SurfaceMeta;
use crate::node::{Node, NodeFactory, NodeId};
use crate::parameter::{Parameter, ParameterType};
use crate::pin::PinId;
use crate::stream::{SurfaceReader, SurfaceWriter, NAME_KEY};
use crate::value::{read_value, write_value};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Magic code opening every surface stream
pub const MAGIC_CODE: i32 = 1963542358;

/// Byte closing every surface stream
pub const TERMINATOR: u8 = b'\t';

/// Contents of a surface stream
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    /// Engine build read from the header
    pub engine_build: u32,
    /// Save timestamp read from the header (not interpreted)
    pub time_saved: i64,
    /// Nodes in stream order
    pub nodes: IndexMap<NodeId, Node>,
    /// Parameters in stream order
    pub parameters: Vec<Parameter>,
    /// Undirected connections in the order they were linked
    pub connections: IndexSet<Connection>,
    /// Surface-level metadata
    pub meta: SurfaceMeta,
}

impl GraphData {
    /// Connected pins per pin, each list in connection order
    pub fn adjacency(&self) -> HashMap<PinRef, Vec<PinRef>> {
        let mut map: HashMap<PinRef, Vec<PinRef>> = HashMap::new();
        for connection in &self.connections {
            let (a, b) = connection.endpoints();
            map.entry(a).or_default().push(b);
            if a != b {
                map.entry(b).or_default().push(a);
            }
        }
        map
    }
}

/// Read a whole surface stream.
///
/// Nodes are instantiated through `factory`. Dangling parameter references
/// and connections are logged and dropped; every other inconsistency fails
/// the whole load.
pub fn load_graph<R: Read>(
    reader: &mut SurfaceReader<R>,
    factory: &dyn NodeFactory,
    config: &SurfaceConfig,
) -> Result<GraphData> {
    let magic = reader.read_i32()?;
    if magic != MAGIC_CODE {
        return Err(SurfaceError::InvalidMagic { found: magic });
    }

    let mut graph = GraphData {
        engine_build: reader.read_u32()?,
        time_saved: reader.read_i64()?,
        ..Default::default()
    };
    let engine_build = graph.engine_build;

    let node_count = reader.read_i32()?.max(0) as usize;
    let param_count = reader.read_i32()?.max(0) as usize;

    // Node headers
    for _ in 0..node_count {
        let id = NodeId(reader.read_u32()?);
        let type_id = reader.read_u16()?;
        let group_id = reader.read_u16()?;

        let node = factory
            .create_node(id, group_id, type_id)
            .ok_or(SurfaceError::UnknownNodeType { node: id, group_id, type_id })?;
        if graph.nodes.insert(id, node).is_some() {
            return Err(SurfaceError::DuplicateNodeId(id));
        }
    }

    // Parameters
    for _ in 0..param_count {
        let param = read_parameter(reader, &graph.nodes, engine_build, config)?;
        graph.parameters.push(param);
    }

    // Node bodies
    let mut hints = Vec::new();
    for index in 0..graph.nodes.len() {
        let Some((_, node)) = graph.nodes.get_index_mut(index) else {
            break;
        };
        read_node_values(reader, node, config)?;

        let pin_count = reader.read_u16()?;
        for _ in 0..pin_count {
            let source = PinRef::new(node.id, PinId(reader.read_u8()?));
            let default_type = reader.read_u32()?;
            if let Some(pin) = node.pin(source.pin) {
                if pin.default_type.0 != default_type {
                    tracing::trace!(
                        node = node.id.0,
                        pin = source.pin.0,
                        stored = default_type,
                        schema = pin.default_type.0,
                        "Pin type differs from schema"
                    );
                }
            }

            let connection_count = reader.read_u16()?;
            for _ in 0..connection_count {
                hints.push(ConnectionHint {
                    source,
                    target_node: NodeId(reader.read_u32()?),
                    target_pin: PinId(reader.read_u8()?),
                });
            }
        }

        node.meta.load(engine_build, reader)?;
        factory.on_node_loaded(node);
    }

    graph.meta.load(engine_build, reader)?;

    for hint in hints {
        resolve_hint(&mut graph, hint);
    }

    let end = reader.read_u8()?;
    if end != TERMINATOR {
        return Err(SurfaceError::InvalidTerminator { found: end });
    }

    tracing::debug!(
        nodes = graph.nodes.len(),
        parameters = graph.parameters.len(),
        connections = graph.connections.len(),
        engine_build,
        "Loaded surface graph"
    );
    Ok(graph)
}

fn read_parameter<R: Read>(
    reader: &mut SurfaceReader<R>,
    nodes: &IndexMap<NodeId, Node>,
    engine_build: u32,
    config: &SurfaceConfig,
) -> Result<Parameter> {
    let param_type = ParameterType(reader.read_u8()?);
    let id = reader.read_guid()?;
    let name = reader.read_string(NAME_KEY, Some(config.max_name_length))?;
    let is_public = reader.read_bool()?;
    let is_static = reader.read_bool()?;
    let is_ui_visible = reader.read_bool()?;
    let is_ui_editable = reader.read_bool()?;

    let ref_count = reader.read_i32()?.max(0) as usize;
    let mut referenced_by = Vec::with_capacity(ref_count.min(nodes.len()));
    for _ in 0..ref_count {
        let node = NodeId(reader.read_u32()?);
        if nodes.contains_key(&node) {
            referenced_by.push(node);
        } else {
            tracing::warn!(param = %name, node = node.0, "Invalid node reference id");
        }
    }

    let value = read_value(reader, config.max_value_string_length)?;
    let mut meta = SurfaceMeta::new();
    meta.load(engine_build, reader)?;

    Ok(Parameter {
        id,
        name,
        param_type,
        is_public,
        is_static,
        is_ui_visible,
        is_ui_editable,
        value,
        referenced_by,
        meta,
    })
}

fn read_node_values<R: Read>(
    reader: &mut SurfaceReader<R>,
    node: &mut Node,
    config: &SurfaceConfig,
) -> Result<()> {
    let count = reader.read_i32()?;
    let expected = node.values.len();
    if count == 0 && expected == 0 {
        return Ok(());
    }
    if usize::try_from(count).ok() != Some(expected) {
        return Err(SurfaceError::ValuesCountMismatch {
            node: node.id,
            expected,
            found: count,
        });
    }

    for slot in &mut node.values {
        *slot = read_value(reader, config.max_value_string_length)?;
    }
    Ok(())
}

fn resolve_hint(graph: &mut GraphData, hint: ConnectionHint) {
    let target = hint.target();
    let Some(target_node) = graph.nodes.get(&target.node) else {
        tracing::warn!(
            node = hint.source.node.0,
            pin = hint.source.pin.0,
            target = target.node.0,
            "Invalid connected node id"
        );
        return;
    };
    if target_node.pin(target.pin).is_none() {
        tracing::warn!(node = target.node.0, pin = target.pin.0, "Connected pin not found");
        return;
    }
    let has_source = graph
        .nodes
        .get(&hint.source.node)
        .is_some_and(|n| n.pin(hint.source.pin).is_some());
    if !has_source {
        tracing::warn!(node = hint.source.node.0, pin = hint.source.pin.0, "Connection source pin not found");
        return;
    }
    graph.connections.insert(Connection::new(hint.source, target));
}

/// Write a whole surface stream.
///
/// Every connection is written from both endpoints' pin tables. The header
/// carries `config.engine_build` and a zero timestamp so output depends on
/// graph contents only.
pub fn save_graph<W: Write>(
    writer: &mut SurfaceWriter<W>,
    graph: &GraphData,
    config: &SurfaceConfig,
) -> Result<()> {
    writer.write_i32(MAGIC_CODE)?;
    writer.write_u32(config.engine_build)?;
    writer.write_i64(0)?;

    writer.write_count_i32(graph.nodes.len(), "nodes")?;
    writer.write_count_i32(graph.parameters.len(), "parameters")?;

    for node in graph.nodes.values() {
        writer.write_u32(node.id.0)?;
        writer.write_u16(node.kind.type_id)?;
        writer.write_u16(node.kind.group_id)?;
    }

    for param in &graph.parameters {
        write_parameter(writer, param, config)?;
    }

    let adjacency = graph.adjacency();
    for node in graph.nodes.values() {
        writer.write_count_i32(node.values.len(), "node values")?;
        for value in &node.values {
            write_value(writer, value, config.max_value_string_length)?;
        }

        writer.write_count_u16(node.pin_count(), "pins")?;
        for pin in node.pins() {
            let linked = adjacency
                .get(&PinRef::new(node.id, pin.id))
                .map(Vec::as_slice)
                .unwrap_or_default();
            writer.write_u8(pin.id.0)?;
            writer.write_u32(pin.default_type.0)?;
            writer.write_count_u16(linked.len(), "pin connections")?;
            for target in linked {
                writer.write_u32(target.node.0)?;
                writer.write_u8(target.pin.0)?;
            }
        }

        node.meta.save(writer)?;
    }

    graph.meta.save(writer)?;
    writer.write_u8(TERMINATOR)?;

    tracing::debug!(
        nodes = graph.nodes.len(),
        parameters = graph.parameters.len(),
        connections = graph.connections.len(),
        "Saved surface graph"
    );
    Ok(())
}

fn write_parameter<W: Write>(
    writer: &mut SurfaceWriter<W>,
    param: &Parameter,
    config: &SurfaceConfig,
) -> Result<()> {
    writer.write_u8(param.param_type.0)?;
    writer.write_guid(&param.id)?;
    writer.write_string(&param.name, NAME_KEY, Some(config.max_name_length))?;
    writer.write_bool(param.is_public)?;
    writer.write_bool(param.is_static)?;
    writer.write_bool(param.is_ui_visible)?;
    writer.write_bool(param.is_ui_editable)?;

    writer.write_count_i32(param.referenced_by.len(), "parameter references")?;
    for node in &param.referenced_by {
        writer.write_u32(node.0)?;
    }

    write_value(writer, &param.value, config.max_value_string_length)?;
    param.meta.save(writer)
}
