// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load/save behavior of whole surfaces against hand-built streams.

use ordoplay_editor_surface::meta::NODE_CANVAS_META;
use ordoplay_editor_surface::stream::{SurfaceReader, SurfaceWriter, NAME_KEY, VALUE_STRING_KEY};
use ordoplay_editor_surface::value::write_value;
use ordoplay_editor_surface::{
    Node, NodeArchetype, NodeFactory, NodeId, NodeKind, NodeRegistry, Parameter, Pin, PinId, PinRef, PinType,
    Surface, SurfaceError, Value, MAGIC_CODE, TERMINATOR,
};
use proptest::prelude::*;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ordoplay_editor_surface=trace")
        .with_test_writer()
        .try_init();
}

fn registry() -> Arc<NodeRegistry> {
    Arc::new(schemas())
}

fn schemas() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(
        NodeArchetype::new(NodeKind::new(2, 1), "Float")
            .with_values(vec![Value::Float(0.0)])
            .with_pin(Pin::output(0, "Value", PinType::FLOAT)),
    );
    registry.register(
        NodeArchetype::new(NodeKind::new(3, 1), "Multiply")
            .with_pin(Pin::input(0, "A", PinType::VARIABLE))
            .with_pin(Pin::input(1, "B", PinType::VARIABLE))
            .with_pin(Pin::output(2, "Result", PinType::VARIABLE)),
    );
    registry
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Hook {
    /// Node body read; carries whether its canvas meta was already present
    NodeLoaded(NodeId, bool),
    SurfaceLoaded(NodeId),
}

/// Node factory that records lifecycle hook calls
struct RecordingFactory {
    schemas: NodeRegistry,
    hooks: Mutex<Vec<Hook>>,
}

impl RecordingFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            schemas: schemas(),
            hooks: Mutex::new(Vec::new()),
        })
    }

    fn take(&self) -> Vec<Hook> {
        std::mem::take(&mut *self.hooks.lock().unwrap())
    }
}

impl NodeFactory for RecordingFactory {
    fn create_node(&self, id: NodeId, group_id: u16, type_id: u16) -> Option<Node> {
        self.schemas.create_node(id, group_id, type_id)
    }

    fn on_node_loaded(&self, node: &mut Node) {
        let has_meta = node.meta.entry(NODE_CANVAS_META).is_some();
        self.hooks.lock().unwrap().push(Hook::NodeLoaded(node.id, has_meta));
    }

    fn on_surface_loaded(&self, node: &mut Node) {
        self.hooks.lock().unwrap().push(Hook::SurfaceLoaded(node.id));
    }
}

fn pin(node: u32, pin: u8) -> PinRef {
    PinRef::new(NodeId(node), PinId(pin))
}

const SPEED_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0001);

/// Float node 1 and Multiply node 2, one parameter "Speed".
///
/// `param_refs` is written verbatim as the parameter's reference list and
/// `extra_connection` is appended to node 1's pin 0 table.
fn raw_graph(param_refs: &[u32], extra_connection: Option<(u32, u8)>) -> Vec<u8> {
    let mut w = SurfaceWriter::new(Vec::new());
    w.write_i32(MAGIC_CODE).unwrap();
    w.write_u32(6000).unwrap();
    w.write_i64(1234).unwrap();
    w.write_i32(2).unwrap();
    w.write_i32(1).unwrap();

    // node headers: id, type, group
    w.write_u32(1).unwrap();
    w.write_u16(1).unwrap();
    w.write_u16(2).unwrap();
    w.write_u32(2).unwrap();
    w.write_u16(1).unwrap();
    w.write_u16(3).unwrap();

    // parameter
    w.write_u8(2).unwrap();
    w.write_guid(&SPEED_ID).unwrap();
    w.write_string("Speed", NAME_KEY, None).unwrap();
    for flag in [true, false, true, true] {
        w.write_bool(flag).unwrap();
    }
    w.write_i32(param_refs.len() as i32).unwrap();
    for id in param_refs {
        w.write_u32(*id).unwrap();
    }
    write_value(&mut w, &Value::Float(2.5), None).unwrap();
    w.write_i32(0).unwrap();

    // node 1 body
    w.write_i32(1).unwrap();
    write_value(&mut w, &Value::Float(0.5), None).unwrap();
    w.write_u16(1).unwrap();
    w.write_u8(0).unwrap();
    w.write_u32(PinType::FLOAT.0).unwrap();
    let extra: Vec<(u32, u8)> = extra_connection.into_iter().collect();
    w.write_u16(1 + extra.len() as u16).unwrap();
    w.write_u32(2).unwrap();
    w.write_u8(0).unwrap();
    for (node, pin) in extra {
        w.write_u32(node).unwrap();
        w.write_u8(pin).unwrap();
    }
    w.write_i32(0).unwrap();

    // node 2 body
    w.write_i32(0).unwrap();
    w.write_u16(3).unwrap();
    for id in 0u8..3 {
        w.write_u8(id).unwrap();
        w.write_u32(PinType::VARIABLE.0).unwrap();
        if id == 0 {
            w.write_u16(1).unwrap();
            w.write_u32(1).unwrap();
            w.write_u8(0).unwrap();
        } else {
            w.write_u16(0).unwrap();
        }
    }
    w.write_i32(0).unwrap();

    // surface meta and terminator
    w.write_i32(0).unwrap();
    w.write_u8(TERMINATOR).unwrap();
    w.into_inner()
}

fn loaded(bytes: &[u8]) -> Surface {
    let mut surface = Surface::new(registry());
    surface.load(bytes).unwrap();
    surface
}

#[test]
fn test_example_graph_survives_save_and_load() {
    init_logging();
    let mut surface = Surface::new(registry());
    let a = surface.spawn_node(2, 1).unwrap();
    let b = surface.spawn_node(3, 1).unwrap();
    assert_eq!((a, b), (NodeId(1), NodeId(2)));
    surface.connect(pin(1, 0), pin(2, 0)).unwrap();
    let mut speed = Parameter::new("Speed", Value::Float(2.5));
    speed.is_public = true;
    surface.add_parameter(speed).unwrap();

    let bytes = surface.save().unwrap();
    let reloaded = loaded(&bytes);

    assert_eq!(reloaded.node_count(), 2);
    assert!(reloaded.are_connected(pin(1, 0), pin(2, 0)));
    assert_eq!(reloaded.connections_of(pin(1, 0)), vec![pin(2, 0)]);
    assert_eq!(reloaded.connections_of(pin(2, 0)), vec![pin(1, 0)]);
    let param = reloaded.parameter_by_name("Speed").unwrap();
    assert_eq!(param.value, Value::Float(2.5));
    assert!(param.is_public);
}

#[test]
fn test_round_trip_preserves_graph() {
    let bytes = raw_graph(&[1, 2], None);
    let original = loaded(&bytes);
    let mut resaved = loaded(&bytes);
    let copy = loaded(&resaved.save().unwrap());

    let ids = |s: &Surface| s.nodes().map(|n| (n.id, n.kind, n.values.clone())).collect::<Vec<_>>();
    assert_eq!(ids(&original), ids(&copy));
    assert_eq!(original.parameters().len(), 1);
    let (p, q) = (&original.parameters()[0], &copy.parameters()[0]);
    assert_eq!(p.id, SPEED_ID);
    assert_eq!((p.id, &p.name, &p.value), (q.id, &q.name, &q.value));
    assert_eq!(
        (p.is_public, p.is_static, p.is_ui_visible, p.is_ui_editable),
        (true, false, true, true)
    );
    assert_eq!(
        (p.is_public, p.is_static, p.is_ui_visible, p.is_ui_editable),
        (q.is_public, q.is_static, q.is_ui_visible, q.is_ui_editable)
    );
    assert_eq!(q.referenced_by, vec![NodeId(1), NodeId(2)]);

    let edges = |s: &Surface| s.connections().copied().collect::<Vec<_>>();
    assert_eq!(edges(&original), edges(&copy));
    assert_eq!(original.connection_count(), 1);
}

#[test]
fn test_save_is_deterministic() {
    let mut surface = loaded(&raw_graph(&[1], None));
    let first = surface.save().unwrap();
    let second = loaded(&first).save().unwrap();
    assert_eq!(first, second);
    // header: pinned build and zero timestamp regardless of what was read
    assert_eq!(&first[4..8], &6118u32.to_le_bytes());
    assert_eq!(&first[8..16], &0i64.to_le_bytes());
    assert_eq!(surface.engine_build(), 6000);
}

#[test]
fn test_magic_mismatch_clears_surface() {
    init_logging();
    let mut surface = loaded(&raw_graph(&[1], None));
    assert_eq!(surface.node_count(), 2);

    let mut bytes = raw_graph(&[1], None);
    bytes[0] ^= 0xFF;
    let err = surface.load(&bytes).unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidMagic { .. }));
    assert!(err.is_format_error());
    assert_eq!(surface.node_count(), 0);
    assert!(surface.parameters().is_empty());
    assert_eq!(surface.connection_count(), 0);
    assert!(surface.is_enabled());
}

#[test]
fn test_missing_terminator_fails() {
    let mut bytes = raw_graph(&[1], None);
    bytes.pop();
    let mut surface = Surface::new(registry());
    let err = surface.load(&bytes).unwrap_err();
    assert!(err.is_format_error());
    assert!(err.is_truncated());
    assert_eq!(surface.node_count(), 0);

    let mut bytes = raw_graph(&[1], None);
    *bytes.last_mut().unwrap() = b' ';
    let err = surface.load(&bytes).unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidTerminator { found: b' ' }));
    assert_eq!(surface.connection_count(), 0);
}

#[test]
fn test_dangling_parameter_reference_is_dropped() {
    init_logging();
    let surface = loaded(&raw_graph(&[1, 99, 2], None));
    let param = surface.parameter(SPEED_ID).unwrap();
    assert_eq!(param.referenced_by, vec![NodeId(1), NodeId(2)]);
    assert_eq!(surface.node_count(), 2);
    assert_eq!(surface.connection_count(), 1);
}

#[test]
fn test_dangling_connection_is_dropped() {
    init_logging();
    let surface = loaded(&raw_graph(&[1], Some((77, 0))));
    assert_eq!(surface.node_count(), 2);
    assert_eq!(surface.connection_count(), 1);
    assert_eq!(surface.connections_of(pin(1, 0)), vec![pin(2, 0)]);
    assert_eq!(surface.parameters().len(), 1);
}

#[test]
fn test_extra_connection_from_one_side_is_kept() {
    // node 1 pin 0 also lists node 2 pin 1, which does not list it back
    let surface = loaded(&raw_graph(&[], Some((2, 1))));
    assert_eq!(surface.connection_count(), 2);
    assert!(surface.are_connected(pin(2, 1), pin(1, 0)));
}

#[test]
fn test_values_are_loaded_into_slots() {
    let surface = loaded(&raw_graph(&[], None));
    assert_eq!(surface.node(NodeId(1)).unwrap().values, vec![Value::Float(0.5)]);
    assert!(surface.node(NodeId(2)).unwrap().values.is_empty());
}

#[test]
fn test_unsupported_value_tag_fails_load() {
    let mut bytes = raw_graph(&[], None);
    // parameter value tag sits right after the reference count
    let tag_at = bytes
        .windows(5)
        .position(|w| w == [2, 0, 0, 0x20, 0x40])
        .unwrap();
    bytes[tag_at] = 11;
    let mut surface = Surface::new(registry());
    assert!(matches!(
        surface.load(&bytes).unwrap_err(),
        SurfaceError::UnsupportedValueTag(11)
    ));
    assert_eq!(surface.node_count(), 0);
}

#[test]
fn test_unknown_meta_entries_round_trip_on_parameters() {
    let mut surface = loaded(&raw_graph(&[], None));
    let mut param = Parameter::new("Tint", Value::Color([1.0, 0.0, 0.0, 1.0]));
    param.meta.add_entry(77, vec![9, 8, 7]);
    surface.add_parameter(param).unwrap();

    let reloaded = loaded(&surface.save().unwrap());
    let tint = reloaded.parameter_by_name("Tint").unwrap();
    assert_eq!(tint.meta.entry(77), Some(&[9u8, 8, 7][..]));
}

#[test]
fn test_string_values_round_trip() {
    let mut surface = Surface::new(registry());
    surface
        .add_parameter(Parameter::new("Label", Value::String("Płomień ✓".to_string())))
        .unwrap();
    let reloaded = loaded(&surface.save().unwrap());
    assert_eq!(
        reloaded.parameter_by_name("Label").unwrap().value.as_str(),
        Some("Płomień ✓")
    );
}

#[test]
fn test_load_hooks_fire_in_order() {
    let mut source = Surface::new(registry());
    source.spawn_node(2, 1).unwrap();
    source.spawn_node(3, 1).unwrap();
    let bytes = source.save().unwrap();

    let factory = RecordingFactory::new();
    let mut surface = Surface::new(factory.clone());
    surface.load(&bytes).unwrap();
    assert_eq!(
        factory.take(),
        vec![
            Hook::NodeLoaded(NodeId(1), true),
            Hook::NodeLoaded(NodeId(2), true),
            Hook::SurfaceLoaded(NodeId(1)),
            Hook::SurfaceLoaded(NodeId(2)),
        ]
    );
}

#[test]
fn test_failed_load_skips_surface_loaded() {
    let factory = RecordingFactory::new();
    let mut surface = Surface::new(factory.clone());

    let mut bytes = raw_graph(&[1], None);
    *bytes.last_mut().unwrap() = b' ';
    surface.load(&bytes).unwrap_err();
    assert_eq!(
        factory.take(),
        vec![Hook::NodeLoaded(NodeId(1), false), Hook::NodeLoaded(NodeId(2), false)]
    );

    let mut bytes = raw_graph(&[1], None);
    bytes[0] ^= 0xFF;
    surface.load(&bytes).unwrap_err();
    assert!(factory.take().is_empty());

    surface.load(&raw_graph(&[1], None)).unwrap();
    let hooks = factory.take();
    assert_eq!(hooks.len(), 4);
    assert_eq!(hooks[2..], [Hook::SurfaceLoaded(NodeId(1)), Hook::SurfaceLoaded(NodeId(2))]);
}

proptest! {
    #[test]
    fn prop_obfuscated_strings_round_trip(s in "\\PC{0,64}", use_name_key in any::<bool>()) {
        let key = if use_name_key { NAME_KEY } else { VALUE_STRING_KEY };
        let mut writer = SurfaceWriter::new(Vec::new());
        writer.write_string(&s, key, None).unwrap();
        let bytes = writer.into_inner();
        let mut reader = SurfaceReader::new(Cursor::new(bytes));
        prop_assert_eq!(reader.read_string(key, None).unwrap(), s);
    }

    #[test]
    fn prop_bit_flip_changes_string(s in "[a-zA-Z0-9 ]{1,32}", bit in 0u32..7) {
        let mut writer = SurfaceWriter::new(Vec::new());
        writer.write_string(&s, VALUE_STRING_KEY, None).unwrap();
        let mut bytes = writer.into_inner();
        bytes[4] ^= 1 << bit;
        let mut reader = SurfaceReader::new(Cursor::new(bytes));
        let decoded = reader.read_string(VALUE_STRING_KEY, None).unwrap();
        prop_assert_ne!(decoded, s);
    }
}
