// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for surface loading, saving and editing.

use crate::node::NodeId;
use crate::parameter::ParameterType;
use crate::pin::PinId;
use crate::value::ValueType;
use thiserror::Error;
use uuid::Uuid;

/// Errors that abort a whole load or save pass.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The stream does not start with the graph magic code
    #[error("Invalid graph format version (magic code {found})")]
    InvalidMagic {
        /// Magic code read from the stream
        found: i32,
    },

    /// The stream does not end with the terminator byte
    #[error("Invalid data: expected terminator 0x09, found {found:#04x}")]
    InvalidTerminator {
        /// Byte read in place of the terminator
        found: u8,
    },

    /// Stored value count does not match the node schema
    #[error("Invalid node values for node {node:?}: schema expects {expected}, stream has {found}")]
    ValuesCountMismatch {
        /// Node being loaded
        node: NodeId,
        /// Value slots declared by the node schema
        expected: usize,
        /// Value count read from the stream
        found: i32,
    },

    /// The node factory does not know the `(group, type)` pair
    #[error("Unknown node type (id {node:?}, group {group_id}, type {type_id})")]
    UnknownNodeType {
        /// Node id read from the stream
        node: NodeId,
        /// Group id read from the stream
        group_id: u16,
        /// Type id read from the stream
        type_id: u16,
    },

    /// Two node headers share the same id
    #[error("Duplicate node id: {0:?}")]
    DuplicateNodeId(NodeId),

    /// A tagged value uses a tag this codec cannot decode
    #[error("Unsupported value tag: {0}")]
    UnsupportedValueTag(u8),

    /// A tagged value kind is reserved and cannot be encoded
    #[error("Unsupported value type: {0:?}")]
    UnsupportedValueType(ValueType),

    /// Obfuscated string exceeds the configured limit
    #[error("String too long: {length} characters (limit {limit})")]
    StringTooLong {
        /// Character count read from the stream
        length: i32,
        /// Configured limit
        limit: usize,
    },

    /// String data is not valid UTF-16
    #[error("Invalid UTF-16 string data")]
    InvalidString,

    /// A collection is too large for its on-disk count field
    #[error("Too many {what} to encode: {count}")]
    CountOverflow {
        /// What was being counted
        what: &'static str,
        /// Actual element count
        count: usize,
    },

    /// Underlying stream fault (usually truncated data)
    #[error("Stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfaceError {
    /// Whether this error signals malformed or unwritable graph data.
    ///
    /// Every variant belongs to the format error class: stream faults are
    /// reported the same way as structural mismatches.
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::InvalidMagic { .. }
            | Self::InvalidTerminator { .. }
            | Self::ValuesCountMismatch { .. }
            | Self::UnknownNodeType { .. }
            | Self::DuplicateNodeId(_)
            | Self::UnsupportedValueTag(_)
            | Self::UnsupportedValueType(_)
            | Self::StringTooLong { .. }
            | Self::InvalidString
            | Self::CountOverflow { .. }
            | Self::Io(_) => true,
        }
    }

    /// Whether the stream ended before the graph was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Result type for surface load/save operations
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Error when editing a loaded surface
#[derive(Debug, Error)]
pub enum EditError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Pin not found on the node
    #[error("Pin {pin:?} not found on node {node:?}")]
    PinNotFound {
        /// Node that was searched
        node: NodeId,
        /// Missing pin
        pin: PinId,
    },

    /// The node factory does not know the `(group, type)` pair
    #[error("Unknown node type (group {group_id}, type {type_id})")]
    UnknownNodeType {
        /// Requested group id
        group_id: u16,
        /// Requested type id
        type_id: u16,
    },

    /// Pin directions or types do not match
    #[error("Incompatible pins")]
    IncompatiblePins,

    /// Single-connection pin already has a connection
    #[error("Pin {pin:?} on node {node:?} is already connected")]
    PinAlreadyConnected {
        /// Node owning the pin
        node: NodeId,
        /// Occupied pin
        pin: PinId,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The pins are already connected
    #[error("Pins already connected")]
    AlreadyConnected,

    /// Parameter not found
    #[error("Parameter not found: {0}")]
    ParameterNotFound(Uuid),

    /// Another parameter already uses the name
    #[error("Parameter name already in use: {0}")]
    DuplicateParameterName(String),

    /// Node id space is exhausted
    #[error("No free node ids left")]
    NodeIdsExhausted,

    /// Parameter name is too long to be stored
    #[error("Parameter name too long: {length} characters (limit {limit})")]
    NameTooLong {
        length: usize,
        limit: usize,
    },

    /// Value kind differs from the parameter's declared type
    #[error("Value type {found:?} does not match parameter type {expected:?}")]
    ValueTypeMismatch {
        expected: ParameterType,
        found: ValueType,
    },
}
