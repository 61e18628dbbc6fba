// SPDX-License-Identifier: MIT OR Apache-2.0
//! Surface parameters: named, graph-global inputs shared by nodes.

use crate::error::{Result, SurfaceError};
use crate::meta::SurfaceMeta;
use crate::node::NodeId;
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameter type byte as stored in the file.
///
/// Editors may define more parameter types than there are value kinds
/// (texture references are stored as GUID values, for instance), so the byte
/// is kept as-is rather than narrowed to [`ValueType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterType(pub u8);

impl From<ValueType> for ParameterType {
    fn from(kind: ValueType) -> Self {
        Self(kind.tag())
    }
}

/// A named surface parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Stable identity, preserved across save/load
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Declared type
    pub param_type: ParameterType,
    /// Exposed to instances of the asset
    pub is_public: bool,
    /// Cannot be changed at runtime
    pub is_static: bool,
    /// Shown in the editor UI
    pub is_ui_visible: bool,
    /// Editable in the editor UI
    pub is_ui_editable: bool,
    /// Current value
    pub value: Value,
    /// Nodes that read this parameter (non-owning)
    pub referenced_by: Vec<NodeId>,
    /// Metadata chunks
    pub meta: SurfaceMeta,
}

impl Parameter {
    /// Create a public, UI-visible parameter whose type follows `value`
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            param_type: value.value_type().into(),
            is_public: true,
            is_static: false,
            is_ui_visible: true,
            is_ui_editable: true,
            value,
            referenced_by: Vec::new(),
            meta: SurfaceMeta::new(),
        }
    }

    /// Create a parameter holding the default value of `kind`
    pub fn with_default(name: impl Into<String>, kind: ValueType) -> Result<Self> {
        let value = kind
            .default_value()
            .ok_or(SurfaceError::UnsupportedValueType(kind))?;
        Ok(Self::new(name, value))
    }

    /// Set the identity
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Whether `node` is recorded as a reader of this parameter
    pub fn is_referenced_by(&self, node: NodeId) -> bool {
        self.referenced_by.contains(&node)
    }
}
