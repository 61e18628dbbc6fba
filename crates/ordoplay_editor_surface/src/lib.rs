// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visject surface graphs for `OrdoPlay` Editor.
//!
//! A surface is the node graph behind material and logic assets. This crate
//! provides:
//! - The in-memory model (nodes, pins, connections, parameters)
//! - Metadata chunks for view and canvas state
//! - The binary format shared with the native runtime
//!
//! ## Architecture
//!
//! [`Surface`] owns every node and parameter and drives loading and saving.
//! Node schemas live outside the surface behind the [`NodeFactory`] trait;
//! [`NodeRegistry`] is the table-driven implementation.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod meta;
pub mod node;
pub mod parameter;
pub mod pin;
pub mod stream;
pub mod surface;
pub mod value;

pub use codec::{GraphData, MAGIC_CODE, TERMINATOR};
pub use config::SurfaceConfig;
pub use connection::{Connection, PinRef};
pub use error::{EditError, Result, SurfaceError};
pub use meta::{NodeMeta, SurfaceMeta, ViewMeta};
pub use node::{Node, NodeArchetype, NodeFactory, NodeId, NodeKind, NodeRegistry};
pub use parameter::{Parameter, ParameterType};
pub use pin::{Pin, PinDirection, PinId, PinType};
pub use surface::{Surface, SurfaceOwner};
pub use value::{Value, ValueType};
