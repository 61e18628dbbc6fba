// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tagged values stored in node slots and parameters.
//!
//! On disk every value is a one-byte tag followed by a fixed payload:
//!
//! | Tag | Kind    | Payload                          |
//! |-----|---------|----------------------------------|
//! | 0   | Bool    | 1 byte                           |
//! | 1   | Int     | `i32`                            |
//! | 2   | Float   | `f32`                            |
//! | 3   | Vector2 | 2 × `f32`                        |
//! | 4   | Vector3 | 3 × `f32`                        |
//! | 5   | Vector4 | 4 × `f32`                        |
//! | 6   | Color   | 4 × `f32` (RGBA)                 |
//! | 7   | Guid    | 16 raw bytes                     |
//! | 8   | String  | obfuscated UTF-16 (key 953)      |
//!
//! Tags 9 to 13 are reserved by the format (box, rotation, transform, sphere,
//! rect) and are rejected in both directions.

use crate::error::{Result, SurfaceError};
use crate::stream::{SurfaceReader, SurfaceWriter, VALUE_STRING_KEY};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use uuid::Uuid;

/// Kind of a tagged value, with its wire tag as discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    /// Boolean
    Bool = 0,
    /// 32-bit signed integer
    Int = 1,
    /// 32-bit float
    Float = 2,
    /// 2D vector
    Vector2 = 3,
    /// 3D vector
    Vector3 = 4,
    /// 4D vector
    Vector4 = 5,
    /// Linear RGBA color
    Color = 6,
    /// Asset or object identifier
    Guid = 7,
    /// Text
    String = 8,
    /// Bounding box (reserved)
    BoundingBox = 9,
    /// Quaternion rotation (reserved)
    Rotation = 10,
    /// Transform (reserved)
    Transform = 11,
    /// Bounding sphere (reserved)
    BoundingSphere = 12,
    /// Rectangle (reserved)
    Rect = 13,
}

impl ValueType {
    /// Get the wire tag for this kind
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag, including reserved kinds
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bool),
            1 => Some(Self::Int),
            2 => Some(Self::Float),
            3 => Some(Self::Vector2),
            4 => Some(Self::Vector3),
            5 => Some(Self::Vector4),
            6 => Some(Self::Color),
            7 => Some(Self::Guid),
            8 => Some(Self::String),
            9 => Some(Self::BoundingBox),
            10 => Some(Self::Rotation),
            11 => Some(Self::Transform),
            12 => Some(Self::BoundingSphere),
            13 => Some(Self::Rect),
            _ => None,
        }
    }

    /// Whether values of this kind can be encoded and decoded
    pub fn is_supported(self) -> bool {
        self.tag() <= Self::String.tag()
    }

    /// Default value for a supported kind
    pub fn default_value(self) -> Option<Value> {
        let value = match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Vector2 => Value::Vector2([0.0; 2]),
            Self::Vector3 => Value::Vector3([0.0; 3]),
            Self::Vector4 => Value::Vector4([0.0; 4]),
            Self::Color => Value::Color([0.0, 0.0, 0.0, 1.0]),
            Self::Guid => Value::Guid(Uuid::nil()),
            Self::String => Value::String(String::new()),
            Self::BoundingBox
            | Self::Rotation
            | Self::Transform
            | Self::BoundingSphere
            | Self::Rect => return None,
        };
        Some(value)
    }
}

/// A tagged value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color (RGBA)
    Color([f32; 4]),
    /// Identifier
    Guid(Uuid),
    /// String
    String(String),
}

impl Value {
    /// Get the kind of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vector2(_) => ValueType::Vector2,
            Self::Vector3(_) => ValueType::Vector3,
            Self::Vector4(_) => ValueType::Vector4,
            Self::Color(_) => ValueType::Color,
            Self::Guid(_) => ValueType::Guid,
            Self::String(_) => ValueType::String,
        }
    }

    /// Get the value as a float, if it is one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Decode one tagged value.
///
/// `string_limit` bounds the character count of string values.
pub fn read_value<R: Read>(reader: &mut SurfaceReader<R>, string_limit: Option<usize>) -> Result<Value> {
    let tag = reader.read_u8()?;
    let kind = ValueType::from_tag(tag).ok_or(SurfaceError::UnsupportedValueTag(tag))?;

    let value = match kind {
        ValueType::Bool => Value::Bool(reader.read_bool()?),
        ValueType::Int => Value::Int(reader.read_i32()?),
        ValueType::Float => Value::Float(reader.read_f32()?),
        ValueType::Vector2 => Value::Vector2(reader.read_f32_array()?),
        ValueType::Vector3 => Value::Vector3(reader.read_f32_array()?),
        ValueType::Vector4 => Value::Vector4(reader.read_f32_array()?),
        ValueType::Color => Value::Color(reader.read_f32_array()?),
        ValueType::Guid => Value::Guid(reader.read_guid()?),
        ValueType::String => Value::String(reader.read_string(VALUE_STRING_KEY, string_limit)?),
        ValueType::BoundingBox
        | ValueType::Rotation
        | ValueType::Transform
        | ValueType::BoundingSphere
        | ValueType::Rect => return Err(SurfaceError::UnsupportedValueTag(tag)),
    };
    Ok(value)
}

/// Encode one tagged value.
///
/// `string_limit` bounds the character count of string values, as on read.
pub fn write_value<W: Write>(writer: &mut SurfaceWriter<W>, value: &Value, string_limit: Option<usize>) -> Result<()> {
    writer.write_u8(value.value_type().tag())?;
    match value {
        Value::Bool(v) => writer.write_bool(*v),
        Value::Int(v) => writer.write_i32(*v),
        Value::Float(v) => writer.write_f32(*v),
        Value::Vector2(v) => writer.write_f32_slice(v),
        Value::Vector3(v) => writer.write_f32_slice(v),
        Value::Vector4(v) | Value::Color(v) => writer.write_f32_slice(v),
        Value::Guid(id) => writer.write_guid(id),
        Value::String(s) => writer.write_string(s, VALUE_STRING_KEY, string_limit),
    }
}
