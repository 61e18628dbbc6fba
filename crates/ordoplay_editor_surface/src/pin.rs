// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin (box) definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};

/// Identifier of a pin, unique within its node only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinId(pub u8);

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Bit flags describing which connection types a pin accepts.
///
/// The numeric layout is shared with the native runtime and is stored as a
/// `u32` in the pin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinType(pub u32);

impl PinType {
    /// Accepts nothing
    pub const INVALID: Self = Self(0);
    /// Execution flow
    pub const IMPULSE: Self = Self(1);
    /// Boolean
    pub const BOOL: Self = Self(1 << 1);
    /// Integer
    pub const INTEGER: Self = Self(1 << 2);
    /// Float
    pub const FLOAT: Self = Self(1 << 3);
    /// 2D vector
    pub const VECTOR2: Self = Self(1 << 4);
    /// 3D vector
    pub const VECTOR3: Self = Self(1 << 5);
    /// 4D vector
    pub const VECTOR4: Self = Self(1 << 6);
    /// String
    pub const STRING: Self = Self(1 << 7);
    /// Object reference
    pub const OBJECT: Self = Self(1 << 8);

    /// Any vector type
    pub const VECTOR: Self = Self(Self::VECTOR2.0 | Self::VECTOR3.0 | Self::VECTOR4.0);
    /// Any scalar or vector type
    pub const VARIABLE: Self =
        Self(Self::BOOL.0 | Self::INTEGER.0 | Self::FLOAT.0 | Self::VECTOR.0);

    /// Whether the two masks share at least one type
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// A pin on a node.
///
/// Connections are owned by the surface, not by the pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Pin ID within the node
    pub id: PinId,
    /// Pin name
    pub name: String,
    /// Pin direction
    pub direction: PinDirection,
    /// Declared default connection type
    pub default_type: PinType,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Pin {
    /// Create a new pin
    pub fn new(
        id: u8,
        name: impl Into<String>,
        default_type: PinType,
        direction: PinDirection,
    ) -> Self {
        Self {
            id: PinId(id),
            name: name.into(),
            direction,
            default_type,
            multi_connect: direction == PinDirection::Output,
        }
    }

    /// Create a new input pin
    pub fn input(id: u8, name: impl Into<String>, default_type: PinType) -> Self {
        Self::new(id, name, default_type, PinDirection::Input)
    }

    /// Create a new output pin
    pub fn output(id: u8, name: impl Into<String>, default_type: PinType) -> Self {
        Self::new(id, name, default_type, PinDirection::Output)
    }

    /// Check if a connection to another pin is valid
    pub fn can_connect(&self, other: &Pin) -> bool {
        self.direction != other.direction && self.default_type.intersects(other.default_type)
    }
}
