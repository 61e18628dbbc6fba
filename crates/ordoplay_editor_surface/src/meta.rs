// SPDX-License-Identifier: MIT OR Apache-2.0
//! Metadata chunks attached to the surface, nodes and parameters.
//!
//! A chunk store maps an integer entry kind to an opaque byte blob. Kinds the
//! editor does not interpret are kept verbatim so they survive a save.

use crate::error::Result;
use crate::stream::{SurfaceReader, SurfaceWriter};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Entry kind holding the surface view state ([`ViewMeta`])
pub const SURFACE_VIEW_META: i32 = 10;

/// Entry kind holding a node's canvas state ([`NodeMeta`])
pub const NODE_CANVAS_META: i32 = 11;

/// Ordered list of `(kind, bytes)` entries.
///
/// Entries are kept exactly as read, including repeated kinds. Lookups and
/// [`SurfaceMeta::add_entry`] act on the first entry of a kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMeta {
    entries: Vec<(i32, Vec<u8>)>,
}

impl SurfaceMeta {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read entries from the stream, replacing the current contents.
    ///
    /// `engine_build` is the build number from the file header; the current
    /// entry layout is the same for every build.
    pub fn load<R: Read>(&mut self, engine_build: u32, reader: &mut SurfaceReader<R>) -> Result<()> {
        self.entries.clear();
        let count = reader.read_i32()?;
        for _ in 0..count.max(0) {
            let kind = reader.read_i32()?;
            let size = reader.read_i32()?;
            let data = reader.read_bytes(size.max(0) as usize)?;
            self.entries.push((kind, data));
        }
        tracing::trace!(engine_build, entries = self.entries.len(), "Loaded meta chunk");
        Ok(())
    }

    /// Write all entries, including kinds this process does not interpret
    pub fn save<W: Write>(&self, writer: &mut SurfaceWriter<W>) -> Result<()> {
        writer.write_count_i32(self.entries.len(), "meta entries")?;
        for (kind, data) in &self.entries {
            writer.write_i32(*kind)?;
            writer.write_count_i32(data.len(), "meta entry bytes")?;
            writer.write_bytes(data)?;
        }
        Ok(())
    }

    /// Insert or overwrite an entry
    pub fn add_entry(&mut self, kind: i32, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = data,
            None => self.entries.push((kind, data)),
        }
    }

    /// Get an entry's bytes
    pub fn entry(&self, kind: i32) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, data)| data.as_slice())
    }

    /// Remove an entry
    pub fn remove_entry(&mut self, kind: i32) -> Option<Vec<u8>> {
        let index = self.entries.iter().position(|(k, _)| *k == kind)?;
        Some(self.entries.remove(index).1)
    }

    /// Remove all entries
    pub fn release(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(kind, bytes)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[u8])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

fn f32_at(bytes: &[u8], offset: usize) -> Option<f32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(f32::from_le_bytes(raw))
}

/// Surface view state stored under [`SURFACE_VIEW_META`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMeta {
    /// Canvas point at the center of the view
    pub view_center: [f32; 2],
    /// Zoom factor
    pub scale: f32,
}

impl ViewMeta {
    /// Encoded size in bytes
    pub const SIZE: usize = 12;

    /// Encode as `x, y, scale`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.view_center[0].to_le_bytes());
        out.extend_from_slice(&self.view_center[1].to_le_bytes());
        out.extend_from_slice(&self.scale.to_le_bytes());
        out
    }

    /// Decode, returning `None` when the entry is too short
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Some(Self {
            view_center: [f32_at(bytes, 0)?, f32_at(bytes, 4)?],
            scale: f32_at(bytes, 8)?,
        })
    }
}

impl Default for ViewMeta {
    fn default() -> Self {
        Self {
            view_center: [0.0, 0.0],
            scale: 1.0,
        }
    }
}

/// Node canvas state stored under [`NODE_CANVAS_META`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeMeta {
    /// Node location on the canvas
    pub position: [f32; 2],
    /// Whether the node is selected
    pub selected: bool,
}

impl NodeMeta {
    /// Encoded size in bytes (the flag occupies a 4-byte boolean)
    pub const SIZE: usize = 12;

    /// Encode as `x, y, selected`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.position[0].to_le_bytes());
        out.extend_from_slice(&self.position[1].to_le_bytes());
        out.extend_from_slice(&u32::from(self.selected).to_le_bytes());
        out
    }

    /// Decode, returning `None` when the entry is too short
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let flag = bytes.get(8..)?;
        if flag.is_empty() {
            return None;
        }
        Some(Self {
            position: [f32_at(bytes, 0)?, f32_at(bytes, 4)?],
            selected: flag.iter().take(4).any(|b| *b != 0),
        })
    }
}
