// SPDX-License-Identifier: MIT OR Apache-2.0
//! Little-endian primitive reader/writer used by the surface format.
//!
//! Every multi-byte field in a surface file is little-endian. Strings are
//! stored as an `i32` character count followed by UTF-16 code units, each
//! XOR-ed with a static 16-bit key. The key is not a security measure; it only
//! has to match the native reader.

use crate::error::{Result, SurfaceError};
use std::io::{Read, Write};
use uuid::Uuid;

/// XOR key applied to parameter names
pub const NAME_KEY: u16 = 97;

/// XOR key applied to string-typed values
pub const VALUE_STRING_KEY: u16 = 953;

/// Apply the reversible XOR transform to UTF-16 code units in place.
pub fn obfuscate(units: &mut [u16], key: u16) {
    for unit in units {
        *unit ^= key;
    }
}

/// Reads little-endian primitives from an underlying byte source.
pub struct SurfaceReader<R> {
    inner: R,
}

impl<R: Read> SurfaceReader<R> {
    /// Wrap a byte source
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a byte as a boolean (any non-zero value is `true`)
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a `u16`
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read an `i32`
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read an `i64`
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read an `f32`
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read `N` consecutive `f32` values
    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0.0f32; N];
        for v in &mut out {
            *v = self.read_f32()?;
        }
        Ok(out)
    }

    /// Read a 16-byte GUID in the native runtime's byte order
    pub fn read_guid(&mut self) -> Result<Uuid> {
        Ok(Uuid::from_bytes_le(self.read_array()?))
    }

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if read != len {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buf)
    }

    /// Read an obfuscated UTF-16 string.
    ///
    /// A non-positive length decodes to the empty string. Lengths above
    /// `limit` are rejected before any character data is consumed.
    pub fn read_string(&mut self, key: u16, limit: Option<usize>) -> Result<String> {
        let length = self.read_i32()?;
        if length <= 0 {
            return Ok(String::new());
        }
        if let Some(limit) = limit {
            if length as usize >= limit {
                return Err(SurfaceError::StringTooLong { length, limit });
            }
        }

        let mut units = Vec::with_capacity((length as usize).min(4096));
        for _ in 0..length {
            units.push(self.read_u16()?);
        }
        obfuscate(&mut units, key);
        String::from_utf16(&units).map_err(|_| SurfaceError::InvalidString)
    }
}

/// Writes little-endian primitives into an underlying byte sink.
pub struct SurfaceWriter<W> {
    inner: W,
}

impl<W: Write> SurfaceWriter<W> {
    /// Wrap a byte sink
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the byte sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a single byte
    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_all(&[v])?;
        Ok(())
    }

    /// Write a boolean as a single byte
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    /// Write a `u16`
    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write an `i32`
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write an `i64`
    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write an `f32`
    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write consecutive `f32` values
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        for v in values {
            self.write_f32(*v)?;
        }
        Ok(())
    }

    /// Write a 16-byte GUID in the native runtime's byte order
    pub fn write_guid(&mut self, id: &Uuid) -> Result<()> {
        self.inner.write_all(&id.to_bytes_le())?;
        Ok(())
    }

    /// Write raw bytes with no length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write an `i32` element count, failing if it does not fit
    pub fn write_count_i32(&mut self, count: usize, what: &'static str) -> Result<()> {
        let v = i32::try_from(count).map_err(|_| SurfaceError::CountOverflow { what, count })?;
        self.write_i32(v)
    }

    /// Write a `u16` element count, failing if it does not fit
    pub fn write_count_u16(&mut self, count: usize, what: &'static str) -> Result<()> {
        let v = u16::try_from(count).map_err(|_| SurfaceError::CountOverflow { what, count })?;
        self.write_u16(v)
    }

    /// Write an obfuscated UTF-16 string.
    ///
    /// Strings that [`SurfaceReader::read_string`] would reject under the
    /// same `limit` are refused before anything is written.
    pub fn write_string(&mut self, s: &str, key: u16, limit: Option<usize>) -> Result<()> {
        let mut units: Vec<u16> = s.encode_utf16().collect();
        if let Some(limit) = limit {
            if units.len() >= limit {
                return Err(SurfaceError::StringTooLong {
                    length: i32::try_from(units.len()).unwrap_or(i32::MAX),
                    limit,
                });
            }
        }
        self.write_count_i32(units.len(), "string characters")?;
        obfuscate(&mut units, key);
        for unit in units {
            self.write_u16(unit)?;
        }
        Ok(())
    }
}
