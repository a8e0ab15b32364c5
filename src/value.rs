//! Typed values — the unit of every parameter and metric cell.
//!
//! A `Value` is a closed sum over the eight primitive kinds the format
//! stores. Every encode/decode site matches the enum exhaustively, so adding
//! a kind is a compile-checked change everywhere. The type tag string is
//! derived from the kind and can never disagree with the payload.
//!
//! On-disk payload (little-endian):
//! ```text
//! Int8/UInt8          1 byte
//! Int16/UInt16        2 bytes
//! Int32/UInt32/Float  4 bytes
//! Text                [unit_count: u32][units: u16 x unit_count]   UTF-16
//! Ascii               [byte_count: u32][bytes: u8 x byte_count]    UTF-8
//! ```

use std::io::Write;

use serde::Serialize;

use crate::error::{FileError, Result};

// ── Type Tags ──────────────────────────────────────────────────────

pub const INT8_TAG: &str = "text/x-chip-integer-8";
pub const UINT8_TAG: &str = "text/x-chip-unsigned-integer-8";
pub const INT16_TAG: &str = "text/x-chip-integer-16";
pub const UINT16_TAG: &str = "text/x-chip-unsigned-integer-16";
pub const INT32_TAG: &str = "text/x-chip-integer-32";
pub const UINT32_TAG: &str = "text/x-chip-unsigned-integer-32";
pub const FLOAT_TAG: &str = "text/x-chip-float";
pub const TEXT_TAG: &str = "text/plain";
pub const ASCII_TAG: &str = "text/ascii";

// ── ValueKind ──────────────────────────────────────────────────────

/// Discriminant of a `Value` (stored as u8 on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ValueKind {
    Int8 = 0,
    UInt8 = 1,
    Int16 = 2,
    UInt16 = 3,
    Int32 = 4,
    UInt32 = 5,
    Float32 = 6,
    /// UTF-16 text ("text/plain").
    Text = 7,
    /// UTF-8/ASCII text ("text/ascii").
    Ascii = 8,
}

impl ValueKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Int8),
            1 => Some(Self::UInt8),
            2 => Some(Self::Int16),
            3 => Some(Self::UInt16),
            4 => Some(Self::Int32),
            5 => Some(Self::UInt32),
            6 => Some(Self::Float32),
            7 => Some(Self::Text),
            8 => Some(Self::Ascii),
            _ => None,
        }
    }

    /// Human/machine-readable type tag (MIME style).
    pub fn type_tag(&self) -> &'static str {
        match self {
            ValueKind::Int8 => INT8_TAG,
            ValueKind::UInt8 => UINT8_TAG,
            ValueKind::Int16 => INT16_TAG,
            ValueKind::UInt16 => UINT16_TAG,
            ValueKind::Int32 => INT32_TAG,
            ValueKind::UInt32 => UINT32_TAG,
            ValueKind::Float32 => FLOAT_TAG,
            ValueKind::Text => TEXT_TAG,
            ValueKind::Ascii => ASCII_TAG,
        }
    }

    /// Payload width in bytes for numeric kinds; `None` for text kinds
    /// (variable, length-prefixed).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ValueKind::Int8 | ValueKind::UInt8 => Some(1),
            ValueKind::Int16 | ValueKind::UInt16 => Some(2),
            ValueKind::Int32 | ValueKind::UInt32 | ValueKind::Float32 => Some(4),
            ValueKind::Text | ValueKind::Ascii => None,
        }
    }
}

// ── Value ──────────────────────────────────────────────────────────

/// One typed value. The payload and its kind are a single unit; there is no
/// way to hold bytes tagged with the wrong kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    /// UTF-16 on disk.
    Text(String),
    /// UTF-8/ASCII on disk.
    Ascii(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int8(_) => ValueKind::Int8,
            Value::UInt8(_) => ValueKind::UInt8,
            Value::Int16(_) => ValueKind::Int16,
            Value::UInt16(_) => ValueKind::UInt16,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Float32(_) => ValueKind::Float32,
            Value::Text(_) => ValueKind::Text,
            Value::Ascii(_) => ValueKind::Ascii,
        }
    }

    /// Type tag, always in agreement with the payload.
    pub fn type_tag(&self) -> &'static str {
        self.kind().type_tag()
    }

    fn mismatch(&self, requested: ValueKind) -> FileError {
        FileError::TypeMismatch {
            requested,
            stored: self.kind(),
        }
    }

    // ── Typed accessors ────────────────────────────────────────────

    pub fn as_i8(&self) -> Result<i8> {
        match self {
            Value::Int8(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::Int8)),
        }
    }

    pub fn as_u8(&self) -> Result<u8> {
        match self {
            Value::UInt8(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::UInt8)),
        }
    }

    pub fn as_i16(&self) -> Result<i16> {
        match self {
            Value::Int16(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::Int16)),
        }
    }

    pub fn as_u16(&self) -> Result<u16> {
        match self {
            Value::UInt16(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::UInt16)),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Value::Int32(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::Int32)),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Value::UInt32(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::UInt32)),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Value::Float32(v) => Ok(*v),
            _ => Err(self.mismatch(ValueKind::Float32)),
        }
    }

    pub fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            _ => Err(self.mismatch(ValueKind::Text)),
        }
    }

    pub fn as_ascii(&self) -> Result<&str> {
        match self {
            Value::Ascii(s) => Ok(s),
            _ => Err(self.mismatch(ValueKind::Ascii)),
        }
    }

    /// Render any value as text. Never fails; used for parameter dumps and
    /// diagnostics that don't care about the exact kind.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Int8(v) => v.to_string(),
            Value::UInt8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::UInt16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::UInt32(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Ascii(s) => s.clone(),
        }
    }

    // ── Payload codec ──────────────────────────────────────────────

    /// Serialized payload size in bytes (excluding the kind byte).
    pub fn payload_size(&self) -> usize {
        match self {
            Value::Int8(_) | Value::UInt8(_) => 1,
            Value::Int16(_) | Value::UInt16(_) => 2,
            Value::Int32(_) | Value::UInt32(_) | Value::Float32(_) => 4,
            Value::Text(s) => 4 + 2 * s.encode_utf16().count(),
            Value::Ascii(s) => 4 + s.len(),
        }
    }

    /// Write the payload (little-endian, length-prefixed for text kinds).
    pub fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Value::Int8(v) => writer.write_all(&v.to_le_bytes())?,
            Value::UInt8(v) => writer.write_all(&v.to_le_bytes())?,
            Value::Int16(v) => writer.write_all(&v.to_le_bytes())?,
            Value::UInt16(v) => writer.write_all(&v.to_le_bytes())?,
            Value::Int32(v) => writer.write_all(&v.to_le_bytes())?,
            Value::UInt32(v) => writer.write_all(&v.to_le_bytes())?,
            Value::Float32(v) => writer.write_all(&v.to_le_bytes())?,
            Value::Text(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                writer.write_all(&(units.len() as u32).to_le_bytes())?;
                for unit in units {
                    writer.write_all(&unit.to_le_bytes())?;
                }
            }
            Value::Ascii(s) => {
                writer.write_all(&(s.len() as u32).to_le_bytes())?;
                writer.write_all(s.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Parse a payload of the given kind from `bytes` at `pos`. Returns the
    /// value and the byte position just past it.
    pub fn read_payload(kind: ValueKind, bytes: &[u8], pos: usize) -> Result<(Self, usize)> {
        let need = |n: usize| -> Result<()> {
            if pos + n > bytes.len() {
                return Err(FileError::MalformedHeader(format!(
                    "value payload truncated ({:?})",
                    kind
                )));
            }
            Ok(())
        };

        match kind {
            ValueKind::Int8 => {
                need(1)?;
                Ok((Value::Int8(bytes[pos] as i8), pos + 1))
            }
            ValueKind::UInt8 => {
                need(1)?;
                Ok((Value::UInt8(bytes[pos]), pos + 1))
            }
            ValueKind::Int16 => {
                need(2)?;
                let v = i16::from_le_bytes(bytes[pos..pos + 2].try_into().unwrap());
                Ok((Value::Int16(v), pos + 2))
            }
            ValueKind::UInt16 => {
                need(2)?;
                let v = u16::from_le_bytes(bytes[pos..pos + 2].try_into().unwrap());
                Ok((Value::UInt16(v), pos + 2))
            }
            ValueKind::Int32 => {
                need(4)?;
                let v = i32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
                Ok((Value::Int32(v), pos + 4))
            }
            ValueKind::UInt32 => {
                need(4)?;
                let v = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
                Ok((Value::UInt32(v), pos + 4))
            }
            ValueKind::Float32 => {
                need(4)?;
                let v = f32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
                Ok((Value::Float32(v), pos + 4))
            }
            ValueKind::Text => {
                need(4)?;
                let count =
                    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
                need(4 + 2 * count)?;
                let mut units = Vec::with_capacity(count);
                let mut p = pos + 4;
                for _ in 0..count {
                    units.push(u16::from_le_bytes(bytes[p..p + 2].try_into().unwrap()));
                    p += 2;
                }
                let s = String::from_utf16(&units).map_err(|_| {
                    FileError::MalformedHeader("text value is not valid UTF-16".into())
                })?;
                Ok((Value::Text(s), p))
            }
            ValueKind::Ascii => {
                need(4)?;
                let count =
                    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
                need(4 + count)?;
                let s = std::str::from_utf8(&bytes[pos + 4..pos + 4 + count])
                    .map_err(|_| {
                        FileError::MalformedHeader("ascii value is not valid UTF-8".into())
                    })?
                    .to_string();
                Ok((Value::Ascii(s), pos + 4 + count))
            }
        }
    }
}
