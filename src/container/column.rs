//! Extra-column schemas — the caller-declared fields of a row beyond the
//! dataset's built-ins.
//!
//! Numeric columns get their width from the kind; text columns declare a
//! fixed code-unit width once, which then applies to every row. On disk a
//! column is `[name: string8][kind: u8][width: u32]` (width 0 for numerics).

use std::io::Write;

use serde::Serialize;

use crate::codec::{read_string8, read_u8_at, read_u32_at, string8_size, write_string8};
use crate::error::{FileError, Result};
use crate::value::ValueKind;

/// Declaration of one extra column: name, value kind, and (for text kinds)
/// the fixed per-row code-unit width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ValueKind,
    /// Declared code-unit width. `None` for numeric kinds (derived).
    pub width: Option<u32>,
}

impl ColumnSchema {
    /// Numeric column; width is implied by the kind.
    pub fn numeric(name: impl Into<String>, kind: ValueKind) -> Self {
        debug_assert!(kind.fixed_width().is_some(), "numeric() needs a numeric kind");
        Self {
            name: name.into(),
            kind,
            width: None,
        }
    }

    /// UTF-8/ASCII column holding up to `width` bytes per row.
    pub fn ascii(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Ascii,
            width: Some(width),
        }
    }

    /// UTF-16 column holding up to `width` code units per row.
    pub fn text(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Text,
            width: Some(width),
        }
    }

    /// Byte width of this column's cell in a row.
    ///
    /// Numeric cells are the value's fixed width. Text cells carry a u32
    /// actual-length prefix plus the declared width in raw units.
    pub fn cell_width(&self) -> usize {
        match self.kind.fixed_width() {
            Some(w) => w,
            None => {
                let units = self.width.unwrap_or(0) as usize;
                match self.kind {
                    ValueKind::Text => 4 + 2 * units,
                    _ => 4 + units,
                }
            }
        }
    }

    /// Serialized size in a dataset header.
    pub fn serialized_size(&self) -> usize {
        string8_size(&self.name) + 1 + 4
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_string8(writer, &self.name)?;
        writer.write_all(&[self.kind as u8])?;
        writer.write_all(&self.width.unwrap_or(0).to_le_bytes())?;
        Ok(())
    }

    /// Parse one column declaration at `pos`.
    pub fn read_at(bytes: &[u8], pos: usize) -> Result<(Self, usize)> {
        let (name, pos) = read_string8(bytes, pos, "column name")?;
        let kind_tag = read_u8_at(bytes, pos, "column kind")?;
        let kind = ValueKind::from_u8(kind_tag).ok_or_else(|| {
            FileError::MalformedHeader(format!("unknown column kind tag {}", kind_tag))
        })?;
        let width_raw = read_u32_at(bytes, pos + 1, "column width")?;
        let width = match kind.fixed_width() {
            Some(_) => None,
            None => Some(width_raw),
        };
        Ok((Self { name, kind, width }, pos + 5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_widths() {
        assert_eq!(ColumnSchema::numeric("b", ValueKind::Int8).cell_width(), 1);
        assert_eq!(ColumnSchema::numeric("s", ValueKind::UInt16).cell_width(), 2);
        assert_eq!(ColumnSchema::numeric("i", ValueKind::Int32).cell_width(), 4);
        assert_eq!(ColumnSchema::numeric("f", ValueKind::Float32).cell_width(), 4);
        // ascii width 7: prefix + 7 bytes
        assert_eq!(ColumnSchema::ascii("a", 7).cell_width(), 11);
        // utf-16 width 10: prefix + 20 bytes
        assert_eq!(ColumnSchema::text("t", 10).cell_width(), 24);
    }

    #[test]
    fn test_roundtrip() {
        let cols = vec![
            ColumnSchema::numeric("byte", ValueKind::Int8),
            ColumnSchema::numeric("uint", ValueKind::UInt32),
            ColumnSchema::ascii("ascii", 7),
            ColumnSchema::text("text", 10),
        ];
        let mut buf = Vec::new();
        for col in &cols {
            col.write_to(&mut buf).unwrap();
        }
        assert_eq!(
            buf.len(),
            cols.iter().map(ColumnSchema::serialized_size).sum::<usize>()
        );

        let mut pos = 0;
        for col in &cols {
            let (parsed, next) = ColumnSchema::read_at(&buf, pos).unwrap();
            assert_eq!(&parsed, col);
            pos = next;
        }
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn test_numeric_width_ignored_on_read() {
        // A numeric column always derives its width from the kind, even if
        // the stored width field is nonzero.
        let mut buf = Vec::new();
        write_string8(&mut buf, "i").unwrap();
        buf.push(ValueKind::Int32 as u8);
        buf.extend_from_slice(&99u32.to_le_bytes());
        let (parsed, _) = ColumnSchema::read_at(&buf, 0).unwrap();
        assert_eq!(parsed.width, None);
        assert_eq!(parsed.cell_width(), 4);
    }

    #[test]
    fn test_unknown_kind_tag() {
        let mut buf = Vec::new();
        write_string8(&mut buf, "x").unwrap();
        buf.push(42);
        buf.extend_from_slice(&0u32.to_le_bytes());
        let err = ColumnSchema::read_at(&buf, 0).unwrap_err();
        assert!(err.to_string().contains("unknown column kind tag"));
    }
}
