//! Dataset headers — the only schema a reader ever has.
//!
//! A dataset header declares its kind, row count, maximum name width, extra
//! columns, and its own parameter list. On disk:
//!
//! ```text
//! kind:          u8
//! row_count:     u32
//! max_name_len:  u32
//! column_count:  u32
//! columns:       column_count declarations (see column.rs)
//! params:        parameter list (see parameter.rs)
//! data_offset:   u64   absolute offset of this dataset's row region
//! ```

use std::io::Write;

use serde::Serialize;

use crate::codec::{read_u8_at, read_u32_at, read_u64_at};
use crate::container::column::ColumnSchema;
use crate::container::types::DatasetKind;
use crate::error::{FileError, Result};
use crate::parameter::{param_list_size, read_param_list, write_param_list, Parameter};

/// Header of one dataset: fixed built-in fields (per kind) plus declared
/// extra columns. Row byte length is a pure function of this header and is
/// recomputed on every call — never cached, so a stale length is
/// structurally impossible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetHeader {
    kind: DatasetKind,
    row_count: u32,
    max_name_len: u32,
    extra_columns: Vec<ColumnSchema>,
    pub params: Vec<Parameter>,
    /// Set once the container layout is computed by a writer; schema
    /// mutations are rejected afterwards.
    #[serde(skip)]
    sealed: bool,
    /// Absolute byte offset of the row region. 0 until layout is computed.
    #[serde(skip)]
    data_offset: u64,
}

/// Result of parsing one dataset header: either a kind this build knows, or
/// a consumed-but-unrecognized one the reader will skip.
#[derive(Debug)]
pub(crate) enum ParsedDataset {
    Known(DatasetHeader),
    Unknown { kind_tag: u8 },
}

impl DatasetHeader {
    pub fn new(kind: DatasetKind, row_count: u32, max_name_len: u32) -> Self {
        Self {
            kind,
            row_count,
            max_name_len,
            extra_columns: Vec::new(),
            params: Vec::new(),
            sealed: false,
            data_offset: 0,
        }
    }

    /// Convenience constructor with the extra-column list up front.
    pub fn with_columns(
        kind: DatasetKind,
        row_count: u32,
        max_name_len: u32,
        columns: Vec<ColumnSchema>,
    ) -> Self {
        Self {
            kind,
            row_count,
            max_name_len,
            extra_columns: columns,
            params: Vec::new(),
            sealed: false,
            data_offset: 0,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn max_name_len(&self) -> u32 {
        self.max_name_len
    }

    pub fn extra_columns(&self) -> &[ColumnSchema] {
        &self.extra_columns
    }

    /// Append an extra column. Fails with `SchemaLocked` once the dataset
    /// has been committed to a writer (layout computed).
    pub fn add_extra_column(&mut self, column: ColumnSchema) -> Result<()> {
        if self.sealed {
            return Err(FileError::SchemaLocked(self.kind.name().to_string()));
        }
        self.extra_columns.push(column);
        Ok(())
    }

    /// Byte width of the name cell: u32 actual-length prefix plus the
    /// declared maximum name width.
    pub fn name_cell_width(&self) -> usize {
        4 + self.max_name_len as usize
    }

    /// Byte length of one row: name cell + built-in fields + extra cells.
    /// Recomputed from the column list on every call.
    pub fn row_length(&self) -> usize {
        self.name_cell_width()
            + self.kind.builtin_width()
            + self
                .extra_columns
                .iter()
                .map(ColumnSchema::cell_width)
                .sum::<usize>()
    }

    /// Total byte size of the row region.
    pub fn data_size(&self) -> u64 {
        self.row_count as u64 * self.row_length() as u64
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Absolute byte offset of row `index`.
    pub fn row_offset(&self, index: u32) -> u64 {
        self.data_offset + index as u64 * self.row_length() as u64
    }

    pub(crate) fn set_data_offset(&mut self, offset: u64) {
        self.data_offset = offset;
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ── Disk codec ─────────────────────────────────────────────────

    pub fn serialized_size(&self) -> usize {
        1 + 4
            + 4
            + 4
            + self
                .extra_columns
                .iter()
                .map(ColumnSchema::serialized_size)
                .sum::<usize>()
            + param_list_size(&self.params)
            + 8
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.kind as u8])?;
        writer.write_all(&self.row_count.to_le_bytes())?;
        writer.write_all(&self.max_name_len.to_le_bytes())?;
        writer.write_all(&(self.extra_columns.len() as u32).to_le_bytes())?;
        for column in &self.extra_columns {
            column.write_to(writer)?;
        }
        write_param_list(writer, &self.params)?;
        writer.write_all(&self.data_offset.to_le_bytes())?;
        Ok(())
    }

    /// Parse one dataset header at `pos`. Headers read back from a file are
    /// sealed: the layout of an existing file is immutable.
    pub(crate) fn read_at(bytes: &[u8], pos: usize) -> Result<(ParsedDataset, usize)> {
        let kind_tag = read_u8_at(bytes, pos, "dataset kind")?;
        let row_count = read_u32_at(bytes, pos + 1, "dataset row count")?;
        let max_name_len = read_u32_at(bytes, pos + 5, "dataset name width")?;
        let column_count = read_u32_at(bytes, pos + 9, "dataset column count")? as usize;

        let mut pos = pos + 13;
        let mut extra_columns = Vec::with_capacity(column_count.min(1024));
        for _ in 0..column_count {
            let (column, next) = ColumnSchema::read_at(bytes, pos)?;
            extra_columns.push(column);
            pos = next;
        }
        let (params, pos) = read_param_list(bytes, pos)?;
        let data_offset = read_u64_at(bytes, pos, "dataset data offset")?;
        let pos = pos + 8;

        let parsed = match DatasetKind::from_u8(kind_tag) {
            Some(kind) => ParsedDataset::Known(DatasetHeader {
                kind,
                row_count,
                max_name_len,
                extra_columns,
                params,
                sealed: true,
                data_offset,
            }),
            None => ParsedDataset::Unknown { kind_tag },
        };
        Ok((parsed, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Value, ValueKind};

    #[test]
    fn test_row_length_no_columns() {
        // Genotype: 5 builtin + 4 + 10 name bytes.
        let ds = DatasetHeader::new(DatasetKind::Genotype, 4, 10);
        assert_eq!(ds.row_length(), 19);
        assert_eq!(ds.data_size(), 76);
    }

    #[test]
    fn test_row_length_tracks_columns() {
        let mut ds = DatasetHeader::new(DatasetKind::Expression, 2, 10);
        let base = ds.row_length();
        ds.add_extra_column(ColumnSchema::numeric("int", ValueKind::Int32))
            .unwrap();
        assert_eq!(ds.row_length(), base + 4);
        ds.add_extra_column(ColumnSchema::ascii("ascii", 7)).unwrap();
        assert_eq!(ds.row_length(), base + 4 + 11);
    }

    #[test]
    fn test_schema_locked_after_seal() {
        let mut ds = DatasetHeader::new(DatasetKind::Genotype, 4, 10);
        ds.add_extra_column(ColumnSchema::numeric("ok", ValueKind::Int8))
            .unwrap();
        ds.seal();
        let err = ds
            .add_extra_column(ColumnSchema::numeric("late", ValueKind::Int8))
            .unwrap_err();
        assert!(matches!(err, FileError::SchemaLocked(_)));
        assert!(err.to_string().contains("Genotype"));
        assert_eq!(ds.extra_columns().len(), 1);
    }

    #[test]
    fn test_row_offset_formula() {
        let mut ds = DatasetHeader::new(DatasetKind::Genotype, 4, 10);
        ds.set_data_offset(1000);
        let len = ds.row_length() as u64;
        for i in 0..4 {
            assert_eq!(ds.row_offset(i), 1000 + i as u64 * len);
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let mut ds = DatasetHeader::with_columns(
            DatasetKind::CopyNumber,
            7,
            12,
            vec![
                ColumnSchema::numeric("short", ValueKind::Int16),
                ColumnSchema::text("label", 8),
            ],
        );
        ds.params.push(Parameter::new("smooth", Value::Float32(0.3)));
        ds.set_data_offset(4096);

        let mut buf = Vec::new();
        ds.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), ds.serialized_size());

        let (parsed, end) = DatasetHeader::read_at(&buf, 0).unwrap();
        assert_eq!(end, buf.len());
        let read = match parsed {
            ParsedDataset::Known(h) => h,
            ParsedDataset::Unknown { kind_tag } => panic!("unknown kind {kind_tag}"),
        };
        assert_eq!(read.kind(), DatasetKind::CopyNumber);
        assert_eq!(read.row_count(), 7);
        assert_eq!(read.max_name_len(), 12);
        assert_eq!(read.extra_columns(), ds.extra_columns());
        assert_eq!(read.params, ds.params);
        assert_eq!(read.data_offset(), 4096);
        assert!(read.is_sealed());
        assert_eq!(read.row_length(), ds.row_length());
    }

    #[test]
    fn test_unknown_kind_consumed_not_fatal() {
        let mut ds = DatasetHeader::new(DatasetKind::Genotype, 1, 4);
        ds.set_data_offset(64);
        let mut buf = Vec::new();
        ds.write_to(&mut buf).unwrap();
        buf[0] = 200; // unrecognized kind byte

        let (parsed, end) = DatasetHeader::read_at(&buf, 0).unwrap();
        assert_eq!(end, buf.len(), "unknown dataset header must still be consumed");
        assert!(matches!(parsed, ParsedDataset::Unknown { kind_tag: 200 }));
    }

    #[test]
    fn test_truncated_header() {
        let ds = DatasetHeader::new(DatasetKind::Genotype, 1, 4);
        let mut buf = Vec::new();
        ds.write_to(&mut buf).unwrap();
        let err = DatasetHeader::read_at(&buf[..6], 0).unwrap_err();
        assert!(matches!(err, FileError::MalformedHeader(_)));
    }
}
