//! Fixed-width row codec.
//!
//! Every row of a dataset occupies exactly `row_length()` bytes:
//!
//! ```text
//! [name cell: u32 actual_len + max_name_len bytes, zero-padded]
//! [built-in fields, per dataset kind, little-endian]
//! [extra cells, in declared column order]
//! ```
//!
//! Numeric cells are the value's fixed width. A text cell of declared width
//! W is a u32 actual-unit count followed by W raw units (bytes for ascii,
//! u16 pairs for UTF-16), zero-padded. Names and text values longer than the
//! declared width are truncated at a character boundary.
//!
//! Encode and decode are the single source of the offset math used by the
//! sequential writer, the buffered writer, the updater, and the reader.

use crate::container::column::ColumnSchema;
use crate::container::dataset::DatasetHeader;
use crate::container::types::*;
use crate::error::{FileError, Result};
use crate::value::{Value, ValueKind};

// ── Encode helpers ─────────────────────────────────────────────────

fn utf8_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn utf16_truncate(s: &str, max_units: usize) -> Vec<u16> {
    let mut units = Vec::with_capacity(max_units.min(s.len()));
    for ch in s.chars() {
        let mut pair = [0u16; 2];
        let encoded = ch.encode_utf16(&mut pair);
        if units.len() + encoded.len() > max_units {
            break;
        }
        units.extend_from_slice(encoded);
    }
    units
}

fn push_ascii_cell(buf: &mut Vec<u8>, s: &str, width: usize) {
    let t = utf8_truncate(s, width);
    buf.extend_from_slice(&(t.len() as u32).to_le_bytes());
    buf.extend_from_slice(t.as_bytes());
    buf.resize(buf.len() + (width - t.len()), 0);
}

fn push_text_cell(buf: &mut Vec<u8>, s: &str, width: usize) {
    let units = utf16_truncate(s, width);
    buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
    for unit in &units {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
    buf.resize(buf.len() + 2 * (width - units.len()), 0);
}

// ── Decode cursor ──────────────────────────────────────────────────

struct RowCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RowCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.pos + n > self.bytes.len() {
            return Err(FileError::MalformedHeader(format!(
                "row truncated at byte {}",
                self.pos
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.bytes[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn i16(&mut self) -> Result<i16> {
        self.need(2)?;
        let v = i16::from_le_bytes(self.bytes[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(v)
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        let v = u32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn f32(&mut self) -> Result<f32> {
        self.need(4)?;
        let v = f32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    /// Read an ascii cell of declared byte width.
    fn ascii_cell(&mut self, width: usize) -> Result<String> {
        let len = self.u32()? as usize;
        if len > width {
            return Err(FileError::MalformedHeader(format!(
                "cell length {} exceeds declared width {}",
                len, width
            )));
        }
        self.need(width)?;
        let s = std::str::from_utf8(&self.bytes[self.pos..self.pos + len])
            .map_err(|_| FileError::MalformedHeader("cell is not valid UTF-8".into()))?
            .to_string();
        self.pos += width;
        Ok(s)
    }

    /// Read a UTF-16 cell of declared unit width.
    fn text_cell(&mut self, width: usize) -> Result<String> {
        let len = self.u32()? as usize;
        if len > width {
            return Err(FileError::MalformedHeader(format!(
                "cell length {} exceeds declared width {}",
                len, width
            )));
        }
        self.need(2 * width)?;
        let mut units = Vec::with_capacity(len);
        for i in 0..len {
            let at = self.pos + 2 * i;
            units.push(u16::from_le_bytes(self.bytes[at..at + 2].try_into().unwrap()));
        }
        self.pos += 2 * width;
        String::from_utf16(&units)
            .map_err(|_| FileError::MalformedHeader("cell is not valid UTF-16".into()))
    }
}

// ── Row encode ─────────────────────────────────────────────────────

/// Encode one entry as exactly `dataset.row_length()` bytes.
pub(crate) fn encode_row(dataset: &DatasetHeader, entry: &Entry) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(dataset.row_length());
    push_ascii_cell(&mut buf, entry.name(), dataset.max_name_len() as usize);
    encode_row_tail_into(&mut buf, dataset, entry)?;
    debug_assert_eq!(buf.len(), dataset.row_length());
    Ok(buf)
}

/// Encode everything after the name cell (built-ins + extra cells). Used by
/// the updater, which patches a row's values but never its identity.
pub(crate) fn encode_row_tail(dataset: &DatasetHeader, entry: &Entry) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(dataset.row_length() - dataset.name_cell_width());
    encode_row_tail_into(&mut buf, dataset, entry)?;
    Ok(buf)
}

fn encode_row_tail_into(buf: &mut Vec<u8>, dataset: &DatasetHeader, entry: &Entry) -> Result<()> {
    if entry.kind() != dataset.kind() {
        return Err(FileError::EntryKindMismatch {
            expected: dataset.kind(),
            actual: entry.kind(),
        });
    }
    let columns = dataset.extra_columns();
    if entry.metrics().len() != columns.len() {
        return Err(FileError::ColumnCountMismatch {
            expected: columns.len(),
            actual: entry.metrics().len(),
        });
    }

    match entry {
        Entry::Expression(e) => {
            buf.extend_from_slice(&e.quantification.to_le_bytes());
        }
        Entry::Genotype(e) => {
            buf.push(e.call);
            buf.extend_from_slice(&e.confidence.to_le_bytes());
        }
        Entry::CopyNumber(e) => {
            buf.push(e.chr);
            buf.extend_from_slice(&e.position.to_le_bytes());
        }
        Entry::CytoRegion(e) => {
            buf.push(e.chr);
            buf.extend_from_slice(&e.start_position.to_le_bytes());
            buf.extend_from_slice(&e.stop_position.to_le_bytes());
            buf.push(e.call);
            buf.extend_from_slice(&e.confidence.to_le_bytes());
        }
        Entry::CopyNumberVariation(e) => {
            buf.extend_from_slice(&e.signal.to_le_bytes());
            buf.push(e.call);
            buf.extend_from_slice(&e.confidence.to_le_bytes());
        }
        Entry::DmetBiAllelic(e) => {
            buf.push(e.call);
            buf.extend_from_slice(&e.confidence.to_le_bytes());
            buf.push(e.force);
            buf.extend_from_slice(&e.signal_a.to_le_bytes());
            buf.extend_from_slice(&e.signal_b.to_le_bytes());
            buf.push(e.context_a);
            buf.push(e.context_b);
        }
        Entry::DmetMultiAllelic(e) => {
            buf.push(e.call);
            buf.extend_from_slice(&e.confidence.to_le_bytes());
            buf.push(e.force);
            buf.push(e.allele_count);
            for signal in [
                e.signal_a, e.signal_b, e.signal_c, e.signal_d, e.signal_e, e.signal_f,
            ] {
                buf.extend_from_slice(&signal.to_le_bytes());
            }
            for context in [
                e.context_a, e.context_b, e.context_c, e.context_d, e.context_e, e.context_f,
            ] {
                buf.push(context);
            }
        }
        Entry::DmetCopyNumber(e) => {
            buf.extend_from_slice(&e.call.to_le_bytes());
            buf.extend_from_slice(&e.confidence.to_le_bytes());
            buf.extend_from_slice(&e.force.to_le_bytes());
            buf.extend_from_slice(&e.estimate.to_le_bytes());
            buf.extend_from_slice(&e.lower.to_le_bytes());
            buf.extend_from_slice(&e.upper.to_le_bytes());
        }
    }

    for (value, column) in entry.metrics().iter().zip(columns) {
        if value.kind() != column.kind {
            return Err(FileError::TypeMismatch {
                requested: column.kind,
                stored: value.kind(),
            });
        }
        match value {
            Value::Int8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::UInt8(v) => buf.push(*v),
            Value::Int16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::UInt16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::UInt32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Float32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Value::Ascii(s) => push_ascii_cell(buf, s, column.width.unwrap_or(0) as usize),
            Value::Text(s) => push_text_cell(buf, s, column.width.unwrap_or(0) as usize),
        }
    }

    Ok(())
}

// ── Row decode ─────────────────────────────────────────────────────

/// Decode one row slice (exactly `dataset.row_length()` bytes) back into an
/// entry, built-ins first, then each declared extra column in schema order.
pub(crate) fn decode_row(dataset: &DatasetHeader, row: &[u8]) -> Result<Entry> {
    let mut cur = RowCursor::new(row);
    let name = cur.ascii_cell(dataset.max_name_len() as usize)?;

    let mut entry = match dataset.kind() {
        DatasetKind::Expression => Entry::Expression(ExpressionEntry {
            name,
            quantification: cur.f32()?,
            metrics: Vec::new(),
        }),
        DatasetKind::Genotype => Entry::Genotype(GenotypeEntry {
            name,
            call: cur.u8()?,
            confidence: cur.f32()?,
            metrics: Vec::new(),
        }),
        DatasetKind::CopyNumber => Entry::CopyNumber(CopyNumberEntry {
            name,
            chr: cur.u8()?,
            position: cur.u32()?,
            metrics: Vec::new(),
        }),
        DatasetKind::CytoRegion => Entry::CytoRegion(CytoRegionEntry {
            name,
            chr: cur.u8()?,
            start_position: cur.u32()?,
            stop_position: cur.u32()?,
            call: cur.u8()?,
            confidence: cur.f32()?,
            metrics: Vec::new(),
        }),
        DatasetKind::CopyNumberVariation => Entry::CopyNumberVariation(CopyNumberVariationEntry {
            name,
            signal: cur.f32()?,
            call: cur.u8()?,
            confidence: cur.f32()?,
            metrics: Vec::new(),
        }),
        DatasetKind::DmetBiAllelic => Entry::DmetBiAllelic(DmetBiAllelicEntry {
            name,
            call: cur.u8()?,
            confidence: cur.f32()?,
            force: cur.u8()?,
            signal_a: cur.f32()?,
            signal_b: cur.f32()?,
            context_a: cur.u8()?,
            context_b: cur.u8()?,
            metrics: Vec::new(),
        }),
        DatasetKind::DmetMultiAllelic => Entry::DmetMultiAllelic(DmetMultiAllelicEntry {
            name,
            call: cur.u8()?,
            confidence: cur.f32()?,
            force: cur.u8()?,
            allele_count: cur.u8()?,
            signal_a: cur.f32()?,
            signal_b: cur.f32()?,
            signal_c: cur.f32()?,
            signal_d: cur.f32()?,
            signal_e: cur.f32()?,
            signal_f: cur.f32()?,
            context_a: cur.u8()?,
            context_b: cur.u8()?,
            context_c: cur.u8()?,
            context_d: cur.u8()?,
            context_e: cur.u8()?,
            context_f: cur.u8()?,
            metrics: Vec::new(),
        }),
        DatasetKind::DmetCopyNumber => Entry::DmetCopyNumber(DmetCopyNumberEntry {
            name,
            call: cur.i16()?,
            confidence: cur.f32()?,
            force: cur.i16()?,
            estimate: cur.f32()?,
            lower: cur.f32()?,
            upper: cur.f32()?,
            metrics: Vec::new(),
        }),
    };

    let mut metrics = Vec::with_capacity(dataset.extra_columns().len());
    for column in dataset.extra_columns() {
        let value = decode_cell(&mut cur, column)?;
        metrics.push(value);
    }
    match &mut entry {
        Entry::Expression(e) => e.metrics = metrics,
        Entry::Genotype(e) => e.metrics = metrics,
        Entry::CopyNumber(e) => e.metrics = metrics,
        Entry::CytoRegion(e) => e.metrics = metrics,
        Entry::CopyNumberVariation(e) => e.metrics = metrics,
        Entry::DmetBiAllelic(e) => e.metrics = metrics,
        Entry::DmetMultiAllelic(e) => e.metrics = metrics,
        Entry::DmetCopyNumber(e) => e.metrics = metrics,
    }
    Ok(entry)
}

fn decode_cell(cur: &mut RowCursor<'_>, column: &ColumnSchema) -> Result<Value> {
    Ok(match column.kind {
        ValueKind::Int8 => Value::Int8(cur.u8()? as i8),
        ValueKind::UInt8 => Value::UInt8(cur.u8()?),
        ValueKind::Int16 => Value::Int16(cur.i16()?),
        ValueKind::UInt16 => Value::UInt16(cur.i16()? as u16),
        ValueKind::Int32 => Value::Int32(cur.u32()? as i32),
        ValueKind::UInt32 => Value::UInt32(cur.u32()?),
        ValueKind::Float32 => Value::Float32(cur.f32()?),
        ValueKind::Ascii => Value::Ascii(cur.ascii_cell(column.width.unwrap_or(0) as usize)?),
        ValueKind::Text => Value::Text(cur.text_cell(column.width.unwrap_or(0) as usize)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_column_set() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::numeric("byte", ValueKind::Int8),
            ColumnSchema::numeric("ubyte", ValueKind::UInt8),
            ColumnSchema::numeric("short", ValueKind::Int16),
            ColumnSchema::numeric("ushort", ValueKind::UInt16),
            ColumnSchema::numeric("int", ValueKind::Int32),
            ColumnSchema::numeric("uint", ValueKind::UInt32),
            ColumnSchema::numeric("float", ValueKind::Float32),
            ColumnSchema::ascii("ascii", 7),
            ColumnSchema::text("text", 10),
        ]
    }

    fn full_metric_set() -> Vec<Value> {
        vec![
            Value::Int8(8),
            Value::UInt8(8),
            Value::Int16(16),
            Value::UInt16(16),
            Value::Int32(32),
            Value::UInt32(32),
            Value::Float32(44.0),
            Value::Ascii("ascii".into()),
            Value::Text("text".into()),
        ]
    }

    #[test]
    fn test_genotype_roundtrip_with_metrics() {
        let ds = DatasetHeader::with_columns(DatasetKind::Genotype, 4, 10, full_column_set());
        let entry = Entry::Genotype(GenotypeEntry {
            name: "1".into(),
            call: 1,
            confidence: 10.0,
            metrics: full_metric_set(),
        });
        let row = encode_row(&ds, &entry).unwrap();
        assert_eq!(row.len(), ds.row_length());
        assert_eq!(decode_row(&ds, &row).unwrap(), entry);
    }

    #[test]
    fn test_all_kinds_roundtrip() {
        let entries = [
            Entry::Expression(ExpressionEntry {
                name: "e".into(),
                quantification: 10.0,
                metrics: vec![],
            }),
            Entry::Genotype(GenotypeEntry {
                name: "g".into(),
                call: 2,
                confidence: 20.0,
                metrics: vec![],
            }),
            Entry::CopyNumber(CopyNumberEntry {
                name: "c".into(),
                chr: 3,
                position: 30,
                metrics: vec![],
            }),
            Entry::CytoRegion(CytoRegionEntry {
                name: "y".into(),
                chr: 1,
                start_position: 1,
                stop_position: 2,
                call: 1,
                confidence: 10.0,
                metrics: vec![],
            }),
            Entry::CopyNumberVariation(CopyNumberVariationEntry {
                name: "v".into(),
                signal: 1.0,
                call: 1,
                confidence: 10.0,
                metrics: vec![],
            }),
            Entry::DmetBiAllelic(DmetBiAllelicEntry {
                name: "b".into(),
                call: 10,
                confidence: 10.0,
                force: 11,
                signal_a: 22.0,
                signal_b: 34.0,
                context_a: 99,
                context_b: 77,
                metrics: vec![],
            }),
            Entry::DmetMultiAllelic(DmetMultiAllelicEntry {
                name: "m".into(),
                call: 10,
                confidence: 10.0,
                force: 11,
                allele_count: 77,
                signal_a: 22.0,
                signal_b: 34.0,
                signal_c: 34.0,
                signal_d: 34.0,
                signal_e: 34.0,
                signal_f: 34.0,
                context_a: 17,
                context_b: 77,
                context_c: 77,
                context_d: 77,
                context_e: 77,
                context_f: 77,
                metrics: vec![],
            }),
            Entry::DmetCopyNumber(DmetCopyNumberEntry {
                name: "d".into(),
                call: 10,
                confidence: 10.0,
                force: 33,
                estimate: 22.0,
                lower: 34.0,
                upper: 35.0,
                metrics: vec![],
            }),
        ];
        for entry in &entries {
            let ds = DatasetHeader::new(entry.kind(), 1, 8);
            let row = encode_row(&ds, entry).unwrap();
            assert_eq!(row.len(), ds.row_length());
            assert_eq!(&decode_row(&ds, &row).unwrap(), entry);
        }
    }

    #[test]
    fn test_entry_kind_mismatch() {
        let ds = DatasetHeader::new(DatasetKind::Expression, 1, 8);
        let entry = Entry::Genotype(GenotypeEntry::default());
        let err = encode_row(&ds, &entry).unwrap_err();
        assert!(matches!(
            err,
            FileError::EntryKindMismatch {
                expected: DatasetKind::Expression,
                actual: DatasetKind::Genotype,
            }
        ));
    }

    #[test]
    fn test_column_count_mismatch() {
        let ds = DatasetHeader::with_columns(
            DatasetKind::Genotype,
            1,
            8,
            vec![ColumnSchema::numeric("int", ValueKind::Int32)],
        );
        let entry = Entry::Genotype(GenotypeEntry {
            name: "x".into(),
            call: 0,
            confidence: 0.0,
            metrics: vec![],
        });
        let err = encode_row(&ds, &entry).unwrap_err();
        assert!(matches!(
            err,
            FileError::ColumnCountMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_metric_kind_mismatch() {
        let ds = DatasetHeader::with_columns(
            DatasetKind::Genotype,
            1,
            8,
            vec![ColumnSchema::numeric("int", ValueKind::Int32)],
        );
        let entry = Entry::Genotype(GenotypeEntry {
            name: "x".into(),
            call: 0,
            confidence: 0.0,
            metrics: vec![Value::Float32(1.0)],
        });
        let err = encode_row(&ds, &entry).unwrap_err();
        assert!(matches!(
            err,
            FileError::TypeMismatch {
                requested: ValueKind::Int32,
                stored: ValueKind::Float32,
            }
        ));
    }

    #[test]
    fn test_name_truncated_to_declared_width() {
        let ds = DatasetHeader::new(DatasetKind::Expression, 1, 4);
        let entry = Entry::Expression(ExpressionEntry {
            name: "abcdefgh".into(),
            quantification: 1.0,
            metrics: vec![],
        });
        let row = encode_row(&ds, &entry).unwrap();
        assert_eq!(row.len(), ds.row_length());
        let decoded = decode_row(&ds, &row).unwrap();
        assert_eq!(decoded.name(), "abcd");
    }

    #[test]
    fn test_name_truncation_respects_char_boundary() {
        let ds = DatasetHeader::new(DatasetKind::Expression, 1, 5);
        let entry = Entry::Expression(ExpressionEntry {
            name: "ab\u{0410}\u{0411}".into(), // 2 + 2 + 2 bytes
            quantification: 1.0,
            metrics: vec![],
        });
        let row = encode_row(&ds, &entry).unwrap();
        let decoded = decode_row(&ds, &row).unwrap();
        assert_eq!(decoded.name(), "ab\u{0410}");
    }

    #[test]
    fn test_text_cell_truncation_keeps_surrogate_pairs_whole() {
        let ds = DatasetHeader::with_columns(
            DatasetKind::Expression,
            1,
            4,
            vec![ColumnSchema::text("t", 3)],
        );
        // Emoji is 2 units; "a" + emoji + "b" would need 4.
        let entry = Entry::Expression(ExpressionEntry {
            name: "x".into(),
            quantification: 0.0,
            metrics: vec![Value::Text("a\u{1F600}b".into())],
        });
        let row = encode_row(&ds, &entry).unwrap();
        let decoded = decode_row(&ds, &row).unwrap();
        assert_eq!(decoded.metrics()[0].as_text().unwrap(), "a\u{1F600}");
    }

    #[test]
    fn test_short_row_rejected() {
        let ds = DatasetHeader::new(DatasetKind::Genotype, 1, 8);
        let entry = Entry::Genotype(GenotypeEntry {
            name: "x".into(),
            call: 1,
            confidence: 2.0,
            metrics: vec![],
        });
        let row = encode_row(&ds, &entry).unwrap();
        let err = decode_row(&ds, &row[..row.len() - 2]).unwrap_err();
        assert!(matches!(err, FileError::MalformedHeader(_)));
    }

    #[test]
    fn test_row_tail_skips_name_cell() {
        let ds = DatasetHeader::with_columns(
            DatasetKind::Genotype,
            1,
            10,
            vec![ColumnSchema::numeric("int", ValueKind::Int32)],
        );
        let entry = Entry::Genotype(GenotypeEntry {
            name: "rs1".into(),
            call: 3,
            confidence: 9.5,
            metrics: vec![Value::Int32(-7)],
        });
        let full = encode_row(&ds, &entry).unwrap();
        let tail = encode_row_tail(&ds, &entry).unwrap();
        assert_eq!(tail.len(), ds.row_length() - ds.name_cell_width());
        assert_eq!(&full[ds.name_cell_width()..], &tail[..]);
    }

    #[test]
    fn test_zero_filled_row_decodes_as_empty() {
        // Preallocated-but-unwritten rows are all zeroes; they decode to an
        // empty name and zero fields rather than failing.
        let ds = DatasetHeader::with_columns(
            DatasetKind::Genotype,
            1,
            8,
            vec![ColumnSchema::ascii("a", 3)],
        );
        let row = vec![0u8; ds.row_length()];
        let decoded = decode_row(&ds, &row).unwrap();
        assert_eq!(decoded.name(), "");
        match decoded {
            Entry::Genotype(g) => {
                assert_eq!(g.call, 0);
                assert_eq!(g.confidence, 0.0);
                assert_eq!(g.metrics[0].as_ascii().unwrap(), "");
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }
}
