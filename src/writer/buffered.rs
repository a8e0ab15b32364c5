//! Buffered writer — amortizes small writes across many (file, dataset)
//! targets.
//!
//! Wraps N target files whose headers and row regions were already created
//! by a `SequentialWriter` (this writer never creates a header). Entries are
//! encoded immediately and accumulate per (target, dataset); a buffer is
//! flushed to its preallocated row region when it crosses the size
//! threshold, on `flush()`, and on drop. Within each dataset, rows still go
//! out in ascending index order; across datasets and targets the stream may
//! interleave freely.
//!
//! The drop-path flush cannot report I/O errors (it logs a warning
//! instead); call `flush()` before dropping when the error matters.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::container::row::encode_row;
use crate::container::{Container, DatasetHeader, DatasetKind, Entry};
use crate::error::{FileError, Result};
use crate::reader::ContainerReader;
use crate::writer::write_at;

/// Default flush threshold per (target, dataset) buffer: 5 MiB.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 5 * 1024 * 1024;

#[derive(Default)]
struct RowBuffer {
    /// Encoded rows, contiguous, in write order.
    bytes: Vec<u8>,
    /// Rows currently held in `bytes`.
    rows: u32,
    /// Rows already flushed to the file; the next flush starts here.
    flushed_rows: u32,
}

struct Target {
    file: File,
    container: Container,
    buffers: HashMap<DatasetKind, RowBuffer>,
}

/// Batched writer over one or more sequential-writer-created files.
pub struct BufferedWriter {
    targets: Vec<Target>,
    max_buffer_size: usize,
}

impl BufferedWriter {
    /// Open every target file read/write and re-derive its schema from its
    /// own header. Each file must already carry a full header and
    /// preallocated row regions.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut targets = Vec::with_capacity(paths.len());
        for path in paths {
            let container = ContainerReader::read_header(path.as_ref())?;
            let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
            targets.push(Target {
                file,
                container,
                buffers: HashMap::new(),
            });
        }
        Ok(Self {
            targets,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        })
    }

    /// Change the per-buffer flush threshold (bytes).
    pub fn set_max_buffer_size(&mut self, bytes: usize) {
        self.max_buffer_size = bytes.max(1);
    }

    /// Schema of one target, as read back from its file.
    pub fn target_container(&self, target_index: usize) -> Option<&Container> {
        self.targets.get(target_index).map(|t| &t.container)
    }

    /// Buffer one entry for `target_index`. The dataset is the entry's own
    /// kind; it must be declared in that file. Flushes the buffer when it
    /// crosses the threshold.
    pub fn write_entry(&mut self, target_index: usize, entry: &Entry) -> Result<()> {
        let target_count = self.targets.len() as u32;
        let max_buffer_size = self.max_buffer_size;
        let target = self
            .targets
            .get_mut(target_index)
            .ok_or(FileError::IndexOutOfBounds {
                index: target_index as u32,
                count: target_count,
            })?;

        let Target {
            file,
            container,
            buffers,
        } = target;
        let kind = entry.kind();
        let dataset = container
            .dataset(kind)
            .ok_or(FileError::UnknownDataset(kind as u8))?;

        let buffer = buffers.entry(kind).or_default();
        if buffer.flushed_rows + buffer.rows >= dataset.row_count() {
            return Err(FileError::RowCountExceeded {
                declared: dataset.row_count(),
            });
        }

        let row = encode_row(dataset, entry)?;
        buffer.bytes.extend_from_slice(&row);
        buffer.rows += 1;

        if buffer.bytes.len() >= max_buffer_size {
            flush_buffer(file, dataset, buffer)?;
        }
        Ok(())
    }

    /// Force-flush every buffer of every target.
    pub fn flush(&mut self) -> Result<()> {
        for target in &mut self.targets {
            let Target {
                file,
                container,
                buffers,
            } = target;
            for (kind, buffer) in buffers.iter_mut() {
                if buffer.rows == 0 {
                    continue;
                }
                let dataset = container
                    .dataset(*kind)
                    .ok_or(FileError::UnknownDataset(*kind as u8))?;
                flush_buffer(file, dataset, buffer)?;
            }
            use std::io::Write;
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!("buffered writer flush failed during drop: {err}");
        }
    }
}

/// Write a buffer's rows at their row offsets (contiguous, so one write)
/// and clear it.
fn flush_buffer(file: &mut File, dataset: &DatasetHeader, buffer: &mut RowBuffer) -> Result<()> {
    let offset = dataset.row_offset(buffer.flushed_rows);
    write_at(file, offset, &buffer.bytes)?;
    buffer.flushed_rows += buffer.rows;
    buffer.rows = 0;
    buffer.bytes.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DatasetHeader, ExpressionEntry, FileHeader, GenotypeEntry};
    use crate::writer::SequentialWriter;
    use tempfile::TempDir;

    fn create_empty(path: &Path, genotype_rows: u32, expression_rows: u32) {
        let mut container = Container::new(FileHeader::new("test3", "sig", "1.0"));
        container.set_dataset(DatasetHeader::new(DatasetKind::Genotype, genotype_rows, 10));
        container.set_dataset(DatasetHeader::new(
            DatasetKind::Expression,
            expression_rows,
            10,
        ));
        let writer = SequentialWriter::create(path, container).unwrap();
        writer.finish().unwrap();
    }

    fn genotype(name: &str, call: u8, confidence: f32) -> Entry {
        Entry::Genotype(GenotypeEntry {
            name: name.into(),
            call,
            confidence,
            metrics: vec![],
        })
    }

    fn expression(name: &str, quantification: f32) -> Entry {
        Entry::Expression(ExpressionEntry {
            name: name.into(),
            quantification,
            metrics: vec![],
        })
    }

    #[test]
    fn test_interleaved_fill_two_files() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mdcf");
        let b = dir.path().join("b.mdcf");
        create_empty(&a, 50, 30);
        create_empty(&b, 50, 30);

        {
            let mut writer = BufferedWriter::open(&[&a, &b]).unwrap();
            // The schema comes back from each file itself.
            let schema = writer.target_container(0).unwrap();
            assert_eq!(schema.row_count(DatasetKind::Genotype), 50);
            assert_eq!(schema.row_count(DatasetKind::Expression), 30);
            writer.set_max_buffer_size(256); // force mid-stream flushes
            for i in 0..50 {
                writer
                    .write_entry(0, &genotype(&i.to_string(), (i % 4) as u8, i as f32))
                    .unwrap();
                writer
                    .write_entry(1, &genotype(&i.to_string(), (i % 3) as u8, 2.0 * i as f32))
                    .unwrap();
                if i < 30 {
                    writer
                        .write_entry(0, &expression(&i.to_string(), i as f32))
                        .unwrap();
                    writer
                        .write_entry(1, &expression(&i.to_string(), 3.0 * i as f32))
                        .unwrap();
                }
            }
            writer.flush().unwrap();
        }

        let reader_a = ContainerReader::open(&a).unwrap();
        let reader_b = ContainerReader::open(&b).unwrap();
        for i in 0..50u32 {
            match reader_a.entry(DatasetKind::Genotype, i).unwrap() {
                Entry::Genotype(g) => {
                    assert_eq!(g.name, i.to_string());
                    assert_eq!(g.call, (i % 4) as u8);
                    assert_eq!(g.confidence, i as f32);
                }
                other => panic!("wrong kind: {other:?}"),
            }
            match reader_b.entry(DatasetKind::Genotype, i).unwrap() {
                Entry::Genotype(g) => assert_eq!(g.confidence, 2.0 * i as f32),
                other => panic!("wrong kind: {other:?}"),
            }
        }
        for i in 0..30u32 {
            match reader_a.entry(DatasetKind::Expression, i).unwrap() {
                Entry::Expression(e) => assert_eq!(e.quantification, i as f32),
                other => panic!("wrong kind: {other:?}"),
            }
        }
    }

    #[test]
    fn test_drop_flushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drop.mdcf");
        create_empty(&path, 3, 0);

        {
            let mut writer = BufferedWriter::open(&[&path]).unwrap();
            writer.write_entry(0, &genotype("a", 1, 1.0)).unwrap();
            writer.write_entry(0, &genotype("b", 2, 2.0)).unwrap();
            // No explicit flush: drop must write the buffered rows.
        }

        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(reader.entry(DatasetKind::Genotype, 0).unwrap().name(), "a");
        assert_eq!(reader.entry(DatasetKind::Genotype, 1).unwrap().name(), "b");
    }

    #[test]
    fn test_row_count_enforced_across_buffer_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full.mdcf");
        create_empty(&path, 2, 0);

        let mut writer = BufferedWriter::open(&[&path]).unwrap();
        writer.write_entry(0, &genotype("a", 1, 1.0)).unwrap();
        writer.flush().unwrap();
        writer.write_entry(0, &genotype("b", 2, 2.0)).unwrap();
        let err = writer.write_entry(0, &genotype("c", 3, 3.0)).unwrap_err();
        assert!(matches!(err, FileError::RowCountExceeded { declared: 2 }));
    }

    #[test]
    fn test_undeclared_kind_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geno_only.mdcf");
        let mut container = Container::new(FileHeader::new("test3", "sig", "1.0"));
        container.set_dataset(DatasetHeader::new(DatasetKind::Genotype, 1, 10));
        SequentialWriter::create(&path, container)
            .unwrap()
            .finish()
            .unwrap();

        let mut writer = BufferedWriter::open(&[&path]).unwrap();
        let err = writer.write_entry(0, &expression("e", 1.0)).unwrap_err();
        assert!(matches!(err, FileError::UnknownDataset(_)));
    }

    #[test]
    fn test_bad_target_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("one.mdcf");
        create_empty(&path, 1, 0);

        let mut writer = BufferedWriter::open(&[&path]).unwrap();
        let err = writer.write_entry(3, &genotype("a", 1, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            FileError::IndexOutOfBounds { index: 3, count: 1 }
        ));
    }
}
