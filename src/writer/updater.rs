//! Updater — random-access in-place patch of a single previously-written
//! row.
//!
//! Reopens a fully-written file read/write and overwrites one row's value
//! bytes at a caller-supplied index. The column layout is re-derived from
//! the file's own header, so the offsets used here are by construction the
//! ones the file was written with. The row's name cell is never touched: a
//! row's identity does not change after creation. All other rows, the
//! header, and other datasets stay byte-identical.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::container::row::encode_row_tail;
use crate::container::{Container, Entry};
use crate::error::{FileError, Result};
use crate::reader::ContainerReader;
use crate::writer::write_at;

/// Update session over one existing container file.
pub struct Updater {
    file: File,
    container: Container,
}

impl Updater {
    /// Open an existing, fully-header-written file read/write. The schema
    /// is read back from the file itself.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let container = ContainerReader::read_header(path.as_ref())?;
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        Ok(Self { file, container })
    }

    /// The schema this session patches against.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Overwrite the value bytes of row `index` in the entry's dataset.
    /// The entry's `name` is ignored; metrics must match the file's
    /// declared extra columns in count and kind.
    pub fn update_row(&mut self, index: u32, entry: &Entry) -> Result<()> {
        let Self { file, container } = self;
        let kind = entry.kind();
        let dataset = container
            .dataset(kind)
            .ok_or(FileError::DatasetNotFound(kind as u8))?;
        if index >= dataset.row_count() {
            return Err(FileError::IndexOutOfBounds {
                index,
                count: dataset.row_count(),
            });
        }
        let tail = encode_row_tail(dataset, entry)?;
        let offset = dataset.row_offset(index) + dataset.name_cell_width() as u64;
        write_at(file, offset, &tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DatasetHeader, DatasetKind, FileHeader, GenotypeEntry};
    use crate::writer::SequentialWriter;
    use tempfile::TempDir;

    fn genotype(name: &str, call: u8, confidence: f32) -> Entry {
        Entry::Genotype(GenotypeEntry {
            name: name.into(),
            call,
            confidence,
            metrics: vec![],
        })
    }

    fn write_reference(path: &Path) {
        let mut container = Container::new(FileHeader::new("test3", "sig", "1.0"));
        container.set_dataset(DatasetHeader::new(DatasetKind::Genotype, 4, 10));
        let mut writer = SequentialWriter::create(path, container).unwrap();
        let mut cursor = writer.seek_to_dataset(DatasetKind::Genotype).unwrap();
        for i in 1..=4u8 {
            cursor
                .write_entry(&genotype(&i.to_string(), i, 10.0 * i as f32))
                .unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_update_preserves_names_and_neighbors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upd.mdcf");
        write_reference(&path);

        let mut updater = Updater::open(&path).unwrap();
        updater.update_row(0, &genotype("", 11, 111.0)).unwrap();
        updater.update_row(2, &genotype("", 22, 222.0)).unwrap();
        drop(updater);

        let reader = ContainerReader::open(&path).unwrap();
        let expect = [("1", 11u8, 111.0f32), ("2", 2, 20.0), ("3", 22, 222.0), ("4", 4, 40.0)];
        for (i, (name, call, confidence)) in expect.iter().enumerate() {
            match reader.entry(DatasetKind::Genotype, i as u32).unwrap() {
                Entry::Genotype(g) => {
                    assert_eq!(&g.name, name);
                    assert_eq!(g.call, *call);
                    assert_eq!(g.confidence, *confidence);
                }
                other => panic!("wrong kind: {other:?}"),
            }
        }
    }

    #[test]
    fn test_index_out_of_bounds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upd.mdcf");
        write_reference(&path);

        let mut updater = Updater::open(&path).unwrap();
        let err = updater.update_row(4, &genotype("", 1, 1.0)).unwrap_err();
        assert!(matches!(err, FileError::IndexOutOfBounds { index: 4, count: 4 }));
    }

    #[test]
    fn test_undeclared_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upd.mdcf");
        write_reference(&path);

        let mut updater = Updater::open(&path).unwrap();
        let entry = Entry::Expression(crate::container::ExpressionEntry::default());
        let err = updater.update_row(0, &entry).unwrap_err();
        assert!(matches!(err, FileError::DatasetNotFound(_)));
    }
}
