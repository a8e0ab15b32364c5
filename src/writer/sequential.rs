//! Sequential writer — one-shot creation from a fully-declared container.
//!
//! Protocol: `create` computes the byte layout, writes the header, and
//! preallocates every dataset's row region zero-filled. `seek_to_dataset`
//! returns a cursor for one declared dataset; entries then go in strictly
//! ascending row order. Closing before all declared rows are written leaves
//! the remaining rows zero-filled — not an error; the buffered writer fills
//! them later.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::container::row::encode_row;
use crate::container::{Container, DatasetKind};
use crate::error::{FileError, Result};
use crate::writer::write_at;

/// Writer for a new container file. Owns the container for the life of the
/// file; the schema is sealed at construction.
#[derive(Debug)]
pub struct SequentialWriter {
    file: File,
    container: Container,
    /// Rows written so far, per dataset. Survives re-seeks: writes always
    /// resume at the next unwritten row, so rows go out in ascending order.
    rows_written: HashMap<DatasetKind, u32>,
}

/// Write cursor positioned at one dataset's next unwritten row.
#[derive(Debug)]
pub struct DatasetCursor<'w> {
    writer: &'w mut SequentialWriter,
    kind: DatasetKind,
}

impl SequentialWriter {
    /// Create the file: compute the layout, write the header, preallocate
    /// all row regions zero-filled.
    pub fn create(path: impl AsRef<Path>, mut container: Container) -> Result<Self> {
        let total_size = container.compute_layout();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut header = Vec::with_capacity(container.header_size());
        container.write_header_to(&mut header)?;
        write_at(&mut file, 0, &header)?;
        // Preallocate the row regions; unwritten rows stay zero-filled.
        file.set_len(total_size)?;

        tracing::debug!(
            header_bytes = header.len(),
            total_bytes = total_size,
            datasets = container.datasets().len(),
            "container file created"
        );

        Ok(Self {
            file,
            container,
            rows_written: HashMap::new(),
        })
    }

    /// The sealed container, with final data offsets. Hand this (or the
    /// header read back from the file) to downstream components.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Rows written to a dataset so far.
    pub fn rows_written(&self, kind: DatasetKind) -> u32 {
        self.rows_written.get(&kind).copied().unwrap_or(0)
    }

    /// Position the cursor at the given dataset's next unwritten row.
    /// Fails with `UnknownDataset` if the kind was not declared.
    pub fn seek_to_dataset(&mut self, kind: DatasetKind) -> Result<DatasetCursor<'_>> {
        if self.container.dataset(kind).is_none() {
            return Err(FileError::UnknownDataset(kind as u8));
        }
        Ok(DatasetCursor { writer: self, kind })
    }

    /// Flush and close, returning the sealed container.
    pub fn finish(mut self) -> Result<Container> {
        use std::io::Write;
        self.file.flush()?;
        Ok(self.container)
    }

    fn write_row(&mut self, kind: DatasetKind, entry: &crate::container::Entry) -> Result<()> {
        // Kind was validated when the cursor was handed out.
        let dataset = self
            .container
            .dataset(kind)
            .ok_or(FileError::UnknownDataset(kind as u8))?;
        let written = self.rows_written.get(&kind).copied().unwrap_or(0);
        if written >= dataset.row_count() {
            return Err(FileError::RowCountExceeded {
                declared: dataset.row_count(),
            });
        }
        let row = encode_row(dataset, entry)?;
        let offset = dataset.row_offset(written);
        write_at(&mut self.file, offset, &row)?;
        self.rows_written.insert(kind, written + 1);
        Ok(())
    }
}

impl<'w> DatasetCursor<'w> {
    /// Write one entry at the cursor and advance by `row_length()`.
    ///
    /// Fails with `RowCountExceeded` past the declared row count and
    /// `ColumnCountMismatch` when the entry's metrics don't match the
    /// declared extra columns.
    pub fn write_entry(&mut self, entry: &crate::container::Entry) -> Result<()> {
        self.writer.write_row(self.kind, entry)
    }
}
