//! The container model: one file header plus an ordered list of dataset
//! headers, and the byte-layout computation that places every dataset's row
//! region before a single byte is written.
//!
//! File layout:
//!
//! ```text
//! magic:          b"MDCF"
//! version:        u32
//! dataset_count:  u32
//! file header     (see header.rs, recursive parents included)
//! dataset headers (see dataset.rs), each carrying its absolute data offset
//! row regions,    one per dataset, in declared order
//! ```

pub mod column;
pub mod dataset;
pub mod header;
pub(crate) mod row;
pub mod types;

use std::io::Write;

use serde::Serialize;

use crate::codec::{need, read_u32_at};
use crate::error::{FileError, Result};

pub use column::ColumnSchema;
pub use dataset::DatasetHeader;
pub(crate) use dataset::ParsedDataset;
pub use header::{generate_file_id, FileHeader};
pub use types::{
    CopyNumberEntry, CopyNumberVariationEntry, CytoRegionEntry, DatasetKind, DmetBiAllelicEntry,
    DmetCopyNumberEntry, DmetMultiAllelicEntry, Entry, ExpressionEntry, GenotypeEntry,
    FORMAT_VERSION, MAGIC,
};

/// One open/closed unit of the format: a file header plus its dataset
/// headers. Owned exclusively by whichever component has the file open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub header: FileHeader,
    datasets: Vec<DatasetHeader>,
    /// Kind tags of datasets this build did not recognize and skipped while
    /// reading. Empty for containers built in memory.
    pub skipped_kinds: Vec<u8>,
}

impl Container {
    pub fn new(header: FileHeader) -> Self {
        Self {
            header,
            datasets: Vec::new(),
            skipped_kinds: Vec::new(),
        }
    }

    /// Declare a dataset. Replaces an existing declaration of the same kind
    /// (row counts come from an upstream counting pass and may be revised
    /// before the container is committed to a writer).
    pub fn set_dataset(&mut self, dataset: DatasetHeader) {
        match self.datasets.iter_mut().find(|d| d.kind() == dataset.kind()) {
            Some(existing) => *existing = dataset,
            None => self.datasets.push(dataset),
        }
    }

    pub fn dataset(&self, kind: DatasetKind) -> Option<&DatasetHeader> {
        self.datasets.iter().find(|d| d.kind() == kind)
    }

    pub fn dataset_mut(&mut self, kind: DatasetKind) -> Option<&mut DatasetHeader> {
        self.datasets.iter_mut().find(|d| d.kind() == kind)
    }

    pub fn datasets(&self) -> &[DatasetHeader] {
        &self.datasets
    }

    /// Declared row count for a kind; 0 if the kind is not declared.
    pub fn row_count(&self, kind: DatasetKind) -> u32 {
        self.dataset(kind).map_or(0, DatasetHeader::row_count)
    }

    // ── Layout ─────────────────────────────────────────────────────

    /// Byte size of the serialized header block (everything before the
    /// first row region). Independent of the data offsets themselves.
    pub fn header_size(&self) -> usize {
        4 + 4
            + 4
            + self.header.serialized_size()
            + self
                .datasets
                .iter()
                .map(DatasetHeader::serialized_size)
                .sum::<usize>()
    }

    /// Assign every dataset's absolute data offset (row regions packed in
    /// declared order after the header) and seal all schemas. Returns the
    /// total file size. Called by writers before the first byte goes out.
    pub(crate) fn compute_layout(&mut self) -> u64 {
        let mut offset = self.header_size() as u64;
        for dataset in &mut self.datasets {
            dataset.set_data_offset(offset);
            dataset.seal();
            offset += dataset.data_size();
        }
        offset
    }

    /// Total file size. Meaningful once `compute_layout` has run (or the
    /// container was read back from a file).
    pub fn total_size(&self) -> u64 {
        self.datasets
            .last()
            .map(|d| d.data_offset() + d.data_size())
            .unwrap_or(self.header_size() as u64)
    }

    // ── Disk codec ─────────────────────────────────────────────────

    pub fn write_header_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(self.datasets.len() as u32).to_le_bytes())?;
        self.header.write_to(writer)?;
        for dataset in &self.datasets {
            dataset.write_to(writer)?;
        }
        Ok(())
    }

    /// Parse the header block. `bytes` may be the whole file or any prefix
    /// that covers the header. Datasets of unrecognized kind are skipped
    /// with a warning and recorded in `skipped_kinds`; structural damage
    /// fails fast with `MalformedHeader`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        need(bytes, 0, 4, "magic")?;
        if bytes[0..4] != MAGIC {
            return Err(FileError::MalformedHeader(format!(
                "not a container file: magic {:?}",
                &bytes[0..4]
            )));
        }
        let version = read_u32_at(bytes, 4, "format version")?;
        if version != FORMAT_VERSION {
            return Err(FileError::MalformedHeader(format!(
                "unsupported format version {}",
                version
            )));
        }
        let dataset_count = read_u32_at(bytes, 8, "dataset count")? as usize;
        let (header, mut pos) = FileHeader::read_at(bytes, 12)?;

        let mut datasets = Vec::with_capacity(dataset_count.min(256));
        let mut skipped_kinds = Vec::new();
        for _ in 0..dataset_count {
            let (parsed, next) = DatasetHeader::read_at(bytes, pos)?;
            match parsed {
                ParsedDataset::Known(dataset) => datasets.push(dataset),
                ParsedDataset::Unknown { kind_tag } => {
                    tracing::warn!("skipping dataset with unrecognized kind tag {}", kind_tag);
                    skipped_kinds.push(kind_tag);
                }
            }
            pos = next;
        }

        Ok(Self {
            header,
            datasets,
            skipped_kinds,
        })
    }
}
