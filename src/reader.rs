//! Reader — header parsing and indexed row access.
//!
//! `read_header` parses only the header block (cheap, used by validation and
//! comparison tools). `open` memory-maps the file and serves indexed row
//! lookups; `from_bytes` does the same over an in-memory buffer (tests,
//! embedding). Datasets of unrecognized kind are skipped, never fatal;
//! structurally damaged headers fail fast with `MalformedHeader`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;

use crate::container::row::decode_row;
use crate::container::{Container, DatasetHeader, DatasetKind, Entry, MAGIC};
use crate::error::{FileError, Result};

/// Header bytes to read before falling back to the whole file. Covers any
/// realistic header; lineage-heavy files retry with a full read.
const HEADER_PROBE_BYTES: u64 = 1 << 20;

#[derive(Debug)]
enum Data {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Data {
    fn as_slice(&self) -> &[u8] {
        match self {
            Data::Mapped(map) => map,
            Data::Owned(vec) => vec,
        }
    }
}

/// Open handle over a fully-written container file.
#[derive(Debug)]
pub struct ContainerReader {
    container: Container,
    data: Data,
}

impl ContainerReader {
    /// Cheap format probe: does this file start with the container magic?
    pub fn is_container_file(path: impl AsRef<Path>) -> bool {
        let mut magic = [0u8; 4];
        match File::open(path) {
            Ok(mut file) => file.read_exact(&mut magic).is_ok() && magic == MAGIC,
            Err(_) => false,
        }
    }

    /// Parse only the file and dataset headers. Row data is not touched.
    ///
    /// Reads a bounded prefix first and falls back to the whole file when
    /// the header is larger than the probe.
    pub fn read_header(path: impl AsRef<Path>) -> Result<Container> {
        let mut file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        let take = len.min(HEADER_PROBE_BYTES);
        let mut buf = vec![0u8; take as usize];
        file.read_exact(&mut buf)?;

        match Container::from_bytes(&buf) {
            Ok(container) => Ok(container),
            Err(FileError::MalformedHeader(_)) if take < len => {
                file.read_to_end(&mut buf)?;
                Container::from_bytes(&buf)
            }
            Err(err) => Err(err),
        }
    }

    /// Open a container file (memory-mapped) for indexed row access.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Err(FileError::MalformedHeader("file is empty".into()));
        }
        let map = unsafe { Mmap::map(&file) }?;
        let container = Container::from_bytes(&map)?;
        Self::validate_regions(&container, map.len())?;
        Ok(Self {
            container,
            data: Data::Mapped(map),
        })
    }

    /// Open a container over an in-memory buffer (for testing / embedding).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let container = Container::from_bytes(&bytes)?;
        Self::validate_regions(&container, bytes.len())?;
        Ok(Self {
            container,
            data: Data::Owned(bytes),
        })
    }

    fn validate_regions(container: &Container, len: usize) -> Result<()> {
        for dataset in container.datasets() {
            let end = dataset.data_offset() + dataset.data_size();
            if end > len as u64 {
                return Err(FileError::MalformedHeader(format!(
                    "{} row region ends at byte {} but the file is {} bytes",
                    dataset.kind().name(),
                    end,
                    len
                )));
            }
        }
        Ok(())
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Parsed header of one dataset, if declared and recognized.
    pub fn dataset(&self, kind: DatasetKind) -> Option<&DatasetHeader> {
        self.container.dataset(kind)
    }

    /// Declared row count for a kind; 0 when the kind is absent.
    pub fn row_count(&self, kind: DatasetKind) -> u32 {
        self.container.row_count(kind)
    }

    /// Decode the row at `index`: built-in fields plus each declared extra
    /// column in schema order.
    pub fn entry(&self, kind: DatasetKind, index: u32) -> Result<Entry> {
        let dataset = self
            .container
            .dataset(kind)
            .ok_or(FileError::DatasetNotFound(kind as u8))?;
        if index >= dataset.row_count() {
            return Err(FileError::IndexOutOfBounds {
                index,
                count: dataset.row_count(),
            });
        }
        let start = dataset.row_offset(index) as usize;
        let row = &self.data.as_slice()[start..start + dataset.row_length()];
        decode_row(dataset, row)
    }

    /// Open a file and materialize everything: the container plus every
    /// recognized dataset's rows, in declared order.
    pub fn read(path: impl AsRef<Path>) -> Result<(Container, Vec<(DatasetKind, Vec<Entry>)>)> {
        let reader = Self::open(path)?;
        let kinds: Vec<DatasetKind> = reader
            .container
            .datasets()
            .iter()
            .map(DatasetHeader::kind)
            .collect();
        let mut rows = Vec::with_capacity(kinds.len());
        for kind in kinds {
            rows.push((kind, reader.entries(kind)?));
        }
        Ok((reader.container, rows))
    }

    /// Materialize every row of one dataset.
    pub fn entries(&self, kind: DatasetKind) -> Result<Vec<Entry>> {
        let dataset = self
            .container
            .dataset(kind)
            .ok_or(FileError::DatasetNotFound(kind as u8))?;
        let mut rows = Vec::with_capacity(dataset.row_count() as usize);
        for index in 0..dataset.row_count() {
            rows.push(self.entry(kind, index)?);
        }
        Ok(rows)
    }
}
