//! chipfile — self-describing binary container for per-feature analysis
//! results.
//!
//! A container file carries heterogeneous tabular measurement results
//! (calls, confidence scores, signal values, typed vendor-defined metrics)
//! alongside provenance metadata: file lineage, algorithm name/version, and
//! free-form typed parameters. Files are self-describing — a reader with no
//! prior schema knowledge can enumerate what a file contains from its
//! header alone.
//!
//! Three access patterns are supported:
//!
//! - one-shot sequential creation from known row counts
//!   ([`SequentialWriter`]),
//! - incremental buffered appends across many open files and datasets
//!   ([`BufferedWriter`]),
//! - random-access in-place update of single rows ([`Updater`]).
//!
//! All multi-byte integers on disk are little-endian. I/O is synchronous
//! and single-owner per open file; the format provides no locking and no
//! journal.
//!
//! ```no_run
//! use chipfile::{
//!     Container, ContainerReader, DatasetHeader, DatasetKind, Entry, FileHeader,
//!     GenotypeEntry, SequentialWriter,
//! };
//!
//! # fn main() -> chipfile::Result<()> {
//! let mut container = Container::new(FileHeader::new("test3", "brlmm", "1.0"));
//! container.set_dataset(DatasetHeader::new(DatasetKind::Genotype, 1, 10));
//!
//! let mut writer = SequentialWriter::create("calls.mdcf", container)?;
//! writer.seek_to_dataset(DatasetKind::Genotype)?.write_entry(&Entry::Genotype(
//!     GenotypeEntry { name: "rs123".into(), call: 1, confidence: 0.98, metrics: vec![] },
//! ))?;
//! writer.finish()?;
//!
//! let reader = ContainerReader::open("calls.mdcf")?;
//! assert_eq!(reader.entry(DatasetKind::Genotype, 0)?.name(), "rs123");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod container;
pub mod error;
pub mod parameter;
pub mod reader;
pub mod value;
pub mod writer;

pub use container::{
    ColumnSchema, Container, CopyNumberEntry, CopyNumberVariationEntry, CytoRegionEntry,
    DatasetHeader, DatasetKind, DmetBiAllelicEntry, DmetCopyNumberEntry, DmetMultiAllelicEntry,
    Entry, ExpressionEntry, FileHeader, GenotypeEntry,
};
pub use error::{FileError, Result};
pub use parameter::{DefaultRequiredParameter, Parameter};
pub use reader::ContainerReader;
pub use value::{Value, ValueKind};
pub use writer::{BufferedWriter, SequentialWriter, Updater};
