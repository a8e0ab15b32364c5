//! Writer protocols over the container layout: one-shot sequential
//! creation, batched buffered appends, and in-place row updates.
//!
//! A file has at most one writer over its lifetime (create → fill → close);
//! afterwards at most one updater session may reopen it for row patches. No
//! locking is provided — exclusive access is a deployment assumption. A
//! write interrupted between seek and flush can leave a torn row; the format
//! carries no journal, so crash-atomicity is the caller's concern.

pub mod buffered;
pub mod sequential;
pub mod updater;

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::error::Result;

pub use buffered::BufferedWriter;
pub use sequential::SequentialWriter;
pub use updater::Updater;

/// Write `bytes` at an absolute file offset.
pub(crate) fn write_at(file: &mut File, offset: u64, bytes: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    Ok(())
}
