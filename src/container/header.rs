//! File headers: identity, algorithm provenance, parameter buckets, and the
//! embedded parent-header lineage chain.
//!
//! Parent headers are owned, immutable snapshots — a parent is copied in
//! whole when lineage is recorded and never re-opened for writing. On disk a
//! file header is:
//!
//! ```text
//! file_id:          string8
//! array_type:       string8
//! alg_name:         string8
//! alg_version:      string8
//! creation_time:    string8      seconds since the Unix epoch, as text
//! general_params:   param list
//! algorithm_params: param list
//! summary_params:   param list
//! parent_count:     u32
//! parents:          file header x parent_count (recursive)
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::codec::{read_string8, read_u32_at, string8_size, write_string8};
use crate::error::{FileError, Result};
use crate::parameter::{param_list_size, read_param_list, write_param_list, Parameter};

/// Maximum lineage depth accepted when parsing. Deeper nesting is treated as
/// a structural violation, not a stack-overflow vector.
const MAX_PARENT_DEPTH: usize = 64;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique file identifier: hex of a blake3 hash over the array
/// type, algorithm name, wall-clock nanoseconds, process id, and a
/// process-local counter.
pub fn generate_file_id(array_type: &str, alg_name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = blake3::Hasher::new();
    hasher.update(array_type.as_bytes());
    hasher.update(alg_name.as_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&counter.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..32].to_string()
}

fn unix_seconds_string() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

/// Top-level container metadata plus the recursive lineage chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    /// Generated unique identifier of this file.
    pub file_id: String,
    /// Physical array / chip type the results were computed for.
    pub array_type: String,
    /// Name of the algorithm that produced the results.
    pub alg_name: String,
    /// Version of the algorithm that produced the results.
    pub alg_version: String,
    /// Creation time, seconds since the Unix epoch, as text.
    pub creation_time: String,
    pub general_params: Vec<Parameter>,
    pub algorithm_params: Vec<Parameter>,
    pub summary_params: Vec<Parameter>,
    /// Embedded upstream headers, oldest-first. Read-only snapshots.
    pub parents: Vec<FileHeader>,
}

impl FileHeader {
    /// New header with a generated file id and the current creation time.
    pub fn new(
        array_type: impl Into<String>,
        alg_name: impl Into<String>,
        alg_version: impl Into<String>,
    ) -> Self {
        let array_type = array_type.into();
        let alg_name = alg_name.into();
        Self {
            file_id: generate_file_id(&array_type, &alg_name),
            array_type,
            alg_name,
            alg_version: alg_version.into(),
            creation_time: unix_seconds_string(),
            general_params: Vec::new(),
            algorithm_params: Vec::new(),
            summary_params: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Embed a parent header for lineage. The parent is copied in whole,
    /// including its own parents.
    pub fn add_parent(&mut self, parent: FileHeader) {
        self.parents.push(parent);
    }

    pub fn add_algorithm_params(&mut self, params: impl IntoIterator<Item = Parameter>) {
        self.algorithm_params.extend(params);
    }

    pub fn add_summary_params(&mut self, params: impl IntoIterator<Item = Parameter>) {
        self.summary_params.extend(params);
    }

    pub fn add_general_params(&mut self, params: impl IntoIterator<Item = Parameter>) {
        self.general_params.extend(params);
    }

    // ── Disk codec ─────────────────────────────────────────────────

    pub fn serialized_size(&self) -> usize {
        string8_size(&self.file_id)
            + string8_size(&self.array_type)
            + string8_size(&self.alg_name)
            + string8_size(&self.alg_version)
            + string8_size(&self.creation_time)
            + param_list_size(&self.general_params)
            + param_list_size(&self.algorithm_params)
            + param_list_size(&self.summary_params)
            + 4
            + self
                .parents
                .iter()
                .map(FileHeader::serialized_size)
                .sum::<usize>()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_string8(writer, &self.file_id)?;
        write_string8(writer, &self.array_type)?;
        write_string8(writer, &self.alg_name)?;
        write_string8(writer, &self.alg_version)?;
        write_string8(writer, &self.creation_time)?;
        write_param_list(writer, &self.general_params)?;
        write_param_list(writer, &self.algorithm_params)?;
        write_param_list(writer, &self.summary_params)?;
        writer.write_all(&(self.parents.len() as u32).to_le_bytes())?;
        for parent in &self.parents {
            parent.write_to(writer)?;
        }
        Ok(())
    }

    /// Parse a file header at `pos`.
    pub fn read_at(bytes: &[u8], pos: usize) -> Result<(Self, usize)> {
        Self::read_at_depth(bytes, pos, 0)
    }

    fn read_at_depth(bytes: &[u8], pos: usize, depth: usize) -> Result<(Self, usize)> {
        if depth > MAX_PARENT_DEPTH {
            return Err(FileError::MalformedHeader(format!(
                "parent lineage deeper than {} levels",
                MAX_PARENT_DEPTH
            )));
        }
        let (file_id, pos) = read_string8(bytes, pos, "file id")?;
        let (array_type, pos) = read_string8(bytes, pos, "array type")?;
        let (alg_name, pos) = read_string8(bytes, pos, "algorithm name")?;
        let (alg_version, pos) = read_string8(bytes, pos, "algorithm version")?;
        let (creation_time, pos) = read_string8(bytes, pos, "creation time")?;
        let (general_params, pos) = read_param_list(bytes, pos)?;
        let (algorithm_params, pos) = read_param_list(bytes, pos)?;
        let (summary_params, pos) = read_param_list(bytes, pos)?;
        let parent_count = read_u32_at(bytes, pos, "parent count")? as usize;
        let mut pos = pos + 4;
        let mut parents = Vec::with_capacity(parent_count.min(MAX_PARENT_DEPTH));
        for _ in 0..parent_count {
            let (parent, next) = Self::read_at_depth(bytes, pos, depth + 1)?;
            parents.push(parent);
            pos = next;
        }
        Ok((
            Self {
                file_id,
                array_type,
                alg_name,
                alg_version,
                creation_time,
                general_params,
                algorithm_params,
                summary_params,
                parents,
            },
            pos,
        ))
    }
}
