//! Format constants, dataset kinds, and per-kind entry records.
//!
//! A dataset kind fixes the built-in leading fields of every row in that
//! dataset; callers extend rows with declared extra columns (see
//! `column.rs`). The kind catalog is closed: every encode/decode site
//! matches `Entry` exhaustively, so adding a kind is a compile-checked
//! change everywhere.

use serde::Serialize;

use crate::value::Value;

// ── Constants ──────────────────────────────────────────────────────

/// Magic bytes at offset 0 of every container file.
pub const MAGIC: [u8; 4] = *b"MDCF";

/// Format version.
pub const FORMAT_VERSION: u32 = 1;

// ── Dataset Kind ───────────────────────────────────────────────────

/// Kind of dataset (stored as u8 in the dataset header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum DatasetKind {
    Expression = 0,
    Genotype = 1,
    CopyNumber = 2,
    CytoRegion = 3,
    CopyNumberVariation = 4,
    DmetBiAllelic = 5,
    DmetMultiAllelic = 6,
    DmetCopyNumber = 7,
}

impl DatasetKind {
    /// All kinds this build recognizes. Files may contain others; readers
    /// skip those (see `reader.rs`).
    pub const ALL: [DatasetKind; 8] = [
        DatasetKind::Expression,
        DatasetKind::Genotype,
        DatasetKind::CopyNumber,
        DatasetKind::CytoRegion,
        DatasetKind::CopyNumberVariation,
        DatasetKind::DmetBiAllelic,
        DatasetKind::DmetMultiAllelic,
        DatasetKind::DmetCopyNumber,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Expression),
            1 => Some(Self::Genotype),
            2 => Some(Self::CopyNumber),
            3 => Some(Self::CytoRegion),
            4 => Some(Self::CopyNumberVariation),
            5 => Some(Self::DmetBiAllelic),
            6 => Some(Self::DmetMultiAllelic),
            7 => Some(Self::DmetCopyNumber),
            _ => None,
        }
    }

    /// Byte width of the built-in fixed fields (everything in a row except
    /// the name cell and the declared extra columns).
    pub fn builtin_width(&self) -> usize {
        match self {
            // quantification: f32
            DatasetKind::Expression => 4,
            // call: u8, confidence: f32
            DatasetKind::Genotype => 5,
            // chr: u8, position: u32
            DatasetKind::CopyNumber => 5,
            // chr: u8, start: u32, stop: u32, call: u8, confidence: f32
            DatasetKind::CytoRegion => 14,
            // signal: f32, call: u8, confidence: f32
            DatasetKind::CopyNumberVariation => 9,
            // call: u8, confidence: f32, force: u8, 2 signals, 2 contexts
            DatasetKind::DmetBiAllelic => 16,
            // call, confidence, force, allele_count, 6 signals, 6 contexts
            DatasetKind::DmetMultiAllelic => 37,
            // call: i16, confidence: f32, force: i16, 3 estimates
            DatasetKind::DmetCopyNumber => 20,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Expression => "Expression",
            DatasetKind::Genotype => "Genotype",
            DatasetKind::CopyNumber => "CopyNumber",
            DatasetKind::CytoRegion => "CytoRegion",
            DatasetKind::CopyNumberVariation => "CopyNumberVariation",
            DatasetKind::DmetBiAllelic => "DmetBiAllelic",
            DatasetKind::DmetMultiAllelic => "DmetMultiAllelic",
            DatasetKind::DmetCopyNumber => "DmetCopyNumber",
        }
    }
}

// ── Entry Records ──────────────────────────────────────────────────

/// Expression quantification result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExpressionEntry {
    pub name: String,
    pub quantification: f32,
    /// Extra-column values, in the dataset's declared column order.
    pub metrics: Vec<Value>,
}

/// Genotype call with confidence.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GenotypeEntry {
    pub name: String,
    pub call: u8,
    pub confidence: f32,
    pub metrics: Vec<Value>,
}

/// Copy-number state at a chromosomal position.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CopyNumberEntry {
    pub name: String,
    pub chr: u8,
    pub position: u32,
    pub metrics: Vec<Value>,
}

/// Cytogenetic region call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CytoRegionEntry {
    pub name: String,
    pub chr: u8,
    pub start_position: u32,
    pub stop_position: u32,
    pub call: u8,
    pub confidence: f32,
    pub metrics: Vec<Value>,
}

/// Copy-number variation region with signal estimate.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CopyNumberVariationEntry {
    pub name: String,
    pub signal: f32,
    pub call: u8,
    pub confidence: f32,
    pub metrics: Vec<Value>,
}

/// Bi-allelic marker call (two allele signals and contexts).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DmetBiAllelicEntry {
    pub name: String,
    pub call: u8,
    pub confidence: f32,
    pub force: u8,
    pub signal_a: f32,
    pub signal_b: f32,
    pub context_a: u8,
    pub context_b: u8,
    pub metrics: Vec<Value>,
}

/// Multi-allelic marker call (up to six allele signals and contexts).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DmetMultiAllelicEntry {
    pub name: String,
    pub call: u8,
    pub confidence: f32,
    pub force: u8,
    pub allele_count: u8,
    pub signal_a: f32,
    pub signal_b: f32,
    pub signal_c: f32,
    pub signal_d: f32,
    pub signal_e: f32,
    pub signal_f: f32,
    pub context_a: u8,
    pub context_b: u8,
    pub context_c: u8,
    pub context_d: u8,
    pub context_e: u8,
    pub context_f: u8,
    pub metrics: Vec<Value>,
}

/// Copy-number call with a bounded estimate.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DmetCopyNumberEntry {
    pub name: String,
    pub call: i16,
    pub confidence: f32,
    pub force: i16,
    pub estimate: f32,
    pub lower: f32,
    pub upper: f32,
    pub metrics: Vec<Value>,
}

/// One row of some dataset. Closed sum; row encode/decode matches it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Entry {
    Expression(ExpressionEntry),
    Genotype(GenotypeEntry),
    CopyNumber(CopyNumberEntry),
    CytoRegion(CytoRegionEntry),
    CopyNumberVariation(CopyNumberVariationEntry),
    DmetBiAllelic(DmetBiAllelicEntry),
    DmetMultiAllelic(DmetMultiAllelicEntry),
    DmetCopyNumber(DmetCopyNumberEntry),
}

impl Entry {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Entry::Expression(_) => DatasetKind::Expression,
            Entry::Genotype(_) => DatasetKind::Genotype,
            Entry::CopyNumber(_) => DatasetKind::CopyNumber,
            Entry::CytoRegion(_) => DatasetKind::CytoRegion,
            Entry::CopyNumberVariation(_) => DatasetKind::CopyNumberVariation,
            Entry::DmetBiAllelic(_) => DatasetKind::DmetBiAllelic,
            Entry::DmetMultiAllelic(_) => DatasetKind::DmetMultiAllelic,
            Entry::DmetCopyNumber(_) => DatasetKind::DmetCopyNumber,
        }
    }

    /// The row's identifying name field.
    pub fn name(&self) -> &str {
        match self {
            Entry::Expression(e) => &e.name,
            Entry::Genotype(e) => &e.name,
            Entry::CopyNumber(e) => &e.name,
            Entry::CytoRegion(e) => &e.name,
            Entry::CopyNumberVariation(e) => &e.name,
            Entry::DmetBiAllelic(e) => &e.name,
            Entry::DmetMultiAllelic(e) => &e.name,
            Entry::DmetCopyNumber(e) => &e.name,
        }
    }

    /// Extra-column values, in declared column order.
    pub fn metrics(&self) -> &[Value] {
        match self {
            Entry::Expression(e) => &e.metrics,
            Entry::Genotype(e) => &e.metrics,
            Entry::CopyNumber(e) => &e.metrics,
            Entry::CytoRegion(e) => &e.metrics,
            Entry::CopyNumberVariation(e) => &e.metrics,
            Entry::DmetBiAllelic(e) => &e.metrics,
            Entry::DmetMultiAllelic(e) => &e.metrics,
            Entry::DmetCopyNumber(e) => &e.metrics,
        }
    }
}
