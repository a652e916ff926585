//! Error types for PFM
//!
//! Provides a unified error type for all operations. Every variant maps to a
//! stable negative status code through [`PfmError::code`] so that callers
//! which only deal in integers (handle-based front ends, the CLI exit status)
//! see the same value for the same failure across releases.

use std::path::PathBuf;

use thiserror::Error;

use crate::header::FormatVersion;
use crate::record::BinCoord;

/// Result type alias using PfmError
pub type Result<T> = std::result::Result<T, PfmError>;

/// Unified error type for PFM operations
#[derive(Debug, Error)]
pub enum PfmError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to open {kind} file {path}: {source}")]
    Open {
        kind: FileKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to create {kind} file {path}: {source}")]
    Create {
        kind: FileKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error reading {kind} file at offset {offset}: {source}")]
    Read {
        kind: FileKind,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Error writing {kind} file at offset {offset}: {source}")]
    Write {
        kind: FileKind,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to allocate {bytes} byte record buffer")]
    BufferAllocation { bytes: usize },

    #[error("Structure is open read-only")]
    ReadOnly,

    // -------------------------------------------------------------------------
    // Format / Version Errors
    // -------------------------------------------------------------------------
    #[error("No PFM library version banner found in {path}")]
    MissingVersion { path: PathBuf },

    #[error("File version {found} is newer than library version {supported}")]
    NewerVersion {
        found: FormatVersion,
        supported: FormatVersion,
    },

    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    #[error("Corrupt list file: {0}")]
    CorruptListFile(String),

    #[error("Invalid creation parameters: {0}")]
    InvalidParams(String),

    #[error("Structure already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Structure not found: {path}")]
    NotFound { path: PathBuf },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Bin {coord} already holds the maximum of {max} soundings")]
    TooManySoundings { coord: BinCoord, max: u64 },

    #[error("{field} {value} exceeds the configured maximum of {max}")]
    IdentifierOverflow {
        field: Identifier,
        value: u64,
        max: u64,
    },

    #[error("Polygon has {count} vertices (max {max})")]
    TooManyPolygonPoints { count: usize, max: usize },

    #[error("{count} attributes requested (max {max})")]
    TooManyAttributes { count: usize, max: usize },

    #[error("Too many open structures (max {max})")]
    TooManyOpen { max: usize },

    // -------------------------------------------------------------------------
    // Addressing Errors
    // -------------------------------------------------------------------------
    #[error("Bin coordinate {coord} is outside the {width}x{height} grid")]
    CoordOutOfRange {
        coord: BinCoord,
        width: i32,
        height: i32,
    },

    #[error("Position ({x}, {y}) is outside the structure's area")]
    PositionOutOfArea { x: f64, y: f64 },

    #[error("Invalid handle: {0}")]
    InvalidHandle(i32),

    // -------------------------------------------------------------------------
    // Consistency Errors
    // -------------------------------------------------------------------------
    #[error(
        "Stale depth address {address}:{slot}: expected file {expected_file} ping {expected_ping} \
         beam {expected_beam}, found file {found_file} ping {found_ping} beam {found_beam}"
    )]
    StaleDepthAddress {
        address: u64,
        slot: usize,
        expected_file: u32,
        expected_ping: u32,
        expected_beam: u32,
        found_file: u32,
        found_ping: u32,
        found_beam: u32,
    },

    #[error("Depth record has no chain address (it was not read from a chain)")]
    MissingDepthAddress,

    #[error("Depth chain for bin {coord} is broken: {reason}")]
    BrokenChain { coord: BinCoord, reason: String },

    // -------------------------------------------------------------------------
    // Recovery Errors
    // -------------------------------------------------------------------------
    #[error("A completed checkpoint exists at {path}; open in recovery mode first")]
    CheckpointPending { path: PathBuf },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Which member of the cooperating file set an I/O error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Handle,
    List,
    Line,
    Bin,
    Index,
    Checkpoint,
    Config,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileKind::Handle => "handle",
            FileKind::List => "list",
            FileKind::Line => "line",
            FileKind::Bin => "bin",
            FileKind::Index => "index",
            FileKind::Checkpoint => "checkpoint",
            FileKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Bit-width bounded identifiers carried by each sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifier {
    File,
    Line,
    Ping,
    Beam,
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Identifier::File => "File number",
            Identifier::Line => "Line number",
            Identifier::Ping => "Ping number",
            Identifier::Beam => "Beam number",
        };
        f.write_str(name)
    }
}

impl PfmError {
    /// Stable status code for this error. Success is 0, every failure is
    /// negative. Codes are never reused or renumbered.
    pub fn code(&self) -> i32 {
        match self {
            PfmError::Io(_) => -1,
            PfmError::Open { kind, .. } => match kind {
                FileKind::Handle => -2,
                FileKind::List => -3,
                FileKind::Line => -4,
                FileKind::Bin => -5,
                FileKind::Index => -6,
                FileKind::Checkpoint => -7,
                FileKind::Config => -8,
            },
            PfmError::Create { kind, .. } => match kind {
                FileKind::Handle => -9,
                FileKind::List => -10,
                FileKind::Line => -11,
                FileKind::Bin => -12,
                FileKind::Index => -13,
                FileKind::Checkpoint => -14,
                FileKind::Config => -15,
            },
            PfmError::Read { kind, .. } => match kind {
                FileKind::Handle => -16,
                FileKind::List => -17,
                FileKind::Line => -18,
                FileKind::Bin => -19,
                FileKind::Index => -20,
                FileKind::Checkpoint => -21,
                FileKind::Config => -22,
            },
            PfmError::Write { kind, .. } => match kind {
                FileKind::Handle => -23,
                FileKind::List => -24,
                FileKind::Line => -25,
                FileKind::Bin => -26,
                FileKind::Index => -27,
                FileKind::Checkpoint => -28,
                FileKind::Config => -29,
            },
            PfmError::BufferAllocation { .. } => -30,
            PfmError::ReadOnly => -31,
            PfmError::MissingVersion { .. } => -32,
            PfmError::NewerVersion { .. } => -33,
            PfmError::CorruptHeader(_) => -34,
            PfmError::CorruptListFile(_) => -35,
            PfmError::InvalidParams(_) => -36,
            PfmError::AlreadyExists { .. } => -37,
            PfmError::NotFound { .. } => -38,
            PfmError::TooManySoundings { .. } => -39,
            PfmError::IdentifierOverflow { field, .. } => match field {
                Identifier::File => -40,
                Identifier::Line => -41,
                Identifier::Ping => -42,
                Identifier::Beam => -43,
            },
            PfmError::TooManyPolygonPoints { .. } => -44,
            PfmError::TooManyAttributes { .. } => -45,
            PfmError::TooManyOpen { .. } => -46,
            PfmError::CoordOutOfRange { .. } => -47,
            PfmError::PositionOutOfArea { .. } => -48,
            PfmError::InvalidHandle(_) => -49,
            PfmError::StaleDepthAddress { .. } => -50,
            PfmError::MissingDepthAddress => -51,
            PfmError::BrokenChain { .. } => -52,
            PfmError::CheckpointPending { .. } => -53,
            PfmError::Checkpoint(_) => -54,
            PfmError::Serialization(_) => -55,
        }
    }
}

impl From<bincode::Error> for PfmError {
    fn from(err: bincode::Error) -> Self {
        PfmError::Serialization(err.to_string())
    }
}
