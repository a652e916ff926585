//! Storage Module
//!
//! Persistent record stores for one structure.
//!
//! ## Responsibilities
//! - Random access to fixed-size bin records by grid coordinate
//! - Append-only growth of per-bin depth chains in the index file
//! - One coverage byte per cell, kept in step with bin writes
//!
//! ## Bin File
//! ```text
//! ┌────────────────────────────────────────┐ 0
//! │ ASCII header block (16384 bytes)       │
//! ├────────────────────────────────────────┤ 16384
//! │ bin (0,0) │ bin (1,0) │ ... │ bin(w-1,0)│
//! │ ...                                    │ row-major, record_size bytes each
//! │ bin (0,h-1) │ ...         │ bin(w-1,h-1)│
//! ├────────────────────────────────────────┤ [COVERAGE MAP ADDRESS]
//! │ coverage map: 1 byte per cell          │ (V5.0+)
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Index File
//! ```text
//! ┌─────────┬─────────┬─────────┬─────────┬─────
//! │ block 0 │ block 1 │ block 2 │ block 3 │ ...   flat, append-only
//! └─────────┴─────────┴─────────┴─────────┴─────
//! ```
//! Blocks are only reachable through bin head/tail pointers.

mod bin;
mod coverage;
mod depth;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{FileKind, PfmError, Result};
use crate::header::HEADER_SIZE;

pub use bin::BinStore;
pub use coverage::CoverageMap;
pub use depth::DepthStore;

/// Open an existing member of the file set
pub(crate) fn open_file(path: &Path, kind: FileKind, read_only: bool) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(!read_only)
        .open(path)
        .map_err(|source| PfmError::Open {
            kind,
            path: path.to_path_buf(),
            source,
        })
}

/// Create (or truncate) a member of the file set
pub(crate) fn create_file(path: &Path, kind: FileKind) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| PfmError::Create {
            kind,
            path: path.to_path_buf(),
            source,
        })
}

/// Positioned read of exactly `buffer.len()` bytes
pub(crate) fn read_at(file: &mut File, kind: FileKind, offset: u64, buffer: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))
        .and_then(|_| file.read_exact(buffer))
        .map_err(|source| PfmError::Read { kind, offset, source })
}

/// Positioned write of the whole buffer
pub(crate) fn write_at(file: &mut File, kind: FileKind, offset: u64, buffer: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))
        .and_then(|_| file.write_all(buffer))
        .map_err(|source| PfmError::Write { kind, offset, source })
}

/// Read the raw header block of a bin file
pub fn read_header_block(path: &Path) -> Result<Vec<u8>> {
    let mut file = open_file(path, FileKind::Bin, true)?;
    let mut block = vec![0u8; HEADER_SIZE];
    read_at(&mut file, FileKind::Bin, 0, &mut block)?;
    Ok(block)
}
