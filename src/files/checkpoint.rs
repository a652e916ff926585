//! Checkpoint side file
//!
//! Snapshot of everything a bulk append can change: the list and line files,
//! the header block, the index file length, and each cell's sounding count
//! and tail block. Rolling back to it restores the structure exactly as it
//! was when the snapshot was taken.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FileKind, PfmError, Result};
use crate::header::HEADER_SIZE;
use crate::record::BlockRef;

/// Fixed-size prefix of the checkpoint file
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Prefix {
    /// 1 once the whole file has been written
    complete: u8,
    list_lines: u32,
    line_lines: u32,
    index_size: u64,
}

/// Encoded size of one [`CellState`]
const CELL_STATE_SIZE: usize = 12;

/// Per-cell chain state at checkpoint time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    pub count: u32,
    /// Byte offset of the tail block, -1 for an empty cell
    pub tail: i64,
}

impl CellState {
    pub fn new(count: u32, tail: Option<BlockRef>) -> Self {
        Self {
            count,
            tail: tail.map_or(-1, |b| b.offset() as i64),
        }
    }

    pub fn tail_block(&self) -> Option<BlockRef> {
        (self.tail >= 0).then_some(BlockRef(self.tail as u64))
    }
}

/// State of the checkpoint file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    Absent,
    /// Writing was interrupted; the file must be ignored
    Incomplete,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub list_text: String,
    pub line_text: String,
    pub header_block: Vec<u8>,
    pub index_size: u64,
    /// One entry per cell, row-major
    pub cells: Vec<CellState>,
}

impl Checkpoint {
    pub fn status(path: &Path) -> Result<CheckpointStatus> {
        if !path.exists() {
            return Ok(CheckpointStatus::Absent);
        }
        let mut file = File::open(path).map_err(|source| PfmError::Open {
            kind: FileKind::Checkpoint,
            path: path.to_path_buf(),
            source,
        })?;
        let mut flag = [0u8; 1];
        match file.read(&mut flag)? {
            1 if flag[0] == 1 => Ok(CheckpointStatus::Complete),
            _ => Ok(CheckpointStatus::Incomplete),
        }
    }

    /// Write the checkpoint. The completion flag is set last, after the body
    /// has been synced.
    pub fn write(&self, path: &Path) -> Result<()> {
        if self.header_block.len() != HEADER_SIZE {
            return Err(PfmError::Checkpoint(format!(
                "Header block is {} bytes, expected {}",
                self.header_block.len(),
                HEADER_SIZE
            )));
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| PfmError::Create {
                kind: FileKind::Checkpoint,
                path: path.to_path_buf(),
                source,
            })?;
        let mut writer = BufWriter::new(file);

        let prefix = Prefix {
            complete: 0,
            list_lines: self.list_text.lines().count() as u32,
            line_lines: self.line_text.lines().count() as u32,
            index_size: self.index_size,
        };
        bincode::serialize_into(&mut writer, &prefix)?;

        let written = (|| -> std::io::Result<()> {
            for line in self.list_text.lines().chain(self.line_text.lines()) {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.write_all(&self.header_block)
        })();
        written.map_err(|e| checkpoint_io("writing", path, e))?;

        for cell in &self.cells {
            bincode::serialize_into(&mut writer, cell)?;
        }

        let mut file = writer.into_inner().map_err(|e| checkpoint_io("writing", path, e.into_error()))?;
        file.sync_all().map_err(|e| checkpoint_io("syncing", path, e))?;

        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&[1]))
            .and_then(|_| file.sync_all())
            .map_err(|e| checkpoint_io("completing", path, e))?;

        debug!(
            "Checkpoint written to {} ({} cells, index size {})",
            path.display(),
            self.cells.len(),
            self.index_size
        );
        Ok(())
    }

    /// Read a complete checkpoint
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| PfmError::Open {
            kind: FileKind::Checkpoint,
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let prefix: Prefix = bincode::deserialize_from(&mut reader)?;
        if prefix.complete != 1 {
            return Err(PfmError::Checkpoint(format!("{} is incomplete", path.display())));
        }

        let list_text = read_lines(&mut reader, prefix.list_lines, path)?;
        let line_text = read_lines(&mut reader, prefix.line_lines, path)?;

        let mut header_block = vec![0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header_block)
            .map_err(|e| checkpoint_io("reading header from", path, e))?;

        let mut table = Vec::new();
        reader
            .read_to_end(&mut table)
            .map_err(|e| checkpoint_io("reading cells from", path, e))?;
        if table.len() % CELL_STATE_SIZE != 0 {
            return Err(PfmError::Checkpoint(format!(
                "{} has a partial cell entry ({} trailing bytes)",
                path.display(),
                table.len() % CELL_STATE_SIZE
            )));
        }
        let cells = table
            .chunks_exact(CELL_STATE_SIZE)
            .map(bincode::deserialize)
            .collect::<std::result::Result<Vec<CellState>, _>>()?;

        Ok(Self {
            list_text,
            line_text,
            header_block,
            index_size: prefix.index_size,
            cells,
        })
    }

    /// Delete the checkpoint file if it exists
    pub fn remove(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed checkpoint {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Unable to remove checkpoint {}: {}", path.display(), e);
                Err(PfmError::Io(e))
            }
        }
    }
}

fn read_lines(reader: &mut impl BufRead, count: u32, path: &Path) -> Result<String> {
    let mut text = String::new();
    for _ in 0..count {
        let read = reader
            .read_line(&mut text)
            .map_err(|e| checkpoint_io("reading", path, e))?;
        if read == 0 {
            return Err(PfmError::Checkpoint(format!("{} is truncated", path.display())));
        }
    }
    Ok(text)
}

fn checkpoint_io(action: &str, path: &Path, err: std::io::Error) -> PfmError {
    PfmError::Checkpoint(format!("{} {}: {}", action, path.display(), err))
}
