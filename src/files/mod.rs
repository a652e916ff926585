//! Files Module
//!
//! The cooperating files that make up one structure on disk, apart from the
//! bin and index files owned by the record stores.
//!
//! ## File Set
//! ```text
//! survey.pfm                      handle file: banner + data directory
//! survey.pfm.data/
//! ├── survey.pfm.ctl              list file: input file manifest
//! ├── survey.pfm.lin              line names, one per line
//! ├── survey.pfm.bin              header block + bin grid + coverage map
//! └── survey.pfm.ndx              depth blocks
//! survey.pfm.data/survey.pfm.ctl.chk   checkpoint (only during bulk loads)
//! ```
//!
//! ## Checkpoint File
//! ```text
//! ┌──────────┬────────────┬────────────┬────────────┐
//! │ done (1) │ list lines │ line lines │ index size │  bincode, fixed-int LE
//! ├──────────┴────────────┴────────────┴────────────┤
//! │ list file text, line file text                  │
//! ├─────────────────────────────────────────────────┤
//! │ header block (16384)                            │
//! ├─────────────────────────────────────────────────┤
//! │ (count u32, tail i64) per cell, row-major       │
//! └─────────────────────────────────────────────────┘
//! ```
//! `done` is set to 1 only after everything else is on disk.

mod checkpoint;
mod handle;
mod list;

pub use checkpoint::{CellState, Checkpoint, CheckpointStatus};
pub use handle::PfmPaths;
pub use list::{InputFile, LineFile, ListFile};
