//! # PFM
//!
//! A bit-packed, self-describing storage engine for dense gridded
//! bathymetric survey data:
//! - Per-cell summary statistics ("bin records") with random access
//! - Append-only linked chains of raw soundings per cell
//! - Runtime-sized, non byte-aligned record fields
//! - A windowed bin cache that batches disk I/O for bulk loads
//! - Checkpoint/recovery for crash safety during long appends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Registry (integer handles)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Pfm (one open structure)                     │
//! │      list / line / handle files, checkpoint, recompute       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Bin Cache  │─────────▶│   Stores    │
//!   │  (window)   │          │ bin / depth │
//!   └─────────────┘          │  coverage   │
//!                            └──────┬──────┘
//!                                   │
//!                                   ▼
//!                     ┌──────────────────────────┐
//!                     │ Record codec + geometry  │
//!                     │        bit codec         │
//!                     └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod header;
pub mod geometry;
pub mod record;
pub mod storage;
pub mod cache;
pub mod files;
pub mod recompute;
pub mod pfm;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PfmError, Result};
pub use config::{CacheConfig, CheckpointMode, Config, CreateParams};
pub use header::{FormatVersion, PfmHeader};
pub use record::{BinCoord, BinRecord, BlockRef, CoverageFlags, DepthAddress, DepthRecord, RecordCodec, Validity};
pub use pfm::Pfm;
pub use registry::{Handle, Registry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
