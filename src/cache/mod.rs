//! Bin Cache Module
//!
//! Windowed write-back cache in front of the bin and depth stores, used for
//! bulk loading where soundings arrive in roughly spatial order.
//!
//! ## Responsibilities
//! - Hold bin records of a rectangular window of cells in memory
//! - Buffer appended depth blocks until the window is flushed
//! - Flush on window miss, byte budget overrun, or explicit request
//!
//! ## Lifecycle
//! ```text
//!   ┌──────────────┐ first get ┌────────────┐ miss / over budget / flush ┌──────────┐
//!   │uninitialized │ ────────▶ │ populated  │ ─────────────────────────▶ │ flushing │
//!   └──────────────┘           └────────────┘                            └────┬─────┘
//!          ▲                                                                   │
//!          └───────────────────────── destroy ─────────────────────────────────┘
//! ```
//!
//! ## Entry States
//! - `Loaded`: read from disk, nothing to write back
//! - `Appended`: soundings were added; blocks and record are written on flush

mod window;

pub use window::{BinCache, CacheEntry, EntryState};
