//! Geometry Module
//!
//! Turns resolved field widths into bit offsets and byte sizes for the two
//! physical record types, and maps positions onto the bin grid.
//!
//! ## Bin Record (V4.0+)
//! ```text
//! ┌───────┬─────┬────────────────────┬────────────────────┬───────┬──────────┬──────┬──────┐
//! │ count │ std │ avg/min/max filt.  │ avg/min/max unfilt.│ attrs │ validity │ head │ tail │
//! └───────┴─────┴────────────────────┴────────────────────┴───────┴──────────┴──────┴──────┘
//! ```
//!
//! ## Depth Block
//! ```text
//! ┌──────────┬──────────┬─────┬────────────────────┬─────────────┐
//! │ slot 0   │ slot 1   │ ... │ slot record_len-1  │ continuation│
//! └──────────┴──────────┴─────┴────────────────────┴─────────────┘
//!   each slot: file│line│ping│beam│depth│x│y│validity│attrs│h err│v err
//! ```
//!
//! Records are rounded up to whole bytes; fields are not byte aligned.

mod grid;
mod layout;
mod widths;

pub use grid::Grid;
pub(crate) use layout::allocate;
pub use layout::{BinFlags, BinLayout, DepthLayout, FieldPos, Geometry};
pub use widths::{bits_needed, BitWidths};
