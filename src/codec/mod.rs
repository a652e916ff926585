//! Bit Codec Module
//!
//! Packs and unpacks unsigned integers of arbitrary width at arbitrary bit
//! offsets. Every on-disk record (bin records, depth blocks) is built on it.
//!
//! ## Bit Order
//! ```text
//!   byte 0            byte 1            byte 2
//! ┌─────────────────┬─────────────────┬─────────────────┐
//! │ 7 6 5 4 3 2 1 0 │ 7 6 5 4 3 2 1 0 │ 7 6 5 4 3 2 1 0 │
//! └─────────────────┴─────────────────┴─────────────────┘
//!       ▲ start = 3, width = 9
//!       └── field MSB ─────────┘ field LSB (bit 11)
//! ```
//!
//! Fields are written most-significant-bit first and may straddle any number
//! of byte boundaries. Values wider than the field are truncated, never
//! rejected: the geometry calculator sizes fields, the record codec trusts it.

mod bitpack;

pub use bitpack::{bit_pack, bit_unpack, double_bit_pack, double_bit_unpack, PointerOrder};
