//! Record Module
//!
//! In-memory forms of the two persisted record types and the codec that
//! packs them into their bit-level layouts.
//!
//! ## Chain Model
//! ```text
//!  bin (x,y) ── head ──▶ ┌─────────┐ cont ┌─────────┐ cont ┌─────────┐
//!                        │ block A │ ───▶ │ block B │ ───▶ │ block C │ cont = 0
//!               tail ──────────────────────────────────▶ └─────────┘
//! ```
//!
//! Blocks are addressed by their byte offset in the index file
//! ([`BlockRef`]); a continuation pointer of 0 ends the chain.

pub mod codec;

use std::fmt;

use bitflags::bitflags;

use crate::header::NUM_ATTR;

pub use codec::RecordCodec;

/// Integer grid coordinate: `x` is the column, `y` the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BinCoord {
    pub x: i32,
    pub y: i32,
}

impl BinCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for BinCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Byte offset of a physical depth block in the index file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub u64);

impl BlockRef {
    pub fn offset(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of one sounding: its block and slot within the block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthAddress {
    pub block: BlockRef,
    pub slot: usize,
}

bitflags! {
    /// Validity bits shared by soundings and bins
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Validity: u32 {
        const MANUALLY_INVAL = 1 << 0;
        const FILTER_INVAL = 1 << 1;
        const SUSPECT = 1 << 2;
        const SELECTED = 1 << 3;
        const REFERENCE = 1 << 4;
        const USER_01 = 1 << 5;
        const USER_02 = 1 << 6;
        const USER_03 = 1 << 7;
        const USER_04 = 1 << 8;
        const USER_05 = 1 << 9;
        const MODIFIED = 1 << 10;
        const DELETED = 1 << 11;
        const CHECKED = 1 << 12;
        const VERIFIED = 1 << 13;
        /// Bin has at least one valid sounding
        const DATA = 1 << 14;

        const INVAL = Self::MANUALLY_INVAL.bits() | Self::FILTER_INVAL.bits();
        const USER = Self::USER_01.bits()
            | Self::USER_02.bits()
            | Self::USER_03.bits()
            | Self::USER_04.bits()
            | Self::USER_05.bits();
        /// Bits a recompute carries from soundings up to their bin
        const PROPAGATED = Self::SUSPECT.bits()
            | Self::SELECTED.bits()
            | Self::REFERENCE.bits()
            | Self::USER.bits()
            | Self::MODIFIED.bits();
    }
}

impl Validity {
    /// Sounding takes part in filtered statistics
    pub fn is_valid(&self) -> bool {
        !self.intersects(Validity::INVAL | Validity::DELETED)
    }
}

bitflags! {
    /// One coverage map byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CoverageFlags: u8 {
        const DATA = 0x01;
        const SURVEYED = 0x02;
        const CHECKED = 0x04;
        const VERIFIED = 0x08;
    }
}

impl CoverageFlags {
    /// Derive the coverage byte from a bin record
    pub fn from_bin(bin: &BinRecord) -> Self {
        let mut flags = CoverageFlags::empty();
        flags.set(CoverageFlags::DATA, bin.validity.contains(Validity::DATA));
        flags.set(CoverageFlags::SURVEYED, bin.num_soundings > 0);
        flags.set(CoverageFlags::CHECKED, bin.validity.contains(Validity::CHECKED));
        flags.set(CoverageFlags::VERIFIED, bin.validity.contains(Validity::VERIFIED));
        flags
    }
}

/// Summary statistics for one bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinRecord {
    pub coord: BinCoord,
    pub num_soundings: u32,
    pub standard_dev: f32,
    pub avg_filtered_depth: f32,
    pub min_filtered_depth: f32,
    pub max_filtered_depth: f32,
    pub avg_depth: f32,
    pub min_depth: f32,
    pub max_depth: f32,
    pub attr: [f32; NUM_ATTR],
    pub validity: Validity,
    /// First block of the chain; `None` while the bin is empty
    pub head: Option<BlockRef>,
    /// Last block of the chain; `None` while the bin is empty
    pub tail: Option<BlockRef>,
}

impl BinRecord {
    /// An empty bin with every depth set to `null_depth`
    pub fn empty(coord: BinCoord, null_depth: f32) -> Self {
        Self {
            coord,
            num_soundings: 0,
            standard_dev: 0.0,
            avg_filtered_depth: null_depth,
            min_filtered_depth: null_depth,
            max_filtered_depth: null_depth,
            avg_depth: null_depth,
            min_depth: null_depth,
            max_depth: null_depth,
            attr: [0.0; NUM_ATTR],
            validity: Validity::empty(),
            head: None,
            tail: None,
        }
    }
}

/// Three-component position: horizontal position plus depth
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One sounding
#[derive(Debug, Clone, PartialEq)]
pub struct DepthRecord {
    pub file_number: u32,
    pub line_number: u32,
    pub ping_number: u32,
    pub beam_number: u32,
    pub xyz: Coord3,
    /// Bin holding this sounding; derived from `xyz` on append
    pub coord: BinCoord,
    pub validity: Validity,
    pub attr: [f32; NUM_ATTR],
    pub horizontal_error: Option<f32>,
    pub vertical_error: Option<f32>,
    /// Where the sounding lives; set when read from a chain
    pub address: Option<DepthAddress>,
}

impl DepthRecord {
    pub fn new(xyz: Coord3) -> Self {
        Self {
            file_number: 0,
            line_number: 0,
            ping_number: 0,
            beam_number: 0,
            xyz,
            coord: BinCoord::default(),
            validity: Validity::empty(),
            attr: [0.0; NUM_ATTR],
            horizontal_error: None,
            vertical_error: None,
            address: None,
        }
    }

    /// Set file/line/ping/beam identifiers
    pub fn with_ids(mut self, file: u32, line: u32, ping: u32, beam: u32) -> Self {
        self.file_number = file;
        self.line_number = line;
        self.ping_number = ping;
        self.beam_number = beam;
        self
    }
}
