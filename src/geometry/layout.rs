//! Record layouts
//!
//! Bit offsets of every field in the bin record and in one depth block,
//! computed once per open structure from its header.

use crate::error::{PfmError, Result};
use crate::header::{FormatVersion, PfmHeader};

/// Bit offset and width of one packed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldPos {
    pub pos: usize,
    pub bits: u32,
}

impl FieldPos {
    /// Absolute bit offset of this field inside a slot starting at `base`
    pub fn at(&self, base: usize) -> usize {
        base + self.pos
    }
}

/// Hands out consecutive fields
struct Cursor {
    pos: usize,
}

impl Cursor {
    fn new() -> Self {
        Self { pos: 0 }
    }

    fn take(&mut self, bits: u32) -> FieldPos {
        let field = FieldPos { pos: self.pos, bits };
        self.pos += bits as usize;
        field
    }
}

/// How validity is stored in a bin record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinFlags {
    /// V4.0+: one packed validity word
    Word(FieldPos),

    /// Pre-4.0: one bit per flag
    Legacy {
        checked: FieldPos,
        suspect: FieldPos,
        selected: FieldPos,
        data: FieldPos,
        verified: FieldPos,
    },
}

/// Field positions within a bin record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinLayout {
    pub num_soundings: FieldPos,
    pub standard_dev: FieldPos,
    pub avg_filtered_depth: FieldPos,
    pub min_filtered_depth: FieldPos,
    pub max_filtered_depth: FieldPos,
    pub avg_depth: FieldPos,
    pub min_depth: FieldPos,
    pub max_depth: FieldPos,
    pub attr: Vec<FieldPos>,
    pub flags: BinFlags,
    pub head: FieldPos,
    pub tail: FieldPos,
    /// Whole bytes per record
    pub record_size: usize,
}

/// Field positions within one sounding slot, plus the block trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthLayout {
    pub file_number: FieldPos,
    pub line_number: FieldPos,
    pub ping_number: FieldPos,
    pub beam_number: FieldPos,
    pub depth: FieldPos,
    pub x_offset: FieldPos,
    pub y_offset: FieldPos,
    pub validity: FieldPos,
    pub attr: Vec<FieldPos>,
    pub horizontal_error: Option<FieldPos>,
    pub vertical_error: Option<FieldPos>,
    /// Bits per sounding slot
    pub sounding_bits: usize,
    /// Slots per physical block
    pub record_length: usize,
    /// Absolute position of the continuation pointer in the block
    pub continuation: FieldPos,
    /// Whole bytes per physical block
    pub record_size: usize,
}

impl DepthLayout {
    /// First bit of sounding slot `slot`
    pub fn slot_base(&self, slot: usize) -> usize {
        slot * self.sounding_bits
    }
}

/// Both record layouts for one structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub bin: BinLayout,
    pub depth: DepthLayout,
}

impl Geometry {
    /// Compute both layouts from the header's field widths and format version
    pub fn compute(header: &PfmHeader) -> Self {
        Self {
            bin: bin_layout(header),
            depth: depth_layout(header),
        }
    }
}

/// Zeroed buffer of `bytes` bytes, reporting allocation failure as an error
pub(crate) fn allocate(bytes: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|_| PfmError::BufferAllocation { bytes })?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

fn bin_layout(h: &PfmHeader) -> BinLayout {
    let mut c = Cursor::new();

    let num_soundings = c.take(h.count_bits);
    let standard_dev = c.take(h.std_bits);
    let avg_filtered_depth = c.take(h.depth_bits);
    let min_filtered_depth = c.take(h.depth_bits);
    let max_filtered_depth = c.take(h.depth_bits);
    let avg_depth = c.take(h.depth_bits);
    let min_depth = c.take(h.depth_bits);
    let max_depth = c.take(h.depth_bits);

    let (attr, flags) = if h.format_version < FormatVersion::ATTRIBUTES {
        let flags = BinFlags::Legacy {
            checked: c.take(1),
            suspect: c.take(1),
            selected: c.take(1),
            data: c.take(1),
            verified: c.take(1),
        };
        (Vec::new(), flags)
    } else {
        let attr = h.bin_attr[..h.num_bin_attr].iter().map(|a| c.take(a.bits)).collect();
        (attr, BinFlags::Word(c.take(h.validity_bits)))
    };

    let head = c.take(h.record_pointer_bits);
    let tail = c.take(h.record_pointer_bits);

    BinLayout {
        num_soundings,
        standard_dev,
        avg_filtered_depth,
        min_filtered_depth,
        max_filtered_depth,
        avg_depth,
        min_depth,
        max_depth,
        attr,
        flags,
        head,
        tail,
        record_size: c.pos.div_ceil(8),
    }
}

fn depth_layout(h: &PfmHeader) -> DepthLayout {
    let mut c = Cursor::new();

    let file_number = c.take(h.file_number_bits);
    let line_number = c.take(h.line_number_bits);
    let ping_number = c.take(h.ping_number_bits);
    let beam_number = c.take(h.beam_number_bits);
    let depth = c.take(h.depth_bits);
    let x_offset = c.take(h.offset_bits);
    let y_offset = c.take(h.offset_bits);
    let validity = c.take(h.validity_bits);

    let attr = if h.format_version >= FormatVersion::ATTRIBUTES {
        h.ndx_attr[..h.num_ndx_attr].iter().map(|a| c.take(a.bits)).collect()
    } else {
        Vec::new()
    };

    let with_errors = h.format_version >= FormatVersion::COVERAGE;
    let horizontal_error =
        (with_errors && h.horizontal_error.enabled()).then(|| c.take(h.horizontal_error.bits));
    let vertical_error = (with_errors && h.vertical_error.enabled()).then(|| c.take(h.vertical_error.bits));

    let sounding_bits = c.pos;
    let record_length = h.record_length as usize;
    let continuation = FieldPos {
        pos: sounding_bits * record_length,
        bits: h.record_pointer_bits,
    };
    let total_bits = continuation.pos + continuation.bits as usize;

    DepthLayout {
        file_number,
        line_number,
        ping_number,
        beam_number,
        depth,
        x_offset,
        y_offset,
        validity,
        attr,
        horizontal_error,
        vertical_error,
        sounding_bits,
        record_length,
        continuation,
        record_size: total_bits.div_ceil(8),
    }
}
