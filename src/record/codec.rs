//! Record codec
//!
//! Packs [`BinRecord`]s and [`DepthRecord`]s into their on-disk bit layouts
//! and back. One codec is built per open structure from its header and is
//! shared by the stores and the cache.

use crate::codec::{bit_pack, bit_unpack, double_bit_pack, double_bit_unpack, PointerOrder};
use crate::error::{Identifier, PfmError, Result};
use crate::geometry::{BinFlags, FieldPos, Geometry, Grid};
use crate::header::{AttributeDef, ErrorDef, FormatVersion, PfmHeader, NUM_ATTR};
use crate::record::{BinCoord, BinRecord, BlockRef, Coord3, DepthAddress, DepthRecord, Validity};

/// Header values needed to scale stored integers back to physical units
#[derive(Debug, Clone)]
struct Scales {
    depth_scale: f32,
    depth_offset: f32,
    null_depth: f32,
    std_scale: f32,
    bin_attr: Vec<AttributeDef>,
    ndx_attr: Vec<AttributeDef>,
    horizontal_error: ErrorDef,
    vertical_error: ErrorDef,
}

/// Encoder/decoder for both record types of one structure
#[derive(Debug, Clone)]
pub struct RecordCodec {
    geometry: Geometry,
    grid: Grid,
    scales: Scales,
    order: PointerOrder,
    count_bits: u32,
    file_bits: u32,
    line_bits: u32,
    ping_bits: u32,
    beam_bits: u32,
}

impl RecordCodec {
    pub fn new(header: &PfmHeader) -> Self {
        Self {
            geometry: Geometry::compute(header),
            grid: Grid::from_header(header),
            scales: Scales {
                depth_scale: header.depth_scale,
                depth_offset: header.depth_offset,
                null_depth: header.null_depth,
                std_scale: header.std_scale,
                bin_attr: header.bin_attr[..header.num_bin_attr.min(NUM_ATTR)].to_vec(),
                ndx_attr: header.ndx_attr[..header.num_ndx_attr.min(NUM_ATTR)].to_vec(),
                horizontal_error: header.horizontal_error,
                vertical_error: header.vertical_error,
            },
            order: pointer_order(header),
            count_bits: header.count_bits,
            file_bits: header.file_number_bits,
            line_bits: header.line_number_bits,
            ping_bits: header.ping_number_bits,
            beam_bits: header.beam_number_bits,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pointer_order(&self) -> PointerOrder {
        self.order
    }

    pub fn null_depth(&self) -> f32 {
        self.scales.null_depth
    }

    /// Bytes per bin record
    pub fn bin_size(&self) -> usize {
        self.geometry.bin.record_size
    }

    /// Bytes per physical depth block
    pub fn block_size(&self) -> usize {
        self.geometry.depth.record_size
    }

    /// Soundings per physical depth block
    pub fn record_length(&self) -> usize {
        self.geometry.depth.record_length
    }

    // -------------------------------------------------------------------------
    // Capacity
    // -------------------------------------------------------------------------

    /// Largest sounding count the count field can hold
    pub fn max_count(&self) -> u64 {
        field_max(self.count_bits)
    }

    /// Error if any identifier of `record` does not fit its field
    pub fn check_identifiers(&self, record: &DepthRecord) -> Result<()> {
        let checks = [
            (Identifier::File, record.file_number, self.file_bits),
            (Identifier::Line, record.line_number, self.line_bits),
            (Identifier::Ping, record.ping_number, self.ping_bits),
            (Identifier::Beam, record.beam_number, self.beam_bits),
        ];
        for (field, value, bits) in checks {
            let max = field_max(bits);
            if value as u64 > max {
                return Err(PfmError::IdentifierOverflow {
                    field,
                    value: value as u64,
                    max,
                });
            }
        }
        Ok(())
    }

    pub fn max_file_number(&self) -> u64 {
        field_max(self.file_bits)
    }

    pub fn max_line_number(&self) -> u64 {
        field_max(self.line_bits)
    }

    // =========================================================================
    // Bin Records
    // =========================================================================

    /// Pack `bin` into `buffer` (at least `bin_size()` bytes)
    pub fn encode_bin(&self, buffer: &mut [u8], bin: &BinRecord) {
        let layout = &self.geometry.bin;
        buffer[..layout.record_size].fill(0);

        put(buffer, 0, layout.num_soundings, bin.num_soundings);
        let std = scale_round(bin.standard_dev, self.scales.std_scale, layout.standard_dev.bits);
        put(buffer, 0, layout.standard_dev, std);
        put(buffer, 0, layout.avg_filtered_depth, self.encode_depth(bin.avg_filtered_depth));
        put(buffer, 0, layout.min_filtered_depth, self.encode_depth(bin.min_filtered_depth));
        put(buffer, 0, layout.max_filtered_depth, self.encode_depth(bin.max_filtered_depth));
        put(buffer, 0, layout.avg_depth, self.encode_depth(bin.avg_depth));
        put(buffer, 0, layout.min_depth, self.encode_depth(bin.min_depth));
        put(buffer, 0, layout.max_depth, self.encode_depth(bin.max_depth));

        for ((field, def), value) in layout.attr.iter().zip(&self.scales.bin_attr).zip(&bin.attr) {
            put(buffer, 0, *field, encode_attr(*value, def, field.bits));
        }

        match &layout.flags {
            BinFlags::Word(field) => put(buffer, 0, *field, bin.validity.bits()),
            BinFlags::Legacy {
                checked,
                suspect,
                selected,
                data,
                verified,
            } => {
                let v = bin.validity;
                put(buffer, 0, *checked, v.contains(Validity::CHECKED) as u32);
                put(buffer, 0, *suspect, v.contains(Validity::SUSPECT) as u32);
                put(buffer, 0, *selected, v.contains(Validity::SELECTED) as u32);
                put(buffer, 0, *data, v.contains(Validity::DATA) as u32);
                put(buffer, 0, *verified, v.contains(Validity::VERIFIED) as u32);
            }
        }

        self.put_pointer(buffer, layout.head, bin.head);
        self.put_pointer(buffer, layout.tail, bin.tail);
    }

    /// Unpack the bin record stored in `buffer`
    pub fn decode_bin(&self, buffer: &[u8], coord: BinCoord) -> BinRecord {
        let layout = &self.geometry.bin;
        let mut bin = BinRecord::empty(coord, self.scales.null_depth);

        bin.num_soundings = get(buffer, 0, layout.num_soundings);
        bin.standard_dev = get(buffer, 0, layout.standard_dev) as f32 / self.scales.std_scale;
        bin.avg_filtered_depth = self.decode_depth(get(buffer, 0, layout.avg_filtered_depth));
        bin.min_filtered_depth = self.decode_depth(get(buffer, 0, layout.min_filtered_depth));
        bin.max_filtered_depth = self.decode_depth(get(buffer, 0, layout.max_filtered_depth));
        bin.avg_depth = self.decode_depth(get(buffer, 0, layout.avg_depth));
        bin.min_depth = self.decode_depth(get(buffer, 0, layout.min_depth));
        bin.max_depth = self.decode_depth(get(buffer, 0, layout.max_depth));

        for ((field, def), value) in layout.attr.iter().zip(&self.scales.bin_attr).zip(bin.attr.iter_mut()) {
            *value = decode_attr(get(buffer, 0, *field), def);
        }

        bin.validity = match &layout.flags {
            BinFlags::Word(field) => Validity::from_bits_retain(get(buffer, 0, *field)),
            BinFlags::Legacy {
                checked,
                suspect,
                selected,
                data,
                verified,
            } => {
                let mut v = Validity::empty();
                v.set(Validity::CHECKED, get(buffer, 0, *checked) != 0);
                v.set(Validity::SUSPECT, get(buffer, 0, *suspect) != 0);
                v.set(Validity::SELECTED, get(buffer, 0, *selected) != 0);
                v.set(Validity::DATA, get(buffer, 0, *data) != 0);
                v.set(Validity::VERIFIED, get(buffer, 0, *verified) != 0);
                v
            }
        };

        bin.head = self.get_pointer(buffer, layout.head);
        bin.tail = self.get_pointer(buffer, layout.tail);
        bin
    }

    /// Replace the validity bits selected by `mask` in an encoded bin record
    pub fn merge_bin_validity(&self, buffer: &mut [u8], validity: Validity, mask: Validity) {
        let coord = BinCoord::default();
        let mut current = self.decode_bin(buffer, coord);
        current.validity = (current.validity & !mask) | (validity & mask);
        match &self.geometry.bin.flags {
            BinFlags::Word(field) => put(buffer, 0, *field, current.validity.bits()),
            BinFlags::Legacy { .. } => {
                current.coord = coord;
                self.encode_bin(buffer, &current);
            }
        }
    }

    // =========================================================================
    // Depth Blocks
    // =========================================================================

    /// Pack `record` into slot `slot` of the block in `buffer`
    pub fn encode_sounding(&self, buffer: &mut [u8], slot: usize, record: &DepthRecord) {
        let layout = &self.geometry.depth;
        let base = layout.slot_base(slot);

        put(buffer, base, layout.file_number, record.file_number);
        put(buffer, base, layout.line_number, record.line_number);
        put(buffer, base, layout.ping_number, record.ping_number);
        put(buffer, base, layout.beam_number, record.beam_number);
        put(buffer, base, layout.depth, self.encode_depth(record.xyz.z as f32));

        let center = self.grid.cell_center(record.coord);
        let x_rel = (record.xyz.x - center.x) / self.grid.x_bin_size;
        let y_rel = (record.xyz.y - center.y) / self.grid.y_bin_size;
        put(buffer, base, layout.x_offset, encode_offset(x_rel, layout.x_offset.bits));
        put(buffer, base, layout.y_offset, encode_offset(y_rel, layout.y_offset.bits));

        put(buffer, base, layout.validity, record.validity.bits());

        for ((field, def), value) in layout.attr.iter().zip(&self.scales.ndx_attr).zip(&record.attr) {
            put(buffer, base, *field, encode_attr(*value, def, field.bits));
        }
        if let Some(field) = layout.horizontal_error {
            put(buffer, base, field, encode_error(record.horizontal_error, &self.scales.horizontal_error));
        }
        if let Some(field) = layout.vertical_error {
            put(buffer, base, field, encode_error(record.vertical_error, &self.scales.vertical_error));
        }
    }

    /// Unpack slot `slot` of the block in `buffer`
    pub fn decode_sounding(
        &self,
        buffer: &[u8],
        slot: usize,
        coord: BinCoord,
        address: Option<DepthAddress>,
    ) -> DepthRecord {
        let layout = &self.geometry.depth;
        let base = layout.slot_base(slot);

        let center = self.grid.cell_center(coord);
        let x = center.x + decode_offset(get(buffer, base, layout.x_offset), layout.x_offset.bits) * self.grid.x_bin_size;
        let y = center.y + decode_offset(get(buffer, base, layout.y_offset), layout.y_offset.bits) * self.grid.y_bin_size;
        let z = self.decode_depth(get(buffer, base, layout.depth)) as f64;

        let mut record = DepthRecord::new(Coord3::new(x, y, z)).with_ids(
            get(buffer, base, layout.file_number),
            get(buffer, base, layout.line_number),
            get(buffer, base, layout.ping_number),
            get(buffer, base, layout.beam_number),
        );
        record.coord = coord;
        record.validity = Validity::from_bits_retain(get(buffer, base, layout.validity));
        record.address = address;

        for ((field, def), value) in layout.attr.iter().zip(&self.scales.ndx_attr).zip(record.attr.iter_mut()) {
            *value = decode_attr(get(buffer, base, *field), def);
        }
        record.horizontal_error = layout
            .horizontal_error
            .and_then(|field| decode_error(get(buffer, base, field), field.bits, &self.scales.horizontal_error));
        record.vertical_error = layout
            .vertical_error
            .and_then(|field| decode_error(get(buffer, base, field), field.bits, &self.scales.vertical_error));

        record
    }

    /// Stored (file, ping, beam) of one slot
    pub fn identity(&self, buffer: &[u8], slot: usize) -> (u32, u32, u32) {
        let layout = &self.geometry.depth;
        let base = layout.slot_base(slot);
        (
            get(buffer, base, layout.file_number),
            get(buffer, base, layout.ping_number),
            get(buffer, base, layout.beam_number),
        )
    }

    /// Overwrite only the validity field of one slot
    pub fn set_sounding_validity(&self, buffer: &mut [u8], slot: usize, validity: Validity) {
        let layout = &self.geometry.depth;
        put(buffer, layout.slot_base(slot), layout.validity, validity.bits());
    }

    /// Next block in the chain; `None` at the end
    pub fn continuation(&self, buffer: &[u8]) -> Option<BlockRef> {
        let field = self.geometry.depth.continuation;
        match double_bit_unpack(buffer, field.pos, field.bits, self.order) {
            0 => None,
            offset => Some(BlockRef(offset)),
        }
    }

    pub fn set_continuation(&self, buffer: &mut [u8], next: Option<BlockRef>) {
        let field = self.geometry.depth.continuation;
        let value = next.map_or(0, |block| block.offset());
        double_bit_pack(buffer, field.pos, field.bits, value, self.order);
    }

    // -------------------------------------------------------------------------
    // Scalar helpers
    // -------------------------------------------------------------------------

    fn encode_depth(&self, depth: f32) -> u32 {
        let stored = ((depth + self.scales.depth_offset) * self.scales.depth_scale).round();
        clamp_to_field(stored as f64, self.geometry.depth.depth.bits)
    }

    fn decode_depth(&self, stored: u32) -> f32 {
        stored as f32 / self.scales.depth_scale - self.scales.depth_offset
    }

    fn put_pointer(&self, buffer: &mut [u8], field: FieldPos, block: Option<BlockRef>) {
        let value = block.map_or(pointer_null(field.bits), |b| b.offset());
        double_bit_pack(buffer, field.pos, field.bits, value, self.order);
    }

    fn get_pointer(&self, buffer: &[u8], field: FieldPos) -> Option<BlockRef> {
        let value = double_bit_unpack(buffer, field.pos, field.bits, self.order);
        (value != pointer_null(field.bits)).then_some(BlockRef(value))
    }
}

/// Choose the 64-bit pack order for a structure.
///
/// Writers older than V5.0 stored the low word first unless they were the
/// CUBE-era writer, which is recognizable from its average surface name.
pub fn pointer_order(header: &PfmHeader) -> PointerOrder {
    if header.format_version < FormatVersion::COVERAGE && !header.average_filt_name.starts_with("CUBE") {
        PointerOrder::Legacy
    } else {
        PointerOrder::Modern
    }
}

fn put(buffer: &mut [u8], base: usize, field: FieldPos, value: u32) {
    if field.bits > 0 {
        bit_pack(buffer, field.at(base), field.bits, value);
    }
}

fn get(buffer: &[u8], base: usize, field: FieldPos) -> u32 {
    if field.bits == 0 {
        0
    } else {
        bit_unpack(buffer, field.at(base), field.bits)
    }
}

fn field_max(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn pointer_null(bits: u32) -> u64 {
    field_max(bits)
}

fn clamp_to_field(value: f64, bits: u32) -> u32 {
    let max = field_max(bits.min(32)) as f64;
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, max) as u32
    }
}

fn scale_round(value: f32, scale: f32, bits: u32) -> u32 {
    clamp_to_field((value as f64 * scale as f64).round(), bits)
}

fn encode_attr(value: f32, def: &AttributeDef, bits: u32) -> u32 {
    clamp_to_field(((value - def.min) * def.scale).round() as f64, bits)
}

fn decode_attr(stored: u32, def: &AttributeDef) -> f32 {
    stored as f32 / def.scale + def.min
}

fn encode_error(value: Option<f32>, def: &ErrorDef) -> u32 {
    let null = field_max(def.bits);
    match value {
        Some(v) => clamp_to_field((v * def.scale).round() as f64, def.bits).min((null - 1) as u32),
        None => null as u32,
    }
}

fn decode_error(stored: u32, bits: u32, def: &ErrorDef) -> Option<f32> {
    (stored as u64 != field_max(bits)).then(|| stored as f32 / def.scale)
}

/// `relative` is the offset from the cell center in bin units, in [-0.5, 0.5]
fn encode_offset(relative: f64, bits: u32) -> u32 {
    let steps = field_max(bits) as f64;
    clamp_to_field(((relative + 0.5) * steps).round(), bits)
}

fn decode_offset(stored: u32, bits: u32) -> f64 {
    let steps = field_max(bits) as f64;
    if steps == 0.0 {
        0.0
    } else {
        stored as f64 / steps - 0.5
    }
}
