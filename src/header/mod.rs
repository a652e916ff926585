//! Header Module
//!
//! The self-describing ASCII header at the start of every bin file.
//!
//! ## Block Format
//! ```text
//! ┌────────────────────────────────────────────┐ offset 0
//! │ [VERSION] = PFM Software - PFM library V6.30│
//! │ [CREATION DATE] = ...                       │
//! │ [BIN WIDTH] = 400                           │
//! │ ... one `[KEY] = value` line per field ...  │
//! │ (blank line)                                │
//! │ NUL padding                                 │
//! └────────────────────────────────────────────┘ offset 16384
//! ```
//!
//! The header records every parameter the record geometry is derived from,
//! so a structure can always be reopened without external configuration.

mod registry;
mod version;

use crate::config::CreateParams;
use crate::error::{PfmError, Result};
use crate::geometry::{bits_needed, BitWidths};
use crate::record::BinCoord;

pub use registry::{read_header, write_header, Kind, KeyEntry, Value, KEYS};
pub use version::FormatVersion;

/// Size of the header block at the start of the bin file
pub const HEADER_SIZE: usize = 16384;

/// Maximum number of bin attributes and of sounding attributes
pub const NUM_ATTR: usize = 10;

/// Number of user-definable validity flags
pub const NUM_USER_FLAGS: usize = 5;

/// Maximum number of polygon vertices kept in the header
pub const MAX_POLYGON_POINTS: usize = 200;

/// Two-component coordinate (lon/lat or projected x/y)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord2 {
    pub x: f64,
    pub y: f64,
}

impl Coord2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding rectangle of the structure
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mbr {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Mbr {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }
}

/// A named, scaled floating point attribute
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeDef {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub scale: f32,
    pub bits: u32,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, min: f32, max: f32, scale: f32) -> Self {
        Self { name: name.into(), min, max, scale, bits: 0 }
    }
}

/// Scaling for an optional per-sounding uncertainty value. `bits == 0`
/// means the field is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorDef {
    pub max: f32,
    pub scale: f32,
    pub bits: u32,
}

impl ErrorDef {
    pub fn new(max: f32, scale: f32) -> Self {
        Self { max, scale, bits: 0 }
    }

    pub fn enabled(&self) -> bool {
        self.bits > 0
    }
}

/// Decoded bin file header
#[derive(Debug, Clone, PartialEq)]
pub struct PfmHeader {
    /// Library banner; `format_version` is derived from it
    pub version: String,
    pub format_version: FormatVersion,
    pub creation_date: String,
    pub last_modified_date: String,
    pub creation_software: String,
    pub classification: String,
    pub dynamic_reload: bool,

    // -------------------------------------------------------------------------
    // Area and grid
    // -------------------------------------------------------------------------
    pub projected: bool,
    pub projection: i32,
    pub projection_zone: i32,
    pub hemisphere: i32,
    pub mbr: Mbr,
    /// Nominal bin size in linear units
    pub bin_size_xy: f64,
    /// Bin size along x in mbr units (degrees when geographic)
    pub x_bin_size: f64,
    /// Bin size along y in mbr units
    pub y_bin_size: f64,
    pub bin_width: i32,
    pub bin_height: i32,
    pub chart_scale: f32,
    pub class_type: i32,
    pub polygon: Vec<Coord2>,

    // -------------------------------------------------------------------------
    // Summary statistics
    // -------------------------------------------------------------------------
    pub min_filtered_depth: f32,
    pub max_filtered_depth: f32,
    pub min_filtered_coord: BinCoord,
    pub max_filtered_coord: BinCoord,
    pub min_depth: f32,
    pub max_depth: f32,
    pub min_coord: BinCoord,
    pub max_coord: BinCoord,
    pub min_bin_count: i32,
    pub max_bin_count: i32,
    pub min_count_coord: BinCoord,
    pub max_count_coord: BinCoord,
    pub min_standard_dev: f32,
    pub max_standard_dev: f32,

    // -------------------------------------------------------------------------
    // Field widths and scales
    // -------------------------------------------------------------------------
    pub count_bits: u32,
    pub std_bits: u32,
    pub std_scale: f32,
    pub depth_bits: u32,
    pub depth_scale: f32,
    pub depth_offset: f32,
    pub null_depth: f32,
    pub record_pointer_bits: u32,
    pub file_number_bits: u32,
    pub line_number_bits: u32,
    pub ping_number_bits: u32,
    pub beam_number_bits: u32,
    pub offset_bits: u32,
    pub validity_bits: u32,
    /// Soundings per physical depth block
    pub record_length: u32,

    pub num_bin_attr: usize,
    pub bin_attr: [AttributeDef; NUM_ATTR],
    pub num_ndx_attr: usize,
    pub ndx_attr: [AttributeDef; NUM_ATTR],
    pub horizontal_error: ErrorDef,
    pub vertical_error: ErrorDef,

    pub user_flag_name: [String; NUM_USER_FLAGS],
    pub average_filt_name: String,
    pub average_name: String,

    /// Byte offset of the coverage map in the bin file, 0 when absent
    pub coverage_map_address: i64,
}

impl Default for PfmHeader {
    fn default() -> Self {
        Self {
            version: FormatVersion::CURRENT.banner(),
            format_version: FormatVersion::CURRENT,
            creation_date: String::new(),
            last_modified_date: String::new(),
            creation_software: String::new(),
            classification: String::new(),
            dynamic_reload: false,
            projected: false,
            projection: 0,
            projection_zone: 0,
            hemisphere: 0,
            mbr: Mbr::default(),
            bin_size_xy: 0.0,
            x_bin_size: 0.0,
            y_bin_size: 0.0,
            bin_width: 0,
            bin_height: 0,
            chart_scale: 0.0,
            class_type: 0,
            polygon: Vec::new(),
            min_filtered_depth: 0.0,
            max_filtered_depth: 0.0,
            min_filtered_coord: BinCoord::default(),
            max_filtered_coord: BinCoord::default(),
            min_depth: 0.0,
            max_depth: 0.0,
            min_coord: BinCoord::default(),
            max_coord: BinCoord::default(),
            min_bin_count: 0,
            max_bin_count: 0,
            min_count_coord: BinCoord::default(),
            max_count_coord: BinCoord::default(),
            min_standard_dev: 0.0,
            max_standard_dev: 0.0,
            count_bits: 0,
            std_bits: 0,
            std_scale: 0.0,
            depth_bits: 0,
            depth_scale: 0.0,
            depth_offset: 0.0,
            null_depth: 0.0,
            record_pointer_bits: 0,
            file_number_bits: 0,
            line_number_bits: 0,
            ping_number_bits: 0,
            beam_number_bits: 0,
            offset_bits: 0,
            validity_bits: 0,
            record_length: 0,
            num_bin_attr: 0,
            bin_attr: Default::default(),
            num_ndx_attr: 0,
            ndx_attr: Default::default(),
            horizontal_error: ErrorDef::default(),
            vertical_error: ErrorDef::default(),
            user_flag_name: Default::default(),
            average_filt_name: String::new(),
            average_name: String::new(),
            coverage_map_address: 0,
        }
    }
}

impl PfmHeader {
    /// Build the header of a new structure from creation parameters and the
    /// resolved default/override bit widths.
    ///
    /// The bounding rectangle is snapped outward to a whole number of bins.
    pub fn from_params(params: &CreateParams, widths: &BitWidths) -> Result<Self> {
        params.validate()?;
        widths.validate()?;

        let mbr = params.mbr;
        let bin_width = ((mbr.max_x - mbr.min_x) / params.x_bin_size).ceil() as i32;
        let bin_height = ((mbr.max_y - mbr.min_y) / params.y_bin_size).ceil() as i32;

        let mut header = PfmHeader {
            creation_software: params.creation_software.clone(),
            classification: params.classification.clone(),
            projected: params.projected,
            mbr: Mbr {
                min_x: mbr.min_x,
                min_y: mbr.min_y,
                max_x: mbr.min_x + bin_width as f64 * params.x_bin_size,
                max_y: mbr.min_y + bin_height as f64 * params.y_bin_size,
            },
            bin_size_xy: params.bin_size_xy,
            x_bin_size: params.x_bin_size,
            y_bin_size: params.y_bin_size,
            bin_width,
            bin_height,
            chart_scale: params.chart_scale,
            user_flag_name: params.user_flag_names.clone(),
            average_filt_name: params.average_filt_name.clone(),
            average_name: params.average_name.clone(),
            ..Default::default()
        };

        header.polygon = if params.polygon.is_empty() {
            let m = header.mbr;
            vec![
                Coord2::new(m.min_x, m.min_y),
                Coord2::new(m.min_x, m.max_y),
                Coord2::new(m.max_x, m.max_y),
                Coord2::new(m.max_x, m.min_y),
            ]
        } else {
            params.polygon.clone()
        };

        // Widths taken straight from configuration
        header.count_bits = widths.count_bits;
        header.std_bits = widths.std_bits;
        header.std_scale = widths.std_scale;
        header.record_pointer_bits = widths.record_pointer_bits;
        header.offset_bits = widths.offset_bits;
        header.validity_bits = widths.validity_bits;
        header.record_length = widths.record_length;

        // Widths computed from caller ranges
        header.depth_scale = params.depth_scale;
        header.depth_offset = -params.min_depth;
        header.null_depth = params.max_depth + 1.0;
        header.depth_bits =
            bits_needed(((header.null_depth + header.depth_offset) * header.depth_scale).round() as u64);

        header.file_number_bits = bits_needed(params.max_input_files as u64);
        header.line_number_bits = bits_needed(params.max_input_lines as u64);
        header.ping_number_bits = bits_needed(params.max_input_pings as u64);
        header.beam_number_bits = bits_needed(params.max_input_beams as u64);

        header.num_bin_attr = params.bin_attributes.len();
        for (slot, def) in header.bin_attr.iter_mut().zip(&params.bin_attributes) {
            *slot = sized_attribute(def);
        }
        header.num_ndx_attr = params.ndx_attributes.len();
        for (slot, def) in header.ndx_attr.iter_mut().zip(&params.ndx_attributes) {
            *slot = sized_attribute(def);
        }

        if let Some(def) = params.horizontal_error {
            header.horizontal_error = sized_error(def);
        }
        if let Some(def) = params.vertical_error {
            header.vertical_error = sized_error(def);
        }

        header.min_filtered_depth = header.null_depth;
        header.max_filtered_depth = header.null_depth;
        header.min_depth = header.null_depth;
        header.max_depth = header.null_depth;

        Ok(header)
    }

    /// Number of cells in the grid
    pub fn cell_count(&self) -> u64 {
        self.bin_width.max(0) as u64 * self.bin_height.max(0) as u64
    }

    /// Whether this file carries a coverage map
    pub fn has_coverage_map(&self) -> bool {
        self.format_version >= FormatVersion::COVERAGE && self.coverage_map_address > 0
    }

    /// Sanity checks applied after parsing a header block
    pub fn validate(&self) -> Result<()> {
        if self.bin_width <= 0 || self.bin_height <= 0 {
            return Err(PfmError::CorruptHeader(format!(
                "Invalid grid dimensions {}x{}",
                self.bin_width, self.bin_height
            )));
        }
        if self.record_length == 0 {
            return Err(PfmError::CorruptHeader("Record length is zero".to_string()));
        }
        if self.count_bits == 0 || self.count_bits > 32 || self.record_pointer_bits > 64 {
            return Err(PfmError::CorruptHeader(format!(
                "Unsupported field widths: count {} pointer {}",
                self.count_bits, self.record_pointer_bits
            )));
        }
        if self.depth_scale <= 0.0 || self.x_bin_size <= 0.0 || self.y_bin_size <= 0.0 {
            return Err(PfmError::CorruptHeader("Non-positive scale or bin size".to_string()));
        }
        if self.num_bin_attr > NUM_ATTR || self.num_ndx_attr > NUM_ATTR {
            return Err(PfmError::CorruptHeader("Too many attributes".to_string()));
        }
        let narrow = [
            self.std_bits,
            self.depth_bits,
            self.file_number_bits,
            self.line_number_bits,
            self.ping_number_bits,
            self.beam_number_bits,
            self.offset_bits,
            self.validity_bits,
            self.horizontal_error.bits,
            self.vertical_error.bits,
        ];
        let mut attrs = self.bin_attr[..self.num_bin_attr]
            .iter()
            .chain(&self.ndx_attr[..self.num_ndx_attr]);
        if narrow.iter().any(|bits| *bits > 32) || attrs.any(|a| a.bits > 32 || a.scale <= 0.0) {
            return Err(PfmError::CorruptHeader("Field wider than 32 bits or bad attribute scale".to_string()));
        }
        for def in [&self.horizontal_error, &self.vertical_error] {
            if def.enabled() && def.scale <= 0.0 {
                return Err(PfmError::CorruptHeader("Non-positive error scale".to_string()));
            }
        }
        Ok(())
    }
}

fn sized_attribute(def: &AttributeDef) -> AttributeDef {
    let range = ((def.max - def.min) * def.scale).round().max(0.0) as u64;
    AttributeDef {
        bits: bits_needed(range),
        ..def.clone()
    }
}

fn sized_error(def: ErrorDef) -> ErrorDef {
    // One extra code point so the all-ones null never collides with a value
    let range = (def.max * def.scale).round().max(0.0) as u64 + 1;
    ErrorDef {
        bits: bits_needed(range),
        ..def
    }
}
