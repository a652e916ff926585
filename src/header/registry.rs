//! Header key registry
//!
//! A static, ordered table describes every header field: its keyphrase, how
//! its value is typed on the text line, which header field it addresses,
//! whether it repeats, and the newest format version that still uses it.
//! Reading and writing are both driven by this one table.

use std::fmt::Write as _;

use crate::error::{PfmError, Result};
use crate::record::BinCoord;

use super::{Coord2, FormatVersion, PfmHeader, HEADER_SIZE, MAX_POLYGON_POINTS, NUM_ATTR};

/// How a value is written on its header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Str,
    I16,
    I32,
    U32,
    I64,
    /// Single precision with the given number of decimals
    F32(usize),
    /// Double precision with the given number of decimals
    F64(usize),
    /// Double precision written with the shortest text that reads back exactly
    Double,
    /// `x,y` pair with the given number of decimals
    Coord(usize),
    Bool,
}

/// A parsed header value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Coord(f64, f64),
    Bool(bool),
}

impl Kind {
    /// Parse the text after `=`; `None` for malformed input
    pub fn parse(&self, text: &str) -> Option<Value> {
        match self {
            Kind::Str => Some(Value::Str(text.to_string())),
            Kind::I16 => text.parse::<i16>().ok().map(|v| Value::Int(v as i64)),
            Kind::I32 => text.parse::<i32>().ok().map(|v| Value::Int(v as i64)),
            Kind::U32 => text.parse::<u32>().ok().map(|v| Value::Int(v as i64)),
            Kind::I64 => text.parse::<i64>().ok().map(Value::Int),
            Kind::F32(_) | Kind::F64(_) | Kind::Double => text.parse::<f64>().ok().map(Value::Float),
            Kind::Coord(_) => {
                let (x, y) = text.split_once(',')?;
                Some(Value::Coord(x.trim().parse().ok()?, y.trim().parse().ok()?))
            }
            Kind::Bool => match text.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(Value::Bool(true)),
                "0" | "false" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Render a value for its header line
    pub fn format(&self, value: &Value) -> String {
        match (self, value) {
            (Kind::F32(precision) | Kind::F64(precision), Value::Float(v)) => {
                format!("{:.*}", precision, v)
            }
            (Kind::Double, Value::Float(v)) => v.to_string(),
            (Kind::Coord(precision), Value::Coord(x, y)) => {
                format!("{:.*},{:.*}", precision, x, precision, y)
            }
            (_, Value::Str(s)) => s.clone(),
            (_, Value::Int(v)) => v.to_string(),
            (_, Value::Float(v)) => v.to_string(),
            (_, Value::Coord(x, y)) => format!("{},{}", x, y),
            (_, Value::Bool(b)) => (if *b { "1" } else { "0" }).to_string(),
        }
    }
}

impl Value {
    fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_coord(&self) -> Option<(f64, f64)> {
        match self {
            Value::Coord(x, y) => Some((*x, *y)),
            _ => None,
        }
    }
}

// =============================================================================
// Field Addressing
// =============================================================================

/// Header field a key reads into / writes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Version,
    CreationDate,
    LastModifiedDate,
    CreationSoftware,
    Classification,
    DynamicReload,
    Projected,
    Projection,
    ProjectionZone,
    Hemisphere,
    MinY,
    MinX,
    MaxY,
    MaxX,
    BinSizeXy,
    XBinSize,
    YBinSize,
    BinWidth,
    BinHeight,
    ChartScale,
    ClassType,
    MinFilteredDepth,
    MaxFilteredDepth,
    MinFilteredCoord,
    MaxFilteredCoord,
    MinDepth,
    MaxDepth,
    MinCoord,
    MaxCoord,
    MinBinCount,
    MaxBinCount,
    MinCountCoord,
    MaxCountCoord,
    MinStd,
    MaxStd,
    CountBits,
    StdBits,
    StdScale,
    DepthBits,
    DepthScale,
    DepthOffset,
    NullDepth,
    RecordPointerBits,
    FileNumberBits,
    LineNumberBits,
    PingNumberBits,
    BeamNumberBits,
    OffsetBits,
    ValidityBits,
    RecordLength,
    BinAttrName,
    BinAttrMin,
    BinAttrMax,
    BinAttrScale,
    BinAttrBits,
    NdxAttrName,
    NdxAttrMin,
    NdxAttrMax,
    NdxAttrScale,
    NdxAttrBits,
    HorizontalErrorBits,
    HorizontalErrorScale,
    HorizontalErrorMax,
    VerticalErrorBits,
    VerticalErrorScale,
    VerticalErrorMax,
    UserFlagName(usize),
    AverageFiltName,
    AverageName,
    PolygonPoint,
    CoverageMapAddress,
}

/// Repeating field groups and the header counter each one maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    BinAttr,
    NdxAttr,
    Polygon,
}

impl Repeat {
    fn capacity(self) -> usize {
        match self {
            Repeat::BinAttr | Repeat::NdxAttr => NUM_ATTR,
            Repeat::Polygon => MAX_POLYGON_POINTS,
        }
    }

    fn count(self, h: &PfmHeader) -> usize {
        match self {
            Repeat::BinAttr => h.num_bin_attr,
            Repeat::NdxAttr => h.num_ndx_attr,
            Repeat::Polygon => h.polygon.len(),
        }
    }

    fn raise_count(self, h: &mut PfmHeader, count: usize) {
        match self {
            Repeat::BinAttr => h.num_bin_attr = h.num_bin_attr.max(count),
            Repeat::NdxAttr => h.num_ndx_attr = h.num_ndx_attr.max(count),
            // The vertex list length is the count
            Repeat::Polygon => {}
        }
    }
}

/// One row of the key table
#[derive(Debug, Clone, Copy)]
pub struct KeyEntry {
    pub phrase: &'static str,
    pub kind: Kind,
    field: Field,
    repeat: Option<Repeat>,
    counts: bool,
    /// Only used by files at or above this version
    pub min_version: Option<FormatVersion>,
    /// Only used by files at or below this version
    pub max_version: Option<FormatVersion>,
}

impl KeyEntry {
    const fn new(phrase: &'static str, kind: Kind, field: Field) -> Self {
        Self {
            phrase,
            kind,
            field,
            repeat: None,
            counts: false,
            min_version: None,
            max_version: None,
        }
    }

    const fn repeated(self, repeat: Repeat) -> Self {
        Self {
            repeat: Some(repeat),
            ..self
        }
    }

    /// Mark the key whose occurrences advance the group's counter
    const fn counting(self) -> Self {
        Self { counts: true, ..self }
    }

    const fn since(self, version: FormatVersion) -> Self {
        Self {
            min_version: Some(version),
            ..self
        }
    }

    const fn until(self, major: u16, minor: u16) -> Self {
        Self {
            max_version: Some(FormatVersion::new(major, minor)),
            ..self
        }
    }

    /// Whether this key exists in files of the given version
    pub fn applies_to(&self, version: FormatVersion) -> bool {
        self.min_version.map_or(true, |min| version >= min) && self.max_version.map_or(true, |max| version <= max)
    }

    /// Whether this key may appear more than once
    pub fn is_repeating(&self) -> bool {
        self.repeat.is_some()
    }
}

/// Every header key, in emission order
pub static KEYS: &[KeyEntry] = &[
    KeyEntry::new("[VERSION]", Kind::Str, Field::Version),
    KeyEntry::new("[CREATION DATE]", Kind::Str, Field::CreationDate),
    KeyEntry::new("[LAST MODIFIED DATE]", Kind::Str, Field::LastModifiedDate),
    KeyEntry::new("[CREATION SOFTWARE]", Kind::Str, Field::CreationSoftware),
    KeyEntry::new("[CLASSIFICATION]", Kind::Str, Field::Classification),
    KeyEntry::new("[DYNAMIC RELOAD]", Kind::Bool, Field::DynamicReload),
    KeyEntry::new("[PROJECTED]", Kind::Bool, Field::Projected),
    KeyEntry::new("[PROJECTION]", Kind::I32, Field::Projection),
    KeyEntry::new("[PROJECTION ZONE]", Kind::I32, Field::ProjectionZone),
    KeyEntry::new("[HEMISPHERE]", Kind::I16, Field::Hemisphere),
    KeyEntry::new("[MIN Y]", Kind::Double, Field::MinY),
    KeyEntry::new("[MIN X]", Kind::Double, Field::MinX),
    KeyEntry::new("[MAX Y]", Kind::Double, Field::MaxY),
    KeyEntry::new("[MAX X]", Kind::Double, Field::MaxX),
    KeyEntry::new("[BIN SIZE XY]", Kind::F64(2), Field::BinSizeXy),
    KeyEntry::new("[BIN SIZE]", Kind::F64(2), Field::BinSizeXy).until(3, 99),
    KeyEntry::new("[X BIN SIZE]", Kind::Double, Field::XBinSize),
    KeyEntry::new("[Y BIN SIZE]", Kind::Double, Field::YBinSize),
    KeyEntry::new("[BIN WIDTH]", Kind::I32, Field::BinWidth),
    KeyEntry::new("[BIN HEIGHT]", Kind::I32, Field::BinHeight),
    KeyEntry::new("[CHART SCALE]", Kind::F32(1), Field::ChartScale),
    KeyEntry::new("[CLASS TYPE]", Kind::I16, Field::ClassType),
    KeyEntry::new("[MIN FILTERED DEPTH]", Kind::F32(6), Field::MinFilteredDepth),
    KeyEntry::new("[MAX FILTERED DEPTH]", Kind::F32(6), Field::MaxFilteredDepth),
    KeyEntry::new("[MIN FILTERED COORD]", Kind::Coord(0), Field::MinFilteredCoord),
    KeyEntry::new("[MAX FILTERED COORD]", Kind::Coord(0), Field::MaxFilteredCoord),
    KeyEntry::new("[MIN DEPTH]", Kind::F32(6), Field::MinDepth),
    KeyEntry::new("[MAX DEPTH]", Kind::F32(6), Field::MaxDepth),
    KeyEntry::new("[MIN COORD]", Kind::Coord(0), Field::MinCoord),
    KeyEntry::new("[MAX COORD]", Kind::Coord(0), Field::MaxCoord),
    KeyEntry::new("[MIN BIN COUNT]", Kind::I32, Field::MinBinCount),
    KeyEntry::new("[MAX BIN COUNT]", Kind::I32, Field::MaxBinCount),
    KeyEntry::new("[MIN COUNT COORD]", Kind::Coord(0), Field::MinCountCoord),
    KeyEntry::new("[MAX COUNT COORD]", Kind::Coord(0), Field::MaxCountCoord),
    KeyEntry::new("[MIN STANDARD DEVIATION]", Kind::F32(6), Field::MinStd),
    KeyEntry::new("[MAX STANDARD DEVIATION]", Kind::F32(6), Field::MaxStd),
    KeyEntry::new("[COUNT BITS]", Kind::U32, Field::CountBits),
    KeyEntry::new("[STD BITS]", Kind::U32, Field::StdBits),
    KeyEntry::new("[STD SCALE]", Kind::F32(6), Field::StdScale),
    KeyEntry::new("[DEPTH BITS]", Kind::U32, Field::DepthBits),
    KeyEntry::new("[DEPTH SCALE]", Kind::F32(6), Field::DepthScale),
    KeyEntry::new("[DEPTH OFFSET]", Kind::F32(6), Field::DepthOffset),
    KeyEntry::new("[NULL DEPTH]", Kind::F32(6), Field::NullDepth),
    KeyEntry::new("[RECORD POINTER BITS]", Kind::U32, Field::RecordPointerBits),
    KeyEntry::new("[FILE NUMBER BITS]", Kind::U32, Field::FileNumberBits),
    KeyEntry::new("[LINE NUMBER BITS]", Kind::U32, Field::LineNumberBits),
    KeyEntry::new("[PING NUMBER BITS]", Kind::U32, Field::PingNumberBits),
    KeyEntry::new("[BEAM NUMBER BITS]", Kind::U32, Field::BeamNumberBits),
    KeyEntry::new("[OFFSET BITS]", Kind::U32, Field::OffsetBits),
    KeyEntry::new("[VALIDITY BITS]", Kind::U32, Field::ValidityBits),
    KeyEntry::new("[RECORD LENGTH]", Kind::U32, Field::RecordLength),
    KeyEntry::new("[BIN ATTR NAME]", Kind::Str, Field::BinAttrName).repeated(Repeat::BinAttr).counting(),
    KeyEntry::new("[MIN BIN ATTR]", Kind::F32(6), Field::BinAttrMin).repeated(Repeat::BinAttr),
    KeyEntry::new("[MAX BIN ATTR]", Kind::F32(6), Field::BinAttrMax).repeated(Repeat::BinAttr),
    KeyEntry::new("[BIN ATTR SCALE]", Kind::F32(6), Field::BinAttrScale).repeated(Repeat::BinAttr),
    KeyEntry::new("[BIN ATTR BITS]", Kind::U32, Field::BinAttrBits).repeated(Repeat::BinAttr),
    KeyEntry::new("[NDX ATTR NAME]", Kind::Str, Field::NdxAttrName).repeated(Repeat::NdxAttr).counting(),
    KeyEntry::new("[MIN NDX ATTR]", Kind::F32(6), Field::NdxAttrMin).repeated(Repeat::NdxAttr),
    KeyEntry::new("[MAX NDX ATTR]", Kind::F32(6), Field::NdxAttrMax).repeated(Repeat::NdxAttr),
    KeyEntry::new("[NDX ATTR SCALE]", Kind::F32(6), Field::NdxAttrScale).repeated(Repeat::NdxAttr),
    KeyEntry::new("[NDX ATTR BITS]", Kind::U32, Field::NdxAttrBits).repeated(Repeat::NdxAttr),
    KeyEntry::new("[ATTRIBUTE NAME]", Kind::Str, Field::NdxAttrName)
        .repeated(Repeat::NdxAttr)
        .counting()
        .until(4, 99),
    KeyEntry::new("[MIN ATTRIBUTE]", Kind::F32(6), Field::NdxAttrMin).repeated(Repeat::NdxAttr).until(4, 99),
    KeyEntry::new("[MAX ATTRIBUTE]", Kind::F32(6), Field::NdxAttrMax).repeated(Repeat::NdxAttr).until(4, 99),
    KeyEntry::new("[ATTRIBUTE SCALE]", Kind::F32(6), Field::NdxAttrScale).repeated(Repeat::NdxAttr).until(4, 99),
    KeyEntry::new("[ATTRIBUTE BITS]", Kind::U32, Field::NdxAttrBits).repeated(Repeat::NdxAttr).until(4, 99),
    KeyEntry::new("[HORIZONTAL ERROR BITS]", Kind::U32, Field::HorizontalErrorBits),
    KeyEntry::new("[HORIZONTAL ERROR SCALE]", Kind::F32(6), Field::HorizontalErrorScale),
    KeyEntry::new("[MAX HORIZONTAL ERROR]", Kind::F32(6), Field::HorizontalErrorMax),
    KeyEntry::new("[VERTICAL ERROR BITS]", Kind::U32, Field::VerticalErrorBits),
    KeyEntry::new("[VERTICAL ERROR SCALE]", Kind::F32(6), Field::VerticalErrorScale),
    KeyEntry::new("[MAX VERTICAL ERROR]", Kind::F32(6), Field::VerticalErrorMax),
    KeyEntry::new("[USER FLAG 1 NAME]", Kind::Str, Field::UserFlagName(0)),
    KeyEntry::new("[USER FLAG 2 NAME]", Kind::Str, Field::UserFlagName(1)),
    KeyEntry::new("[USER FLAG 3 NAME]", Kind::Str, Field::UserFlagName(2)),
    KeyEntry::new("[USER FLAG 4 NAME]", Kind::Str, Field::UserFlagName(3)),
    KeyEntry::new("[USER FLAG 5 NAME]", Kind::Str, Field::UserFlagName(4)),
    KeyEntry::new("[AVERAGE FILTERED NAME]", Kind::Str, Field::AverageFiltName),
    KeyEntry::new("[AVERAGE SURFACE NAME]", Kind::Str, Field::AverageFiltName).until(4, 99),
    KeyEntry::new("[AVERAGE NAME]", Kind::Str, Field::AverageName),
    KeyEntry::new("[POLYGON POINT]", Kind::Coord(11), Field::PolygonPoint)
        .repeated(Repeat::Polygon)
        .counting(),
    KeyEntry::new("[COVERAGE MAP ADDRESS]", Kind::I64, Field::CoverageMapAddress).since(FormatVersion::COVERAGE),
];

// =============================================================================
// Read / Write
// =============================================================================

/// Parse a header block.
///
/// The `[VERSION]` line is located first because it decides which keys are
/// recognized. Lines that match no applicable key, or whose value does not
/// parse, are skipped.
pub fn read_header(block: &[u8]) -> Result<PfmHeader> {
    let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    let text = String::from_utf8_lossy(&block[..end]);

    let banner = text
        .lines()
        .filter_map(split_line)
        .find(|(key, _)| key.contains("[VERSION]"))
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| PfmError::CorruptHeader("Missing [VERSION] key".to_string()))?;

    let version = FormatVersion::from_banner(&banner)
        .ok_or_else(|| PfmError::CorruptHeader(format!("Unrecognized version banner: {}", banner)))?;

    if version > FormatVersion::CURRENT {
        return Err(PfmError::NewerVersion {
            found: version,
            supported: FormatVersion::CURRENT,
        });
    }

    let mut header = PfmHeader {
        version: banner,
        format_version: version,
        ..Default::default()
    };

    // Occurrence counter per key, so every repeating key fills its own run
    let mut occurrences = vec![0usize; KEYS.len()];

    for (key, value) in text.lines().filter_map(split_line) {
        let Some((index, entry)) = KEYS
            .iter()
            .enumerate()
            .find(|(_, e)| e.applies_to(version) && key.contains(e.phrase))
        else {
            tracing::trace!("Skipping unknown header line: {}", key);
            continue;
        };

        let Some(repeat) = entry.repeat else {
            match entry.kind.parse(value) {
                Some(v) => assign(&mut header, entry.field, 0, &v),
                None => tracing::warn!("Skipping malformed header value for {}: {:?}", entry.phrase, value),
            }
            continue;
        };

        // Blank placeholders keep zero-count groups discoverable; they carry no data
        if value.is_empty() {
            continue;
        }

        let slot = occurrences[index];
        if slot >= repeat.capacity() {
            tracing::warn!("Ignoring {} beyond capacity {}", entry.phrase, repeat.capacity());
            continue;
        }

        match entry.kind.parse(value) {
            Some(v) => {
                assign(&mut header, entry.field, slot, &v);
                occurrences[index] += 1;
                if entry.counts {
                    repeat.raise_count(&mut header, occurrences[index]);
                }
            }
            None => tracing::warn!("Skipping malformed header value for {}: {:?}", entry.phrase, value),
        }
    }

    Ok(header)
}

/// Render a header into a NUL padded block of [`HEADER_SIZE`] bytes.
pub fn write_header(header: &PfmHeader) -> Result<Vec<u8>> {
    if header.polygon.len() > MAX_POLYGON_POINTS {
        return Err(PfmError::TooManyPolygonPoints {
            count: header.polygon.len(),
            max: MAX_POLYGON_POINTS,
        });
    }

    let mut text = String::new();

    for entry in KEYS.iter().filter(|e| e.applies_to(header.format_version)) {
        match entry.repeat {
            None => {
                let value = fetch(header, entry.field, 0);
                let _ = writeln!(text, "{} = {}", entry.phrase, entry.kind.format(&value));
            }
            Some(repeat) => {
                let count = repeat.count(header);
                if count == 0 {
                    let _ = writeln!(text, "{} = ", entry.phrase);
                }
                for slot in 0..count {
                    let value = fetch(header, entry.field, slot);
                    let _ = writeln!(text, "{} = {}", entry.phrase, entry.kind.format(&value));
                }
            }
        }
    }
    text.push('\n');

    if text.len() > HEADER_SIZE {
        return Err(PfmError::CorruptHeader(format!(
            "Header text is {} bytes, block holds {}",
            text.len(),
            HEADER_SIZE
        )));
    }

    let mut block = vec![0u8; HEADER_SIZE];
    block[..text.len()].copy_from_slice(text.as_bytes());
    Ok(block)
}

// =============================================================================
// Private Helpers
// =============================================================================

fn split_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn coord_value(c: BinCoord) -> Value {
    Value::Coord(c.x as f64, c.y as f64)
}

fn fetch(h: &PfmHeader, field: Field, slot: usize) -> Value {
    let s = |v: &str| Value::Str(v.to_string());
    let f = |v: f32| Value::Float(v as f64);
    let i = |v: i64| Value::Int(v);

    match field {
        Field::Version => s(&h.version),
        Field::CreationDate => s(&h.creation_date),
        Field::LastModifiedDate => s(&h.last_modified_date),
        Field::CreationSoftware => s(&h.creation_software),
        Field::Classification => s(&h.classification),
        Field::DynamicReload => Value::Bool(h.dynamic_reload),
        Field::Projected => Value::Bool(h.projected),
        Field::Projection => i(h.projection as i64),
        Field::ProjectionZone => i(h.projection_zone as i64),
        Field::Hemisphere => i(h.hemisphere as i64),
        Field::MinY => Value::Float(h.mbr.min_y),
        Field::MinX => Value::Float(h.mbr.min_x),
        Field::MaxY => Value::Float(h.mbr.max_y),
        Field::MaxX => Value::Float(h.mbr.max_x),
        Field::BinSizeXy => Value::Float(h.bin_size_xy),
        Field::XBinSize => Value::Float(h.x_bin_size),
        Field::YBinSize => Value::Float(h.y_bin_size),
        Field::BinWidth => i(h.bin_width as i64),
        Field::BinHeight => i(h.bin_height as i64),
        Field::ChartScale => f(h.chart_scale),
        Field::ClassType => i(h.class_type as i64),
        Field::MinFilteredDepth => f(h.min_filtered_depth),
        Field::MaxFilteredDepth => f(h.max_filtered_depth),
        Field::MinFilteredCoord => coord_value(h.min_filtered_coord),
        Field::MaxFilteredCoord => coord_value(h.max_filtered_coord),
        Field::MinDepth => f(h.min_depth),
        Field::MaxDepth => f(h.max_depth),
        Field::MinCoord => coord_value(h.min_coord),
        Field::MaxCoord => coord_value(h.max_coord),
        Field::MinBinCount => i(h.min_bin_count as i64),
        Field::MaxBinCount => i(h.max_bin_count as i64),
        Field::MinCountCoord => coord_value(h.min_count_coord),
        Field::MaxCountCoord => coord_value(h.max_count_coord),
        Field::MinStd => f(h.min_standard_dev),
        Field::MaxStd => f(h.max_standard_dev),
        Field::CountBits => i(h.count_bits as i64),
        Field::StdBits => i(h.std_bits as i64),
        Field::StdScale => f(h.std_scale),
        Field::DepthBits => i(h.depth_bits as i64),
        Field::DepthScale => f(h.depth_scale),
        Field::DepthOffset => f(h.depth_offset),
        Field::NullDepth => f(h.null_depth),
        Field::RecordPointerBits => i(h.record_pointer_bits as i64),
        Field::FileNumberBits => i(h.file_number_bits as i64),
        Field::LineNumberBits => i(h.line_number_bits as i64),
        Field::PingNumberBits => i(h.ping_number_bits as i64),
        Field::BeamNumberBits => i(h.beam_number_bits as i64),
        Field::OffsetBits => i(h.offset_bits as i64),
        Field::ValidityBits => i(h.validity_bits as i64),
        Field::RecordLength => i(h.record_length as i64),
        Field::BinAttrName => s(&h.bin_attr[slot].name),
        Field::BinAttrMin => f(h.bin_attr[slot].min),
        Field::BinAttrMax => f(h.bin_attr[slot].max),
        Field::BinAttrScale => f(h.bin_attr[slot].scale),
        Field::BinAttrBits => i(h.bin_attr[slot].bits as i64),
        Field::NdxAttrName => s(&h.ndx_attr[slot].name),
        Field::NdxAttrMin => f(h.ndx_attr[slot].min),
        Field::NdxAttrMax => f(h.ndx_attr[slot].max),
        Field::NdxAttrScale => f(h.ndx_attr[slot].scale),
        Field::NdxAttrBits => i(h.ndx_attr[slot].bits as i64),
        Field::HorizontalErrorBits => i(h.horizontal_error.bits as i64),
        Field::HorizontalErrorScale => f(h.horizontal_error.scale),
        Field::HorizontalErrorMax => f(h.horizontal_error.max),
        Field::VerticalErrorBits => i(h.vertical_error.bits as i64),
        Field::VerticalErrorScale => f(h.vertical_error.scale),
        Field::VerticalErrorMax => f(h.vertical_error.max),
        Field::UserFlagName(n) => s(&h.user_flag_name[n]),
        Field::AverageFiltName => s(&h.average_filt_name),
        Field::AverageName => s(&h.average_name),
        Field::PolygonPoint => {
            let p = h.polygon[slot];
            Value::Coord(p.x, p.y)
        }
        Field::CoverageMapAddress => i(h.coverage_map_address),
    }
}

fn assign(h: &mut PfmHeader, field: Field, slot: usize, value: &Value) {
    let text = || value.as_str().map(str::to_string).unwrap_or_default();
    let float = || value.as_f64().unwrap_or_default();
    let single = || value.as_f64().unwrap_or_default() as f32;
    let int = || value.as_i64().unwrap_or_default();
    let bits = || value.as_i64().unwrap_or_default().max(0) as u32;
    let coord = || {
        value
            .as_coord()
            .map(|(x, y)| BinCoord::new(x as i32, y as i32))
            .unwrap_or_default()
    };

    match field {
        Field::Version => h.version = text(),
        Field::CreationDate => h.creation_date = text(),
        Field::LastModifiedDate => h.last_modified_date = text(),
        Field::CreationSoftware => h.creation_software = text(),
        Field::Classification => h.classification = text(),
        Field::DynamicReload => h.dynamic_reload = value.as_bool().unwrap_or_default(),
        Field::Projected => h.projected = value.as_bool().unwrap_or_default(),
        Field::Projection => h.projection = int() as i32,
        Field::ProjectionZone => h.projection_zone = int() as i32,
        Field::Hemisphere => h.hemisphere = int() as i32,
        Field::MinY => h.mbr.min_y = float(),
        Field::MinX => h.mbr.min_x = float(),
        Field::MaxY => h.mbr.max_y = float(),
        Field::MaxX => h.mbr.max_x = float(),
        Field::BinSizeXy => h.bin_size_xy = float(),
        Field::XBinSize => h.x_bin_size = float(),
        Field::YBinSize => h.y_bin_size = float(),
        Field::BinWidth => h.bin_width = int() as i32,
        Field::BinHeight => h.bin_height = int() as i32,
        Field::ChartScale => h.chart_scale = single(),
        Field::ClassType => h.class_type = int() as i32,
        Field::MinFilteredDepth => h.min_filtered_depth = single(),
        Field::MaxFilteredDepth => h.max_filtered_depth = single(),
        Field::MinFilteredCoord => h.min_filtered_coord = coord(),
        Field::MaxFilteredCoord => h.max_filtered_coord = coord(),
        Field::MinDepth => h.min_depth = single(),
        Field::MaxDepth => h.max_depth = single(),
        Field::MinCoord => h.min_coord = coord(),
        Field::MaxCoord => h.max_coord = coord(),
        Field::MinBinCount => h.min_bin_count = int() as i32,
        Field::MaxBinCount => h.max_bin_count = int() as i32,
        Field::MinCountCoord => h.min_count_coord = coord(),
        Field::MaxCountCoord => h.max_count_coord = coord(),
        Field::MinStd => h.min_standard_dev = single(),
        Field::MaxStd => h.max_standard_dev = single(),
        Field::CountBits => h.count_bits = bits(),
        Field::StdBits => h.std_bits = bits(),
        Field::StdScale => h.std_scale = single(),
        Field::DepthBits => h.depth_bits = bits(),
        Field::DepthScale => h.depth_scale = single(),
        Field::DepthOffset => h.depth_offset = single(),
        Field::NullDepth => h.null_depth = single(),
        Field::RecordPointerBits => h.record_pointer_bits = bits(),
        Field::FileNumberBits => h.file_number_bits = bits(),
        Field::LineNumberBits => h.line_number_bits = bits(),
        Field::PingNumberBits => h.ping_number_bits = bits(),
        Field::BeamNumberBits => h.beam_number_bits = bits(),
        Field::OffsetBits => h.offset_bits = bits(),
        Field::ValidityBits => h.validity_bits = bits(),
        Field::RecordLength => h.record_length = bits(),
        Field::BinAttrName => h.bin_attr[slot].name = text(),
        Field::BinAttrMin => h.bin_attr[slot].min = single(),
        Field::BinAttrMax => h.bin_attr[slot].max = single(),
        Field::BinAttrScale => h.bin_attr[slot].scale = single(),
        Field::BinAttrBits => h.bin_attr[slot].bits = bits(),
        Field::NdxAttrName => h.ndx_attr[slot].name = text(),
        Field::NdxAttrMin => h.ndx_attr[slot].min = single(),
        Field::NdxAttrMax => h.ndx_attr[slot].max = single(),
        Field::NdxAttrScale => h.ndx_attr[slot].scale = single(),
        Field::NdxAttrBits => h.ndx_attr[slot].bits = bits(),
        Field::HorizontalErrorBits => h.horizontal_error.bits = bits(),
        Field::HorizontalErrorScale => h.horizontal_error.scale = single(),
        Field::HorizontalErrorMax => h.horizontal_error.max = single(),
        Field::VerticalErrorBits => h.vertical_error.bits = bits(),
        Field::VerticalErrorScale => h.vertical_error.scale = single(),
        Field::VerticalErrorMax => h.vertical_error.max = single(),
        Field::UserFlagName(n) => h.user_flag_name[n] = text(),
        Field::AverageFiltName => h.average_filt_name = text(),
        Field::AverageName => h.average_name = text(),
        Field::PolygonPoint => {
            if let Some((x, y)) = value.as_coord() {
                let point = Coord2::new(x, y);
                if slot < h.polygon.len() {
                    h.polygon[slot] = point;
                } else if slot == h.polygon.len() {
                    h.polygon.push(point);
                }
            }
        }
        Field::CoverageMapAddress => h.coverage_map_address = int(),
    }
}
