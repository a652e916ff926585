//! Tests for record geometry
//!
//! These tests verify:
//! - Field widths derived from creation ranges
//! - Bin record and depth block layouts for current and legacy versions
//! - Bit width override files
//! - Grid addressing

use std::fs;

use pfm::geometry::{bits_needed, BinFlags, BitWidths, Geometry, Grid};
use pfm::header::{AttributeDef, ErrorDef, FormatVersion, Mbr, PfmHeader};
use pfm::{BinCoord, CreateParams, PfmError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn default_header() -> PfmHeader {
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 4.0, 4.0), 1.0, 1.0);
    PfmHeader::from_params(&params, &BitWidths::default()).unwrap()
}

// =============================================================================
// Width Derivation Tests
// =============================================================================

#[test]
fn test_bits_needed() {
    assert_eq!(bits_needed(0), 1);
    assert_eq!(bits_needed(1), 1);
    assert_eq!(bits_needed(2), 2);
    assert_eq!(bits_needed(255), 8);
    assert_eq!(bits_needed(256), 9);
    assert_eq!(bits_needed(u64::MAX), 64);
}

#[test]
fn test_widths_from_ranges() {
    let header = default_header();
    // (12000 + 1 + 100) * 100 = 1_210_100 needs 21 bits
    assert_eq!(header.depth_offset, 100.0);
    assert_eq!(header.null_depth, 12001.0);
    assert_eq!(header.depth_bits, 21);
    assert_eq!(header.file_number_bits, 13);
    assert_eq!(header.line_number_bits, 16);
    assert_eq!(header.ping_number_bits, 24);
    assert_eq!(header.beam_number_bits, 10);
}

#[test]
fn test_grid_snapped_to_whole_bins() {
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 10.2, 5.0), 1.0, 2.0);
    let header = PfmHeader::from_params(&params, &BitWidths::default()).unwrap();
    assert_eq!(header.bin_width, 11);
    assert_eq!(header.bin_height, 3);
    assert_eq!(header.mbr.max_x, 11.0);
    assert_eq!(header.mbr.max_y, 6.0);
}

#[test]
fn test_attribute_and_error_widths() {
    let mut params = CreateParams::new(Mbr::new(0.0, 0.0, 1.0, 1.0), 0.5, 0.5);
    params.ndx_attributes = vec![AttributeDef::new("Angle", -90.0, 90.0, 10.0)];
    params.horizontal_error = Some(ErrorDef::new(10.0, 100.0));
    let header = PfmHeader::from_params(&params, &BitWidths::default()).unwrap();

    // 180 * 10 = 1800 needs 11 bits
    assert_eq!(header.ndx_attr[0].bits, 11);
    // 10 * 100 + 1 = 1001 needs 10 bits
    assert_eq!(header.horizontal_error.bits, 10);
    assert!(!header.vertical_error.enabled());
}

#[test]
fn test_invalid_params_rejected() {
    let params = CreateParams::new(Mbr::new(1.0, 0.0, 0.0, 1.0), 0.5, 0.5);
    assert!(matches!(
        PfmHeader::from_params(&params, &BitWidths::default()),
        Err(PfmError::InvalidParams(_))
    ));

    let params = CreateParams::new(Mbr::new(0.0, 0.0, 1.0, 1.0), 0.5, 0.5).depth_range(10.0, 5.0, 100.0);
    assert!(matches!(
        PfmHeader::from_params(&params, &BitWidths::default()),
        Err(PfmError::InvalidParams(_))
    ));

    let mut params = CreateParams::new(Mbr::new(0.0, 0.0, 1.0, 1.0), 0.5, 0.5);
    params.ndx_attributes = (0..11).map(|i| AttributeDef::new(format!("a{}", i), 0.0, 1.0, 1.0)).collect();
    assert!(matches!(
        PfmHeader::from_params(&params, &BitWidths::default()),
        Err(PfmError::TooManyAttributes { count: 11, .. })
    ));
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_default_bin_layout() {
    let geometry = Geometry::compute(&default_header());
    let bin = &geometry.bin;

    assert_eq!(bin.num_soundings.pos, 0);
    assert_eq!(bin.num_soundings.bits, 20);
    assert_eq!(bin.standard_dev.pos, 20);
    assert_eq!(bin.avg_filtered_depth.pos, 36);
    assert_eq!(bin.max_depth.pos, 36 + 5 * 21);
    assert!(bin.attr.is_empty());
    assert_eq!(bin.flags, BinFlags::Word(pfm::geometry::FieldPos { pos: 162, bits: 16 }));
    assert_eq!(bin.head.pos, 178);
    assert_eq!(bin.tail.pos, 218);
    // 258 bits
    assert_eq!(bin.record_size, 33);
}

#[test]
fn test_default_depth_layout() {
    let geometry = Geometry::compute(&default_header());
    let depth = &geometry.depth;

    // 13 + 16 + 24 + 10 + 21 + 16 + 16 + 16
    assert_eq!(depth.sounding_bits, 132);
    assert_eq!(depth.record_length, 6);
    assert_eq!(depth.slot_base(2), 264);
    assert_eq!(depth.continuation.pos, 792);
    assert_eq!(depth.continuation.bits, 40);
    assert_eq!(depth.record_size, 104);
    assert!(depth.horizontal_error.is_none());
}

#[test]
fn test_legacy_bin_layout_uses_flag_bits() {
    let mut header = default_header();
    header.format_version = FormatVersion::new(3, 0);
    let geometry = Geometry::compute(&header);

    match &geometry.bin.flags {
        BinFlags::Legacy { checked, verified, .. } => {
            assert_eq!(checked.pos, 162);
            assert_eq!(checked.bits, 1);
            assert_eq!(verified.pos, 166);
        }
        other => panic!("expected legacy flags, got {:?}", other),
    }
    assert_eq!(geometry.bin.head.pos, 167);
}

#[test]
fn test_error_fields_only_from_coverage_version() {
    let mut params = CreateParams::new(Mbr::new(0.0, 0.0, 1.0, 1.0), 0.5, 0.5);
    params.vertical_error = Some(ErrorDef::new(10.0, 100.0));
    let mut header = PfmHeader::from_params(&params, &BitWidths::default()).unwrap();

    let current = Geometry::compute(&header);
    assert!(current.depth.vertical_error.is_some());
    assert_eq!(current.depth.sounding_bits, 132 + 10);

    header.format_version = FormatVersion::new(4, 70);
    let legacy = Geometry::compute(&header);
    assert!(legacy.depth.vertical_error.is_none());
    assert_eq!(legacy.depth.sounding_bits, 132);
}

// =============================================================================
// Override File Tests
// =============================================================================

#[test]
fn test_bit_width_overrides() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pfm.cfg");
    fs::write(
        &path,
        "# small test structure\ncount_bits = 3\nrecord_length = 2 # two per block\nbogus = 7\nstd_bits = nope\n",
    )
    .unwrap();

    let widths = BitWidths::load(Some(path.as_path())).unwrap();
    assert_eq!(widths.count_bits, 3);
    assert_eq!(widths.record_length, 2);
    assert_eq!(widths.std_bits, BitWidths::default().std_bits);
}

#[test]
fn test_missing_override_file() {
    let temp = TempDir::new().unwrap();
    let result = BitWidths::load(Some(temp.path().join("absent.cfg").as_path()));
    assert!(matches!(result, Err(PfmError::Open { .. })));
}

#[test]
fn test_invalid_override_rejected_at_create() {
    let widths = BitWidths {
        count_bits: 40,
        ..BitWidths::default()
    };
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 1.0, 1.0), 0.5, 0.5);
    assert!(matches!(
        PfmHeader::from_params(&params, &widths),
        Err(PfmError::InvalidParams(_))
    ));
}

// =============================================================================
// Grid Tests
// =============================================================================

#[test]
fn test_grid_addressing() {
    let grid = Grid::from_header(&default_header());
    assert_eq!(grid.cell_count(), 16);

    assert_eq!(grid.coord_of(0.5, 0.5), Some(BinCoord::new(0, 0)));
    assert_eq!(grid.coord_of(3.99, 1.2), Some(BinCoord::new(3, 1)));
    assert_eq!(grid.coord_of(4.0, 1.0), None);
    assert_eq!(grid.coord_of(-0.1, 1.0), None);

    assert_eq!(grid.index(BinCoord::new(2, 3)), 14);
    let center = grid.cell_center(BinCoord::new(2, 3));
    assert_eq!((center.x, center.y), (2.5, 3.5));

    assert!(grid.check(BinCoord::new(4, 0)).is_err());
    assert_eq!(grid.cells().count(), 16);
}
