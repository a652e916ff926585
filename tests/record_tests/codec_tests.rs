//! Tests for the record codec
//!
//! These tests verify:
//! - Word order selection for 64-bit pointers by format version and writer
//! - Bin head/tail pointers and block continuations in both word orders
//! - Saturation of statistics that exceed their field width

use pfm::codec::PointerOrder;
use pfm::geometry::BitWidths;
use pfm::header::{FormatVersion, Mbr, PfmHeader};
use pfm::record::codec::pointer_order;
use pfm::{BinCoord, BinRecord, BlockRef, CreateParams, RecordCodec};

// =============================================================================
// Helper Functions
// =============================================================================

fn header(version: FormatVersion, average_filt_name: &str) -> PfmHeader {
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 4.0, 4.0), 1.0, 1.0);
    let mut header = PfmHeader::from_params(&params, &BitWidths::default()).unwrap();
    header.format_version = version;
    header.average_filt_name = average_filt_name.to_string();
    header
}

fn legacy_codec() -> RecordCodec {
    RecordCodec::new(&header(FormatVersion::new(4, 70), "Average Filtered Depth"))
}

/// Same layout as [`legacy_codec`], written by the CUBE-era library
fn cube_codec() -> RecordCodec {
    RecordCodec::new(&header(FormatVersion::new(4, 70), "CUBE Surface"))
}

/// Uses bits on both sides of the 32-bit split of a 40-bit pointer
const FAR_BLOCK: BlockRef = BlockRef(0x12_3456_7890);
const TAIL_BLOCK: BlockRef = BlockRef(0xAB_0000_0104);

// =============================================================================
// Order Selection Tests
// =============================================================================

#[test]
fn test_pre_coverage_versions_use_legacy_order() {
    assert_eq!(
        pointer_order(&header(FormatVersion::new(4, 70), "Average Filtered Depth")),
        PointerOrder::Legacy
    );
    assert_eq!(
        pointer_order(&header(FormatVersion::new(3, 5), "")),
        PointerOrder::Legacy
    );
    assert_eq!(legacy_codec().pointer_order(), PointerOrder::Legacy);
}

#[test]
fn test_cube_writer_uses_modern_order() {
    assert_eq!(cube_codec().pointer_order(), PointerOrder::Modern);
    assert_eq!(
        pointer_order(&header(FormatVersion::new(4, 99), "CUBE")),
        PointerOrder::Modern
    );
    // The prefix must lead the name
    assert_eq!(
        pointer_order(&header(FormatVersion::new(4, 70), "Legacy CUBE")),
        PointerOrder::Legacy
    );
}

#[test]
fn test_coverage_versions_use_modern_order() {
    for version in [FormatVersion::COVERAGE, FormatVersion::CURRENT] {
        assert_eq!(
            pointer_order(&header(version, "Average Filtered Depth")),
            PointerOrder::Modern
        );
    }
}

// =============================================================================
// Pointer Round Trip Tests
// =============================================================================

#[test]
fn test_bin_pointers_in_legacy_order() {
    let codec = legacy_codec();
    assert!(codec.geometry().bin.head.bits > 32);

    let mut bin = BinRecord::empty(BinCoord::new(1, 2), codec.null_depth());
    bin.num_soundings = 7;
    bin.head = Some(FAR_BLOCK);
    bin.tail = Some(TAIL_BLOCK);

    let mut buffer = vec![0u8; codec.bin_size()];
    codec.encode_bin(&mut buffer, &bin);

    let decoded = codec.decode_bin(&buffer, bin.coord);
    assert_eq!(decoded.head, Some(FAR_BLOCK));
    assert_eq!(decoded.tail, Some(TAIL_BLOCK));
    assert_eq!(decoded.num_soundings, 7);

    // Reading the same bytes with the other word order scrambles the pointers
    let misread = cube_codec().decode_bin(&buffer, bin.coord);
    assert_ne!(misread.head, Some(FAR_BLOCK));
    assert_ne!(misread.tail, Some(TAIL_BLOCK));
}

#[test]
fn test_empty_bin_pointers_in_legacy_order() {
    let codec = legacy_codec();
    let bin = BinRecord::empty(BinCoord::new(0, 0), codec.null_depth());

    let mut buffer = vec![0u8; codec.bin_size()];
    codec.encode_bin(&mut buffer, &bin);

    let decoded = codec.decode_bin(&buffer, bin.coord);
    assert_eq!(decoded.head, None);
    assert_eq!(decoded.tail, None);
}

#[test]
fn test_continuation_in_legacy_order() {
    let codec = legacy_codec();
    let mut block = vec![0u8; codec.block_size()];
    assert_eq!(codec.continuation(&block), None);

    codec.set_continuation(&mut block, Some(FAR_BLOCK));
    assert_eq!(codec.continuation(&block), Some(FAR_BLOCK));
    assert_ne!(cube_codec().continuation(&block), Some(FAR_BLOCK));

    codec.set_continuation(&mut block, None);
    assert_eq!(codec.continuation(&block), None);
}

// =============================================================================
// Saturation Tests
// =============================================================================

#[test]
fn test_standard_deviation_saturates() {
    let codec = RecordCodec::new(&header(FormatVersion::CURRENT, "Average Filtered Depth"));
    let mut bin = BinRecord::empty(BinCoord::new(0, 0), codec.null_depth());
    bin.standard_dev = 707.1;

    let mut buffer = vec![0u8; codec.bin_size()];
    codec.encode_bin(&mut buffer, &bin);

    // 16 bits at scale 100
    let decoded = codec.decode_bin(&buffer, bin.coord);
    assert!((decoded.standard_dev - 655.35).abs() < 0.006);
    assert_eq!(decoded.head, None);
}
