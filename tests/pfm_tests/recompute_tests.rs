//! Tests for bin statistics recomputation
//!
//! These tests verify:
//! - Filtered statistics use only valid soundings
//! - Unfiltered statistics skip deleted soundings
//! - Validity propagation from soundings to the bin
//! - Bins without valid soundings fall back to the null depth

use pfm::header::Mbr;
use pfm::recompute::recompute;
use pfm::record::Coord3;
use pfm::{BinCoord, BinRecord, Config, CoverageFlags, CreateParams, DepthRecord, Pfm, Validity};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const NULL: f32 = 12001.0;

fn sounding(z: f64, validity: Validity) -> DepthRecord {
    let mut record = DepthRecord::new(Coord3::new(0.5, 0.5, z));
    record.validity = validity;
    record
}

fn create(dir: &std::path::Path) -> Pfm {
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 2.0, 2.0), 1.0, 1.0);
    Pfm::create(dir.join("recompute.pfm"), &params, Config::default()).unwrap()
}

fn close(a: f32, b: f64) -> bool {
    (a as f64 - b).abs() < 1e-4
}

// =============================================================================
// Statistics Tests
// =============================================================================

#[test]
fn test_filtered_statistics_use_valid_soundings() {
    let bin = BinRecord::empty(BinCoord::new(0, 0), NULL);
    let soundings = [
        sounding(10.0, Validity::empty()),
        sounding(20.0, Validity::SUSPECT),
        sounding(500.0, Validity::MANUALLY_INVAL),
        sounding(600.0, Validity::DELETED),
    ];

    let out = recompute(&bin, &soundings, Validity::PROPAGATED, NULL);
    assert!(close(out.avg_filtered_depth, 15.0));
    assert!(close(out.min_filtered_depth, 10.0));
    assert!(close(out.max_filtered_depth, 20.0));
    assert!(close(out.standard_dev, 7.0710678));

    // Deleted soundings are excluded everywhere, invalid ones only from filtered
    assert!(close(out.min_depth, 10.0));
    assert!(close(out.max_depth, 500.0));
    assert!(close(out.avg_depth, 530.0 / 3.0));

    assert!(out.validity.contains(Validity::DATA));
    assert!(out.validity.contains(Validity::SUSPECT));
}

#[test]
fn test_single_sounding_has_zero_deviation() {
    let bin = BinRecord::empty(BinCoord::new(0, 0), NULL);
    let out = recompute(&bin, &[sounding(42.0, Validity::empty())], Validity::PROPAGATED, NULL);
    assert_eq!(out.standard_dev, 0.0);
    assert!(close(out.avg_filtered_depth, 42.0));
}

#[test]
fn test_no_valid_soundings_gives_null_depth() {
    let mut bin = BinRecord::empty(BinCoord::new(0, 0), NULL);
    bin.validity = Validity::CHECKED | Validity::DATA;
    bin.num_soundings = 2;

    let soundings = [
        sounding(10.0, Validity::FILTER_INVAL),
        sounding(30.0, Validity::MANUALLY_INVAL | Validity::SELECTED),
    ];
    let out = recompute(&bin, &soundings, Validity::PROPAGATED, NULL);

    assert_eq!(out.avg_filtered_depth, NULL);
    assert_eq!(out.min_filtered_depth, NULL);
    assert_eq!(out.max_filtered_depth, NULL);
    assert_eq!(out.standard_dev, 0.0);
    assert!(close(out.avg_depth, 20.0));
    assert_eq!(out.num_soundings, 2);

    // Invalid soundings propagate nothing; CHECKED is kept
    assert_eq!(out.validity, Validity::CHECKED);
}

#[test]
fn test_all_deleted_gives_null_everywhere() {
    let bin = BinRecord::empty(BinCoord::new(0, 0), NULL);
    let out = recompute(&bin, &[sounding(5.0, Validity::DELETED)], Validity::PROPAGATED, NULL);
    assert_eq!(out.avg_depth, NULL);
    assert_eq!(out.min_depth, NULL);
    assert_eq!(out.max_depth, NULL);
    assert!(!out.validity.contains(Validity::DATA));
}

// =============================================================================
// Propagation Tests
// =============================================================================

#[test]
fn test_mask_limits_propagation() {
    let mut bin = BinRecord::empty(BinCoord::new(0, 0), NULL);
    bin.validity = Validity::VERIFIED | Validity::REFERENCE;
    let soundings = [sounding(1.0, Validity::SUSPECT | Validity::USER_03)];

    let out = recompute(&bin, &soundings, Validity::USER, NULL);
    // Bits outside the mask are untouched, bits inside come from soundings
    assert_eq!(
        out.validity,
        Validity::VERIFIED | Validity::REFERENCE | Validity::USER_03 | Validity::DATA
    );

    let out = recompute(&bin, &soundings, Validity::PROPAGATED, NULL);
    // REFERENCE is in the mask and no sounding carries it
    assert_eq!(
        out.validity,
        Validity::VERIFIED | Validity::SUSPECT | Validity::USER_03 | Validity::DATA
    );
}

// =============================================================================
// Stored Recompute Tests
// =============================================================================

#[test]
fn test_invalidating_sounding_updates_bin() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    let coord = BinCoord::new(0, 0);

    for z in [10.0, 20.0, 90.0] {
        pfm.add_depth(&sounding(z, Validity::empty())).unwrap();
    }
    let bin = pfm.recompute_bin(coord, None).unwrap();
    assert!((bin.max_filtered_depth - 90.0).abs() < 0.006);

    let mut chain = pfm.read_depth_chain(coord).unwrap();
    chain[2].validity = Validity::MANUALLY_INVAL;
    pfm.update_depth(&chain[2]).unwrap();

    let bin = pfm.recompute_bin(coord, None).unwrap();
    assert!((bin.max_filtered_depth - 20.0).abs() < 0.006);
    assert!((bin.max_depth - 90.0).abs() < 0.006);
    assert!((bin.standard_dev - 7.0710678).abs() < 1e-4);

    let stored = pfm.read_bin(coord).unwrap();
    assert!((stored.standard_dev - 7.07).abs() < 0.006);
    assert!((stored.avg_filtered_depth - 15.0).abs() < 0.006);
}

#[test]
fn test_stored_recompute_without_valid_soundings() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    let coord = BinCoord::new(0, 0);

    pfm.add_depth(&sounding(10.0, Validity::FILTER_INVAL)).unwrap();
    let mut bin = pfm.read_bin(coord).unwrap();
    bin.validity = Validity::CHECKED;
    pfm.write_bin_validity(&bin, Validity::CHECKED).unwrap();

    let bin = pfm.recompute_bin(coord, None).unwrap();
    assert_eq!(bin.avg_filtered_depth, pfm.header().null_depth);
    assert_eq!(bin.validity, Validity::CHECKED);
    assert_eq!(
        pfm.read_coverage(coord).unwrap(),
        CoverageFlags::SURVEYED | CoverageFlags::CHECKED
    );
}

#[test]
fn test_stored_deviation_saturates_at_field_max() {
    let temp = TempDir::new().unwrap();
    let handle = temp.path().join("spread.pfm");
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 4.0, 4.0), 1.0, 1.0).depth_range(0.0, 1000.0, 100.0);
    let coord = BinCoord::new(2, 2);
    {
        let mut pfm = Pfm::create(&handle, &params, Config::default()).unwrap();
        for z in [0.0, 1000.0] {
            pfm.add_depth(&DepthRecord::new(Coord3::new(2.5, 2.5, z))).unwrap();
        }
        let bin = pfm.recompute_bin(coord, None).unwrap();
        assert!((bin.standard_dev - 707.1068).abs() < 1e-3);
        pfm.close().unwrap();
    }

    // 16 bits at scale 100 top out at 655.35
    let mut pfm = Pfm::open(&handle, Config::default()).unwrap();
    let stored = pfm.read_bin(coord).unwrap();
    assert!((stored.standard_dev - 655.35).abs() < 0.006, "stored {}", stored.standard_dev);
    assert!((stored.max_filtered_depth - 1000.0).abs() < 0.006);
}
