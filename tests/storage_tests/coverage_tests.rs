//! Tests for the coverage map
//!
//! These tests verify:
//! - Coverage bytes follow bin validity through every write path
//! - Direct coverage writes and the data extent scan
//! - Legacy files without a map derive flags from the bin record

use pfm::header::{read_header, write_header, FormatVersion, Mbr};
use pfm::record::Coord3;
use pfm::storage::read_header_block;
use pfm::{BinCoord, Config, CoverageFlags, CreateParams, DepthRecord, Pfm, PfmError, Validity};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn create(dir: &std::path::Path) -> Pfm {
    let params = CreateParams::new(Mbr::new(0.0, 0.0, 8.0, 6.0), 1.0, 1.0);
    Pfm::create(dir.join("coverage.pfm"), &params, Config::default()).unwrap()
}

fn add(pfm: &mut Pfm, x: f64, y: f64, z: f64) {
    pfm.add_depth(&DepthRecord::new(Coord3::new(x, y, z))).unwrap();
}

fn expected_flags(validity: Validity, surveyed: bool) -> CoverageFlags {
    let mut flags = CoverageFlags::empty();
    flags.set(CoverageFlags::DATA, validity.contains(Validity::DATA));
    flags.set(CoverageFlags::SURVEYED, surveyed);
    flags.set(CoverageFlags::CHECKED, validity.contains(Validity::CHECKED));
    flags.set(CoverageFlags::VERIFIED, validity.contains(Validity::VERIFIED));
    flags
}

// =============================================================================
// Consistency Tests
// =============================================================================

#[test]
fn test_new_structure_has_empty_coverage() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    assert!(pfm.header().coverage_map_address > 0);
    assert_eq!(pfm.read_coverage(BinCoord::new(7, 5)).unwrap(), CoverageFlags::empty());
    assert_eq!(pfm.coverage_extent().unwrap(), None);
}

#[test]
fn test_coverage_follows_validity_updates() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    let coord = BinCoord::new(3, 2);
    add(&mut pfm, 3.5, 2.5, 10.0);
    pfm.recompute_bin(coord, None).unwrap();

    let sequence = [
        (Validity::CHECKED, Validity::CHECKED),
        (Validity::VERIFIED, Validity::VERIFIED | Validity::CHECKED),
        (Validity::empty(), Validity::CHECKED),
        (Validity::empty(), Validity::DATA),
        (Validity::DATA | Validity::VERIFIED, Validity::DATA | Validity::VERIFIED),
    ];

    for (bits, mask) in sequence {
        let mut bin = pfm.read_bin(coord).unwrap();
        bin.validity = bits;
        let stored = pfm.write_bin_validity(&bin, mask).unwrap();

        let on_disk = pfm.read_bin(coord).unwrap();
        assert_eq!(stored.validity, on_disk.validity);
        assert_eq!(
            pfm.read_coverage(coord).unwrap(),
            expected_flags(on_disk.validity, on_disk.num_soundings > 0)
        );
    }
}

#[test]
fn test_write_validity_leaves_other_bits() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    let coord = BinCoord::new(0, 0);

    let mut bin = pfm.read_bin(coord).unwrap();
    bin.validity = Validity::SUSPECT | Validity::SELECTED;
    pfm.write_bin_validity(&bin, Validity::SUSPECT | Validity::SELECTED).unwrap();

    bin.validity = Validity::empty();
    let stored = pfm.write_bin_validity(&bin, Validity::SELECTED).unwrap();
    assert_eq!(stored.validity, Validity::SUSPECT);
}

#[test]
fn test_recompute_sets_data_coverage() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    add(&mut pfm, 1.5, 1.5, 3.0);
    let coord = BinCoord::new(1, 1);

    // Appends alone leave the statistics for recompute
    assert_eq!(pfm.read_coverage(coord).unwrap(), CoverageFlags::SURVEYED);

    pfm.recompute_bin(coord, None).unwrap();
    assert_eq!(
        pfm.read_coverage(coord).unwrap(),
        CoverageFlags::SURVEYED | CoverageFlags::DATA
    );
}

// =============================================================================
// Extent Tests
// =============================================================================

#[test]
fn test_extent_covers_data_cells() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());

    for (x, y) in [(2.5, 1.5), (6.5, 4.5), (4.5, 3.5)] {
        add(&mut pfm, x, y, 20.0);
        let coord = pfm.coord_of(x, y).unwrap();
        pfm.recompute_bin(coord, None).unwrap();
    }
    // Surveyed but without data does not count
    add(&mut pfm, 0.5, 0.5, 20.0);

    assert_eq!(
        pfm.coverage_extent().unwrap(),
        Some((BinCoord::new(2, 1), BinCoord::new(6, 4)))
    );
}

#[test]
fn test_direct_coverage_write() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    let coord = BinCoord::new(5, 5);

    pfm.write_coverage(coord, CoverageFlags::DATA | CoverageFlags::CHECKED).unwrap();
    assert_eq!(
        pfm.read_coverage(coord).unwrap(),
        CoverageFlags::DATA | CoverageFlags::CHECKED
    );
    assert_eq!(pfm.coverage_extent().unwrap(), Some((coord, coord)));
}

// =============================================================================
// Row Read Tests
// =============================================================================

#[test]
fn test_row_read_returns_consecutive_cells() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());
    add(&mut pfm, 4.5, 3.5, 10.0);
    add(&mut pfm, 4.5, 3.5, 12.0);

    let row = pfm.read_bin_row(3, 2, 4).unwrap();
    let coords: Vec<BinCoord> = row.iter().map(|b| b.coord).collect();
    assert_eq!(coords, (2..6).map(|x| BinCoord::new(x, 3)).collect::<Vec<_>>());
    assert_eq!(row[2].num_soundings, 2);
    assert!(pfm.read_bin_row(3, 2, 0).unwrap().is_empty());
}

#[test]
fn test_row_read_past_grid_rejected() {
    let temp = TempDir::new().unwrap();
    let mut pfm = create(temp.path());

    assert!(matches!(pfm.read_bin_row(0, 5, 4), Err(PfmError::CoordOutOfRange { .. })));
    for length in [i32::MAX as usize, i32::MAX as usize + 2, usize::MAX] {
        assert!(matches!(
            pfm.read_bin_row(0, 1, length),
            Err(PfmError::CoordOutOfRange { .. })
        ));
    }
}

// =============================================================================
// Legacy Fallback Tests
// =============================================================================

#[test]
fn test_legacy_file_derives_coverage_from_bin() {
    let temp = TempDir::new().unwrap();
    let handle = temp.path().join("coverage.pfm");
    let coord = BinCoord::new(2, 3);
    {
        let mut pfm = create(temp.path());
        let mut bin = pfm.read_bin(coord).unwrap();
        bin.validity = Validity::DATA | Validity::CHECKED | Validity::VERIFIED;
        pfm.write_bin(&bin).unwrap();
        pfm.close().unwrap();
    }

    // Drop the map address so the file reads like one written before maps
    let bin_path = temp.path().join("coverage.pfm.data").join("coverage.pfm.bin");
    let mut header = read_header(&read_header_block(&bin_path).unwrap()).unwrap();
    assert_eq!(header.format_version, FormatVersion::CURRENT);
    header.coverage_map_address = 0;
    let block = write_header(&header).unwrap();
    let mut bytes = std::fs::read(&bin_path).unwrap();
    bytes[..block.len()].copy_from_slice(&block);
    std::fs::write(&bin_path, bytes).unwrap();

    let mut pfm = Pfm::open(&handle, Config::default()).unwrap();
    assert_eq!(
        pfm.read_coverage(coord).unwrap(),
        CoverageFlags::DATA | CoverageFlags::CHECKED
    );
    assert_eq!(pfm.read_coverage(BinCoord::new(0, 0)).unwrap(), CoverageFlags::empty());
    assert_eq!(pfm.coverage_extent().unwrap(), Some((coord, coord)));

    // Writes are accepted and ignored
    pfm.write_coverage(BinCoord::new(0, 0), CoverageFlags::VERIFIED).unwrap();
    assert_eq!(pfm.read_coverage(BinCoord::new(0, 0)).unwrap(), CoverageFlags::empty());
}
