//! Tests for the bin cache
//!
//! These tests verify:
//! - Cached appends produce the same chains as direct appends
//! - Window misses and byte budget overruns flush to disk
//! - Cached appends continue chains already on disk
//! - Capacity and identifier checks apply on the cached path

use std::fs;
use std::path::{Path, PathBuf};

use pfm::header::Mbr;
use pfm::pfm::AppendPath;
use pfm::record::Coord3;
use pfm::{BinCoord, Config, CreateParams, DepthRecord, Pfm, PfmError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn params() -> CreateParams {
    CreateParams::new(Mbr::new(0.0, 0.0, 6.0, 6.0), 1.0, 1.0)
}

fn create(dir: &Path, name: &str, config: Config) -> (PathBuf, Pfm) {
    let handle = dir.join(name);
    let pfm = Pfm::create(&handle, &params(), config).unwrap();
    (handle, pfm)
}

fn cached(rows: usize, cols: usize) -> Config {
    Config::builder().cache_enabled(true).cache_window(rows, cols).build()
}

/// Deterministic scatter of soundings over the grid
fn scatter(count: u32) -> Vec<DepthRecord> {
    (0..count)
        .map(|i| {
            let x = ((i * 7) % 60) as f64 / 10.0 + 0.05;
            let y = ((i * 13) % 60) as f64 / 10.0 + 0.05;
            DepthRecord::new(Coord3::new(x, y, (i % 40) as f64 + 0.25)).with_ids(1, 0, i, i % 100)
        })
        .collect()
}

fn chain_summary(pfm: &mut Pfm, coord: BinCoord) -> Vec<(u32, u32, f64)> {
    pfm.read_depth_chain(coord)
        .unwrap()
        .into_iter()
        .map(|d| (d.ping_number, d.beam_number, d.xyz.z))
        .collect()
}

// =============================================================================
// Transparency Tests
// =============================================================================

#[test]
fn test_cached_and_direct_appends_match() {
    let temp = TempDir::new().unwrap();
    let records = scatter(500);

    let (direct_handle, mut direct) = create(temp.path(), "direct.pfm", Config::default());
    let (cached_handle, mut cache) = create(temp.path(), "cached.pfm", cached(2, 3));
    assert_eq!(direct.append_path(), AppendPath::Direct);
    assert_eq!(cache.append_path(), AppendPath::Cached);

    for record in &records {
        direct.add_depth(record).unwrap();
        cache.add_depth(record).unwrap();
    }
    direct.close().unwrap();
    cache.close().unwrap();

    let mut direct = Pfm::open(&direct_handle, Config::default()).unwrap();
    let mut cache = Pfm::open(&cached_handle, Config::default()).unwrap();
    let grid = *direct.grid();
    let mut total = 0;
    for coord in grid.cells() {
        let a = direct.read_bin(coord).unwrap();
        let b = cache.read_bin(coord).unwrap();
        assert_eq!(a.num_soundings, b.num_soundings, "count at {}", coord);
        assert_eq!(a.head.is_some(), b.head.is_some());

        let chain = chain_summary(&mut direct, coord);
        assert_eq!(chain, chain_summary(&mut cache, coord), "chain at {}", coord);
        assert_eq!(chain.len(), a.num_soundings as usize);
        assert_eq!(direct.read_coverage(coord).unwrap(), cache.read_coverage(coord).unwrap());
        total += chain.len();
    }
    assert_eq!(total, records.len());
}

#[test]
fn test_cached_count_visible_before_flush() {
    let temp = TempDir::new().unwrap();
    let (_, mut pfm) = create(temp.path(), "visible.pfm", cached(4, 4));

    for ping in 0..3 {
        pfm.add_depth(&DepthRecord::new(Coord3::new(2.5, 2.5, 9.0)).with_ids(0, 0, ping, 0))
            .unwrap();
    }

    assert!(pfm.cache().is_populated());
    let entry = pfm.cache().peek(BinCoord::new(2, 2)).unwrap();
    assert_eq!(entry.pending_blocks(), 1);
    assert_eq!(pfm.read_bin(BinCoord::new(2, 2)).unwrap().num_soundings, 3);

    // Reading the chain writes the cell back first
    assert_eq!(pfm.read_depth_chain(BinCoord::new(2, 2)).unwrap().len(), 3);
    assert!(pfm.cache().peek(BinCoord::new(2, 2)).is_none());
}

// =============================================================================
// Flush Trigger Tests
// =============================================================================

#[test]
fn test_window_miss_flushes_previous_window() {
    let temp = TempDir::new().unwrap();
    let (handle, mut pfm) = create(temp.path(), "miss.pfm", cached(1, 1));

    pfm.add_depth(&DepthRecord::new(Coord3::new(0.5, 0.5, 1.0))).unwrap();
    pfm.add_depth(&DepthRecord::new(Coord3::new(5.5, 5.5, 2.0))).unwrap();
    assert_eq!(pfm.cache().len(), 1);

    let mut reader = Pfm::open(&handle, Config::builder().read_only(true).build()).unwrap();
    assert_eq!(reader.read_bin(BinCoord::new(0, 0)).unwrap().num_soundings, 1);
    assert_eq!(reader.read_depth_chain(BinCoord::new(0, 0)).unwrap().len(), 1);
    assert_eq!(reader.read_bin(BinCoord::new(5, 5)).unwrap().num_soundings, 0);
}

#[test]
fn test_byte_budget_forces_flush() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().cache_enabled(true).cache_max_bytes(1).build();
    let (handle, mut pfm) = create(temp.path(), "budget.pfm", config);

    pfm.add_depth(&DepthRecord::new(Coord3::new(3.5, 1.5, 4.0))).unwrap();
    assert!(!pfm.cache().is_populated());

    let mut reader = Pfm::open(&handle, Config::builder().read_only(true).build()).unwrap();
    assert_eq!(reader.read_bin(BinCoord::new(3, 1)).unwrap().num_soundings, 1);
}

#[test]
fn test_recentered_window() {
    let temp = TempDir::new().unwrap();
    let (_, mut pfm) = create(temp.path(), "center.pfm", Config::builder().cache_enabled(true).build());

    pfm.set_cache_window(3, 3, Some(BinCoord::new(4, 4)));
    pfm.add_depth(&DepthRecord::new(Coord3::new(3.5, 3.5, 1.0))).unwrap();
    pfm.add_depth(&DepthRecord::new(Coord3::new(5.5, 5.5, 1.0))).unwrap();
    // Both cells fit the 3x3 window around (4, 4)
    assert_eq!(pfm.cache().len(), 2);

    pfm.add_depth(&DepthRecord::new(Coord3::new(0.5, 0.5, 1.0))).unwrap();
    assert_eq!(pfm.cache().len(), 1);
}

#[test]
fn test_flush_cache_releases_window() {
    let temp = TempDir::new().unwrap();
    let (_, mut pfm) = create(temp.path(), "release.pfm", cached(6, 6));
    for record in scatter(40) {
        pfm.add_depth(&record).unwrap();
    }
    assert!(pfm.cache().bytes() > 0);

    pfm.flush_cache().unwrap();
    assert!(!pfm.cache().is_populated());
    assert_eq!(pfm.cache().bytes(), 0);
}

#[test]
fn test_drop_without_close_discards_cached_appends() {
    let temp = TempDir::new().unwrap();
    let (handle, mut pfm) = create(temp.path(), "dropped.pfm", cached(6, 6));
    pfm.add_depth(&DepthRecord::new(Coord3::new(1.5, 1.5, 1.0))).unwrap();
    drop(pfm);

    let mut pfm = Pfm::open(&handle, Config::default()).unwrap();
    assert_eq!(pfm.read_bin(BinCoord::new(1, 1)).unwrap().num_soundings, 0);
}

// =============================================================================
// Chain Continuation Tests
// =============================================================================

#[test]
fn test_cached_appends_continue_disk_chain() {
    let temp = TempDir::new().unwrap();
    let (handle, mut pfm) = create(temp.path(), "continue.pfm", Config::default());
    let coord = BinCoord::new(4, 1);

    for ping in 0..3 {
        pfm.add_depth(&DepthRecord::new(Coord3::new(4.5, 1.5, 1.0)).with_ids(0, 0, ping, 0))
            .unwrap();
    }
    pfm.close().unwrap();

    let mut pfm = Pfm::open(&handle, cached(3, 3)).unwrap();
    for ping in 3..14 {
        pfm.add_depth(&DepthRecord::new(Coord3::new(4.5, 1.5, 1.0)).with_ids(0, 0, ping, 0))
            .unwrap();
    }
    pfm.close().unwrap();

    let mut pfm = Pfm::open(&handle, Config::default()).unwrap();
    let bin = pfm.read_bin(coord).unwrap();
    assert_eq!(bin.num_soundings, 14);
    assert_eq!(bin.head.map(|b| b.offset()), Some(0));

    let pings: Vec<u32> = pfm.read_depth_chain(coord).unwrap().iter().map(|d| d.ping_number).collect();
    assert_eq!(pings, (0..14).collect::<Vec<_>>());
}

#[test]
fn test_cached_capacity_boundary() {
    let temp = TempDir::new().unwrap();
    let cfg = temp.path().join("small.cfg");
    fs::write(&cfg, "count_bits = 2\nrecord_length = 2\n").unwrap();
    let config = Config::builder().cache_enabled(true).bit_config(&cfg).build();
    let (_, mut pfm) = create(temp.path(), "cap.pfm", config);

    for _ in 0..3 {
        pfm.add_depth(&DepthRecord::new(Coord3::new(0.5, 0.5, 1.0))).unwrap();
    }
    assert!(matches!(
        pfm.add_depth(&DepthRecord::new(Coord3::new(0.5, 0.5, 1.0))),
        Err(PfmError::TooManySoundings { max: 3, .. })
    ));

    pfm.flush().unwrap();
    assert_eq!(pfm.read_depth_chain(BinCoord::new(0, 0)).unwrap().len(), 3);
}
