//! Tests for the checkpoint side file
//!
//! These tests verify:
//! - Writing and loading a checkpoint
//! - Completion flag handling for interrupted writes
//! - Rejection of truncated files

use std::fs;
use std::path::PathBuf;

use pfm::files::{CellState, Checkpoint, CheckpointStatus};
use pfm::header::HEADER_SIZE;
use pfm::{BlockRef, PfmError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("test.pfm.ctl.chk");
    (temp, path)
}

fn sample() -> Checkpoint {
    let mut header_block = vec![0u8; HEADER_SIZE];
    header_block[..12].copy_from_slice(b"[VERSION] = ");

    Checkpoint {
        list_text: "PFM Software - PFM library V6.30\ntest.pfm.bin\ntest.pfm.ndx\n\n\n+ 00000 0002 /data/a.gsf\n"
            .to_string(),
        line_text: "Line 001\nLine 002\n".to_string(),
        header_block,
        index_size: 4096,
        cells: vec![
            CellState::new(0, None),
            CellState::new(5, Some(BlockRef(104))),
            CellState::new(12, Some(BlockRef(2080))),
        ],
    }
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_write_and_load() {
    let (_temp, path) = setup();
    let checkpoint = sample();
    checkpoint.write(&path).unwrap();

    assert_eq!(Checkpoint::status(&path).unwrap(), CheckpointStatus::Complete);
    let loaded = Checkpoint::load(&path).unwrap();
    assert_eq!(loaded, checkpoint);
}

#[test]
fn test_blank_lines_preserved() {
    let (_temp, path) = setup();
    let checkpoint = sample();
    checkpoint.write(&path).unwrap();

    let loaded = Checkpoint::load(&path).unwrap();
    // Empty image and target path lines survive
    assert_eq!(loaded.list_text.lines().nth(3), Some(""));
    assert_eq!(loaded.list_text.lines().count(), 6);
}

#[test]
fn test_empty_texts() {
    let (_temp, path) = setup();
    let checkpoint = Checkpoint {
        list_text: String::new(),
        line_text: String::new(),
        cells: Vec::new(),
        ..sample()
    };
    checkpoint.write(&path).unwrap();
    assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint);
}

#[test]
fn test_cell_state_tail() {
    assert_eq!(CellState::new(0, None).tail, -1);
    assert_eq!(CellState::new(0, None).tail_block(), None);
    assert_eq!(CellState::new(3, Some(BlockRef(208))).tail_block(), Some(BlockRef(208)));
}

// =============================================================================
// Completion Tests
// =============================================================================

#[test]
fn test_absent() {
    let (_temp, path) = setup();
    assert_eq!(Checkpoint::status(&path).unwrap(), CheckpointStatus::Absent);
}

#[test]
fn test_incomplete_flag() {
    let (_temp, path) = setup();
    sample().write(&path).unwrap();

    // Simulate a crash before the flag was set
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] = 0;
    fs::write(&path, &bytes).unwrap();

    assert_eq!(Checkpoint::status(&path).unwrap(), CheckpointStatus::Incomplete);
    assert!(matches!(Checkpoint::load(&path), Err(PfmError::Checkpoint(_))));
}

#[test]
fn test_empty_file_is_incomplete() {
    let (_temp, path) = setup();
    fs::write(&path, b"").unwrap();
    assert_eq!(Checkpoint::status(&path).unwrap(), CheckpointStatus::Incomplete);
}

#[test]
fn test_partial_cell_table_rejected() {
    let (_temp, path) = setup();
    sample().write(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 5);
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(Checkpoint::load(&path), Err(PfmError::Checkpoint(_))));
}

#[test]
fn test_wrong_header_size_rejected() {
    let (_temp, path) = setup();
    let checkpoint = Checkpoint {
        header_block: vec![0u8; 100],
        ..sample()
    };
    assert!(matches!(checkpoint.write(&path), Err(PfmError::Checkpoint(_))));
}

#[test]
fn test_remove() {
    let (_temp, path) = setup();
    sample().write(&path).unwrap();
    Checkpoint::remove(&path).unwrap();
    assert!(!path.exists());
    // Removing again is fine
    Checkpoint::remove(&path).unwrap();
}
