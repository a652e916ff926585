//! Coverage map
//!
//! One flag byte per cell stored right after the bin grid, so spatial
//! queries ("where is there data?") never touch the bin records.

use std::fs::File;

use tracing::trace;

use crate::error::{FileKind, PfmError, Result};
use crate::geometry::Grid;
use crate::record::{BinCoord, CoverageFlags};

use super::{read_at, write_at};

/// Rows read per I/O call during a full scan
const SCAN_ROWS: usize = 64;

pub struct CoverageMap {
    /// Independent handle on the bin file
    file: File,
    base: u64,
    grid: Grid,
}

impl CoverageMap {
    pub fn new(file: File, base: u64, grid: Grid) -> Self {
        Self { file, base, grid }
    }

    fn address(&self, coord: BinCoord) -> u64 {
        self.base + self.grid.index(coord)
    }

    pub fn read(&mut self, coord: BinCoord) -> Result<CoverageFlags> {
        self.grid.check(coord)?;
        let offset = self.address(coord);
        let mut byte = [0u8; 1];
        read_at(&mut self.file, FileKind::Bin, offset, &mut byte)?;
        Ok(CoverageFlags::from_bits_retain(byte[0]))
    }

    pub fn write(&mut self, coord: BinCoord, flags: CoverageFlags) -> Result<()> {
        self.grid.check(coord)?;
        let offset = self.address(coord);
        trace!("coverage {} <- {:#04x}", coord, flags.bits());
        write_at(&mut self.file, FileKind::Bin, offset, &[flags.bits()])
    }

    /// Zero-fill the whole map (new structures)
    pub fn initialize(&mut self) -> Result<()> {
        let row = vec![0u8; self.grid.width as usize];
        for y in 0..self.grid.height {
            let offset = self.address(BinCoord::new(0, y));
            write_at(&mut self.file, FileKind::Bin, offset, &row)?;
        }
        Ok(())
    }

    /// Bounding box of every cell with the has-data flag, `None` if empty
    pub fn extent(&mut self) -> Result<Option<(BinCoord, BinCoord)>> {
        let width = self.grid.width as usize;
        let height = self.grid.height as usize;
        let mut extent = Extent::default();

        let mut row_start = 0;
        while row_start < height {
            let rows = SCAN_ROWS.min(height - row_start);
            let mut chunk = vec![0u8; rows * width];
            let offset = self.address(BinCoord::new(0, row_start as i32));
            read_at(&mut self.file, FileKind::Bin, offset, &mut chunk)?;

            for (i, byte) in chunk.iter().enumerate() {
                if CoverageFlags::from_bits_retain(*byte).contains(CoverageFlags::DATA) {
                    extent.include(BinCoord::new((i % width) as i32, (row_start + i / width) as i32));
                }
            }
            row_start += rows;
        }

        Ok(extent.finish())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data().map_err(PfmError::Io)
    }
}

/// Running bounding box of coordinates
#[derive(Debug, Default)]
pub(crate) struct Extent {
    bounds: Option<(BinCoord, BinCoord)>,
}

impl Extent {
    pub(crate) fn include(&mut self, coord: BinCoord) {
        self.bounds = Some(match self.bounds {
            None => (coord, coord),
            Some((min, max)) => (
                BinCoord::new(min.x.min(coord.x), min.y.min(coord.y)),
                BinCoord::new(max.x.max(coord.x), max.y.max(coord.y)),
            ),
        });
    }

    pub(crate) fn finish(self) -> Option<(BinCoord, BinCoord)> {
        self.bounds
    }
}
