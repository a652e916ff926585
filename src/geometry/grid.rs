//! Grid addressing
//!
//! Maps positions to bin coordinates and bin coordinates to cell indices.
//! Row 0 is the southern (min y) edge, column 0 the western (min x) edge.

use crate::error::{PfmError, Result};
use crate::header::{Coord2, Mbr, PfmHeader};
use crate::record::BinCoord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub mbr: Mbr,
    pub x_bin_size: f64,
    pub y_bin_size: f64,
    pub width: i32,
    pub height: i32,
}

impl Grid {
    pub fn from_header(header: &PfmHeader) -> Self {
        Self {
            mbr: header.mbr,
            x_bin_size: header.x_bin_size,
            y_bin_size: header.y_bin_size,
            width: header.bin_width,
            height: header.bin_height,
        }
    }

    pub fn contains(&self, coord: BinCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    /// Error unless `coord` lies inside the grid
    pub fn check(&self, coord: BinCoord) -> Result<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(PfmError::CoordOutOfRange {
                coord,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Row-major cell index
    pub fn index(&self, coord: BinCoord) -> u64 {
        coord.y as u64 * self.width as u64 + coord.x as u64
    }

    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Bin containing a position, if it lies in the grid
    pub fn coord_of(&self, x: f64, y: f64) -> Option<BinCoord> {
        let col = ((x - self.mbr.min_x) / self.x_bin_size).floor();
        let row = ((y - self.mbr.min_y) / self.y_bin_size).floor();
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        let coord = BinCoord::new(col as i32, row as i32);
        self.contains(coord).then_some(coord)
    }

    /// Nominal center of a cell
    pub fn cell_center(&self, coord: BinCoord) -> Coord2 {
        Coord2::new(
            self.mbr.min_x + (coord.x as f64 + 0.5) * self.x_bin_size,
            self.mbr.min_y + (coord.y as f64 + 0.5) * self.y_bin_size,
        )
    }

    /// Every cell in row-major order
    pub fn cells(&self) -> impl Iterator<Item = BinCoord> {
        let (width, height) = (self.width, self.height);
        (0..height).flat_map(move |y| (0..width).map(move |x| BinCoord::new(x, y)))
    }
}
