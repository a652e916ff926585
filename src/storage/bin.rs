//! Bin record store
//!
//! Fixed-size records addressed as `HEADER_SIZE + index * record_size`.
//! The store keeps one decoded-record buffer and remembers which address
//! it holds, so re-reading the same cell costs no I/O.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{FileKind, PfmError, Result};
use crate::geometry::{allocate, Grid};
use crate::header::{write_header, PfmHeader, HEADER_SIZE};
use crate::record::{BinCoord, BinRecord, CoverageFlags, RecordCodec, Validity};

use super::coverage::{CoverageMap, Extent};
use super::{create_file, open_file, read_at, write_at};

pub struct BinStore {
    file: File,
    codec: Arc<RecordCodec>,

    /// Bytes of the record at `last`, identical to what is on disk
    buffer: Vec<u8>,

    /// Address whose bytes are in `buffer`
    last: Option<u64>,

    /// `None` for files older than the coverage map
    coverage: Option<CoverageMap>,
}

impl BinStore {
    /// Create a bin file: header block, empty grid, zeroed coverage map
    pub fn create(path: &Path, codec: Arc<RecordCodec>, header: &PfmHeader) -> Result<Self> {
        let file = create_file(path, FileKind::Bin)?;
        let mut store = Self::from_file(file, codec, header)?;

        let block = write_header(header)?;
        write_at(&mut store.file, FileKind::Bin, 0, &block)?;
        store.initialize_grid()?;
        if let Some(coverage) = store.coverage.as_mut() {
            coverage.initialize()?;
        }

        debug!(
            "Created bin file {} ({}x{} cells, {} bytes per record)",
            path.display(),
            header.bin_width,
            header.bin_height,
            store.codec.bin_size()
        );
        Ok(store)
    }

    pub fn open(path: &Path, codec: Arc<RecordCodec>, header: &PfmHeader, read_only: bool) -> Result<Self> {
        let file = open_file(path, FileKind::Bin, read_only)?;
        Self::from_file(file, codec, header)
    }

    fn from_file(file: File, codec: Arc<RecordCodec>, header: &PfmHeader) -> Result<Self> {
        let coverage = if header.has_coverage_map() {
            let handle = file.try_clone()?;
            Some(CoverageMap::new(handle, header.coverage_map_address as u64, *codec.grid()))
        } else {
            None
        };
        let buffer = allocate(codec.bin_size())?;

        Ok(Self {
            file,
            codec,
            buffer,
            last: None,
            coverage,
        })
    }

    fn grid(&self) -> &Grid {
        self.codec.grid()
    }

    /// Byte address of a cell's record
    pub fn address(&self, coord: BinCoord) -> u64 {
        HEADER_SIZE as u64 + self.grid().index(coord) * self.codec.bin_size() as u64
    }

    // -------------------------------------------------------------------------
    // Header block
    // -------------------------------------------------------------------------

    pub fn read_header_block(&mut self) -> Result<Vec<u8>> {
        let mut block = vec![0u8; HEADER_SIZE];
        read_at(&mut self.file, FileKind::Bin, 0, &mut block)?;
        Ok(block)
    }

    pub fn write_header_block(&mut self, block: &[u8]) -> Result<()> {
        write_at(&mut self.file, FileKind::Bin, 0, block)
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    pub fn read(&mut self, coord: BinCoord) -> Result<BinRecord> {
        self.grid().check(coord)?;
        let address = self.address(coord);

        if self.last != Some(address) {
            trace!("bin read {} @ {}", coord, address);
            self.last = None;
            read_at(&mut self.file, FileKind::Bin, address, &mut self.buffer)?;
            self.last = Some(address);
        }

        Ok(self.codec.decode_bin(&self.buffer, coord))
    }

    /// Read `length` consecutive cells of one row with a single I/O call
    pub fn read_row(&mut self, row: i32, start_col: i32, length: usize) -> Result<Vec<BinRecord>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let first = BinCoord::new(start_col, row);
        self.grid().check(first)?;
        let end = i32::try_from(length - 1)
            .ok()
            .and_then(|span| start_col.checked_add(span))
            .ok_or(PfmError::CoordOutOfRange {
                coord: first,
                width: self.grid().width,
                height: self.grid().height,
            })?;
        self.grid().check(BinCoord::new(end, row))?;

        let size = self.codec.bin_size();
        let mut chunk = allocate(size * length)?;
        let offset = self.address(first);
        read_at(&mut self.file, FileKind::Bin, offset, &mut chunk)?;

        Ok(chunk
            .chunks_exact(size)
            .enumerate()
            .map(|(i, bytes)| self.codec.decode_bin(bytes, BinCoord::new(start_col + i as i32, row)))
            .collect())
    }

    /// Write a record without touching the coverage map.
    ///
    /// Used by the bin cache, which maintains coverage on its own flush path.
    pub fn write_raw(&mut self, bin: &BinRecord) -> Result<()> {
        self.grid().check(bin.coord)?;
        let address = self.address(bin.coord);

        self.last = None;
        self.codec.encode_bin(&mut self.buffer, bin);
        trace!("bin write {} @ {} ({} soundings)", bin.coord, address, bin.num_soundings);
        write_at(&mut self.file, FileKind::Bin, address, &self.buffer)?;
        self.last = Some(address);
        Ok(())
    }

    /// Write a record and update its coverage byte
    pub fn write(&mut self, bin: &BinRecord) -> Result<()> {
        self.write_raw(bin)?;
        self.update_coverage(bin)
    }

    /// Replace only the validity bits selected by `mask` with those of
    /// `bin`, leaving every other stored field as it is on disk.
    pub fn write_validity(&mut self, bin: &BinRecord, mask: Validity) -> Result<BinRecord> {
        let current = self.read(bin.coord)?;
        let address = self.address(bin.coord);

        self.last = None;
        self.codec.merge_bin_validity(&mut self.buffer, bin.validity, mask);
        write_at(&mut self.file, FileKind::Bin, address, &self.buffer)?;
        self.last = Some(address);

        let updated = self.codec.decode_bin(&self.buffer, current.coord);
        self.update_coverage(&updated)?;
        Ok(updated)
    }

    fn initialize_grid(&mut self) -> Result<()> {
        let grid = *self.grid();
        let size = self.codec.bin_size();
        let mut row = allocate(size * grid.width as usize)?;
        for (x, bytes) in row.chunks_exact_mut(size).enumerate() {
            let empty = BinRecord::empty(BinCoord::new(x as i32, 0), self.codec.null_depth());
            self.codec.encode_bin(bytes, &empty);
        }

        let offset = self.address(BinCoord::new(0, 0));
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        let mut writer = BufWriter::new(file);
        for y in 0..grid.height {
            writer.write_all(&row).map_err(|source| PfmError::Write {
                kind: FileKind::Bin,
                offset: self.address(BinCoord::new(0, y)),
                source,
            })?;
        }
        writer.flush()?;
        self.last = None;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Coverage
    // -------------------------------------------------------------------------

    pub fn has_coverage_map(&self) -> bool {
        self.coverage.is_some()
    }

    fn update_coverage(&mut self, bin: &BinRecord) -> Result<()> {
        match self.coverage.as_mut() {
            Some(map) => map.write(bin.coord, CoverageFlags::from_bin(bin)),
            None => Ok(()),
        }
    }

    /// Coverage byte of a cell. Files without a map derive has-data and
    /// checked from the bin record.
    pub fn read_coverage(&mut self, coord: BinCoord) -> Result<CoverageFlags> {
        if let Some(map) = self.coverage.as_mut() {
            return map.read(coord);
        }
        let bin = self.read(coord)?;
        Ok(legacy_coverage(&bin))
    }

    /// Files without a map have nothing to write; the flags already live in
    /// the bin record.
    pub fn write_coverage(&mut self, coord: BinCoord, flags: CoverageFlags) -> Result<()> {
        match self.coverage.as_mut() {
            Some(map) => map.write(coord, flags),
            None => {
                self.grid().check(coord)?;
                trace!("no coverage map, ignoring coverage write for {}", coord);
                Ok(())
            }
        }
    }

    /// Bounding box of all cells with data
    pub fn coverage_extent(&mut self) -> Result<Option<(BinCoord, BinCoord)>> {
        if let Some(map) = self.coverage.as_mut() {
            return map.extent();
        }

        let grid = *self.grid();
        let mut extent = Extent::default();
        for y in 0..grid.height {
            for bin in self.read_row(y, 0, grid.width as usize)? {
                if legacy_coverage(&bin).contains(CoverageFlags::DATA) {
                    extent.include(bin.coord);
                }
            }
        }
        Ok(extent.finish())
    }

    pub fn sync(&mut self) -> Result<()> {
        if let Some(map) = self.coverage.as_mut() {
            map.sync()?;
        }
        self.file.sync_data().map_err(PfmError::Io)
    }
}

fn legacy_coverage(bin: &BinRecord) -> CoverageFlags {
    let mut flags = CoverageFlags::empty();
    flags.set(CoverageFlags::DATA, bin.validity.contains(Validity::DATA));
    flags.set(CoverageFlags::CHECKED, bin.validity.contains(Validity::CHECKED));
    flags
}
