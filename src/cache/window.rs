//! Cache window
//!
//! A `rows x cols` rectangle of cells around a center. Rows are allocated
//! on first touch and cells are faulted in from disk on first access.

use std::mem;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{PfmError, Result};
use crate::geometry::allocate;
use crate::record::{BinCoord, BinRecord, BlockRef, CoverageFlags, DepthRecord, RecordCodec};
use crate::storage::{BinStore, DepthStore};

/// Approximate in-memory cost of one cell, excluding buffered blocks
const ENTRY_BYTES: usize = mem::size_of::<CacheEntry>();

/// Whether a cached cell has anything to write back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Read from disk; nothing to write back
    Loaded,
    /// Soundings were appended since the last flush
    Appended,
}

/// One depth block held by the cache
#[derive(Debug, Clone)]
struct PendingBlock {
    /// `None` until the block is given a place in the index file at flush
    address: Option<BlockRef>,
    data: Vec<u8>,
}

/// In-memory state of one cached cell
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bin: BinRecord,
    /// Coverage byte as of the last load/flush, when coverage is tracked
    pub coverage: Option<CoverageFlags>,
    pub state: EntryState,
    /// The on-disk tail block (if it is being filled) followed by new blocks
    chain: Vec<PendingBlock>,
}

impl CacheEntry {
    fn loaded(bin: BinRecord, coverage: Option<CoverageFlags>) -> Self {
        Self {
            bin,
            coverage,
            state: EntryState::Loaded,
            chain: Vec::new(),
        }
    }

    /// Number of depth blocks held in memory for this cell
    pub fn pending_blocks(&self) -> usize {
        self.chain.len()
    }

    /// Buffer one sounding. Returns the bytes newly held by the entry.
    fn append(&mut self, codec: &RecordCodec, record: &DepthRecord, depths: &mut DepthStore) -> Result<usize> {
        let count = self.bin.num_soundings as u64;
        let max = codec.max_count();
        if count >= max {
            return Err(PfmError::TooManySoundings { coord: self.bin.coord, max });
        }
        codec.check_identifiers(record)?;

        let slot = (count % codec.record_length() as u64) as usize;
        let mut added = 0;

        // Continue filling (or link behind) the block already on disk
        if count > 0 && self.chain.is_empty() {
            let tail = self.bin.tail.ok_or_else(|| PfmError::BrokenChain {
                coord: self.bin.coord,
                reason: format!("{} soundings but no tail block", count),
            })?;
            self.chain.push(PendingBlock {
                address: Some(tail),
                data: depths.read_block(tail)?,
            });
            added += codec.block_size();
        }

        if slot == 0 {
            self.chain.push(PendingBlock {
                address: None,
                data: allocate(codec.block_size())?,
            });
            added += codec.block_size();
        }

        if let Some(block) = self.chain.last_mut() {
            codec.encode_sounding(&mut block.data, slot, record);
        }
        self.bin.num_soundings += 1;
        self.state = EntryState::Appended;
        Ok(added)
    }

    /// Write buffered blocks, then the bin record, then coverage.
    /// Returns the bytes released.
    fn flush(
        &mut self,
        codec: &RecordCodec,
        bins: &mut BinStore,
        depths: &mut DepthStore,
        track_coverage: bool,
    ) -> Result<usize> {
        if self.state != EntryState::Appended {
            return Ok(0);
        }

        for block in self.chain.iter_mut().filter(|b| b.address.is_none()) {
            block.address = Some(depths.allocate());
        }
        let addresses: Vec<BlockRef> = self.chain.iter().filter_map(|b| b.address).collect();

        for (block, next) in self.chain.iter_mut().zip(addresses.iter().skip(1)) {
            codec.set_continuation(&mut block.data, Some(*next));
        }
        for (block, address) in self.chain.iter().zip(&addresses) {
            depths.write_block(*address, &block.data)?;
        }

        if self.bin.head.is_none() {
            self.bin.head = addresses.first().copied();
        }
        if let Some(last) = addresses.last() {
            self.bin.tail = Some(*last);
        }

        bins.write_raw(&self.bin)?;
        if track_coverage {
            let flags = CoverageFlags::from_bin(&self.bin);
            bins.write_coverage(self.bin.coord, flags)?;
            self.coverage = Some(flags);
        }

        let released = self.chain.iter().map(|b| b.data.len()).sum();
        self.chain.clear();
        self.state = EntryState::Loaded;
        Ok(released)
    }
}

/// Window geometry requested through [`BinCache::set_window`]
#[derive(Debug, Clone, Copy)]
struct WindowRequest {
    center: Option<BinCoord>,
}

struct Window {
    /// Lowest column/row covered
    origin: BinCoord,
    rows: usize,
    cols: usize,
    cells: Vec<Option<Vec<Option<CacheEntry>>>>,
    /// Approximate bytes held by this window
    bytes: usize,
}

impl Window {
    fn centered(center: BinCoord, rows: usize, cols: usize) -> Self {
        Self {
            origin: BinCoord::new(center.x - (cols / 2) as i32, center.y - (rows / 2) as i32),
            rows,
            cols,
            cells: (0..rows).map(|_| None).collect(),
            bytes: 0,
        }
    }

    fn contains(&self, coord: BinCoord) -> bool {
        let dx = coord.x as i64 - self.origin.x as i64;
        let dy = coord.y as i64 - self.origin.y as i64;
        dx >= 0 && dy >= 0 && (dx as usize) < self.cols && (dy as usize) < self.rows
    }

    fn slot(&self, coord: BinCoord) -> (usize, usize) {
        ((coord.y - self.origin.y) as usize, (coord.x - self.origin.x) as usize)
    }

    fn entry(&self, coord: BinCoord) -> Option<&CacheEntry> {
        if !self.contains(coord) {
            return None;
        }
        let (row, col) = self.slot(coord);
        self.cells[row].as_ref().and_then(|cells| cells[col].as_ref())
    }

    fn entry_slot(&mut self, coord: BinCoord) -> &mut Option<CacheEntry> {
        let (row, col) = self.slot(coord);
        let cols = self.cols;
        let cells = self.cells[row].get_or_insert_with(|| (0..cols).map(|_| None).collect());
        &mut cells[col]
    }

    /// Entry for `coord`, read from disk if not yet cached
    fn load(&mut self, coord: BinCoord, track_coverage: bool, bins: &mut BinStore) -> Result<&mut CacheEntry> {
        let entry = match self.entry_slot(coord).take() {
            Some(entry) => entry,
            None => {
                let bin = bins.read(coord)?;
                let coverage = if track_coverage {
                    Some(bins.read_coverage(coord)?)
                } else {
                    None
                };
                self.bytes += ENTRY_BYTES;
                CacheEntry::loaded(bin, coverage)
            }
        };
        Ok(self.entry_slot(coord).insert(entry))
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry> {
        self.cells
            .iter_mut()
            .flatten()
            .flat_map(|row| row.iter_mut().flatten())
    }

    fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.cells.iter().flatten().flat_map(|row| row.iter().flatten())
    }
}

/// Write-back cache of bin records and appended depth blocks
pub struct BinCache {
    codec: Arc<RecordCodec>,
    config: CacheConfig,
    window: Option<Window>,
    request: Option<WindowRequest>,
}

impl BinCache {
    pub fn new(codec: Arc<RecordCodec>, config: CacheConfig) -> Self {
        Self {
            codec,
            config,
            window: None,
            request: None,
        }
    }

    /// A window is currently allocated
    pub fn is_populated(&self) -> bool {
        self.window.is_some()
    }

    /// Approximate bytes held by the current window
    pub fn bytes(&self) -> usize {
        self.window.as_ref().map_or(0, |w| w.bytes)
    }

    /// Number of cells currently held
    pub fn len(&self) -> usize {
        self.window.as_ref().map_or(0, |w| w.entries().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entry for `coord`, without touching the disk
    pub fn peek(&self, coord: BinCoord) -> Option<&CacheEntry> {
        self.window.as_ref().and_then(|w| w.entry(coord))
    }

    /// Window covering `coord`, flushing and replacing the current one on a miss
    fn window_for(&mut self, coord: BinCoord, bins: &mut BinStore, depths: &mut DepthStore) -> Result<&mut Window> {
        if self.window.as_ref().is_some_and(|w| !w.contains(coord)) {
            debug!("Cache window miss at {}, flushing", coord);
            self.flush(bins, depths)?;
            self.destroy();
        }

        let config = &self.config;
        let request = &mut self.request;
        Ok(self.window.get_or_insert_with(|| {
            let (rows, cols) = (config.window_rows.max(1), config.window_cols.max(1));
            let requested = request.take().and_then(|r| r.center);
            let center = requested
                .filter(|center| Window::centered(*center, rows, cols).contains(coord))
                .unwrap_or(coord);
            debug!("Cache window {}x{} centered on {}", rows, cols, center);
            Window::centered(center, rows, cols)
        }))
    }

    /// Cached entry for `coord`, faulting it in from disk when needed
    pub fn get(&mut self, coord: BinCoord, bins: &mut BinStore, depths: &mut DepthStore) -> Result<&mut CacheEntry> {
        self.codec.grid().check(coord)?;
        let track_coverage = self.config.track_coverage;
        let window = self.window_for(coord, bins, depths)?;
        window.load(coord, track_coverage, bins)
    }

    /// Buffer one sounding for the cell `record.coord`
    pub fn append(&mut self, record: &DepthRecord, bins: &mut BinStore, depths: &mut DepthStore) -> Result<()> {
        let codec = Arc::clone(&self.codec);
        let added = {
            let entry = self.get(record.coord, bins, depths)?;
            entry.append(&codec, record, depths)?
        };
        if let Some(window) = self.window.as_mut() {
            window.bytes += added;
        }

        if self.bytes() > self.config.max_bytes {
            debug!(
                "Cache holds {} bytes (limit {}), flushing",
                self.bytes(),
                self.config.max_bytes
            );
            self.flush(bins, depths)?;
            self.destroy();
        }
        Ok(())
    }

    /// Write every appended cell back to disk.
    ///
    /// Stops at the first error; cells not yet written stay buffered.
    pub fn flush(&mut self, bins: &mut BinStore, depths: &mut DepthStore) -> Result<()> {
        let codec = Arc::clone(&self.codec);
        let track_coverage = self.config.track_coverage;
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };

        let mut flushed = 0;
        let mut released = 0;
        let mut result = Ok(());
        for entry in window.entries_mut() {
            if entry.state != EntryState::Appended {
                continue;
            }
            match entry.flush(&codec, bins, depths, track_coverage) {
                Ok(bytes) => {
                    released += bytes;
                    flushed += 1;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        window.bytes = window.bytes.saturating_sub(released);
        if flushed > 0 {
            debug!("Flushed {} cached bins ({} block bytes)", flushed, released);
        }
        result
    }

    /// Flush and drop one cell so direct store access sees current data
    pub fn evict(&mut self, coord: BinCoord, bins: &mut BinStore, depths: &mut DepthStore) -> Result<()> {
        let codec = Arc::clone(&self.codec);
        let track_coverage = self.config.track_coverage;
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        if !window.contains(coord) {
            return Ok(());
        }

        let slot = window.entry_slot(coord);
        if let Some(entry) = slot.as_mut() {
            let released = entry.flush(&codec, bins, depths, track_coverage)?;
            *slot = None;
            window.bytes = window.bytes.saturating_sub(ENTRY_BYTES + released);
        }
        Ok(())
    }

    /// Free the window. Unflushed appends are discarded.
    pub fn destroy(&mut self) {
        if let Some(window) = self.window.take() {
            let dirty = window.entries().filter(|e| e.state == EntryState::Appended).count();
            if dirty > 0 {
                warn!("Discarding {} cached bins with unflushed soundings", dirty);
            }
        }
    }

    /// Reshape the window and optionally recenter it. Applied the next time
    /// a window is created.
    pub fn set_window(&mut self, rows: usize, cols: usize, center: Option<BinCoord>) {
        self.config.window_rows = rows.max(1);
        self.config.window_cols = cols.max(1);
        self.request = Some(WindowRequest { center });
    }

    /// Change the byte budget. Checked on the next append.
    pub fn set_max_bytes(&mut self, limit: usize) {
        self.config.max_bytes = limit;
    }
}
