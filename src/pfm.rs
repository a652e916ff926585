//! PFM Structure
//!
//! One open structure: the file set, its header, the record stores and the
//! bin cache.
//!
//! ## Responsibilities
//! - Create, open and close the cooperating files
//! - Route bin/sounding reads and writes through the stores or the cache
//! - Checkpoint before bulk appends and roll back after a crash
//! - Maintain the input file manifest and line names
//!
//! ## Checkpoint Handling At Open
//! ```text
//!   checkpoint file    CheckpointMode::Recover     any other mode
//!   ───────────────    ───────────────────────     ──────────────────────
//!   absent             open normally               open normally
//!   incomplete         discard, open normally      discard, open normally
//!   complete           roll back, then open        CheckpointPending error
//! ```
//!
//! Dropping a `Pfm` without calling [`Pfm::close`] writes nothing back, the
//! same as a crash. Cached appends are lost and a checkpoint, if one was
//! taken, stays behind for recovery.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::cache::BinCache;
use crate::config::{CheckpointMode, Config, CreateParams};
use crate::error::{FileKind, Identifier, PfmError, Result};
use crate::files::{CellState, Checkpoint, CheckpointStatus, InputFile, LineFile, ListFile, PfmPaths};
use crate::geometry::{BitWidths, Geometry, Grid};
use crate::header::{read_header, write_header, PfmHeader, HEADER_SIZE};
use crate::recompute::recompute;
use crate::record::{BinCoord, BinRecord, CoverageFlags, DepthRecord, RecordCodec, Validity};
use crate::storage::{self, BinStore, DepthStore};

/// How sounding appends reach the disk, fixed when the structure is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPath {
    /// Straight to the bin and depth stores
    Direct,
    /// Buffered in the bin cache and written on flush
    Cached,
}

/// An open PFM structure
pub struct Pfm {
    paths: PfmPaths,
    config: Config,
    header: PfmHeader,
    codec: Arc<RecordCodec>,

    bins: BinStore,
    depths: DepthStore,
    cache: BinCache,
    append_path: AppendPath,

    list: ListFile,
    lines: LineFile,
}

impl Pfm {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a new structure at `handle`.
    ///
    /// Fails if any member of the file set already exists.
    pub fn create(handle: impl AsRef<Path>, params: &CreateParams, config: Config) -> Result<Self> {
        let paths = PfmPaths::new(handle.as_ref());
        if paths.exists() {
            return Err(PfmError::AlreadyExists {
                path: paths.handle.clone(),
            });
        }
        if config.read_only {
            return Err(PfmError::ReadOnly);
        }

        // Step 1: Resolve field widths and build the header
        let widths = BitWidths::load(config.bit_config.as_deref())?;
        let mut header = PfmHeader::from_params(params, &widths)?;
        header.creation_date = timestamp();
        header.last_modified_date = header.creation_date.clone();

        let geometry = Geometry::compute(&header);
        header.coverage_map_address = (HEADER_SIZE as u64 + header.cell_count() * geometry.bin.record_size as u64) as i64;
        header.validate()?;

        // Step 2: Handle file and data directory
        fs::create_dir_all(&paths.data_dir).map_err(|source| PfmError::Create {
            kind: FileKind::Handle,
            path: paths.data_dir.clone(),
            source,
        })?;
        paths.write_handle_file()?;

        // Step 3: List and line files
        let mut list = ListFile::new(member_name(&paths.bin), member_name(&paths.index));
        if let Some(image) = &params.image_path {
            list.image_path = image.display().to_string();
        }
        if let Some(target) = &params.target_path {
            list.target_path = target.display().to_string();
        }
        list.save(&paths.list)?;
        let lines = LineFile::default();
        lines.save(&paths.line)?;

        // Step 4: Bin and index files
        let codec = Arc::new(RecordCodec::new(&header));
        let bins = BinStore::create(&paths.bin, Arc::clone(&codec), &header)?;
        let depths = DepthStore::create(&paths.index, Arc::clone(&codec))?;

        info!(
            "Created PFM structure {} ({}x{} bins, {} byte bin records, {} byte depth blocks)",
            paths.handle.display(),
            header.bin_width,
            header.bin_height,
            codec.bin_size(),
            codec.block_size()
        );

        let mut pfm = Self::assemble(paths, config, header, codec, bins, depths, list, lines);
        if pfm.config.checkpoint == CheckpointMode::Snapshot {
            pfm.checkpoint()?;
        }
        Ok(pfm)
    }

    /// Open an existing structure
    pub fn open(handle: impl AsRef<Path>, config: Config) -> Result<Self> {
        // Step 1: Locate the file set
        let paths = PfmPaths::resolve(handle.as_ref())?;

        // Step 2: Deal with a leftover checkpoint before trusting any file
        let rollback = match Checkpoint::status(&paths.checkpoint)? {
            CheckpointStatus::Absent => None,
            CheckpointStatus::Incomplete => {
                warn!("Discarding incomplete checkpoint {}", paths.checkpoint.display());
                if !config.read_only {
                    Checkpoint::remove(&paths.checkpoint)?;
                }
                None
            }
            CheckpointStatus::Complete => {
                if config.checkpoint != CheckpointMode::Recover {
                    return Err(PfmError::CheckpointPending {
                        path: paths.checkpoint.clone(),
                    });
                }
                if config.read_only {
                    return Err(PfmError::ReadOnly);
                }
                let checkpoint = Checkpoint::load(&paths.checkpoint)?;
                restore_files(&paths, &checkpoint)?;
                Some(checkpoint)
            }
        };

        // Step 3: Manifest, header, stores
        let list = ListFile::load(&paths.list)?;
        let lines = if paths.line.exists() {
            LineFile::load(&paths.line)?
        } else {
            LineFile::default()
        };

        let block = storage::read_header_block(&paths.bin)?;
        let header = read_header(&block)?;
        header.validate()?;

        let codec = Arc::new(RecordCodec::new(&header));
        let bins = BinStore::open(&paths.bin, Arc::clone(&codec), &header, config.read_only)?;
        let depths = DepthStore::open(&paths.index, Arc::clone(&codec), config.read_only)?;

        let mut pfm = Self::assemble(paths, config, header, codec, bins, depths, list, lines);

        // Step 4: Finish a rollback, or snapshot for the coming appends
        if let Some(checkpoint) = rollback {
            pfm.replay(&checkpoint)?;
            Checkpoint::remove(&pfm.paths.checkpoint)?;
        }
        if pfm.config.checkpoint == CheckpointMode::Snapshot && !pfm.config.read_only {
            pfm.checkpoint()?;
        }

        info!(
            "Opened PFM structure {} (V{}, {}x{} bins, {})",
            pfm.paths.handle.display(),
            pfm.header.format_version,
            pfm.header.bin_width,
            pfm.header.bin_height,
            if pfm.config.read_only { "read-only" } else { "read-write" }
        );
        Ok(pfm)
    }

    /// Open `handle` if it exists, otherwise create it from `params`
    pub fn open_or_create(handle: impl AsRef<Path>, params: &CreateParams, config: Config) -> Result<Self> {
        if handle.as_ref().exists() {
            Self::open(handle, config)
        } else {
            Self::create(handle, params, config)
        }
    }

    /// Roll a crashed structure back to its checkpoint and open it
    pub fn recover(handle: impl AsRef<Path>, mut config: Config) -> Result<Self> {
        config.checkpoint = CheckpointMode::Recover;
        Self::open(handle, config)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        paths: PfmPaths,
        config: Config,
        header: PfmHeader,
        codec: Arc<RecordCodec>,
        bins: BinStore,
        depths: DepthStore,
        list: ListFile,
        lines: LineFile,
    ) -> Self {
        let append_path = if config.cache.enabled {
            AppendPath::Cached
        } else {
            AppendPath::Direct
        };
        let cache = BinCache::new(Arc::clone(&codec), config.cache);

        Self {
            paths,
            config,
            header,
            codec,
            bins,
            depths,
            cache,
            append_path,
            list,
            lines,
        }
    }

    /// Write everything back and close the files.
    ///
    /// A successful close removes the checkpoint, since nothing is left to
    /// recover.
    pub fn close(mut self) -> Result<()> {
        if !self.config.read_only {
            self.flush()?;
            self.depths.sync()?;
            self.bins.sync()?;
            Checkpoint::remove(&self.paths.checkpoint)?;
        }
        info!("Closed PFM structure {}", self.paths.handle.display());
        Ok(())
    }

    /// Write cached bins and the buffered depth block
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.cache.flush(&mut self.bins, &mut self.depths)?;
        self.depths.flush()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn header(&self) -> &PfmHeader {
        &self.header
    }

    pub fn paths(&self) -> &PfmPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        self.codec.grid()
    }

    pub fn geometry(&self) -> &Geometry {
        self.codec.geometry()
    }

    pub fn append_path(&self) -> AppendPath {
        self.append_path
    }

    pub fn cache(&self) -> &BinCache {
        &self.cache
    }

    /// Bin containing a position
    pub fn coord_of(&self, x: f64, y: f64) -> Result<BinCoord> {
        self.grid().coord_of(x, y).ok_or(PfmError::PositionOutOfArea { x, y })
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.read_only {
            Err(PfmError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Write back and drop the cached copy of one cell
    fn evict(&mut self, coord: BinCoord) -> Result<()> {
        self.cache.evict(coord, &mut self.bins, &mut self.depths)
    }

    // =========================================================================
    // Bin Records
    // =========================================================================

    pub fn read_bin(&mut self, coord: BinCoord) -> Result<BinRecord> {
        if let Some(entry) = self.cache.peek(coord) {
            return Ok(entry.bin.clone());
        }
        self.bins.read(coord)
    }

    /// Bin record of the cell containing a position
    pub fn read_bin_at(&mut self, x: f64, y: f64) -> Result<BinRecord> {
        let coord = self.coord_of(x, y)?;
        self.read_bin(coord)
    }

    /// `length` consecutive bins of one row, starting at `start_col`
    pub fn read_bin_row(&mut self, row: i32, start_col: i32, length: usize) -> Result<Vec<BinRecord>> {
        let mut bins = self.bins.read_row(row, start_col, length)?;
        for bin in bins.iter_mut() {
            if let Some(entry) = self.cache.peek(bin.coord) {
                *bin = entry.bin.clone();
            }
        }
        Ok(bins)
    }

    /// Write a bin's statistics and validity.
    ///
    /// The sounding count and chain pointers belong to the depth chain and
    /// are kept from disk, whatever `bin` holds.
    pub fn write_bin(&mut self, bin: &BinRecord) -> Result<()> {
        self.ensure_writable()?;
        self.evict(bin.coord)?;

        let current = self.bins.read(bin.coord)?;
        let mut record = bin.clone();
        record.num_soundings = current.num_soundings;
        record.head = current.head;
        record.tail = current.tail;
        self.bins.write(&record)
    }

    /// Replace only the validity bits in `mask`; returns the stored record
    pub fn write_bin_validity(&mut self, bin: &BinRecord, mask: Validity) -> Result<BinRecord> {
        self.ensure_writable()?;
        self.evict(bin.coord)?;
        self.bins.write_validity(bin, mask)
    }

    // =========================================================================
    // Soundings
    // =========================================================================

    /// Append a sounding to the bin containing its position
    pub fn add_depth(&mut self, record: &DepthRecord) -> Result<()> {
        self.ensure_writable()?;
        let mut record = record.clone();
        record.coord = self.coord_of(record.xyz.x, record.xyz.y)?;
        record.address = None;

        match self.append_path {
            AppendPath::Direct => {
                self.evict(record.coord)?;
                let mut bin = self.bins.read(record.coord)?;
                self.depths.append(&mut bin, &record)?;
                self.bins.write(&bin)
            }
            AppendPath::Cached => self.cache.append(&record, &mut self.bins, &mut self.depths),
        }
    }

    /// Every sounding of a bin, in append order, each carrying its address
    pub fn read_depth_chain(&mut self, coord: BinCoord) -> Result<Vec<DepthRecord>> {
        self.evict(coord)?;
        let bin = self.bins.read(coord)?;
        self.depths.read_chain(&bin)
    }

    /// Store a new validity for a sounding previously read from a chain
    pub fn update_depth(&mut self, record: &DepthRecord) -> Result<()> {
        self.ensure_writable()?;
        if record.address.is_none() {
            return Err(PfmError::MissingDepthAddress);
        }
        self.evict(record.coord)?;
        self.depths.update_validity(record)
    }

    /// Recompute a bin's statistics from its soundings and store them.
    ///
    /// `mask` selects the validity bits ORed up from valid soundings;
    /// `None` uses [`Validity::PROPAGATED`].
    pub fn recompute_bin(&mut self, coord: BinCoord, mask: Option<Validity>) -> Result<BinRecord> {
        self.ensure_writable()?;
        self.evict(coord)?;

        let bin = self.bins.read(coord)?;
        let soundings = self.depths.read_chain(&bin)?;
        let updated = recompute(
            &bin,
            &soundings,
            mask.unwrap_or(Validity::PROPAGATED),
            self.header.null_depth,
        );
        self.bins.write(&updated)?;
        debug!("Recomputed {} from {} soundings", coord, soundings.len());
        Ok(updated)
    }

    // =========================================================================
    // Coverage
    // =========================================================================

    pub fn read_coverage(&mut self, coord: BinCoord) -> Result<CoverageFlags> {
        self.evict(coord)?;
        self.bins.read_coverage(coord)
    }

    pub fn write_coverage(&mut self, coord: BinCoord, flags: CoverageFlags) -> Result<()> {
        self.ensure_writable()?;
        self.evict(coord)?;
        self.bins.write_coverage(coord, flags)
    }

    /// Bounding box of every bin with data, `None` when there is none
    pub fn coverage_extent(&mut self) -> Result<Option<(BinCoord, BinCoord)>> {
        if !self.config.read_only {
            self.cache.flush(&mut self.bins, &mut self.depths)?;
        }
        self.bins.coverage_extent()
    }

    // =========================================================================
    // Bin Cache
    // =========================================================================

    /// Reshape/recenter the cache window; applied on the next window change
    pub fn set_cache_window(&mut self, rows: usize, cols: usize, center: Option<BinCoord>) {
        self.cache.set_window(rows, cols, center);
    }

    pub fn set_cache_max_bytes(&mut self, limit: usize) {
        self.cache.set_max_bytes(limit);
    }

    /// Flush the cache and release its window
    pub fn flush_cache(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.cache.flush(&mut self.bins, &mut self.depths)?;
        self.cache.destroy();
        Ok(())
    }

    // =========================================================================
    // Input Files and Lines
    // =========================================================================

    /// Register an input file (or find it) and return its file number
    pub fn add_input_file(&mut self, path: &str, file_type: i16) -> Result<u32> {
        self.ensure_writable()?;
        if let Some(number) = self.list.find(path) {
            return Ok(number);
        }

        let mut list = self.list.clone();
        let number = list.add(path, file_type);
        let max = self.codec.max_file_number();
        if number as u64 > max {
            return Err(PfmError::IdentifierOverflow {
                field: Identifier::File,
                value: number as u64,
                max,
            });
        }
        list.save(&self.paths.list)?;
        self.list = list;
        Ok(number)
    }

    /// Mark an input file's soundings active or deleted in the manifest
    pub fn set_input_file_active(&mut self, number: u32, active: bool) -> Result<()> {
        self.ensure_writable()?;
        self.list.set_active(number, active)?;
        self.list.save(&self.paths.list)
    }

    pub fn input_file(&self, number: u32) -> Option<&InputFile> {
        self.list.get(number)
    }

    pub fn input_files(&self) -> &[InputFile] {
        &self.list.entries
    }

    /// Register a survey line name (or find it) and return its number
    pub fn add_line(&mut self, name: &str) -> Result<u32> {
        self.ensure_writable()?;
        let mut lines = self.lines.clone();
        let number = lines.add(name);
        let max = self.codec.max_line_number();
        if number as u64 > max {
            return Err(PfmError::IdentifierOverflow {
                field: Identifier::Line,
                value: number as u64,
                max,
            });
        }
        if lines != self.lines {
            lines.save(&self.paths.line)?;
            self.lines = lines;
        }
        Ok(number)
    }

    pub fn line_name(&self, number: u32) -> Option<&str> {
        self.lines.get(number)
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Store an edited header.
    ///
    /// Only descriptive fields and summary statistics may change; anything
    /// the record layout or grid is derived from must match the open header.
    pub fn update_header(&mut self, header: &PfmHeader) -> Result<()> {
        self.ensure_writable()?;
        header.validate()?;

        let same_layout = header.num_bin_attr == self.header.num_bin_attr
            && header.num_ndx_attr == self.header.num_ndx_attr
            && Geometry::compute(header) == *self.codec.geometry()
            && Grid::from_header(header) == *self.codec.grid()
            && header.format_version == self.header.format_version
            && header.depth_scale == self.header.depth_scale
            && header.depth_offset == self.header.depth_offset
            && header.null_depth == self.header.null_depth
            && header.std_scale == self.header.std_scale
            && header.bin_attr == self.header.bin_attr
            && header.ndx_attr == self.header.ndx_attr
            && header.horizontal_error == self.header.horizontal_error
            && header.vertical_error == self.header.vertical_error
            && header.average_filt_name == self.header.average_filt_name
            && header.coverage_map_address == self.header.coverage_map_address;
        if !same_layout {
            return Err(PfmError::InvalidParams(
                "Header edit changes fields the record layout depends on".to_string(),
            ));
        }

        let mut header = header.clone();
        header.last_modified_date = timestamp();
        let block = write_header(&header)?;
        self.bins.write_header_block(&block)?;
        self.header = header;
        debug!("Header updated");
        Ok(())
    }

    /// Recompute the header's summary statistics from every bin record
    pub fn refresh_summary(&mut self) -> Result<&PfmHeader> {
        self.ensure_writable()?;
        self.cache.flush(&mut self.bins, &mut self.depths)?;

        let null = self.header.null_depth;
        let mut summary = Summary::new(null);
        let grid = *self.grid();
        for row in 0..grid.height {
            for bin in self.bins.read_row(row, 0, grid.width as usize)? {
                summary.include(&bin);
            }
        }

        let mut header = self.header.clone();
        summary.apply(&mut header);
        self.update_header(&header)?;
        Ok(&self.header)
    }

    // =========================================================================
    // Checkpoint / Recovery
    // =========================================================================

    /// Snapshot the structure so a crashed bulk load can be rolled back
    pub fn checkpoint(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.flush()?;

        let read_text = |path: &Path, kind: FileKind| {
            fs::read_to_string(path).map_err(|source| PfmError::Open {
                kind,
                path: path.to_path_buf(),
                source,
            })
        };
        let list_text = read_text(&self.paths.list, FileKind::List)?;
        let line_text = read_text(&self.paths.line, FileKind::Line)?;
        let header_block = self.bins.read_header_block()?;

        let grid = *self.grid();
        let mut cells = Vec::with_capacity(grid.cell_count() as usize);
        for row in 0..grid.height {
            for bin in self.bins.read_row(row, 0, grid.width as usize)? {
                cells.push(CellState::new(bin.num_soundings, bin.tail));
            }
        }

        let checkpoint = Checkpoint {
            list_text,
            line_text,
            header_block,
            index_size: self.depths.end(),
            cells,
        };
        checkpoint.write(&self.paths.checkpoint)?;
        info!(
            "Checkpoint taken for {} (index size {})",
            self.paths.handle.display(),
            checkpoint.index_size
        );
        Ok(())
    }

    /// Restore index size and per-cell chain state from a checkpoint
    fn replay(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let grid = *self.grid();
        if checkpoint.cells.len() as u64 != grid.cell_count() {
            return Err(PfmError::Checkpoint(format!(
                "Checkpoint has {} cells, structure has {}",
                checkpoint.cells.len(),
                grid.cell_count()
            )));
        }

        self.depths.truncate(checkpoint.index_size)?;

        let width = grid.width as usize;
        let mut restored = 0usize;
        for row in 0..grid.height {
            let start = row as usize * width;
            let states = &checkpoint.cells[start..start + width];
            for (mut bin, state) in self.bins.read_row(row, 0, width)?.into_iter().zip(states) {
                let tail = state.tail_block();
                if bin.num_soundings == state.count && bin.tail == tail {
                    continue;
                }

                bin.num_soundings = state.count;
                bin.tail = tail;
                if state.count == 0 {
                    bin.head = None;
                    bin.tail = None;
                }
                if let Some(block) = bin.tail {
                    self.depths.terminate(block)?;
                }
                self.bins.write(&bin)?;
                restored += 1;
            }
        }

        info!(
            "Recovered {} from checkpoint: {} bins rolled back, index truncated to {} bytes",
            self.paths.handle.display(),
            restored,
            checkpoint.index_size
        );
        Ok(())
    }
}

/// Put the checkpointed list file, line file and header block back in place
fn restore_files(paths: &PfmPaths, checkpoint: &Checkpoint) -> Result<()> {
    fs::write(&paths.list, &checkpoint.list_text).map_err(|source| PfmError::Write {
        kind: FileKind::List,
        offset: 0,
        source,
    })?;
    fs::write(&paths.line, &checkpoint.line_text).map_err(|source| PfmError::Write {
        kind: FileKind::Line,
        offset: 0,
        source,
    })?;

    let mut bin = storage::open_file(&paths.bin, FileKind::Bin, false)?;
    storage::write_at(&mut bin, FileKind::Bin, 0, &checkpoint.header_block)?;
    bin.sync_data()?;
    Ok(())
}

fn member_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

// -----------------------------------------------------------------------------
// Header summary statistics
// -----------------------------------------------------------------------------

/// Running extremes over all bins
struct Summary {
    null: f32,
    filtered: Option<((f32, BinCoord), (f32, BinCoord))>,
    unfiltered: Option<((f32, BinCoord), (f32, BinCoord))>,
    count: Option<((u32, BinCoord), (u32, BinCoord))>,
    std_dev: Option<(f32, f32)>,
}

impl Summary {
    fn new(null: f32) -> Self {
        Self {
            null,
            filtered: None,
            unfiltered: None,
            count: None,
            std_dev: None,
        }
    }

    fn include(&mut self, bin: &BinRecord) {
        let coord = bin.coord;
        if bin.validity.contains(Validity::DATA) {
            self.filtered = Some(extend(self.filtered, (bin.min_filtered_depth, coord), (bin.max_filtered_depth, coord)));
            self.std_dev = Some(match self.std_dev {
                None => (bin.standard_dev, bin.standard_dev),
                Some((lo, hi)) => (lo.min(bin.standard_dev), hi.max(bin.standard_dev)),
            });
        }
        if bin.num_soundings > 0 {
            self.unfiltered = Some(extend(self.unfiltered, (bin.min_depth, coord), (bin.max_depth, coord)));
            self.count = Some(extend(self.count, (bin.num_soundings, coord), (bin.num_soundings, coord)));
        }
    }

    fn apply(&self, header: &mut PfmHeader) {
        let origin = BinCoord::default();
        let ((min_f, min_fc), (max_f, max_fc)) = self.filtered.unwrap_or(((self.null, origin), (self.null, origin)));
        let ((min_d, min_dc), (max_d, max_dc)) = self.unfiltered.unwrap_or(((self.null, origin), (self.null, origin)));
        let ((min_n, min_nc), (max_n, max_nc)) = self.count.unwrap_or(((0, origin), (0, origin)));
        let (min_s, max_s) = self.std_dev.unwrap_or((0.0, 0.0));

        header.min_filtered_depth = min_f;
        header.min_filtered_coord = min_fc;
        header.max_filtered_depth = max_f;
        header.max_filtered_coord = max_fc;
        header.min_depth = min_d;
        header.min_coord = min_dc;
        header.max_depth = max_d;
        header.max_coord = max_dc;
        header.min_bin_count = min_n as i32;
        header.min_count_coord = min_nc;
        header.max_bin_count = max_n as i32;
        header.max_count_coord = max_nc;
        header.min_standard_dev = min_s;
        header.max_standard_dev = max_s;
    }
}

/// Widen a (min, max) pair, keeping the first coordinate seen on ties
fn extend<T: PartialOrd + Copy>(
    current: Option<((T, BinCoord), (T, BinCoord))>,
    low: (T, BinCoord),
    high: (T, BinCoord),
) -> ((T, BinCoord), (T, BinCoord)) {
    match current {
        None => (low, high),
        Some((min, max)) => (
            if low.0 < min.0 { low } else { min },
            if high.0 > max.0 { high } else { max },
        ),
    }
}
