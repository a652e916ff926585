//! Configuration for PFM
//!
//! Two kinds of configuration live here:
//! - [`Config`]: runtime options for one open structure (checkpointing,
//!   cache window, read-only access). Not persisted.
//! - [`CreateParams`]: initialization parameters of a new structure. These
//!   end up in the bin file header and fix the record geometry for life.

use std::path::PathBuf;

use crate::error::{PfmError, Result};
use crate::header::{AttributeDef, Coord2, ErrorDef, Mbr, MAX_POLYGON_POINTS, NUM_ATTR, NUM_USER_FLAGS};

/// Runtime configuration for an open PFM structure
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Crash Safety
    // -------------------------------------------------------------------------
    /// What to do about checkpoints when the structure is opened
    pub checkpoint: CheckpointMode,

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------
    /// Open every file read-only; all writes fail with `ReadOnly`
    pub read_only: bool,

    // -------------------------------------------------------------------------
    // Bin Cache
    // -------------------------------------------------------------------------
    pub cache: CacheConfig,

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------
    /// Optional `name = value` file overriding default bit widths.
    /// Only consulted when a structure is created.
    pub bit_config: Option<PathBuf>,
}

/// Checkpoint behaviour at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointMode {
    /// No checkpoint is taken; a completed leftover checkpoint blocks the open
    #[default]
    Off,

    /// Take a checkpoint right after opening (before a bulk append session)
    Snapshot,

    /// Roll back to a completed leftover checkpoint, if there is one
    Recover,
}

/// Bin cache settings
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Route sounding appends through the cache
    pub enabled: bool,

    /// Window height in bins
    pub window_rows: usize,

    /// Window width in bins
    pub window_cols: usize,

    /// Approximate byte budget before a size-triggered flush
    pub max_bytes: usize,

    /// Keep the coverage map in step when cached bins are flushed
    pub track_coverage: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_rows: 256,
            window_cols: 256,
            max_bytes: 64 * 1024 * 1024, // 64 MB
            track_coverage: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint: CheckpointMode::Off,
            read_only: false,
            cache: CacheConfig::default(),
            bit_config: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the checkpoint mode
    pub fn checkpoint(mut self, mode: CheckpointMode) -> Self {
        self.config.checkpoint = mode;
        self
    }

    /// Open read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Route appends through the bin cache
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    /// Set the cache window size (in bins)
    pub fn cache_window(mut self, rows: usize, cols: usize) -> Self {
        self.config.cache.window_rows = rows.max(1);
        self.config.cache.window_cols = cols.max(1);
        self
    }

    /// Set the cache byte budget
    pub fn cache_max_bytes(mut self, bytes: usize) -> Self {
        self.config.cache.max_bytes = bytes;
        self
    }

    /// Maintain the coverage map from cache flushes
    pub fn track_coverage(mut self, track: bool) -> Self {
        self.config.cache.track_coverage = track;
        self
    }

    /// Set the bit width override file
    pub fn bit_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.bit_config = Some(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Creation Parameters
// =============================================================================

/// Initialization parameters for a new structure
#[derive(Debug, Clone)]
pub struct CreateParams {
    /// Area covered; snapped outward to whole bins
    pub mbr: Mbr,
    /// `mbr` is in projected linear units rather than degrees
    pub projected: bool,
    /// Bin size along x, in mbr units
    pub x_bin_size: f64,
    /// Bin size along y, in mbr units
    pub y_bin_size: f64,
    /// Nominal bin size in meters (informational)
    pub bin_size_xy: f64,

    pub min_depth: f32,
    pub max_depth: f32,
    /// Stored depth resolution is `1 / depth_scale`
    pub depth_scale: f32,

    pub max_input_files: u32,
    pub max_input_lines: u32,
    pub max_input_pings: u32,
    pub max_input_beams: u32,

    pub bin_attributes: Vec<AttributeDef>,
    pub ndx_attributes: Vec<AttributeDef>,
    pub horizontal_error: Option<ErrorDef>,
    pub vertical_error: Option<ErrorDef>,

    /// Area boundary; the mbr corners are used when empty
    pub polygon: Vec<Coord2>,
    pub classification: String,
    pub creation_software: String,
    pub user_flag_names: [String; NUM_USER_FLAGS],
    pub average_filt_name: String,
    pub average_name: String,
    pub chart_scale: f32,

    pub image_path: Option<PathBuf>,
    pub target_path: Option<PathBuf>,
}

impl CreateParams {
    /// Parameters for a grid over `mbr` with the given bin sizes and the
    /// library defaults for everything else.
    pub fn new(mbr: Mbr, x_bin_size: f64, y_bin_size: f64) -> Self {
        Self {
            mbr,
            projected: false,
            x_bin_size,
            y_bin_size,
            bin_size_xy: 0.0,
            min_depth: -100.0,
            max_depth: 12000.0,
            depth_scale: 100.0,
            max_input_files: 8191,
            max_input_lines: 65535,
            max_input_pings: 16_777_215,
            max_input_beams: 1023,
            bin_attributes: Vec::new(),
            ndx_attributes: Vec::new(),
            horizontal_error: None,
            vertical_error: None,
            polygon: Vec::new(),
            classification: "UNCLASSIFIED".to_string(),
            creation_software: format!("pfm {}", crate::VERSION),
            user_flag_names: [
                "PFM_USER_01".to_string(),
                "PFM_USER_02".to_string(),
                "PFM_USER_03".to_string(),
                "PFM_USER_04".to_string(),
                "PFM_USER_05".to_string(),
            ],
            average_filt_name: "Average Filtered Depth".to_string(),
            average_name: "Average Depth".to_string(),
            chart_scale: 0.0,
            image_path: None,
            target_path: None,
        }
    }

    /// Set the depth range and resolution
    pub fn depth_range(mut self, min_depth: f32, max_depth: f32, depth_scale: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self.depth_scale = depth_scale;
        self
    }

    /// Check the parameters before any file is created
    pub fn validate(&self) -> Result<()> {
        let m = &self.mbr;
        if !(m.max_x > m.min_x && m.max_y > m.min_y) {
            return Err(PfmError::InvalidParams(format!(
                "Empty bounding rectangle ({}, {}) - ({}, {})",
                m.min_x, m.min_y, m.max_x, m.max_y
            )));
        }
        if !(self.x_bin_size > 0.0 && self.y_bin_size > 0.0) {
            return Err(PfmError::InvalidParams("Bin sizes must be positive".to_string()));
        }
        if !(self.max_depth > self.min_depth) {
            return Err(PfmError::InvalidParams(format!(
                "Depth range [{}, {}] is empty",
                self.min_depth, self.max_depth
            )));
        }
        if !(self.depth_scale > 0.0) {
            return Err(PfmError::InvalidParams("Depth scale must be positive".to_string()));
        }
        if self.bin_attributes.len() > NUM_ATTR || self.ndx_attributes.len() > NUM_ATTR {
            return Err(PfmError::TooManyAttributes {
                count: self.bin_attributes.len().max(self.ndx_attributes.len()),
                max: NUM_ATTR,
            });
        }
        for attr in self.bin_attributes.iter().chain(&self.ndx_attributes) {
            if !(attr.max >= attr.min && attr.scale > 0.0) {
                return Err(PfmError::InvalidParams(format!("Invalid attribute range for {}", attr.name)));
            }
        }
        if self.polygon.len() > MAX_POLYGON_POINTS {
            return Err(PfmError::TooManyPolygonPoints {
                count: self.polygon.len(),
                max: MAX_POLYGON_POINTS,
            });
        }
        Ok(())
    }
}
