//! Field width configuration
//!
//! Defaults for the widths that are not derived from caller ranges, plus the
//! optional external override file:
//!
//! ```text
//! # pfm.cfg
//! count_bits = 24
//! record_length = 8
//! ```

use std::fs;
use std::path::Path;

use crate::error::{FileKind, PfmError, Result};

/// Configured widths for fields whose size does not depend on data ranges
#[derive(Debug, Clone, PartialEq)]
pub struct BitWidths {
    pub count_bits: u32,
    pub std_bits: u32,
    pub std_scale: f32,
    pub record_pointer_bits: u32,
    pub offset_bits: u32,
    pub validity_bits: u32,
    /// Soundings per physical depth block
    pub record_length: u32,
}

impl Default for BitWidths {
    fn default() -> Self {
        Self {
            count_bits: 20,
            std_bits: 16,
            std_scale: 100.0,
            record_pointer_bits: 40,
            offset_bits: 16,
            validity_bits: 16,
            record_length: 6,
        }
    }
}

impl BitWidths {
    /// Defaults, with any overrides from `path` applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut widths = Self::default();
        if let Some(path) = path {
            widths.apply_overrides(path)?;
        }
        Ok(widths)
    }

    /// Apply `name = value` overrides from a config file.
    ///
    /// Unknown names and unparsable values are logged and ignored.
    pub fn apply_overrides(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|source| PfmError::Open {
            kind: FileKind::Config,
            path: path.to_path_buf(),
            source,
        })?;

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());

            let applied = match name {
                "count_bits" => value.parse().map(|v| self.count_bits = v).is_ok(),
                "std_bits" => value.parse().map(|v| self.std_bits = v).is_ok(),
                "std_scale" => value.parse().map(|v| self.std_scale = v).is_ok(),
                "record_pointer_bits" => value.parse().map(|v| self.record_pointer_bits = v).is_ok(),
                "offset_bits" => value.parse().map(|v| self.offset_bits = v).is_ok(),
                "validity_bits" => value.parse().map(|v| self.validity_bits = v).is_ok(),
                "record_length" => value.parse().map(|v| self.record_length = v).is_ok(),
                _ => false,
            };

            if applied {
                tracing::debug!("Bit width override {} = {}", name, value);
            } else {
                tracing::warn!("Ignoring bit width override {:?} = {:?}", name, value);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, value: u32, max: u32| {
            if value == 0 || value > max {
                Err(PfmError::InvalidParams(format!("{} must be in 1..={}, got {}", name, max, value)))
            } else {
                Ok(())
            }
        };

        check("count_bits", self.count_bits, 32)?;
        check("std_bits", self.std_bits, 32)?;
        check("record_pointer_bits", self.record_pointer_bits, 64)?;
        check("offset_bits", self.offset_bits, 32)?;
        check("validity_bits", self.validity_bits, 32)?;
        check("record_length", self.record_length, 4096)?;
        if !(self.std_scale > 0.0) {
            return Err(PfmError::InvalidParams("std_scale must be positive".to_string()));
        }
        Ok(())
    }
}

/// Number of bits needed to store every value in `0..=max_value` (at least 1)
pub fn bits_needed(max_value: u64) -> u32 {
    (64 - max_value.leading_zeros()).max(1)
}
