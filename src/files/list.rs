//! List file (input file manifest) and line file
//!
//! ## List File Format
//! ```text
//! PFM Software - PFM library V6.30        <- banner, gates entry syntax
//! survey.pfm.bin                          <- bin file
//! survey.pfm.ndx                          <- index file
//! /data/mosaic.tif                        <- image file (may be blank)
//! /data/targets.xml                       <- target file (may be blank)
//! + 00000 0002 /data/line_001.gsf         <- V4.0+: active, number, type, path
//! - 00001 0002 /data/line_002.gsf         <- '-' marks a deleted input
//! ```
//! Before V3.0 entries are a bare path; before V4.0 the type is absent.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{FileKind, PfmError, Result};
use crate::header::FormatVersion;

/// First version whose entries carry an active marker and number
const NUMBERED: FormatVersion = FormatVersion::new(3, 0);

/// One input file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub number: u32,
    /// `false` once the file's soundings have been deleted
    pub active: bool,
    pub file_type: i16,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFile {
    pub version: FormatVersion,
    pub bin_path: String,
    pub index_path: String,
    pub image_path: String,
    pub target_path: String,
    pub entries: Vec<InputFile>,
}

impl ListFile {
    pub fn new(bin_path: impl Into<String>, index_path: impl Into<String>) -> Self {
        Self {
            version: FormatVersion::CURRENT,
            bin_path: bin_path.into(),
            index_path: index_path.into(),
            image_path: String::new(),
            target_path: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PfmError::Open {
            kind: FileKind::List,
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| PfmError::Write {
            kind: FileKind::List,
            offset: 0,
            source,
        })
    }

    /// Parse list file text; `source` is only used in error messages
    pub fn parse(text: &str, source: &Path) -> Result<Self> {
        let mut lines = text.lines();

        let banner = lines.next().unwrap_or_default();
        let version = FormatVersion::from_banner(banner).ok_or_else(|| PfmError::MissingVersion {
            path: source.to_path_buf(),
        })?;
        if version > FormatVersion::CURRENT {
            return Err(PfmError::NewerVersion {
                found: version,
                supported: FormatVersion::CURRENT,
            });
        }

        let mut path_line = |what: &str| {
            lines
                .next()
                .map(|line| line.trim().to_string())
                .ok_or_else(|| PfmError::CorruptListFile(format!("{}: missing {} path", source.display(), what)))
        };
        let bin_path = path_line("bin")?;
        let index_path = path_line("index")?;
        let image_path = path_line("image").unwrap_or_default();
        let target_path = path_line("target").unwrap_or_default();

        let mut entries = Vec::new();
        for (i, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = parse_entry(line, entries.len() as u32, version)
                .ok_or_else(|| PfmError::CorruptListFile(format!("{}: bad entry on line {}", source.display(), i + 6)))?;
            entries.push(entry);
        }

        Ok(Self {
            version,
            bin_path,
            index_path,
            image_path,
            target_path,
            entries,
        })
    }

    /// Text form, in the syntax of this file's version
    pub fn render(&self) -> String {
        let mut text = format!(
            "{}\n{}\n{}\n{}\n{}\n",
            self.version.banner(),
            self.bin_path,
            self.index_path,
            self.image_path,
            self.target_path
        );
        for entry in &self.entries {
            let mark = if entry.active { '+' } else { '-' };
            let line = if self.version < NUMBERED {
                entry.path.clone()
            } else if self.version < FormatVersion::ATTRIBUTES {
                format!("{} {:05} {}", mark, entry.number, entry.path)
            } else {
                format!("{} {:05} {:04} {}", mark, entry.number, entry.file_type, entry.path)
            };
            text.push_str(&line);
            text.push('\n');
        }
        text
    }

    /// Register an input file and return its number
    pub fn add(&mut self, path: &str, file_type: i16) -> u32 {
        let number = self.entries.iter().map(|e| e.number + 1).max().unwrap_or(0);
        debug!("Input file {} = {}", number, path);
        self.entries.push(InputFile {
            number,
            active: true,
            file_type,
            path: path.to_string(),
        });
        number
    }

    pub fn get(&self, number: u32) -> Option<&InputFile> {
        self.entries.iter().find(|e| e.number == number)
    }

    /// Number of an already registered path
    pub fn find(&self, path: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.path == path).map(|e| e.number)
    }

    pub fn set_active(&mut self, number: u32, active: bool) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.number == number)
            .ok_or_else(|| PfmError::InvalidParams(format!("No input file number {}", number)))?;
        entry.active = active;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(line: &str, number: u32, version: FormatVersion) -> Option<InputFile> {
    if version < NUMBERED {
        return Some(InputFile {
            number,
            active: true,
            file_type: 0,
            path: line.trim().to_string(),
        });
    }

    let fields = if version < FormatVersion::ATTRIBUTES { 3 } else { 4 };
    let mut parts = line.trim().splitn(fields, ' ');

    let active = match parts.next()? {
        "+" => true,
        "-" => false,
        _ => return None,
    };
    let number: u32 = parts.next()?.parse().ok()?;
    let file_type = if fields == 4 { parts.next()?.parse().ok()? } else { 0 };
    let path = parts.next()?.trim().to_string();

    Some(InputFile {
        number,
        active,
        file_type,
        path,
    })
}

// =============================================================================
// Line File
// =============================================================================

/// Survey line names; a sounding's line number indexes this table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFile {
    names: Vec<String>,
}

impl LineFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PfmError::Open {
            kind: FileKind::Line,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        Self {
            names: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.names.iter().map(|name| format!("{}\n", name)).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|source| PfmError::Write {
            kind: FileKind::Line,
            offset: 0,
            source,
        })
    }

    /// Add a line name (or find an existing one) and return its number
    pub fn add(&mut self, name: &str) -> u32 {
        if let Some(number) = self.names.iter().position(|n| n == name) {
            return number as u32;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn get(&self, number: u32) -> Option<&str> {
        self.names.get(number as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
