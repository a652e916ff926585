//! Handle file and file-set paths

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FileKind, PfmError, Result};
use crate::header::FormatVersion;

const DATA_DIR_KEY: &str = "Data Directory =";

/// Paths of every member of one structure's file set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfmPaths {
    pub handle: PathBuf,
    pub data_dir: PathBuf,
    pub list: PathBuf,
    pub line: PathBuf,
    pub bin: PathBuf,
    pub index: PathBuf,
    pub checkpoint: PathBuf,
}

impl PfmPaths {
    /// Default layout for a new structure: `<handle>.data/<name>.{ctl,lin,bin,ndx}`
    pub fn new(handle: &Path) -> Self {
        let mut dir = handle.as_os_str().to_os_string();
        dir.push(".data");
        Self::with_data_dir(handle, PathBuf::from(dir))
    }

    pub fn with_data_dir(handle: &Path, data_dir: PathBuf) -> Self {
        let name = handle
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pfm".to_string());
        let member = |ext: &str| data_dir.join(format!("{}.{}", name, ext));

        Self {
            handle: handle.to_path_buf(),
            list: member("ctl"),
            line: member("lin"),
            bin: member("bin"),
            index: member("ndx"),
            checkpoint: member("ctl.chk"),
            data_dir,
        }
    }

    /// Locate the file set of an existing structure through its handle file
    pub fn resolve(handle: &Path) -> Result<Self> {
        if !handle.exists() {
            return Err(PfmError::NotFound {
                path: handle.to_path_buf(),
            });
        }
        let text = fs::read_to_string(handle).map_err(|source| PfmError::Open {
            kind: FileKind::Handle,
            path: handle.to_path_buf(),
            source,
        })?;

        let version = FormatVersion::from_banner(&text).ok_or_else(|| PfmError::MissingVersion {
            path: handle.to_path_buf(),
        })?;
        if version > FormatVersion::CURRENT {
            return Err(PfmError::NewerVersion {
                found: version,
                supported: FormatVersion::CURRENT,
            });
        }

        let data_dir = text
            .lines()
            .find_map(|line| line.trim().strip_prefix(DATA_DIR_KEY))
            .map(|dir| PathBuf::from(dir.trim()));

        Ok(match data_dir {
            Some(dir) if dir.is_absolute() => Self::with_data_dir(handle, dir),
            Some(dir) => {
                let parent = handle.parent().unwrap_or_else(|| Path::new(""));
                Self::with_data_dir(handle, parent.join(dir))
            }
            None => Self::new(handle),
        })
    }

    /// Write the handle file, pointing at the data directory
    pub fn write_handle_file(&self) -> Result<()> {
        let dir = match (self.data_dir.parent(), self.handle.parent()) {
            (Some(a), Some(b)) if a == b => self.data_dir.file_name().map(PathBuf::from),
            _ => None,
        }
        .unwrap_or_else(|| self.data_dir.clone());

        let text = format!(
            "PFM Handle File - {}\n{} {}\n",
            FormatVersion::CURRENT.banner(),
            DATA_DIR_KEY,
            dir.display()
        );
        fs::write(&self.handle, text).map_err(|source| PfmError::Create {
            kind: FileKind::Handle,
            path: self.handle.clone(),
            source,
        })
    }

    /// Any member of the set is present
    pub fn exists(&self) -> bool {
        self.handle.exists() || self.bin.exists()
    }
}
