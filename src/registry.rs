//! Handle registry
//!
//! Integer handles for callers that cannot hold a [`Pfm`] directly. Up to
//! [`MAX_OPEN`] structures may be open at once; a closed handle's slot is
//! reused by the next open.
//!
//! The registry also remembers the text of the most recent failure made
//! through it, for front ends that report errors as status codes and fetch
//! the message separately.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::{Config, CreateParams};
use crate::error::{PfmError, Result};
use crate::pfm::Pfm;

/// Maximum number of simultaneously open structures
pub const MAX_OPEN: usize = 128;

/// Index of an open structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub i32);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table of open structures
pub struct Registry {
    slots: Vec<Option<Pfm>>,
    last_error: String,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            last_error: String::new(),
        }
    }

    /// Open an existing structure and return its handle
    pub fn open(&mut self, path: impl AsRef<Path>, config: Config) -> Result<Handle> {
        let result = self.free_slot().and_then(|slot| {
            let pfm = Pfm::open(path, config)?;
            Ok(self.install(slot, pfm))
        });
        self.record(result)
    }

    /// Create a new structure and return its handle
    pub fn create(&mut self, path: impl AsRef<Path>, params: &CreateParams, config: Config) -> Result<Handle> {
        let result = self.free_slot().and_then(|slot| {
            let pfm = Pfm::create(path, params, config)?;
            Ok(self.install(slot, pfm))
        });
        self.record(result)
    }

    /// Borrow an open structure
    pub fn get(&mut self, handle: Handle) -> Result<&mut Pfm> {
        let slot = usize::try_from(handle.0).ok();
        match slot.and_then(|i| self.slots.get_mut(i)).and_then(Option::as_mut) {
            Some(pfm) => Ok(pfm),
            None => {
                let err = PfmError::InvalidHandle(handle.0);
                self.last_error = err.to_string();
                Err(err)
            }
        }
    }

    /// Run `op` against an open structure, remembering any failure
    pub fn with<T>(&mut self, handle: Handle, op: impl FnOnce(&mut Pfm) -> Result<T>) -> Result<T> {
        let result = self.get(handle).and_then(op);
        self.record(result)
    }

    /// Flush and close one structure, freeing its handle
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let taken = usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
            .and_then(Option::take);
        let result = match taken {
            Some(pfm) => pfm.close(),
            None => Err(PfmError::InvalidHandle(handle.0)),
        };
        if result.is_ok() {
            debug!("Handle {} released", handle);
        }
        self.record(result)
    }

    /// Close every open structure. Returns the first failure, after trying
    /// them all.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first = Ok(());
        for slot in self.slots.iter_mut() {
            if let Some(pfm) = slot.take() {
                if let Err(e) = pfm.close() {
                    if first.is_ok() {
                        first = Err(e);
                    }
                }
            }
        }
        self.record(first)
    }

    /// Number of open structures
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Message of the most recent failure, empty if none
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn free_slot(&self) -> Result<usize> {
        if let Some(i) = self.slots.iter().position(Option::is_none) {
            return Ok(i);
        }
        if self.slots.len() < MAX_OPEN {
            Ok(self.slots.len())
        } else {
            Err(PfmError::TooManyOpen { max: MAX_OPEN })
        }
    }

    fn install(&mut self, slot: usize, pfm: Pfm) -> Handle {
        if slot == self.slots.len() {
            self.slots.push(Some(pfm));
        } else {
            self.slots[slot] = Some(pfm);
        }
        debug!("Handle {} assigned", slot);
        Handle(slot as i32)
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = e.to_string();
        }
        result
    }
}
