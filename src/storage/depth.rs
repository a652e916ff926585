//! Depth chain store
//!
//! The index file is a flat sequence of fixed-size blocks. Each bin owns a
//! singly linked chain of blocks; the i-th sounding appended to a bin lives
//! in block `i / record_length` of its chain, slot `i % record_length`.
//!
//! The store holds one block in memory. Appends fill it in place and it is
//! written back when another block is needed or on [`DepthStore::flush`].

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{FileKind, PfmError, Result};
use crate::geometry::allocate;
use crate::record::{BinRecord, BlockRef, DepthAddress, DepthRecord, RecordCodec};

use super::{create_file, open_file, read_at, write_at};

pub struct DepthStore {
    file: File,
    codec: Arc<RecordCodec>,

    /// Contents of `current`
    block: Vec<u8>,

    /// Block held in `block`, if any
    current: Option<BlockRef>,

    /// `block` has changes not yet written
    dirty: bool,

    /// End of the index file, including allocated but unwritten blocks
    end: u64,
}

impl DepthStore {
    pub fn create(path: &Path, codec: Arc<RecordCodec>) -> Result<Self> {
        let file = create_file(path, FileKind::Index)?;
        Self::from_file(file, codec, 0)
    }

    pub fn open(path: &Path, codec: Arc<RecordCodec>, read_only: bool) -> Result<Self> {
        let file = open_file(path, FileKind::Index, read_only)?;
        let end = file.metadata()?.len();
        Self::from_file(file, codec, end)
    }

    fn from_file(file: File, codec: Arc<RecordCodec>, end: u64) -> Result<Self> {
        let block = allocate(codec.block_size())?;
        Ok(Self {
            file,
            codec,
            block,
            current: None,
            dirty: false,
            end,
        })
    }

    /// Current logical size of the index file
    pub fn end(&self) -> u64 {
        self.end
    }

    // -------------------------------------------------------------------------
    // Block management
    // -------------------------------------------------------------------------

    /// Reserve a new block at the end of the file
    pub fn allocate(&mut self) -> BlockRef {
        let block = BlockRef(self.end);
        self.end += self.codec.block_size() as u64;
        trace!("allocated depth block @ {}", block);
        block
    }

    /// Make `block` the buffered block
    fn load(&mut self, block: BlockRef) -> Result<()> {
        if self.current == Some(block) {
            return Ok(());
        }
        self.flush()?;

        let size = self.codec.block_size() as u64;
        if block.offset() + size > self.end {
            return Err(PfmError::Read {
                kind: FileKind::Index,
                offset: block.offset(),
                source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "block past end of index file"),
            });
        }

        self.current = None;
        read_at(&mut self.file, FileKind::Index, block.offset(), &mut self.block)?;
        self.current = Some(block);
        Ok(())
    }

    /// Start a fresh zeroed block in the buffer
    fn start(&mut self, block: BlockRef) -> Result<()> {
        self.flush()?;
        self.block.fill(0);
        self.current = Some(block);
        self.dirty = true;
        Ok(())
    }

    /// Write the buffered block if it has changed
    pub fn flush(&mut self) -> Result<()> {
        if let (true, Some(block)) = (self.dirty, self.current) {
            trace!("depth block write @ {}", block);
            write_at(&mut self.file, FileKind::Index, block.offset(), &self.block)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Copy of one block's bytes, including unflushed changes
    pub fn read_block(&mut self, block: BlockRef) -> Result<Vec<u8>> {
        self.load(block)?;
        Ok(self.block.clone())
    }

    /// Overwrite one block, keeping the buffer coherent
    pub fn write_block(&mut self, block: BlockRef, data: &[u8]) -> Result<()> {
        if self.current == Some(block) {
            self.block.copy_from_slice(data);
            self.dirty = false;
        }
        write_at(&mut self.file, FileKind::Index, block.offset(), data)?;
        self.end = self.end.max(block.offset() + data.len() as u64);
        Ok(())
    }

    // =========================================================================
    // Chain operations
    // =========================================================================

    /// Append one sounding to the chain of `bin`.
    ///
    /// Updates the count and head/tail pointers of `bin`; the caller writes
    /// the bin record afterwards. On error `bin` is left unchanged.
    pub fn append(&mut self, bin: &mut BinRecord, record: &DepthRecord) -> Result<DepthAddress> {
        let count = bin.num_soundings as u64;
        let max = self.codec.max_count();
        if count >= max {
            return Err(PfmError::TooManySoundings { coord: bin.coord, max });
        }
        self.codec.check_identifiers(record)?;

        let record_length = self.codec.record_length();
        let slot = (count % record_length as u64) as usize;

        let block = if count == 0 {
            let block = self.allocate();
            self.start(block)?;
            bin.head = Some(block);
            block
        } else {
            let tail = bin.tail.ok_or_else(|| PfmError::BrokenChain {
                coord: bin.coord,
                reason: format!("{} soundings but no tail block", count),
            })?;
            self.load(tail)?;

            if slot == 0 {
                // Tail is full: link a new block behind it
                let block = self.allocate();
                self.codec.set_continuation(&mut self.block, Some(block));
                self.dirty = true;
                self.start(block)?;
                block
            } else {
                tail
            }
        };

        self.codec.encode_sounding(&mut self.block, slot, record);
        self.dirty = true;

        bin.tail = Some(block);
        bin.num_soundings += 1;
        Ok(DepthAddress { block, slot })
    }

    /// Every sounding of `bin`, in append order
    pub fn read_chain(&mut self, bin: &BinRecord) -> Result<Vec<DepthRecord>> {
        let record_length = self.codec.record_length();
        let mut remaining = bin.num_soundings as usize;
        let mut soundings = Vec::with_capacity(remaining);
        let mut next = bin.head;

        while remaining > 0 {
            let block = next.ok_or_else(|| PfmError::BrokenChain {
                coord: bin.coord,
                reason: format!(
                    "chain ends after {} of {} soundings",
                    soundings.len(),
                    bin.num_soundings
                ),
            })?;
            self.load(block)?;

            let used = remaining.min(record_length);
            for slot in 0..used {
                let address = DepthAddress { block, slot };
                soundings.push(self.codec.decode_sounding(&self.block, slot, bin.coord, Some(address)));
            }
            remaining -= used;
            next = self.codec.continuation(&self.block);
        }

        Ok(soundings)
    }

    /// Rewrite the validity of a sounding previously read from a chain.
    ///
    /// The stored file/ping/beam identifiers must match `record`; a mismatch
    /// means the address is stale and nothing is written.
    pub fn update_validity(&mut self, record: &DepthRecord) -> Result<()> {
        let address = record.address.ok_or(PfmError::MissingDepthAddress)?;
        self.load(address.block)?;

        let (file, ping, beam) = self.codec.identity(&self.block, address.slot);
        if (file, ping, beam) != (record.file_number, record.ping_number, record.beam_number) {
            return Err(PfmError::StaleDepthAddress {
                address: address.block.offset(),
                slot: address.slot,
                expected_file: record.file_number,
                expected_ping: record.ping_number,
                expected_beam: record.beam_number,
                found_file: file,
                found_ping: ping,
                found_beam: beam,
            });
        }

        self.codec.set_sounding_validity(&mut self.block, address.slot, record.validity);
        self.dirty = true;
        self.flush()
    }

    /// Clear the continuation pointer of `block` (recovery rollback)
    pub fn terminate(&mut self, block: BlockRef) -> Result<()> {
        self.load(block)?;
        if self.codec.continuation(&self.block).is_some() {
            self.codec.set_continuation(&mut self.block, None);
            self.dirty = true;
        }
        self.flush()
    }

    /// Cut the file back to `len` bytes, dropping the buffered block
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        debug!("Truncating index file from {} to {} bytes", self.end, len);
        self.current = None;
        self.dirty = false;
        self.file.set_len(len).map_err(|source| PfmError::Write {
            kind: FileKind::Index,
            offset: len,
            source,
        })?;
        self.end = len;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.file.sync_data().map_err(PfmError::Io)
    }
}
