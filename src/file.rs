// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Backing file and block mapping management.
//!
//! [`BlockFile`] owns the file handle, an exclusive advisory lock, the 4 KiB
//! header mapping, and a cache of per-block read/write mappings. Blocks are
//! mapped lazily on first access and retained until the file is dropped.
//!
//! Each block is an independent mapping of exactly `block_size` bytes at file
//! offset `block_index * block_size`, so the mapped regions are NOT adjacent
//! in virtual memory. Every read and write therefore addresses a single
//! block; the callers guarantee that no access crosses a block boundary.

use std::{
    collections::{HashMap, hash_map::Entry},
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use memmap2::{MmapMut, MmapOptions};
use snafu::{ResultExt, ensure};
use tracing::{debug, warn};

use crate::{
    Result,
    error::{CorruptHeaderSnafu, IoFlushSnafu, IoMapSnafu, IoOpenSnafu, IoResizeSnafu, LockedSnafu},
    header::{HEADER_ENCODED_SIZE, HEADER_REGION_SIZE},
};

#[derive(Debug)]
pub(crate) struct BlockFile {
    file:       File,
    path:       PathBuf,
    block_size: u64,
    len:        u64,
    header_map: MmapMut,
    blocks:     HashMap<u64, MmapMut>,
}

impl BlockFile {
    /// Open the backing file, creating it (and its parent directories) with
    /// `initial_capacity` bytes if it does not exist yet.
    ///
    /// Returns the file and whether it was freshly created. An exclusive
    /// advisory lock is taken for the lifetime of the handle; a second opener
    /// fails with [`Locked`](crate::Error::Locked).
    pub fn open_or_create(
        path: &Path,
        block_size: u64,
        initial_capacity: u64,
    ) -> Result<(Self, bool)> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(IoOpenSnafu { path })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .context(IoOpenSnafu { path })?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(source) if source.kind() == fs2::lock_contended_error().kind() => {
                return LockedSnafu { path }.fail();
            }
            Err(source) => return Err(source).context(IoOpenSnafu { path }),
        }

        let len = file.metadata().context(IoOpenSnafu { path })?.len();
        let created = len == 0;
        let len = if created {
            file.set_len(initial_capacity).context(IoResizeSnafu {
                new_len: initial_capacity,
            })?;
            initial_capacity
        } else {
            ensure!(
                len >= HEADER_REGION_SIZE,
                CorruptHeaderSnafu {
                    reason: format!("file is only {len} bytes, too short for a header"),
                }
            );
            len
        };

        // SAFETY: the file is exclusively locked above; nothing else mutates
        // it while the mapping is alive, and the mapping never outlives the
        // owning handle.
        let header_map = unsafe {
            MmapOptions::new()
                .len(HEADER_REGION_SIZE as usize)
                .map_mut(&file)
        }
        .context(IoMapSnafu {
            path,
            block_index: 0u64,
        })?;

        debug!(path = %path.display(), len, created, "opened queue file");

        Ok((
            Self {
                file,
                path: path.to_path_buf(),
                block_size,
                len,
                header_map,
                blocks: HashMap::new(),
            },
            created,
        ))
    }

    pub fn len(&self) -> u64 { self.len }

    /// Extend the file. The caller guarantees the new length is larger,
    /// block-aligned, and within the recorded cap; the new tail reads as
    /// zeroes.
    pub fn grow(&mut self, new_len: u64) -> Result<()> {
        debug_assert!(new_len > self.len);
        debug_assert!(new_len % self.block_size == 0);

        self.file
            .set_len(new_len)
            .context(IoResizeSnafu { new_len })?;
        self.len = new_len;
        Ok(())
    }

    /// The mapping for `block_index`, created on first access.
    fn block_mut(&mut self, block_index: u64) -> Result<&mut MmapMut> {
        match self.blocks.entry(block_index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let offset = block_index * self.block_size;
                debug_assert!(offset + self.block_size <= self.len);

                // SAFETY: same exclusive-lock argument as the header mapping.
                let map = unsafe {
                    MmapOptions::new()
                        .offset(offset)
                        .len(self.block_size as usize)
                        .map_mut(&self.file)
                }
                .context(IoMapSnafu {
                    path: &self.path,
                    block_index,
                })?;

                debug!(block_index, offset, "mapped queue block");
                Ok(entry.insert(map))
            }
        }
    }

    /// Write `data` at the absolute file offset. The range must lie inside a
    /// single block and outside the header block.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        debug_assert!(offset >= self.block_size, "records never touch the header block");

        let start = (offset % self.block_size) as usize;
        debug_assert!(
            start + data.len() <= self.block_size as usize,
            "write crosses a block boundary"
        );

        let block_size = self.block_size;
        let map = self.block_mut(offset / block_size)?;
        map[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Read `buf.len()` bytes from the absolute file offset. Same range rules
    /// as [`write_at`](Self::write_at).
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        debug_assert!(offset >= self.block_size, "records never touch the header block");

        let start = (offset % self.block_size) as usize;
        debug_assert!(
            start + buf.len() <= self.block_size as usize,
            "read crosses a block boundary"
        );

        let block_size = self.block_size;
        let map = self.block_mut(offset / block_size)?;
        buf.copy_from_slice(&map[start..start + buf.len()]);
        Ok(())
    }

    /// Ask the OS to flush the given block's mapping. The header block is
    /// flushed through [`write_header`](Self::write_header) instead and is
    /// skipped here; unmapped blocks have nothing to flush.
    pub fn flush_block(&self, block_index: u64) -> Result<()> {
        if block_index == 0 {
            return Ok(());
        }
        if let Some(map) = self.blocks.get(&block_index) {
            map.flush().context(IoFlushSnafu)?;
        }
        Ok(())
    }

    /// The encoded header bytes currently on disk.
    pub fn header_bytes(&self) -> &[u8] { &self.header_map[..HEADER_ENCODED_SIZE] }

    /// Write the encoded header through the header mapping and flush it.
    pub fn write_header(&mut self, encoded: &[u8; HEADER_ENCODED_SIZE]) -> Result<()> {
        self.header_map[..HEADER_ENCODED_SIZE].copy_from_slice(encoded);
        self.header_map.flush().context(IoFlushSnafu)
    }
}

impl Drop for BlockFile {
    fn drop(&mut self) {
        if let Err(error) = self.header_map.flush() {
            warn!(%error, path = %self.path.display(), "final header flush failed");
        }
        debug!(
            path = %self.path.display(),
            blocks = self.blocks.len(),
            "queue file unmapped"
        );
    }
}
