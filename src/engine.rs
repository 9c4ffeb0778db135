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

//! The ring engine: enqueue, dequeue, growth, and reclamation.
//!
//! Records live in the annulus `[block_size, capacity)` of the backing file.
//! `write_pos` chases `read_pos` around the annulus; drained space behind
//! `read_pos` is overwritten by later enqueues. The file grows (doubling up
//! to `max_size`) when the live bytes would exceed the usable region.
//!
//! Every mutation follows the same discipline: write record bytes, flush the
//! touched block, then stage the header change in memory and write it
//! through. An error at any point leaves the persisted header at the last
//! successful operation.

use bytes::Bytes;
use snafu::ensure;
use tracing::{debug, info, warn};

use crate::{
    Result,
    checksum::{sum_checksum, verify_checksum},
    config::QueueConfig,
    error::{CorruptRecordSnafu, PayloadTooLargeSnafu},
    file::BlockFile,
    header::QueueHeader,
    record::{
        MIN_FRAME_SIZE, RECORD_CHECKSUM_SIZE, RECORD_LENGTH_SIZE, SKIP_MARKER, advance,
        block_remaining, frame_disk_size, next_block_boundary,
    },
    recovery,
};

#[derive(Debug)]
pub(crate) struct RingEngine {
    file:   BlockFile,
    header: QueueHeader,
}

impl RingEngine {
    /// Open or create the queue file for `name` under the configured storage
    /// directory.
    ///
    /// A fresh file gets an initialized header flushed before any record can
    /// be written. An existing file is validated and its whole live region
    /// checksum-verified; any inconsistency refuses the open.
    pub fn open(name: &str, config: &QueueConfig) -> Result<Self> {
        config.validate()?;

        let path = config.storage_dir.join(format!("{name}.dat"));
        let initial_capacity = (4 * config.block_size).min(config.max_size);

        let (mut file, created) =
            BlockFile::open_or_create(&path, config.block_size, initial_capacity)?;

        let header = if created {
            let header = QueueHeader::new(config.block_size, config.max_size, initial_capacity);
            file.write_header(&header.encode())?;
            info!(
                path = %path.display(),
                capacity = initial_capacity,
                block_size = config.block_size,
                "created new queue file"
            );
            header
        } else {
            let header = QueueHeader::decode(file.header_bytes()).inspect_err(
                |error| warn!(%error, path = %path.display(), "rejecting queue file"),
            )?;
            header
                .validate(config.block_size, file.len())
                .inspect_err(|error| warn!(%error, path = %path.display(), "rejecting queue file"))?;
            recovery::verify_live_region(&mut file, &header)?;
            info!(
                path = %path.display(),
                count = header.count,
                size = header.size,
                capacity = header.capacity,
                "opened existing queue file"
            );
            header
        };

        Ok(Self { file, header })
    }

    pub fn count(&self) -> u64 { self.header.count }

    pub fn bytes_used(&self) -> u64 { self.header.size }

    pub fn is_empty(&self) -> bool { self.header.count == 0 }

    /// Append a record. Returns `false` when the queue is full: the file is
    /// at its cap and no space can be reclaimed.
    pub fn enqueue(&mut self, payload: &[u8]) -> Result<bool> {
        let frame = frame_disk_size(payload.len()) as u64;

        ensure!(
            frame <= self.header.block_size,
            PayloadTooLargeSnafu {
                size: payload.len() as u64,
                max:  self.header.block_size - MIN_FRAME_SIZE,
            }
        );

        let pad = loop {
            let pad = self.pad_before_write(frame);
            if self.header.size + frame + pad <= self.usable_capacity() {
                break pad;
            }

            if self.header.capacity < self.header.max_size && self.is_contiguous() {
                self.grow_file()?;
                continue;
            }

            // At capacity. A fully drained queue can collapse its pointers
            // back to the start of the data region; anything else is full.
            if self.header.count == 0 && self.header.write_pos != self.header.block_size {
                self.reset_positions()?;
                continue;
            }

            debug!(
                size = self.header.size,
                capacity = self.header.capacity,
                "queue is full and no space can be reclaimed"
            );
            return Ok(false);
        };

        let mut pos = self.header.write_pos;
        if pad > 0 {
            if pad >= RECORD_LENGTH_SIZE as u64 {
                self.file.write_at(pos, &SKIP_MARKER.to_le_bytes())?;
                self.file.flush_block(pos / self.header.block_size)?;
            }
            pos = next_block_boundary(pos, self.header.capacity, self.header.block_size);
        }

        let length = payload.len() as u32;
        self.file.write_at(pos, &length.to_le_bytes())?;
        self.file
            .write_at(pos + RECORD_LENGTH_SIZE as u64, payload)?;
        self.file.write_at(
            pos + RECORD_LENGTH_SIZE as u64 + payload.len() as u64,
            &[sum_checksum(payload)],
        )?;
        self.file.flush_block(pos / self.header.block_size)?;

        let mut updated = self.header;
        updated.write_pos = advance(pos, frame, updated.capacity, updated.block_size);
        updated.size += frame + pad;
        updated.count += 1;
        self.commit_header(updated)?;

        debug!(
            offset = pos,
            length,
            pad,
            size = self.header.size,
            count = self.header.count,
            "record enqueued"
        );
        Ok(true)
    }

    /// Pop the oldest record, or `None` when the queue is empty.
    ///
    /// The payload is copied out of the mapping into an owned buffer; the
    /// returned bytes never alias mapped memory. On a checksum mismatch the
    /// read position is left untouched and the error is surfaced.
    pub fn dequeue(&mut self) -> Result<Option<Bytes>> {
        if self.header.count == 0 {
            debug!("queue is empty");
            return Ok(None);
        }

        let (pos, skipped) = self.skip_padding(self.header.read_pos)?;

        let mut len_buf = [0u8; RECORD_LENGTH_SIZE];
        self.file.read_at(pos, &mut len_buf)?;
        let length = u64::from(u32::from_le_bytes(len_buf));
        let frame = RECORD_LENGTH_SIZE as u64 + length + RECORD_CHECKSUM_SIZE as u64;

        ensure!(
            frame <= self.header.size - skipped
                && frame <= block_remaining(pos, self.header.block_size),
            CorruptRecordSnafu {
                offset: pos,
                reason: format!("record length {length} exceeds the live region"),
            }
        );

        let mut payload = vec![0u8; length as usize];
        self.file
            .read_at(pos + RECORD_LENGTH_SIZE as u64, &mut payload)?;

        let mut stored = [0u8; RECORD_CHECKSUM_SIZE];
        self.file
            .read_at(pos + RECORD_LENGTH_SIZE as u64 + length, &mut stored)?;

        ensure!(
            verify_checksum(&payload, stored[0]),
            CorruptRecordSnafu {
                offset: pos,
                reason: "payload checksum mismatch",
            }
        );

        let mut updated = self.header;
        updated.read_pos = advance(pos, frame, updated.capacity, updated.block_size);
        updated.size -= skipped + frame;
        updated.count -= 1;
        self.commit_header(updated)?;

        debug!(
            offset = pos,
            length,
            size = self.header.size,
            count = self.header.count,
            "record dequeued"
        );
        Ok(Some(Bytes::from(payload)))
    }

    /// Re-encode the current header and flush it through its mapping.
    pub fn flush(&mut self) -> Result<()> { self.file.write_header(&self.header.encode()) }

    /// Write a staged header through to disk, adopting it in memory only on
    /// success so the in-memory view always matches the last successful
    /// operation.
    fn commit_header(&mut self, updated: QueueHeader) -> Result<()> {
        self.file.write_header(&updated.encode())?;
        self.header = updated;
        Ok(())
    }

    fn usable_capacity(&self) -> u64 { self.header.capacity - self.header.block_size }

    /// Padding needed before a frame of the given size can be written at
    /// `write_pos` without crossing a block boundary.
    fn pad_before_write(&self, frame: u64) -> u64 {
        let remaining = block_remaining(self.header.write_pos, self.header.block_size);
        if frame <= remaining { 0 } else { remaining }
    }

    /// Whether the live region is a single span. Growing a wrapped ring would
    /// strand the wrapped prefix beyond the old end of file, so growth is
    /// restricted to this state.
    fn is_contiguous(&self) -> bool {
        self.header.count == 0 || self.header.write_pos > self.header.read_pos
    }

    /// Advance `pos` past any padding: block tails too short for a frame and
    /// stretches stamped with the skip marker. Returns the first record
    /// position and the padding byte count; the header is not touched.
    fn skip_padding(&mut self, mut pos: u64) -> Result<(u64, u64)> {
        let mut skipped = 0u64;
        loop {
            let remaining = block_remaining(pos, self.header.block_size);
            if remaining >= MIN_FRAME_SIZE {
                let mut len_buf = [0u8; RECORD_LENGTH_SIZE];
                self.file.read_at(pos, &mut len_buf)?;
                if u32::from_le_bytes(len_buf) != SKIP_MARKER {
                    return Ok((pos, skipped));
                }
            }

            skipped += remaining;
            ensure!(
                skipped < self.header.size,
                CorruptRecordSnafu {
                    offset: pos,
                    reason: "padding consumed the whole live region",
                }
            );
            pos = next_block_boundary(pos, self.header.capacity, self.header.block_size);
        }
    }

    fn grow_file(&mut self) -> Result<()> {
        let doubled = (self.header.capacity * 2).min(self.header.max_size);
        let new_capacity = doubled.max(self.header.capacity + self.header.block_size);

        self.file.grow(new_capacity)?;

        let mut updated = self.header;
        updated.capacity = new_capacity;
        self.commit_header(updated)?;

        info!(capacity = new_capacity, "queue file grown");
        Ok(())
    }

    /// Collapse a fully drained queue back to the start of the data region.
    fn reset_positions(&mut self) -> Result<()> {
        debug_assert!(self.header.count == 0 && self.header.size == 0);

        let mut updated = self.header;
        updated.read_pos = updated.block_size;
        updated.write_pos = updated.block_size;
        self.commit_header(updated)?;

        debug!("drained queue collapsed to the start of the data region");
        Ok(())
    }
}
