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

//! On-disk record format and ring geometry helpers.
//!
//! ## Record Frame
//!
//! Records are stored contiguously inside a single block with the following
//! binary layout:
//!
//! ```text
//! ┌─────────────────┬──────────────────────┬─────────────────┐
//! │  Length (4B)    │   Payload (variable) │   Checksum (1B) │
//! │  little-endian  │   raw bytes          │   sum mod 256   │
//! └─────────────────┴──────────────────────┴─────────────────┘
//! ```
//!
//! - **Length**: 4-byte little-endian u32 containing the payload size
//! - **Payload**: Variable-length raw bytes (the actual message data)
//! - **Checksum**: additive checksum over the payload for integrity
//!   verification
//!
//! ## Skip Markers
//!
//! A frame never straddles a block boundary, because blocks are mapped as
//! independent virtual regions. When a frame does not fit in the tail of the
//! current block, the writer stamps a skip marker (`length == u32::MAX`) and
//! continues at the next boundary. Block tails shorter than the minimum frame
//! cannot hold a marker and are skipped by readers unconditionally. The end
//! of the file is itself a block boundary, so wrap-around of the usable
//! annulus `[block_size, capacity)` takes the same path.

/// Size of the length prefix in bytes (4 bytes = u32).
pub(crate) const RECORD_LENGTH_SIZE: usize = 4;

/// Size of the additive checksum in bytes.
pub(crate) const RECORD_CHECKSUM_SIZE: usize = 1;

/// Smallest possible frame: a zero-length payload.
pub(crate) const MIN_FRAME_SIZE: u64 = (RECORD_LENGTH_SIZE + RECORD_CHECKSUM_SIZE) as u64;

/// Length value that marks padding to the next block boundary.
/// Never a valid payload length because a frame must fit inside one block.
pub(crate) const SKIP_MARKER: u32 = u32::MAX;

/// Calculate the total on-disk size of a record given its payload length.
///
/// This includes the length prefix, payload, and checksum byte.
#[inline]
pub(crate) const fn frame_disk_size(payload_len: usize) -> usize {
    RECORD_LENGTH_SIZE + payload_len + RECORD_CHECKSUM_SIZE
}

/// Bytes left in the block containing `pos`, counting from `pos`.
#[inline]
pub(crate) const fn block_remaining(pos: u64, block_size: u64) -> u64 {
    block_size - pos % block_size
}

/// First offset of the block after the one containing `pos`, wrapping the
/// usable annulus: reaching `capacity` lands on `block_size`.
#[inline]
pub(crate) const fn next_block_boundary(pos: u64, capacity: u64, block_size: u64) -> u64 {
    let next = (pos / block_size + 1) * block_size;
    if next == capacity { block_size } else { next }
}

/// Advance `pos` by `by` bytes within the usable annulus. A result of zero
/// means the position reached `capacity` exactly and wraps to `block_size`;
/// frames never straddle the file end, so no other wrap is possible.
#[inline]
pub(crate) const fn advance(pos: u64, by: u64, capacity: u64, block_size: u64) -> u64 {
    let next = (pos + by) % capacity;
    if next == 0 { block_size } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_disk_size() {
        assert_eq!(frame_disk_size(0), 5);
        assert_eq!(frame_disk_size(10), 15);
        assert_eq!(frame_disk_size(100), 105);
    }

    #[test]
    fn test_block_remaining() {
        assert_eq!(block_remaining(4096, 4096), 4096);
        assert_eq!(block_remaining(4100, 4096), 4092);
        assert_eq!(block_remaining(8191, 4096), 1);
    }

    #[test]
    fn test_next_block_boundary_wraps_at_capacity() {
        assert_eq!(next_block_boundary(4100, 16384, 4096), 8192);
        assert_eq!(next_block_boundary(12290, 16384, 4096), 4096);
    }

    #[test]
    fn test_advance_wraps_at_capacity() {
        assert_eq!(advance(4096, 10, 16384, 4096), 4106);
        assert_eq!(advance(16379, 5, 16384, 4096), 4096);
    }
}
