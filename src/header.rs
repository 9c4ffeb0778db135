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

//! On-disk queue header: layout, encoding, and invariant validation.
//!
//! The header occupies the first bytes of a reserved 4 KiB region at file
//! offset 0 and is the single source of truth for queue geometry and
//! positions. All integers are little-endian and packed field by field, with
//! a trailing additive checksum byte that is recomputed on every write and
//! verified on open.
//!
//! ## Binary Format
//!
//! ```text
//! ┌──────────────────┬────────┬───────────────────────────────────────────┐
//! │ field            │ offset │ semantics                                 │
//! ├──────────────────┼────────┼───────────────────────────────────────────┤
//! │ magic: u64       │ 0      │ 0xDEAD_BEEF_CAFE_BABE                     │
//! │ version: u64     │ 8      │ format version, currently 1               │
//! │ block_size: u64  │ 16     │ bytes per mapped block, fixed at creation │
//! │ max_size: u64    │ 24     │ hard cap on capacity                      │
//! │ capacity: u64    │ 32     │ current file length                       │
//! │ size: u64        │ 40     │ live bytes incl. framing and padding      │
//! │ count: u64       │ 48     │ number of live records                    │
//! │ write_pos: u64   │ 56     │ offset of the next record's length prefix │
//! │ read_pos: u64    │ 64     │ offset of the oldest live record          │
//! │ head: u64        │ 72     │ reserved, kept equal to block_size        │
//! │ tail: u64        │ 80     │ reserved, kept equal to block_size        │
//! │ checksum: u8     │ 88     │ sum mod 256 of the preceding 88 bytes     │
//! └──────────────────┴────────┴───────────────────────────────────────────┘
//! ```

use snafu::ensure;

use crate::{
    Result,
    checksum::sum_checksum,
    error::CorruptHeaderSnafu,
};

/// Bytes reserved for the header at the start of the file. Never used for
/// records.
pub(crate) const HEADER_REGION_SIZE: u64 = 4096;

/// Magic number identifying a queue file.
pub(crate) const QUEUE_MAGIC: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Current header format version.
pub(crate) const QUEUE_VERSION: u64 = 1;

/// Encoded header size: eleven u64 fields plus the checksum byte.
pub(crate) const HEADER_ENCODED_SIZE: usize = 89;

/// In-memory view of the on-disk header.
///
/// The struct is authoritative between operations: mutations are staged here
/// and only written through (re-encoded and flushed) after the operation
/// succeeded, so the persisted header always reflects the last successful
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueHeader {
    pub magic:      u64,
    pub version:    u64,
    pub block_size: u64,
    pub max_size:   u64,
    pub capacity:   u64,
    pub size:       u64,
    pub count:      u64,
    pub write_pos:  u64,
    pub read_pos:   u64,
    pub head:       u64,
    pub tail:       u64,
}

impl QueueHeader {
    /// Header for a freshly created file: empty queue, both positions at the
    /// start of the usable region.
    pub fn new(block_size: u64, max_size: u64, capacity: u64) -> Self {
        Self {
            magic: QUEUE_MAGIC,
            version: QUEUE_VERSION,
            block_size,
            max_size,
            capacity,
            size: 0,
            count: 0,
            write_pos: block_size,
            read_pos: block_size,
            head: block_size,
            tail: block_size,
        }
    }

    /// Encode the header, recomputing the trailing checksum.
    pub fn encode(&self) -> [u8; HEADER_ENCODED_SIZE] {
        let mut buf = [0u8; HEADER_ENCODED_SIZE];
        let fields = [
            self.magic,
            self.version,
            self.block_size,
            self.max_size,
            self.capacity,
            self.size,
            self.count,
            self.write_pos,
            self.read_pos,
            self.head,
            self.tail,
        ];
        for (i, field) in fields.iter().enumerate() {
            buf[i * 8..(i + 1) * 8].copy_from_slice(&field.to_le_bytes());
        }
        buf[HEADER_ENCODED_SIZE - 1] = sum_checksum(&buf[..HEADER_ENCODED_SIZE - 1]);
        buf
    }

    /// Decode a header, verifying the stored checksum.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure!(
            buf.len() >= HEADER_ENCODED_SIZE,
            CorruptHeaderSnafu {
                reason: format!(
                    "header region holds {} bytes, expected at least {HEADER_ENCODED_SIZE}",
                    buf.len()
                ),
            }
        );

        let stored = buf[HEADER_ENCODED_SIZE - 1];
        let computed = sum_checksum(&buf[..HEADER_ENCODED_SIZE - 1]);
        ensure!(
            stored == computed,
            CorruptHeaderSnafu {
                reason: format!("header checksum mismatch: stored={stored:#04x}, computed={computed:#04x}"),
            }
        );

        let field = |i: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[i * 8..(i + 1) * 8]);
            u64::from_le_bytes(bytes)
        };

        Ok(Self {
            magic:      field(0),
            version:    field(1),
            block_size: field(2),
            max_size:   field(3),
            capacity:   field(4),
            size:       field(5),
            count:      field(6),
            write_pos:  field(7),
            read_pos:   field(8),
            head:       field(9),
            tail:       field(10),
        })
    }

    /// Check every header invariant against the configured block size and the
    /// real file length. Any violation refuses the open.
    pub fn validate(&self, configured_block_size: u64, file_len: u64) -> Result<()> {
        ensure!(
            self.magic == QUEUE_MAGIC,
            CorruptHeaderSnafu {
                reason: format!("magic number mismatch: {:#018x}", self.magic),
            }
        );
        ensure!(
            self.version == QUEUE_VERSION,
            CorruptHeaderSnafu {
                reason: format!("unsupported version {}", self.version),
            }
        );
        ensure!(
            self.block_size == configured_block_size,
            CorruptHeaderSnafu {
                reason: format!(
                    "block size mismatch: file uses {}, configured {configured_block_size}",
                    self.block_size
                ),
            }
        );
        ensure!(
            self.block_size >= HEADER_REGION_SIZE && self.block_size % HEADER_REGION_SIZE == 0,
            CorruptHeaderSnafu {
                reason: format!("invalid block size {}", self.block_size),
            }
        );
        ensure!(
            self.capacity % self.block_size == 0 && self.capacity <= self.max_size,
            CorruptHeaderSnafu {
                reason: format!(
                    "invalid capacity {} for block size {} and max size {}",
                    self.capacity, self.block_size, self.max_size
                ),
            }
        );
        ensure!(
            file_len == self.capacity,
            CorruptHeaderSnafu {
                reason: format!(
                    "file length {file_len} does not match recorded capacity {}",
                    self.capacity
                ),
            }
        );
        ensure!(
            (self.block_size..self.capacity).contains(&self.read_pos)
                && (self.block_size..self.capacity).contains(&self.write_pos),
            CorruptHeaderSnafu {
                reason: format!(
                    "positions out of range: read_pos={}, write_pos={}",
                    self.read_pos, self.write_pos
                ),
            }
        );
        ensure!(
            self.size <= self.capacity - self.block_size,
            CorruptHeaderSnafu {
                reason: format!("recorded size {} exceeds the usable region", self.size),
            }
        );
        ensure!(
            (self.count == 0) == (self.size == 0),
            CorruptHeaderSnafu {
                reason: format!("count {} and size {} disagree", self.count, self.size),
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::Error;

    fn valid_header() -> QueueHeader { QueueHeader::new(4096, 16 * 4096, 4 * 4096) }

    #[test]
    fn test_new_header_positions() {
        let header = valid_header();
        assert_eq!(header.magic, QUEUE_MAGIC);
        assert_eq!(header.version, QUEUE_VERSION);
        assert_eq!(header.write_pos, 4096);
        assert_eq!(header.read_pos, 4096);
        assert_eq!(header.size, 0);
        assert_eq!(header.count, 0);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut header = valid_header();
        header.size = 1234;
        header.count = 7;
        header.write_pos = 5330;

        let encoded = header.encode();
        let decoded = QueueHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_rejects_checksum_mismatch() {
        let mut encoded = valid_header().encode();
        encoded[40] ^= 0x01;

        let err = QueueHeader::decode(&encoded).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { .. }));
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(QueueHeader::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_validate_accepts_fresh_header() {
        valid_header().validate(4096, 4 * 4096).unwrap();
    }

    fn bad_magic(h: &mut QueueHeader) { h.magic = 0; }

    fn bad_version(h: &mut QueueHeader) { h.version = 2; }

    fn capacity_above_max(h: &mut QueueHeader) { h.capacity = 32 * 4096; }

    fn read_pos_in_header_block(h: &mut QueueHeader) { h.read_pos = 100; }

    fn write_pos_past_end(h: &mut QueueHeader) { h.write_pos = 4 * 4096; }

    fn size_exceeds_usable(h: &mut QueueHeader) {
        h.size = 4 * 4096;
        h.count = 1;
    }

    fn count_without_size(h: &mut QueueHeader) { h.count = 3; }

    #[test_case(bad_magic ; "magic mismatch")]
    #[test_case(bad_version ; "unsupported version")]
    #[test_case(capacity_above_max ; "capacity above max size")]
    #[test_case(read_pos_in_header_block ; "read position inside header block")]
    #[test_case(write_pos_past_end ; "write position past capacity")]
    #[test_case(size_exceeds_usable ; "size larger than usable region")]
    #[test_case(count_without_size ; "count and size disagree")]
    fn test_validate_rejects(mutate: fn(&mut QueueHeader)) {
        let mut header = valid_header();
        mutate(&mut header);

        let file_len = header.capacity;
        let err = header.validate(4096, file_len).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { .. }));
    }

    #[test]
    fn test_validate_rejects_block_size_mismatch() {
        let header = valid_header();
        let err = header.validate(8192, 4 * 4096).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { .. }));
    }

    #[test]
    fn test_validate_rejects_file_length_mismatch() {
        let header = valid_header();
        let err = header.validate(4096, 5 * 4096).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { .. }));
    }
}
