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

//! Live-region verification on open.
//!
//! After the header itself validates, the whole live region is walked before
//! the queue is allowed to serve: starting at `read_pos`, exactly `size`
//! bytes are consumed, skipping block padding the same way dequeue does and
//! verifying the checksum of every record. Any inconsistency refuses the
//! open; a corrupt file is never silently truncated or reset.

use snafu::ensure;
use tracing::{debug, warn};

use crate::{
    Result,
    checksum::verify_checksum,
    error::{CorruptHeaderSnafu, CorruptRecordSnafu},
    file::BlockFile,
    header::QueueHeader,
    record::{
        MIN_FRAME_SIZE, RECORD_CHECKSUM_SIZE, RECORD_LENGTH_SIZE, SKIP_MARKER, advance,
        block_remaining, next_block_boundary,
    },
};

/// Walk the live region and verify every record in it.
pub(crate) fn verify_live_region(file: &mut BlockFile, header: &QueueHeader) -> Result<()> {
    if header.size == 0 {
        return Ok(());
    }

    let mut pos = header.read_pos;
    let mut remaining = header.size;
    let mut records = 0u64;

    while remaining > 0 {
        let block_tail = block_remaining(pos, header.block_size);

        // Padding: a tail too short for any frame, or a stamped skip marker.
        let padded = if block_tail < MIN_FRAME_SIZE {
            true
        } else {
            let mut len_buf = [0u8; RECORD_LENGTH_SIZE];
            file.read_at(pos, &mut len_buf)?;
            u32::from_le_bytes(len_buf) == SKIP_MARKER
        };

        if padded {
            ensure!(
                block_tail <= remaining,
                CorruptRecordSnafu {
                    offset: pos,
                    reason: "padding extends past the live region",
                }
            );
            remaining -= block_tail;
            pos = next_block_boundary(pos, header.capacity, header.block_size);
            continue;
        }

        let mut len_buf = [0u8; RECORD_LENGTH_SIZE];
        file.read_at(pos, &mut len_buf)?;
        let length = u64::from(u32::from_le_bytes(len_buf));
        let frame = RECORD_LENGTH_SIZE as u64 + length + RECORD_CHECKSUM_SIZE as u64;

        ensure!(
            frame <= remaining && frame <= block_tail,
            CorruptRecordSnafu {
                offset: pos,
                reason: format!("record length {length} exceeds the live region"),
            }
        );

        let mut payload = vec![0u8; length as usize];
        file.read_at(pos + RECORD_LENGTH_SIZE as u64, &mut payload)?;

        let mut stored = [0u8; RECORD_CHECKSUM_SIZE];
        file.read_at(pos + RECORD_LENGTH_SIZE as u64 + length, &mut stored)?;

        if !verify_checksum(&payload, stored[0]) {
            warn!(offset = pos, length, "record checksum mismatch during recovery");
            return CorruptRecordSnafu {
                offset: pos,
                reason: "payload checksum mismatch",
            }
            .fail();
        }

        pos = advance(pos, frame, header.capacity, header.block_size);
        remaining -= frame;
        records += 1;
    }

    ensure!(
        records == header.count,
        CorruptHeaderSnafu {
            reason: format!(
                "live region holds {records} records, header records {}",
                header.count
            ),
        }
    );

    debug!(records, bytes = header.size, "live region verified");
    Ok(())
}
