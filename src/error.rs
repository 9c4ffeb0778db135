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

use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Cannot open queue file {}", path.display()))]
    IoOpen {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Queue file {} is locked by another process", path.display()))]
    Locked {
        path: PathBuf,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("Cannot map block {block_index} of {}", path.display()))]
    IoMap {
        path:        PathBuf,
        block_index: u64,
        source:      std::io::Error,
        #[snafu(implicit)]
        loc:         snafu::Location,
    },

    #[snafu(display("Cannot resize queue file to {new_len} bytes"))]
    IoResize {
        new_len: u64,
        source:  std::io::Error,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },

    #[snafu(display("Flush to disk failed"))]
    IoFlush {
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Corrupted queue header: {reason}"))]
    CorruptHeader {
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Corrupted record at offset {offset}: {reason}"))]
    CorruptRecord {
        offset: u64,
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Payload of {size} bytes exceeds the {max} byte maximum for this block size"))]
    PayloadTooLarge {
        size: u64,
        max:  u64,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("Invalid queue configuration: {reason}"))]
    InvalidConfig {
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}
