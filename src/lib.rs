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

//! Durable single-file FIFO queue with memory-mapped I/O.
//!
//! Features:
//! - Single backing file per queue with a fixed 4 KiB header region
//! - Memory-mapped blocks (64 MiB by default), mapped lazily and cached
//! - Ring-buffer reuse of drained space; the file doubles up to a hard cap
//! - Additive checksums on the header and every record
//! - Crash recovery that verifies the whole live region before serving
//! - Thread-safe: one engine mutex serializes all operations
//!
//! Anything readable after a crash is correct; flushes are explicit per
//! operation, so at worst the tail of acknowledged records is missing
//! (best-effort durability with strict integrity). A corrupt file refuses to
//! open rather than being silently truncated.

mod checksum;
mod engine;
mod file;
mod header;
mod logging;
mod record;
mod recovery;

pub mod builder;
pub mod config;
pub mod error;
pub mod queue;

pub use bytes::Bytes;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use error::{Error, Result};
pub use queue::Queue;
