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

//! Public queue façade and lifecycle management.
//!
//! [`Queue`] is the entry point of the library: one ring engine behind one
//! mutex. Every operation takes the lock and runs to completion; there is no
//! background thread and no lock-free path.
//!
//! ## Usage
//!
//! ```ignore
//! // Create or open a queue backed by storage/events.dat
//! let queue = Queue::open("events")?;
//!
//! // Write and read payloads in FIFO order
//! queue.enqueue(b"hello")?;
//! if let Some(payload) = queue.dequeue()? {
//!     println!("{payload:?}");
//! }
//!
//! // Clean shutdown (also implicit on drop)
//! queue.close()?;
//! ```

use bytes::Bytes;
use parking_lot::Mutex;
use snafu::ResultExt;
use tracing::info;

use crate::{QueueConfig, Result, engine::RingEngine, error::IoOpenSnafu, logging};

/// A durable FIFO queue backed by a single memory-mapped file.
///
/// The queue is thread-safe: any number of threads may enqueue and dequeue
/// concurrently, serialized by an internal mutex. Payloads are opaque bytes;
/// dequeued payloads are owned copies and never alias the underlying mapping.
#[derive(Debug)]
pub struct Queue {
    name:   String,
    engine: Mutex<RingEngine>,
}

impl Queue {
    /// Open (or create) the queue `queue_name` with default configuration:
    /// data under `storage/`, logs under `logs/`, 64 MiB blocks, 1 GiB cap.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, when another process holds the file,
    /// or when an existing file fails header or record validation.
    pub fn open<S: Into<String>>(queue_name: S) -> Result<Self> {
        crate::QueueBuilder::new(queue_name).open()
    }

    pub(crate) fn with_config(name: String, config: QueueConfig) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.log_dir).context(IoOpenSnafu {
            path: &config.log_dir,
        })?;
        logging::init_file_logging(&config.log_dir);

        let engine = RingEngine::open(&name, &config)?;
        info!(queue = %name, "queue opened");

        Ok(Self {
            name,
            engine: Mutex::new(engine),
        })
    }

    /// Append a payload to the queue.
    ///
    /// Returns `Ok(false)` when the queue is full: the file has reached its
    /// cap and no space can be reclaimed. The payload is durable (up to the
    /// OS honouring the flush) once this returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when the payload cannot fit in a
    /// single block.
    pub fn enqueue<B: AsRef<[u8]>>(&self, payload: B) -> Result<bool> {
        self.engine.lock().enqueue(payload.as_ref())
    }

    /// Pop the oldest payload, or `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when the stored record fails its
    /// checksum; the record is then left in place.
    pub fn dequeue(&self) -> Result<Option<Bytes>> { self.engine.lock().dequeue() }

    /// Number of records currently in the queue.
    #[must_use]
    pub fn count(&self) -> u64 { self.engine.lock().count() }

    /// Bytes occupied by live records, including per-record framing.
    #[must_use]
    pub fn bytes_used(&self) -> u64 { self.engine.lock().bytes_used() }

    /// Whether the queue holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.engine.lock().is_empty() }

    /// Close the queue, flushing the header and releasing all mappings.
    ///
    /// Dropping the queue performs the same flush; `close` only makes the
    /// result observable.
    pub fn close(self) -> Result<()> {
        let mut engine = self.engine.into_inner();
        engine.flush()?;
        info!(queue = %self.name, "queue closed");
        Ok(())
    }
}
