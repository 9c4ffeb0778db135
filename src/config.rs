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

use snafu::ensure;

use crate::{Result, error::InvalidConfigSnafu, header::HEADER_REGION_SIZE};

/// Default directory for queue data files.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Default directory for the rolling log files.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default size of a mapped block: 64 MiB.
pub const DEFAULT_BLOCK_SIZE: u64 = 64 * 1024 * 1024;

/// Default hard cap on the backing file length: 1 GiB.
pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Configuration for opening a queue.
///
/// `block_size` is recorded in the file header at creation and must match on
/// every subsequent open. `max_size` is only consulted at creation; an
/// existing file keeps its recorded cap.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Directory holding `<queue_name>.dat`, created if missing.
    pub storage_dir: PathBuf,
    /// Directory for log output, created if missing.
    pub log_dir:     PathBuf,
    /// Bytes per mapped block. Must be a positive multiple of 4 KiB so block
    /// offsets stay page-aligned.
    pub block_size:  u64,
    /// Hard cap on the backing file length. Must be a multiple of
    /// `block_size` and leave room for the header block plus at least one
    /// data block.
    pub max_size:    u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            log_dir:     PathBuf::from(DEFAULT_LOG_DIR),
            block_size:  DEFAULT_BLOCK_SIZE,
            max_size:    DEFAULT_MAX_SIZE,
        }
    }
}

impl QueueConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.block_size >= HEADER_REGION_SIZE,
            InvalidConfigSnafu {
                reason: format!(
                    "block_size {} is below the {HEADER_REGION_SIZE} byte minimum",
                    self.block_size
                ),
            }
        );
        ensure!(
            self.block_size % HEADER_REGION_SIZE == 0,
            InvalidConfigSnafu {
                reason: format!("block_size {} is not page-aligned", self.block_size),
            }
        );
        ensure!(
            self.max_size % self.block_size == 0,
            InvalidConfigSnafu {
                reason: format!(
                    "max_size {} is not a multiple of block_size {}",
                    self.max_size, self.block_size
                ),
            }
        );
        ensure!(
            self.max_size >= 2 * self.block_size,
            InvalidConfigSnafu {
                reason: format!(
                    "max_size {} leaves no data block beyond the header block",
                    self.max_size
                ),
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.storage_dir, PathBuf::from("storage"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.block_size, 64 * 1024 * 1024);
        assert_eq!(config.max_size, 1024 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test_case(1024, 16 * 4096 ; "block below minimum")]
    #[test_case(5000, 16 * 5000 ; "block not page aligned")]
    #[test_case(4096, 10_000 ; "max not multiple of block")]
    #[test_case(4096, 4096 ; "max smaller than two blocks")]
    fn test_validate_rejects(block_size: u64, max_size: u64) {
        let config = QueueConfig {
            block_size,
            max_size,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
