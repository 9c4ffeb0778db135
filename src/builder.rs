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

use crate::{Queue, QueueConfig, Result};

pub struct QueueBuilder {
    name:   String,
    config: QueueConfig,
}

impl QueueBuilder {
    pub fn new<S: Into<String>>(queue_name: S) -> Self {
        Self {
            name:   queue_name.into(),
            config: QueueConfig::default(),
        }
    }

    pub fn storage_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn block_size(mut self, bytes: u64) -> Self {
        self.config.block_size = bytes;
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.config.max_size = bytes;
        self
    }

    pub fn open(self) -> Result<Queue> {
        Queue::with_config(self.name, self.config)
    }
}
