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

//! Rolling-file log sink.
//!
//! The queue reports its lifecycle and every raised error through `tracing`
//! events. When the process has no subscriber of its own, the first opened
//! queue installs one here: a non-blocking writer into daily-rolling files
//! under the configured log directory. Embedders that already installed a
//! global subscriber keep it; this initializer then backs off silently.
//!
//! Logging is diagnostics only and takes no part in the durability contract.

use std::{path::Path, sync::Once};

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive for the process lifetime.
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Default level filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

/// Install the global rolling-file subscriber, once per process.
pub(crate) fn init_file_logging<P: AsRef<Path>>(log_dir: P) {
    static START: Once = Once::new();

    let log_dir = log_dir.as_ref();
    START.call_once(|| {
        let appender = tracing_appender::rolling::daily(log_dir, "filequeue.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .finish();

        // Fails when the embedding application already owns the global
        // subscriber; their sink wins and our writer is torn down.
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            let _ = LOG_GUARD.set(guard);
        }
    });
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        init_file_logging(temp_dir.path());
        init_file_logging(temp_dir.path());
    }
}
