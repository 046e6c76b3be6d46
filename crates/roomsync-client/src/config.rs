//! Sync configuration loaded from environment variables.
//!
//! All settings have defaults, so a session can start with zero
//! configuration.

use std::time::Duration;

use roomsync_shared::constants::{DEFAULT_BACKFILL_TIMEOUT_MS, DEFAULT_UPDATE_BUFFER};

/// Client sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on a single backfill request. A stalled request is
    /// abandoned after this and its room can be backfilled again.
    /// Env: `ROOMSYNC_BACKFILL_TIMEOUT_MS`
    /// Default: 10 s
    pub backfill_timeout: Duration,

    /// Capacity of the cache-update broadcast channel.
    /// Env: `ROOMSYNC_UPDATE_BUFFER`
    /// Default: `256`
    pub update_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backfill_timeout: Duration::from_millis(DEFAULT_BACKFILL_TIMEOUT_MS),
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("ROOMSYNC_BACKFILL_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.backfill_timeout = Duration::from_millis(ms),
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid ROOMSYNC_BACKFILL_TIMEOUT_MS, using default"
                    );
                }
            }
        }

        if let Some(val) = lookup("ROOMSYNC_UPDATE_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.update_buffer = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid ROOMSYNC_UPDATE_BUFFER, using default");
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
