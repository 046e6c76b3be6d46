pub mod backfill;
pub mod config;
pub mod events;
pub mod prefetch;
pub mod session;

mod ingest;
mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use backfill::{BackfillOutcome, SkipReason};
pub use config::SyncConfig;
pub use events::CacheUpdate;
pub use session::ChatSession;
pub use state::RoomContext;

/// Install the default `tracing` subscriber.
///
/// `RUST_LOG` overrides the filter. Does nothing if the host already set a
/// global subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("roomsync_client=debug,roomsync_net=debug,roomsync_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing();
        init_tracing();
        tracing::debug!("tracing initialised");
    }
}
