//! Shared helpers for integration tests

use recollect::types::now_millis;
use recollect::ContextEntry;

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Build an entry with a fixed id and timestamp
pub fn entry_at(id: &str, content: &str, context_type: &str, timestamp: i64) -> ContextEntry {
    let mut entry = ContextEntry::new(content, context_type);
    entry.id = id.to_string();
    entry.metadata.timestamp = timestamp;
    entry
}

/// Build an entry with a fixed id and the current timestamp
pub fn entry(id: &str, content: &str, context_type: &str) -> ContextEntry {
    entry_at(id, content, context_type, now_millis())
}
