//! Structured logging schema and subscriber setup for chainchat.
//!
//! All crates use these field names for consistent structured logging so
//! log tooling can query every subsystem the same way. The `tracing` macros
//! spell the names literally; the constants are the reference list.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed in a way the user must act on |
//! | WARN  | Recoverable issue, suspicious input (e.g. metadata mismatch) |
//! | INFO  | Lifecycle events (identity created, store opened) |
//! | DEBUG | Per-operation completions with sizes and durations |
//! | TRACE | Key store reads and writes |
//!
//! Key material, passphrases and plaintext are never logged. Public keys are
//! logged only as fingerprints.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "crypto", "keystore", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "identity", "registry", "text_cipher", "file_cipher", "file_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "get_or_create", "encrypt", "decrypt", "persist"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Normalized peer identifier (e.g. wallet address).
pub const PEER_ID: &str = "peer_id";

/// Public key fingerprint (`ccfp:...`).
pub const FINGERPRINT: &str = "fingerprint";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in microseconds.
pub const DURATION_US: &str = "duration_us";

/// Byte length of an input payload.
pub const INPUT_LEN: &str = "input_len";

/// Byte length of an output payload.
pub const OUTPUT_LEN: &str = "output_len";

/// Number of entries in a key store.
pub const ENTRY_COUNT: &str = "entry_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "chainchat=info,chainchat_crypto=info,chainchat_core=info";

/// Initialize the global tracing subscriber.
///
/// Console output goes to stderr so command output on stdout stays
/// machine-readable. When `config.file` is set, events are written to a
/// daily-rotated file instead and the returned guard must be kept alive
/// until shutdown to flush buffered lines.
///
/// Returns `None` for console output. If a global subscriber is already
/// installed, the call leaves it in place.
pub fn init_tracing(config: &LogConfig, default_filter: &str) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = config.file {
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("chainchat.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let _ = match config.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        // no ANSI in files unless asked for
                        .with_ansi(config.ansi.unwrap_or(false)),
                )
                .try_init(),
        };
        Some(guard)
    } else {
        let _ = match config.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Text => {
                let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
                if let Some(ansi) = config.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).try_init()
            }
        };
        None
    }
}
