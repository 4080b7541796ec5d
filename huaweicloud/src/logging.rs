//! Log setup
//!
//! The host captures stderr, so events go there. `TF_LOG` picks the level.

use tracing::Level;

pub const LOG_LEVEL_ENV: &str = "TF_LOG";

/// Installs the stderr subscriber. Calling it again, or after another
/// subscriber was installed, is a no-op.
pub fn init() {
    let level = level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

pub fn level_from(value: Option<&str>) -> Level {
    match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("WARN") => Level::WARN,
        Some("ERROR") => Level::ERROR,
        _ => Level::INFO,
    }
}
