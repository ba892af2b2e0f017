//! Process-wide logging setup shared by the binaries.

/// Initialize tracing with the format chosen by `LOG_FORMAT`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    tracing::init(format);
}

pub mod tracing;

pub use self::tracing::LogFormat;
