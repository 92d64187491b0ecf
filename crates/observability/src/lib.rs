//! Process-wide tracing setup shared by the pharmacy binaries.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize process-wide tracing with the format named by
/// `PHARMACY_LOG_FORMAT` (JSON unless set to `pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let _ = subscriber::init(LogFormat::from_env());
}
