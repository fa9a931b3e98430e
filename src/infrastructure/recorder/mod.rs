//! File-backed sinks: the per-session row log and the calibration point log.
//!
//! Both open, append and close the file for every row so that rows already
//! written survive a crash.

pub mod calibration_log;
pub mod row_log;

pub use calibration_log::CalibrationLog;
pub use row_log::RowLog;

/// Replace anything but ASCII alphanumerics, `-` and `_` so an identifier is
/// safe inside a file name.
pub(crate) fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
