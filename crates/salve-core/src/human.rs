//! Human-readable sizes and durations.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Format a byte count with a coarse unit.
///
/// Units only kick in at 16 of the next unit down, so small values keep
/// their precision: `16383` is `"16383 bytes"`, `16384` is `"16 KB"`.
pub fn human_size(bytes: u64) -> String
{
    if bytes >= GIB {
        format!("{} GB", bytes / GIB)
    } else if bytes >= 16 * MIB {
        format!("{} MB", bytes / MIB)
    } else if bytes >= 16 * KIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Format a duration given in seconds.
///
/// ## Example
///
/// ```rust
/// use salve_core::human::human_time;
///
/// assert_eq!(human_time(3.0 * 3600.0), "3 hours");
/// assert_eq!(human_time(2.0), "2.000000 s");
/// assert_eq!(human_time(0.25), "250.000000 ms");
/// ```
pub fn human_time(seconds: f64) -> String
{
    const MINUTE: f64 = 60.0;
    const HOUR: f64 = 60.0 * MINUTE;
    const DAY: f64 = 24.0 * HOUR;

    if seconds > 48.0 * HOUR {
        format!("{} days", (seconds / DAY) as u64)
    } else if seconds > 120.0 * MINUTE {
        format!("{} hours", (seconds / HOUR) as u64)
    } else if seconds >= 90.0 {
        format!("{} mins", (seconds / MINUTE) as u64)
    } else if seconds >= 1.0 || seconds <= 0.0 {
        format!("{seconds:.6} s")
    } else if seconds <= 1e-3 {
        format!("{:.6} us", seconds * 1e6)
    } else {
        format!("{:.6} ms", seconds * 1e3)
    }
}
