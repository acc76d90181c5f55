//! Memory dumps in a fixed 16-column layout.
//!
//! ```text
//! offset   00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F [ptr=0x55d0c2a0 sz=5]
//! 0x55d0c2a0  h  e  l  l  o  .  .  .  .  .  .  .  .  .  .  . asc
//! 0x55d0c2a0 68 65 6c 6c 6f ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? ?? hex
//! ```
//!
//! Each 16-byte row is shown twice: printable ASCII first, then hex.

use std::fmt::Write as _;

/// Bytes per row.
pub const ROW_WIDTH: usize = 16;

/// Most bytes shown in one dump.
pub const MAX_DUMP: usize = ROW_WIDTH * 16;

const COLUMNS: &str = "00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F";

/// Dump `bytes`, labelling rows with their address in memory.
pub fn hexdump(bytes: &[u8]) -> String
{
    hexdump_at(bytes, bytes.as_ptr() as usize as u64)
}

/// Dump `bytes` as if they started at `origin`.
///
/// Only the first [`MAX_DUMP`] bytes are shown; the header reports the full
/// length.
///
/// ## Example
///
/// ```rust
/// use salve_core::hexdump::hexdump_at;
///
/// let dump = hexdump_at(b"hi", 0x1000);
/// assert!(dump.starts_with("offset   00 01"));
/// assert!(dump.contains("0x1000 68 69 ?? "));
/// ```
pub fn hexdump_at(bytes: &[u8], origin: u64) -> String
{
    let shown = &bytes[..bytes.len().min(MAX_DUMP)];
    let rows = shown.len().div_ceil(ROW_WIDTH);
    let mut out = String::with_capacity(80 * (1 + 2 * rows));

    // fmt::Write for String never fails
    let _ = writeln!(out, "{:<8} {COLUMNS} [ptr={origin:#x} sz={}]", "offset", bytes.len());

    for (row, chunk) in shown.chunks(ROW_WIDTH).enumerate() {
        let address = origin.wrapping_add((row * ROW_WIDTH) as u64);

        let _ = write!(out, "{address:#x} ");
        for column in 0..ROW_WIDTH {
            let shown = match chunk.get(column) {
                Some(&byte) if (32..127).contains(&byte) => byte as char,
                _ => '.',
            };
            let _ = write!(out, " {shown} ");
        }
        out.push_str("asc\n");

        let _ = write!(out, "{address:#x} ");
        for column in 0..ROW_WIDTH {
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, "{byte:02x} ");
                }
                None => out.push_str("?? "),
            }
        }
        out.push_str("hex\n");
    }

    out
}
