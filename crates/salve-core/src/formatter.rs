//! # Trace Formatting
//!
//! Renders resolved frames through a small line template.
//!
//! A template is plain text with three placeholder bytes:
//!
//! | Byte   | Replaced with                                   |
//! |--------|-------------------------------------------------|
//! | `\x01` | 1-based frame number, counted after skipping     |
//! | `\x02` | the frame: symbol and source position, or `????` |
//! | `\x03` | the raw frame address (`0x...`)                   |
//!
//! Every other character is copied through. The template is expanded once per
//! frame; [`format`] concatenates the expansions, so a template that should
//! produce one line per frame ends in `\n` ([`DEFAULT_TEMPLATE`] does).

use std::fmt::{self, Write as _};

use crate::symbols;
use crate::types::{Address, CapturedStack, ResolvedFrame};
use crate::unwind::{default_capacity, FrameCapturer};

/// `#1 main (src/main.rs, line 3)` followed by a newline.
pub const DEFAULT_TEMPLATE: &str = "#\x01 \x02\n";

const INDEX_SLOT: char = '\x01';
const FRAME_SLOT: char = '\x02';
const ADDRESS_SLOT: char = '\x03';

/// Expand `template` once per frame, after dropping `skip_initial` frames.
///
/// Returns an empty vector when nothing is left to format.
pub fn format_lines(frames: &[ResolvedFrame], template: &str, skip_initial: usize) -> Vec<String>
{
    frames
        .iter()
        .skip(skip_initial)
        .enumerate()
        .map(|(index, frame)| expand(template, index + 1, frame))
        .collect()
}

/// Like [`format_lines`], concatenated into one string.
///
/// ## Example
///
/// ```rust
/// use salve_core::formatter::{format, DEFAULT_TEMPLATE};
/// use salve_core::types::{Address, ResolvedFrame};
///
/// let frames = vec![ResolvedFrame::unresolved(Address::from(0x1000))];
/// assert_eq!(format(&frames, DEFAULT_TEMPLATE, 0), "#1 ????\n");
/// assert_eq!(format(&[], DEFAULT_TEMPLATE, 0), "");
/// ```
pub fn format(frames: &[ResolvedFrame], template: &str, skip_initial: usize) -> String
{
    format_lines(frames, template, skip_initial).concat()
}

fn expand(template: &str, index: usize, frame: &ResolvedFrame) -> String
{
    let mut out = String::with_capacity(template.len() + 64);
    // fmt::Write for String never fails
    let _ = expand_into(&mut out, template, index, frame);
    out
}

fn expand_into(out: &mut String, template: &str, index: usize, frame: &ResolvedFrame) -> fmt::Result
{
    for c in template.chars() {
        match c {
            INDEX_SLOT => write!(out, "{index}")?,
            FRAME_SLOT => write!(out, "{frame}")?,
            ADDRESS_SLOT => write!(out, "{:#x}", frame.address)?,
            other => out.push(other),
        }
    }
    Ok(())
}

/// Resolve `stack` with the process-wide session and format it.
///
/// The first `skip_initial` frames are dropped before resolving.
pub fn render(stack: &CapturedStack, template: &str, skip_initial: usize) -> String
{
    let remaining = stack.frames().get(skip_initial..).unwrap_or(&[]);
    let frames = symbols::global().resolve_frames(remaining);
    format(&frames, template, 0)
}

/// Capture, resolve and format the caller's stack in one go.
///
/// The first line describes the function that called `stacktrace`, unless
/// `skip_initial` drops it.
///
/// ## Example
///
/// ```rust
/// use salve_core::formatter::{stacktrace, DEFAULT_TEMPLATE};
///
/// let trace = stacktrace(DEFAULT_TEMPLATE, 0);
/// for line in trace.lines() {
///     assert!(line.starts_with('#'));
/// }
/// ```
#[inline(never)]
pub fn stacktrace(template: &str, skip_initial: usize) -> String
{
    let anchor = Address::of_fn(stacktrace as fn(&str, usize) -> String as usize);
    let stack = FrameCapturer::global().capture_from(Some(anchor), skip_initial, default_capacity());
    let frames = symbols::resolve(&stack);
    format(&frames, template, 0)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{SourceLocation, Symbol, SymbolLanguage, SymbolName};

    fn named(address: u64, name: &str) -> ResolvedFrame
    {
        ResolvedFrame {
            address: Address::from(address),
            symbol: Some(Symbol::new(SymbolName::new(name.into(), None, SymbolLanguage::C), None)),
        }
    }

    fn three_frames() -> Vec<ResolvedFrame>
    {
        vec![
            named(0x1000, "inner"),
            ResolvedFrame {
                address: Address::from(0x2000u64),
                symbol: Some(Symbol::new(
                    SymbolName::new("middle".into(), None, SymbolLanguage::C),
                    Some(SourceLocation {
                        file: "src/lib.rs".into(),
                        line: Some(12),
                        column: None,
                    }),
                )),
            },
            ResolvedFrame::unresolved(Address::from(0x3000u64)),
        ]
    }

    #[test]
    fn test_empty_input_formats_to_nothing()
    {
        assert_eq!(format(&[], DEFAULT_TEMPLATE, 0), "");
        assert!(format_lines(&[], DEFAULT_TEMPLATE, 0).is_empty());
    }

    #[test]
    fn test_default_template_numbers_lines()
    {
        let text = format(&three_frames(), DEFAULT_TEMPLATE, 0);
        assert_eq!(text, "#1 inner\n#2 middle (src/lib.rs, line 12)\n#3 ????\n");
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_skip_renumbers_from_one()
    {
        let lines = format_lines(&three_frames(), "\x01:\x02", 1);
        assert_eq!(lines, vec!["1:middle (src/lib.rs, line 12)", "2:????"]);
    }

    #[test]
    fn test_skip_everything_is_empty()
    {
        assert_eq!(format(&three_frames(), DEFAULT_TEMPLATE, 3), "");
        assert_eq!(format(&three_frames(), DEFAULT_TEMPLATE, 99), "");
    }

    #[test]
    fn test_address_slot_and_literal_text()
    {
        let lines = format_lines(&three_frames()[..1], "[\x03] \x02 #\x01\x01", 0);
        assert_eq!(lines, vec!["[0x1000] inner #11"]);
    }

    #[test]
    fn test_template_without_slots_repeats()
    {
        assert_eq!(format(&three_frames(), "-", 0), "---");
    }

    #[test]
    fn test_render_skips_before_resolving()
    {
        let stack = CapturedStack::from_addresses([0x10u64, 0x20, 0x30].map(Address::from), 8);
        assert_eq!(render(&stack, "\x03;", 1), "0x20;0x30;");
        assert_eq!(render(&stack, "\x03;", 5), "");
    }
}
