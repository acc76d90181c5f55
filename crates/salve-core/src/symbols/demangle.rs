//! Symbol demangling utilities.
//!
//! Compilers "mangle" symbol names to encode namespaces and types. This module
//! turns Rust manglings back into the names written in source:
//!
//! - **Rust legacy**: `_ZN...E`, with a trailing `h<hash>` segment
//! - **Rust v0**: `_R...`
//!
//! Anything else, including already-demangled names, is returned unchanged.
//!
//! ## Language Detection
//!
//! The language of a symbol is guessed from its mangling pattern:
//!
//! - Rust symbols: Start with `_R` or `_ZN`, or contain `::`
//! - C++ symbols: Start with `_Z` (Itanium mangling)
//! - C symbols: Everything else

use rustc_demangle::try_demangle;

use crate::types::{SymbolLanguage, SymbolName};

/// Demangle a single symbol name.
///
/// A `+0x<hex>` offset suffix, as printed by `backtrace_symbols(3)`, is kept
/// around the decoded name. The hash segment of legacy Rust symbols is
/// omitted. On any failure the input is returned unchanged, and so is a name
/// whose decoded form would itself decode again, so applying this function
/// twice gives the same result as applying it once.
///
/// ## Example
///
/// ```rust
/// use salve_core::symbols::demangle;
///
/// assert_eq!(demangle("_ZN4core3ptr13drop_in_place17h0123456789abcdefE"), "core::ptr::drop_in_place");
/// assert_eq!(demangle("main"), "main");
/// ```
pub fn demangle(name: &str) -> String
{
    let (symbol, offset) = split_offset(name);
    match decode(symbol) {
        Some(demangled) => format!("{demangled}{offset}"),
        None => name.to_string(),
    }
}

/// Decode `symbol`, refusing results that are themselves manglings.
fn decode(symbol: &str) -> Option<String>
{
    let demangled = format!("{:#}", try_demangle(symbol).ok()?);
    if try_demangle(&demangled).is_ok() {
        return None;
    }
    Some(demangled)
}

/// Split `name+0x1f` into `("name", "+0x1f")`.
fn split_offset(name: &str) -> (&str, &str)
{
    if let Some(pos) = name.rfind("+0x") {
        let digits = &name[pos + 3..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return name.split_at(pos);
        }
    }
    (name, "")
}

/// Create a `SymbolName` from a raw linkage name.
///
/// The raw name is kept as found in the object file; the demangled form is
/// filled in when [`demangle`] could decode it.
pub(crate) fn make_symbol_name(raw: String) -> SymbolName
{
    let demangled = decode(&raw);
    let language = detect_language(&raw);
    SymbolName::new(raw, demangled, language)
}

fn detect_language(raw: &str) -> SymbolLanguage
{
    if raw.starts_with("_R") || raw.starts_with("_ZN") || raw.contains("::") {
        SymbolLanguage::Rust
    } else if raw.starts_with("_Z") {
        SymbolLanguage::Cpp
    } else if raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        SymbolLanguage::C
    } else {
        SymbolLanguage::Unknown
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const LEGACY: &str = "_ZN4core3ptr13drop_in_place17h0123456789abcdefE";
    const V0: &str = "_RNvCs1234_7mycrate3foo";

    #[test]
    fn test_demangle_legacy_drops_hash()
    {
        assert_eq!(demangle(LEGACY), "core::ptr::drop_in_place");
    }

    #[test]
    fn test_demangle_v0()
    {
        assert_eq!(demangle(V0), "mycrate::foo");
    }

    #[test]
    fn test_demangle_keeps_offset()
    {
        assert_eq!(demangle(&format!("{LEGACY}+0x1f")), "core::ptr::drop_in_place+0x1f");
    }

    #[test]
    fn test_demangle_unknown_is_unchanged()
    {
        for name in ["main", "_Z3foov", "", "????", "not a symbol", "a+0xzz"] {
            assert_eq!(demangle(name), name);
        }
    }

    #[test]
    fn test_demangle_is_idempotent()
    {
        for name in [LEGACY, V0, "main", "_Z3foov", "std::rt::lang_start", "x+0x10", "_ZN8_ZN3fooEE"] {
            let once = demangle(name);
            assert_eq!(demangle(&once), once, "input: {name}");
        }
    }

    #[test]
    fn test_demangle_nested_mangling_is_unchanged()
    {
        assert_eq!(demangle("_ZN8_ZN3fooEE"), "_ZN8_ZN3fooEE");
        assert_eq!(demangle("_ZN8_ZN3fooEE+0x8"), "_ZN8_ZN3fooEE+0x8");
        assert_eq!(demangle("_ZN3fooE"), "foo");
    }

    #[test]
    fn test_make_symbol_name_language()
    {
        let rust = make_symbol_name(LEGACY.to_string());
        assert_eq!(rust.language(), SymbolLanguage::Rust);
        assert_eq!(rust.display_name(), "core::ptr::drop_in_place");
        assert_eq!(rust.raw(), LEGACY);

        assert_eq!(make_symbol_name("_Z3foov".into()).language(), SymbolLanguage::Cpp);
        assert_eq!(make_symbol_name("malloc".into()).language(), SymbolLanguage::C);
        assert_eq!(make_symbol_name("malloc".into()).display_name(), "malloc");
    }
}
